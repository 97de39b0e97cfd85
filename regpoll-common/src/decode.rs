//! Register payload decoding.
//!
//! A [`DecodePlan`] is an ordered field list; [`decode`] walks the raw
//! big-endian payload strictly left to right, one unsigned 32-bit word
//! (two registers) per field, so a short buffer fails at the first
//! under-run instead of producing partial garbage.

use crate::channel::active_power_channel;
use crate::error::DecodeError;
use crate::measurement::{Measurement, Unit};
use crate::plan::DeviceId;

/// One field in a decode plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Active power in watts, transmitted as hundredths of a watt.
    ActivePower,
    /// Consumed to keep the cursor aligned; not yet mapped to a channel.
    Reserved,
}

/// Ordered field layout of a register block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodePlan {
    fields: Vec<Field>,
}

impl DecodePlan {
    /// Create a plan from an explicit field list.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// The power-meter block layout: active power followed by two words
    /// reserved for future channels.
    pub fn power_meter() -> Self {
        Self::new(vec![Field::ActivePower, Field::Reserved, Field::Reserved])
    }

    /// Minimum payload length in bytes this plan requires.
    pub fn required_bytes(&self) -> usize {
        self.fields.len() * 4
    }
}

/// Cursor over a big-endian byte payload.
struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn read_u32(&mut self, required: usize) -> Result<u32, DecodeError> {
        let Some(bytes) = self.buf.get(self.pos..self.pos + 4) else {
            return Err(DecodeError::BufferUnderrun {
                required,
                available: self.buf.len(),
            });
        };
        self.pos += 4;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

/// Decode a raw register payload into measurements.
///
/// Trailing bytes beyond the plan's requirement are ignored (the wire read
/// may fetch a larger block than the plan currently maps).
pub fn decode(
    device_id: DeviceId,
    payload: &[u8],
    plan: &DecodePlan,
) -> Result<Vec<Measurement>, DecodeError> {
    let required = plan.required_bytes();
    let mut cursor = ByteCursor::new(payload);
    let mut measurements = Vec::new();

    for field in &plan.fields {
        let raw = cursor.read_u32(required)?;
        match field {
            Field::ActivePower => {
                measurements.push(Measurement::new(
                    device_id,
                    active_power_channel(device_id),
                    f64::from(raw) / 100.0,
                    Unit::Watt,
                ));
            }
            Field::Reserved => {}
        }
    }

    Ok(measurements)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_of(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_be_bytes()).collect()
    }

    #[test]
    fn test_decode_power_block() {
        // Three sequential uint32 words plus one spare register pair, as a
        // full 8-register read would deliver.
        let mut payload = payload_of(&[12345, 7, 9]);
        payload.extend_from_slice(&[0, 0, 0, 0]);
        assert_eq!(payload.len(), 16);

        let measurements = decode(3, &payload, &DecodePlan::power_meter()).unwrap();

        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements[0].device_id, 3);
        assert_eq!(measurements[0].channel, "measurements/ActivePower-3");
        assert_eq!(measurements[0].value, 123.45);
        assert_eq!(measurements[0].unit, Unit::Watt);
    }

    #[test]
    fn test_reserved_words_consumed_without_error() {
        // Exactly the plan's requirement; the reserved words must be read
        // through, not skipped, so a 12-byte payload decodes cleanly.
        let payload = payload_of(&[100, u32::MAX, 0]);

        let measurements = decode(1, &payload, &DecodePlan::power_meter()).unwrap();
        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements[0].value, 1.0);
    }

    #[test]
    fn test_decode_short_buffer() {
        let plan = DecodePlan::power_meter();

        for len in 0..12 {
            let payload = vec![0u8; len];
            let err = decode(1, &payload, &plan).unwrap_err();
            assert_eq!(
                err,
                DecodeError::BufferUnderrun {
                    required: 12,
                    available: len
                }
            );
        }
    }

    #[test]
    fn test_decode_is_big_endian() {
        let payload = vec![0x00, 0x00, 0x30, 0x39, 0, 0, 0, 0, 0, 0, 0, 0];

        let measurements = decode(1, &payload, &DecodePlan::power_meter()).unwrap();
        assert_eq!(measurements[0].value, 123.45);
    }

    #[test]
    fn test_required_bytes() {
        assert_eq!(DecodePlan::power_meter().required_bytes(), 12);
        assert_eq!(DecodePlan::new(vec![Field::ActivePower]).required_bytes(), 4);
    }
}

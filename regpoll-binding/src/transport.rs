//! Modbus transport over TCP or RTU.
//!
//! One [`TransportBridge`] owns the shared connection; every registered
//! poll multiplexes over it by selecting the plan's unit id per read.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_modbus::client::{Context, Reader};
use tokio_modbus::prelude::*;

use regpoll_common::{ReadFunction, RegisterReadPlan};

use crate::config::ConnectionConfig;
use crate::endpoint::{
    BridgeConnection, CommunicationInterface, FailureCallback, PollHandle, RawReadResult,
    ReadFailure, ResultCallback,
};

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Read failed: {0}")]
    Read(String),
}

/// The shared communication interface: one Modbus client context
/// multiplexing reads to many unit ids.
pub struct ModbusEndpoint {
    ctx: Arc<Mutex<Context>>,
}

impl ModbusEndpoint {
    /// Wrap an established Modbus client context.
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx: Arc::new(Mutex::new(ctx)),
        }
    }
}

/// Read one register block and flatten the words to big-endian bytes.
async fn read_block(
    ctx: &Arc<Mutex<Context>>,
    plan: &RegisterReadPlan,
) -> Result<Vec<u8>, TransportError> {
    let mut ctx = ctx.lock().await;
    ctx.set_slave(Slave(plan.device_id));

    let words = match plan.function {
        ReadFunction::ReadHoldingRegisters => {
            ctx.read_holding_registers(plan.start, plan.count).await
        }
        ReadFunction::ReadInputRegisters => ctx.read_input_registers(plan.start, plan.count).await,
    }
    .map_err(|e| TransportError::Read(e.to_string()))?
    .map_err(|e| TransportError::Read(format!("Exception: {:?}", e)))?;

    Ok(words.iter().flat_map(|w| w.to_be_bytes()).collect())
}

impl CommunicationInterface for ModbusEndpoint {
    fn register_poll(
        &self,
        plan: RegisterReadPlan,
        interval: Duration,
        initial_delay: Duration,
        on_result: ResultCallback,
        on_failure: FailureCallback,
    ) -> PollHandle {
        let ctx = Arc::clone(&self.ctx);

        let task = tokio::spawn(async move {
            tokio::time::sleep(initial_delay).await;

            loop {
                match read_block(&ctx, &plan).await {
                    Ok(payload) => on_result(RawReadResult { plan, payload }),
                    Err(e) => on_failure(ReadFailure {
                        plan,
                        error: e.to_string(),
                    }),
                }

                tokio::time::sleep(interval).await;
            }
        });

        PollHandle::new(task)
    }
}

/// The parent connection owning the shared serial/TCP link.
pub struct TransportBridge {
    label: String,
    endpoint: Option<Arc<ModbusEndpoint>>,
}

impl TransportBridge {
    /// Establish the shared connection described by the configuration.
    pub async fn connect(
        label: impl Into<String>,
        connection: &ConnectionConfig,
        connect_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let ctx = match connection {
            ConnectionConfig::Tcp { host, port } => {
                let addr: SocketAddr = format!("{}:{}", host, port)
                    .parse()
                    .map_err(|e| TransportError::Connect(format!("Invalid address: {}", e)))?;

                tokio::time::timeout(connect_timeout, tcp::connect(addr))
                    .await
                    .map_err(|_| TransportError::Connect("Connection timeout".to_string()))?
                    .map_err(|e| TransportError::Connect(e.to_string()))?
            }
            ConnectionConfig::Rtu {
                port,
                baud_rate,
                data_bits,
                parity,
                stop_bits,
            } => {
                let parity = match parity.to_lowercase().as_str() {
                    "none" => tokio_serial::Parity::None,
                    "even" => tokio_serial::Parity::Even,
                    "odd" => tokio_serial::Parity::Odd,
                    _ => tokio_serial::Parity::None,
                };

                let stop_bits = match stop_bits {
                    2 => tokio_serial::StopBits::Two,
                    _ => tokio_serial::StopBits::One,
                };

                let data_bits = match data_bits {
                    5 => tokio_serial::DataBits::Five,
                    6 => tokio_serial::DataBits::Six,
                    7 => tokio_serial::DataBits::Seven,
                    _ => tokio_serial::DataBits::Eight,
                };

                let builder = tokio_serial::new(port, *baud_rate)
                    .parity(parity)
                    .stop_bits(stop_bits)
                    .data_bits(data_bits);

                let serial = tokio_serial::SerialStream::open(&builder)
                    .map_err(|e| TransportError::Connect(format!("Serial open failed: {}", e)))?;

                rtu::attach(serial)
            }
        };

        Ok(Self {
            label: label.into(),
            endpoint: Some(Arc::new(ModbusEndpoint::new(ctx))),
        })
    }
}

impl BridgeConnection for TransportBridge {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn is_online(&self) -> bool {
        self.endpoint.is_some()
    }

    fn communication_interface(&self) -> Option<Arc<dyn CommunicationInterface>> {
        self.endpoint
            .as_ref()
            .map(|e| Arc::clone(e) as Arc<dyn CommunicationInterface>)
    }
}

//! Register-level access to the gripper.

use std::fmt::{Debug, Display};
use std::future::Future;
use std::time::Duration;

use tokio_modbus::client::{Context, Reader, Writer};
use tokio_modbus::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{GripperConfig, Parity, RegisterKind, SerialConfig};
use crate::error::TransportError;

/// Reads and writes 16-bit registers on one slave.
///
/// Implementations must not retry; every call is a single attempt.
pub trait RegisterTransport: Send {
    fn is_connected(&self) -> bool;

    /// Open the link. A no-op when already connected.
    fn connect(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    fn read_registers(
        &mut self,
        address: u16,
        count: u16,
    ) -> impl Future<Output = Result<Vec<u16>, TransportError>> + Send;

    fn write_registers(
        &mut self,
        address: u16,
        values: &[u16],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Address subsequent requests to another slave.
    fn set_slave(&mut self, slave: u8);

    /// Close the link. Further calls fail with `NotConnected` until `connect`.
    fn release(&mut self) -> impl Future<Output = ()> + Send;
}

/// Modbus RTU over a serial port.
pub struct RtuTransport {
    serial: SerialConfig,
    slave: u8,
    timeout: Duration,
    status_kind: RegisterKind,
    ctx: Option<Context>,
}

impl RtuTransport {
    pub fn new(config: &GripperConfig) -> Self {
        Self {
            serial: config.serial.clone(),
            slave: config.slave_address,
            timeout: config.timeout(),
            status_kind: config.registers.status_kind,
            ctx: None,
        }
    }

    pub fn slave(&self) -> u8 {
        self.slave
    }

    fn context(&mut self) -> Result<&mut Context, TransportError> {
        self.ctx.as_mut().ok_or(TransportError::NotConnected)
    }

    /// Drop the link after an I/O failure so the next poll reconnects.
    /// Timeouts and exceptions leave the port open.
    fn check_link<T>(&mut self, result: Result<T, TransportError>) -> Result<T, TransportError> {
        if let Err(TransportError::Io(e)) = &result {
            if self.ctx.take().is_some() {
                warn!(port = %self.serial.port, error = %e, "Modbus RTU link lost");
            }
        }
        result
    }

    fn serial_builder(&self) -> tokio_serial::SerialPortBuilder {
        let parity = match self.serial.parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Even => tokio_serial::Parity::Even,
            Parity::Odd => tokio_serial::Parity::Odd,
        };

        let stop_bits = match self.serial.stop_bits {
            2 => tokio_serial::StopBits::Two,
            _ => tokio_serial::StopBits::One,
        };

        let data_bits = match self.serial.data_bits {
            5 => tokio_serial::DataBits::Five,
            6 => tokio_serial::DataBits::Six,
            7 => tokio_serial::DataBits::Seven,
            _ => tokio_serial::DataBits::Eight,
        };

        tokio_serial::new(&self.serial.port, self.serial.baud_rate)
            .parity(parity)
            .stop_bits(stop_bits)
            .data_bits(data_bits)
            .timeout(self.timeout)
    }
}

/// Bound a Modbus request by `timeout` and collapse its two error layers.
async fn bounded<T, E, X, F>(timeout: Duration, request: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<Result<T, X>, E>>,
    E: Display,
    X: Debug,
{
    match tokio::time::timeout(timeout, request).await {
        Err(_) => Err(TransportError::Timeout(timeout)),
        Ok(Err(e)) => Err(TransportError::Io(e.to_string())),
        Ok(Ok(Err(exception))) => Err(TransportError::Exception(format!("{:?}", exception))),
        Ok(Ok(Ok(value))) => Ok(value),
    }
}

impl RegisterTransport for RtuTransport {
    fn is_connected(&self) -> bool {
        self.ctx.is_some()
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.ctx.is_some() {
            return Ok(());
        }

        let serial = tokio_serial::SerialStream::open(&self.serial_builder()).map_err(|e| {
            TransportError::Connection(format!("Serial open '{}' failed: {}", self.serial.port, e))
        })?;

        self.ctx = Some(rtu::attach_slave(serial, Slave(self.slave)));

        info!(
            port = %self.serial.port,
            baud = self.serial.baud_rate,
            slave = self.slave,
            "Modbus RTU link open"
        );
        Ok(())
    }

    async fn read_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, TransportError> {
        let timeout = self.timeout;
        let kind = self.status_kind;
        let ctx = self.context()?;

        let result = match kind {
            RegisterKind::Holding => bounded(timeout, ctx.read_holding_registers(address, count)).await,
            RegisterKind::Input => bounded(timeout, ctx.read_input_registers(address, count)).await,
        };
        let values = self.check_link(result)?;

        if values.len() < count as usize {
            return Err(TransportError::ShortRead {
                expected: count,
                got: values.len(),
            });
        }
        Ok(values)
    }

    async fn write_registers(&mut self, address: u16, values: &[u16]) -> Result<(), TransportError> {
        let timeout = self.timeout;
        let ctx = self.context()?;
        let result = bounded(timeout, ctx.write_multiple_registers(address, values)).await;
        self.check_link(result)?;
        debug!(address, ?values, "Registers written");
        Ok(())
    }

    fn set_slave(&mut self, slave: u8) {
        self.slave = slave;
        if let Some(ctx) = self.ctx.as_mut() {
            ctx.set_slave(Slave(slave));
        }
    }

    async fn release(&mut self) {
        // Dropping the context closes the serial port.
        if self.ctx.take().is_some() {
            info!(port = %self.serial.port, "Modbus RTU link released");
        }
    }
}

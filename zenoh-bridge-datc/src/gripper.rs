//! The gripper core: command dispatch and status decoding over one transport.

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::command::{CommandEnvelope, CommandLimits, GripperCommand, SLAVE_ADDRESS_RANGE};
use crate::config::{GripperConfig, RegisterMap};
use crate::error::{CommandError, TransportError};
use crate::status::{DeviceStatus, STATUS_BLOCK_LEN};
use crate::transport::RegisterTransport;

/// One gripper behind a register transport.
///
/// Safe to share between the poller and command handlers: the transport
/// lock is held for a whole transaction, so a command write and a status
/// read never interleave on the wire. The snapshot lock is only taken
/// between transport calls.
pub struct Gripper<T> {
    name: String,
    transport: Mutex<T>,
    status: parking_lot::Mutex<DeviceStatus>,
    limits: CommandLimits,
    registers: RegisterMap,
}

impl<T: RegisterTransport> Gripper<T> {
    pub fn new(
        name: impl Into<String>,
        transport: T,
        limits: CommandLimits,
        registers: RegisterMap,
    ) -> Self {
        Self {
            name: name.into(),
            transport: Mutex::new(transport),
            status: parking_lot::Mutex::new(DeviceStatus::default()),
            limits,
            registers,
        }
    }

    pub fn from_config(config: &GripperConfig, transport: T) -> Self {
        Self::new(&config.name, transport, config.limits, config.registers)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copy of the last decoded status.
    pub fn snapshot(&self) -> DeviceStatus {
        self.status.lock().clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.transport.lock().await.is_connected()
    }

    pub async fn connect(&self) -> Result<(), TransportError> {
        self.transport.lock().await.connect().await
    }

    pub async fn release(&self) {
        self.transport.lock().await.release().await;
    }

    /// Read and decode the status block.
    ///
    /// On failure only `last_read_failed` changes in the snapshot; every
    /// other field keeps its previous value.
    pub async fn read_status(&self) -> Result<DeviceStatus, TransportError> {
        let result = {
            let mut transport = self.transport.lock().await;
            transport
                .read_registers(self.registers.status_base, STATUS_BLOCK_LEN)
                .await
        }
        .and_then(|block| DeviceStatus::decode(&block));

        let mut status = self.status.lock();
        match result {
            Ok(fresh) => {
                *status = fresh.clone();
                Ok(fresh)
            }
            Err(e) => {
                status.last_read_failed = true;
                Err(e)
            }
        }
    }

    /// Validate, encode and send a command.
    pub async fn execute(&self, command: &GripperCommand) -> Result<(), CommandError> {
        if let GripperCommand::ModbusSlaveChange { address } = *command {
            return self.change_slave(address).await;
        }

        let envelope = command.encode(&self.limits)?;
        self.send(command.name(), envelope).await
    }

    async fn send(&self, name: &'static str, envelope: CommandEnvelope) -> Result<(), CommandError> {
        let result = {
            let mut transport = self.transport.lock().await;
            transport
                .write_registers(self.registers.command_base, envelope.as_registers())
                .await
        };

        match result {
            Ok(()) => {
                debug!(
                    gripper = %self.name,
                    command = name,
                    registers = ?envelope.as_registers(),
                    "Command sent"
                );
                Ok(())
            }
            Err(e) => {
                warn!(gripper = %self.name, command = name, error = %e, "Command failed");
                Err(e.into())
            }
        }
    }

    async fn change_slave(&self, address: u16) -> Result<(), CommandError> {
        let slave = u8::try_from(address)
            .ok()
            .filter(|_| SLAVE_ADDRESS_RANGE.contains(&address))
            .ok_or_else(|| {
                warn!(gripper = %self.name, address, "Slave address out of range");
                CommandError::rejected(
                    "modbus_slave_change",
                    format!("address {} outside {:?}", address, SLAVE_ADDRESS_RANGE),
                )
            })?;

        self.transport.lock().await.set_slave(slave);
        info!(gripper = %self.name, slave, "Modbus slave changed");
        Ok(())
    }

    /// Energize the motor.
    pub async fn motor_enable(&self) -> Result<(), CommandError> {
        self.execute(&GripperCommand::MotorEnable).await
    }

    /// De-energize the motor.
    pub async fn motor_disable(&self) -> Result<(), CommandError> {
        self.execute(&GripperCommand::MotorDisable).await
    }

    /// Stop the current motion, keeping the motor enabled.
    pub async fn motor_stop(&self) -> Result<(), CommandError> {
        self.execute(&GripperCommand::MotorStop).await
    }

    /// Run the homing sequence.
    pub async fn gripper_initialize(&self) -> Result<(), CommandError> {
        self.execute(&GripperCommand::GripperInitialize).await
    }

    pub async fn gripper_open(&self) -> Result<(), CommandError> {
        self.execute(&GripperCommand::GripperOpen).await
    }

    pub async fn gripper_close(&self) -> Result<(), CommandError> {
        self.execute(&GripperCommand::GripperClose).await
    }

    /// Switch the vacuum gripper on.
    pub async fn vacuum_on(&self) -> Result<(), CommandError> {
        self.execute(&GripperCommand::VacuumOn).await
    }

    pub async fn vacuum_off(&self) -> Result<(), CommandError> {
        self.execute(&GripperCommand::VacuumOff).await
    }

    /// Enable impedance (compliant) control.
    pub async fn impedance_on(&self) -> Result<(), CommandError> {
        self.execute(&GripperCommand::ImpedanceOn).await
    }

    pub async fn impedance_off(&self) -> Result<(), CommandError> {
        self.execute(&GripperCommand::ImpedanceOff).await
    }

    /// Store a new Modbus address in the device (1-99, rejected otherwise).
    pub async fn set_modbus_address(&self, address: u16) -> Result<(), CommandError> {
        self.execute(&GripperCommand::SetModbusAddress { address })
            .await
    }

    /// Talk to another slave on the bus (1-247, rejected otherwise).
    pub async fn modbus_slave_change(&self, address: u16) -> Result<(), CommandError> {
        self.change_slave(address).await
    }

    /// Move the fingers to `position`, clamped into `limits.finger_position`.
    pub async fn set_finger_position(&self, position: u16) -> Result<(), CommandError> {
        self.execute(&GripperCommand::SetFingerPosition { position })
            .await
    }

    /// Set the torque ratio in percent, clamped into `limits.torque_ratio`.
    pub async fn set_motor_torque_ratio(&self, ratio: u16) -> Result<(), CommandError> {
        self.execute(&GripperCommand::SetMotorTorqueRatio { ratio })
            .await
    }

    /// Set the speed ratio in percent, clamped into `limits.speed_ratio`.
    pub async fn set_motor_speed_ratio(&self, ratio: u16) -> Result<(), CommandError> {
        self.execute(&GripperCommand::SetMotorSpeedRatio { ratio })
            .await
    }

    /// Run at `velocity`. The magnitude is clamped into `limits.velocity`; the sign is kept.
    pub async fn velocity_control(&self, velocity: i16) -> Result<(), CommandError> {
        self.execute(&GripperCommand::VelocityControl { velocity })
            .await
    }

    /// Drive at `current`. The magnitude is clamped to `limits.current_max`; the sign is kept.
    pub async fn current_control(&self, current: i16) -> Result<(), CommandError> {
        self.execute(&GripperCommand::CurrentControl { current })
            .await
    }

    /// Move to `position_deg` over `duration_ms`, which is clamped into `limits.duration_ms`.
    pub async fn position_control(
        &self,
        position_deg: i16,
        duration_ms: u16,
    ) -> Result<(), CommandError> {
        self.execute(&GripperCommand::PositionControl {
            position_deg,
            duration_ms,
        })
        .await
    }

    /// Set impedance slave (clamped to 1-100) and stiffness level (clamped to 1-10).
    pub async fn set_impedance_params(
        &self,
        slave_num: i16,
        stiffness_level: i16,
    ) -> Result<(), CommandError> {
        self.execute(&GripperCommand::SetImpedanceParams {
            slave_num,
            stiffness_level,
        })
        .await
    }
}

//! Gripper command protocol.
//!
//! Every operation is written as one contiguous block of holding registers
//! starting at the command base address:
//!
//! ```text
//! [opcode, param1?, param2?]
//! ```
//!
//! Signed parameters travel as their 16-bit two's complement pattern.
//! Physical parameters outside their limits are clamped (with a warning)
//! and sent anyway; addresses outside their range are rejected.

use std::fmt::Display;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::CommandError;

/// Duration word sent with velocity and current control. The firmware
/// ignores it, but the payload must keep its three-register shape.
pub const LEGACY_CONTROL_DURATION_MS: u16 = 500;

/// Addresses accepted by [`GripperCommand::SetModbusAddress`].
pub const MODBUS_ADDRESS_RANGE: RangeInclusive<u16> = 1..=99;

/// Slave addresses accepted by [`GripperCommand::ModbusSlaveChange`].
pub const SLAVE_ADDRESS_RANGE: RangeInclusive<u16> = 1..=247;

pub const IMPEDANCE_SLAVE_BOUNDS: Bounds<i16> = Bounds::new(1, 100);
pub const STIFFNESS_BOUNDS: Bounds<i16> = Bounds::new(1, 10);

/// Command codes understood by the gripper firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    MotorEnable = 1,
    MotorStop = 2,
    MotorDisable = 3,
    MotorPositionControl = 5,
    MotorVelocityControl = 6,
    MotorCurrentControl = 7,
    ChangeModbusAddress = 50,
    GripperInitialize = 100,
    GripperOpen = 101,
    GripperClose = 102,
    SetFingerPosition = 103,
    VacuumGripperOn = 104,
    VacuumGripperOff = 105,
    ImpedanceOn = 110,
    ImpedanceOff = 111,
    SetImpedanceParams = 112,
    SetMotorTorque = 212,
    SetMotorSpeed = 213,
}

impl Opcode {
    pub const ALL: [Opcode; 18] = [
        Opcode::MotorEnable,
        Opcode::MotorStop,
        Opcode::MotorDisable,
        Opcode::MotorPositionControl,
        Opcode::MotorVelocityControl,
        Opcode::MotorCurrentControl,
        Opcode::ChangeModbusAddress,
        Opcode::GripperInitialize,
        Opcode::GripperOpen,
        Opcode::GripperClose,
        Opcode::SetFingerPosition,
        Opcode::VacuumGripperOn,
        Opcode::VacuumGripperOff,
        Opcode::ImpedanceOn,
        Opcode::ImpedanceOff,
        Opcode::SetImpedanceParams,
        Opcode::SetMotorTorque,
        Opcode::SetMotorSpeed,
    ];

    pub fn code(self) -> u16 {
        self as u16
    }

    /// Number of parameter registers following the opcode.
    pub fn param_count(self) -> usize {
        match self {
            Opcode::MotorPositionControl
            | Opcode::MotorVelocityControl
            | Opcode::MotorCurrentControl
            | Opcode::SetImpedanceParams => 2,
            Opcode::ChangeModbusAddress
            | Opcode::SetFingerPosition
            | Opcode::SetMotorTorque
            | Opcode::SetMotorSpeed => 1,
            _ => 0,
        }
    }
}

impl TryFrom<u16> for Opcode {
    type Error = CommandError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Opcode::ALL
            .into_iter()
            .find(|op| op.code() == code)
            .ok_or_else(|| CommandError::UnknownCommand(format!("opcode {}", code)))
    }
}

/// One command as written to the device: opcode plus up to two parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEnvelope {
    opcode: Opcode,
    words: [u16; 3],
    len: usize,
}

impl CommandEnvelope {
    fn with_words(opcode: Opcode, params: &[u16]) -> Self {
        debug_assert_eq!(params.len(), opcode.param_count());

        let mut words = [opcode.code(), 0, 0];
        words[1..=params.len()].copy_from_slice(params);

        Self {
            opcode,
            words,
            len: params.len() + 1,
        }
    }

    pub fn bare(opcode: Opcode) -> Self {
        Self::with_words(opcode, &[])
    }

    pub fn one(opcode: Opcode, param: u16) -> Self {
        Self::with_words(opcode, &[param])
    }

    pub fn two(opcode: Opcode, first: u16, second: u16) -> Self {
        Self::with_words(opcode, &[first, second])
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn params(&self) -> &[u16] {
        &self.words[1..self.len]
    }

    /// Register block to write: `[opcode, params...]`.
    pub fn as_registers(&self) -> &[u16] {
        &self.words[..self.len]
    }
}

/// Inclusive `[min, max]` limits of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T> Bounds<T> {
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: Ord + Copy> Bounds<T> {
    pub fn clamp(&self, value: T) -> Clamped<T> {
        if value < self.min {
            Clamped::BelowMin(self.min)
        } else if value > self.max {
            Clamped::AboveMax(self.max)
        } else {
            Clamped::Within(value)
        }
    }
}

/// Outcome of clamping a value into [`Bounds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clamped<T> {
    Within(T),
    BelowMin(T),
    AboveMax(T),
}

impl<T: Copy> Clamped<T> {
    pub fn value(&self) -> T {
        match *self {
            Clamped::Within(v) | Clamped::BelowMin(v) | Clamped::AboveMax(v) => v,
        }
    }
}

/// Clamp and report which bound was violated.
fn clamp_reported<T>(command: &'static str, parameter: &'static str, bounds: Bounds<T>, value: T) -> T
where
    T: Ord + Copy + Display,
{
    let clamped = bounds.clamp(value);
    match clamped {
        Clamped::Within(_) => {}
        Clamped::BelowMin(min) => warn!(
            command,
            parameter,
            requested = %value,
            applied = %min,
            "Parameter below minimum, clamped"
        ),
        Clamped::AboveMax(max) => warn!(
            command,
            parameter,
            requested = %value,
            applied = %max,
            "Parameter above maximum, clamped"
        ),
    }
    clamped.value()
}

/// Clamp the magnitude of a signed value, keeping its sign. Zero counts as positive.
fn clamp_magnitude(
    command: &'static str,
    parameter: &'static str,
    bounds: Bounds<u16>,
    value: i16,
) -> i16 {
    let magnitude = clamp_reported(command, parameter, bounds, value.unsigned_abs());
    let magnitude = magnitude.min(i16::MAX as u16) as i16;
    if value < 0 { -magnitude } else { magnitude }
}

fn word(value: i16) -> u16 {
    value as u16
}

fn default_finger_position() -> Bounds<u16> {
    Bounds::new(0, 1000)
}

fn default_velocity() -> Bounds<u16> {
    Bounds::new(1, 1000)
}

fn default_current_max() -> u16 {
    1000
}

fn default_duration() -> Bounds<u16> {
    Bounds::new(50, 10_000)
}

fn default_ratio() -> Bounds<u16> {
    Bounds::new(10, 100)
}

/// Soft limits applied before a command is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLimits {
    #[serde(default = "default_finger_position")]
    pub finger_position: Bounds<u16>,

    /// Velocity magnitude.
    #[serde(default = "default_velocity")]
    pub velocity: Bounds<u16>,

    /// Current magnitude upper bound (lower bound is 0).
    #[serde(default = "default_current_max")]
    pub current_max: u16,

    /// Position control duration in milliseconds.
    #[serde(default = "default_duration")]
    pub duration_ms: Bounds<u16>,

    #[serde(default = "default_ratio")]
    pub torque_ratio: Bounds<u16>,

    #[serde(default = "default_ratio")]
    pub speed_ratio: Bounds<u16>,
}

impl Default for CommandLimits {
    fn default() -> Self {
        Self {
            finger_position: default_finger_position(),
            velocity: default_velocity(),
            current_max: default_current_max(),
            duration_ms: default_duration(),
            torque_ratio: default_ratio(),
            speed_ratio: default_ratio(),
        }
    }
}

impl CommandLimits {
    /// Check that every range is well formed and signed magnitudes fit in `i16`.
    pub fn validate(&self) -> Result<(), String> {
        let ranges = [
            ("finger_position", self.finger_position),
            ("velocity", self.velocity),
            ("duration_ms", self.duration_ms),
            ("torque_ratio", self.torque_ratio),
            ("speed_ratio", self.speed_ratio),
        ];

        for (name, bounds) in ranges {
            if bounds.min > bounds.max {
                return Err(format!(
                    "limits.{}: min {} is greater than max {}",
                    name, bounds.min, bounds.max
                ));
            }
        }

        let signed_max = i16::MAX as u16;
        if self.velocity.max > signed_max {
            return Err(format!("limits.velocity: max must be <= {}", signed_max));
        }
        if self.current_max > signed_max {
            return Err(format!("limits.current_max must be <= {}", signed_max));
        }

        Ok(())
    }

    fn current(&self) -> Bounds<u16> {
        Bounds::new(0, self.current_max)
    }
}

/// Every operation the gripper bridge accepts.
///
/// Deserializes from a tagged object, e.g.
/// `{"type": "position_control", "position_deg": 45, "duration_ms": 800}`.
/// The service names of the ROS node this bridge replaces are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GripperCommand {
    MotorEnable,
    MotorDisable,
    MotorStop,
    GripperInitialize,
    #[serde(alias = "grp_open")]
    GripperOpen,
    #[serde(alias = "grp_close")]
    GripperClose,
    #[serde(alias = "vacuum_grp_on")]
    VacuumOn,
    #[serde(alias = "vacuum_grp_off")]
    VacuumOff,
    ImpedanceOn,
    ImpedanceOff,
    /// Store a new Modbus address in the gripper.
    #[serde(alias = "set_modbus_addr")]
    SetModbusAddress {
        #[serde(alias = "value")]
        address: u16,
    },
    /// Talk to a different slave address on the bus; nothing is written.
    ModbusSlaveChange {
        #[serde(alias = "value")]
        address: u16,
    },
    #[serde(alias = "set_finger_pos")]
    SetFingerPosition {
        #[serde(alias = "value")]
        position: u16,
    },
    #[serde(alias = "set_motor_torque")]
    SetMotorTorqueRatio {
        #[serde(alias = "value")]
        ratio: u16,
    },
    #[serde(alias = "set_motor_speed")]
    SetMotorSpeedRatio {
        #[serde(alias = "value")]
        ratio: u16,
    },
    #[serde(alias = "motor_vel_ctrl")]
    VelocityControl { velocity: i16 },
    #[serde(alias = "motor_cur_ctrl")]
    CurrentControl { current: i16 },
    #[serde(alias = "motor_pos_ctrl")]
    PositionControl {
        #[serde(alias = "position")]
        position_deg: i16,
        #[serde(alias = "duration")]
        duration_ms: u16,
    },
    SetImpedanceParams { slave_num: i16, stiffness_level: i16 },
}

impl GripperCommand {
    pub fn name(&self) -> &'static str {
        match self {
            GripperCommand::MotorEnable => "motor_enable",
            GripperCommand::MotorDisable => "motor_disable",
            GripperCommand::MotorStop => "motor_stop",
            GripperCommand::GripperInitialize => "gripper_initialize",
            GripperCommand::GripperOpen => "gripper_open",
            GripperCommand::GripperClose => "gripper_close",
            GripperCommand::VacuumOn => "vacuum_on",
            GripperCommand::VacuumOff => "vacuum_off",
            GripperCommand::ImpedanceOn => "impedance_on",
            GripperCommand::ImpedanceOff => "impedance_off",
            GripperCommand::SetModbusAddress { .. } => "set_modbus_address",
            GripperCommand::ModbusSlaveChange { .. } => "modbus_slave_change",
            GripperCommand::SetFingerPosition { .. } => "set_finger_position",
            GripperCommand::SetMotorTorqueRatio { .. } => "set_motor_torque_ratio",
            GripperCommand::SetMotorSpeedRatio { .. } => "set_motor_speed_ratio",
            GripperCommand::VelocityControl { .. } => "velocity_control",
            GripperCommand::CurrentControl { .. } => "current_control",
            GripperCommand::PositionControl { .. } => "position_control",
            GripperCommand::SetImpedanceParams { .. } => "set_impedance_params",
        }
    }

    /// Opcode written for this command, `None` for link-level commands.
    pub fn opcode(&self) -> Option<Opcode> {
        let op = match self {
            GripperCommand::MotorEnable => Opcode::MotorEnable,
            GripperCommand::MotorDisable => Opcode::MotorDisable,
            GripperCommand::MotorStop => Opcode::MotorStop,
            GripperCommand::GripperInitialize => Opcode::GripperInitialize,
            GripperCommand::GripperOpen => Opcode::GripperOpen,
            GripperCommand::GripperClose => Opcode::GripperClose,
            GripperCommand::VacuumOn => Opcode::VacuumGripperOn,
            GripperCommand::VacuumOff => Opcode::VacuumGripperOff,
            GripperCommand::ImpedanceOn => Opcode::ImpedanceOn,
            GripperCommand::ImpedanceOff => Opcode::ImpedanceOff,
            GripperCommand::SetModbusAddress { .. } => Opcode::ChangeModbusAddress,
            GripperCommand::ModbusSlaveChange { .. } => return None,
            GripperCommand::SetFingerPosition { .. } => Opcode::SetFingerPosition,
            GripperCommand::SetMotorTorqueRatio { .. } => Opcode::SetMotorTorque,
            GripperCommand::SetMotorSpeedRatio { .. } => Opcode::SetMotorSpeed,
            GripperCommand::VelocityControl { .. } => Opcode::MotorVelocityControl,
            GripperCommand::CurrentControl { .. } => Opcode::MotorCurrentControl,
            GripperCommand::PositionControl { .. } => Opcode::MotorPositionControl,
            GripperCommand::SetImpedanceParams { .. } => Opcode::SetImpedanceParams,
        };
        Some(op)
    }

    /// Validate and clamp the parameters, producing the register payload.
    pub fn encode(&self, limits: &CommandLimits) -> Result<CommandEnvelope, CommandError> {
        let name = self.name();
        let Some(opcode) = self.opcode() else {
            error!(command = name, "Command has no opcode");
            return Err(CommandError::UnknownCommand(format!(
                "{} is not a register command",
                name
            )));
        };

        let envelope = match *self {
            GripperCommand::SetModbusAddress { address } => {
                if !MODBUS_ADDRESS_RANGE.contains(&address) {
                    error!(command = name, address, "Modbus address out of range");
                    return Err(CommandError::rejected(
                        name,
                        format!("address {} outside {:?}", address, MODBUS_ADDRESS_RANGE),
                    ));
                }
                CommandEnvelope::one(opcode, address)
            }
            GripperCommand::SetFingerPosition { position } => CommandEnvelope::one(
                opcode,
                clamp_reported(name, "position", limits.finger_position, position),
            ),
            GripperCommand::SetMotorTorqueRatio { ratio } => CommandEnvelope::one(
                opcode,
                clamp_reported(name, "torque_ratio", limits.torque_ratio, ratio),
            ),
            GripperCommand::SetMotorSpeedRatio { ratio } => CommandEnvelope::one(
                opcode,
                clamp_reported(name, "speed_ratio", limits.speed_ratio, ratio),
            ),
            GripperCommand::VelocityControl { velocity } => CommandEnvelope::two(
                opcode,
                word(clamp_magnitude(name, "velocity", limits.velocity, velocity)),
                LEGACY_CONTROL_DURATION_MS,
            ),
            GripperCommand::CurrentControl { current } => CommandEnvelope::two(
                opcode,
                word(clamp_magnitude(name, "current", limits.current(), current)),
                LEGACY_CONTROL_DURATION_MS,
            ),
            GripperCommand::PositionControl {
                position_deg,
                duration_ms,
            } => CommandEnvelope::two(
                opcode,
                word(position_deg),
                clamp_reported(name, "duration_ms", limits.duration_ms, duration_ms),
            ),
            GripperCommand::SetImpedanceParams {
                slave_num,
                stiffness_level,
            } => CommandEnvelope::two(
                opcode,
                word(clamp_reported(name, "slave_num", IMPEDANCE_SLAVE_BOUNDS, slave_num)),
                word(clamp_reported(
                    name,
                    "stiffness_level",
                    STIFFNESS_BOUNDS,
                    stiffness_level,
                )),
            ),
            _ => CommandEnvelope::bare(opcode),
        };

        Ok(envelope)
    }
}

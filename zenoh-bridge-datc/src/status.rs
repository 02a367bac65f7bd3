//! Status register block decoding.

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Number of registers in the status block.
pub const STATUS_BLOCK_LEN: u16 = 8;

/// Label when no mapped flag is set.
pub const NO_FLAG_LABEL: &str = "---";

/// Label overriding everything else while the motor is disabled.
pub const DISABLED_LABEL: &str = "Motor Disabled";

/// Mode and fault flags carried in the `states` register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFlag {
    Enabled,
    Initialized,
    PositionCtrlMode,
    VelocityCtrlMode,
    CurrentCtrlMode,
    GripperOpen,
    GripperClosed,
    Fault,
}

#[derive(Debug, Clone, Copy)]
pub struct FlagEntry {
    pub bit: u8,
    pub flag: StatusFlag,
    pub label: &'static str,
}

/// Bit assignments, ordered by increasing bit index. When several flags are
/// set, the label of the highest one wins.
pub const FLAG_TABLE: [FlagEntry; 8] = [
    FlagEntry {
        bit: 0,
        flag: StatusFlag::Enabled,
        label: "Motor Enable",
    },
    FlagEntry {
        bit: 1,
        flag: StatusFlag::Initialized,
        label: "Gripper Initialize",
    },
    FlagEntry {
        bit: 2,
        flag: StatusFlag::PositionCtrlMode,
        label: "Motor Position Control",
    },
    FlagEntry {
        bit: 3,
        flag: StatusFlag::VelocityCtrlMode,
        label: "Motor Velocity Control",
    },
    FlagEntry {
        bit: 4,
        flag: StatusFlag::CurrentCtrlMode,
        label: "Motor Current Control",
    },
    FlagEntry {
        bit: 5,
        flag: StatusFlag::GripperOpen,
        label: "Gripper Open",
    },
    FlagEntry {
        bit: 6,
        flag: StatusFlag::GripperClosed,
        label: "Gripper Close",
    },
    FlagEntry {
        bit: 9,
        flag: StatusFlag::Fault,
        label: "Motor Fault",
    },
];

const MAPPED_BITS: u16 = {
    let mut mask = 0u16;
    let mut i = 0;
    while i < FLAG_TABLE.len() {
        mask |= 1 << FLAG_TABLE[i].bit;
        i += 1;
    }
    mask
};

/// Last known state of the gripper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// Raw flag register, including unmapped bits.
    pub states: u16,
    pub motor_position: i16,
    pub motor_current: i16,
    pub motor_velocity: i16,
    pub finger_position: u16,
    pub voltage: u16,

    pub enabled: bool,
    pub initialized: bool,
    pub position_ctrl_mode: bool,
    pub velocity_ctrl_mode: bool,
    pub current_ctrl_mode: bool,
    pub gripper_open: bool,
    pub gripper_closed: bool,
    pub fault: bool,

    pub status_label: String,

    /// Set when the most recent status read failed.
    pub last_read_failed: bool,
}

impl DeviceStatus {
    /// Decode a status block. Registers 5 and 6 are reserved.
    pub fn decode(registers: &[u16]) -> Result<Self, TransportError> {
        if registers.len() < STATUS_BLOCK_LEN as usize {
            return Err(TransportError::ShortRead {
                expected: STATUS_BLOCK_LEN,
                got: registers.len(),
            });
        }

        let states = registers[0];
        let mut status = DeviceStatus {
            states,
            motor_position: registers[1] as i16,
            motor_current: registers[2] as i16,
            motor_velocity: registers[3] as i16,
            finger_position: registers[4],
            voltage: registers[7],
            status_label: Self::label_for(states),
            last_read_failed: false,
            ..Default::default()
        };

        for entry in FLAG_TABLE {
            status.set_flag(entry.flag, states & (1 << entry.bit) != 0);
        }

        Ok(status)
    }

    /// Label for a raw `states` value.
    pub fn label_for(states: u16) -> String {
        let enabled = states & 1 != 0;
        if !enabled {
            return DISABLED_LABEL.to_string();
        }

        FLAG_TABLE
            .iter()
            .filter(|entry| states & (1 << entry.bit) != 0)
            .last()
            .map_or(NO_FLAG_LABEL, |entry| entry.label)
            .to_string()
    }

    pub fn flag(&self, flag: StatusFlag) -> bool {
        match flag {
            StatusFlag::Enabled => self.enabled,
            StatusFlag::Initialized => self.initialized,
            StatusFlag::PositionCtrlMode => self.position_ctrl_mode,
            StatusFlag::VelocityCtrlMode => self.velocity_ctrl_mode,
            StatusFlag::CurrentCtrlMode => self.current_ctrl_mode,
            StatusFlag::GripperOpen => self.gripper_open,
            StatusFlag::GripperClosed => self.gripper_closed,
            StatusFlag::Fault => self.fault,
        }
    }

    fn set_flag(&mut self, flag: StatusFlag, value: bool) {
        let slot = match flag {
            StatusFlag::Enabled => &mut self.enabled,
            StatusFlag::Initialized => &mut self.initialized,
            StatusFlag::PositionCtrlMode => &mut self.position_ctrl_mode,
            StatusFlag::VelocityCtrlMode => &mut self.velocity_ctrl_mode,
            StatusFlag::CurrentCtrlMode => &mut self.current_ctrl_mode,
            StatusFlag::GripperOpen => &mut self.gripper_open,
            StatusFlag::GripperClosed => &mut self.gripper_closed,
            StatusFlag::Fault => &mut self.fault,
        };
        *slot = value;
    }

    /// Flags currently set, in table order.
    pub fn active_flags(&self) -> Vec<StatusFlag> {
        FLAG_TABLE
            .iter()
            .map(|entry| entry.flag)
            .filter(|flag| self.flag(*flag))
            .collect()
    }

    /// Bits set in `states` that have no flag assigned.
    pub fn unmapped_bits(&self) -> u16 {
        self.states & !MAPPED_BITS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(states: u16) -> [u16; 8] {
        [states, 0, 0, 0, 0, 0, 0, 0]
    }

    #[test]
    fn test_decode_fields() {
        let registers = [
            0b11,
            (-450i16) as u16,
            120,
            (-30i16) as u16,
            700,
            0xFFFF,
            0xFFFF,
            240,
        ];
        let status = DeviceStatus::decode(&registers).unwrap();

        assert_eq!(status.states, 0b11);
        assert_eq!(status.motor_position, -450);
        assert_eq!(status.motor_current, 120);
        assert_eq!(status.motor_velocity, -30);
        assert_eq!(status.finger_position, 700);
        assert_eq!(status.voltage, 240);
        assert!(status.enabled);
        assert!(status.initialized);
        assert!(!status.last_read_failed);
        assert_eq!(status.status_label, "Gripper Initialize");
    }

    #[test]
    fn test_highest_set_bit_wins() {
        let status = DeviceStatus::decode(&block(0b101)).unwrap();
        assert!(status.enabled);
        assert!(status.position_ctrl_mode);
        assert_eq!(status.status_label, "Motor Position Control");

        let status = DeviceStatus::decode(&block(0b0000100001)).unwrap();
        assert!(status.gripper_open);
        assert_eq!(status.status_label, "Gripper Open");

        let status = DeviceStatus::decode(&block(0b10_0100_0001)).unwrap();
        assert!(status.fault);
        assert!(status.gripper_closed);
        assert_eq!(status.status_label, "Motor Fault");
    }

    #[test]
    fn test_disabled_overrides_label() {
        let status = DeviceStatus::decode(&block(0b10_0000_0100)).unwrap();
        assert!(!status.enabled);
        assert!(status.fault);
        assert_eq!(status.status_label, DISABLED_LABEL);

        let status = DeviceStatus::decode(&block(0)).unwrap();
        assert_eq!(status.status_label, DISABLED_LABEL);
    }

    #[test]
    fn test_enabled_only() {
        let status = DeviceStatus::decode(&block(0b1)).unwrap();
        assert_eq!(status.status_label, "Motor Enable");
        assert_eq!(status.active_flags(), vec![StatusFlag::Enabled]);
    }

    #[test]
    fn test_unmapped_bits_preserved() {
        let states = 0b1000_0001_1000_0001;
        let status = DeviceStatus::decode(&block(states)).unwrap();
        assert_eq!(status.states, states);
        assert_eq!(status.unmapped_bits(), 0b1000_0001_1000_0000);
        assert_eq!(status.status_label, "Motor Enable");
    }

    #[test]
    fn test_short_block_rejected() {
        let err = DeviceStatus::decode(&[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            TransportError::ShortRead {
                expected: 8,
                got: 3
            }
        );
    }

    #[test]
    fn test_flag_table_sorted() {
        assert!(FLAG_TABLE.windows(2).all(|w| w[0].bit < w[1].bit));
    }

    #[test]
    fn test_default_snapshot() {
        let status = DeviceStatus::default();
        assert_eq!(status.states, 0);
        assert!(status.status_label.is_empty());
        assert!(!status.last_read_failed);
    }

    #[test]
    fn test_serialization() {
        let status = DeviceStatus::decode(&block(0b11)).unwrap();
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"status_label\":\"Gripper Initialize\""));

        let back: DeviceStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, status);
    }
}

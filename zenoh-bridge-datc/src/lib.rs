//! Zenoh bridge for the DATC motorized gripper.
//!
//! The gripper sits on a Modbus RTU serial link. Commands are written as a
//! register block `[opcode, param1?, param2?]`; status is polled from an
//! 8-register block and decoded into a [`DeviceStatus`].
//!
//! # Key Expressions
//!
//! ```text
//! datc/gripper/<device>/state        # Sample<DeviceStatus>, JSON or CBOR
//! datc/gripper/<device>/@/command    # queryable, {"type": "gripper_open"}
//! datc/gripper/@/status              # bridge running/offline
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod gripper;
pub mod mock;
pub mod poller;
pub mod service;
pub mod status;
pub mod transport;

pub use command::{CommandEnvelope, CommandLimits, GripperCommand, Opcode};
pub use config::{DatcBridgeConfig, GripperConfig};
pub use error::{CommandError, TransportError};
pub use gripper::Gripper;
pub use poller::{PollState, PollStats, Poller};
pub use service::{CommandReply, CommandService};
pub use status::DeviceStatus;
pub use transport::{RegisterTransport, RtuTransport};

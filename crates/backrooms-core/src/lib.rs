//! Virtual machine core for the Backrooms character-grid language.
//!
//! A program is a [`Rooms`] plane of single-byte cells. One or more
//! [`Conscious`] units walk it, and the character under each unit selects a
//! [`Rule`]. The [`Portal`] schedules the units round-robin.

/// Typed values held on stacks and in registers.
pub mod value;
pub use value::Value;

/// Value stack with frame fences and a bottom sentinel.
pub mod stack;
pub use stack::Stack;

/// Sparse multi-floor character plane with hallway landmarks.
pub mod rooms;
pub use rooms::{is_character, is_name, Coord, Rooms, RoomsError, BLANK};

/// Execution unit state.
pub mod conscious;
pub use conscious::{Branch, Conscious, Register, DEFAULT_DIRECTION, REGISTER_COUNT};

/// In-band error codes.
pub mod fault;
pub use fault::ErrorCode;

/// Rule dispatch framework and the built-in opcode catalog.
pub mod rules;
pub use rules::{
    built_in_rules, Activation, Instruction, MicroStep, Rule, RuleContext, RuleError, RuleModule,
    RuleTable, Shifter,
};

/// Round-robin scheduler and the services it exposes to rules.
pub mod portal;
pub use portal::{
    Feeder, Input, KeyLock, Portal, PortalConfig, PortalError, RunState, Services, GATE,
};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;

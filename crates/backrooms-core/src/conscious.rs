//! Execution unit state: position, direction, registers and stacks.

use crate::{Coord, Stack, Value};

/// Number of general registers (`R0..R9`).
pub const REGISTER_COUNT: usize = 10;

/// Direction a freshly created unit travels in (`+x`).
pub const DEFAULT_DIRECTION: Coord = Coord::new(1, 0, 0);

/// General register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Register {
    #[default]
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
    R8 = 8,
    R9 = 9,
}

impl Register {
    /// Ordered list of all general registers.
    pub const ALL: [Self; REGISTER_COUNT] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
        Self::R8,
        Self::R9,
    ];

    /// Returns the array index for this register (`0..=9`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Maps an ASCII digit to its register.
    #[must_use]
    pub const fn from_digit(digit: char) -> Option<Self> {
        match digit {
            '0' => Some(Self::R0),
            '1' => Some(Self::R1),
            '2' => Some(Self::R2),
            '3' => Some(Self::R3),
            '4' => Some(Self::R4),
            '5' => Some(Self::R5),
            '6' => Some(Self::R6),
            '7' => Some(Self::R7),
            '8' => Some(Self::R8),
            '9' => Some(Self::R9),
            _ => None,
        }
    }

    /// Maps a register number to its register.
    #[must_use]
    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }
}

/// Condition consulted by the next shifter before it turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Branch {
    /// Always turn.
    #[default]
    Always,
    /// Top is an integer greater than zero.
    Positive,
    /// Top is the integer zero.
    Zero,
    /// Top is an integer less than zero.
    Negative,
    /// Top is an integer.
    IsInteger,
    /// Top is text.
    IsText,
    /// Top is `Nothing`.
    IsNothing,
    /// Top is a frame fence.
    IsFrame,
    /// The stack is empty.
    IsEmpty,
}

impl Branch {
    /// Evaluates the predicate against a work-stack top.
    #[must_use]
    pub const fn holds(self, top: &Value) -> bool {
        match self {
            Self::Always => true,
            Self::Positive => matches!(top, Value::Integer(value) if *value > 0),
            Self::Zero => matches!(top, Value::Integer(0)),
            Self::Negative => matches!(top, Value::Integer(value) if *value < 0),
            Self::IsInteger => matches!(top, Value::Integer(_)),
            Self::IsText => matches!(top, Value::Text(_)),
            Self::IsNothing => matches!(top, Value::Nothing),
            Self::IsFrame => matches!(top, Value::Frame),
            Self::IsEmpty => matches!(top, Value::Bottom),
        }
    }
}

/// One instruction pointer and everything it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conscious {
    /// Scheduler-assigned identity; reused after death.
    pub id: usize,
    /// Current cell.
    pub position: Coord,
    /// Step applied by [`Conscious::step`].
    pub direction: Coord,
    /// General registers, `Nothing` until written.
    pub registers: [Value; REGISTER_COUNT],
    /// Target of the indirect register rules.
    pub selected: Register,
    /// Working value stack.
    pub work_stack: Stack,
    /// Return records pushed by hallway calls.
    pub call_stack: Stack,
    /// Branch predicate register.
    pub branch: Branch,
    /// Number of upcoming shifters to pass over without turning.
    pub skip: u32,
    /// In-band error code; zero when clear.
    pub error: i64,
    /// Cleared to retire the unit.
    pub alive: bool,
    /// Set to stop the whole run.
    pub halt: bool,
}

impl Conscious {
    /// Creates a live unit at `position` travelling in [`DEFAULT_DIRECTION`].
    #[must_use]
    pub fn new(id: usize, position: Coord) -> Self {
        Self {
            id,
            position,
            direction: DEFAULT_DIRECTION,
            registers: std::array::from_fn(|_| Value::Nothing),
            selected: Register::R0,
            work_stack: Stack::new(),
            call_stack: Stack::new(),
            branch: Branch::Always,
            skip: 0,
            error: 0,
            alive: true,
            halt: false,
        }
    }

    /// Current position.
    #[must_use]
    pub const fn at(&self) -> Coord {
        self.position
    }

    /// Advances one cell along `direction`.
    pub const fn step(&mut self) {
        self.position = self.peek_next_position();
    }

    /// Position one step ahead, without moving.
    #[must_use]
    pub const fn peek_next_position(&self) -> Coord {
        self.position.offset(self.direction, 1)
    }

    /// Reads a general register.
    #[must_use]
    pub const fn register(&self, register: Register) -> &Value {
        &self.registers[register.index()]
    }

    /// Writes a general register.
    pub fn set_register(&mut self, register: Register, value: Value) {
        self.registers[register.index()] = value;
    }
}

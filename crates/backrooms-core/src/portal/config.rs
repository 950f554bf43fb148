//! Scheduler configuration and fatal error surface.

use thiserror::Error;

use crate::rules::RuleError;

/// Name of the hallway the first unit starts on.
pub const GATE: &str = "GATE";

/// Knobs for one [`Portal`](super::Portal) run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PortalConfig {
    /// Scripted input lines; `None` reads standard input.
    pub inputs: Option<Vec<String>>,
    /// Input is handed over one line at a time through a [`Feeder`](super::Feeder).
    pub feeder: bool,
    /// Mirror emitted values to standard output.
    pub emit_to_stdio: bool,
    /// Keep emitted values for [`Portal::output`](super::Portal::output).
    pub capture_output: bool,
    /// Turns allowed for the whole run; `0` is unlimited.
    pub total_step_ceiling: u64,
    /// Micro-steps allowed for a single rule; `0` is unlimited.
    pub per_rule_step_ceiling: u64,
    /// Treat an unmatched blank cell as fatal.
    pub error_on_blank_cell: bool,
    /// Hand control back to the caller at every micro-step.
    pub yields: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            inputs: None,
            feeder: false,
            emit_to_stdio: true,
            capture_output: false,
            total_step_ceiling: 0,
            per_rule_step_ceiling: 0,
            error_on_blank_cell: false,
            yields: false,
        }
    }
}

impl PortalConfig {
    /// Configuration for embedding: scripted input, captured output, nothing
    /// written to the terminal.
    #[must_use]
    pub fn captured(inputs: Vec<String>) -> Self {
        Self {
            inputs: Some(inputs),
            emit_to_stdio: false,
            capture_output: true,
            ..Self::default()
        }
    }
}

/// Conditions that stop the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortalError {
    /// No hallway named `GATE` exists on any floor.
    #[error("no hallway named GATE to start from")]
    MissingGate,
    /// The total step ceiling ran out.
    #[error("lost in the backrooms: total step ceiling reached")]
    Lost,
    /// A single rule ran past the per-rule step ceiling.
    #[error("lost in a rule: per-rule step ceiling reached")]
    LostRule,
    /// A unit walked onto an empty cell with blank errors enabled.
    #[error("unit walked into empty space at ({x}, {y}, {floor})")]
    ErrorOnSpace {
        /// Column.
        x: i64,
        /// Row.
        y: i64,
        /// Floor level.
        floor: i64,
    },
    /// Scripted inputs and feeder mode were both requested.
    #[error("scripted inputs and feeder mode are mutually exclusive")]
    MultipleInputMethods,
    /// The opcode table could not be built.
    #[error(transparent)]
    RuleTable(#[from] RuleError),
}

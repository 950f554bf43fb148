//! Scheduler-owned state that rules reach through [`RuleContext::services`].
//!
//! [`RuleContext::services`]: crate::rules::RuleContext::services

use std::collections::{BTreeSet, VecDeque};
use std::io::{self, BufRead, Write};

use tracing::debug;

use super::{PortalConfig, PortalError};
use crate::{Conscious, Value};

/// Punctuation accepted from input alongside ASCII letters, digits and space.
pub const INPUT_PUNCTUATION: &str = ",<.>/?;:'\"[{]}\\|`!@#$%^&*()-_=+";

/// Returns `true` when `c` survives input filtering.
#[must_use]
pub fn is_input_character(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == ' ' || INPUT_PUNCTUATION.contains(c)
}

/// Outcome of polling for one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A filtered line.
    Ready(String),
    /// Feeder mode has nothing yet; poll again later.
    Pending,
}

/// Input slot for hosts that push lines in as the program asks for them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feeder {
    need_input: bool,
    input: Option<String>,
}

impl Feeder {
    /// Marks that a unit is waiting on input.
    pub const fn need_input(&mut self) {
        self.need_input = true;
    }

    /// Returns `true` while a unit is waiting on input.
    #[must_use]
    pub const fn wants_input(&self) -> bool {
        self.need_input
    }

    /// Takes the pending line, if any.
    pub fn get_input(&mut self) -> Option<String> {
        self.input.take()
    }

    /// Supplies the next line, replacing any line not yet consumed.
    pub fn set_input(&mut self, line: impl Into<String>) {
        self.input = Some(line.into());
        self.need_input = false;
    }
}

#[derive(Debug)]
enum InputSource {
    Stdin,
    Scripted(VecDeque<String>),
    Feeder(Feeder),
}

/// Reentrant mutual-exclusion key shared by every unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct KeyLock {
    holder: Option<usize>,
    count: u32,
}

impl KeyLock {
    /// Takes or re-enters the key for `id`; returns `false` when another
    /// unit holds it.
    pub fn try_lock(&mut self, id: usize) -> bool {
        match self.holder {
            None => {
                self.holder = Some(id);
                self.count = 1;
                true
            }
            Some(holder) if holder == id => {
                self.count = self.count.saturating_add(1);
                true
            }
            Some(_) => false,
        }
    }

    /// Leaves the key once; ignored unless `id` holds it.
    pub fn unlock(&mut self, id: usize) {
        if self.holder == Some(id) {
            self.count = self.count.saturating_sub(1);
            if self.count == 0 {
                self.holder = None;
            }
        }
    }

    /// Drops the key entirely if `id` holds it.
    pub fn release(&mut self, id: usize) {
        if self.holder == Some(id) {
            debug!(unit = id, "key released on retirement");
            self.holder = None;
            self.count = 0;
        }
    }

    /// Current holder.
    #[must_use]
    pub const fn holder(&self) -> Option<usize> {
        self.holder
    }

    /// Reentrancy depth of the current holder.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }
}

/// The run queue, id pool, I/O channels and key.
#[derive(Debug)]
pub struct Services {
    queue: VecDeque<Conscious>,
    free_ids: BTreeSet<usize>,
    next_free_id: usize,
    input: InputSource,
    emit_to_stdio: bool,
    capture_output: bool,
    output: Vec<Value>,
    key: KeyLock,
}

impl Services {
    /// Builds services for `config` with an empty queue.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::MultipleInputMethods`] when scripted inputs and
    /// feeder mode are both configured.
    pub fn new(config: &PortalConfig) -> Result<Self, PortalError> {
        let input = match (&config.inputs, config.feeder) {
            (Some(_), true) => return Err(PortalError::MultipleInputMethods),
            (Some(lines), false) => InputSource::Scripted(lines.iter().cloned().collect()),
            (None, true) => InputSource::Feeder(Feeder::default()),
            (None, false) => InputSource::Stdin,
        };
        Ok(Self {
            queue: VecDeque::new(),
            free_ids: BTreeSet::new(),
            next_free_id: 0,
            input,
            emit_to_stdio: config.emit_to_stdio,
            capture_output: config.capture_output,
            output: Vec::new(),
            key: KeyLock::default(),
        })
    }

    /// Queues `units` in order. Ids they do not use below the highest one
    /// become free.
    pub(crate) fn seed(&mut self, units: Vec<Conscious>) {
        let used: BTreeSet<usize> = units.iter().map(|unit| unit.id).collect();
        self.next_free_id = used.last().map_or(0, |&top| top + 1);
        self.free_ids = (0..self.next_free_id)
            .filter(|id| !used.contains(id))
            .collect();
        self.queue = units.into();
    }

    /// Smallest id not owned by a live unit.
    pub(crate) fn allocate_id(&mut self) -> usize {
        if let Some(id) = self.free_ids.pop_first() {
            return id;
        }
        let id = self.next_free_id;
        self.next_free_id += 1;
        id
    }

    /// Queues a deep copy of `parent` under a fresh id and returns that id.
    /// The copy finds `Nothing` on top of its work stack.
    pub fn spawn_unit(&mut self, parent: &Conscious) -> usize {
        let id = self.allocate_id();
        let mut child = parent.clone();
        child.id = id;
        child.work_stack.push(Value::Nothing);
        debug!(parent = parent.id, child = id, "spawned unit");
        self.queue.push_back(child);
        id
    }

    /// Frees `unit`'s id and any key it holds.
    pub(crate) fn retire(&mut self, unit: &Conscious) {
        debug!(unit = unit.id, halted = unit.halt, "retired unit");
        self.key.release(unit.id);
        if unit.id + 1 == self.next_free_id {
            self.next_free_id = unit.id;
            while let Some(below) = self.next_free_id.checked_sub(1) {
                if !self.free_ids.remove(&below) {
                    break;
                }
                self.next_free_id = below;
            }
        } else if unit.id < self.next_free_id {
            self.free_ids.insert(unit.id);
        }
    }

    pub(crate) fn pop_front(&mut self) -> Option<Conscious> {
        self.queue.pop_front()
    }

    pub(crate) fn push_back(&mut self, unit: Conscious) {
        self.queue.push_back(unit);
    }

    /// Units waiting for a turn, front first.
    pub fn queued(&self) -> impl Iterator<Item = &Conscious> + '_ {
        self.queue.iter()
    }

    /// Number of queued units.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// One filtered input line, or [`Input::Pending`] when the feeder is empty.
    pub fn read_input(&mut self) -> Input {
        let line = match &mut self.input {
            InputSource::Stdin => {
                let mut line = String::new();
                // End of input and read failures both read as an empty line.
                if io::stdin().lock().read_line(&mut line).is_err() {
                    line.clear();
                }
                line
            }
            InputSource::Scripted(lines) => lines.pop_front().unwrap_or_default(),
            InputSource::Feeder(feeder) => match feeder.get_input() {
                Some(line) => line,
                None => {
                    feeder.need_input();
                    return Input::Pending;
                }
            },
        };
        Input::Ready(line.chars().filter(|&c| is_input_character(c)).collect())
    }

    /// Emits `value` to the configured sinks.
    pub fn write_output(&mut self, value: Value) {
        if self.emit_to_stdio {
            let mut stdout = io::stdout().lock();
            // A closed stdout must not stop the program.
            let _ = write!(stdout, "{value}");
            let _ = stdout.flush();
        }
        if self.capture_output {
            self.output.push(value);
        }
    }

    /// Values captured so far.
    #[must_use]
    pub fn output(&self) -> &[Value] {
        &self.output
    }

    /// The shared key.
    #[must_use]
    pub const fn key(&self) -> &KeyLock {
        &self.key
    }

    /// Mutable access to the shared key.
    pub const fn key_mut(&mut self) -> &mut KeyLock {
        &mut self.key
    }

    /// The feeder slot when running in feeder mode.
    #[must_use]
    pub const fn feeder(&self) -> Option<&Feeder> {
        match &self.input {
            InputSource::Feeder(feeder) => Some(feeder),
            _ => None,
        }
    }

    /// Mutable feeder slot when running in feeder mode.
    pub fn feeder_mut(&mut self) -> Option<&mut Feeder> {
        match &mut self.input {
            InputSource::Feeder(feeder) => Some(feeder),
            _ => None,
        }
    }
}

#[cfg(test)]
impl Services {
    /// Captured output, no terminal, empty script; id 0 is taken.
    pub(crate) fn for_tests() -> Self {
        Self::for_tests_with_inputs(&[])
    }

    pub(crate) fn for_tests_with_inputs(inputs: &[&str]) -> Self {
        let config = PortalConfig::captured(inputs.iter().map(ToString::to_string).collect());
        let mut services = Self::new(&config).unwrap();
        services.next_free_id = 1;
        services
    }
}

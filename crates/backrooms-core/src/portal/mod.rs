//! The scheduler: round-robin turns over every live unit.
//!
//! A turn pops the front unit, looks up the rule under it and drives that
//! rule's activation to completion. Callers that want to watch a rule work
//! can split a turn with [`Portal::begin_rule`] and [`Portal::resume_rule`];
//! every micro-step is counted against the per-rule ceiling either way.

mod config;
mod services;

pub use config::{PortalConfig, PortalError, GATE};
pub use services::{is_input_character, Feeder, Input, KeyLock, Services, INPUT_PUNCTUATION};

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::rules::{built_in_rules, Activation, MicroStep, Rule, RuleContext, RuleTable};
use crate::{Conscious, Coord, Rooms, BLANK};

/// Why [`Portal::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// No unit is left to schedule, or one of them halted.
    Done,
    /// A unit is waiting on the feeder; supply input and run again.
    WaitingForInput,
}

struct ActiveTurn {
    unit: Conscious,
    entry: Coord,
    activation: Option<Box<dyn Activation>>,
    steps: u64,
}

/// A rule interrupted by a feeder poll, picked up on the unit's next turn.
struct Parked {
    entry: Coord,
    activation: Box<dyn Activation>,
    steps: u64,
}

/// Owns the plane, the units and the opcode table for one run.
pub struct Portal {
    rooms: Rooms,
    services: Services,
    rules: RuleTable,
    per_rule_ceiling: u64,
    remaining_total: Option<u64>,
    error_on_blank: bool,
    yields: bool,
    active: Option<ActiveTurn>,
    parked: HashMap<usize, Parked>,
    visuals: Vec<Coord>,
    waiting: bool,
    done: bool,
}

impl Portal {
    /// Starts one unit at the `GATE` hallway with the built-in rules.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::MissingGate`] when no floor has a `GATE`
    /// hallway, or [`PortalError::MultipleInputMethods`] for a conflicting
    /// input configuration.
    pub fn new(rooms: Rooms, config: &PortalConfig) -> Result<Self, PortalError> {
        Self::with_rules(rooms, config, built_in_rules()?)
    }

    /// Like [`Portal::new`] with a caller-supplied root opcode table.
    ///
    /// # Errors
    ///
    /// As [`Portal::new`], plus [`PortalError::RuleTable`] when two rules
    /// share a start character.
    pub fn with_rules(
        rooms: Rooms,
        config: &PortalConfig,
        rules: Vec<Box<dyn Rule>>,
    ) -> Result<Self, PortalError> {
        let (y, floor) = rooms.find_a_hallway(GATE).ok_or_else(|| {
            warn!("no {GATE} hallway");
            PortalError::MissingGate
        })?;
        let first = Conscious::new(0, Coord::new(0, y, floor));
        Self::from_parts(rooms, config, rules, vec![first])
    }

    /// Seeds the queue with `units` instead of locating `GATE`.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::MultipleInputMethods`] for a conflicting input
    /// configuration.
    pub fn with_consciouses(
        rooms: Rooms,
        config: &PortalConfig,
        units: Vec<Conscious>,
    ) -> Result<Self, PortalError> {
        Self::from_parts(rooms, config, built_in_rules()?, units)
    }

    fn from_parts(
        rooms: Rooms,
        config: &PortalConfig,
        rules: Vec<Box<dyn Rule>>,
        units: Vec<Conscious>,
    ) -> Result<Self, PortalError> {
        let mut services = Services::new(config)?;
        let done = units.is_empty();
        services.seed(units);
        Ok(Self {
            rooms,
            services,
            rules: RuleTable::new(rules)?,
            per_rule_ceiling: config.per_rule_step_ceiling,
            remaining_total: (config.total_step_ceiling > 0).then_some(config.total_step_ceiling),
            error_on_blank: config.error_on_blank_cell,
            yields: config.yields,
            active: None,
            parked: HashMap::new(),
            visuals: Vec::new(),
            waiting: false,
            done,
        })
    }

    /// Starts the next unit's turn. Returns `false` once the run is done.
    ///
    /// Does nothing while a turn is already in progress.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::ErrorOnSpace`] when blank errors are enabled
    /// and the unit stands on an empty cell.
    pub fn begin_rule(&mut self) -> Result<bool, PortalError> {
        if self.active.is_some() {
            return Ok(true);
        }
        if self.done {
            return Ok(false);
        }
        self.waiting = false;
        self.visuals.clear();
        let Some(unit) = self.services.pop_front() else {
            debug!("no units left");
            self.done = true;
            return Ok(false);
        };
        let at = unit.at();
        self.visuals.push(at);

        if let Some(parked) = self.parked.remove(&unit.id) {
            trace!(unit = unit.id, "resuming parked rule");
            self.active = Some(ActiveTurn {
                unit,
                entry: parked.entry,
                activation: Some(parked.activation),
                steps: parked.steps,
            });
            return Ok(true);
        }

        let character = self.rooms.read(at);
        let activation = self.rules.get(character).map(|rule| rule.activate());
        trace!(unit = unit.id, %character, matched = activation.is_some(), "rule");
        if activation.is_none() && character == BLANK && self.error_on_blank {
            warn!(unit = unit.id, ?at, "walked into empty space");
            self.done = true;
            return Err(PortalError::ErrorOnSpace {
                x: at.x,
                y: at.y,
                floor: at.floor,
            });
        }
        self.active = Some(ActiveTurn {
            unit,
            entry: at,
            activation,
            steps: 0,
        });
        Ok(true)
    }

    /// Drives the current rule to its next pause.
    ///
    /// Returns `Some(micro_step)` while the rule is suspended and `None` once
    /// the turn is over. Without yields a whole rule runs in one call.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::LostRule`] when the rule reaches the per-rule
    /// ceiling and [`PortalError::Lost`] when the turn exhausts the total
    /// ceiling.
    pub fn resume_rule(&mut self) -> Result<Option<u64>, PortalError> {
        let Some(turn) = self.active.as_mut() else {
            return Ok(None);
        };
        let Some(activation) = turn.activation.as_mut() else {
            turn.unit.step();
            return self.finish_turn().map(|()| None);
        };

        if turn.steps == 0 {
            if let Err(error) = count_step(&mut turn.steps, self.per_rule_ceiling) {
                self.done = true;
                return Err(error);
            }
            if self.yields {
                return Ok(Some(turn.steps));
            }
        }

        loop {
            let mut ctx = RuleContext::new(
                &mut self.rooms,
                &mut turn.unit,
                &mut self.services,
                turn.entry,
                &mut self.visuals,
            );
            let outcome = activation.resume(&mut ctx);
            if outcome == MicroStep::Finished {
                return self.finish_turn().map(|()| None);
            }
            if let Err(error) = count_step(&mut turn.steps, self.per_rule_ceiling) {
                self.done = true;
                return Err(error);
            }
            trace!(unit = turn.unit.id, step = turn.steps, ?outcome, "micro-step");
            if outcome == MicroStep::Blocked {
                return self.park().map(|()| None);
            }
            if self.yields {
                return Ok(Some(turn.steps));
            }
        }
    }

    /// Runs one whole turn.
    ///
    /// # Errors
    ///
    /// Propagates the fatal conditions of [`Portal::begin_rule`] and
    /// [`Portal::resume_rule`].
    pub fn turn(&mut self) -> Result<(), PortalError> {
        if !self.begin_rule()? {
            return Ok(());
        }
        while self.resume_rule()?.is_some() {}
        Ok(())
    }

    /// Runs turns until the program is done or waits on the feeder.
    ///
    /// # Errors
    ///
    /// Returns the first fatal condition hit by a turn.
    pub fn run(&mut self) -> Result<RunState, PortalError> {
        loop {
            self.turn()?;
            if self.done {
                return Ok(RunState::Done);
            }
            if self.waiting {
                return Ok(RunState::WaitingForInput);
            }
        }
    }

    fn park(&mut self) -> Result<(), PortalError> {
        if let Some(ActiveTurn {
            unit,
            entry,
            activation: Some(activation),
            steps,
        }) = self.active.take()
        {
            trace!(unit = unit.id, "parked on input");
            self.parked.insert(
                unit.id,
                Parked {
                    entry,
                    activation,
                    steps,
                },
            );
            self.services.push_back(unit);
            self.waiting = true;
        }
        self.spend_turn()
    }

    fn finish_turn(&mut self) -> Result<(), PortalError> {
        if let Some(ActiveTurn { unit, .. }) = self.active.take() {
            if unit.halt {
                debug!(unit = unit.id, "halted");
                self.services.retire(&unit);
                self.done = true;
            } else if unit.alive {
                self.services.push_back(unit);
            } else {
                self.services.retire(&unit);
                if self.services.queue_len() == 0 {
                    self.done = true;
                }
            }
        }
        self.spend_turn()
    }

    fn spend_turn(&mut self) -> Result<(), PortalError> {
        let Some(remaining) = self.remaining_total.as_mut() else {
            return Ok(());
        };
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            warn!("total step ceiling reached");
            self.done = true;
            return Err(PortalError::Lost);
        }
        Ok(())
    }

    /// Returns `true` once the run has ended.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.done
    }

    /// Returns `true` when the last turn ended waiting on the feeder.
    #[must_use]
    pub const fn is_waiting_for_input(&self) -> bool {
        self.waiting
    }

    /// The memory plane.
    #[must_use]
    pub const fn rooms(&self) -> &Rooms {
        &self.rooms
    }

    /// Mutable memory plane, for hosts that patch a program between turns.
    pub const fn rooms_mut(&mut self) -> &mut Rooms {
        &mut self.rooms
    }

    /// Every live unit: the one mid-turn first, then the queue in order.
    pub fn consciouses(&self) -> impl Iterator<Item = &Conscious> + '_ {
        self.active
            .iter()
            .map(|turn| &turn.unit)
            .chain(self.services.queued())
    }

    /// Values captured so far.
    #[must_use]
    pub fn output(&self) -> &[crate::Value] {
        self.services.output()
    }

    /// Cells visited by the current or most recent rule, entry first.
    #[must_use]
    pub fn step_visuals(&self) -> &[Coord] {
        &self.visuals
    }

    /// Scheduler services: queue, key and I/O.
    #[must_use]
    pub const fn services(&self) -> &Services {
        &self.services
    }

    /// The feeder slot when running in feeder mode.
    #[must_use]
    pub const fn feeder(&self) -> Option<&Feeder> {
        self.services.feeder()
    }

    /// Mutable feeder slot when running in feeder mode.
    pub fn feeder_mut(&mut self) -> Option<&mut Feeder> {
        self.services.feeder_mut()
    }
}

fn count_step(steps: &mut u64, ceiling: u64) -> Result<(), PortalError> {
    *steps += 1;
    if ceiling > 0 && *steps >= ceiling {
        warn!(steps = *steps, "per-rule step ceiling reached");
        return Err(PortalError::LostRule);
    }
    Ok(())
}

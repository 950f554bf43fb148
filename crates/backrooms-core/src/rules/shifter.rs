use tracing::trace;

use super::{Activation, MicroStep, Rule, RuleContext};
use crate::{Branch, Coord};

/// Characters of the shifter family; any of them ends a fenced scan.
pub const SHIFTERS: [char; 6] = ['>', '<', '^', 'V', '}', '{'];

/// Inside a fenced scan, lets the next shifter character pass.
pub const ESCAPE: char = '!';

/// Directional rule gated by the branch predicate.
///
/// When the cell reached after turning repeats the shifter's own character,
/// the unit keeps walking (recording every cell) until it lands on another
/// shifter character that no [`ESCAPE`] has excused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shifter {
    character: char,
    direction: Coord,
}

impl Shifter {
    /// Builds a shifter that turns toward `direction`.
    #[must_use]
    pub const fn new(character: char, direction: Coord) -> Self {
        Self {
            character,
            direction,
        }
    }

    /// The six built-in shifters.
    #[must_use]
    pub const fn all() -> [Self; 6] {
        [
            Self::new('>', Coord::new(1, 0, 0)),
            Self::new('<', Coord::new(-1, 0, 0)),
            Self::new('^', Coord::new(0, 1, 0)),
            Self::new('V', Coord::new(0, -1, 0)),
            Self::new('}', Coord::new(0, 0, -1)),
            Self::new('{', Coord::new(0, 0, 1)),
        ]
    }
}

impl Rule for Shifter {
    fn start_character(&self) -> char {
        self.character
    }

    fn activate(&self) -> Box<dyn Activation> {
        Box::new(ShifterActivation {
            shifter: *self,
            scanning: false,
            escapes: 0,
        })
    }
}

struct ShifterActivation {
    shifter: Shifter,
    scanning: bool,
    escapes: u32,
}

impl ShifterActivation {
    fn turn(&self, ctx: &mut RuleContext<'_>) -> MicroStep {
        let unit = &mut *ctx.conscious;
        if unit.skip > 0 {
            unit.skip -= 1;
            unit.step();
            return MicroStep::Finished;
        }

        let taken = unit.branch.holds(unit.work_stack.peek());
        unit.branch = Branch::Always;
        if !taken {
            unit.step();
            return MicroStep::Finished;
        }

        unit.direction = self.shifter.direction;
        unit.step();
        if ctx.read() == self.shifter.character {
            trace!(shifter = %self.shifter.character, "fenced scan");
            ctx.record();
            MicroStep::Paused
        } else {
            MicroStep::Finished
        }
    }

    fn scan(&mut self, ctx: &mut RuleContext<'_>) -> MicroStep {
        ctx.step();
        let character = ctx.read();
        if character == ESCAPE {
            self.escapes += 1;
        } else if SHIFTERS.contains(&character) {
            if self.escapes == 0 {
                return MicroStep::Finished;
            }
            self.escapes -= 1;
        }
        ctx.record();
        MicroStep::Paused
    }
}

impl Activation for ShifterActivation {
    fn resume(&mut self, ctx: &mut RuleContext<'_>) -> MicroStep {
        if self.scanning {
            return self.scan(ctx);
        }
        let outcome = self.turn(ctx);
        self.scanning = outcome == MicroStep::Paused;
        outcome
    }
}

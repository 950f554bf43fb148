//! Character-keyed rule dispatch with resumable micro-steps.
//!
//! A [`Rule`] is found by the character under a unit. Activating it yields an
//! [`Activation`], a small state machine the scheduler drives one micro-step
//! at a time. [`RuleModule`] nests a private [`RuleTable`] behind one
//! character to build multi-character opcodes.

use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::portal::Services;
use crate::{Conscious, Coord, ErrorCode, Rooms, Stack};

mod catalog;
mod hallway;
mod literal;
mod numeric;
mod registers;
mod shifter;
mod stack_ops;
mod thread;
mod uncommon;

pub use catalog::built_in_rules;
pub use shifter::{Shifter, ESCAPE, SHIFTERS};

/// Number of addressable start characters (`U+0000..=U+00FF`).
pub const RULE_TABLE_SIZE: usize = 256;

/// Result of resuming an activation once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MicroStep {
    /// Suspended after an observable sub-action.
    Paused,
    /// Suspended waiting on external input; the driver should hand control back.
    Blocked,
    /// The rule is complete.
    Finished,
}

/// Construction errors for dispatch tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RuleError {
    /// Two rules in one table share a start character.
    #[error("start character {0:?} is registered twice")]
    StartCharacterCollision(char),
    /// Start character cannot be stored in a cell.
    #[error("start character {0:?} is outside the cell range")]
    BadStartCharacter(char),
}

/// Everything a rule may touch while it runs.
pub struct RuleContext<'a> {
    /// The shared memory plane.
    pub rooms: &'a mut Rooms,
    /// The unit executing the rule.
    pub conscious: &'a mut Conscious,
    /// Scheduler services (spawn, input, output, lock).
    pub services: &'a mut Services,
    entry: Coord,
    visuals: &'a mut Vec<Coord>,
}

impl<'a> RuleContext<'a> {
    /// Bundles the borrowed state for one resume.
    pub fn new(
        rooms: &'a mut Rooms,
        conscious: &'a mut Conscious,
        services: &'a mut Services,
        entry: Coord,
        visuals: &'a mut Vec<Coord>,
    ) -> Self {
        Self {
            rooms,
            conscious,
            services,
            entry,
            visuals,
        }
    }

    /// Position of the unit when the rule was entered.
    #[must_use]
    pub const fn entry(&self) -> Coord {
        self.entry
    }

    /// Character under the unit.
    #[must_use]
    pub fn read(&self) -> char {
        self.rooms.read(self.conscious.position)
    }

    /// Moves the unit one cell.
    pub const fn step(&mut self) {
        self.conscious.step();
    }

    /// Records the unit's cell in the visited list.
    pub fn record(&mut self) {
        self.visuals.push(self.conscious.position);
    }

    /// Steps onto the next cell of the instruction and pauses there.
    pub fn advance(&mut self) -> MicroStep {
        self.step();
        self.record();
        MicroStep::Paused
    }

    /// Sets the unit's error register.
    pub const fn fail(&mut self, code: ErrorCode) {
        self.conscious.error = code.as_i64();
    }

    /// The unit's working stack.
    pub const fn stack(&mut self) -> &mut Stack {
        &mut self.conscious.work_stack
    }
}

/// An opcode identified by a single start character.
pub trait Rule: fmt::Debug {
    /// Character that selects this rule.
    fn start_character(&self) -> char;

    /// Starts a fresh invocation.
    fn activate(&self) -> Box<dyn Activation>;
}

/// One in-flight rule invocation.
pub trait Activation {
    /// Runs until the next micro-step boundary.
    fn resume(&mut self, ctx: &mut RuleContext<'_>) -> MicroStep;
}

/// Fixed table from start character to rule.
pub struct RuleTable {
    slots: [Option<Box<dyn Rule>>; RULE_TABLE_SIZE],
}

impl RuleTable {
    /// Builds a table, rejecting duplicate start characters.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::StartCharacterCollision`] when two rules share a
    /// character and [`RuleError::BadStartCharacter`] for characters above
    /// `U+00FF`.
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Result<Self, RuleError> {
        let mut slots: [Option<Box<dyn Rule>>; RULE_TABLE_SIZE] = std::array::from_fn(|_| None);
        for rule in rules {
            let character = rule.start_character();
            let index = usize::try_from(u32::from(character))
                .ok()
                .filter(|&index| index < RULE_TABLE_SIZE)
                .ok_or(RuleError::BadStartCharacter(character))?;
            if slots[index].is_some() {
                return Err(RuleError::StartCharacterCollision(character));
            }
            slots[index] = Some(rule);
        }
        Ok(Self { slots })
    }

    /// Rule registered for `character`.
    #[must_use]
    pub fn get(&self, character: char) -> Option<&dyn Rule> {
        usize::try_from(u32::from(character))
            .ok()
            .and_then(|index| self.slots.get(index))
            .and_then(|slot| slot.as_deref())
    }

    /// Registered start characters in code point order.
    pub fn start_characters(&self) -> impl Iterator<Item = char> + '_ {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_ref().map(|rule| rule.start_character()))
    }

    /// Number of registered rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Returns `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for RuleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.start_characters()).finish()
    }
}

/// A rule that consumes its own character and dispatches the next one to a
/// private child table. An unmatched second character leaves the unit on it.
#[derive(Debug, Clone)]
pub struct RuleModule {
    character: char,
    children: Rc<RuleTable>,
}

impl RuleModule {
    /// Builds a module over `children`.
    ///
    /// # Errors
    ///
    /// Returns a [`RuleError`] when the child table is malformed.
    pub fn new(character: char, children: Vec<Box<dyn Rule>>) -> Result<Self, RuleError> {
        Ok(Self {
            character,
            children: Rc::new(RuleTable::new(children)?),
        })
    }

    /// The child dispatch table.
    #[must_use]
    pub fn children(&self) -> &RuleTable {
        &self.children
    }
}

impl Rule for RuleModule {
    fn start_character(&self) -> char {
        self.character
    }

    fn activate(&self) -> Box<dyn Activation> {
        Box::new(ModuleActivation {
            children: Rc::clone(&self.children),
            stage: ModuleStage::Enter,
        })
    }
}

enum ModuleStage {
    Enter,
    Probe,
    Delegate(Box<dyn Activation>),
}

struct ModuleActivation {
    children: Rc<RuleTable>,
    stage: ModuleStage,
}

impl Activation for ModuleActivation {
    fn resume(&mut self, ctx: &mut RuleContext<'_>) -> MicroStep {
        match &mut self.stage {
            ModuleStage::Enter => {
                self.stage = ModuleStage::Probe;
                ctx.advance()
            }
            ModuleStage::Probe => {
                let Some(rule) = self.children.get(ctx.read()) else {
                    return MicroStep::Finished;
                };
                let mut child = rule.activate();
                let outcome = child.resume(ctx);
                self.stage = ModuleStage::Delegate(child);
                outcome
            }
            ModuleStage::Delegate(child) => child.resume(ctx),
        }
    }
}

/// A rule whose whole effect happens in one resume.
///
/// The body is responsible for moving the unit.
#[derive(Clone, Copy)]
pub struct Instruction {
    character: char,
    body: fn(&mut RuleContext<'_>),
}

impl Instruction {
    /// Wraps `body` under `character`.
    #[must_use]
    pub const fn new(character: char, body: fn(&mut RuleContext<'_>)) -> Self {
        Self { character, body }
    }

    /// Boxes the instruction for a rule list.
    #[must_use]
    pub fn boxed(character: char, body: fn(&mut RuleContext<'_>)) -> Box<dyn Rule> {
        Box::new(Self::new(character, body))
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Instruction").field(&self.character).finish()
    }
}

impl Rule for Instruction {
    fn start_character(&self) -> char {
        self.character
    }

    fn activate(&self) -> Box<dyn Activation> {
        Box::new(Once(Some(self.body)))
    }
}

struct Once(Option<fn(&mut RuleContext<'_>)>);

impl Activation for Once {
    fn resume(&mut self, ctx: &mut RuleContext<'_>) -> MicroStep {
        if let Some(body) = self.0.take() {
            body(ctx);
        }
        MicroStep::Finished
    }
}

/// Pops an integer operand, flagging the error register on failure.
pub(crate) fn pop_integer(ctx: &mut RuleContext<'_>) -> Option<i64> {
    match ctx.stack().pop() {
        crate::Value::Integer(value) => Some(value),
        crate::Value::Bottom => {
            ctx.fail(ErrorCode::StackEmpty);
            None
        }
        _ => {
            ctx.fail(ErrorCode::TypeMismatch);
            None
        }
    }
}

/// Pops a text operand, flagging the error register on failure.
pub(crate) fn pop_text(ctx: &mut RuleContext<'_>) -> Option<String> {
    match ctx.stack().pop() {
        crate::Value::Text(text) => Some(text),
        crate::Value::Bottom => {
            ctx.fail(ErrorCode::StackEmpty);
            None
        }
        _ => {
            ctx.fail(ErrorCode::TypeMismatch);
            None
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::Harness;
    use super::{Instruction, Rule, RuleContext, RuleError, RuleModule, RuleTable};
    use crate::{Coord, Value};

    fn push_one(ctx: &mut RuleContext<'_>) {
        ctx.stack().push(Value::Integer(1));
        ctx.step();
    }

    fn push_two(ctx: &mut RuleContext<'_>) {
        ctx.stack().push(Value::Integer(2));
        ctx.step();
    }

    #[test]
    fn table_rejects_duplicate_start_characters() {
        let result = RuleTable::new(vec![
            Instruction::boxed('a', push_one),
            Instruction::boxed('a', push_two),
        ]);
        assert_eq!(
            result.err(),
            Some(RuleError::StartCharacterCollision('a'))
        );
    }

    #[test]
    fn table_rejects_wide_start_characters() {
        let result = RuleTable::new(vec![Instruction::boxed('\u{263A}', push_one)]);
        assert_eq!(result.err(), Some(RuleError::BadStartCharacter('\u{263A}')));
    }

    #[test]
    fn module_rejects_duplicate_children() {
        let result = RuleModule::new(
            'm',
            vec![
                Instruction::boxed('x', push_one),
                Instruction::boxed('x', push_two),
            ],
        );
        assert_eq!(result.err(), Some(RuleError::StartCharacterCollision('x')));
    }

    #[test]
    fn table_lookup_and_listing() {
        let table = RuleTable::new(vec![
            Instruction::boxed('b', push_two),
            Instruction::boxed('a', push_one),
        ])
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.start_characters().collect::<String>(), "ab");
        assert!(table.get('c').is_none());
        assert_eq!(table.get('a').map(|rule| rule.start_character()), Some('a'));
    }

    #[test]
    fn module_dispatches_second_character() {
        let module = RuleModule::new(
            'm',
            vec![
                Instruction::boxed('x', push_one),
                Instruction::boxed('y', push_two),
            ],
        )
        .unwrap();
        let mut harness = Harness::new("my.");
        let pauses = harness.run(&module);
        assert_eq!(pauses, 1);
        assert_eq!(harness.unit.work_stack.pop(), Value::Integer(2));
        assert_eq!(harness.unit.at(), Coord::new(2, 0, 0));
        assert_eq!(
            harness.visuals,
            vec![Coord::new(0, 0, 0), Coord::new(1, 0, 0)]
        );
    }

    #[test]
    fn module_without_matching_child_stops_on_it() {
        let module = RuleModule::new('m', vec![Instruction::boxed('x', push_one)]).unwrap();
        let mut harness = Harness::new("mq");
        harness.run(&module);
        assert!(harness.unit.work_stack.is_empty());
        assert_eq!(harness.unit.at(), Coord::new(1, 0, 0));
    }

    #[test]
    fn modules_nest() {
        let inner = RuleModule::new('i', vec![Instruction::boxed('x', push_one)]).unwrap();
        let outer = RuleModule::new('o', vec![Box::new(inner)]).unwrap();
        let mut harness = Harness::new("oix");
        assert_eq!(harness.run(&outer), 2);
        assert_eq!(harness.unit.work_stack.pop(), Value::Integer(1));
        assert_eq!(harness.unit.at(), Coord::new(3, 0, 0));
    }
}

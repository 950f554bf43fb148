//! Single-character root rules: stack shuffles, I/O, predicates and hops.

use super::{Activation, Instruction, MicroStep, Rule, RuleContext};
use crate::portal::Input;
use crate::{Branch, ErrorCode, Value};

/// Root-level rules defined in this module.
pub(super) fn rules() -> Vec<Box<dyn Rule>> {
    let mut rules: Vec<Box<dyn Rule>> = vec![
        Instruction::boxed('e', echo),
        Instruction::boxed('p', pop),
        Instruction::boxed('d', duplicate),
        Instruction::boxed('z', swap),
        Instruction::boxed('=', equal),
        Instruction::boxed('!', skip),
        Box::new(Cite),
    ];
    rules.extend(
        PREDICATES
            .iter()
            .map(|&(character, branch)| Box::new(Predicate { character, branch }) as Box<dyn Rule>),
    );
    rules.extend((1..=9).map(|distance| Box::new(Hop { distance }) as Box<dyn Rule>));
    rules
}

const PREDICATES: [(char, Branch); 9] = [
    ('C', Branch::Always),
    ('P', Branch::Positive),
    ('Z', Branch::Zero),
    ('N', Branch::Negative),
    ('I', Branch::IsInteger),
    ('S', Branch::IsText),
    ('X', Branch::IsNothing),
    ('F', Branch::IsFrame),
    ('E', Branch::IsEmpty),
];

fn echo(ctx: &mut RuleContext<'_>) {
    let value = ctx.stack().peek().clone();
    ctx.services.write_output(value);
    ctx.step();
}

fn pop(ctx: &mut RuleContext<'_>) {
    if ctx.stack().pop() == Value::Bottom {
        ctx.fail(ErrorCode::StackEmpty);
    }
    ctx.step();
}

fn duplicate(ctx: &mut RuleContext<'_>) {
    let top = ctx.stack().peek().clone();
    if top == Value::Bottom {
        ctx.fail(ErrorCode::StackEmpty);
    } else {
        ctx.stack().push(top);
    }
    ctx.step();
}

fn swap(ctx: &mut RuleContext<'_>) {
    if ctx.stack().len() < 2 {
        ctx.fail(ErrorCode::StackEmpty);
    } else {
        let first = ctx.stack().pop();
        let second = ctx.stack().pop();
        ctx.stack().push(first);
        ctx.stack().push(second);
    }
    ctx.step();
}

fn equal(ctx: &mut RuleContext<'_>) {
    let right = ctx.stack().pop();
    let left = ctx.stack().pop();
    if right == Value::Bottom || left == Value::Bottom {
        ctx.fail(ErrorCode::StackEmpty);
    } else {
        ctx.stack().push(Value::Integer(i64::from(left == right)));
    }
    ctx.step();
}

fn skip(ctx: &mut RuleContext<'_>) {
    ctx.conscious.skip = ctx.conscious.skip.saturating_add(1);
    ctx.step();
}

#[derive(Debug)]
struct Predicate {
    character: char,
    branch: Branch,
}

impl Rule for Predicate {
    fn start_character(&self) -> char {
        self.character
    }

    fn activate(&self) -> Box<dyn Activation> {
        Box::new(SetBranch(self.branch))
    }
}

struct SetBranch(Branch);

impl Activation for SetBranch {
    fn resume(&mut self, ctx: &mut RuleContext<'_>) -> MicroStep {
        ctx.conscious.branch = self.0;
        ctx.step();
        MicroStep::Finished
    }
}

/// Jumps over the next `distance` cells.
#[derive(Debug)]
struct Hop {
    distance: u32,
}

impl Rule for Hop {
    fn start_character(&self) -> char {
        char::from_digit(self.distance, 10).unwrap_or('0')
    }

    fn activate(&self) -> Box<dyn Activation> {
        Box::new(Hopping(self.distance))
    }
}

struct Hopping(u32);

impl Activation for Hopping {
    fn resume(&mut self, ctx: &mut RuleContext<'_>) -> MicroStep {
        for _ in 0..self.0 {
            ctx.step();
            ctx.record();
        }
        ctx.step();
        MicroStep::Finished
    }
}

/// Reads one line of input as text, pausing while none is available.
#[derive(Debug)]
struct Cite;

impl Rule for Cite {
    fn start_character(&self) -> char {
        'c'
    }

    fn activate(&self) -> Box<dyn Activation> {
        Box::new(Citing)
    }
}

struct Citing;

impl Activation for Citing {
    fn resume(&mut self, ctx: &mut RuleContext<'_>) -> MicroStep {
        match ctx.services.read_input() {
            Input::Pending => MicroStep::Blocked,
            Input::Ready(line) => {
                ctx.stack().push(Value::Text(line));
                ctx.step();
                MicroStep::Finished
            }
        }
    }
}

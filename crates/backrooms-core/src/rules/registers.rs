//! Register keep/load (`k`, `l`) and frame (`f`) modules.

use super::{
    pop_integer, Activation, Instruction, MicroStep, Rule, RuleContext, RuleError, RuleModule,
};
use crate::{ErrorCode, Register, Value};

/// Builds the `k` module: pop the top into a register.
pub(super) fn keep_module() -> Result<RuleModule, RuleError> {
    let mut children = register_rules(Access::Keep);
    children.push(Instruction::boxed('s', select));
    children.push(Instruction::boxed('e', keep_error));
    RuleModule::new('k', children)
}

/// Builds the `l` module: push a copy of a register.
pub(super) fn load_module() -> Result<RuleModule, RuleError> {
    let mut children = register_rules(Access::Load);
    children.push(Instruction::boxed('e', |ctx| {
        let code = ctx.conscious.error;
        ctx.stack().push(Value::Integer(code));
        ctx.step();
    }));
    RuleModule::new('l', children)
}

/// Builds the `f` module.
pub(super) fn frame_module() -> Result<RuleModule, RuleError> {
    RuleModule::new(
        'f',
        vec![
            Instruction::boxed('p', |ctx| {
                ctx.stack().pop_frame();
                ctx.step();
            }),
            Instruction::boxed('c', |ctx| {
                ctx.stack().clear();
                ctx.step();
            }),
        ],
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Keep,
    Load,
}

/// `0`..`9` name a register directly; `i` goes through the selected one.
#[derive(Debug, Clone, Copy)]
struct RegisterRule {
    character: char,
    register: Option<Register>,
    access: Access,
}

fn register_rules(access: Access) -> Vec<Box<dyn Rule>> {
    Register::ALL
        .iter()
        .zip('0'..='9')
        .map(|(&register, character)| RegisterRule {
            character,
            register: Some(register),
            access,
        })
        .chain([RegisterRule {
            character: 'i',
            register: None,
            access,
        }])
        .map(|rule| Box::new(rule) as Box<dyn Rule>)
        .collect()
}

impl Rule for RegisterRule {
    fn start_character(&self) -> char {
        self.character
    }

    fn activate(&self) -> Box<dyn Activation> {
        Box::new(*self)
    }
}

impl Activation for RegisterRule {
    fn resume(&mut self, ctx: &mut RuleContext<'_>) -> MicroStep {
        let register = self.register.unwrap_or(ctx.conscious.selected);
        match self.access {
            Access::Keep => keep(ctx, register),
            Access::Load => load(ctx, register),
        }
        MicroStep::Finished
    }
}

fn keep(ctx: &mut RuleContext<'_>, register: Register) {
    let value = ctx.stack().pop();
    if value == Value::Bottom {
        ctx.fail(ErrorCode::StackEmpty);
    } else {
        ctx.conscious.set_register(register, value);
    }
    ctx.step();
}

fn load(ctx: &mut RuleContext<'_>, register: Register) {
    let value = ctx.conscious.register(register).clone();
    ctx.stack().push(value);
    ctx.step();
}

fn select(ctx: &mut RuleContext<'_>) {
    ctx.step();
    let Some(index) = pop_integer(ctx) else { return };
    match Register::from_index(index) {
        Some(register) => ctx.conscious.selected = register,
        None => ctx.fail(ErrorCode::BadValue),
    }
}

fn keep_error(ctx: &mut RuleContext<'_>) {
    ctx.step();
    if let Some(code) = pop_integer(ctx) {
        ctx.conscious.error = code;
    }
}

//! Uncommon operations: the `~` module.
//!
//! `~ha` raises the global halt flag. `~w` and `~r` patch or inspect the
//! plane at an offset from the `~` cell along the unit's direction, which is
//! how programs rewrite their own code.

use tracing::debug;

use super::{pop_integer, pop_text, Instruction, RuleContext, RuleError, RuleModule};
use crate::{ErrorCode, Value};

/// Builds the `~` module.
pub(super) fn module() -> Result<RuleModule, RuleError> {
    let halt = RuleModule::new('h', vec![Instruction::boxed('a', halt)])?;
    RuleModule::new(
        '~',
        vec![
            Box::new(halt),
            Instruction::boxed('w', write_cell),
            Instruction::boxed('r', read_cell),
        ],
    )
}

fn halt(ctx: &mut RuleContext<'_>) {
    debug!(unit = ctx.conscious.id, "halt");
    ctx.conscious.halt = true;
    ctx.step();
}

/// Pops the offset, then a one-character text to store.
fn write_cell(ctx: &mut RuleContext<'_>) {
    ctx.step();
    let Some(offset) = pop_integer(ctx) else { return };
    let Some(text) = pop_text(ctx) else { return };
    let mut characters = text.chars();
    let (Some(character), None) = (characters.next(), characters.next()) else {
        ctx.fail(ErrorCode::BadValue);
        return;
    };
    let target = ctx.entry().offset(ctx.conscious.direction, offset);
    if ctx.rooms.write(target, character).is_err() {
        ctx.fail(ErrorCode::BadValue);
    }
}

fn read_cell(ctx: &mut RuleContext<'_>) {
    ctx.step();
    let Some(offset) = pop_integer(ctx) else { return };
    let target = ctx.entry().offset(ctx.conscious.direction, offset);
    let character = ctx.rooms.read(target);
    ctx.stack().push(Value::Text(character.to_string()));
}

#[cfg(test)]
mod tests {
    use super::module;
    use crate::rules::testing::Harness;
    use crate::{Coord, ErrorCode, Value};

    #[test]
    fn halt_raises_flag() {
        let mut harness = Harness::new("~ha");
        assert_eq!(harness.run(&module().unwrap()), 2);
        assert!(harness.unit.halt);
        assert_eq!(harness.unit.at(), Coord::new(3, 0, 0));
    }

    #[test]
    fn half_halt_does_nothing() {
        let mut harness = Harness::new("~hx");
        harness.run(&module().unwrap());
        assert!(!harness.unit.halt);
        assert_eq!(harness.unit.at(), Coord::new(2, 0, 0));
    }

    #[test]
    fn write_patches_cell_ahead() {
        let mut harness = Harness::new("~w");
        harness.unit.work_stack.push(Value::text("Q"));
        harness.unit.work_stack.push(Value::Integer(5));
        harness.run(&module().unwrap());
        assert_eq!(harness.rooms.read(Coord::new(5, 0, 0)), 'Q');
        assert_eq!(harness.unit.error, 0);
    }

    #[test]
    fn write_behind_with_negative_offset() {
        let mut harness = Harness::new("  ~w");
        harness.unit.position = Coord::new(2, 0, 0);
        harness.unit.work_stack.push(Value::text("Z"));
        harness.unit.work_stack.push(Value::Integer(-2));
        harness.run(&module().unwrap());
        assert_eq!(harness.rooms.read(Coord::new(0, 0, 0)), 'Z');
    }

    #[test]
    fn write_rejects_long_text() {
        let mut harness = Harness::new("~w");
        harness.unit.work_stack.push(Value::text("QQ"));
        harness.unit.work_stack.push(Value::Integer(5));
        harness.run(&module().unwrap());
        assert_eq!(harness.unit.error, ErrorCode::BadValue.as_i64());
        assert!(harness.rooms.is_vacant(Coord::new(5, 0, 0)));
    }

    #[test]
    fn read_fetches_cell() {
        let mut harness = Harness::new("~r  k");
        harness.unit.work_stack.push(Value::Integer(4));
        harness.run(&module().unwrap());
        assert_eq!(harness.unit.work_stack.pop(), Value::text("k"));
    }
}

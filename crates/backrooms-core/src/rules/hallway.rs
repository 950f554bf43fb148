//! Hallway navigation: the `h` module.
//!
//! Calls save the return point as six integers on the call stack so a
//! program that scribbles over its call stack only ever sees
//! `CORRUPT_RETURN`, never a wild jump.

use tracing::trace;

use super::{pop_text, Instruction, RuleContext, RuleError, RuleModule};
use crate::{is_name, Coord, ErrorCode, Value};

/// Builds the `h` module.
pub(super) fn module() -> Result<RuleModule, RuleError> {
    RuleModule::new(
        'h',
        vec![
            Instruction::boxed('c', call_here),
            Instruction::boxed('f', call_on_floor),
            Instruction::boxed('r', return_from_call),
            Instruction::boxed('n', |ctx| jump_relative(ctx, Relative::Next)),
            Instruction::boxed('p', |ctx| jump_relative(ctx, Relative::Previous)),
            Instruction::boxed('s', set_name),
        ],
    )
}

#[derive(Debug, Clone, Copy)]
enum Relative {
    Next,
    Previous,
}

fn call_here(ctx: &mut RuleContext<'_>) {
    ctx.step();
    let Some(name) = pop_text(ctx) else { return };
    let floor = ctx.conscious.position.floor;
    call(ctx, floor, &name);
}

/// Pops the hallway name, then the floor name.
fn call_on_floor(ctx: &mut RuleContext<'_>) {
    ctx.step();
    let Some(hallway) = pop_text(ctx) else { return };
    let Some(floor_name) = pop_text(ctx) else { return };
    match ctx.rooms.get_floor_level_by_name(&floor_name) {
        Some(floor) => call(ctx, floor, &hallway),
        None => ctx.fail(ErrorCode::NotFound),
    }
}

fn call(ctx: &mut RuleContext<'_>, floor: i64, hallway: &str) {
    let Some(y) = ctx.rooms.get_hallway_location_by_name(floor, hallway) else {
        ctx.fail(ErrorCode::NotFound);
        return;
    };
    let unit = &mut *ctx.conscious;
    let Coord { x, y: row, floor: level } = unit.position;
    let Coord {
        x: vx,
        y: vy,
        floor: vfloor,
    } = unit.direction;
    for part in [x, row, level, vx, vy, vfloor] {
        unit.call_stack.push(Value::Integer(part));
    }
    trace!(unit = unit.id, hallway, floor, "hallway call");
    unit.position = Coord::new(0, y, floor);
}

fn return_from_call(ctx: &mut RuleContext<'_>) {
    let unit = &mut *ctx.conscious;
    let mut parts = [0_i64; 6];
    for slot in parts.iter_mut().rev() {
        match unit.call_stack.pop() {
            Value::Integer(part) => *slot = part,
            _ => {
                unit.error = ErrorCode::CorruptReturn.as_i64();
                unit.step();
                return;
            }
        }
    }
    let [x, y, floor, vx, vy, vfloor] = parts;
    unit.position = Coord::new(x, y, floor);
    unit.direction = Coord::new(vx, vy, vfloor);
}

fn jump_relative(ctx: &mut RuleContext<'_>, relative: Relative) {
    let Coord { y, floor, .. } = ctx.conscious.position;
    let target = match relative {
        Relative::Next => ctx.rooms.next_hallway(y, floor),
        Relative::Previous => ctx.rooms.previous_hallway(y, floor),
    };
    match target {
        Some(target) => ctx.conscious.position = Coord::new(0, target, floor),
        None => {
            ctx.fail(ErrorCode::NotFound);
            ctx.step();
        }
    }
}

/// Names the hallway at the unit's row; `Nothing` clears the name.
fn set_name(ctx: &mut RuleContext<'_>) {
    ctx.step();
    let name = match ctx.stack().pop() {
        Value::Text(name) if is_name(&name) => Some(name),
        Value::Nothing => None,
        Value::Text(_) => {
            ctx.fail(ErrorCode::BadValue);
            return;
        }
        Value::Bottom => {
            ctx.fail(ErrorCode::StackEmpty);
            return;
        }
        _ => {
            ctx.fail(ErrorCode::TypeMismatch);
            return;
        }
    };
    let Coord { y, floor, .. } = ctx.conscious.position;
    if ctx
        .rooms
        .set_hallway_name(y, floor, name.as_deref())
        .is_err()
    {
        ctx.fail(ErrorCode::BadValue);
    }
}

#[cfg(test)]
mod tests {
    use super::module;
    use crate::rules::testing::Harness;
    use crate::{Coord, ErrorCode, Value};

    fn harness_with_hallways(row: &str) -> Harness {
        let mut harness = Harness::new(row);
        harness.rooms.set_hallway_name(0, 0, Some("MAIN")).unwrap();
        harness.rooms.set_hallway_name(-5, 0, Some("SUB")).unwrap();
        harness.rooms.set_hallway_name(-9, 0, None).unwrap();
        harness
    }

    #[test]
    fn call_and_return_round_trip() {
        let mut harness = harness_with_hallways("hc");
        harness.unit.work_stack.push(Value::text("SUB"));
        harness.run(&module().unwrap());
        assert_eq!(harness.unit.at(), Coord::new(0, -5, 0));
        assert_eq!(harness.unit.call_stack.len(), 6);
        assert_eq!(harness.unit.error, 0);

        harness.rooms.write_line(Coord::new(0, -5, 0), Coord::new(1, 0, 0), "hr").unwrap();
        harness.unit.direction = Coord::new(0, 1, 0);
        harness.run(&module().unwrap());
        assert_eq!(harness.unit.at(), Coord::new(2, 0, 0));
        assert_eq!(harness.unit.direction, Coord::new(1, 0, 0));
        assert!(harness.unit.call_stack.is_empty());
    }

    #[test]
    fn call_to_unknown_hallway_steps_on() {
        let mut harness = harness_with_hallways("hc");
        harness.unit.work_stack.push(Value::text("NOPE"));
        harness.run(&module().unwrap());
        assert_eq!(harness.unit.error, ErrorCode::NotFound.as_i64());
        assert_eq!(harness.unit.at(), Coord::new(2, 0, 0));
        assert!(harness.unit.call_stack.is_empty());
    }

    #[test]
    fn call_on_named_floor() {
        let mut harness = Harness::new("hf");
        harness.rooms.set_floor_name(3, Some("lib")).unwrap();
        harness.rooms.set_hallway_name(7, 3, Some("ENTRY")).unwrap();
        harness.unit.work_stack.push(Value::text("lib"));
        harness.unit.work_stack.push(Value::text("ENTRY"));
        harness.run(&module().unwrap());
        assert_eq!(harness.unit.at(), Coord::new(0, 7, 3));
        assert_eq!(harness.unit.error, 0);
    }

    #[test]
    fn corrupt_return_record_is_reported() {
        let mut harness = Harness::new("hr");
        for part in [1, 2, 3] {
            harness.unit.call_stack.push(Value::Integer(part));
        }
        harness.unit.call_stack.push(Value::text("x"));
        harness.run(&module().unwrap());
        assert_eq!(harness.unit.error, ErrorCode::CorruptReturn.as_i64());
        assert_eq!(harness.unit.at(), Coord::new(2, 0, 0));

        let mut harness = Harness::new("hr");
        harness.run(&module().unwrap());
        assert_eq!(harness.unit.error, ErrorCode::CorruptReturn.as_i64());
    }

    #[test]
    fn next_and_previous_hallways() {
        let mut harness = harness_with_hallways("hp");
        harness.run(&module().unwrap());
        assert_eq!(harness.unit.at(), Coord::new(0, -5, 0));

        harness.rooms.write_line(Coord::new(0, -5, 0), Coord::new(1, 0, 0), "hn").unwrap();
        harness.run(&module().unwrap());
        assert_eq!(harness.unit.at(), Coord::new(0, 0, 0));

        harness.rooms.write_line(Coord::new(0, -9, 0), Coord::new(1, 0, 0), "hp").unwrap();
        harness.unit.position = Coord::new(0, -9, 0);
        harness.run(&module().unwrap());
        assert_eq!(harness.unit.error, ErrorCode::NotFound.as_i64());
        assert_eq!(harness.unit.at(), Coord::new(2, -9, 0));
    }

    #[test]
    fn set_hallway_name_at_row() {
        let mut harness = Harness::new("hshs");
        let rules = module().unwrap();
        harness.unit.work_stack.push(Value::text("TOP"));
        harness.run(&rules);
        assert_eq!(harness.rooms.get_hallway_name(0, 0), Some("TOP"));

        harness.unit.work_stack.push(Value::text("bad name"));
        harness.run(&rules);
        assert_eq!(harness.unit.error, ErrorCode::BadValue.as_i64());
        assert_eq!(harness.rooms.get_hallway_name(0, 0), Some("TOP"));
    }
}

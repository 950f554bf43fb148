//! Integer (`i`) and text (`t`) operation modules.

use super::{pop_integer, pop_text, Instruction, RuleContext, RuleError, RuleModule};
use crate::{ErrorCode, Value};

/// Builds the `i` module.
pub(super) fn integer_module() -> Result<RuleModule, RuleError> {
    RuleModule::new(
        'i',
        vec![
            Instruction::boxed('a', |ctx| binary(ctx, add)),
            Instruction::boxed('s', |ctx| binary(ctx, subtract)),
            Instruction::boxed('m', |ctx| binary(ctx, multiply)),
            Instruction::boxed('d', |ctx| binary(ctx, floor_div)),
            Instruction::boxed('o', |ctx| binary(ctx, floor_mod)),
            Instruction::boxed('p', |ctx| binary(ctx, power)),
            Instruction::boxed('c', cast),
            Instruction::boxed('b', byte),
            Instruction::boxed('v', absolute),
        ],
    )
}

/// Builds the `t` module.
pub(super) fn text_module() -> Result<RuleModule, RuleError> {
    RuleModule::new(
        't',
        vec![
            Instruction::boxed('u', |ctx| map_text(ctx, str::to_ascii_uppercase)),
            Instruction::boxed('l', |ctx| map_text(ctx, str::to_ascii_lowercase)),
            Instruction::boxed('n', length),
            Instruction::boxed('j', join),
            Instruction::boxed('s', split),
        ],
    )
}

/// Pops `b` then `a` and pushes `op(a, b)`.
fn binary(ctx: &mut RuleContext<'_>, op: fn(i64, i64) -> Result<i64, ErrorCode>) {
    ctx.step();
    let Some(b) = pop_integer(ctx) else { return };
    let Some(a) = pop_integer(ctx) else { return };
    match op(a, b) {
        Ok(result) => ctx.stack().push(Value::Integer(result)),
        Err(code) => ctx.fail(code),
    }
}

fn add(a: i64, b: i64) -> Result<i64, ErrorCode> {
    a.checked_add(b).ok_or(ErrorCode::Overflow)
}

fn subtract(a: i64, b: i64) -> Result<i64, ErrorCode> {
    a.checked_sub(b).ok_or(ErrorCode::Overflow)
}

fn multiply(a: i64, b: i64) -> Result<i64, ErrorCode> {
    a.checked_mul(b).ok_or(ErrorCode::Overflow)
}

/// Division rounding toward negative infinity.
fn floor_div(a: i64, b: i64) -> Result<i64, ErrorCode> {
    if b == 0 {
        return Err(ErrorCode::DivisionByZero);
    }
    let quotient = a.checked_div(b).ok_or(ErrorCode::Overflow)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Ok(quotient - 1)
    } else {
        Ok(quotient)
    }
}

/// Remainder carrying the sign of the divisor.
fn floor_mod(a: i64, b: i64) -> Result<i64, ErrorCode> {
    if b == 0 {
        return Err(ErrorCode::DivisionByZero);
    }
    let remainder = a.checked_rem(b).ok_or(ErrorCode::Overflow)?;
    if remainder != 0 && ((remainder < 0) != (b < 0)) {
        Ok(remainder + b)
    } else {
        Ok(remainder)
    }
}

fn power(a: i64, b: i64) -> Result<i64, ErrorCode> {
    if b < 0 {
        return Err(ErrorCode::BadValue);
    }
    let exponent = u32::try_from(b).map_err(|_| ErrorCode::Overflow)?;
    a.checked_pow(exponent).ok_or(ErrorCode::Overflow)
}

fn cast(ctx: &mut RuleContext<'_>) {
    ctx.step();
    let Some(text) = pop_text(ctx) else { return };
    match text.trim().parse::<i64>() {
        Ok(value) => ctx.stack().push(Value::Integer(value)),
        Err(_) => ctx.fail(ErrorCode::BadValue),
    }
}

fn byte(ctx: &mut RuleContext<'_>) {
    ctx.step();
    let Some(code) = pop_integer(ctx) else { return };
    match u8::try_from(code) {
        Ok(code) => ctx.stack().push(Value::Text(char::from(code).to_string())),
        Err(_) => ctx.fail(ErrorCode::BadValue),
    }
}

fn absolute(ctx: &mut RuleContext<'_>) {
    ctx.step();
    let Some(value) = pop_integer(ctx) else { return };
    match value.checked_abs() {
        Some(value) => ctx.stack().push(Value::Integer(value)),
        None => ctx.fail(ErrorCode::Overflow),
    }
}

fn map_text(ctx: &mut RuleContext<'_>, op: fn(&str) -> String) {
    ctx.step();
    if let Some(text) = pop_text(ctx) {
        ctx.stack().push(Value::Text(op(&text)));
    }
}

fn length(ctx: &mut RuleContext<'_>) {
    ctx.step();
    let Some(text) = pop_text(ctx) else { return };
    match i64::try_from(text.chars().count()) {
        Ok(length) => ctx.stack().push(Value::Integer(length)),
        Err(_) => ctx.fail(ErrorCode::Overflow),
    }
}

fn join(ctx: &mut RuleContext<'_>) {
    ctx.step();
    let Some(right) = pop_text(ctx) else { return };
    let Some(mut left) = pop_text(ctx) else { return };
    left.push_str(&right);
    ctx.stack().push(Value::Text(left));
}

/// Pops an index then a text and pushes the halves before and after it.
fn split(ctx: &mut RuleContext<'_>) {
    ctx.step();
    let Some(index) = pop_integer(ctx) else { return };
    let Some(text) = pop_text(ctx) else { return };
    let at = usize::try_from(index)
        .ok()
        .and_then(|index| text.char_indices().map(|(at, _)| at).chain([text.len()]).nth(index));
    match at {
        Some(at) => {
            let (left, right) = text.split_at(at);
            ctx.stack().push(Value::Text(left.to_string()));
            ctx.stack().push(Value::Text(right.to_string()));
        }
        None => ctx.fail(ErrorCode::BadValue),
    }
}

//! Thread operations: the `y` module.

use tracing::debug;

use super::{Instruction, RuleContext, RuleError, RuleModule};
use crate::Value;

/// Builds the `y` module.
pub(super) fn module() -> Result<RuleModule, RuleError> {
    RuleModule::new(
        'y',
        vec![
            Instruction::boxed('n', spawn),
            Instruction::boxed('i', |ctx| {
                let id = ctx.conscious.id;
                ctx.stack().push(Value::Integer(id_value(id)));
                ctx.step();
            }),
            Instruction::boxed('k', |ctx| {
                ctx.conscious.alive = false;
                ctx.step();
            }),
            Instruction::boxed('l', lock),
            Instruction::boxed('u', |ctx| {
                let id = ctx.conscious.id;
                ctx.services.key_mut().unlock(id);
                ctx.step();
            }),
        ],
    )
}

fn id_value(id: usize) -> i64 {
    i64::try_from(id).unwrap_or(i64::MAX)
}

/// The child starts one cell past `yn`, like its parent.
fn spawn(ctx: &mut RuleContext<'_>) {
    ctx.step();
    let child = ctx.services.spawn_unit(ctx.conscious);
    ctx.stack().push(Value::Integer(id_value(child)));
}

/// Busy-waits by rewinding to the rule entry while another unit holds the key.
fn lock(ctx: &mut RuleContext<'_>) {
    let id = ctx.conscious.id;
    if ctx.services.key_mut().try_lock(id) {
        ctx.step();
    } else {
        debug!(
            unit = id,
            holder = ?ctx.services.key().holder(),
            "lock contended"
        );
        ctx.conscious.position = ctx.entry();
    }
}

use crate::Value;

static BOTTOM: Value = Value::Bottom;

/// Bottom-sentinelled value stack with frame fences.
///
/// An empty stack behaves as if a single [`Value::Bottom`] sits at its base:
/// `pop` and `peek` return it, and pushing it is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Stack {
    items: Vec<Value>,
}

impl Stack {
    /// Creates an empty stack.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Pushes `value`, ignoring [`Value::Bottom`].
    pub fn push(&mut self, value: Value) {
        if value != Value::Bottom {
            self.items.push(value);
        }
    }

    /// Removes and returns the top value, or [`Value::Bottom`] when empty.
    pub fn pop(&mut self) -> Value {
        self.items.pop().unwrap_or(Value::Bottom)
    }

    /// Returns the top value without removing it.
    #[must_use]
    pub fn peek(&self) -> &Value {
        self.items.last().unwrap_or(&BOTTOM)
    }

    /// Pushes a frame fence.
    pub fn push_frame(&mut self) {
        self.items.push(Value::Frame);
    }

    /// Pops until a frame fence is removed or the stack runs empty.
    pub fn pop_frame(&mut self) {
        while let Some(value) = self.items.pop() {
            if value == Value::Frame {
                break;
            }
        }
    }

    /// Drops every stored value.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Number of stored values (the implicit bottom is not counted).
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` when only the implicit bottom remains.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Stored values from bottom to top.
    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::Stack;
    use crate::Value;
    use proptest::prelude::*;

    fn value_strategy() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<i64>().prop_map(Value::Integer),
            "[ -~]{0,8}".prop_map(|s| Value::text(&s)),
            Just(Value::Nothing),
            Just(Value::Frame),
        ]
    }

    #[test]
    fn fresh_stack_pops_bottom_without_changing() {
        let mut stack = Stack::new();
        assert_eq!(stack.pop(), Value::Bottom);
        assert_eq!(stack.pop(), Value::Bottom);
        assert_eq!(stack.peek(), &Value::Bottom);
        assert!(stack.is_empty());
    }

    #[test]
    fn pop_frame_stops_at_first_fence() {
        let mut stack = Stack::new();
        stack.push(Value::Integer(1));
        stack.push_frame();
        stack.push(Value::Integer(2));
        stack.push(Value::Nothing);

        stack.pop_frame();
        assert_eq!(stack.as_slice(), &[Value::Integer(1)]);
    }

    #[test]
    fn pop_frame_without_fence_empties_then_noops() {
        let mut stack = Stack::new();
        stack.push(Value::Integer(1));
        stack.push(Value::text("cats"));

        stack.pop_frame();
        assert!(stack.is_empty());
        stack.pop_frame();
        assert!(stack.is_empty());
    }

    #[test]
    fn clear_returns_to_bottom() {
        let mut stack = Stack::new();
        stack.push(Value::Integer(9));
        stack.push_frame();
        stack.clear();
        assert_eq!(stack.len(), 0);
        assert_eq!(stack.peek(), &Value::Bottom);
    }

    proptest! {
        #[test]
        fn push_then_pop_restores_stack(
            seed in proptest::collection::vec(value_strategy(), 0..16),
            value in value_strategy(),
        ) {
            let mut stack = Stack::new();
            for item in seed {
                stack.push(item);
            }
            let before = stack.clone();
            stack.push(value.clone());
            prop_assert_eq!(stack.pop(), value);
            prop_assert_eq!(stack, before);
        }

        #[test]
        fn pushing_bottom_is_a_noop(seed in proptest::collection::vec(value_strategy(), 0..16)) {
            let mut stack = Stack::new();
            for item in seed {
                stack.push(item);
            }
            let before = stack.clone();
            stack.push(Value::Bottom);
            prop_assert_eq!(stack, before);
        }
    }
}

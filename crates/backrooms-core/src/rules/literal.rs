//! Literal readers: the `r` module.
//!
//! `ri[-]digits` pushes an integer, `rs<d>...<d>` pushes the text between two
//! copies of the delimiter `d`, `rn` pushes `Nothing` and `rf` a frame fence.
//! Every character a literal consumes is its own micro-step.

use super::{Activation, Instruction, MicroStep, Rule, RuleContext, RuleError, RuleModule};
use crate::{ErrorCode, Value};

/// Builds the `r` module.
pub(super) fn module() -> Result<RuleModule, RuleError> {
    RuleModule::new(
        'r',
        vec![
            Box::new(IntegerLiteral),
            Box::new(TextLiteral),
            Instruction::boxed('n', |ctx| {
                ctx.stack().push(Value::Nothing);
                ctx.step();
            }),
            Instruction::boxed('f', |ctx| {
                ctx.stack().push_frame();
                ctx.step();
            }),
        ],
    )
}

#[derive(Debug)]
struct IntegerLiteral;

impl Rule for IntegerLiteral {
    fn start_character(&self) -> char {
        'i'
    }

    fn activate(&self) -> Box<dyn Activation> {
        Box::new(IntegerReader { digits: None })
    }
}

struct IntegerReader {
    digits: Option<String>,
}

impl IntegerReader {
    fn finish(digits: &str, ctx: &mut RuleContext<'_>) -> MicroStep {
        let value = match digits {
            "" | "-" => 0,
            _ => digits.parse::<i64>().unwrap_or_else(|_| {
                ctx.fail(ErrorCode::Overflow);
                0
            }),
        };
        ctx.stack().push(Value::Integer(value));
        MicroStep::Finished
    }
}

impl Activation for IntegerReader {
    fn resume(&mut self, ctx: &mut RuleContext<'_>) -> MicroStep {
        match &mut self.digits {
            None => {
                ctx.step();
                let first = ctx.read();
                if first == '-' || first.is_ascii_digit() {
                    self.digits = Some(String::new());
                    ctx.record();
                    MicroStep::Paused
                } else {
                    Self::finish("", ctx)
                }
            }
            Some(digits) => {
                digits.push(ctx.read());
                ctx.step();
                if ctx.read().is_ascii_digit() {
                    ctx.record();
                    MicroStep::Paused
                } else {
                    let digits = std::mem::take(digits);
                    Self::finish(&digits, ctx)
                }
            }
        }
    }
}

#[derive(Debug)]
struct TextLiteral;

impl Rule for TextLiteral {
    fn start_character(&self) -> char {
        's'
    }

    fn activate(&self) -> Box<dyn Activation> {
        Box::new(TextReader::Opening)
    }
}

enum TextReader {
    Opening,
    Delimiter,
    Body { delimiter: char, text: String },
}

impl Activation for TextReader {
    fn resume(&mut self, ctx: &mut RuleContext<'_>) -> MicroStep {
        match self {
            Self::Opening => {
                *self = Self::Delimiter;
                ctx.advance()
            }
            Self::Delimiter => {
                *self = Self::Body {
                    delimiter: ctx.read(),
                    text: String::new(),
                };
                ctx.advance()
            }
            Self::Body { delimiter, text } => {
                let character = ctx.read();
                if character == *delimiter {
                    let text = std::mem::take(text);
                    ctx.stack().push(Value::Text(text));
                    ctx.step();
                    return MicroStep::Finished;
                }
                text.push(character);
                if text.ends_with("\\n") {
                    text.truncate(text.len() - 2);
                    text.push('\n');
                } else if text.ends_with("\\t") {
                    text.truncate(text.len() - 2);
                    text.push('\t');
                }
                ctx.advance()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::module;
    use crate::rules::testing::Harness;
    use crate::{Coord, ErrorCode, Value};
    use rstest::rstest;

    #[rstest]
    #[case("ri1e", 1, 2, 3)]
    #[case("ri-42e", -42, 4, 5)]
    #[case("ri0099 ", 99, 5, 6)]
    #[case("rie", 0, 1, 2)]
    #[case("ri-e", 0, 2, 3)]
    fn integer_literals(
        #[case] row: &str,
        #[case] expected: i64,
        #[case] pauses: usize,
        #[case] end_x: i64,
    ) {
        let mut harness = Harness::new(row);
        assert_eq!(harness.run(&module().unwrap()), pauses);
        assert_eq!(harness.unit.work_stack.pop(), Value::Integer(expected));
        assert_eq!(harness.unit.at(), Coord::new(end_x, 0, 0));
    }

    #[test]
    fn oversized_integer_sets_overflow() {
        let mut harness = Harness::new("ri99999999999999999999999e");
        harness.run(&module().unwrap());
        assert_eq!(harness.unit.work_stack.pop(), Value::Integer(0));
        assert_eq!(harness.unit.error, ErrorCode::Overflow.as_i64());
    }

    #[test]
    fn text_literal_walks_each_character() {
        let mut harness = Harness::new("rs\"cats\"e");
        // `s`, the opening quote, four letters, the closing quote.
        assert_eq!(harness.run(&module().unwrap()), 7);
        assert_eq!(harness.unit.work_stack.pop(), Value::text("cats"));
        assert_eq!(harness.unit.at(), Coord::new(8, 0, 0));
    }

    #[test]
    fn text_literal_escapes() {
        let mut harness = Harness::new(r"rs|a\nb\tc|");
        harness.run(&module().unwrap());
        assert_eq!(harness.unit.work_stack.pop(), Value::text("a\nb\tc"));
    }

    #[test]
    fn text_literal_may_be_empty() {
        let mut harness = Harness::new("rs''");
        harness.run(&module().unwrap());
        assert_eq!(harness.unit.work_stack.pop(), Value::text(""));
    }

    #[test]
    fn nothing_and_frame_literals() {
        let mut harness = Harness::new("rnrf");
        let rules = module().unwrap();
        harness.run(&rules);
        harness.run(&rules);
        assert_eq!(harness.unit.work_stack.pop(), Value::Frame);
        assert_eq!(harness.unit.work_stack.pop(), Value::Nothing);
    }
}

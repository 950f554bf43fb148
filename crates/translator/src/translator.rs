//! Lays line sources out onto a [`Rooms`] plane.
//!
//! Each source starts on a fresh floor named after it, with the cursor at
//! `x = 0, y = 0`. Lines are read after their leading whitespace:
//!
//! | Form | Effect |
//! |------|--------|
//! | `/row` | write `row` rightward from the cursor, then move down a row |
//! | `# ...` | comment |
//! | `~ [name\|@]` | hallway at the cursor row |
//! | `+ [name\|@]` | start the next floor at row 0 |
//! | `% name` | include a source |
//! | `= [from\|@] [to\|@] [from_level\|@] [to_level\|@]` | duplicate a floor |
//! | `X n`, `Y n`, `F n` | set the cursor |
//! | `XS n`, `YS n`, `FS n` | shift the cursor |
//!
//! `@` is always its own token and stands for "none".

use std::fmt;

use backrooms_core::{Coord, Rooms, RoomsError};
use tracing::debug;

use crate::errors::TranslatorError;
use crate::include::SourceQueue;
use crate::source::LineSource;

const RIGHT: Coord = Coord::new(1, 0, 0);

/// Translates `sources` into one plane.
///
/// # Errors
///
/// Returns the first [`TranslatorError`]: an unreadable file, a missing
/// include, or a line that is malformed or cannot be applied.
pub fn translate(mut sources: SourceQueue) -> Result<Rooms, TranslatorError> {
    let mut state = State::default();
    while let Some(source) = sources.next_source() {
        state.enter(&source)?;
        for line in source.lines()? {
            state
                .line(&line.text, &mut sources)
                .map_err(|reason| {
                    TranslatorError::bad_line(
                        source.name(),
                        line.original_line,
                        &line.text,
                        reason.to_string(),
                    )
                })?;
        }
    }
    Ok(state.rooms)
}

/// Translates a single in-memory source named `main`.
///
/// # Errors
///
/// As [`translate`]; any `%` include is missing.
pub fn translate_text(text: &str) -> Result<Rooms, TranslatorError> {
    translate(SourceQueue::single(LineSource::from_text("main", text)))
}

/// Why a line failed; becomes [`TranslatorError::BadLine`].
#[derive(Debug)]
enum LineError {
    Malformed(String),
    Rooms(RoomsError),
    Include(TranslatorError),
}

impl From<RoomsError> for LineError {
    fn from(error: RoomsError) -> Self {
        Self::Rooms(error)
    }
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(reason) => f.write_str(reason),
            Self::Rooms(error) => error.fmt(f),
            Self::Include(error) => error.fmt(f),
        }
    }
}

fn malformed(reason: impl Into<String>) -> LineError {
    LineError::Malformed(reason.into())
}

#[derive(Debug)]
struct State {
    rooms: Rooms,
    x: i64,
    y: i64,
    floor: i64,
}

impl Default for State {
    fn default() -> Self {
        Self {
            rooms: Rooms::new(),
            x: 0,
            y: 0,
            floor: -1,
        }
    }
}

impl State {
    fn enter(&mut self, source: &LineSource) -> Result<(), TranslatorError> {
        let bad_source = |reason: String| TranslatorError::bad_line(source.name(), 0, "", reason);
        self.x = 0;
        self.y = 0;
        self.floor = self
            .floor
            .checked_add(1)
            .ok_or_else(|| bad_source("no floor left for this source".into()))?;
        debug!(source = source.name(), floor = self.floor, "entering source");
        self.rooms
            .set_floor_name(self.floor, Some(source.name()))
            .map_err(|error| bad_source(error.to_string()))
    }

    fn line(&mut self, line: &str, sources: &mut SourceQueue) -> Result<(), LineError> {
        let line = line.trim_start();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }
        if let Some(row) = line.strip_prefix('/') {
            self.rooms
                .write_line(Coord::new(self.x, self.y, self.floor), RIGHT, row)?;
            self.y = shifted(self.y, -1)?;
        } else if let Some(rest) = line.strip_prefix('~') {
            let name = optional_name(rest)?;
            self.rooms.set_hallway_name(self.y, self.floor, name)?;
        } else if let Some(rest) = line.strip_prefix('+') {
            let name = optional_name(rest)?;
            self.floor = shifted(self.floor, 1)?;
            self.y = 0;
            debug!(floor = self.floor, name, "new floor");
            self.rooms.set_floor_name(self.floor, name)?;
        } else if let Some(rest) = line.strip_prefix('%') {
            match at_most(tokenize(rest), 1)?.as_slice() {
                [name] if *name != "@" => {
                    sources.include(name).map_err(LineError::Include)?;
                }
                _ => return Err(malformed("an include needs a name")),
            }
        } else if let Some(rest) = line.strip_prefix('=') {
            self.parallel(rest)?;
        } else if let Some(rest) = line.strip_prefix("XS") {
            self.x = shifted(self.x, number(rest)?)?;
        } else if let Some(rest) = line.strip_prefix('X') {
            self.x = number(rest)?;
        } else if let Some(rest) = line.strip_prefix("YS") {
            self.y = shifted(self.y, number(rest)?)?;
        } else if let Some(rest) = line.strip_prefix('Y') {
            self.y = number(rest)?;
        } else if let Some(rest) = line.strip_prefix("FS") {
            self.floor = shifted(self.floor, number(rest)?)?;
        } else if let Some(rest) = line.strip_prefix('F') {
            self.floor = number(rest)?;
        } else {
            return Err(malformed("unknown line form"));
        }
        Ok(())
    }

    /// Duplicates a floor. With no target level the copy lands on the next
    /// floor, which becomes current.
    fn parallel(&mut self, rest: &str) -> Result<(), LineError> {
        let mut tokens = at_most(tokenize(rest), 4)?.into_iter();
        let from_name = tokens.next().filter(|token| *token != "@");
        let to_name = tokens.next().filter(|token| *token != "@");
        let from_level = tokens.next().map(optional_number).transpose()?.flatten();
        let to_level = tokens.next().map(optional_number).transpose()?.flatten();

        let from = match (from_name, from_level) {
            (Some(_), Some(_)) => {
                return Err(malformed("cannot give both a from name and a from level"))
            }
            (Some(name), None) => self
                .rooms
                .get_floor_level_by_name(name)
                .ok_or_else(|| malformed(format!("no floor named {name:?}")))?,
            (None, Some(level)) => level,
            (None, None) => self.floor,
        };
        let to = match to_level {
            Some(level) => level,
            None => {
                self.floor = shifted(self.floor, 1)?;
                self.floor
            }
        };

        debug!(from, to, "duplicating floor");
        self.rooms.duplicate_floor(from, to);
        self.rooms.set_floor_name(to, to_name)?;
        Ok(())
    }
}

/// Splits on whitespace; `@` is always a token of its own.
fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    for word in text.split_whitespace() {
        let mut rest = word;
        while let Some(index) = rest.find('@') {
            if index > 0 {
                tokens.push(&rest[..index]);
            }
            tokens.push("@");
            rest = &rest[index + 1..];
        }
        if !rest.is_empty() {
            tokens.push(rest);
        }
    }
    tokens
}

fn at_most(tokens: Vec<&str>, limit: usize) -> Result<Vec<&str>, LineError> {
    match tokens.get(limit) {
        Some(extra) => Err(malformed(format!("unexpected token `{extra}`"))),
        None => Ok(tokens),
    }
}

fn optional_name(rest: &str) -> Result<Option<&str>, LineError> {
    Ok(at_most(tokenize(rest), 1)?
        .pop()
        .filter(|token| *token != "@"))
}

fn optional_number(token: &str) -> Result<Option<i64>, LineError> {
    if token == "@" {
        Ok(None)
    } else {
        parse_number(token).map(Some)
    }
}

fn number(rest: &str) -> Result<i64, LineError> {
    match tokenize(rest).as_slice() {
        [token] => parse_number(token),
        [] => Err(malformed("expected a number")),
        [_, extra, ..] => Err(malformed(format!("unexpected token `{extra}`"))),
    }
}

fn parse_number(token: &str) -> Result<i64, LineError> {
    token
        .parse()
        .map_err(|_| malformed(format!("`{token}` is not an integer")))
}

fn shifted(value: i64, by: i64) -> Result<i64, LineError> {
    value
        .checked_add(by)
        .ok_or_else(|| malformed("coordinate out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn rooms(text: &str) -> Rooms {
        translate_text(text).unwrap()
    }

    fn at(x: i64, y: i64, floor: i64) -> Coord {
        Coord::new(x, y, floor)
    }

    #[rstest]
    #[case("a b", vec!["a", "b"])]
    #[case("  a\tb  ", vec!["a", "b"])]
    #[case("@", vec!["@"])]
    #[case("a@b", vec!["a", "@", "b"])]
    #[case("@@x", vec!["@", "@", "x"])]
    #[case("", vec![])]
    fn tokens_split_on_whitespace_and_at(#[case] text: &str, #[case] expected: Vec<&str>) {
        assert_eq!(tokenize(text), expected);
    }

    #[test]
    fn rows_go_down_from_the_origin() {
        let plane = rooms("/ab\n  /cd");
        assert_eq!(plane.read(at(0, 0, 0)), 'a');
        assert_eq!(plane.read(at(1, 0, 0)), 'b');
        assert_eq!(plane.read(at(0, -1, 0)), 'c');
        assert_eq!(plane.read(at(1, -1, 0)), 'd');
        assert_eq!(plane.get_floor_name(0), Some("main"));
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let plane = rooms("# hi\n\n   \n/x");
        assert_eq!(plane.read(at(0, 0, 0)), 'x');
    }

    #[test]
    fn hallways_name_the_cursor_row() {
        let plane = rooms("/a\n~ LOOP\n/b\n~@\n/c\n~");
        assert_eq!(plane.get_hallway_location_by_name(0, "LOOP"), Some(-1));
        assert_eq!(plane.hallways(0).collect::<Vec<_>>(), vec![-1, -2, -3]);
        assert_eq!(plane.get_hallway_name(-2, 0), None);
    }

    #[test]
    fn new_floor_resets_the_row_only() {
        let plane = rooms("X 4\n/a\n+ upper\n/b\n+\n/c");
        assert_eq!(plane.read(at(4, 0, 0)), 'a');
        assert_eq!(plane.read(at(4, 0, 1)), 'b');
        assert_eq!(plane.read(at(4, 0, 2)), 'c');
        assert_eq!(plane.get_floor_level_by_name("upper"), Some(1));
        assert_eq!(plane.get_floor_name(2), None);
    }

    #[rstest]
    #[case("X 3", at(3, 0, 0))]
    #[case("X -2", at(-2, 0, 0))]
    #[case("Y 5", at(0, 5, 0))]
    #[case("F 2", at(0, 0, 2))]
    #[case("XS 2\nXS 3", at(5, 0, 0))]
    #[case("YS -4\nYS 1", at(0, -3, 0))]
    #[case("FS 1\nFS 1", at(0, 0, 2))]
    #[case("X 1\nXS 1\nY 7\nYS -1", at(2, 6, 0))]
    fn cursor_forms(#[case] moves: &str, #[case] expected: Coord) {
        let plane = rooms(&format!("{moves}\n/z"));
        assert_eq!(plane.read(expected), 'z');
    }

    #[test]
    fn parallel_defaults_to_the_next_floor() {
        let plane = rooms("/ab\n~ TOP\n=\n/c");
        assert_eq!(plane.read(at(0, 0, 1)), 'a');
        assert_eq!(plane.get_hallway_location_by_name(1, "TOP"), Some(-1));
        assert_eq!(plane.read(at(0, -1, 1)), 'c');
        assert_eq!(plane.read(at(0, -1, 0)), ' ');
        assert_eq!(plane.get_floor_name(1), None);
    }

    #[test]
    fn parallel_by_name_and_level() {
        let plane = rooms("/a\n+ second\n/b\n= main copy\n= @ @ 1 7");
        assert_eq!(plane.read(at(0, 0, 2)), 'a');
        assert_eq!(plane.get_floor_level_by_name("copy"), Some(2));
        assert_eq!(plane.read(at(0, 0, 7)), 'b');
        assert_eq!(plane.get_floor_name(7), None);
    }

    #[rstest]
    #[case("~ A B", "unexpected token `B`")]
    #[case("+ a b", "unexpected token `b`")]
    #[case("%", "an include needs a name")]
    #[case("% @", "an include needs a name")]
    #[case("X", "expected a number")]
    #[case("X 1 2", "unexpected token `2`")]
    #[case("Y one", "`one` is not an integer")]
    #[case("= main @ 0", "cannot give both a from name and a from level")]
    #[case("= nowhere", "no floor named \"nowhere\"")]
    #[case("= @ @ @ @ @", "unexpected token `@`")]
    #[case("hello", "unknown line form")]
    fn malformed_lines(#[case] text: &str, #[case] reason: &str) {
        match translate_text(&format!("/a\n{text}")) {
            Err(TranslatorError::BadLine {
                name,
                line,
                text: bad,
                reason: got,
            }) => {
                assert_eq!(name, "main");
                assert_eq!(line, 2);
                assert_eq!(bad, text);
                assert_eq!(got, reason);
            }
            other => panic!("expected a bad line, got {other:?}"),
        }
    }

    #[rstest]
    #[case("~ bad-name")]
    #[case("+ with.dot")]
    #[case("/\u{0100}")]
    fn rooms_errors_become_bad_lines(#[case] text: &str) {
        assert!(matches!(
            translate_text(text),
            Err(TranslatorError::BadLine { line: 1, .. })
        ));
    }

    #[test]
    fn missing_include_is_reported_on_its_line() {
        match translate_text("% heap") {
            Err(TranslatorError::BadLine { line, reason, .. }) => {
                assert_eq!(line, 1);
                assert_eq!(reason, "\"heap\" is a missing include");
            }
            other => panic!("expected a bad line, got {other:?}"),
        }
    }

    #[test]
    fn each_source_gets_its_own_floor() {
        let main = LineSource::from_text("main", "% lib\n% empty\n% lib\n/m");
        let lib = LineSource::from_text("lib", "Y 9\n/l\n% empty");
        let empty = LineSource::from_text("empty", "");
        let queue = SourceQueue::new(main, vec![vec![lib, empty]]).unwrap();
        let plane = translate(queue).unwrap();

        assert_eq!(plane.read(at(0, 0, 0)), 'm');
        assert_eq!(plane.read(at(0, 9, 1)), 'l');
        assert_eq!(plane.get_floor_level_by_name("lib"), Some(1));
        assert_eq!(plane.get_floor_level_by_name("empty"), Some(2));
        assert_eq!(plane.get_floor_level_by_name("main"), Some(0));
    }

    #[test]
    fn invalid_source_names_are_rejected() {
        let queue = SourceQueue::single(LineSource::from_text("not a name", "/a"));
        assert!(matches!(
            translate(queue),
            Err(TranslatorError::BadLine { line: 0, .. })
        ));
    }
}

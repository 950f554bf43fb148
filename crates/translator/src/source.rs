//! Named line sources in plain and literate formats.
//!
//! - **Plain** (`.brs` or in-memory text): every line is program text.
//! - **Literate** (`.brs.md`): Markdown where only fenced code blocks tagged
//!   `brs` are program text and everything else is prose.
//!
//! Lines keep their original line numbers so errors point into the file as
//! written. File sources are read lazily, the first time they are translated.

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::TranslatorError;

/// Extension stripped from file names to form source names.
pub const SOURCE_EXTENSION: &str = ".brs";

/// Extension of literate sources.
pub const LITERATE_EXTENSION: &str = ".brs.md";

/// Fence tag marking program text inside literate sources.
const FENCE_TAG: &str = "brs";

/// A line of extracted source with its original location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// The source text (without trailing newline).
    pub text: String,
    /// 1-indexed line number in the original text.
    pub original_line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Origin {
    Text { text: String, literate: bool },
    File(PathBuf),
}

/// A named source of program lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSource {
    name: String,
    origin: Origin,
}

impl LineSource {
    /// An in-memory plain source.
    #[must_use]
    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: Origin::Text {
                text: text.into(),
                literate: false,
            },
        }
    }

    /// An in-memory literate source.
    #[must_use]
    pub fn from_literate_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: Origin::Text {
                text: text.into(),
                literate: true,
            },
        }
    }

    /// A file-backed source named after the file.
    ///
    /// `lib.brs` and `lib.brs.md` are both named `lib`; any other file keeps
    /// its full file name.
    #[must_use]
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: source_name(&path),
            origin: Origin::File(path),
        }
    }

    /// The source's name, used for its floor and for `%` includes.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads and extracts the program lines.
    ///
    /// # Errors
    ///
    /// Returns [`TranslatorError::Io`] if a file-backed source cannot be read.
    pub fn lines(&self) -> Result<Vec<SourceLine>, TranslatorError> {
        match &self.origin {
            Origin::Text { text, literate } => Ok(extract(text, *literate)),
            Origin::File(path) => {
                let text = fs::read_to_string(path).map_err(|error| TranslatorError::Io {
                    path: path.clone(),
                    error,
                })?;
                Ok(extract(&text, is_literate_file(path)))
            }
        }
    }
}

fn source_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    file_name
        .strip_suffix(LITERATE_EXTENSION)
        .or_else(|| file_name.strip_suffix(SOURCE_EXTENSION))
        .unwrap_or(&file_name)
        .to_string()
}

fn is_literate_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.to_ascii_lowercase().ends_with(LITERATE_EXTENSION))
}

fn extract(text: &str, literate: bool) -> Vec<SourceLine> {
    if literate {
        extract_literate_source(text)
    } else {
        extract_plain_source(text)
    }
}

fn extract_plain_source(content: &str) -> Vec<SourceLine> {
    content
        .lines()
        .enumerate()
        .map(|(idx, line)| SourceLine {
            text: line.to_string(),
            original_line: idx + 1,
        })
        .collect()
}

/// Extracts the contents of `brs` fenced blocks in document order.
///
/// A block ends at a fence at least as long as the one that opened it;
/// shorter fences inside a block are content.
fn extract_literate_source(content: &str) -> Vec<SourceLine> {
    let mut lines = Vec::new();
    let mut in_block = false;
    let mut fence_len = 0;

    for (idx, line) in content.lines().enumerate() {
        match fence_length(line) {
            Some(length) if in_block && length >= fence_len => {
                in_block = false;
                fence_len = 0;
            }
            Some(length) if !in_block => {
                let info = line.trim_start()[length..].trim();
                if info.split_whitespace().next() == Some(FENCE_TAG) {
                    in_block = true;
                    fence_len = length;
                }
            }
            _ if in_block => lines.push(SourceLine {
                text: line.to_string(),
                original_line: idx + 1,
            }),
            _ => {}
        }
    }

    lines
}

/// Number of backticks if `line` is a fence (at least three).
fn fence_length(line: &str) -> Option<usize> {
    let count = line.trim_start().chars().take_while(|&c| c == '`').count();
    (count >= 3).then_some(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    fn texts(lines: &[SourceLine]) -> Vec<&str> {
        lines.iter().map(|line| line.text.as_str()).collect()
    }

    #[test]
    fn plain_text_passthrough() {
        let source = LineSource::from_text("main", "~GATE\n/ri1e~ha\n");
        let lines = source.lines().unwrap();
        assert_eq!(texts(&lines), vec!["~GATE", "/ri1e~ha"]);
        assert_eq!(lines[1].original_line, 2);
    }

    #[test]
    fn empty_text_has_no_lines() {
        assert!(LineSource::from_text("empty", "").lines().unwrap().is_empty());
    }

    #[test]
    fn literate_keeps_only_tagged_blocks() {
        let content = "\
# Title

```brs
~GATE
```

```python
print('no')
```

````brs
/ri1e
```
/~ha
````
";
        let lines = LineSource::from_literate_text("doc", content)
            .lines()
            .unwrap();
        assert_eq!(texts(&lines), vec!["~GATE", "/ri1e", "```", "/~ha"]);
        assert_eq!(lines[0].original_line, 4);
        assert_eq!(lines[1].original_line, 12);
    }

    #[test]
    fn tag_must_be_exact() {
        let content = "```brsx\n/nope\n```\n";
        assert!(extract_literate_source(content).is_empty());
    }

    #[test]
    fn indented_fences_are_recognised() {
        let content = "  ```brs\n/a\n  ```\n";
        assert_eq!(texts(&extract_literate_source(content)), vec!["/a"]);
    }

    #[rstest]
    #[case("lib.brs", "lib")]
    #[case("lib.brs.md", "lib")]
    #[case("dir/heap.brs", "heap")]
    #[case("notes.txt", "notes.txt")]
    fn file_names_become_source_names(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(LineSource::from_file(path).name(), expected);
    }

    #[test]
    fn file_sources_read_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("later.brs");
        let source = LineSource::from_file(&path);

        assert!(matches!(source.lines(), Err(TranslatorError::Io { .. })));

        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "/ri5e").unwrap();
        assert_eq!(texts(&source.lines().unwrap()), vec!["/ri5e"]);
    }

    #[test]
    fn literate_files_are_detected_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guide.brs.md");
        fs::write(&path, "prose\n```brs\n/ri2e\n```\n").unwrap();
        let source = LineSource::from_file(&path);
        assert_eq!(source.name(), "guide");
        assert_eq!(texts(&source.lines().unwrap()), vec!["/ri2e"]);
    }
}

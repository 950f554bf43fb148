//! Translator for Backrooms source text.
//!
//! Turns a main [`LineSource`] and its `%` includes into a populated
//! [`Rooms`](backrooms_core::Rooms) plane ready for a
//! [`Portal`](backrooms_core::Portal).

/// Translation error type.
pub mod errors;
pub use errors::TranslatorError;

/// Include queue and namespaces.
pub mod include;
pub use include::SourceQueue;

/// Plain and literate line sources.
pub mod source;
pub use source::{LineSource, SourceLine, LITERATE_EXTENSION, SOURCE_EXTENSION};

/// The line-form interpreter.
pub mod translator;
pub use translator::{translate, translate_text};

#[cfg(test)]
use proptest as _;

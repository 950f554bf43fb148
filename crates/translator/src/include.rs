//! Include resolution across priority-ordered namespaces.
//!
//! A translation starts from one main source. `%` lines pull further sources
//! in by name; each name is queued at most once per run, so repeated or
//! circular includes are harmless.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::debug;

use crate::errors::TranslatorError;
use crate::source::LineSource;

/// Sources waiting to be translated, plus everything that may be included.
#[derive(Debug, Clone)]
pub struct SourceQueue {
    pending: VecDeque<LineSource>,
    namespaces: Vec<HashMap<String, LineSource>>,
    used: HashSet<String>,
}

impl SourceQueue {
    /// Queues `main` and indexes `namespaces`, highest priority first.
    ///
    /// # Errors
    ///
    /// Returns [`TranslatorError::NameCollision`] if two sources in the same
    /// namespace share a name. The same name in different namespaces is fine.
    pub fn new(
        main: LineSource,
        namespaces: Vec<Vec<LineSource>>,
    ) -> Result<Self, TranslatorError> {
        let namespaces = namespaces
            .into_iter()
            .map(|namespace| {
                let mut index = HashMap::with_capacity(namespace.len());
                for source in namespace {
                    let name = source.name().to_string();
                    if index.contains_key(&name) {
                        return Err(TranslatorError::NameCollision(name));
                    }
                    index.insert(name, source);
                }
                Ok(index)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let used = HashSet::from([main.name().to_string()]);
        Ok(Self {
            pending: VecDeque::from([main]),
            namespaces,
            used,
        })
    }

    /// A queue holding only `main`.
    #[must_use]
    pub fn single(main: LineSource) -> Self {
        let used = HashSet::from([main.name().to_string()]);
        Self {
            pending: VecDeque::from([main]),
            namespaces: Vec::new(),
            used,
        }
    }

    /// Queues the source called `name` unless it was already queued.
    ///
    /// Returns whether the source was newly queued.
    ///
    /// # Errors
    ///
    /// Returns [`TranslatorError::MissingInclude`] if no namespace has it.
    pub fn include(&mut self, name: &str) -> Result<bool, TranslatorError> {
        if self.used.contains(name) {
            return Ok(false);
        }
        let source = self
            .namespaces
            .iter_mut()
            .find_map(|namespace| namespace.remove(name))
            .ok_or_else(|| TranslatorError::MissingInclude(name.to_string()))?;
        debug!(include = name, "queued include");
        self.used.insert(name.to_string());
        self.pending.push_back(source);
        Ok(true)
    }

    /// Takes the next source to translate.
    pub fn next_source(&mut self) -> Option<LineSource> {
        self.pending.pop_front()
    }

    /// Whether every queued source has been taken.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

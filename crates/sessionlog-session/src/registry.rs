use std::collections::HashMap;

use tracing::warn;

/// Ordered set of declared action names resolved once at configuration load.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl ActionRegistry {
    /// Builds the registry keeping the first occurrence of each name.
    /// Empty names and duplicates are skipped with a warning.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Self::default();
        for name in names {
            let name = name.as_ref();
            if name.is_empty() {
                warn!("Ignoring empty action name in session configuration");
                continue;
            }
            if registry.index.contains_key(name) {
                warn!(
                    "Duplicate action name '{}' in session configuration; only the first occurrence is used",
                    name
                );
                continue;
            }
            registry.index.insert(name.to_owned(), registry.names.len());
            registry.names.push(name.to_owned());
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn name_at(&self, position: usize) -> Option<&str> {
        self.names.get(position).map(String::as_str)
    }

    /// Names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

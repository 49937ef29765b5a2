use super::DocumentKind;
use std::collections::BTreeMap;

/// Maps each document kind to the collection that stores it.
///
/// Built once at startup and handed to the handlers, so the collection a
/// kind lands in never depends on a naming convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionMap {
    names: BTreeMap<DocumentKind, String>,
}

impl CollectionMap {
    /// Use a different collection for one kind
    pub fn with(mut self, kind: DocumentKind, collection: impl Into<String>) -> Self {
        self.names.insert(kind, collection.into());
        self
    }

    pub fn collection(&self, kind: DocumentKind) -> &str {
        // `names` is fully populated by `Default` and entries are only replaced
        self.names.get(&kind).map(String::as_str).unwrap_or(kind.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocumentKind, &str)> {
        self.names.iter().map(|(kind, name)| (*kind, name.as_str()))
    }
}

impl Default for CollectionMap {
    fn default() -> Self {
        let names = DocumentKind::ALL
            .iter()
            .map(|kind| (*kind, kind.as_str().to_string()))
            .collect();
        Self { names }
    }
}

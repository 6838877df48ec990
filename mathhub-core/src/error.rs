//! Error taxonomy and structured warnings.
//!
//! Only two conditions cross the engine boundary as failures: the
//! dataset load failing ([`Error::Load`]) and a requested top-level id
//! being absent ([`Error::NotFound`]). Every other anomaly is absorbed
//! into a [`Warning`] so a single bad record never fails a whole query.

use thiserror::Error;

/// Errors surfaced to callers of the query API.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying dataset load failed; fatal to every query of
    /// that load attempt.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// A requested top-level identifier does not exist in the dataset.
    #[error("no entry {id} exists in {collection}")]
    NotFound {
        /// The missing identifier.
        id: String,
        /// The collection that was searched.
        collection: &'static str,
    },
}

impl Error {
    pub(crate) fn not_found(id: impl Into<String>, collection: &'static str) -> Self {
        Error::NotFound {
            id: id.into(),
            collection,
        }
    }
}

/// The dataset loader's supply operation failed.
///
/// `Clone` so that a single failed load attempt can be delivered to
/// every waiter sharing that attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("dataset load failed: {message}")]
pub struct LoadError {
    message: String,
}

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// A non-fatal anomaly encountered while resolving a query.
///
/// Warnings are values, not just log lines: each query returns the
/// warnings it absorbed so callers and tests can assert on degradation
/// instead of grepping logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A reference field points at an id that does not exist in the
    /// collection it should live in. Resolution proceeded with a
    /// degraded (partially empty) object.
    DanglingReference {
        id: String,
        collection: &'static str,
    },

    /// A record's kind discriminator is not recognized. The record was
    /// passed through largely unmodified.
    UnknownKind { id: String, kind: String },

    /// An archive's narrative children did not reduce to exactly one
    /// root document. A fallback root was substituted.
    StructuralInconsistency {
        archive: String,
        /// Number of top-level children actually found.
        children: usize,
    },
}

impl Warning {
    /// True if this warning concerns the given id.
    pub fn concerns(&self, id: &str) -> bool {
        match self {
            Warning::DanglingReference { id: i, .. } => i == id,
            Warning::UnknownKind { id: i, .. } => i == id,
            Warning::StructuralInconsistency { archive, .. } => archive == id,
        }
    }
}

/// A query result together with the warnings absorbed while building it.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    /// The materialized value, possibly degraded.
    pub value: T,
    /// Warnings encountered, in resolution order.
    pub warnings: Vec<Warning>,
}

impl<T> Resolved<T> {
    pub(crate) fn new(value: T, warnings: Vec<Warning>) -> Self {
        Self { value, warnings }
    }

    /// Discard the warnings and keep the value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// True if resolution completed without any degradation.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_id_and_collection() {
        let err = Error::not_found("does-not-exist", "archives");
        let msg = err.to_string();
        assert!(msg.contains("does-not-exist"));
        assert!(msg.contains("archives"));
    }

    #[test]
    fn load_error_is_cloneable() {
        let err = LoadError::new("connection refused");
        let clone = err.clone();
        assert_eq!(err, clone);
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn warning_concerns() {
        let w = Warning::DanglingReference {
            id: "a1".to_string(),
            collection: "archives",
        };
        assert!(w.concerns("a1"));
        assert!(!w.concerns("a2"));
    }
}

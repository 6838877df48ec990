//! Testing utilities for the resolution engine.
//!
//! Provides a [`DatasetBuilder`] for assembling small in-memory
//! datasets, an instrumented loader for asserting the single-flight
//! property, and assertion helpers for query results.

use crate::dataset::{
    ArchiveRecord, DataSet, DocumentRecord, GroupRecord, ModuleRecord, OpaqueRecord, RecordRef,
    TheoryRecord, UnknownRecord, VersionInfo, ViewRecord,
};
use crate::error::Resolved;
use crate::loader::{loader_fn, DatasetLoader};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Builds flat datasets for tests, one record at a time.
///
/// Records are created with sensible defaults; push full record
/// structs via the `push_*` methods when a test needs every field.
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    ds: DataSet,
}

impl DatasetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dataset's version record.
    pub fn version(mut self, number: impl Into<String>, date: impl Into<String>) -> Self {
        self.ds.version = VersionInfo {
            version_number: number.into(),
            build_date: date.into(),
        };
        self
    }

    /// Add a group with empty display fields.
    pub fn group(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.ds.groups.push(GroupRecord {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        });
        self
    }

    /// Add an untagged archive under the given group.
    pub fn archive(
        self,
        id: impl Into<String>,
        name: impl Into<String>,
        parent: impl Into<String>,
    ) -> Self {
        self.tagged_archive(id, name, parent, &[])
    }

    /// Add an archive under the given group carrying sigil-stripped tags.
    pub fn tagged_archive(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        parent: impl Into<String>,
        tags: &[&str],
    ) -> Self {
        self.ds.archives.push(ArchiveRecord {
            id: id.into(),
            name: name.into(),
            parent: RecordRef::new(parent),
            title: String::new(),
            teaser: String::new(),
            description: String::new(),
            responsible: Vec::new(),
            statistics: Vec::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            modules: Vec::new(),
        });
        self
    }

    /// Add a document under the given container (archive or document).
    pub fn document(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        parent: impl Into<String>,
    ) -> Self {
        self.ds.documents.push(DocumentRecord {
            id: id.into(),
            name: name.into(),
            parent: RecordRef::new(parent),
            statistics: Vec::new(),
            modules: Vec::new(),
        });
        self
    }

    /// Add an opaque content block under the given container.
    pub fn opaque(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        parent: impl Into<String>,
        format: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        self.ds.opaques.push(OpaqueRecord {
            id: id.into(),
            name: name.into(),
            parent: RecordRef::new(parent),
            content_format: format.into(),
            content: content.into(),
        });
        self
    }

    /// Add a theory without a meta-theory.
    pub fn theory(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.ds.modules.push(ModuleRecord::Theory(TheoryRecord {
            id: id.into(),
            name: name.into(),
            presentation: String::new(),
            source: None,
            meta: None,
        }));
        self
    }

    /// Add a theory declaring a meta-theory.
    pub fn theory_with_meta(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        meta: impl Into<String>,
    ) -> Self {
        self.ds.modules.push(ModuleRecord::Theory(TheoryRecord {
            id: id.into(),
            name: name.into(),
            presentation: String::new(),
            source: None,
            meta: Some(RecordRef::new(meta)),
        }));
        self
    }

    /// Add a view between two theories.
    pub fn view(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        domain: impl Into<String>,
        codomain: impl Into<String>,
    ) -> Self {
        self.ds.modules.push(ModuleRecord::View(ViewRecord {
            id: id.into(),
            name: name.into(),
            presentation: String::new(),
            source: None,
            domain: RecordRef::new(domain),
            codomain: RecordRef::new(codomain),
        }));
        self
    }

    /// Add a module record of an unrecognized kind.
    pub fn unknown_module(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        self.ds.modules.push(ModuleRecord::Unknown(UnknownRecord {
            id: id.into(),
            name: name.into(),
            kind: kind.into(),
            extra: serde_json::Map::new(),
        }));
        self
    }

    /// Declare modules as narrative children of an archive or document.
    ///
    /// Panics if no container with the id exists; tests should add the
    /// container first.
    pub fn declare_modules(mut self, container: &str, modules: &[&str]) -> Self {
        let refs = modules.iter().map(|m| RecordRef::new(*m));
        if let Some(archive) = self.ds.archives.iter_mut().find(|a| a.id == container) {
            archive.modules.extend(refs);
        } else if let Some(document) = self.ds.documents.iter_mut().find(|d| d.id == container) {
            document.modules.extend(refs);
        } else {
            panic!("no container {container} in dataset under construction");
        }
        self
    }

    /// Push a fully specified archive record.
    pub fn push_archive(mut self, record: ArchiveRecord) -> Self {
        self.ds.archives.push(record);
        self
    }

    /// Push a fully specified group record.
    pub fn push_group(mut self, record: GroupRecord) -> Self {
        self.ds.groups.push(record);
        self
    }

    pub fn build(self) -> DataSet {
        self.ds
    }
}

/// A loader over a fixed dataset that counts how many times it runs.
///
/// Use the counter to assert the single-flight property.
pub fn counting_loader(dataset: DataSet) -> (DatasetLoader, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in_loader = Arc::clone(&calls);
    let loader = loader_fn(move || {
        calls_in_loader.fetch_add(1, Ordering::SeqCst);
        let ds = dataset.clone();
        async move { Ok(ds) }
    });
    (loader, calls)
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert that a query resolved without any degradation.
#[track_caller]
pub fn assert_clean<T>(resolved: &Resolved<T>) {
    assert!(
        resolved.is_clean(),
        "expected clean resolution, got warnings: {:?}",
        resolved.warnings
    );
}

/// Assert that a query absorbed a warning concerning the given id.
#[track_caller]
pub fn assert_warned_about<T>(resolved: &Resolved<T>, id: &str) {
    assert!(
        resolved.warnings.iter().any(|w| w.concerns(id)),
        "expected a warning about '{id}', got: {:?}",
        resolved.warnings
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_assembles_collections() {
        let ds = DatasetBuilder::new()
            .group("g1", "algebra")
            .archive("a1", "sets", "g1")
            .document("d1", "intro", "a1")
            .theory("t1", "Sets")
            .declare_modules("a1", &["t1"])
            .build();

        assert_eq!(ds.groups.len(), 1);
        assert_eq!(ds.archives[0].modules, vec![RecordRef::new("t1")]);
        assert!(ds.theory("t1").is_some());
    }

    #[tokio::test]
    async fn counting_loader_counts() {
        let (loader, calls) = counting_loader(DataSet::default());
        loader().await.expect("load");
        loader().await.expect("load");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

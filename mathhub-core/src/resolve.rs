//! Reference resolution and entity materialization.
//!
//! A [`Resolver`] is a short-lived view over one dataset snapshot. It
//! builds shallow references (one parent level, no children) and fully
//! materialized entities (recursive parents, narrative children), and
//! collects every degradation it absorbs as a [`Warning`].
//!
//! Resolution is a pure function of (snapshot, id): the resolver never
//! mutates the snapshot and caches nothing between queries.

use crate::dataset::{DataSet, Kind, ModuleRecord, RecordRef, TAG_SIGIL};
use crate::entities::{
    Archive, Document, Entity, Group, Module, NarrativeElement, OpaqueElement, Tag, Theory, View,
};
use crate::error::Warning;
use crate::refs::{
    ArchiveRef, DocumentParentRef, DocumentRef, GroupRef, OpaqueRef, TagRef, TheoryRef, ViewRef,
};
use tracing::warn;

/// How to disambiguate a container id that could name a document or an
/// archive.
///
/// The dataset stores no discriminant on container references, so the
/// resolver probes both collections. On an id present in both, the
/// policy decides which wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParentProbePolicy {
    /// Probe documents first, fall back to archives.
    #[default]
    PreferDocument,
    /// Probe archives first, fall back to documents.
    PreferArchive,
}

/// Resolves references and materializes entities against one snapshot.
pub(crate) struct Resolver<'a> {
    ds: &'a DataSet,
    policy: ParentProbePolicy,
    warnings: Vec<Warning>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(ds: &'a DataSet, policy: ParentProbePolicy) -> Self {
        Self {
            ds,
            policy,
            warnings: Vec::new(),
        }
    }

    /// The warnings absorbed so far, in resolution order.
    pub(crate) fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }

    fn dangling(&mut self, id: &str, collection: &'static str) {
        warn!(id, collection, "cannot find referenced id in dataset");
        self.warnings.push(Warning::DanglingReference {
            id: id.to_string(),
            collection,
        });
    }

    // ========================================================================
    // Shallow references
    // ========================================================================

    pub(crate) fn group_ref(&mut self, id: &str) -> GroupRef {
        match self.ds.group(id) {
            Some(record) => GroupRef {
                id: record.id.clone(),
                name: record.name.clone(),
                title: record.title.clone(),
                teaser: record.teaser.clone(),
            },
            None => {
                self.dangling(id, "groups");
                GroupRef {
                    id: id.to_string(),
                    ..Default::default()
                }
            }
        }
    }

    /// Tags are validated syntactically, not looked up: a tag id must
    /// carry the sigil, and its name is the sigil-stripped id.
    pub(crate) fn tag_ref(&mut self, id: &str) -> TagRef {
        let name = match id.strip_prefix(TAG_SIGIL) {
            Some(name) => name.to_string(),
            None => {
                self.dangling(id, "tags");
                id.to_string()
            }
        };

        TagRef {
            id: id.to_string(),
            name,
        }
    }

    pub(crate) fn archive_ref(&mut self, id: &str) -> ArchiveRef {
        let ds = self.ds;
        let record = match ds.archive(id) {
            Some(record) => record,
            None => {
                self.dangling(id, "archives");
                return ArchiveRef {
                    id: id.to_string(),
                    ..Default::default()
                };
            }
        };

        let parent = self.group_ref(&record.parent.id);

        ArchiveRef {
            id: record.id.clone(),
            name: record.name.clone(),
            title: record.title.clone(),
            teaser: record.teaser.clone(),
            parent: Some(parent),
        }
    }

    /// Resolve a container id that may name a document or an archive,
    /// by existence probing under the configured policy. An id present
    /// in neither collection degrades through the fallback collection's
    /// dangling path.
    pub(crate) fn document_parent_ref(&mut self, id: &str) -> DocumentParentRef {
        let is_document = self.ds.document(id).is_some();
        let is_archive = self.ds.archive(id).is_some();

        let as_document = match self.policy {
            ParentProbePolicy::PreferDocument => is_document,
            ParentProbePolicy::PreferArchive => is_document && !is_archive,
        };

        if as_document {
            DocumentParentRef::Document(self.document_ref(id))
        } else {
            DocumentParentRef::Archive(self.archive_ref(id))
        }
    }

    pub(crate) fn document_ref(&mut self, id: &str) -> DocumentRef {
        let ds = self.ds;
        let record = match ds.document(id) {
            Some(record) => record,
            None => {
                self.dangling(id, "documents");
                return DocumentRef {
                    id: id.to_string(),
                    ..Default::default()
                };
            }
        };

        let parent = self.document_parent_ref(&record.parent.id);

        DocumentRef {
            id: record.id.clone(),
            name: record.name.clone(),
            parent: Some(Box::new(parent)),
        }
    }

    pub(crate) fn opaque_ref(&mut self, id: &str) -> OpaqueRef {
        let ds = self.ds;
        let record = match ds.opaque(id) {
            Some(record) => record,
            None => {
                self.dangling(id, "opaques");
                return OpaqueRef {
                    id: id.to_string(),
                    ..Default::default()
                };
            }
        };

        let parent = self.document_parent_ref(&record.parent.id);

        OpaqueRef {
            id: record.id.clone(),
            name: record.name.clone(),
            parent: Some(Box::new(parent)),
        }
    }

    pub(crate) fn theory_ref(&mut self, id: &str) -> TheoryRef {
        match self.ds.theory(id) {
            Some(record) => TheoryRef {
                id: record.id.clone(),
                name: record.name.clone(),
            },
            None => {
                self.dangling(id, "modules (as theory)");
                TheoryRef {
                    id: id.to_string(),
                    ..Default::default()
                }
            }
        }
    }

    pub(crate) fn view_ref(&mut self, id: &str) -> ViewRef {
        match self.ds.view(id) {
            Some(record) => ViewRef {
                id: record.id.clone(),
                name: record.name.clone(),
            },
            None => {
                self.dangling(id, "modules (as view)");
                ViewRef {
                    id: id.to_string(),
                    ..Default::default()
                }
            }
        }
    }

    // ========================================================================
    // Full materialization
    // ========================================================================

    pub(crate) fn group(&mut self, id: &str) -> Group {
        let reference = self.group_ref(id);
        let ds = self.ds;

        let archive_ids: Vec<&str> = ds
            .archives
            .iter()
            .filter(|a| a.parent.id == id)
            .map(|a| a.id.as_str())
            .collect();
        let archives = archive_ids
            .into_iter()
            .map(|a| self.archive_ref(a))
            .collect();

        let record = ds.group(id);
        Group {
            reference,
            description: record.map(|r| r.description.clone()).unwrap_or_default(),
            responsible: record.map(|r| r.responsible.clone()).unwrap_or_default(),
            statistics: record.map(|r| r.statistics.clone()).unwrap_or_default(),
            archives,
        }
    }

    pub(crate) fn tag(&mut self, id: &str) -> Tag {
        let reference = self.tag_ref(id);
        let ds = self.ds;

        // Reverse index: no stored tag records exist, so tagged
        // archives are found by scanning every archive's tag list.
        let archive_ids: Vec<&str> = ds
            .archives
            .iter()
            .filter(|a| a.tags.iter().any(|t| *t == reference.name))
            .map(|a| a.id.as_str())
            .collect();
        let archives = archive_ids
            .into_iter()
            .map(|a| self.archive_ref(a))
            .collect();

        Tag { reference, archives }
    }

    pub(crate) fn archive(&mut self, id: &str) -> Archive {
        let reference = self.archive_ref(id);
        let ds = self.ds;

        let record = match ds.archive(id) {
            Some(record) => record,
            None => {
                // archive_ref already flagged the dangling id.
                return Archive {
                    reference,
                    description: String::new(),
                    responsible: Vec::new(),
                    statistics: Vec::new(),
                    tags: Vec::new(),
                    narrative_root: Document::placeholder(),
                };
            }
        };

        let children = self.narrative_children(id, &record.modules);
        let narrative_root = self.narrative_root(id, children);

        let tags = record
            .tags
            .iter()
            .map(|t| self.tag_ref(&format!("{TAG_SIGIL}{t}")))
            .collect();

        Archive {
            reference,
            description: record.description.clone(),
            responsible: record.responsible.clone(),
            statistics: record.statistics.clone(),
            tags,
            narrative_root,
        }
    }

    pub(crate) fn document(&mut self, id: &str) -> Document {
        let reference = self.document_ref(id);
        let ds = self.ds;

        let record = match ds.document(id) {
            Some(record) => record,
            None => {
                return Document {
                    reference,
                    statistics: Vec::new(),
                    decls: Vec::new(),
                }
            }
        };

        let decls = self.narrative_children(id, &record.modules);

        Document {
            reference,
            statistics: record.statistics.clone(),
            decls,
        }
    }

    pub(crate) fn opaque(&mut self, id: &str) -> OpaqueElement {
        let reference = self.opaque_ref(id);
        let record = self.ds.opaque(id);

        OpaqueElement {
            reference,
            content_format: record.map(|r| r.content_format.clone()).unwrap_or_default(),
            content: record.map(|r| r.content.clone()).unwrap_or_default(),
        }
    }

    pub(crate) fn theory(&mut self, id: &str) -> Theory {
        let ds = self.ds;
        let reference = self.theory_ref(id);
        let record = ds.theory(id);

        let meta = record
            .and_then(|r| r.meta.as_ref())
            .map(|m| self.theory_ref(&m.id));

        Theory {
            reference,
            presentation: record.map(|r| r.presentation.clone()).unwrap_or_default(),
            source: record.and_then(|r| r.source.clone()),
            meta,
        }
    }

    pub(crate) fn view(&mut self, id: &str) -> View {
        let ds = self.ds;
        let reference = self.view_ref(id);
        let record = ds.view(id);

        // view_ref already flagged a missing record; degraded views
        // keep empty endpoint references rather than probing further.
        let domain = match record {
            Some(r) => self.theory_ref(&r.domain.id),
            None => TheoryRef::default(),
        };
        let codomain = match record {
            Some(r) => self.theory_ref(&r.codomain.id),
            None => TheoryRef::default(),
        };

        View {
            reference,
            presentation: record.map(|r| r.presentation.clone()).unwrap_or_default(),
            source: record.and_then(|r| r.source.clone()),
            domain,
            codomain,
        }
    }

    // ========================================================================
    // Kind dispatch
    // ========================================================================

    /// Materialize a module record, dispatching on its kind. An
    /// unrecognized kind is passed through largely unmodified so the
    /// caller can still render something.
    pub(crate) fn module(&mut self, record: &ModuleRecord) -> Module {
        match record {
            ModuleRecord::Theory(t) => Module::Theory(self.theory(&t.id)),
            ModuleRecord::View(v) => Module::View(self.view(&v.id)),
            ModuleRecord::Unknown(u) => {
                warn!(id = %u.id, kind = %u.kind, "unknown record kind, skipping cleanup");
                self.warnings.push(Warning::UnknownKind {
                    id: u.id.clone(),
                    kind: u.kind.clone(),
                });
                Module::Unknown(u.clone())
            }
        }
    }

    /// Materialize the entity of a known kind. One dispatch point: a
    /// new kind means one new arm here and its materializer above.
    pub(crate) fn entity(&mut self, kind: Kind, id: &str) -> Entity {
        match kind {
            Kind::Group => Entity::Group(self.group(id)),
            Kind::Tag => Entity::Tag(self.tag(id)),
            Kind::Archive => Entity::Archive(self.archive(id)),
            Kind::Document => Entity::Document(self.document(id)),
            Kind::Opaque => Entity::Opaque(self.opaque(id)),
            Kind::Theory => Entity::Module(Module::Theory(self.theory(id))),
            Kind::View => Entity::Module(Module::View(self.view(id))),
        }
    }

    // ========================================================================
    // Narrative tree
    // ========================================================================

    /// Gather a container's heterogeneous children: opaques whose
    /// parent matches, documents whose parent matches, then the
    /// container's declared modules, concatenated in that order.
    ///
    /// The order carries no authored meaning; it is stable within a
    /// call and nothing more. Declared modules that do not resolve are
    /// dropped with a warning.
    pub(crate) fn narrative_children(
        &mut self,
        parent_id: &str,
        declared: &[RecordRef],
    ) -> Vec<NarrativeElement> {
        let ds = self.ds;
        let mut children = Vec::new();

        let opaque_ids: Vec<&str> = ds
            .opaques
            .iter()
            .filter(|o| o.parent.id == parent_id)
            .map(|o| o.id.as_str())
            .collect();
        for id in opaque_ids {
            children.push(NarrativeElement::Opaque(self.opaque(id)));
        }

        let document_ids: Vec<&str> = ds
            .documents
            .iter()
            .filter(|d| d.parent.id == parent_id)
            .map(|d| d.id.as_str())
            .collect();
        for id in document_ids {
            children.push(NarrativeElement::Document(Box::new(self.document(id))));
        }

        for declared_ref in declared {
            match ds.module(&declared_ref.id) {
                Some(ModuleRecord::Theory(t)) => {
                    children.push(NarrativeElement::Theory(self.theory_ref(&t.id)));
                }
                Some(ModuleRecord::View(v)) => {
                    children.push(NarrativeElement::View(self.view_ref(&v.id)));
                }
                Some(ModuleRecord::Unknown(u)) => {
                    warn!(id = %u.id, kind = %u.kind, "unknown declared module kind");
                    self.warnings.push(Warning::UnknownKind {
                        id: u.id.clone(),
                        kind: u.kind.clone(),
                    });
                }
                None => self.dangling(&declared_ref.id, "modules"),
            }
        }

        children
    }

    /// Reduce an archive's narrative children to its single root
    /// document. Zero or multiple children is a data-consistency fault:
    /// flagged as a warning, then any document-kind child is used, or
    /// an empty shell if none exists. Never a hard error; an archive
    /// page must always render.
    fn narrative_root(&mut self, archive_id: &str, mut children: Vec<NarrativeElement>) -> Document {
        let single_document = children.len() == 1 && children[0].is_document();
        if !single_document {
            warn!(
                archive = archive_id,
                children = children.len(),
                "expected exactly one narrative root"
            );
            self.warnings.push(Warning::StructuralInconsistency {
                archive: archive_id.to_string(),
                children: children.len(),
            });
        }

        let position = children.iter().position(NarrativeElement::is_document);
        match position.map(|i| children.swap_remove(i)) {
            Some(NarrativeElement::Document(document)) => *document,
            _ => Document::placeholder(),
        }
    }
}

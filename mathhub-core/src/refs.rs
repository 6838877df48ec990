//! Shallow references: minimal typed pointers to entities.
//!
//! A shallow reference carries kind, id, display name, the
//! reference-safe display fields (title, teaser where the record has
//! them) and at most one level of parent reference. Constructing one
//! never descends into children and never recurses beyond its own
//! parent link, which is what makes listing entries and parent chains
//! cheap to build.
//!
//! A reference whose backing record is missing from the dataset is
//! `degraded`: display fields are empty and its parent is `None`. The
//! resolver records a [`crate::error::Warning`] whenever it builds one.

use crate::dataset::Html;
use serde::Serialize;

/// Reference to a group. Groups are top-level: no parent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupRef {
    pub id: String,
    pub name: String,
    pub title: Html,
    pub teaser: Html,
}

/// Reference to an archive; its parent is the owning group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArchiveRef {
    pub id: String,
    pub name: String,
    pub title: Html,
    pub teaser: Html,

    /// Owning group, one level deep. `None` only when the archive
    /// record itself is missing.
    pub parent: Option<GroupRef>,
}

/// Reference to a document; its parent is a document or an archive.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentRef {
    pub id: String,
    pub name: String,

    /// Containing document or archive. `None` only when the document
    /// record itself is missing.
    pub parent: Option<Box<DocumentParentRef>>,
}

/// A document's container: archives hold top-level documents,
/// documents hold sub-documents.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DocumentParentRef {
    Document(DocumentRef),
    Archive(ArchiveRef),
}

impl DocumentParentRef {
    pub fn id(&self) -> &str {
        match self {
            DocumentParentRef::Document(d) => &d.id,
            DocumentParentRef::Archive(a) => &a.id,
        }
    }
}

/// Reference to an opaque content block inside a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OpaqueRef {
    pub id: String,
    pub name: String,

    /// Containing document or archive. `None` only when the opaque
    /// record itself is missing.
    pub parent: Option<Box<DocumentParentRef>>,
}

/// Reference to a theory. Modules are top-level: no parent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TheoryRef {
    pub id: String,
    pub name: String,
}

/// Reference to a view. Modules are top-level: no parent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewRef {
    pub id: String,
    pub name: String,
}

/// Reference to a virtual tag entity.
///
/// Tags have no stored record: the id carries the sigil
/// ([`crate::dataset::TAG_SIGIL`]), the name is the sigil-stripped id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TagRef {
    pub id: String,
    pub name: String,
}

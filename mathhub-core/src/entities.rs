//! Fully materialized entities.
//!
//! A materialized entity is its shallow reference plus every remaining
//! kind-specific field, with parents resolved up the containment chain
//! and, for containers, the complete narrative children collection.
//! The containment axis (group → archive → document → opaque /
//! sub-document) is assumed acyclic, so materialization always bottoms
//! out.

use crate::dataset::{Html, Statistic, UnknownRecord};
use crate::refs::{ArchiveRef, DocumentRef, GroupRef, OpaqueRef, TagRef, TheoryRef, ViewRef};
use serde::Serialize;

/// A fully materialized group.
#[derive(Debug, Clone, Serialize)]
pub struct Group {
    #[serde(flatten)]
    pub reference: GroupRef,

    pub description: Html,
    pub responsible: Vec<String>,
    pub statistics: Vec<Statistic>,

    /// All archives whose parent is this group, computed by scanning
    /// the archive collection; the dataset stores no back-pointers.
    pub archives: Vec<ArchiveRef>,
}

/// A fully materialized (virtual) tag.
#[derive(Debug, Clone, Serialize)]
pub struct Tag {
    #[serde(flatten)]
    pub reference: TagRef,

    /// All archives whose tag list contains this tag's name, computed
    /// by scanning the archive collection.
    pub archives: Vec<ArchiveRef>,
}

/// A fully materialized archive.
#[derive(Debug, Clone, Serialize)]
pub struct Archive {
    #[serde(flatten)]
    pub reference: ArchiveRef,

    pub description: Html,
    pub responsible: Vec<String>,
    pub statistics: Vec<Statistic>,
    pub tags: Vec<TagRef>,

    /// The archive's single root document. When the narrative children
    /// do not reduce to exactly one document this is a fallback (any
    /// document child, or an empty shell) and the query carries a
    /// structural-inconsistency warning.
    pub narrative_root: Document,
}

/// A fully materialized document.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    #[serde(flatten)]
    pub reference: DocumentRef,

    pub statistics: Vec<Statistic>,

    /// The document's narrative children. Concatenation order is
    /// opaques, then sub-documents, then declared modules; within a
    /// query the order is stable, but it does not reflect any authored
    /// reading order.
    pub decls: Vec<NarrativeElement>,
}

impl Document {
    /// The empty-shell placeholder used when an archive has no usable
    /// narrative root.
    pub(crate) fn placeholder() -> Self {
        Self {
            reference: DocumentRef::default(),
            statistics: Vec::new(),
            decls: Vec::new(),
        }
    }
}

/// A fully materialized opaque content block.
#[derive(Debug, Clone, Serialize)]
pub struct OpaqueElement {
    #[serde(flatten)]
    pub reference: OpaqueRef,

    /// Format of `content`, e.g. `"text"` or `"html"`.
    pub content_format: String,
    pub content: String,
}

/// A fully materialized theory.
#[derive(Debug, Clone, Serialize)]
pub struct Theory {
    #[serde(flatten)]
    pub reference: TheoryRef,

    pub presentation: Html,
    pub source: Option<String>,

    /// The theory's meta-theory, if it declares one.
    pub meta: Option<TheoryRef>,
}

/// A fully materialized view.
#[derive(Debug, Clone, Serialize)]
pub struct View {
    #[serde(flatten)]
    pub reference: ViewRef,

    pub presentation: Html,
    pub source: Option<String>,

    pub domain: TheoryRef,
    pub codomain: TheoryRef,
}

/// A materialized module: theory, view, or an unrecognized record
/// passed through unmodified.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Module {
    Theory(Theory),
    View(View),
    Unknown(UnknownRecord),
}

impl Module {
    pub fn id(&self) -> &str {
        match self {
            Module::Theory(t) => &t.reference.id,
            Module::View(v) => &v.reference.id,
            Module::Unknown(u) => &u.id,
        }
    }
}

/// One element of a container's narrative children.
///
/// Opaques and sub-documents are materialized in full (documents
/// recursively); declared modules stay shallow references.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum NarrativeElement {
    Opaque(OpaqueElement),
    Document(Box<Document>),
    Theory(TheoryRef),
    View(ViewRef),
}

impl NarrativeElement {
    pub fn id(&self) -> &str {
        match self {
            NarrativeElement::Opaque(o) => &o.reference.id,
            NarrativeElement::Document(d) => &d.reference.id,
            NarrativeElement::Theory(t) => &t.id,
            NarrativeElement::View(v) => &v.id,
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self, NarrativeElement::Document(_))
    }
}

/// Any materialized entity, as returned by identifier resolution when
/// the caller does not know the kind up front.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Entity {
    Group(Group),
    Tag(Tag),
    Archive(Archive),
    Document(Document),
    Opaque(OpaqueElement),
    Module(Module),
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Entity::Group(g) => &g.reference.id,
            Entity::Tag(t) => &t.reference.id,
            Entity::Archive(a) => &a.reference.id,
            Entity::Document(d) => &d.reference.id,
            Entity::Opaque(o) => &o.reference.id,
            Entity::Module(m) => m.id(),
        }
    }
}

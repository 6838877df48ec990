//! Flat dataset records as supplied by the dataset loader.
//!
//! The engine consumes a single snapshot of shallowly-linked records:
//! every relation between records is expressed as a [`RecordRef`]
//! carrying only an id. Nothing here is resolved; resolution happens in
//! [`crate::resolve`].
//!
//! The shape mirrors the `mock.json` payload: one collection per record
//! kind plus a version record.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rendered HTML payloads carried verbatim from the dataset.
pub type Html = String;

// ============================================================================
// Kinds
// ============================================================================

/// Discriminator selecting which resolver/materializer applies to a record.
///
/// Replaces an untyped kind string: adding a kind means adding a variant
/// here and one dispatch arm in the resolver, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Group,
    Archive,
    Document,
    Opaque,
    Theory,
    View,
    Tag,
}

impl Kind {
    /// The kind tag as it appears in the dataset.
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Group => "group",
            Kind::Archive => "archive",
            Kind::Document => "document",
            Kind::Opaque => "opaque",
            Kind::Theory => "theory",
            Kind::View => "view",
            Kind::Tag => "tag",
        }
    }

    /// Parse a kind tag, returning `None` for unrecognized kinds.
    pub fn parse(s: &str) -> Option<Kind> {
        match s {
            "group" => Some(Kind::Group),
            "archive" => Some(Kind::Archive),
            "document" => Some(Kind::Document),
            "opaque" => Some(Kind::Opaque),
            "theory" => Some(Kind::Theory),
            "view" => Some(Kind::View),
            "tag" => Some(Kind::Tag),
            _ => None,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The sigil marking a tag identifier (`@algebra`). Tags are virtual:
/// they exist only as entries in archives' tag lists, never as stored
/// records.
pub const TAG_SIGIL: char = '@';

// ============================================================================
// Records
// ============================================================================

/// A shallow reference as stored: an id and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    pub id: String,
}

impl RecordRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Version/info record supplied alongside the dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    /// Human-readable version of the backend that produced the dataset.
    #[serde(default)]
    pub version_number: String,

    /// Build date of that backend, as an opaque string.
    #[serde(default)]
    pub build_date: String,
}

/// A single pre-computed statistic entry (e.g. declaration counts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistic {
    pub key: String,
    pub value: u64,
}

/// A stored group record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub title: Html,
    #[serde(default)]
    pub teaser: Html,

    #[serde(default)]
    pub description: Html,
    #[serde(default)]
    pub responsible: Vec<String>,
    #[serde(default)]
    pub statistics: Vec<Statistic>,
}

/// A stored archive record. `parent` names the owning group; `modules`
/// names the theories/views declared at the archive's narrative root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveRecord {
    pub id: String,
    pub name: String,
    pub parent: RecordRef,

    #[serde(default)]
    pub title: Html,
    #[serde(default)]
    pub teaser: Html,

    #[serde(default)]
    pub description: Html,
    #[serde(default)]
    pub responsible: Vec<String>,
    #[serde(default)]
    pub statistics: Vec<Statistic>,

    /// Sigil-stripped tag names this archive is tagged with.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Modules declared by the archive's narrative root.
    #[serde(default)]
    pub modules: Vec<RecordRef>,
}

/// A stored document record. `parent` may name a document or an archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: String,
    pub name: String,
    pub parent: RecordRef,

    #[serde(default)]
    pub statistics: Vec<Statistic>,

    /// Modules declared by this document.
    #[serde(default)]
    pub modules: Vec<RecordRef>,
}

/// A stored opaque content block: an unstructured payload inside a
/// document, carried through without interpretation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpaqueRecord {
    pub id: String,
    pub name: String,
    pub parent: RecordRef,

    /// Format of `content`, e.g. `"text"` or `"html"`.
    #[serde(default)]
    pub content_format: String,
    #[serde(default)]
    pub content: String,
}

/// A stored theory record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TheoryRecord {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub presentation: Html,
    #[serde(default)]
    pub source: Option<String>,

    /// Optional meta-theory reference.
    #[serde(default)]
    pub meta: Option<RecordRef>,
}

/// A stored view record mapping a domain theory into a codomain theory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRecord {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub presentation: Html,
    #[serde(default)]
    pub source: Option<String>,

    pub domain: RecordRef,
    pub codomain: RecordRef,
}

/// A record whose kind discriminator is not recognized.
///
/// Kept as a best-effort passthrough so a single bad record degrades
/// one entry instead of failing the whole dataset parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnknownRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: String,

    /// All remaining fields, untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A stored module record, discriminated by its `kind` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModuleRecord {
    Theory(TheoryRecord),
    View(ViewRecord),
    /// Unrecognized module kind, carried through for diagnostics.
    #[serde(untagged)]
    Unknown(UnknownRecord),
}

impl ModuleRecord {
    /// The record's identifier, regardless of kind.
    pub fn id(&self) -> &str {
        match self {
            ModuleRecord::Theory(t) => &t.id,
            ModuleRecord::View(v) => &v.id,
            ModuleRecord::Unknown(u) => &u.id,
        }
    }

    /// The record's display name, regardless of kind.
    pub fn name(&self) -> &str {
        match self {
            ModuleRecord::Theory(t) => &t.name,
            ModuleRecord::View(v) => &v.name,
            ModuleRecord::Unknown(u) => &u.name,
        }
    }
}

// ============================================================================
// Dataset
// ============================================================================

/// The complete flat dataset, loaded exactly once per cache lifetime
/// and treated as immutable from then on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSet {
    #[serde(default)]
    pub version: VersionInfo,

    #[serde(default)]
    pub groups: Vec<GroupRecord>,
    #[serde(default)]
    pub archives: Vec<ArchiveRecord>,

    #[serde(default)]
    pub documents: Vec<DocumentRecord>,
    #[serde(default)]
    pub opaques: Vec<OpaqueRecord>,

    #[serde(default)]
    pub modules: Vec<ModuleRecord>,
}

impl DataSet {
    pub fn group(&self, id: &str) -> Option<&GroupRecord> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn archive(&self, id: &str) -> Option<&ArchiveRecord> {
        self.archives.iter().find(|a| a.id == id)
    }

    pub fn document(&self, id: &str) -> Option<&DocumentRecord> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn opaque(&self, id: &str) -> Option<&OpaqueRecord> {
        self.opaques.iter().find(|o| o.id == id)
    }

    pub fn module(&self, id: &str) -> Option<&ModuleRecord> {
        self.modules.iter().find(|m| m.id() == id)
    }

    pub fn theory(&self, id: &str) -> Option<&TheoryRecord> {
        self.modules.iter().find_map(|m| match m {
            ModuleRecord::Theory(t) if t.id == id => Some(t),
            _ => None,
        })
    }

    pub fn view(&self, id: &str) -> Option<&ViewRecord> {
        self.modules.iter().find_map(|m| match m {
            ModuleRecord::View(v) if v.id == id => Some(v),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trip() {
        for kind in [
            Kind::Group,
            Kind::Archive,
            Kind::Document,
            Kind::Opaque,
            Kind::Theory,
            Kind::View,
            Kind::Tag,
        ] {
            assert_eq!(Kind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(Kind::parse("notebook"), None);
    }

    #[test]
    fn module_records_parse_by_kind() {
        let json = r#"[
            {"kind": "theory", "id": "t1", "name": "Monoids",
             "presentation": "<p>Monoids</p>"},
            {"kind": "view", "id": "v1", "name": "MonToGrp",
             "presentation": "", "domain": {"id": "t1"}, "codomain": {"id": "t2"}},
            {"kind": "diagram", "id": "x1", "name": "Mystery", "shape": "round"}
        ]"#;

        let modules: Vec<ModuleRecord> = serde_json::from_str(json).expect("parse");
        assert_eq!(modules.len(), 3);

        assert!(matches!(&modules[0], ModuleRecord::Theory(t) if t.id == "t1"));
        assert!(matches!(&modules[1], ModuleRecord::View(v) if v.domain.id == "t1"));

        match &modules[2] {
            ModuleRecord::Unknown(u) => {
                assert_eq!(u.kind, "diagram");
                assert_eq!(u.extra["shape"], "round");
            }
            other => panic!("expected unknown module, got {other:?}"),
        }
    }

    #[test]
    fn dataset_parses_with_missing_collections() {
        let ds: DataSet = serde_json::from_str(r#"{"groups": []}"#).expect("parse");
        assert!(ds.archives.is_empty());
        assert!(ds.modules.is_empty());
    }

    #[test]
    fn dataset_lookups() {
        let json = r#"{
            "version": {"versionNumber": "1.0", "buildDate": "2019-01-01"},
            "groups": [{"id": "g1", "name": "algebra"}],
            "archives": [{"id": "a1", "name": "sets", "parent": {"id": "g1"}}],
            "documents": [{"id": "d1", "name": "intro", "parent": {"id": "a1"}}],
            "opaques": [{"id": "o1", "name": "blurb", "parent": {"id": "d1"},
                         "contentFormat": "text", "content": "hello"}],
            "modules": [{"kind": "theory", "id": "t1", "name": "Sets"}]
        }"#;

        let ds: DataSet = serde_json::from_str(json).expect("parse");
        assert_eq!(ds.version.version_number, "1.0");
        assert!(ds.group("g1").is_some());
        assert!(ds.archive("a1").is_some());
        assert_eq!(ds.opaque("o1").map(|o| o.content.as_str()), Some("hello"));
        assert!(ds.theory("t1").is_some());
        assert!(ds.view("t1").is_none());
        assert!(ds.module("t1").is_some());
    }
}

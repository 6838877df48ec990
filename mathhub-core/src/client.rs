//! The public query API.
//!
//! [`MockClient`] answers entity queries against a mock dataset. Every
//! operation first awaits the single-flight dataset cache, then runs a
//! synchronous, side-effect-free traversal of the snapshot. Results
//! come wrapped in [`Resolved`] so callers see the warnings a query
//! absorbed; only load failures and top-level not-found conditions
//! surface as errors.

use crate::cache::DatasetCache;
use crate::dataset::{Kind, VersionInfo, TAG_SIGIL};
use crate::entities::{Archive, Document, Entity, Group, Module, Tag};
use crate::error::{Error, Resolved};
use crate::loader::{json_file_loader, DatasetLoader};
use crate::refs::GroupRef;
use crate::resolve::{ParentProbePolicy, Resolver};
use std::path::Path;

/// Configuration for building a [`MockClient`].
pub struct ClientConfig {
    loader: DatasetLoader,
    probe_policy: ParentProbePolicy,
}

impl ClientConfig {
    /// Create a config around a dataset loader.
    pub fn new(loader: DatasetLoader) -> Self {
        Self {
            loader,
            probe_policy: ParentProbePolicy::default(),
        }
    }

    /// Set how document-vs-archive container collisions are resolved.
    pub fn with_probe_policy(mut self, policy: ParentProbePolicy) -> Self {
        self.probe_policy = policy;
        self
    }
}

/// A client answering entity queries by resolving them statically from
/// a mock dataset.
pub struct MockClient {
    cache: DatasetCache,
    probe_policy: ParentProbePolicy,
}

impl MockClient {
    /// Build a client from a config.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            cache: DatasetCache::new(config.loader),
            probe_policy: config.probe_policy,
        }
    }

    /// Build a client with default options around a loader.
    pub fn from_loader(loader: DatasetLoader) -> Self {
        Self::new(ClientConfig::new(loader))
    }

    /// Build a client reading a JSON dataset from disk on first query.
    pub fn from_json_file(path: impl AsRef<Path>) -> Self {
        Self::from_loader(json_file_loader(path))
    }

    /// The version record supplied with the dataset.
    pub async fn version(&self) -> Result<VersionInfo, Error> {
        let ds = self.cache.ensure_loaded().await?;
        Ok(ds.version.clone())
    }

    /// All groups in the dataset, as shallow references.
    pub async fn list_groups(&self) -> Result<Resolved<Vec<GroupRef>>, Error> {
        let ds = self.cache.ensure_loaded().await?;
        let mut resolver = Resolver::new(&ds, self.probe_policy);

        let groups: Vec<GroupRef> = ds
            .groups
            .iter()
            .map(|g| resolver.group_ref(&g.id))
            .collect();

        Ok(Resolved::new(groups, resolver.into_warnings()))
    }

    /// The fully materialized group with the given id.
    pub async fn get_group(&self, id: &str) -> Result<Resolved<Group>, Error> {
        let ds = self.cache.ensure_loaded().await?;
        if ds.group(id).is_none() {
            return Err(Error::not_found(id, "groups"));
        }

        let mut resolver = Resolver::new(&ds, self.probe_policy);
        let group = resolver.group(id);
        Ok(Resolved::new(group, resolver.into_warnings()))
    }

    /// The fully materialized archive with the given id.
    pub async fn get_archive(&self, id: &str) -> Result<Resolved<Archive>, Error> {
        let ds = self.cache.ensure_loaded().await?;
        if ds.archive(id).is_none() {
            return Err(Error::not_found(id, "archives"));
        }

        let mut resolver = Resolver::new(&ds, self.probe_policy);
        let archive = resolver.archive(id);
        Ok(Resolved::new(archive, resolver.into_warnings()))
    }

    /// The fully materialized document with the given id.
    pub async fn get_document(&self, id: &str) -> Result<Resolved<Document>, Error> {
        let ds = self.cache.ensure_loaded().await?;
        if ds.document(id).is_none() {
            return Err(Error::not_found(id, "documents"));
        }

        let mut resolver = Resolver::new(&ds, self.probe_policy);
        let document = resolver.document(id);
        Ok(Resolved::new(document, resolver.into_warnings()))
    }

    /// The fully materialized module (theory or view) with the given id.
    pub async fn get_module(&self, id: &str) -> Result<Resolved<Module>, Error> {
        let ds = self.cache.ensure_loaded().await?;
        let record = match ds.module(id) {
            Some(record) => record.clone(),
            None => return Err(Error::not_found(id, "modules")),
        };

        let mut resolver = Resolver::new(&ds, self.probe_policy);
        let module = resolver.module(&record);
        Ok(Resolved::new(module, resolver.into_warnings()))
    }

    /// The virtual tag entity for a sigil-prefixed id.
    ///
    /// Tags have no stored records: the id itself must carry the sigil,
    /// otherwise the tag does not exist.
    pub async fn get_tag(&self, id: &str) -> Result<Resolved<Tag>, Error> {
        let ds = self.cache.ensure_loaded().await?;
        if !id.starts_with(TAG_SIGIL) {
            return Err(Error::not_found(id, "tags"));
        }

        let mut resolver = Resolver::new(&ds, self.probe_policy);
        let tag = resolver.tag(id);
        Ok(Resolved::new(tag, resolver.into_warnings()))
    }

    /// Resolve an identifier of unknown kind by probing the dataset's
    /// collections: groups, archives, documents, opaques, then modules.
    pub async fn resolve_uri(&self, uri: &str) -> Result<Resolved<Entity>, Error> {
        let ds = self.cache.ensure_loaded().await?;

        let kind = if ds.group(uri).is_some() {
            Kind::Group
        } else if ds.archive(uri).is_some() {
            Kind::Archive
        } else if ds.document(uri).is_some() {
            Kind::Document
        } else if ds.opaque(uri).is_some() {
            Kind::Opaque
        } else if let Some(record) = ds.module(uri) {
            let record = record.clone();
            let mut resolver = Resolver::new(&ds, self.probe_policy);
            let module = resolver.module(&record);
            return Ok(Resolved::new(Entity::Module(module), resolver.into_warnings()));
        } else {
            return Err(Error::not_found(uri, "dataset"));
        };

        let mut resolver = Resolver::new(&ds, self.probe_policy);
        let entity = resolver.entity(kind, uri);
        Ok(Resolved::new(entity, resolver.into_warnings()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DataSet;
    use crate::error::Warning;
    use crate::loader::static_loader;
    use crate::refs::DocumentParentRef;
    use crate::testing::{assert_clean, assert_warned_about, counting_loader, DatasetBuilder};

    fn scenario() -> DataSet {
        // One group, one tagged archive, one root document.
        DatasetBuilder::new()
            .version("1.0", "2019-01-01")
            .group("G1", "Algebra")
            .tagged_archive("A1", "sets", "G1", &["t1"])
            .document("D1", "intro", "A1")
            .build()
    }

    fn client(ds: DataSet) -> MockClient {
        MockClient::from_loader(static_loader(ds))
    }

    #[tokio::test]
    async fn version_comes_from_the_dataset() {
        let client = client(scenario());
        let version = client.version().await.expect("version");
        assert_eq!(version.version_number, "1.0");
    }

    #[tokio::test]
    async fn list_groups_returns_shallow_refs() {
        let client = client(scenario());
        let groups = client.list_groups().await.expect("list");
        assert_clean(&groups);
        assert_eq!(groups.value.len(), 1);
        assert_eq!(groups.value[0].id, "G1");
        assert_eq!(groups.value[0].name, "Algebra");
    }

    #[tokio::test]
    async fn end_to_end_group_archive_tag_scenario() {
        let client = client(scenario());

        let group = client.get_group("G1").await.expect("group");
        assert_clean(&group);
        let archive_ids: Vec<&str> =
            group.value.archives.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(archive_ids, vec!["A1"]);

        let archive = client.get_archive("A1").await.expect("archive");
        assert_clean(&archive);
        assert_eq!(archive.value.narrative_root.reference.id, "D1");
        assert_eq!(archive.value.tags.len(), 1);
        assert_eq!(archive.value.tags[0].name, "t1");

        let tag = client.get_tag("@t1").await.expect("tag");
        assert_clean(&tag);
        assert!(tag.value.archives.iter().any(|a| a.id == "A1"));
    }

    #[tokio::test]
    async fn getter_fields_match_record_fields() {
        let client = client(scenario());
        let archive = client.get_archive("A1").await.expect("archive");
        assert_eq!(archive.value.reference.id, "A1");
        assert_eq!(archive.value.reference.name, "sets");
        assert_eq!(
            archive.value.reference.parent.as_ref().map(|p| p.id.as_str()),
            Some("G1")
        );
    }

    #[tokio::test]
    async fn missing_archive_is_not_found() {
        let client = client(scenario());
        let err = client
            .get_archive("does-not-exist")
            .await
            .expect_err("should fail");

        match &err {
            Error::NotFound { id, collection } => {
                assert_eq!(id, "does-not-exist");
                assert_eq!(*collection, "archives");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert!(err.to_string().contains("does-not-exist"));
    }

    #[tokio::test]
    async fn tag_without_sigil_is_not_found() {
        let client = client(scenario());
        let err = client.get_tag("t1").await.expect_err("should fail");
        assert!(matches!(err, Error::NotFound { collection: "tags", .. }));
    }

    #[tokio::test]
    async fn get_document_resolves_parent_chain() {
        let client = client(scenario());
        let document = client.get_document("D1").await.expect("document");
        assert_clean(&document);

        match document.value.reference.parent.as_deref() {
            Some(DocumentParentRef::Archive(a)) => {
                assert_eq!(a.id, "A1");
                assert_eq!(a.parent.as_ref().map(|g| g.id.as_str()), Some("G1"));
            }
            other => panic!("expected archive parent, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn get_module_dispatches_on_kind() {
        let ds = DatasetBuilder::new()
            .theory("t1", "Sets")
            .view("v1", "SetsToSets", "t1", "t1")
            .build();
        let client = client(ds);

        let theory = client.get_module("t1").await.expect("theory");
        assert!(matches!(theory.value, Module::Theory(_)));

        let view = client.get_module("v1").await.expect("view");
        assert!(matches!(view.value, Module::View(_)));

        let err = client.get_module("nope").await.expect_err("missing");
        assert!(matches!(err, Error::NotFound { collection: "modules", .. }));
    }

    #[tokio::test]
    async fn unknown_module_kind_is_passed_through() {
        let ds = DatasetBuilder::new()
            .unknown_module("x1", "Mystery", "diagram")
            .build();
        let client = client(ds);

        let module = client.get_module("x1").await.expect("module");
        assert!(matches!(module.value, Module::Unknown(ref u) if u.id == "x1"));
        assert_eq!(
            module.warnings,
            vec![Warning::UnknownKind {
                id: "x1".to_string(),
                kind: "diagram".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn resolve_uri_probes_collections_in_order() {
        let ds = DatasetBuilder::new()
            .group("G1", "Algebra")
            .archive("A1", "sets", "G1")
            .document("D1", "intro", "A1")
            .opaque("O1", "blurb", "D1", "text", "hi")
            .theory("t1", "Sets")
            .build();
        let client = client(ds);

        assert!(matches!(
            client.resolve_uri("G1").await.expect("group").value,
            Entity::Group(_)
        ));
        assert!(matches!(
            client.resolve_uri("O1").await.expect("opaque").value,
            Entity::Opaque(_)
        ));
        assert!(matches!(
            client.resolve_uri("t1").await.expect("module").value,
            Entity::Module(_)
        ));

        let err = client.resolve_uri("nope").await.expect_err("missing");
        assert!(matches!(err, Error::NotFound { collection: "dataset", .. }));
    }

    #[tokio::test]
    async fn client_loads_dataset_from_json_file() {
        use tempfile::TempDir;

        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("mock.json");
        std::fs::write(
            &path,
            r#"{
                "version": {"versionNumber": "2.0", "buildDate": "2019-06-01"},
                "groups": [{"id": "G1", "name": "Algebra"}],
                "archives": [{"id": "A1", "name": "sets", "parent": {"id": "G1"}}],
                "documents": [{"id": "D1", "name": "intro", "parent": {"id": "A1"}}]
            }"#,
        )
        .expect("write fixture");

        let client = MockClient::from_json_file(&path);
        assert_eq!(client.version().await.expect("version").version_number, "2.0");

        let archive = client.get_archive("A1").await.expect("archive");
        assert_eq!(archive.value.narrative_root.reference.id, "D1");
    }

    #[tokio::test]
    async fn concurrent_getters_share_one_load() {
        let (loader, calls) = counting_loader(scenario());
        let client = std::sync::Arc::new(MockClient::from_loader(loader));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let client = std::sync::Arc::clone(&client);
            handles.push(tokio::spawn(async move {
                client.get_archive("A1").await.map(|r| r.value.reference.id)
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.expect("join").expect("query"), "A1");
        }

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn degraded_archive_parent_is_visible_in_warnings() {
        let ds = DatasetBuilder::new()
            .archive("A1", "orphan", "no-such-group")
            .document("D1", "intro", "A1")
            .build();
        let client = client(ds);

        let archive = client.get_archive("A1").await.expect("archive");
        assert_warned_about(&archive, "no-such-group");
        assert!(archive
            .warnings
            .contains(&Warning::DanglingReference {
                id: "no-such-group".to_string(),
                collection: "groups",
            }));

        // Degraded, not failed: the page can still render.
        assert_eq!(archive.value.reference.id, "A1");
        let parent = archive.value.reference.parent.expect("degraded parent");
        assert_eq!(parent.id, "no-such-group");
        assert!(parent.name.is_empty());
    }
}

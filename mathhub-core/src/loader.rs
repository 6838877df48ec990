//! The dataset loader seam.
//!
//! The engine never fetches anything itself: it is handed a
//! [`DatasetLoader`], an async factory producing the complete flat
//! dataset. The cache invokes it at most once per load attempt.
//!
//! A JSON file loader is provided for the common case of a `mock.json`
//! on disk.

use crate::dataset::DataSet;
use crate::error::LoadError;
use futures::future::BoxFuture;
use std::future::Future;
use std::path::Path;
use tokio::fs;

/// An async factory supplying the complete dataset.
///
/// Invoked lazily by the cache on the first query (and again after a
/// failed attempt). Must be callable more than once so a failed load
/// can be retried.
pub type DatasetLoader =
    Box<dyn Fn() -> BoxFuture<'static, Result<DataSet, LoadError>> + Send + Sync>;

/// Wrap an async closure into a [`DatasetLoader`].
pub fn loader_fn<F, Fut>(f: F) -> DatasetLoader
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<DataSet, LoadError>> + Send + 'static,
{
    Box::new(move || Box::pin(f()))
}

/// A loader that yields an already-built dataset.
///
/// Useful for tests and for callers that obtained the dataset through
/// other means.
pub fn static_loader(dataset: DataSet) -> DatasetLoader {
    loader_fn(move || {
        let ds = dataset.clone();
        async move { Ok(ds) }
    })
}

/// A loader reading a JSON-encoded dataset from disk.
pub fn json_file_loader(path: impl AsRef<Path>) -> DatasetLoader {
    let path = path.as_ref().to_path_buf();
    loader_fn(move || {
        let path = path.clone();
        async move {
            let content = fs::read_to_string(&path).await?;
            let dataset: DataSet = serde_json::from_str(&content)?;
            Ok(dataset)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::GroupRecord;

    #[tokio::test]
    async fn static_loader_yields_dataset() {
        let mut ds = DataSet::default();
        ds.groups.push(GroupRecord {
            id: "g1".to_string(),
            name: "algebra".to_string(),
            ..Default::default()
        });

        let loader = static_loader(ds);
        let loaded = loader().await.expect("load");
        assert_eq!(loaded.groups.len(), 1);

        // Callable again for retry semantics.
        let again = loader().await.expect("load again");
        assert_eq!(again.groups[0].id, "g1");
    }

    #[tokio::test]
    async fn json_file_loader_reads_dataset() {
        use tempfile::TempDir;

        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("mock.json");
        std::fs::write(
            &path,
            r#"{"groups": [{"id": "g1", "name": "algebra"}]}"#,
        )
        .expect("write fixture");

        let loader = json_file_loader(&path);
        let ds = loader().await.expect("load");
        assert_eq!(ds.groups[0].name, "algebra");
    }

    #[tokio::test]
    async fn json_file_loader_surfaces_io_failure() {
        let loader = json_file_loader("/nonexistent/mock.json");
        let err = loader().await.expect_err("should fail");
        assert!(!err.message().is_empty());
    }

    #[tokio::test]
    async fn json_file_loader_surfaces_parse_failure() {
        use tempfile::TempDir;

        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").expect("write fixture");

        let loader = json_file_loader(&path);
        assert!(loader().await.is_err());
    }
}

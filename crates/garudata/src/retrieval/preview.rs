//! Leading-record preview of a collection

use std::sync::Arc;

use crate::error::Result;
use crate::storage::CollectionStore;
use crate::types::Record;

pub struct PreviewService {
    store: Arc<CollectionStore>,
    rows: usize,
}

impl PreviewService {
    pub fn new(store: Arc<CollectionStore>, rows: usize) -> Self {
        Self { store, rows }
    }

    /// First `rows` records of the collection, in stored order
    pub fn preview(&self, name: &str) -> Result<Vec<Record>> {
        let collection = self.store.get(name)?;
        Ok(collection.records().iter().take(self.rows).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::storage::SourceInfo;
    use crate::types::{Collection, SourceKind, Value};

    async fn service_with(rows: usize) -> PreviewService {
        let store = CollectionStore::in_memory().unwrap();
        let records: Vec<Record> = (0..rows)
            .map(|i| std::iter::once(("n", Value::Int(i as i64))).collect())
            .collect();
        store
            .put(
                &SourceInfo::new("n.csv", "hash"),
                Collection::new("n", SourceKind::Delimited, records),
            )
            .await
            .unwrap();
        PreviewService::new(Arc::new(store), 10)
    }

    #[tokio::test]
    async fn test_short_collection_returned_whole() {
        let preview = service_with(3).await.preview("n").unwrap();
        let values: Vec<_> = preview.iter().map(|r| r.get("n").cloned()).collect();
        assert_eq!(
            values,
            vec![Some(Value::Int(0)), Some(Value::Int(1)), Some(Value::Int(2))]
        );
    }

    #[tokio::test]
    async fn test_long_collection_truncated_in_order() {
        let preview = service_with(15).await.preview("n").unwrap();
        assert_eq!(preview.len(), 10);
        for (i, record) in preview.iter().enumerate() {
            assert_eq!(record.get("n"), Some(&Value::Int(i as i64)), "record {}", i);
        }
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let err = service_with(1).await.preview("missing").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}

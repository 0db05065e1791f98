//! Dot-path addressed document handle bound to one workflow id.
//!
//! Grounded in `lightflow/models/datastore.py` (`DataStoreDocument`,
//! `_encode_value`/`_decode_value`, `_data_from_dotnotation`). Plain JSON
//! values are stored verbatim; values that don't fit the JSON data model
//! go through [`StoreHandle::set_opaque`]/[`StoreHandle::get_opaque`],
//! which off-load to the blob table via `bincode` and leave a handle
//! marker in the document tree, deleted automatically whenever the path
//! is overwritten.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::store::backend::StoreBackend;
use crate::store::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Meta,
    Data,
}

impl Section {
    fn key(self) -> &'static str {
        match self {
            Section::Meta => "meta",
            Section::Data => "data",
        }
    }
}

const BLOB_MARKER_KEY: &str = "$blob";

fn blob_marker(handle: Uuid) -> Value {
    let mut marker = Map::new();
    marker.insert(BLOB_MARKER_KEY.to_string(), Value::String(handle.to_string()));
    Value::Object(marker)
}

fn as_blob_handle(value: &Value) -> Option<Uuid> {
    value
        .as_object()
        .and_then(|obj| obj.get(BLOB_MARKER_KEY))
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// Collects every blob handle reachable from `value`, recursing through
/// maps and lists (mirrors `_delete_gridfs_data`'s walk).
fn collect_blob_handles(value: &Value, out: &mut Vec<Uuid>) {
    if let Some(handle) = as_blob_handle(value) {
        out.push(handle);
        return;
    }
    match value {
        Value::Object(map) => {
            for v in map.values() {
                collect_blob_handles(v, out);
            }
        }
        Value::Array(items) => {
            for v in items {
                collect_blob_handles(v, out);
            }
        }
        _ => {}
    }
}

/// A document handle scoped to one workflow id, the object a task's
/// `store` parameter refers to.
#[derive(Clone)]
pub struct StoreHandle {
    backend: Arc<dyn StoreBackend>,
    workflow_id: String,
}

impl StoreHandle {
    /// Opens (or implicitly creates, for test convenience) a document
    /// bound to `workflow_id`.
    pub async fn open(
        backend: Arc<dyn StoreBackend>,
        workflow_id: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let workflow_id = workflow_id.into();
        if !backend.exists(&workflow_id).await? {
            backend.add(&workflow_id).await?;
        }
        Ok(Self {
            backend,
            workflow_id,
        })
    }

    /// Convenience constructor for tests: opens a document under a
    /// throwaway workflow id.
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        let workflow_id = Uuid::new_v4().to_string();
        Self {
            backend,
            workflow_id,
        }
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    fn path_parts(path: &str) -> Vec<&str> {
        path.split('.').collect()
    }

    async fn section_root(&self, section: Section) -> Result<Map<String, Value>, StoreError> {
        let doc = self.backend.get_document(&self.workflow_id).await?;
        match doc.get(section.key()) {
            Some(Value::Object(map)) => Ok(map.clone()),
            _ => Ok(Map::new()),
        }
    }

    async fn write_section_root(
        &self,
        section: Section,
        root: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let mut doc = self.backend.get_document(&self.workflow_id).await?;
        doc.insert(section.key().to_string(), Value::Object(root));
        self.backend.set_document(&self.workflow_id, doc).await
    }

    fn navigate<'a>(root: &'a Map<String, Value>, parts: &[&str]) -> Option<&'a Value> {
        let (head, rest) = parts.split_first()?;
        let value = root.get(*head)?;
        if rest.is_empty() {
            Some(value)
        } else {
            match value {
                Value::Object(map) => Self::navigate(map, rest),
                _ => None,
            }
        }
    }

    fn navigate_owned(root: &Map<String, Value>, parts: &[&str]) -> Option<Value> {
        Self::navigate(root, parts).cloned()
    }

    /// Sets `parts` to `value` inside `root`, creating intermediate
    /// objects as needed, and returns the value that previously occupied
    /// the leaf (for blob cleanup).
    fn set_path(root: &mut Map<String, Value>, parts: &[&str], value: Value) -> Option<Value> {
        let (head, rest) = parts.split_first().expect("path must be non-empty");
        if rest.is_empty() {
            return root.insert(head.to_string(), value);
        }
        let entry = root
            .entry(head.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let nested = entry.as_object_mut().unwrap();
        Self::set_path(nested, rest, value)
    }

    async fn delete_blobs_at(&self, old: Option<Value>) -> Result<(), StoreError> {
        if let Some(old) = old {
            let mut handles = Vec::new();
            collect_blob_handles(&old, &mut handles);
            for handle in handles {
                self.backend.delete_blob(handle).await?;
            }
        }
        Ok(())
    }

    /// Plain JSON read. Returns `default` if the path is absent.
    /// Encountering a blob marker is a decode error — callers should
    /// use [`StoreHandle::get_opaque`] for paths written via
    /// [`StoreHandle::set_opaque`].
    pub async fn get(
        &self,
        path: &str,
        default: Option<Value>,
        section: Section,
    ) -> Result<Option<Value>, StoreError> {
        let root = self.section_root(section).await?;
        let parts = Self::path_parts(path);
        match Self::navigate_owned(&root, &parts) {
            Some(value) => {
                if as_blob_handle(&value).is_some() {
                    return Err(StoreError::DecodeUnknownType(
                        path.to_string(),
                        "value is an opaque blob; use get_opaque".to_string(),
                    ));
                }
                Ok(Some(value))
            }
            None => Ok(default),
        }
    }

    /// Plain JSON write. Deletes any blob the previous value at `path`
    /// referenced (recursively).
    pub async fn set(&self, path: &str, value: Value, section: Section) -> Result<(), StoreError> {
        let mut root = self.section_root(section).await?;
        let parts = Self::path_parts(path);
        let old = Self::set_path(&mut root, &parts, value);
        self.write_section_root(section, root).await?;
        self.delete_blobs_at(old).await
    }

    pub async fn push(&self, path: &str, value: Value, section: Section) -> Result<(), StoreError> {
        let mut root = self.section_root(section).await?;
        let parts = Self::path_parts(path);
        let mut list = match Self::navigate_owned(&root, &parts) {
            Some(Value::Array(items)) => items,
            Some(_) | None => Vec::new(),
        };
        list.push(value);
        Self::set_path(&mut root, &parts, Value::Array(list));
        self.write_section_root(section, root).await
    }

    pub async fn extend(
        &self,
        path: &str,
        values: Vec<Value>,
        section: Section,
    ) -> Result<(), StoreError> {
        let mut root = self.section_root(section).await?;
        let parts = Self::path_parts(path);
        let mut list = match Self::navigate_owned(&root, &parts) {
            Some(Value::Array(items)) => items,
            Some(_) | None => Vec::new(),
        };
        list.extend(values);
        Self::set_path(&mut root, &parts, Value::Array(list));
        self.write_section_root(section, root).await
    }

    /// Off-loads `value` to the blob table and stores a handle marker at
    /// `path`, deleting any blob the previous value referenced.
    pub async fn set_opaque<T: Serialize>(
        &self,
        path: &str,
        value: &T,
        section: Section,
    ) -> Result<(), StoreError> {
        let bytes = bincode::serialize(value).map_err(|e| {
            StoreError::DecodeUnknownType(path.to_string(), e.to_string())
        })?;
        let handle = self.backend.put_blob(bytes).await?;
        let mut root = self.section_root(section).await?;
        let parts = Self::path_parts(path);
        let old = Self::set_path(&mut root, &parts, blob_marker(handle));
        self.write_section_root(section, root).await?;
        self.delete_blobs_at(old).await
    }

    /// Removes the whole document; called at workflow teardown when the
    /// caller did not ask to retain it.
    pub async fn remove(&self) -> Result<(), StoreError> {
        self.backend.remove(&self.workflow_id).await
    }

    pub async fn get_opaque<T: DeserializeOwned>(
        &self,
        path: &str,
        section: Section,
    ) -> Result<Option<T>, StoreError> {
        let root = self.section_root(section).await?;
        let parts = Self::path_parts(path);
        let Some(value) = Self::navigate_owned(&root, &parts) else {
            return Ok(None);
        };
        let handle = as_blob_handle(&value).ok_or_else(|| {
            StoreError::DecodeUnknownType(path.to_string(), "value is not an opaque blob".to_string())
        })?;
        let bytes = self.backend.get_blob(handle).await?;
        let decoded = bincode::deserialize(&bytes)
            .map_err(|e| StoreError::DecodeUnknownType(path.to_string(), e.to_string()))?;
        Ok(Some(decoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::backend::InMemoryBackend;
    use serde::Deserialize;

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = StoreHandle::new(InMemoryBackend::new());
        store
            .set("name", Value::String("wf".into()), Section::Meta)
            .await
            .unwrap();
        let value = store.get("name", None, Section::Meta).await.unwrap();
        assert_eq!(value, Some(Value::String("wf".into())));
    }

    #[tokio::test]
    async fn nested_dot_paths_descend_into_objects() {
        let store = StoreHandle::new(InMemoryBackend::new());
        store
            .set("log.dag1.task1.duration", Value::from(12), Section::Meta)
            .await
            .unwrap();
        let value = store
            .get("log.dag1.task1.duration", None, Section::Meta)
            .await
            .unwrap();
        assert_eq!(value, Some(Value::from(12)));
    }

    #[tokio::test]
    async fn missing_path_returns_default() {
        let store = StoreHandle::new(InMemoryBackend::new());
        let value = store
            .get("nope", Some(Value::from(7)), Section::Data)
            .await
            .unwrap();
        assert_eq!(value, Some(Value::from(7)));
    }

    #[tokio::test]
    async fn push_and_extend_append_to_a_list() {
        let store = StoreHandle::new(InMemoryBackend::new());
        store.push("items", Value::from(1), Section::Data).await.unwrap();
        store
            .extend("items", vec![Value::from(2), Value::from(3)], Section::Data)
            .await
            .unwrap();
        let value = store.get("items", None, Section::Data).await.unwrap();
        assert_eq!(value, Some(serde_json::json!([1, 2, 3])));
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Blob {
        n: i64,
        tag: String,
    }

    #[tokio::test]
    async fn opaque_values_round_trip_through_the_blob_table() {
        let store = StoreHandle::new(InMemoryBackend::new());
        let payload = Blob {
            n: 9,
            tag: "x".into(),
        };
        store
            .set_opaque("thing", &payload, Section::Data)
            .await
            .unwrap();
        let decoded: Blob = store
            .get_opaque("thing", Section::Data)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(decoded, payload);
    }

    #[tokio::test]
    async fn overwriting_a_blob_deletes_the_old_one() {
        let store = StoreHandle::new(InMemoryBackend::new());
        store
            .set_opaque("thing", &Blob { n: 1, tag: "a".into() }, Section::Data)
            .await
            .unwrap();
        let root = store.section_root(Section::Data).await.unwrap();
        let handle = as_blob_handle(root.get("thing").unwrap()).unwrap();

        store
            .set_opaque("thing", &Blob { n: 2, tag: "b".into() }, Section::Data)
            .await
            .unwrap();

        let err = store.backend.get_blob(handle).await.unwrap_err();
        assert!(matches!(err, StoreError::UnknownBlobHandle(_)));
    }

    #[tokio::test]
    async fn reading_a_blob_with_plain_get_is_a_decode_error() {
        let store = StoreHandle::new(InMemoryBackend::new());
        store
            .set_opaque("thing", &Blob { n: 1, tag: "a".into() }, Section::Data)
            .await
            .unwrap();
        let err = store.get("thing", None, Section::Data).await.unwrap_err();
        assert!(matches!(err, StoreError::DecodeUnknownType(_, _)));
    }
}

//! In-memory store used by tests and the offline CLI.
//!
//! Collections are plain document lists. Aggregations do not evaluate the pipeline: they
//! record it and stream the collection back in insertion order. Open connections and cursors
//! are counted so callers can verify that scoped resources were released.

use bson::Document;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Connector, ResultCursor, StoreHandle};
use crate::errors::DsError;
use crate::json::parse_extjson_document;

/// Operations that can be scripted to fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Connect,
    Ping,
    Disconnect,
    ListCollections,
    /// Aggregations against the named collection.
    Aggregate(String),
}

/// One aggregation as the store received it.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedAggregate {
    pub database: String,
    pub collection: String,
    pub pipeline: Vec<Document>,
}

#[derive(Default)]
struct Inner {
    databases: RwLock<BTreeMap<String, BTreeMap<String, Vec<Document>>>>,
    failures: RwLock<HashMap<FailPoint, String>>,
    issued: Mutex<Vec<IssuedAggregate>>,
    connects: AtomicUsize,
    open_connections: AtomicUsize,
    open_cursors: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the documents of `database.collection`.
    pub fn insert_collection(&self, database: &str, collection: &str, docs: Vec<Document>) {
        self.inner
            .databases
            .write()
            .entry(database.to_string())
            .or_default()
            .insert(collection.to_string(), docs);
    }

    /// Load every `<collection>.ndjson` file in `dir` into `database`. Each non-blank line is
    /// one extended-JSON document.
    ///
    /// # Errors
    /// `Io` when the directory or a file cannot be read, or a line is not a JSON object.
    pub fn load_dir(&self, database: &str, dir: &Path) -> Result<usize, DsError> {
        let mut loaded = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("ndjson") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let docs = read_ndjson(&path)?;
            log::info!("loaded {} document(s) into {database}.{name}", docs.len());
            self.insert_collection(database, name, docs);
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Make `point` fail with `message` until cleared.
    pub fn fail(&self, point: FailPoint, message: &str) {
        self.inner.failures.write().insert(point, message.to_string());
    }

    pub fn clear_failures(&self) {
        self.inner.failures.write().clear();
    }

    fn check(&self, point: &FailPoint) -> Option<String> {
        self.inner.failures.read().get(point).cloned()
    }

    #[must_use]
    pub fn issued(&self) -> Vec<IssuedAggregate> {
        self.inner.issued.lock().clone()
    }

    #[must_use]
    pub fn connects(&self) -> usize {
        self.inner.connects.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn open_connections(&self) -> usize {
        self.inner.open_connections.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn open_cursors(&self) -> usize {
        self.inner.open_cursors.load(Ordering::SeqCst)
    }
}

/// Read one extended-JSON document per non-blank line.
///
/// # Errors
/// `Io` when the file cannot be read or a line is not a JSON object; the message names the
/// line.
pub fn read_ndjson(path: &Path) -> Result<Vec<Document>, DsError> {
    let reader = BufReader::new(std::fs::File::open(path)?);
    let mut docs = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let doc = parse_extjson_document(line).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("{}:{}: {e}", path.display(), i + 1))
        })?;
        docs.push(doc);
    }
    Ok(docs)
}

impl Connector for MemoryStore {
    type Handle = MemoryHandle;

    fn connect(&self, uri: &str) -> Result<MemoryHandle, DsError> {
        if let Some(msg) = self.check(&FailPoint::Connect) {
            return Err(DsError::Connection(msg));
        }
        self.inner.connects.fetch_add(1, Ordering::SeqCst);
        self.inner.open_connections.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryHandle { store: self.clone(), uri: uri.to_string(), connected: true })
    }
}

pub struct MemoryHandle {
    store: MemoryStore,
    uri: String,
    connected: bool,
}

impl MemoryHandle {
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl StoreHandle for MemoryHandle {
    fn ping(&self) -> Result<(), DsError> {
        if !self.connected {
            return Err(DsError::Connection("client is disconnected".into()));
        }
        match self.store.check(&FailPoint::Ping) {
            Some(msg) => Err(DsError::Connection(msg)),
            None => Ok(()),
        }
    }

    fn aggregate<'a>(
        &'a self,
        database: &str,
        collection: &str,
        pipeline: &[Document],
    ) -> Result<Box<dyn ResultCursor + 'a>, DsError> {
        if let Some(msg) = self.store.check(&FailPoint::Aggregate(collection.to_string())) {
            return Err(DsError::Execution(msg));
        }
        self.store.inner.issued.lock().push(IssuedAggregate {
            database: database.to_string(),
            collection: collection.to_string(),
            pipeline: pipeline.to_vec(),
        });
        let docs = self
            .store
            .inner
            .databases
            .read()
            .get(database)
            .and_then(|cols| cols.get(collection))
            .cloned()
            .unwrap_or_default();
        self.store.inner.open_cursors.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryCursor { docs: docs.into_iter(), store: self.store.clone(), open: true }))
    }

    fn list_collection_names(&self, database: &str) -> Result<Vec<String>, DsError> {
        if let Some(msg) = self.store.check(&FailPoint::ListCollections) {
            return Err(DsError::Execution(msg));
        }
        Ok(self
            .store
            .inner
            .databases
            .read()
            .get(database)
            .map(|cols| cols.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn disconnect(&mut self) -> Result<(), DsError> {
        if !self.connected {
            return Ok(());
        }
        self.connected = false;
        self.store.inner.open_connections.fetch_sub(1, Ordering::SeqCst);
        match self.store.check(&FailPoint::Disconnect) {
            Some(msg) => Err(DsError::Connection(msg)),
            None => Ok(()),
        }
    }
}

struct MemoryCursor {
    docs: std::vec::IntoIter<Document>,
    store: MemoryStore,
    open: bool,
}

impl ResultCursor for MemoryCursor {
    fn next_document(&mut self) -> Option<Result<Document, DsError>> {
        self.docs.next().map(Ok)
    }

    fn close(&mut self) -> Result<(), DsError> {
        if self.open {
            self.open = false;
            self.store.inner.open_cursors.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

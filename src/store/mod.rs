//! Document-database collaborator interface.
//!
//! The core never talks to a database directly. A [`Connector`] opens a [`StoreHandle`], which
//! runs aggregations and hands back forward-only [`ResultCursor`]s. [`Connection`] and
//! [`CursorGuard`] scope both resources so they are released on every exit path.

pub mod memory;

use bson::Document;

use crate::errors::DsError;

pub use memory::{FailPoint, IssuedAggregate, MemoryStore, read_ndjson};

/// Forward-only stream of result documents held open on the server.
pub trait ResultCursor {
    fn next_document(&mut self) -> Option<Result<Document, DsError>>;

    /// Release server-side resources. Called once by [`CursorGuard`].
    ///
    /// # Errors
    /// Implementation-specific; failures are logged by the guard.
    fn close(&mut self) -> Result<(), DsError>;
}

/// An open database connection. Cancellation and timeouts, if any, belong to the
/// implementation; callers add no policy of their own.
pub trait StoreHandle {
    /// # Errors
    /// `Connection` when the server does not answer.
    fn ping(&self) -> Result<(), DsError>;

    /// # Errors
    /// `Execution` when the server rejects or fails the aggregation.
    fn aggregate<'a>(
        &'a self,
        database: &str,
        collection: &str,
        pipeline: &[Document],
    ) -> Result<Box<dyn ResultCursor + 'a>, DsError>;

    /// # Errors
    /// `Execution` when the listing fails.
    fn list_collection_names(&self, database: &str) -> Result<Vec<String>, DsError>;

    /// # Errors
    /// `Connection` when the disconnect fails.
    fn disconnect(&mut self) -> Result<(), DsError>;
}

pub trait Connector {
    type Handle: StoreHandle;

    /// # Errors
    /// `Connection` when the URI cannot be reached.
    fn connect(&self, uri: &str) -> Result<Self::Handle, DsError>;
}

/// A cursor that is closed when dropped, even when decoding stops early.
pub struct CursorGuard<'a> {
    inner: Box<dyn ResultCursor + 'a>,
    open: bool,
}

impl<'a> CursorGuard<'a> {
    #[must_use]
    pub fn new(inner: Box<dyn ResultCursor + 'a>) -> Self {
        Self { inner, open: true }
    }

    /// Close now and report the outcome instead of logging it on drop.
    ///
    /// # Errors
    /// Whatever the cursor's `close` returns.
    pub fn close(mut self) -> Result<(), DsError> {
        self.open = false;
        self.inner.close()
    }
}

impl Iterator for CursorGuard<'_> {
    type Item = Result<Document, DsError>;
    fn next(&mut self) -> Option<Self::Item> {
        if !self.open {
            return None;
        }
        self.inner.next_document()
    }
}

impl Drop for CursorGuard<'_> {
    fn drop(&mut self) {
        if self.open {
            self.open = false;
            if let Err(e) = self.inner.close() {
                log::warn!("failed to close cursor: {e}");
            }
        }
    }
}

/// A connection bound to one database, disconnected when dropped.
pub struct Connection<H: StoreHandle> {
    handle: H,
    database: String,
    open: bool,
}

impl<H: StoreHandle> Connection<H> {
    /// Connect and ping.
    ///
    /// # Errors
    /// `Connection` when either step fails. A handle that connected but failed to ping is
    /// disconnected before returning.
    pub fn open<C>(connector: &C, uri: &str, database: &str) -> Result<Self, DsError>
    where
        C: Connector<Handle = H>,
    {
        let handle = connector.connect(uri)?;
        let conn = Self { handle, database: database.to_string(), open: true };
        conn.handle.ping()?;
        log::debug!("Connected to {database}");
        Ok(conn)
    }

    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// # Errors
    /// See [`StoreHandle::ping`].
    pub fn ping(&self) -> Result<(), DsError> {
        self.handle.ping()
    }

    /// # Errors
    /// See [`StoreHandle::aggregate`].
    pub fn aggregate(&self, collection: &str, pipeline: &[Document]) -> Result<CursorGuard<'_>, DsError> {
        let cursor = self.handle.aggregate(&self.database, collection, pipeline)?;
        Ok(CursorGuard::new(cursor))
    }

    /// # Errors
    /// See [`StoreHandle::list_collection_names`].
    pub fn list_collection_names(&self) -> Result<Vec<String>, DsError> {
        self.handle.list_collection_names(&self.database)
    }

    /// Disconnect now and report the outcome.
    ///
    /// # Errors
    /// See [`StoreHandle::disconnect`].
    pub fn release(mut self) -> Result<(), DsError> {
        self.open = false;
        let out = self.handle.disconnect();
        if out.is_ok() {
            log::debug!("Connection to {} closed.", self.database);
        }
        out
    }
}

impl<H: StoreHandle> Drop for Connection<H> {
    fn drop(&mut self) {
        if self.open {
            self.open = false;
            if let Err(e) = self.handle.disconnect() {
                log::warn!("failed to disconnect from {}: {e}", self.database);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn cursor_guard_closes_on_drop() {
        let store = MemoryStore::new();
        store.insert_collection("test", "cpu", vec![doc! {"a": 1}, doc! {"a": 2}]);
        let conn = Connection::open(&store, "mongodb://mem", "test").unwrap();
        {
            let mut cur = conn.aggregate("cpu", &[]).unwrap();
            assert_eq!(store.open_cursors(), 1);
            assert!(cur.next().is_some());
        }
        assert_eq!(store.open_cursors(), 0);
        drop(conn);
        assert_eq!(store.open_connections(), 0);
    }

    #[test]
    fn explicit_close_and_release() {
        let store = MemoryStore::new();
        let conn = Connection::open(&store, "mongodb://mem", "test").unwrap();
        let cur = conn.aggregate("missing", &[]).unwrap();
        cur.close().unwrap();
        assert_eq!(store.open_cursors(), 0);
        assert_eq!(conn.database(), "test");
        conn.release().unwrap();
        assert_eq!(store.open_connections(), 0);
    }

    #[test]
    fn ping_failure_disconnects() {
        let store = MemoryStore::new();
        store.fail(FailPoint::Ping, "no route");
        assert!(matches!(Connection::open(&store, "mongodb://mem", "test"), Err(DsError::Connection(_))));
        assert_eq!(store.open_connections(), 0);
    }
}

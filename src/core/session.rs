//! Storage session - the single database connection of the application.
//!
//! A [`Session`] is created by the composition root and handed down to whatever needs
//! storage. At most one connection is open at a time: connecting always closes the
//! previous connection first.

use crate::config::database::{create_table_if_missing, create_tables, sqlite_url};
use crate::entities::RecordKind;
use crate::errors::{Error, Result};
use sea_orm::{
    Database, DatabaseConnection, DatabaseTransaction, TransactionError, TransactionTrait,
};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tracing::{debug, info, instrument, warn};

/// Boxed unit of work run by [`Session::run_in_transaction`].
pub type UnitOfWork<'c, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'c>>;

/// Owner of the (optional) open database connection.
#[derive(Debug, Default)]
pub struct Session {
    connection: Option<DatabaseConnection>,
    location: Option<PathBuf>,
}

impl Session {
    /// A session with no open connection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session on the database file at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut session = Self::new();
        session.connect(path).await?;
        Ok(session)
    }

    /// Connects to the database file at `path`, creating the file and both tables if
    /// they are missing. Any previously open connection is closed first.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn connect(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.connect_url(&sqlite_url(path)).await?;
        self.location = Some(path.to_path_buf());
        Ok(())
    }

    /// Starts a brand-new database at `path`, discarding whatever file was there.
    pub async fn create_new(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.disconnect_if_connected().await?;
        if path.exists() {
            warn!("Replacing existing database file {}", path.display());
            std::fs::remove_file(path)?;
        }
        self.connect(path).await
    }

    /// Connects to an arbitrary database URL (e.g. `sqlite::memory:`).
    #[instrument(skip(self))]
    pub async fn connect_url(&mut self, url: &str) -> Result<()> {
        self.disconnect_if_connected().await?;

        debug!("Opening database connection");
        let connection = Database::connect(url).await?;
        create_tables(&connection).await?;

        self.connection = Some(connection);
        self.location = None;
        info!("Database connection opened and tables ensured");
        Ok(())
    }

    /// Closes the open connection.
    ///
    /// # Errors
    /// Returns [`Error::NotConnected`] if no connection is open.
    pub async fn disconnect(&mut self) -> Result<()> {
        let connection = self.connection.take().ok_or(Error::NotConnected)?;
        self.location = None;
        connection.close().await?;
        info!("Database connection closed");
        Ok(())
    }

    /// Closes the open connection, if any.
    pub async fn disconnect_if_connected(&mut self) -> Result<()> {
        if self.is_connected() {
            self.disconnect().await?;
        }
        Ok(())
    }

    /// Whether a connection is currently open.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// File the session is connected to, when it was opened from a path.
    #[must_use]
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// The open connection.
    ///
    /// # Errors
    /// Returns [`Error::NotConnected`] if no connection is open.
    pub fn connection(&self) -> Result<&DatabaseConnection> {
        self.connection.as_ref().ok_or(Error::NotConnected)
    }

    /// Creates the table for `kind` on the open connection unless it exists.
    pub async fn create_table_if_missing(&self, kind: RecordKind) -> Result<()> {
        create_table_if_missing(self.connection()?, kind).await
    }

    /// Runs `work` inside one transaction. Every write performed by `work` is rolled
    /// back if it returns an error.
    pub async fn run_in_transaction<T, F>(&self, work: F) -> Result<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> UnitOfWork<'c, T> + Send,
    {
        self.connection()?
            .transaction::<_, T, Error>(work)
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => Error::from(db_err),
                TransactionError::Transaction(err) => err,
            })
    }
}

#![forbid(unsafe_code)]

mod bookmarks;
mod chapters;
mod commits;
mod config;
mod error;
mod forks;
mod pull_requests;
mod requests;
mod schema;
mod support;
mod tree_views;

pub use config::StoreConfig;
pub use error::StoreError;
pub use requests::*;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use sb_core::RequestContext;
use std::path::Path;
use support::*;

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    config: StoreConfig,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_config(StoreConfig::new(storage_dir.as_ref()))
    }

    pub fn open_with_config(config: StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        std::fs::create_dir_all(&config.storage_dir)?;

        let conn = Connection::open(config.db_path())?;
        conn.busy_timeout(config.busy_timeout())?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        schema::preflight_gate(&conn)?;
        schema::install_schema(&conn)?;

        tracing::debug!(path = %config.db_path().display(), "story store opened");
        Ok(Self { conn, config })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.config.storage_dir
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Takes the write lock up front so "max + 1" sort orders are computed and
    /// committed under one serialization point.
    fn write_tx(&mut self) -> Result<Transaction<'_>, StoreError> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}

fn ensure_actor(ctx: &RequestContext, owner_id: i64, message: &'static str) -> Result<(), StoreError> {
    if ctx.is_actor(owner_id) {
        Ok(())
    } else {
        Err(StoreError::Forbidden(message))
    }
}

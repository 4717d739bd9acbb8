/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::config::{DbDriver, StoreConfig};
use crate::error::{ActivityError, ActivityResult};
use deadpool_postgres::{ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime, Timeouts};
use rusqlite::Connection;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::runtime::RuntimeFlavor;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};
use tracing::{info, warn};

const SQLITE_SCHEMA: &str = r#"
PRAGMA journal_mode=WAL;
CREATE TABLE IF NOT EXISTS users (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL DEFAULT '',
  email TEXT NOT NULL,
  avatar_color TEXT NULL,
  profile_image_path TEXT NOT NULL DEFAULT '',
  profile_changed_at_ms INTEGER NOT NULL DEFAULT 0,
  deleted_at_ms INTEGER NULL
);
CREATE TABLE IF NOT EXISTS assets (
  id TEXT PRIMARY KEY,
  visibility TEXT NOT NULL DEFAULT 'timeline',
  deleted_at_ms INTEGER NULL
);
CREATE TABLE IF NOT EXISTS activity (
  id TEXT PRIMARY KEY,
  user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
  asset_id TEXT NULL REFERENCES assets(id) ON DELETE CASCADE,
  album_id TEXT NOT NULL,
  is_liked INTEGER NOT NULL DEFAULT 0,
  comment TEXT NULL,
  created_at_ms INTEGER NOT NULL,
  updated_at_ms INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_activity_album_asset ON activity(album_id, asset_id);
CREATE INDEX IF NOT EXISTS idx_activity_user ON activity(user_id);
CREATE INDEX IF NOT EXISTS idx_activity_created ON activity(created_at_ms);
CREATE UNIQUE INDEX IF NOT EXISTS idx_activity_like_unique
  ON activity(user_id, asset_id, album_id) WHERE is_liked = 1;
"#;

static FALLBACK_RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();

#[derive(Clone)]
pub(crate) struct Db {
    pub(crate) driver: DbDriver,
    cfg: StoreConfig,
    pg_pool: Arc<OnceLock<Pool>>,
}

pub(crate) struct PgConn {
    client: deadpool_postgres::Object,
}

pub(crate) struct PgTx<'a> {
    tx: deadpool_postgres::Transaction<'a>,
}

impl PgConn {
    pub(crate) fn execute(&mut self, stmt: &str, params: &[&(dyn ToSql + Sync)]) -> ActivityResult<u64> {
        block_on_result(self.client.execute(stmt, params))
    }

    pub(crate) fn transaction(&mut self) -> ActivityResult<PgTx<'_>> {
        let tx = block_on_result(self.client.transaction())?;
        Ok(PgTx { tx })
    }

    pub(crate) fn batch_execute(&mut self, stmt: &str) -> ActivityResult<()> {
        block_on_result(self.client.batch_execute(stmt))
    }

    pub(crate) fn query(&mut self, stmt: &str, params: &[&(dyn ToSql + Sync)]) -> ActivityResult<Vec<Row>> {
        block_on_result(self.client.query(stmt, params))
    }

    pub(crate) fn query_one(&mut self, stmt: &str, params: &[&(dyn ToSql + Sync)]) -> ActivityResult<Row> {
        block_on_result(self.client.query_one(stmt, params))
    }
}

impl<'a> PgTx<'a> {
    pub(crate) fn query_opt(&mut self, stmt: &str, params: &[&(dyn ToSql + Sync)]) -> ActivityResult<Option<Row>> {
        block_on_result(self.tx.query_opt(stmt, params))
    }

    pub(crate) fn commit(self) -> ActivityResult<()> {
        block_on_result(self.tx.commit())
    }
}

/// Drives a Postgres future to completion from synchronous code.
///
/// Inside a multi-thread tokio runtime this uses `block_in_place`. A
/// current-thread runtime cannot block in place, so the future is handed to
/// the process-wide fallback runtime from a scoped thread. Outside of any
/// runtime the fallback is used directly, so pooled connections keep their
/// driver tasks alive between calls.
fn block_on_result<F, T, E>(fut: F) -> ActivityResult<T>
where
    F: Future<Output = std::result::Result<T, E>> + Send,
    T: Send,
    E: Into<ActivityError> + Send,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| handle.block_on(fut)).map_err(Into::into)
        }
        Ok(_) => std::thread::scope(|s| {
            s.spawn(|| fallback_runtime()?.block_on(fut).map_err(Into::into))
                .join()
                .unwrap_or_else(|_| {
                    Err(ActivityError::unavailable(anyhow::anyhow!(
                        "postgres worker thread panicked"
                    )))
                })
        }),
        Err(_) => fallback_runtime()?.block_on(fut).map_err(Into::into),
    }
}

/// Must not be called from inside a runtime: a losing `set` drops its runtime.
fn fallback_runtime() -> ActivityResult<&'static tokio::runtime::Runtime> {
    if let Some(rt) = FALLBACK_RUNTIME.get() {
        return Ok(rt);
    }
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .map_err(ActivityError::unavailable)?;
    let _ = FALLBACK_RUNTIME.set(rt);
    FALLBACK_RUNTIME
        .get()
        .ok_or_else(|| ActivityError::unavailable(anyhow::anyhow!("tokio runtime unavailable")))
}

impl Db {
    pub(crate) fn new(cfg: StoreConfig) -> Self {
        Self {
            driver: cfg.driver,
            cfg,
            pg_pool: Arc::new(OnceLock::new()),
        }
    }

    pub(crate) fn open_sqlite_conn(&self) -> ActivityResult<Connection> {
        let conn = Connection::open(&self.cfg.path)?;
        self.apply_pragmas(&conn)?;
        Ok(conn)
    }

    pub(crate) fn open_pg_conn(&self) -> ActivityResult<PgConn> {
        let pool = self
            .pg_pool
            .get()
            .ok_or_else(|| ActivityError::unavailable(anyhow::anyhow!("postgres pool not initialized")))?;
        let client = block_on_result(pool.get())?;
        Ok(PgConn { client })
    }

    fn apply_pragmas(&self, conn: &Connection) -> rusqlite::Result<()> {
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        let _ = conn.pragma_update(None, "synchronous", self.cfg.db_synchronous.as_str());
        let _ = conn.busy_timeout(Duration::from_millis(self.cfg.db_busy_timeout_ms));
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    fn create_pg_pool(&self) -> ActivityResult<()> {
        if self.pg_pool.get().is_some() {
            return Ok(());
        }
        let url = self
            .cfg
            .db_url
            .as_ref()
            .ok_or_else(|| ActivityError::config("ACTIVITY_DB_URL is required for postgres"))?;
        let mut cfg = deadpool_postgres::Config::new();
        cfg.url = Some(url.to_string());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        let mut pool_cfg = PoolConfig::new(self.cfg.pg_pool_max_size);
        pool_cfg.queue_mode = self.cfg.pg_pool_queue_mode;
        pool_cfg.timeouts = Timeouts {
            wait: self.cfg.pg_pool_wait_ms.map(Duration::from_millis),
            create: self.cfg.pg_pool_create_timeout_ms.map(Duration::from_millis),
            recycle: self.cfg.pg_pool_recycle_timeout_ms.map(Duration::from_millis),
        };
        cfg.pool = Some(pool_cfg);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ActivityError::config(format!("postgres pool: {e}")))?;
        let _ = self.pg_pool.set(pool);
        Ok(())
    }

    /// Applies the schema. Postgres is retried with linear backoff while the
    /// server comes up.
    pub(crate) fn init(&self) -> ActivityResult<()> {
        match self.driver {
            DbDriver::Sqlite => {
                let conn = self.open_sqlite_conn()?;
                conn.execute_batch(SQLITE_SCHEMA)?;
                info!(path = %self.cfg.path.display(), "sqlite activity schema ready");
                Ok(())
            }
            DbDriver::Postgres => {
                self.create_pg_pool()?;
                let max_retries = self.cfg.pg_init_retries;
                let mut last_err: Option<ActivityError> = None;
                for attempt in 1..=max_retries {
                    match self.open_pg_conn() {
                        Ok(mut conn) => {
                            conn.batch_execute(include_str!("../sql/postgres_schema.sql"))?;
                            info!("postgres activity schema ready");
                            return Ok(());
                        }
                        Err(err) => {
                            last_err = Some(err);
                            if attempt == max_retries {
                                break;
                            }
                            let backoff_ms = (attempt as u64 * self.cfg.pg_init_backoff_ms).min(30_000);
                            warn!(
                                "postgres not ready (attempt {attempt}/{max_retries}); retrying in {backoff_ms}ms"
                            );
                            std::thread::sleep(Duration::from_millis(backoff_ms));
                        }
                    }
                }
                Err(last_err.unwrap_or_else(|| {
                    ActivityError::unavailable(anyhow::anyhow!("postgres init gave up"))
                }))
            }
        }
    }

    pub(crate) fn health_check(&self) -> ActivityResult<()> {
        match self.driver {
            DbDriver::Sqlite => {
                let conn = self.open_sqlite_conn()?;
                conn.query_row("SELECT 1", [], |_| Ok(()))?;
                Ok(())
            }
            DbDriver::Postgres => {
                let mut conn = self.open_pg_conn()?;
                let row = conn.query_one("SELECT 1", &[])?;
                let _: i32 = row.get(0);
                Ok(())
            }
        }
    }
}

/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use deadpool::managed::QueueMode;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbDriver {
    Sqlite,
    Postgres,
}

impl DbDriver {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(DbDriver::Postgres),
            "sqlite" | "sqlite3" => Some(DbDriver::Sqlite),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub driver: DbDriver,
    pub path: PathBuf,
    pub db_url: Option<String>,
    pub db_synchronous: String,
    pub db_busy_timeout_ms: u64,
    pub pg_pool_max_size: usize,
    pub pg_pool_wait_ms: Option<u64>,
    pub pg_pool_create_timeout_ms: Option<u64>,
    pub pg_pool_recycle_timeout_ms: Option<u64>,
    pub pg_pool_queue_mode: QueueMode,
    pub pg_init_retries: usize,
    pub pg_init_backoff_ms: u64,
}

impl StoreConfig {
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self::from_lookup(|_| None).with_path(path)
    }

    pub fn postgres(url: &str) -> Self {
        let mut cfg = Self::from_lookup(|_| None);
        cfg.driver = DbDriver::Postgres;
        cfg.db_url = Some(url.trim().to_string());
        cfg
    }

    fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from `ACTIVITY_*` variables resolved through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let driver = lookup("ACTIVITY_DB_DRIVER")
            .and_then(|v| DbDriver::parse(&v))
            .unwrap_or(DbDriver::Sqlite);
        let path = lookup("ACTIVITY_DB")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "activity.db".to_string());
        let db_url = lookup("ACTIVITY_DB_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        let db_synchronous = lookup("ACTIVITY_DB_SYNC")
            .map(|v| v.trim().to_ascii_uppercase())
            .filter(|v| matches!(v.as_str(), "OFF" | "NORMAL" | "FULL" | "EXTRA"))
            .unwrap_or_else(|| "NORMAL".to_string());
        let db_busy_timeout_ms = lookup("ACTIVITY_DB_BUSY_TIMEOUT_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(2000)
            .min(60_000);
        let pg_pool_max_size = lookup("ACTIVITY_PG_POOL_MAX_SIZE")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(16)
            .clamp(1, 256);
        let pg_pool_wait_ms = lookup("ACTIVITY_PG_POOL_WAIT_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|v| *v > 0);
        let pg_pool_create_timeout_ms = lookup("ACTIVITY_PG_POOL_CREATE_TIMEOUT_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|v| *v > 0);
        let pg_pool_recycle_timeout_ms = lookup("ACTIVITY_PG_POOL_RECYCLE_TIMEOUT_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|v| *v > 0);
        let pg_pool_queue_mode = lookup("ACTIVITY_PG_POOL_QUEUE_MODE")
            .map(|v| v.trim().to_ascii_lowercase())
            .and_then(|v| match v.as_str() {
                "lifo" => Some(QueueMode::Lifo),
                "fifo" => Some(QueueMode::Fifo),
                _ => None,
            })
            .unwrap_or(QueueMode::Fifo);
        let pg_init_retries = lookup("ACTIVITY_PG_INIT_RETRIES")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(30)
            .clamp(1, 300);
        let pg_init_backoff_ms = lookup("ACTIVITY_PG_INIT_BACKOFF_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(500)
            .clamp(50, 30_000);
        Self {
            driver,
            path: PathBuf::from(path),
            db_url,
            db_synchronous,
            db_busy_timeout_ms,
            pg_pool_max_size,
            pg_pool_wait_ms,
            pg_pool_create_timeout_ms,
            pg_pool_recycle_timeout_ms,
            pg_pool_queue_mode,
            pg_init_retries,
            pg_init_backoff_ms,
        }
    }
}

/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("integrity violation: {message}")]
    IntegrityViolation { message: String },
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] anyhow::Error),
    #[error("config error: {message}")]
    Config { message: String },
}

pub type ActivityResult<T> = Result<T, ActivityError>;

impl ActivityError {
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::IntegrityViolation {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn unavailable(err: impl Into<anyhow::Error>) -> Self {
        Self::StoreUnavailable(err.into())
    }

    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::IntegrityViolation { .. })
    }
}

impl From<rusqlite::Error> for ActivityError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref code, ref msg) = value {
            if code.code == rusqlite::ErrorCode::ConstraintViolation {
                let message = msg.clone().unwrap_or_else(|| value.to_string());
                return Self::integrity(message);
            }
        }
        Self::unavailable(value)
    }
}

impl From<tokio_postgres::Error> for ActivityError {
    fn from(value: tokio_postgres::Error) -> Self {
        use tokio_postgres::error::SqlState;
        if let Some(state) = value.code() {
            if *state == SqlState::FOREIGN_KEY_VIOLATION
                || *state == SqlState::NOT_NULL_VIOLATION
                || *state == SqlState::UNIQUE_VIOLATION
            {
                let message = value
                    .as_db_error()
                    .map(|e| e.message().to_string())
                    .unwrap_or_else(|| value.to_string());
                return Self::integrity(message);
            }
        }
        Self::unavailable(value)
    }
}

impl From<deadpool_postgres::PoolError> for ActivityError {
    fn from(value: deadpool_postgres::PoolError) -> Self {
        Self::unavailable(value)
    }
}

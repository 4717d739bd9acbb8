/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod config;
mod db;
pub mod error;
pub mod query;
pub mod store;

pub use album_activity_protocol::*;
pub use config::{DbDriver, StoreConfig};
pub use error::{ActivityError, ActivityResult};
pub use store::ActivityStore;

pub(crate) fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

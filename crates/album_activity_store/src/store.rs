/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::config::{DbDriver, StoreConfig};
use crate::db::Db;
use crate::error::{ActivityError, ActivityResult};
use crate::now_ms;
use crate::query::{Conditions, SqlValue};
use album_activity_protocol::{
    Activity, ActivitySearch, ActivityStatistics, ActivityUser, ActivityWithUser, AssetFilter,
    NewActivity, StatisticsQuery,
};
use rand::{rngs::OsRng, RngCore};
use rusqlite::{params, params_from_iter, OptionalExtension};
use tokio_postgres::types::ToSql;
use tracing::debug;

const ACTIVITY_WITH_USER_COLUMNS: &str = r#"
  activity.id,
  activity.user_id,
  activity.asset_id,
  activity.album_id,
  activity.is_liked,
  activity.comment,
  activity.created_at_ms,
  activity.updated_at_ms,
  users.id,
  users.name,
  users.email,
  users.avatar_color,
  users.profile_image_path,
  users.profile_changed_at_ms
"#;

const LIVE_USER_JOIN: &str =
    "INNER JOIN users ON users.id = activity.user_id AND users.deleted_at_ms IS NULL";

const ASSET_JOIN: &str = "LEFT JOIN assets ON assets.id = activity.asset_id";

/// Holds vacuously when no asset row was joined.
const ASSET_NOT_DELETED: &str = "assets.deleted_at_ms IS NULL";

/// Statistics only count activity on an asset that is still live and not in
/// the locked folder, or activity with no asset at all.
const ASSET_COUNTABLE: &str =
    "(assets.deleted_at_ms IS NULL AND assets.visibility <> 'locked') OR assets.id IS NULL";

/// Data access for album comments and likes.
#[derive(Clone)]
pub struct ActivityStore {
    db: Db,
}

impl ActivityStore {
    /// Opens the configured backend and applies the schema.
    pub fn open(cfg: StoreConfig) -> ActivityResult<Self> {
        let db = Db::new(cfg);
        db.init()?;
        Ok(Self { db })
    }

    pub fn driver(&self) -> DbDriver {
        self.db.driver
    }

    pub fn health_check(&self) -> ActivityResult<()> {
        self.db.health_check()
    }

    pub fn search(&self, criteria: &ActivitySearch) -> ActivityResult<Vec<ActivityWithUser>> {
        let conditions = search_conditions(criteria);
        let (where_sql, values) = conditions.render(self.db.driver);
        let sql = format!(
            "SELECT {ACTIVITY_WITH_USER_COLUMNS} FROM activity {LIVE_USER_JOIN} {ASSET_JOIN} {where_sql} ORDER BY activity.created_at_ms ASC, activity.id ASC"
        );
        let out = match self.db.driver {
            DbDriver::Sqlite => {
                let conn = self.db.open_sqlite_conn()?;
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(
                    params_from_iter(values.iter().map(|v| v.to_sqlite())),
                    sqlite_activity_with_user,
                )?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            DbDriver::Postgres => {
                let mut conn = self.db.open_pg_conn()?;
                let params: Vec<&(dyn ToSql + Sync)> = values.iter().map(|v| v.as_pg()).collect();
                let rows = conn.query(&sql, &params)?;
                rows.iter().map(pg_activity_with_user).collect()
            }
        };
        debug!(filters = conditions.len(), rows = out.len(), "activity search");
        Ok(out)
    }

    /// Inserts the activity and returns it joined to its author.
    ///
    /// Fails with [`ActivityError::IntegrityViolation`] when the author is
    /// missing or soft-deleted; the insert is rolled back in that case.
    pub fn create(&self, activity: &NewActivity) -> ActivityResult<ActivityWithUser> {
        let id = new_activity_id();
        let now = now_ms();
        let asset_id = activity.asset_id.as_deref();
        let comment = activity.comment.as_deref();
        let created = match self.db.driver {
            DbDriver::Sqlite => {
                let mut conn = self.db.open_sqlite_conn()?;
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO activity(id, user_id, asset_id, album_id, is_liked, comment, created_at_ms, updated_at_ms) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                    params![
                        id,
                        activity.user_id,
                        asset_id,
                        activity.album_id,
                        if activity.is_liked { 1 } else { 0 },
                        comment,
                        now
                    ],
                )?;
                let row = tx
                    .query_row(
                        &format!(
                            "SELECT {ACTIVITY_WITH_USER_COLUMNS} FROM activity {LIVE_USER_JOIN} WHERE activity.id = ?1"
                        ),
                        params![id],
                        sqlite_activity_with_user,
                    )
                    .optional()?;
                match row {
                    Some(row) => {
                        tx.commit()?;
                        Some(row)
                    }
                    None => None,
                }
            }
            DbDriver::Postgres => {
                let mut conn = self.db.open_pg_conn()?;
                let mut tx = conn.transaction()?;
                let row = tx.query_opt(
                    &format!(
                        r#"
            WITH inserted AS (
              INSERT INTO activity(id, user_id, asset_id, album_id, is_liked, comment, created_at_ms, updated_at_ms)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
              RETURNING *
            )
            SELECT {ACTIVITY_WITH_USER_COLUMNS} FROM inserted AS activity {LIVE_USER_JOIN}
            "#
                    ),
                    &[
                        &id,
                        &activity.user_id,
                        &asset_id,
                        &activity.album_id,
                        &activity.is_liked,
                        &comment,
                        &now,
                    ],
                )?;
                match row {
                    Some(row) => {
                        let row = pg_activity_with_user(&row);
                        tx.commit()?;
                        Some(row)
                    }
                    None => None,
                }
            }
        };
        match created {
            Some(row) => {
                debug!(id = %row.activity.id, album_id = %row.activity.album_id, is_liked = row.activity.is_liked, "activity created");
                Ok(row)
            }
            None => Err(ActivityError::integrity(format!(
                "activity author {} is missing or deleted",
                activity.user_id
            ))),
        }
    }

    /// Removes the activity. Unknown ids are not an error.
    pub fn delete(&self, id: &str) -> ActivityResult<()> {
        let affected = match self.db.driver {
            DbDriver::Sqlite => {
                let conn = self.db.open_sqlite_conn()?;
                conn.execute("DELETE FROM activity WHERE id = ?1", params![id])? as u64
            }
            DbDriver::Postgres => {
                let mut conn = self.db.open_pg_conn()?;
                conn.execute("DELETE FROM activity WHERE id = $1", &[&id])?
            }
        };
        debug!(id, affected, "activity delete");
        Ok(())
    }

    pub fn get_statistics(&self, query: &StatisticsQuery) -> ActivityResult<ActivityStatistics> {
        let conditions = statistics_conditions(query);
        let (where_sql, values) = conditions.render(self.db.driver);
        let sql = format!(
            r#"
            SELECT
              COUNT(*) FILTER (WHERE activity.is_liked = false) AS comments,
              COUNT(*) FILTER (WHERE activity.is_liked = true) AS likes
            FROM activity
            {LIVE_USER_JOIN}
            {ASSET_JOIN}
            {where_sql}
            "#
        );
        let (comments, likes): (i64, i64) = match self.db.driver {
            DbDriver::Sqlite => {
                let conn = self.db.open_sqlite_conn()?;
                conn.query_row(
                    &sql,
                    params_from_iter(values.iter().map(|v| v.to_sqlite())),
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )?
            }
            DbDriver::Postgres => {
                let mut conn = self.db.open_pg_conn()?;
                let params: Vec<&(dyn ToSql + Sync)> = values.iter().map(|v| v.as_pg()).collect();
                let row = conn.query_one(&sql, &params)?;
                (row.get(0), row.get(1))
            }
        };
        let stats = ActivityStatistics {
            comments: comments.max(0) as u64,
            likes: likes.max(0) as u64,
        };
        debug!(album_id = %query.album_id, comments = stats.comments, likes = stats.likes, "activity statistics");
        Ok(stats)
    }
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.is_empty())
}

pub(crate) fn search_conditions(criteria: &ActivitySearch) -> Conditions {
    let mut c = Conditions::new();
    if let Some(user_id) = non_empty(&criteria.user_id) {
        c.eq_text("activity.user_id", user_id);
    }
    match &criteria.asset_id {
        AssetFilter::Unspecified => {}
        AssetFilter::Null => {
            c.is_null("activity.asset_id");
        }
        AssetFilter::Is(asset_id) if asset_id.is_empty() => {}
        AssetFilter::Is(asset_id) => {
            c.eq_text("activity.asset_id", asset_id);
        }
    }
    if let Some(album_id) = non_empty(&criteria.album_id) {
        c.eq_text("activity.album_id", album_id);
    }
    if let Some(is_liked) = criteria.is_liked {
        c.eq_value("activity.is_liked", SqlValue::Bool(is_liked));
    }
    c.raw(ASSET_NOT_DELETED);
    c
}

pub(crate) fn statistics_conditions(query: &StatisticsQuery) -> Conditions {
    let mut c = Conditions::new();
    if let Some(asset_id) = non_empty(&query.asset_id) {
        c.eq_text("activity.asset_id", asset_id);
    }
    c.eq_text("activity.album_id", &query.album_id);
    c.raw(ASSET_COUNTABLE);
    c
}

fn new_activity_id() -> String {
    let mut b = [0u8; 16];
    OsRng.fill_bytes(&mut b);
    b.iter().map(|v| format!("{v:02x}")).collect()
}

fn sqlite_activity_with_user(r: &rusqlite::Row<'_>) -> rusqlite::Result<ActivityWithUser> {
    let liked: i64 = r.get(4)?;
    Ok(ActivityWithUser {
        activity: Activity {
            id: r.get(0)?,
            user_id: r.get(1)?,
            asset_id: r.get(2)?,
            album_id: r.get(3)?,
            is_liked: liked != 0,
            comment: r.get(5)?,
            created_at_ms: r.get(6)?,
            updated_at_ms: r.get(7)?,
        },
        user: ActivityUser {
            id: r.get(8)?,
            name: r.get(9)?,
            email: r.get(10)?,
            avatar_color: r.get(11)?,
            profile_image_path: r.get(12)?,
            profile_changed_at_ms: r.get(13)?,
        },
    })
}

fn pg_activity_with_user(r: &tokio_postgres::Row) -> ActivityWithUser {
    ActivityWithUser {
        activity: Activity {
            id: r.get(0),
            user_id: r.get(1),
            asset_id: r.get(2),
            album_id: r.get(3),
            is_liked: r.get(4),
            comment: r.get(5),
            created_at_ms: r.get(6),
            updated_at_ms: r.get(7),
        },
        user: ActivityUser {
            id: r.get(8),
            name: r.get(9),
            email: r.get(10),
            avatar_color: r.get(11),
            profile_image_path: r.get(12),
            profile_changed_at_ms: r.get(13),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Predicate;
    use album_activity_protocol::AssetVisibility;

    #[test]
    fn search_without_filters_still_excludes_deleted_assets() {
        let c = search_conditions(&ActivitySearch::default());
        assert_eq!(c.predicates(), &[Predicate::Raw(ASSET_NOT_DELETED)]);
    }

    #[test]
    fn search_null_asset_is_not_the_same_as_no_asset_filter() {
        let c = search_conditions(&ActivitySearch {
            asset_id: AssetFilter::Null,
            ..Default::default()
        });
        assert!(c.predicates().contains(&Predicate::IsNull("activity.asset_id")));

        let c = search_conditions(&ActivitySearch {
            asset_id: AssetFilter::is(""),
            ..Default::default()
        });
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn search_keeps_false_is_liked() {
        let c = search_conditions(&ActivitySearch {
            user_id: Some("u1".to_string()),
            album_id: Some(String::new()),
            is_liked: Some(false),
            ..Default::default()
        });
        let (sql, values) = c.render(DbDriver::Postgres);
        assert_eq!(
            sql,
            "WHERE activity.user_id = $1 AND activity.is_liked = $2 AND (assets.deleted_at_ms IS NULL)"
        );
        assert_eq!(values[1], &SqlValue::Bool(false));
    }

    #[test]
    fn search_likes_only_binds_one_bool() {
        let c = search_conditions(&ActivitySearch {
            is_liked: Some(true),
            ..Default::default()
        });
        assert_eq!(
            c.predicates()[0],
            Predicate::Eq {
                column: "activity.is_liked",
                value: SqlValue::Bool(true),
            }
        );
        let (sql, values) = c.render(DbDriver::Sqlite);
        assert_eq!(
            sql,
            "WHERE activity.is_liked = ?1 AND (assets.deleted_at_ms IS NULL)"
        );
        assert_eq!(values, vec![&SqlValue::Bool(true)]);
    }

    #[test]
    fn statistics_always_scopes_album() {
        let c = statistics_conditions(&StatisticsQuery {
            album_id: "a1".to_string(),
            asset_id: None,
        });
        let (sql, values) = c.render(DbDriver::Sqlite);
        assert!(sql.starts_with("WHERE activity.album_id = ?1 AND ("));
        assert_eq!(values.len(), 1);

        let c = statistics_conditions(&StatisticsQuery {
            album_id: "a1".to_string(),
            asset_id: Some("x1".to_string()),
        });
        let (sql, _) = c.render(DbDriver::Sqlite);
        assert!(sql.contains("activity.asset_id = ?1 AND activity.album_id = ?2"));
    }

    #[test]
    fn countable_predicate_names_locked_visibility() {
        assert!(ASSET_COUNTABLE.contains(&format!("'{}'", AssetVisibility::Locked.as_str())));
    }

    #[test]
    fn ids_are_hex() {
        let id = new_activity_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_activity_id());
    }
}

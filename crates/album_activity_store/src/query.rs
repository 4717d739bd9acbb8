/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Conjunctive WHERE-clause builder shared by the SQLite and Postgres paths.
//!
//! Conditions are collected in order and rendered once, so the same filter
//! list produces `?N` placeholders for SQLite and `$N` for Postgres with the
//! bound values in matching positions.

use crate::config::DbDriver;
use tokio_postgres::types::ToSql;

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Bool(bool),
}

impl SqlValue {
    pub fn to_sqlite(&self) -> rusqlite::types::Value {
        match self {
            SqlValue::Text(v) => rusqlite::types::Value::Text(v.clone()),
            SqlValue::Bool(v) => rusqlite::types::Value::Integer(if *v { 1 } else { 0 }),
        }
    }

    pub fn as_pg(&self) -> &(dyn ToSql + Sync) {
        match self {
            SqlValue::Text(v) => v as &(dyn ToSql + Sync),
            SqlValue::Bool(v) => v as &(dyn ToSql + Sync),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq { column: &'static str, value: SqlValue },
    IsNull(&'static str),
    /// Fixed SQL without parameters.
    Raw(&'static str),
}

#[derive(Debug, Clone, Default)]
pub struct Conditions {
    predicates: Vec<Predicate>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq_value(&mut self, column: &'static str, value: SqlValue) -> &mut Self {
        self.predicates.push(Predicate::Eq { column, value });
        self
    }

    pub fn eq_text(&mut self, column: &'static str, value: &str) -> &mut Self {
        self.eq_value(column, SqlValue::Text(value.to_string()))
    }

    pub fn is_null(&mut self, column: &'static str) -> &mut Self {
        self.predicates.push(Predicate::IsNull(column));
        self
    }

    pub fn raw(&mut self, sql: &'static str) -> &mut Self {
        self.predicates.push(Predicate::Raw(sql));
        self
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Renders `WHERE a AND b ...` (empty string when there is nothing to
    /// filter) plus the values to bind, in placeholder order.
    pub fn render(&self, driver: DbDriver) -> (String, Vec<&SqlValue>) {
        if self.is_empty() {
            return (String::new(), Vec::new());
        }
        let mut parts = Vec::with_capacity(self.predicates.len());
        let mut values = Vec::new();
        for p in &self.predicates {
            match p {
                Predicate::Eq { column, value } => {
                    values.push(value);
                    let n = values.len();
                    let placeholder = match driver {
                        DbDriver::Sqlite => format!("?{n}"),
                        DbDriver::Postgres => format!("${n}"),
                    };
                    parts.push(format!("{column} = {placeholder}"));
                }
                Predicate::IsNull(column) => parts.push(format!("{column} IS NULL")),
                Predicate::Raw(sql) => parts.push(format!("({sql})")),
            }
        }
        (format!("WHERE {}", parts.join(" AND ")), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_conditions_render_nothing() {
        let c = Conditions::new();
        assert!(c.is_empty());
        let (sql, values) = c.render(DbDriver::Sqlite);
        assert_eq!(sql, "");
        assert!(values.is_empty());
    }

    #[test]
    fn placeholders_follow_bound_values_only() {
        let mut c = Conditions::new();
        c.eq_text("activity.user_id", "u1")
            .is_null("activity.asset_id")
            .eq_value("activity.is_liked", SqlValue::Bool(false))
            .raw("assets.deleted_at_ms IS NULL");

        let (sql, values) = c.render(DbDriver::Sqlite);
        assert_eq!(
            sql,
            "WHERE activity.user_id = ?1 AND activity.asset_id IS NULL AND activity.is_liked = ?2 AND (assets.deleted_at_ms IS NULL)"
        );
        assert_eq!(values, vec![&SqlValue::Text("u1".to_string()), &SqlValue::Bool(false)]);

        let (sql, _) = c.render(DbDriver::Postgres);
        assert!(sql.contains("activity.user_id = $1"));
        assert!(sql.contains("activity.is_liked = $2"));
    }

    #[test]
    fn sqlite_bools_bind_as_integers() {
        assert_eq!(SqlValue::Bool(true).to_sqlite(), rusqlite::types::Value::Integer(1));
        assert_eq!(SqlValue::Bool(false).to_sqlite(), rusqlite::types::Value::Integer(0));
    }
}

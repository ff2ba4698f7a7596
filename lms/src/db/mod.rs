// Campus
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Persistence of the learning-management entities.
//!
//! Every operation is a free function that takes an `Executor`, which can wrap either a pooled
//! connection or an open transaction.  Callers that need several operations to happen atomically
//! obtain a `TxExecutor` via `Db::begin` and pass its executor to each function.

#[cfg(feature = "postgres")]
use campus_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use campus_core::db::sqlite;
use campus_core::db::{DbError, DbResult, Executor, ensure_one_row};
use sqlx::Row;

mod courses;
pub use courses::*;
mod groups;
pub use groups::*;
mod quizzes;
pub use quizzes::*;
mod users;
pub use users::*;

#[cfg(any(test, feature = "testutils"))]
pub mod testutils;

/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres.sql")).await,

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite.sql")).await,

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Converts an unsigned model quantity into the signed integer type used by the database.
fn to_db_int(field: &str, value: u32) -> DbResult<i32> {
    i32::try_from(value).map_err(|_| {
        DbError::PersistenceError(format!("{} {} does not fit in the database", field, value))
    })
}

/// Converts a signed integer read from the database into an unsigned model quantity.
fn from_db_int(field: &str, value: i32) -> DbResult<u32> {
    u32::try_from(value).map_err(|_| {
        DbError::PersistenceError(format!("Data integrity error: negative {} {}", field, value))
    })
}

/// Records that the entity `left` is related to the entity `right` in the join `table`, whose
/// composite key is made of `left_column` and `right_column`.
///
/// The relation must not exist yet and both sides must exist, or else the database reports a
/// constraint violation.
async fn insert_relation(
    ex: &mut Executor,
    table: &'static str,
    left_column: &'static str,
    right_column: &'static str,
    left: i64,
    right: i64,
) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = format!(
                "INSERT INTO {} ({}, {}) VALUES ($1, $2)",
                table, left_column, right_column
            );
            let done = sqlx::query(&query_str)
                .bind(left)
                .bind(right)
                .execute(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = format!(
                "INSERT INTO {} ({}, {}) VALUES (?, ?)",
                table, left_column, right_column
            );
            let done = sqlx::query(&query_str)
                .bind(left)
                .bind(right)
                .execute(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    ensure_one_row(rows_affected)
}

/// Gets the raw identities stored in `right_column` of the join `table` for all rows whose
/// `left_column` is `left`, in ascending order.
async fn list_relations(
    ex: &mut Executor,
    table: &'static str,
    left_column: &'static str,
    right_column: &'static str,
    left: i64,
) -> DbResult<Vec<i64>> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = format!(
                "SELECT {right} FROM {} WHERE {} = $1 ORDER BY {right}",
                table,
                left_column,
                right = right_column
            );
            let rows = sqlx::query(&query_str)
                .bind(left)
                .fetch_all(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.iter()
                .map(|row| row.try_get(right_column).map_err(postgres::map_sqlx_error))
                .collect()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = format!(
                "SELECT {right} FROM {} WHERE {} = ? ORDER BY {right}",
                table,
                left_column,
                right = right_column
            );
            let rows = sqlx::query(&query_str)
                .bind(left)
                .fetch_all(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            rows.iter()
                .map(|row| row.try_get(right_column).map_err(sqlite::map_sqlx_error))
                .collect()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

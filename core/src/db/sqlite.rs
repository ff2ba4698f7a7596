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

//! Common utilities to interact with an SQLite database.

use crate::db::{Db, DbError, DbResult, Executor, TxExecutor};
use async_trait::async_trait;
use futures::TryStreamExt;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use log::warn;
use sqlx::Transaction;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use time::OffsetDateTime;

/// Takes a raw SQLx error `e` and converts it to our generic error type.
pub fn map_sqlx_error(e: sqlx::Error) -> DbError {
    match e {
        sqlx::Error::ColumnDecode { source, .. } => DbError::PersistenceError(source.to_string()),
        sqlx::Error::RowNotFound => DbError::NotFound,
        sqlx::Error::Database(e) if e.message().contains("constraint failed") => {
            DbError::ConstraintViolation(e.message().to_owned())
        }
        sqlx::Error::Database(e) if e.message() == "interrupted" => DbError::Cancelled,
        e => DbError::PersistenceError(e.to_string()),
    }
}

/// Creates a new connection pool against the database at `conn_str`.
///
/// Foreign key enforcement is always enabled so that SQLite rejects dangling references just
/// like PostgreSQL does.
pub async fn connect(conn_str: &str) -> DbResult<SqliteDb> {
    connect_with_pool(conn_str, SqlitePoolOptions::new()).await
}

/// Creates a new connection pool against the database at `conn_str` with custom `pool_options`.
async fn connect_with_pool(
    conn_str: &str,
    pool_options: SqlitePoolOptions,
) -> DbResult<SqliteDb> {
    let options =
        SqliteConnectOptions::from_str(conn_str).map_err(map_sqlx_error)?.foreign_keys(true);
    let pool = pool_options.connect_with(options).await.map_err(map_sqlx_error)?;
    Ok(SqliteDb { pool })
}

/// A generic database executor implementation for SQLite.
#[derive(Debug)]
pub enum SqliteExecutor {
    /// An executor backed by a pool.  Operations issued via this executor aren't guaranteed to
    /// happen on the same connection.
    PoolExec(PoolConnection<Sqlite>),

    /// An executor backed by a transaction.
    TxExec(Transaction<'static, Sqlite>),
}

impl SqliteExecutor {
    /// Commits the transaction if this executor is backed by one.
    ///
    /// Calling this on a non-transaction-based executor results in a panic.
    pub(super) async fn commit(self) -> DbResult<()> {
        match self {
            SqliteExecutor::PoolExec(_) => unreachable!("Do not call commit on direct executors"),
            SqliteExecutor::TxExec(tx) => tx.commit().await.map_err(map_sqlx_error),
        }
    }
}

impl_sqlx_executor!(SqliteExecutor, Sqlite);

/// A database instance backed by an SQLite database.
pub struct SqliteDb {
    /// Shared SQLite connection pool.  This is a cloneable type that all concurrent
    /// operations can use concurrently.
    pool: SqlitePool,
}

impl SqliteDb {
    /// Returns an executor of the specific type used by this database.
    pub async fn typed_ex(&self) -> DbResult<SqliteExecutor> {
        let conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        Ok(SqliteExecutor::PoolExec(conn))
    }
}

impl Drop for SqliteDb {
    fn drop(&mut self) {
        if !self.pool.is_closed() {
            warn!("Dropping connection without having called close() first");
        }
    }
}

#[async_trait]
impl Db for SqliteDb {
    async fn ex(&self) -> DbResult<Executor> {
        let ex = self.typed_ex().await?;
        Ok(Executor::Sqlite(ex))
    }

    async fn begin(&self) -> DbResult<TxExecutor> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(TxExecutor(Executor::Sqlite(SqliteExecutor::TxExec(tx))))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Helper function to initialize the database with a schema.
pub async fn run_schema(e: &mut SqliteExecutor, schema: &str) -> DbResult<()> {
    let mut results = sqlx::raw_sql(schema).execute_many(e);
    while results.try_next().await.map_err(map_sqlx_error)?.is_some() {
        // Nothing to do.
    }
    Ok(())
}

/// Converts a timestamp as extracted from the database into an `OffsetDateTime`.
///
/// The input parameters must both be positive.  The reason why their types are `i64`s instead of
/// the `u64` you would expect is because the numeric types exposed by sqlx and SQLite are all
/// signed.  We could simply cast the types and accept negative representations in the database,
/// but that would pose difficulties when attempting to compare timestamps via relation operators
/// in SQL queries.
pub fn build_timestamp(timestamp_sec: i64, timestamp_nsec: i64) -> DbResult<OffsetDateTime> {
    if timestamp_sec < 0 || !(0..1_000_000_000).contains(&timestamp_nsec) {
        return Err(DbError::PersistenceError(format!(
            "Timestamp out of range: sec={}, nsec={}",
            timestamp_sec, timestamp_nsec
        )));
    }

    OffsetDateTime::from_unix_timestamp_nanos(
        (i128::from(timestamp_sec) * 1_000_000_000) + (i128::from(timestamp_nsec)),
    )
    .map_err(|e| DbError::PersistenceError(format!("Invalid timestamp: {}", e)))
}

/// Converts an optional timestamp stored as a pair of nullable columns into an `OffsetDateTime`.
///
/// Both columns must be either set or NULL; `field` names the timestamp in the error otherwise.
pub fn build_optional_timestamp(
    field: &str,
    timestamp_sec: Option<i64>,
    timestamp_nsec: Option<i64>,
) -> DbResult<Option<OffsetDateTime>> {
    match (timestamp_sec, timestamp_nsec) {
        (Some(sec), Some(nsec)) => Ok(Some(build_timestamp(sec, nsec)?)),
        (None, None) => Ok(None),
        (sec, nsec) => Err(DbError::PersistenceError(format!(
            "Inconsistent {} sec ({:?}) and nsec ({:?}) values",
            field, sec, nsec
        ))),
    }
}

/// Converts a timestamp into the seconds and nanoseconds pair needed by the database.
///
/// The timestamp must not predate the Unix epoch because `build_timestamp` also expects positive
/// quantities when recovering its values from the database.
pub fn unpack_timestamp(ts: OffsetDateTime) -> DbResult<(i64, i64)> {
    let nanos = ts.unix_timestamp_nanos();
    if nanos < 0 {
        return Err(DbError::PersistenceError(format!(
            "Cannot store timestamp {} before the Unix epoch",
            ts
        )));
    }
    match (i64::try_from(nanos / 1_000_000_000), i64::try_from(nanos % 1_000_000_000)) {
        (Ok(sec), Ok(nsec)) => Ok((sec, nsec)),
        _ => Err(DbError::PersistenceError(format!("Timestamp {} is out of range", ts))),
    }
}

/// Test utilities for the SQLite connection.
#[cfg(any(feature = "testutils", test))]
pub mod testutils {
    use super::*;

    /// Initializes the test database.
    ///
    /// Every call yields a separate in-memory database that is shared by all connections in the
    /// returned pool.
    pub async fn setup() -> SqliteDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();
        connect(":memory:").await.unwrap()
    }

    /// Initializes a test database that serves all operations from a single connection.
    ///
    /// Operations wait for the previous executor to be fully released, which includes rolling
    /// back any transaction that was dropped without being committed.
    pub async fn setup_single_connection() -> SqliteDb {
        let _can_fail = env_logger::builder().is_test(true).try_init();
        connect_with_pool(":memory:", SqlitePoolOptions::new().max_connections(1)).await.unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::testutils::*;
    use super::*;
    use crate::db::backend_tests::{
        exec, generate_db_ro_concurrent_tests, generate_db_rw_tests, query_i64,
    };
    use std::sync::Arc;

    generate_db_ro_concurrent_tests!(Arc::new(setup().await));

    generate_db_rw_tests!(Arc::new(setup().await));

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let db = setup().await;
        let mut ex = db.ex().await.unwrap();
        exec(&mut ex, "CREATE TABLE parent (id INTEGER PRIMARY KEY)").await;
        exec(&mut ex, "CREATE TABLE child (parent_id INTEGER NOT NULL REFERENCES parent (id))")
            .await;

        #[allow(irrefutable_let_patterns)]
        let Executor::Sqlite(typed_ex) = &mut ex else { unreachable!() };
        let err = sqlx::query("INSERT INTO child (parent_id) VALUES (5)")
            .execute(typed_ex)
            .await
            .map_err(map_sqlx_error)
            .unwrap_err();
        match err {
            DbError::ConstraintViolation(msg) => assert!(msg.contains("FOREIGN KEY")),
            e => panic!("Must have failed with a ConstraintViolation but got: {:?}", e),
        }
        assert_eq!(0, query_i64(&mut ex, "count", "SELECT COUNT(*) AS count FROM child").await);

        drop(ex);
        db.close().await;
    }

    #[tokio::test]
    async fn test_row_not_found() {
        let db = setup().await;
        let mut ex = db.ex().await.unwrap();
        exec(&mut ex, "CREATE TABLE test (i INTEGER)").await;

        #[allow(irrefutable_let_patterns)]
        let Executor::Sqlite(typed_ex) = &mut ex else { unreachable!() };
        let result = sqlx::query("SELECT i FROM test").fetch_one(typed_ex).await;
        match result.map_err(map_sqlx_error) {
            Err(DbError::NotFound) => (),
            Err(e) => panic!("Must have failed with NotFound but got: {:?}", e),
            Ok(_) => panic!("Query on an empty table must not return a row"),
        }

        drop(ex);
        db.close().await;
    }

    #[test]
    fn test_build_unpack_timestamp_zero() {
        let d = OffsetDateTime::from_unix_timestamp(0).unwrap();
        let (secs, nsecs) = unpack_timestamp(d).unwrap();
        assert_eq!(0, secs);
        assert_eq!(0, nsecs);
        assert_eq!(Ok(d), build_timestamp(secs, nsecs));
    }

    #[test]
    fn test_build_unpack_timestamp_nsecs_precision() {
        let d = OffsetDateTime::from_unix_timestamp_nanos(1234567899876543215i128).unwrap();
        let (secs, nsecs) = unpack_timestamp(d).unwrap();
        assert_eq!(1234567899i64, secs);
        assert_eq!(876543215i64, nsecs);
        assert_eq!(Ok(d), build_timestamp(secs, nsecs));
    }

    #[test]
    fn test_unpack_timestamp_before_epoch() {
        let d = OffsetDateTime::from_unix_timestamp(-1).unwrap();
        match unpack_timestamp(d) {
            Err(DbError::PersistenceError(msg)) => assert!(msg.contains("before the Unix epoch")),
            e => panic!("Must have failed with a PersistenceError but got: {:?}", e),
        }
    }

    #[test]
    fn test_build_timestamp_out_of_range() {
        for (sec, nsec) in [(-1, 0), (0, -1), (0, 1_000_000_000)] {
            match build_timestamp(sec, nsec) {
                Err(DbError::PersistenceError(_)) => (),
                e => panic!("Must have failed with a PersistenceError but got: {:?}", e),
            }
        }
        assert!(build_timestamp(123456789123456789i64, 0).is_err());
    }

    #[test]
    fn test_build_optional_timestamp() {
        assert_eq!(Ok(None), build_optional_timestamp("start", None, None));
        assert_eq!(
            Ok(Some(OffsetDateTime::from_unix_timestamp(10).unwrap())),
            build_optional_timestamp("start", Some(10), Some(0))
        );
        match build_optional_timestamp("start", Some(10), None) {
            Err(DbError::PersistenceError(msg)) => assert!(msg.contains("Inconsistent start")),
            e => panic!("Must have failed with a PersistenceError but got: {:?}", e),
        }
    }
}

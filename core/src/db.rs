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

//! Generic abstraction to access different database systems.
//!
//! The facilities in this module provide an abstraction over different database systems such as
//! PostgreSQL and SQLite.  The PostgreSQL backend is for production use and the SQLite backend is
//! primarily intended to support unit tests.
//!
//! Database handles are never global: services construct a `Db` explicitly and hand it over to
//! whichever types need persistence.

use crate::model::ModelError;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Implements `sqlx::Executor` for a backend-specific executor type `$executor` that wraps either
/// a pooled connection (`PoolExec`) or an open transaction (`TxExec`) of the `$database` type.
#[cfg(any(feature = "postgres", feature = "sqlite"))]
macro_rules! impl_sqlx_executor [
    ( $executor:ident, $database:ty ) => {
        impl<'c> sqlx::Executor<'c> for &'c mut $executor {
            type Database = $database;

            fn describe<'e, 'q: 'e>(
                self,
                sql: &'q str,
            ) -> BoxFuture<'e, Result<sqlx::Describe<Self::Database>, sqlx::Error>>
            where
                'c: 'e,
            {
                match self {
                    $executor::PoolExec(conn) => conn.describe(sql),
                    $executor::TxExec(tx) => tx.describe(sql),
                }
            }

            fn execute<'e, 'q: 'e, E>(
                self,
                query: E,
            ) -> BoxFuture<'e, Result<<Self::Database as sqlx::Database>::QueryResult, sqlx::Error>>
            where
                'c: 'e,
                E: 'q + sqlx::Execute<'q, Self::Database>,
            {
                match self {
                    $executor::PoolExec(conn) => conn.execute(query),
                    $executor::TxExec(tx) => tx.execute(query),
                }
            }

            fn execute_many<'e, 'q: 'e, E>(
                self,
                query: E,
            ) -> BoxStream<'e, Result<<Self::Database as sqlx::Database>::QueryResult, sqlx::Error>>
            where
                'c: 'e,
                E: 'q + sqlx::Execute<'q, Self::Database>,
            {
                match self {
                    $executor::PoolExec(conn) => conn.execute_many(query),
                    $executor::TxExec(tx) => tx.execute_many(query),
                }
            }

            fn fetch<'e, 'q: 'e, E>(
                self,
                query: E,
            ) -> BoxStream<'e, Result<<Self::Database as sqlx::Database>::Row, sqlx::Error>>
            where
                'c: 'e,
                E: 'q + sqlx::Execute<'q, Self::Database>,
            {
                match self {
                    $executor::PoolExec(conn) => conn.fetch(query),
                    $executor::TxExec(tx) => tx.fetch(query),
                }
            }

            fn fetch_all<'e, 'q: 'e, E>(
                self,
                query: E,
            ) -> BoxFuture<'e, Result<Vec<<Self::Database as sqlx::Database>::Row>, sqlx::Error>>
            where
                'c: 'e,
                E: 'q + sqlx::Execute<'q, Self::Database>,
            {
                match self {
                    $executor::PoolExec(conn) => conn.fetch_all(query),
                    $executor::TxExec(tx) => tx.fetch_all(query),
                }
            }

            fn fetch_many<'e, 'q: 'e, E>(
                self,
                query: E,
            ) -> BoxStream<
                'e,
                Result<
                    sqlx::Either<
                        <Self::Database as sqlx::Database>::QueryResult,
                        <Self::Database as sqlx::Database>::Row,
                    >,
                    sqlx::Error,
                >,
            >
            where
                'c: 'e,
                E: 'q + sqlx::Execute<'q, Self::Database>,
            {
                match self {
                    $executor::PoolExec(conn) => conn.fetch_many(query),
                    $executor::TxExec(tx) => tx.fetch_many(query),
                }
            }

            fn fetch_one<'e, 'q: 'e, E>(
                self,
                query: E,
            ) -> BoxFuture<'e, Result<<Self::Database as sqlx::Database>::Row, sqlx::Error>>
            where
                'c: 'e,
                E: 'q + sqlx::Execute<'q, Self::Database>,
            {
                match self {
                    $executor::PoolExec(conn) => conn.fetch_one(query),
                    $executor::TxExec(tx) => tx.fetch_one(query),
                }
            }

            fn fetch_optional<'e, 'q: 'e, E>(
                self,
                query: E,
            ) -> BoxFuture<'e, Result<Option<<Self::Database as sqlx::Database>::Row>, sqlx::Error>>
            where
                'c: 'e,
                E: 'q + sqlx::Execute<'q, Self::Database>,
            {
                match self {
                    $executor::PoolExec(conn) => conn.fetch_optional(query),
                    $executor::TxExec(tx) => tx.fetch_optional(query),
                }
            }

            fn prepare<'e, 'q: 'e>(
                self,
                query: &'q str,
            ) -> BoxFuture<'e, Result<<Self::Database as sqlx::Database>::Statement<'q>, sqlx::Error>>
            where
                'c: 'e,
            {
                match self {
                    $executor::PoolExec(conn) => conn.prepare(query),
                    $executor::TxExec(tx) => tx.prepare(query),
                }
            }

            fn prepare_with<'e, 'q: 'e>(
                self,
                sql: &'q str,
                parameters: &'e [<Self::Database as sqlx::Database>::TypeInfo],
            ) -> BoxFuture<'e, Result<<Self::Database as sqlx::Database>::Statement<'q>, sqlx::Error>>
            where
                'c: 'e,
            {
                match self {
                    $executor::PoolExec(conn) => conn.prepare_with(sql, parameters),
                    $executor::TxExec(tx) => tx.prepare_with(sql, parameters),
                }
            }
        }
    }
];

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Database errors.  Any unexpected errors that come from the database are classified as
/// `PersistenceError`, but errors callers need to branch on have more specific types.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DbError {
    /// Indicates that the operation was abandoned because its deadline expired or because the
    /// database cancelled the statement.
    #[error("Operation cancelled")]
    Cancelled,

    /// Indicates that a write was rejected by a unique, foreign key, not-null or check constraint.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Indicates that a requested entry does not exist.
    #[error("Entity not found")]
    NotFound,

    /// Catch-all error type for unexpected database errors, including data that cannot be
    /// converted back into model types.
    #[error("Persistence error: {0}")]
    PersistenceError(String),
}

impl From<ModelError> for DbError {
    fn from(e: ModelError) -> Self {
        DbError::PersistenceError(format!("Data integrity error: {}", e))
    }
}

/// Result type for this module.
pub type DbResult<T> = Result<T, DbError>;

/// Validates that a statement that must touch exactly one row did so.
pub fn ensure_one_row(affected: u64) -> DbResult<()> {
    match affected {
        1 => Ok(()),
        n => Err(DbError::PersistenceError(format!("Expected to affect one row but got {}", n))),
    }
}

/// Runs the database operation `op` until `deadline`, if any.
///
/// An operation whose deadline has already passed is not started at all.  An operation that is
/// still in flight when the deadline fires is dropped, which aborts the statement it was running.
/// Both cases are reported as `DbError::Cancelled`.
pub async fn with_deadline<T, F>(deadline: Option<Instant>, op: F) -> DbResult<T>
where
    F: Future<Output = DbResult<T>>,
{
    let Some(deadline) = deadline else {
        return op.await;
    };

    if Instant::now() >= deadline {
        return Err(DbError::Cancelled);
    }
    match tokio::time::timeout_at(deadline, op).await {
        Ok(result) => result,
        Err(_elapsed) => Err(DbError::Cancelled),
    }
}

/// A database executor that can talk to multiple database implementations.
///
/// This type provides a generic mechanism to access a typed instance of a database, which is needed
/// by sqlx to offer type safety guarantees during query compilation.  Users of this type are forced
/// to destructure it and issue different calls for each database.
///
/// Note that this can wrap an executor that talks directly to a pool or to an open transaction.
#[derive(Debug)]
pub enum Executor {
    /// A PostgreSQL executor that can be used in `sqlx` operations.
    #[cfg(feature = "postgres")]
    Postgres(postgres::PostgresExecutor),

    /// A SQLite executor that can be used in `sqlx` operations.
    #[cfg(feature = "sqlite")]
    Sqlite(sqlite::SqliteExecutor),
}

/// A wrapper for a database executor backed by an open transaction.
#[derive(Debug)]
pub struct TxExecutor(Executor);

impl TxExecutor {
    /// Returns the executor wrapped by this transaction.
    ///
    /// This would be better called `executor` but this method is used so frequently that it makes
    /// call sites too verbose.
    pub fn ex(&mut self) -> &mut Executor {
        &mut self.0
    }

    /// Commits the transaction.
    pub async fn commit(self) -> DbResult<()> {
        match self.0 {
            #[cfg(feature = "postgres")]
            Executor::Postgres(e) => e.commit().await,

            #[cfg(feature = "sqlite")]
            Executor::Sqlite(e) => e.commit().await,
        }
    }

    /// Limits how long each subsequent statement of this transaction may run.
    ///
    /// PostgreSQL cancels offending statements on the server side, which surfaces as
    /// `DbError::Cancelled`.  SQLite has no equivalent so callers must rely on dropping the
    /// transaction, which rolls it back once the running statement completes.
    pub async fn set_statement_timeout(&mut self, timeout: Duration) -> DbResult<()> {
        match &mut self.0 {
            #[cfg(feature = "postgres")]
            Executor::Postgres(e) => e.set_statement_timeout(timeout).await,

            #[cfg(feature = "sqlite")]
            Executor::Sqlite(_) => {
                let _ = timeout;
                Ok(())
            }

            #[allow(unused)]
            _ => unreachable!(),
        }
    }
}

/// Abstraction over the database connection.
#[async_trait]
pub trait Db {
    /// Obtains an executor for direct access to the pool.
    ///
    /// This would be better called `executor` but this method is used so frequently that it makes
    /// call sites too verbose.
    async fn ex(&self) -> DbResult<Executor>;

    /// Begins a transaction.
    ///
    /// It is the responsibility of the caller to call `commit` on the returned executor.  Otherwise
    /// the transaction is rolled back on drop.
    async fn begin(&self) -> DbResult<TxExecutor>;

    /// Closes all connections to the database and waits for them to be released.
    async fn close(&self);
}

/// Macros to help instantiate tests for multiple database systems.
#[cfg(any(test, feature = "testutils"))]
pub mod testutils {
    pub use paste::paste;

    /// Instantiates the `module::name` test for the database configured by `setup`.
    ///
    /// The `extra` metadata parameter can be used to tag the generated tests.
    #[macro_export]
    macro_rules! generate_one_test [
        ( $name:ident, $setup:expr, $module:path $(, #[$extra:meta] )? ) => {
            #[tokio::test]
            $(#[$extra])?
            async fn $name() {
                $crate::db::testutils::paste! {
                    $module :: [< $name >]($setup).await;
                }
            }
        }
    ];

    pub use generate_one_test;

    /// Instantiates a collection of tests for a specific database system.
    ///
    /// The database implementation to run the tests against is determined by the `setup`
    /// expression, which needs to return whatever the test functions in `module` expect as their
    /// only argument (typically a shared `Db` handle).  The returned database should also have
    /// been initialized with the desired schema.
    ///
    /// The `extra` metadata parameter can be used to tag the generated tests.
    #[macro_export]
    macro_rules! generate_tests [
        ( #[$extra:meta], $setup:expr, $module:path $(, $name:ident)+ ) => {
            $(
                $crate::db::testutils::generate_one_test!($name, $setup, $module, #[$extra]);
            )+
        };

        ( $setup:expr, $module:path $(, $name:ident)+ ) => {
            $(
                $crate::db::testutils::generate_one_test!($name, $setup, $module);
            )+
        };
    ];

    pub use generate_tests;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_ensure_one_row() {
        ensure_one_row(1).unwrap();
        match ensure_one_row(0) {
            Err(DbError::PersistenceError(msg)) => assert!(msg.contains("but got 0")),
            e => panic!("Must have failed with a PersistenceError but got: {:?}", e),
        }
        assert!(ensure_one_row(2).is_err());
    }

    #[test]
    fn test_model_error_is_persistence_error() {
        assert_eq!(
            DbError::PersistenceError("Data integrity error: bad value".to_owned()),
            DbError::from(ModelError("bad value".to_owned()))
        );
    }

    #[tokio::test]
    async fn test_with_deadline_none() {
        assert_eq!(Ok(5), with_deadline(None, async { Ok(5) }).await);
        assert_eq!(
            Err(DbError::NotFound),
            with_deadline(None, async { Err::<(), _>(DbError::NotFound) }).await
        );
    }

    #[tokio::test]
    async fn test_with_deadline_in_time() {
        let deadline = Instant::now() + Duration::from_secs(60);
        assert_eq!(Ok("done"), with_deadline(Some(deadline), async { Ok("done") }).await);
    }

    #[tokio::test]
    async fn test_with_deadline_already_expired_does_not_run() {
        let deadline = Instant::now() - Duration::from_millis(1);
        let mut ran = false;
        let result = with_deadline(Some(deadline), async {
            ran = true;
            Ok(())
        })
        .await;
        assert_eq!(Err(DbError::Cancelled), result);
        assert!(!ran);
    }

    #[tokio::test]
    async fn test_with_deadline_expires_in_flight() {
        let deadline = Instant::now() + Duration::from_millis(10);
        let result = with_deadline(Some(deadline), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert_eq!(Err(DbError::Cancelled), result);
    }
}

/// Tests shared by all database implementations.
#[cfg(all(test, any(feature = "postgres", feature = "sqlite")))]
mod backend_tests {
    use super::*;
    use sqlx::Row;
    use std::sync::Arc;

    /// Runs a `query` on `ex` and does not care about its results.  The `query` must be valid for
    /// all possible database implementations.
    pub(super) async fn exec(ex: &mut Executor, query: &str) {
        match ex {
            #[cfg(feature = "postgres")]
            Executor::Postgres(ex) => {
                sqlx::query(query).execute(ex).await.unwrap();
            }

            #[cfg(feature = "sqlite")]
            Executor::Sqlite(ex) => {
                sqlx::query(query).execute(ex).await.unwrap();
            }
        }
    }

    /// Runs a `query` on `ex` that fetches a single row with an `i64` value on `column` and returns
    /// that value.  The `query` must be valid for all possible database implementations.
    pub(super) async fn query_i64(ex: &mut Executor, column: &str, query: &str) -> i64 {
        match ex {
            #[cfg(feature = "postgres")]
            Executor::Postgres(ex) => {
                let row = sqlx::query(query).fetch_one(ex).await.unwrap();
                row.try_get(column).unwrap()
            }

            #[cfg(feature = "sqlite")]
            Executor::Sqlite(ex) => {
                let row = sqlx::query(query).fetch_one(ex).await.unwrap();
                row.try_get(column).unwrap()
            }
        }
    }

    /// Counts the rows in the `test` table.
    async fn count_rows(db: &Arc<dyn Db + Send + Sync>) -> i64 {
        query_i64(&mut db.ex().await.unwrap(), "count", "SELECT COUNT(*) AS count FROM test").await
    }

    pub(super) async fn test_direct_execution(db: Arc<dyn Db + Send + Sync>) {
        exec(&mut db.ex().await.unwrap(), "CREATE TABLE test (i INTEGER)").await;
        exec(&mut db.ex().await.unwrap(), "INSERT INTO test (i) VALUES (3)").await;
        assert_eq!(1, count_rows(&db).await);
        db.close().await;
    }

    pub(super) async fn test_tx_commit(db: Arc<dyn Db + Send + Sync>) {
        exec(&mut db.ex().await.unwrap(), "CREATE TABLE test (i INTEGER)").await;

        let mut tx = db.begin().await.unwrap();
        exec(tx.ex(), "INSERT INTO test (i) VALUES (3)").await;
        tx.commit().await.unwrap();

        assert_eq!(1, count_rows(&db).await);
        db.close().await;
    }

    pub(super) async fn test_tx_rollback_on_drop(db: Arc<dyn Db + Send + Sync>) {
        exec(&mut db.ex().await.unwrap(), "CREATE TABLE test (i INTEGER)").await;

        {
            let mut tx = db.begin().await.unwrap();
            exec(tx.ex(), "INSERT INTO test (i) VALUES (3)").await;
        }

        assert_eq!(0, count_rows(&db).await);
        db.close().await;
    }

    pub(super) async fn test_tx_statement_timeout_allows_fast_statements(
        db: Arc<dyn Db + Send + Sync>,
    ) {
        exec(&mut db.ex().await.unwrap(), "CREATE TABLE test (i INTEGER)").await;

        let mut tx = db.begin().await.unwrap();
        tx.set_statement_timeout(Duration::from_secs(30)).await.unwrap();
        exec(tx.ex(), "INSERT INTO test (i) VALUES (3)").await;
        tx.commit().await.unwrap();

        assert_eq!(1, count_rows(&db).await);
        db.close().await;
    }

    pub(super) async fn test_multiple_txs(db: Arc<dyn Db + Send + Sync>) {
        let tx1 = db.begin().await.unwrap();
        let tx2 = db.begin().await.unwrap();
        tx1.commit().await.unwrap();
        tx2.commit().await.unwrap();
        db.close().await;
    }

    pub(super) async fn test_begin_tx_after_drop(db: Arc<dyn Db + Send + Sync>) {
        let tx1 = db.clone().begin().await.unwrap();
        tx1.commit().await.unwrap();

        let tx2 = db.begin().await.unwrap();
        tx2.commit().await.unwrap();
        db.close().await;
    }

    /// Instantiates tests that need concurrent access to the database.  These tests cannot write
    /// to the database.
    macro_rules! generate_db_ro_concurrent_tests [
        ( $setup:expr $(, #[$extra:meta])? ) => {
            $crate::db::testutils::generate_tests!(
                $( #[$extra], )?
                $setup,
                $crate::db::backend_tests,
                test_multiple_txs,
                test_begin_tx_after_drop
            );
        }
    ];

    pub(super) use generate_db_ro_concurrent_tests;

    /// Instantiates tests that need write access to the test database.
    macro_rules! generate_db_rw_tests [
        ( $setup:expr $(, #[$extra:meta])? ) => {
            $crate::db::testutils::generate_tests!(
                $( #[$extra], )?
                $setup,
                $crate::db::backend_tests,
                test_direct_execution,
                test_tx_commit,
                test_tx_rollback_on_drop,
                test_tx_statement_timeout_allows_fast_statements
            );
        }
    ];

    pub(super) use generate_db_rw_tests;
}

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

//! Test utilities to obtain initialized databases.

use crate::db::init_schema;
#[cfg(feature = "postgres")]
use campus_core::db::postgres;
use campus_core::db::{Db, sqlite};
use std::sync::Arc;

/// Creates a new in-memory SQLite database with the schema installed.
///
/// The database uses a single connection, just like the PostgreSQL one, so tests must not hold
/// more than one executor at a time.
pub async fn setup_sqlite() -> Arc<dyn Db + Send + Sync> {
    let db = sqlite::testutils::setup_single_connection().await;
    init_schema(&mut db.ex().await.unwrap()).await.unwrap();
    Arc::new(db)
}

/// Creates a new in-memory SQLite database with the schema installed that serves operations
/// from multiple connections, as needed by tests that exercise concurrent callers.
pub async fn setup_sqlite_pool() -> Arc<dyn Db + Send + Sync> {
    let db = sqlite::testutils::setup().await;
    init_schema(&mut db.ex().await.unwrap()).await.unwrap();
    Arc::new(db)
}

/// Connects to the PostgreSQL test database configured via `PGSQL_TEST_*` variables and
/// installs the schema in the connection's temporary namespace.
#[cfg(feature = "postgres")]
pub async fn setup_postgres() -> Arc<dyn Db + Send + Sync> {
    let db = postgres::testutils::setup().await;
    init_schema(&mut db.ex().await.unwrap()).await.unwrap();
    Arc::new(db)
}

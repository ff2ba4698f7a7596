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

//! Repositories that expose the persistence operations of each aggregate.
//!
//! Every repository holds an injected database handle and, optionally, a deadline.  Each
//! operation acquires an executor from the database, issues a single data statement and releases
//! the executor before returning.
//!
//! Writes run inside their own transaction, which is only committed if the statement completes
//! before the deadline.  A write abandoned because of the deadline is rolled back, so callers that
//! see `DbError::Cancelled` can rely on nothing having been persisted.

use campus_core::db::{Db, DbError, DbResult, TxExecutor, with_deadline};
use log::warn;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;

mod course;
pub use course::CourseRepository;
mod group;
pub use group::GroupRepository;
mod quiz;
pub use quiz::QuizRepository;
mod user;
pub use user::UserRepository;


/// State shared by all repositories.
#[derive(Clone)]
struct Context {
    /// Database in which the entities live.
    db: Arc<dyn Db + Send + Sync>,

    /// Time by which every operation must complete, if any.
    deadline: Option<Instant>,
}

impl Context {
    /// Creates a new context for `db` without a deadline.
    fn new(db: Arc<dyn Db + Send + Sync>) -> Self {
        Self { db, deadline: None }
    }

    /// Runs the operation `op`, identified by `name` for logging purposes, subject to the
    /// configured deadline.
    async fn run<T, F>(&self, name: &'static str, op: F) -> DbResult<T>
    where
        F: Future<Output = DbResult<T>>,
    {
        let result = with_deadline(self.deadline, op).await;
        if let Err(DbError::Cancelled) = result {
            warn!("Operation {} was cancelled", name);
        }
        result
    }

    /// Starts the transaction for a write operation.
    ///
    /// The time left until the deadline becomes the statement timeout of the transaction so that
    /// the database itself aborts statements that outlive the deadline.
    async fn begin(&self) -> DbResult<TxExecutor> {
        let mut tx = self.db.begin().await?;
        if let Some(deadline) = self.deadline {
            tx.set_statement_timeout(deadline.saturating_duration_since(Instant::now())).await?;
        }
        Ok(tx)
    }

    /// Commits the write transaction `tx` of the operation `name`.
    ///
    /// The commit itself is never interrupted so that the result reported to the caller always
    /// matches what was persisted.
    async fn commit(&self, name: &'static str, tx: TxExecutor) -> DbResult<()> {
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            warn!("Operation {} was cancelled before committing", name);
            return Err(DbError::Cancelled);
        }
        tx.commit().await
    }
}

/// Fails if an entity that is about to be created already has an identity.
fn ensure_unsaved<I: Display>(entity: &'static str, id: Option<I>) -> DbResult<()> {
    match id {
        None => Ok(()),
        Some(id) => Err(DbError::PersistenceError(format!(
            "Cannot create {} because it already has id {}",
            entity, id
        ))),
    }
}

#[cfg(test)]
mod context_tests {
    use super::*;
    use crate::db::testutils::setup_sqlite;
    use crate::model::{StudyGroup, StudyGroupId, UserId};
    use std::time::Duration;

    #[test]
    fn test_ensure_unsaved() {
        ensure_unsaved::<UserId>("user", None).unwrap();
        assert_eq!(
            DbError::PersistenceError("Cannot create user because it already has id 3".to_owned()),
            ensure_unsaved("user", Some(UserId::new(3).unwrap())).unwrap_err()
        );
    }

    #[tokio::test]
    async fn test_context_without_deadline() {
        let db = setup_sqlite().await;
        let ctx = Context::new(db.clone());
        assert_eq!(Ok(3), ctx.run("test", async { Ok(3) }).await);
        db.close().await;
    }

    #[tokio::test]
    async fn test_context_deadline_expired() {
        let db = setup_sqlite().await;
        let mut ctx = Context::new(db.clone());
        ctx.deadline = Some(Instant::now() - Duration::from_millis(1));
        assert_eq!(
            Err(DbError::Cancelled),
            ctx.run("test", async { Err::<(), _>(DbError::NotFound) }).await
        );
        db.close().await;
    }

    #[tokio::test]
    async fn test_context_commit_within_deadline() {
        let db = setup_sqlite().await;
        let mut ctx = Context::new(db.clone());
        ctx.deadline = Some(Instant::now() + Duration::from_secs(60));

        let mut tx = ctx.begin().await.unwrap();
        crate::db::create_study_group(tx.ex(), &StudyGroup::new("Kept")).await.unwrap();
        ctx.commit("test", tx).await.unwrap();

        let mut ex = db.ex().await.unwrap();
        let id = StudyGroupId::new(1).unwrap();
        assert_eq!("Kept", crate::db::get_study_group(&mut ex, id).await.unwrap().name());
        drop(ex);
        db.close().await;
    }

    #[tokio::test]
    async fn test_context_commit_after_deadline_rolls_back() {
        let db = setup_sqlite().await;
        let mut ctx = Context::new(db.clone());
        ctx.deadline = Some(Instant::now() + Duration::from_secs(60));

        let mut tx = ctx.begin().await.unwrap();
        crate::db::create_study_group(tx.ex(), &StudyGroup::new("Dropped")).await.unwrap();
        ctx.deadline = Some(Instant::now() - Duration::from_millis(1));
        assert_eq!(Err(DbError::Cancelled), ctx.commit("test", tx).await);

        let mut ex = db.ex().await.unwrap();
        let id = StudyGroupId::new(1).unwrap();
        assert_eq!(Err(DbError::NotFound), crate::db::get_study_group(&mut ex, id).await);
        drop(ex);
        db.close().await;
    }
}

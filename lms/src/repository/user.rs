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

//! Repository of users.

use crate::db;
use crate::model::{User, UserId};
use crate::repository::{Context, ensure_unsaved};
use campus_core::db::{Db, DbResult};
use campus_core::model::EmailAddress;
use log::debug;
use std::sync::Arc;
use tokio::time::Instant;

/// Repository to create and look up users.
#[derive(Clone)]
pub struct UserRepository {
    /// Database handle and deadline.
    ctx: Context,
}

impl UserRepository {
    /// Creates a new repository backed by `db`.
    pub fn new(db: Arc<dyn Db + Send + Sync>) -> Self {
        Self { ctx: Context::new(db) }
    }

    /// Makes all operations of this repository fail with `Cancelled` once `deadline` passes.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.ctx.deadline = Some(deadline);
        self
    }

    /// Persists a new `user` and records the assigned identity in it.
    ///
    /// Fails with `ConstraintViolation` if another user already has the same email address.
    pub async fn create_user(&self, user: &mut User) -> DbResult<UserId> {
        ensure_unsaved("user", user.id())?;
        let (tx, id) = self
            .ctx
            .run("create_user", async {
                let mut tx = self.ctx.begin().await?;
                let id = db::create_user(tx.ex(), user).await?;
                Ok((tx, id))
            })
            .await?;
        self.ctx.commit("create_user", tx).await?;
        debug!("Created user {} with email {}", id, user.email().as_str());
        user.set_id(id);
        Ok(id)
    }

    /// Gets the user whose email address is `email`.
    pub async fn get_user_by_email(&self, email: &EmailAddress) -> DbResult<User> {
        self.ctx
            .run("get_user_by_email", async {
                let mut ex = self.ctx.db.ex().await?;
                db::get_user_by_email(&mut ex, email).await
            })
            .await
    }

    /// Gets the user identified by `id`.
    pub async fn get_user_by_id(&self, id: UserId) -> DbResult<User> {
        self.ctx
            .run("get_user_by_id", async {
                let mut ex = self.ctx.db.ex().await?;
                db::get_user_by_id(&mut ex, id).await
            })
            .await
    }
}

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

//! Repository of study groups.

use crate::db;
use crate::model::{StudyGroup, StudyGroupId, UserId};
use crate::repository::{Context, ensure_unsaved};
use campus_core::db::{Db, DbResult};
use log::debug;
use std::sync::Arc;
use tokio::time::Instant;

/// Repository to manage study groups and their members.
#[derive(Clone)]
pub struct GroupRepository {
    /// Database handle and deadline.
    ctx: Context,
}

impl GroupRepository {
    /// Creates a new repository backed by `db`.
    pub fn new(db: Arc<dyn Db + Send + Sync>) -> Self {
        Self { ctx: Context::new(db) }
    }

    /// Makes all operations of this repository fail with `Cancelled` once `deadline` passes.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.ctx.deadline = Some(deadline);
        self
    }

    /// Persists a new study `group` and records the assigned identity in it.
    pub async fn create_study_group(&self, group: &mut StudyGroup) -> DbResult<StudyGroupId> {
        ensure_unsaved("study group", group.id())?;
        let (tx, id) = self
            .ctx
            .run("create_study_group", async {
                let mut tx = self.ctx.begin().await?;
                let id = db::create_study_group(tx.ex(), group).await?;
                Ok((tx, id))
            })
            .await?;
        self.ctx.commit("create_study_group", tx).await?;
        debug!("Created study group {}", id);
        group.set_id(id);
        Ok(id)
    }

    /// Gets the study group identified by `id`.
    pub async fn get_study_group(&self, id: StudyGroupId) -> DbResult<StudyGroup> {
        self.ctx
            .run("get_study_group", async {
                let mut ex = self.ctx.db.ex().await?;
                db::get_study_group(&mut ex, id).await
            })
            .await
    }

    /// Adds the student `user_id` to the study group `group_id`.
    ///
    /// Fails with `ConstraintViolation` if the student is already a member or if either entity
    /// does not exist.
    pub async fn add_student_to_group(
        &self,
        group_id: StudyGroupId,
        user_id: UserId,
    ) -> DbResult<()> {
        let tx = self
            .ctx
            .run("add_student_to_group", async {
                let mut tx = self.ctx.begin().await?;
                db::add_student_to_group(tx.ex(), group_id, user_id).await?;
                Ok(tx)
            })
            .await?;
        self.ctx.commit("add_student_to_group", tx).await
    }

    /// Gets the members of the study group `group_id`, ordered by identity.
    pub async fn get_group_students(&self, group_id: StudyGroupId) -> DbResult<Vec<UserId>> {
        self.ctx
            .run("get_group_students", async {
                let mut ex = self.ctx.db.ex().await?;
                db::get_group_students(&mut ex, group_id).await
            })
            .await
    }
}

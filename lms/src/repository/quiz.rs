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

//! Repository of quizzes.

use crate::db;
use crate::model::{OneAnsTask, OneAnsTaskId, Quiz, QuizId, Task, TaskId};
use crate::repository::{Context, ensure_unsaved};
use campus_core::db::{Db, DbResult};
use log::debug;
use std::sync::Arc;
use tokio::time::Instant;

/// Repository to manage quizzes and their tasks.
#[derive(Clone)]
pub struct QuizRepository {
    /// Database handle and deadline.
    ctx: Context,
}

impl QuizRepository {
    /// Creates a new repository backed by `db`.
    pub fn new(db: Arc<dyn Db + Send + Sync>) -> Self {
        Self { ctx: Context::new(db) }
    }

    /// Makes all operations of this repository fail with `Cancelled` once `deadline` passes.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.ctx.deadline = Some(deadline);
        self
    }

    /// Persists a new `quiz` and records the assigned identity in it.
    pub async fn create_quiz(&self, quiz: &mut Quiz) -> DbResult<QuizId> {
        ensure_unsaved("quiz", quiz.id())?;
        let (tx, id) = self
            .ctx
            .run("create_quiz", async {
                let mut tx = self.ctx.begin().await?;
                let id = db::create_quiz(tx.ex(), quiz).await?;
                Ok((tx, id))
            })
            .await?;
        self.ctx.commit("create_quiz", tx).await?;
        debug!("Created quiz {}", id);
        quiz.set_id(id);
        Ok(id)
    }

    /// Gets the quiz identified by `id`.
    pub async fn get_quiz_by_id(&self, id: QuizId) -> DbResult<Quiz> {
        self.ctx
            .run("get_quiz_by_id", async {
                let mut ex = self.ctx.db.ex().await?;
                db::get_quiz_by_id(&mut ex, id).await
            })
            .await
    }

    /// Persists a new `task` and records the assigned identity in it.
    ///
    /// Fails with `ConstraintViolation` if the owning quiz does not exist.
    pub async fn create_task(&self, task: &mut Task) -> DbResult<TaskId> {
        ensure_unsaved("task", task.id())?;
        let (tx, id) = self
            .ctx
            .run("create_task", async {
                let mut tx = self.ctx.begin().await?;
                let id = db::create_task(tx.ex(), task).await?;
                Ok((tx, id))
            })
            .await?;
        self.ctx.commit("create_task", tx).await?;
        debug!("Created task {} in quiz {}", id, task.quiz_id());
        task.set_id(id);
        Ok(id)
    }

    /// Gets the task identified by `id`.
    pub async fn get_task(&self, id: TaskId) -> DbResult<Task> {
        self.ctx
            .run("get_task", async {
                let mut ex = self.ctx.db.ex().await?;
                db::get_task(&mut ex, id).await
            })
            .await
    }

    /// Gets all tasks of the quiz `quiz_id`, ordered by identity.
    pub async fn get_quiz_tasks(&self, quiz_id: QuizId) -> DbResult<Vec<Task>> {
        self.ctx
            .run("get_quiz_tasks", async {
                let mut ex = self.ctx.db.ex().await?;
                db::get_quiz_tasks(&mut ex, quiz_id).await
            })
            .await
    }

    /// Persists the payload of a single-answer task and records the assigned identity in it.
    ///
    /// Fails with `ConstraintViolation` if the task does not exist or already has a payload.
    pub async fn create_one_ans_task(&self, payload: &mut OneAnsTask) -> DbResult<OneAnsTaskId> {
        ensure_unsaved("one-answer task", payload.id())?;
        let (tx, id) = self
            .ctx
            .run("create_one_ans_task", async {
                let mut tx = self.ctx.begin().await?;
                let id = db::create_one_ans_task(tx.ex(), payload).await?;
                Ok((tx, id))
            })
            .await?;
        self.ctx.commit("create_one_ans_task", tx).await?;
        debug!("Created one-answer task {} for task {}", id, payload.task_id());
        payload.set_id(id);
        Ok(id)
    }

    /// Gets the single-answer payload identified by `id`.
    pub async fn get_one_ans_task(&self, id: OneAnsTaskId) -> DbResult<OneAnsTask> {
        self.ctx
            .run("get_one_ans_task", async {
                let mut ex = self.ctx.db.ex().await?;
                db::get_one_ans_task(&mut ex, id).await
            })
            .await
    }
}

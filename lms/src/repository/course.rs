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

//! Repository of courses.

use crate::db;
use crate::model::{
    Announcement, AnnouncementId, Course, CourseBlock, CourseBlockId, CourseId, UserId,
};
use crate::repository::{Context, ensure_unsaved};
use campus_core::db::{Db, DbResult};
use log::debug;
use std::sync::Arc;
use tokio::time::Instant;

/// Repository to manage courses, their participants and their content.
#[derive(Clone)]
pub struct CourseRepository {
    /// Database handle and deadline.
    ctx: Context,
}

impl CourseRepository {
    /// Creates a new repository backed by `db`.
    pub fn new(db: Arc<dyn Db + Send + Sync>) -> Self {
        Self { ctx: Context::new(db) }
    }

    /// Makes all operations of this repository fail with `Cancelled` once `deadline` passes.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.ctx.deadline = Some(deadline);
        self
    }

    /// Persists a new `course` and records the assigned identity in it.
    pub async fn create_course(&self, course: &mut Course) -> DbResult<CourseId> {
        ensure_unsaved("course", course.id())?;
        let (tx, id) = self
            .ctx
            .run("create_course", async {
                let mut tx = self.ctx.begin().await?;
                let id = db::create_course(tx.ex(), course).await?;
                Ok((tx, id))
            })
            .await?;
        self.ctx.commit("create_course", tx).await?;
        debug!("Created course {}", id);
        course.set_id(id);
        Ok(id)
    }

    /// Gets the course identified by `id`.
    pub async fn get_course_by_id(&self, id: CourseId) -> DbResult<Course> {
        self.ctx
            .run("get_course_by_id", async {
                let mut ex = self.ctx.db.ex().await?;
                db::get_course_by_id(&mut ex, id).await
            })
            .await
    }

    /// Enrolls the student `user_id` in the course `course_id`.
    ///
    /// Fails with `ConstraintViolation` if the student is already enrolled or if either entity
    /// does not exist.
    pub async fn enroll_student(&self, course_id: CourseId, user_id: UserId) -> DbResult<()> {
        let tx = self
            .ctx
            .run("enroll_student", async {
                let mut tx = self.ctx.begin().await?;
                db::enroll_student(tx.ex(), course_id, user_id).await?;
                Ok(tx)
            })
            .await?;
        self.ctx.commit("enroll_student", tx).await
    }

    /// Assigns the teacher `user_id` to the course `course_id`.
    ///
    /// Fails with `ConstraintViolation` if the teacher is already assigned or if either entity
    /// does not exist.
    pub async fn assign_teacher(&self, course_id: CourseId, user_id: UserId) -> DbResult<()> {
        let tx = self
            .ctx
            .run("assign_teacher", async {
                let mut tx = self.ctx.begin().await?;
                db::assign_teacher(tx.ex(), course_id, user_id).await?;
                Ok(tx)
            })
            .await?;
        self.ctx.commit("assign_teacher", tx).await
    }

    /// Gets the students enrolled in the course `course_id`, ordered by identity.
    pub async fn get_course_students(&self, course_id: CourseId) -> DbResult<Vec<UserId>> {
        self.ctx
            .run("get_course_students", async {
                let mut ex = self.ctx.db.ex().await?;
                db::get_course_students(&mut ex, course_id).await
            })
            .await
    }

    /// Gets the teachers assigned to the course `course_id`, ordered by identity.
    pub async fn get_course_teachers(&self, course_id: CourseId) -> DbResult<Vec<UserId>> {
        self.ctx
            .run("get_course_teachers", async {
                let mut ex = self.ctx.db.ex().await?;
                db::get_course_teachers(&mut ex, course_id).await
            })
            .await
    }

    /// Persists a new course `block` and records the assigned identity in it.
    ///
    /// Fails with `ConstraintViolation` if the owning course does not exist.
    pub async fn create_course_block(&self, block: &mut CourseBlock) -> DbResult<CourseBlockId> {
        ensure_unsaved("course block", block.id())?;
        let (tx, id) = self
            .ctx
            .run("create_course_block", async {
                let mut tx = self.ctx.begin().await?;
                let id = db::create_course_block(tx.ex(), block).await?;
                Ok((tx, id))
            })
            .await?;
        self.ctx.commit("create_course_block", tx).await?;
        debug!("Created block {} in course {}", id, block.course_id());
        block.set_id(id);
        Ok(id)
    }

    /// Gets the course block identified by `id`.
    pub async fn get_course_block(&self, id: CourseBlockId) -> DbResult<CourseBlock> {
        self.ctx
            .run("get_course_block", async {
                let mut ex = self.ctx.db.ex().await?;
                db::get_course_block(&mut ex, id).await
            })
            .await
    }

    /// Persists a new `announcement` and records the assigned identity in it.
    ///
    /// Fails with `ConstraintViolation` if the owning block does not exist.
    pub async fn create_announcement(
        &self,
        announcement: &mut Announcement,
    ) -> DbResult<AnnouncementId> {
        ensure_unsaved("announcement", announcement.id())?;
        let (tx, id) = self
            .ctx
            .run("create_announcement", async {
                let mut tx = self.ctx.begin().await?;
                let id = db::create_announcement(tx.ex(), announcement).await?;
                Ok((tx, id))
            })
            .await?;
        self.ctx.commit("create_announcement", tx).await?;
        debug!("Created announcement {} in block {}", id, announcement.block_id());
        announcement.set_id(id);
        Ok(id)
    }

    /// Gets the announcement identified by `id`.
    pub async fn get_announcement(&self, id: AnnouncementId) -> DbResult<Announcement> {
        self.ctx
            .run("get_announcement", async {
                let mut ex = self.ctx.db.ex().await?;
                db::get_announcement(&mut ex, id).await
            })
            .await
    }
}

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

//! Persistence of courses, their participants and their content.

use super::{insert_relation, list_relations};
use crate::model::{
    Announcement, AnnouncementId, Course, CourseBlock, CourseBlockId, CourseId, UserId,
};
#[cfg(feature = "postgres")]
use campus_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use campus_core::db::sqlite;
use campus_core::db::{DbError, DbResult, Executor};
use sqlx::Row;
#[cfg(feature = "postgres")]
use sqlx::postgres::PgRow;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::SqliteRow;

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for Course {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(postgres::map_sqlx_error)?;
        let complete: bool = row.try_get("completeness").map_err(postgres::map_sqlx_error)?;

        Ok(Course::new(name, complete).with_id(CourseId::new(id)?))
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for Course {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(sqlite::map_sqlx_error)?;
        let completeness: i64 = row.try_get("completeness").map_err(sqlite::map_sqlx_error)?;

        let complete = Course::completeness_from_code(completeness)?;
        Ok(Course::new(name, complete).with_id(CourseId::new(id)?))
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for CourseBlock {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(postgres::map_sqlx_error)?;
        let course_id: i64 = row.try_get("course_id").map_err(postgres::map_sqlx_error)?;

        Ok(CourseBlock::new(name, CourseId::new(course_id)?).with_id(CourseBlockId::new(id)?))
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for CourseBlock {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(sqlite::map_sqlx_error)?;
        let course_id: i64 = row.try_get("course_id").map_err(sqlite::map_sqlx_error)?;

        Ok(CourseBlock::new(name, CourseId::new(course_id)?).with_id(CourseBlockId::new(id)?))
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for Announcement {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(postgres::map_sqlx_error)?;
        let info: String = row.try_get("info").map_err(postgres::map_sqlx_error)?;
        let block_id: i64 = row.try_get("block_id").map_err(postgres::map_sqlx_error)?;

        Ok(Announcement::new(name, info, CourseBlockId::new(block_id)?)
            .with_id(AnnouncementId::new(id)?))
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for Announcement {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(sqlite::map_sqlx_error)?;
        let info: String = row.try_get("info").map_err(sqlite::map_sqlx_error)?;
        let block_id: i64 = row.try_get("block_id").map_err(sqlite::map_sqlx_error)?;

        Ok(Announcement::new(name, info, CourseBlockId::new(block_id)?)
            .with_id(AnnouncementId::new(id)?))
    }
}

/// Creates a new `course` and returns the identity the database assigned to it.
pub async fn create_course(ex: &mut Executor, course: &Course) -> DbResult<CourseId> {
    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "INSERT INTO courses (name, completeness) VALUES ($1, $2) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(course.name())
                .bind(course.is_complete())
                .fetch_one(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "INSERT INTO courses (name, completeness) VALUES (?, ?) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(course.name())
                .bind(i64::from(course.is_complete()))
                .fetch_one(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(CourseId::new(id)?)
}

/// Gets the course identified by `id`.
pub async fn get_course_by_id(ex: &mut Executor, id: CourseId) -> DbResult<Course> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM courses WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            Course::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM courses WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Course::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Enrolls the student `user_id` in the course `course_id`.
pub async fn enroll_student(
    ex: &mut Executor,
    course_id: CourseId,
    user_id: UserId,
) -> DbResult<()> {
    insert_relation(
        ex,
        "course_student",
        "course_id",
        "student_id",
        course_id.as_i64(),
        user_id.as_i64(),
    )
    .await
}

/// Assigns the teacher `user_id` to the course `course_id`.
pub async fn assign_teacher(
    ex: &mut Executor,
    course_id: CourseId,
    user_id: UserId,
) -> DbResult<()> {
    insert_relation(
        ex,
        "course_teacher",
        "course_id",
        "teacher_id",
        course_id.as_i64(),
        user_id.as_i64(),
    )
    .await
}

/// Gets the students enrolled in the course `course_id`, ordered by identity.
pub async fn get_course_students(ex: &mut Executor, course_id: CourseId) -> DbResult<Vec<UserId>> {
    let ids =
        list_relations(ex, "course_student", "course_id", "student_id", course_id.as_i64()).await?;
    Ok(ids.into_iter().map(UserId::new).collect::<Result<_, _>>()?)
}

/// Gets the teachers assigned to the course `course_id`, ordered by identity.
pub async fn get_course_teachers(ex: &mut Executor, course_id: CourseId) -> DbResult<Vec<UserId>> {
    let ids =
        list_relations(ex, "course_teacher", "course_id", "teacher_id", course_id.as_i64()).await?;
    Ok(ids.into_iter().map(UserId::new).collect::<Result<_, _>>()?)
}

/// Creates a new `block` and returns the identity the database assigned to it.
pub async fn create_course_block(
    ex: &mut Executor,
    block: &CourseBlock,
) -> DbResult<CourseBlockId> {
    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str =
                "INSERT INTO course_blocks (name, course_id) VALUES ($1, $2) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(block.name())
                .bind(block.course_id().as_i64())
                .fetch_one(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str =
                "INSERT INTO course_blocks (name, course_id) VALUES (?, ?) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(block.name())
                .bind(block.course_id().as_i64())
                .fetch_one(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(CourseBlockId::new(id)?)
}

/// Gets the course block identified by `id`.
pub async fn get_course_block(ex: &mut Executor, id: CourseBlockId) -> DbResult<CourseBlock> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM course_blocks WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            CourseBlock::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM course_blocks WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            CourseBlock::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Creates a new `announcement` and returns the identity the database assigned to it.
pub async fn create_announcement(
    ex: &mut Executor,
    announcement: &Announcement,
) -> DbResult<AnnouncementId> {
    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str =
                "INSERT INTO announcements (name, info, block_id) VALUES ($1, $2, $3) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(announcement.name())
                .bind(announcement.info())
                .bind(announcement.block_id().as_i64())
                .fetch_one(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str =
                "INSERT INTO announcements (name, info, block_id) VALUES (?, ?, ?) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(announcement.name())
                .bind(announcement.info())
                .bind(announcement.block_id().as_i64())
                .fetch_one(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(AnnouncementId::new(id)?)
}

/// Gets the announcement identified by `id`.
pub async fn get_announcement(ex: &mut Executor, id: AnnouncementId) -> DbResult<Announcement> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM announcements WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            Announcement::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM announcements WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Announcement::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

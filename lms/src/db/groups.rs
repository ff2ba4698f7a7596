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

//! Persistence of study groups and their membership.

use super::{insert_relation, list_relations};
use crate::model::{StudyGroup, StudyGroupId, UserId};
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
impl TryFrom<PgRow> for StudyGroup {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(postgres::map_sqlx_error)?;

        Ok(StudyGroup::new(name).with_id(StudyGroupId::new(id)?))
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for StudyGroup {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(sqlite::map_sqlx_error)?;

        Ok(StudyGroup::new(name).with_id(StudyGroupId::new(id)?))
    }
}

/// Creates a new study `group` and returns the identity the database assigned to it.
pub async fn create_study_group(ex: &mut Executor, group: &StudyGroup) -> DbResult<StudyGroupId> {
    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "INSERT INTO study_groups (name) VALUES ($1) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(group.name())
                .fetch_one(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "INSERT INTO study_groups (name) VALUES (?) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(group.name())
                .fetch_one(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(StudyGroupId::new(id)?)
}

/// Gets the study group identified by `id`.
pub async fn get_study_group(ex: &mut Executor, id: StudyGroupId) -> DbResult<StudyGroup> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM study_groups WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            StudyGroup::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM study_groups WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            StudyGroup::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Adds the student `user_id` to the study group `group_id`.
pub async fn add_student_to_group(
    ex: &mut Executor,
    group_id: StudyGroupId,
    user_id: UserId,
) -> DbResult<()> {
    insert_relation(
        ex,
        "group_student",
        "group_id",
        "student_id",
        group_id.as_i64(),
        user_id.as_i64(),
    )
    .await
}

/// Gets the members of the study group `group_id`, ordered by identity.
pub async fn get_group_students(
    ex: &mut Executor,
    group_id: StudyGroupId,
) -> DbResult<Vec<UserId>> {
    let ids =
        list_relations(ex, "group_student", "group_id", "student_id", group_id.as_i64()).await?;
    Ok(ids.into_iter().map(UserId::new).collect::<Result<_, _>>()?)
}

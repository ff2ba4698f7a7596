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

//! Persistence of quizzes and their tasks.

use super::{from_db_int, to_db_int};
use crate::model::{FillingId, OneAnsTask, OneAnsTaskId, Quiz, QuizId, Task, TaskId, TaskKind};
#[cfg(feature = "postgres")]
use campus_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use campus_core::db::sqlite::{self, build_optional_timestamp, unpack_timestamp};
use campus_core::db::{DbError, DbResult, Executor};
use sqlx::Row;
#[cfg(feature = "postgres")]
use sqlx::postgres::PgRow;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::SqliteRow;
#[cfg(feature = "postgres")]
use time::OffsetDateTime;

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for Quiz {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(postgres::map_sqlx_error)?;
        let start: Option<OffsetDateTime> =
            row.try_get("start_time").map_err(postgres::map_sqlx_error)?;
        let end: Option<OffsetDateTime> =
            row.try_get("end_time").map_err(postgres::map_sqlx_error)?;
        let returnable: bool = row.try_get("returnable").map_err(postgres::map_sqlx_error)?;
        let random: bool = row.try_get("random").map_err(postgres::map_sqlx_error)?;
        let time_limit: i32 = row.try_get("time_limit").map_err(postgres::map_sqlx_error)?;
        let results_shown: bool = row.try_get("results_shown").map_err(postgres::map_sqlx_error)?;
        let try_count: i32 = row.try_get("try_count").map_err(postgres::map_sqlx_error)?;
        let filling_id: i64 = row.try_get("filling_id").map_err(postgres::map_sqlx_error)?;

        Ok(Quiz::new(name, FillingId::new(filling_id)?)
            .with_start(start)
            .with_end(end)
            .with_returnable(returnable)
            .with_random(random)
            .with_time_limit(from_db_int("time limit", time_limit)?)
            .with_results_shown(results_shown)
            .with_try_count(from_db_int("try count", try_count)?)
            .with_id(QuizId::new(id)?))
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for Quiz {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let name: String = row.try_get("name").map_err(sqlite::map_sqlx_error)?;
        let start_secs: Option<i64> =
            row.try_get("start_time_secs").map_err(sqlite::map_sqlx_error)?;
        let start_nsecs: Option<i64> =
            row.try_get("start_time_nsecs").map_err(sqlite::map_sqlx_error)?;
        let end_secs: Option<i64> = row.try_get("end_time_secs").map_err(sqlite::map_sqlx_error)?;
        let end_nsecs: Option<i64> =
            row.try_get("end_time_nsecs").map_err(sqlite::map_sqlx_error)?;
        let returnable: bool = row.try_get("returnable").map_err(sqlite::map_sqlx_error)?;
        let random: bool = row.try_get("random").map_err(sqlite::map_sqlx_error)?;
        let time_limit: i32 = row.try_get("time_limit").map_err(sqlite::map_sqlx_error)?;
        let results_shown: bool = row.try_get("results_shown").map_err(sqlite::map_sqlx_error)?;
        let try_count: i32 = row.try_get("try_count").map_err(sqlite::map_sqlx_error)?;
        let filling_id: i64 = row.try_get("filling_id").map_err(sqlite::map_sqlx_error)?;

        Ok(Quiz::new(name, FillingId::new(filling_id)?)
            .with_start(build_optional_timestamp("start_time", start_secs, start_nsecs)?)
            .with_end(build_optional_timestamp("end_time", end_secs, end_nsecs)?)
            .with_returnable(returnable)
            .with_random(random)
            .with_time_limit(from_db_int("time limit", time_limit)?)
            .with_results_shown(results_shown)
            .with_try_count(from_db_int("try count", try_count)?)
            .with_id(QuizId::new(id)?))
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for Task {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let kind: i16 = row.try_get("type").map_err(postgres::map_sqlx_error)?;
        let quiz_id: i64 = row.try_get("quiz_id").map_err(postgres::map_sqlx_error)?;

        Ok(Task::new(TaskKind::from_code(kind)?, QuizId::new(quiz_id)?).with_id(TaskId::new(id)?))
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for Task {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let kind: i16 = row.try_get("type").map_err(sqlite::map_sqlx_error)?;
        let quiz_id: i64 = row.try_get("quiz_id").map_err(sqlite::map_sqlx_error)?;

        Ok(Task::new(TaskKind::from_code(kind)?, QuizId::new(quiz_id)?).with_id(TaskId::new(id)?))
    }
}

#[cfg(feature = "postgres")]
impl TryFrom<PgRow> for OneAnsTask {
    type Error = DbError;

    fn try_from(row: PgRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(postgres::map_sqlx_error)?;
        let task_id: i64 = row.try_get("task_id").map_err(postgres::map_sqlx_error)?;
        let question: String = row.try_get("question").map_err(postgres::map_sqlx_error)?;

        Ok(OneAnsTask::new(TaskId::new(task_id)?, question).with_id(OneAnsTaskId::new(id)?))
    }
}

#[cfg(any(feature = "sqlite", test))]
impl TryFrom<SqliteRow> for OneAnsTask {
    type Error = DbError;

    fn try_from(row: SqliteRow) -> DbResult<Self> {
        let id: i64 = row.try_get("id").map_err(sqlite::map_sqlx_error)?;
        let task_id: i64 = row.try_get("task_id").map_err(sqlite::map_sqlx_error)?;
        let question: String = row.try_get("question").map_err(sqlite::map_sqlx_error)?;

        Ok(OneAnsTask::new(TaskId::new(task_id)?, question).with_id(OneAnsTaskId::new(id)?))
    }
}

/// Creates a new `quiz` and returns the identity the database assigned to it.
///
/// Absent start and end times are stored as NULLs.
pub async fn create_quiz(ex: &mut Executor, quiz: &Quiz) -> DbResult<QuizId> {
    let time_limit = to_db_int("time limit", quiz.time_limit())?;
    let try_count = to_db_int("try count", quiz.try_count())?;

    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "
                INSERT INTO quizzes (
                    name, start_time, end_time, returnable, random, time_limit, results_shown,
                    try_count, filling_id
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(quiz.name())
                .bind(quiz.start())
                .bind(quiz.end())
                .bind(quiz.is_returnable())
                .bind(quiz.is_random())
                .bind(time_limit)
                .bind(quiz.results_shown())
                .bind(try_count)
                .bind(quiz.filling_id().as_i64())
                .fetch_one(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (start_secs, start_nsecs) = match quiz.start() {
                Some(start) => {
                    let (secs, nsecs) = unpack_timestamp(start)?;
                    (Some(secs), Some(nsecs))
                }
                None => (None, None),
            };
            let (end_secs, end_nsecs) = match quiz.end() {
                Some(end) => {
                    let (secs, nsecs) = unpack_timestamp(end)?;
                    (Some(secs), Some(nsecs))
                }
                None => (None, None),
            };

            let query_str = "
                INSERT INTO quizzes (
                    name, start_time_secs, start_time_nsecs, end_time_secs, end_time_nsecs,
                    returnable, random, time_limit, results_shown, try_count, filling_id
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                RETURNING id";
            let row = sqlx::query(query_str)
                .bind(quiz.name())
                .bind(start_secs)
                .bind(start_nsecs)
                .bind(end_secs)
                .bind(end_nsecs)
                .bind(quiz.is_returnable())
                .bind(quiz.is_random())
                .bind(time_limit)
                .bind(quiz.results_shown())
                .bind(try_count)
                .bind(quiz.filling_id().as_i64())
                .fetch_one(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(QuizId::new(id)?)
}

/// Gets the quiz identified by `id`.
pub async fn get_quiz_by_id(ex: &mut Executor, id: QuizId) -> DbResult<Quiz> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM quizzes WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            Quiz::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM quizzes WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Quiz::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Creates a new `task` and returns the identity the database assigned to it.
pub async fn create_task(ex: &mut Executor, task: &Task) -> DbResult<TaskId> {
    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "INSERT INTO tasks (type, quiz_id) VALUES ($1, $2) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(task.kind().code())
                .bind(task.quiz_id().as_i64())
                .fetch_one(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "INSERT INTO tasks (type, quiz_id) VALUES (?, ?) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(task.kind().code())
                .bind(task.quiz_id().as_i64())
                .fetch_one(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(TaskId::new(id)?)
}

/// Gets the task identified by `id`.
pub async fn get_task(ex: &mut Executor, id: TaskId) -> DbResult<Task> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM tasks WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            Task::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM tasks WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            Task::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Gets all tasks of the quiz `quiz_id`, ordered by identity.
pub async fn get_quiz_tasks(ex: &mut Executor, quiz_id: QuizId) -> DbResult<Vec<Task>> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM tasks WHERE quiz_id = $1 ORDER BY id";
            let rows = sqlx::query(query_str)
                .bind(quiz_id.as_i64())
                .fetch_all(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.into_iter().map(Task::try_from).collect()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM tasks WHERE quiz_id = ? ORDER BY id";
            let rows = sqlx::query(query_str)
                .bind(quiz_id.as_i64())
                .fetch_all(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            rows.into_iter().map(Task::try_from).collect()
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Creates the payload of a single-answer task and returns the identity the database assigned
/// to it.  A task can have at most one payload.
pub async fn create_one_ans_task(
    ex: &mut Executor,
    payload: &OneAnsTask,
) -> DbResult<OneAnsTaskId> {
    let id: i64 = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str =
                "INSERT INTO one_ans_task (task_id, question) VALUES ($1, $2) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(payload.task_id().as_i64())
                .bind(payload.question())
                .fetch_one(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("id").map_err(postgres::map_sqlx_error)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str =
                "INSERT INTO one_ans_task (task_id, question) VALUES (?, ?) RETURNING id";
            let row = sqlx::query(query_str)
                .bind(payload.task_id().as_i64())
                .bind(payload.question())
                .fetch_one(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("id").map_err(sqlite::map_sqlx_error)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(OneAnsTaskId::new(id)?)
}

/// Gets the single-answer payload identified by `id`.
pub async fn get_one_ans_task(ex: &mut Executor, id: OneAnsTaskId) -> DbResult<OneAnsTask> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = "SELECT * FROM one_ans_task WHERE id = $1";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex)
                .await
                .map_err(postgres::map_sqlx_error)?;
            OneAnsTask::try_from(row)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = "SELECT * FROM one_ans_task WHERE id = ?";
            let row = sqlx::query(query_str)
                .bind(id.as_i64())
                .fetch_one(ex)
                .await
                .map_err(sqlite::map_sqlx_error)?;
            OneAnsTask::try_from(row)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

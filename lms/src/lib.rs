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

//! Persistence layer of the Campus learning-management system.
//!
//! This crate exposes repositories for users, courses, study groups and quizzes.  A typical
//! caller connects to a database, installs the schema and hands the database over to whichever
//! repositories it needs:
//!
//! ```no_run
//! # async fn example() -> campus_core::db::DbResult<()> {
//! use campus_core::db::{Db, DbError};
//! use campus_core::db::postgres::{PostgresDb, PostgresOptions};
//! use campus_lms::model::Course;
//! use campus_lms::repository::CourseRepository;
//! use std::sync::Arc;
//!
//! let opts = PostgresOptions::from_env("PGSQL").map_err(DbError::PersistenceError)?;
//! let db: Arc<dyn Db + Send + Sync> = Arc::new(PostgresDb::connect(opts)?);
//! campus_lms::db::init_schema(&mut db.ex().await?).await?;
//!
//! let courses = CourseRepository::new(db.clone());
//! let mut course = Course::new("Physics 101", false);
//! let id = courses.create_course(&mut course).await?;
//! assert_eq!(course, courses.get_course_by_id(id).await?);
//! # Ok(())
//! # }
//! ```

// Keep these in sync with other top-level files.
#![warn(anonymous_parameters, bad_style, clippy::missing_docs_in_private_items, missing_docs)]
#![warn(unused, unused_extern_crates, unused_import_braces, unused_qualifications)]
#![warn(unsafe_code)]

pub mod db;
pub mod model;
pub mod repository;

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

//! Entities and typed identities of the learning-management domain.

use campus_core::model::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::fmt;

mod course;
pub use course::{Announcement, Course, CourseBlock};
mod group;
pub use group::StudyGroup;
mod quiz;
pub use quiz::{OneAnsTask, Quiz, Task, TaskKind};
mod user;
pub use user::{Role, User};

/// Defines a newtype `$name` to hold the identity of a row assigned by the database.
///
/// Identities are always positive because both PostgreSQL sequences and SQLite autoincrement
/// columns start counting at 1.
macro_rules! define_id [
    ( $(#[$meta:meta])* $name:ident ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(i64);

        impl $name {
            /// Creates a new identity from its raw `id` value, validating that it is positive.
            pub fn new(id: i64) -> ModelResult<Self> {
                if id <= 0 {
                    return Err(ModelError(format!(
                        "{} must be positive but got {}",
                        stringify!($name),
                        id
                    )));
                }
                Ok(Self(id))
            }

            /// Returns the raw value of the identity.
            pub fn as_i64(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl TryFrom<i64> for $name {
            type Error = ModelError;

            fn try_from(id: i64) -> ModelResult<Self> {
                $name::new(id)
            }
        }
    }
];

define_id!(
    /// Identity of a user.
    UserId
);

define_id!(
    /// Identity of a course.
    CourseId
);

define_id!(
    /// Identity of a block within a course.
    CourseBlockId
);

define_id!(
    /// Identity of an announcement.
    AnnouncementId
);

define_id!(
    /// Identity of a study group.
    StudyGroupId
);

define_id!(
    /// Identity of a quiz.
    QuizId
);

define_id!(
    /// Identity of a task within a quiz.
    TaskId
);

define_id!(
    /// Identity of the payload of a single-answer task.
    OneAnsTaskId
);

define_id!(
    /// Reference to the filling of a quiz.  Fillings live outside of this system so nothing
    /// guarantees that the referenced entity exists.
    FillingId
);

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

//! The `Course` data type and the content that hangs from courses.

use crate::model::{AnnouncementId, CourseBlockId, CourseId};
use campus_core::model::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};

/// Representation of a course.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Course {
    /// Identity of the course, or `None` if the course has not been persisted yet.
    id: Option<CourseId>,

    /// Title of the course.
    name: String,

    /// Whether the course has been completed.
    complete: bool,
}

impl Course {
    /// Creates a new course without identity.
    pub fn new<N: Into<String>>(name: N, complete: bool) -> Self {
        Self { id: None, name: name.into(), complete }
    }

    /// Interprets the legacy integer encoding of the completeness flag.
    ///
    /// Only 0 (incomplete) and 1 (complete) are valid.
    pub fn completeness_from_code(code: i64) -> ModelResult<bool> {
        match code {
            0 => Ok(false),
            1 => Ok(true),
            n => Err(ModelError(format!("Invalid course completeness {}; must be 0 or 1", n))),
        }
    }

    /// Modifies the entity to record the identity assigned by the database.
    pub(crate) fn with_id(mut self, id: CourseId) -> Self {
        self.id = Some(id);
        self
    }

    /// Records the identity assigned by the database.
    pub(crate) fn set_id(&mut self, id: CourseId) {
        self.id = Some(id);
    }

    /// Gets the course's identity, if already persisted.
    pub fn id(&self) -> Option<CourseId> {
        self.id
    }

    /// Gets the course's title.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the course has been completed.
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

/// A unit of content within a course.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CourseBlock {
    /// Identity of the block, or `None` if the block has not been persisted yet.
    id: Option<CourseBlockId>,

    /// Title of the block.
    name: String,

    /// Course that owns this block.
    course_id: CourseId,
}

impl CourseBlock {
    /// Creates a new block named `name` that belongs to `course_id`.
    pub fn new<N: Into<String>>(name: N, course_id: CourseId) -> Self {
        Self { id: None, name: name.into(), course_id }
    }

    /// Modifies the entity to record the identity assigned by the database.
    pub(crate) fn with_id(mut self, id: CourseBlockId) -> Self {
        self.id = Some(id);
        self
    }

    /// Records the identity assigned by the database.
    pub(crate) fn set_id(&mut self, id: CourseBlockId) {
        self.id = Some(id);
    }

    /// Gets the block's identity, if already persisted.
    pub fn id(&self) -> Option<CourseBlockId> {
        self.id
    }

    /// Gets the block's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the identity of the course that owns this block.
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }
}

/// A notice published within a course block.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Announcement {
    /// Identity of the announcement, or `None` if it has not been persisted yet.
    id: Option<AnnouncementId>,

    /// Title of the announcement.
    name: String,

    /// Free-form body of the announcement.
    info: String,

    /// Block that owns this announcement.
    block_id: CourseBlockId,
}

impl Announcement {
    /// Creates a new announcement with a `name` and free-form `info` for `block_id`.
    pub fn new<N, I>(name: N, info: I, block_id: CourseBlockId) -> Self
    where
        N: Into<String>,
        I: Into<String>,
    {
        Self { id: None, name: name.into(), info: info.into(), block_id }
    }

    /// Modifies the entity to record the identity assigned by the database.
    pub(crate) fn with_id(mut self, id: AnnouncementId) -> Self {
        self.id = Some(id);
        self
    }

    /// Records the identity assigned by the database.
    pub(crate) fn set_id(&mut self, id: AnnouncementId) {
        self.id = Some(id);
    }

    /// Gets the announcement's identity, if already persisted.
    pub fn id(&self) -> Option<AnnouncementId> {
        self.id
    }

    /// Gets the announcement's title.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the announcement's body.
    pub fn info(&self) -> &str {
        &self.info
    }

    /// Gets the identity of the block that owns this announcement.
    pub fn block_id(&self) -> CourseBlockId {
        self.block_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_course_getters() {
        let course = Course::new("Physics 101", false);
        assert!(course.id().is_none());
        assert_eq!("Physics 101", course.name());
        assert!(!course.is_complete());

        let course = course.with_id(CourseId::new(3).unwrap());
        assert_eq!(Some(CourseId::new(3).unwrap()), course.id());
    }

    #[test]
    fn test_course_completeness_from_code() {
        assert!(!Course::completeness_from_code(0).unwrap());
        assert!(Course::completeness_from_code(1).unwrap());
        assert_eq!(
            ModelError("Invalid course completeness 2; must be 0 or 1".to_owned()),
            Course::completeness_from_code(2).unwrap_err()
        );
        assert!(Course::completeness_from_code(-1).is_err());
    }

    #[test]
    fn test_course_block_and_announcement_getters() {
        let course_id = CourseId::new(1).unwrap();
        let mut block = CourseBlock::new("Week 1", course_id);
        assert!(block.id().is_none());
        block.set_id(CourseBlockId::new(5).unwrap());
        assert_eq!(Some(CourseBlockId::new(5).unwrap()), block.id());
        assert_eq!("Week 1", block.name());
        assert_eq!(course_id, block.course_id());

        let announcement =
            Announcement::new("Welcome", "First class on Monday", block.id().unwrap());
        assert!(announcement.id().is_none());
        assert_eq!("Welcome", announcement.name());
        assert_eq!("First class on Monday", announcement.info());
        assert_eq!(CourseBlockId::new(5).unwrap(), announcement.block_id());
    }
}

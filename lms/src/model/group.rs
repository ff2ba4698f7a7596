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

//! The `StudyGroup` data type.

use crate::model::StudyGroupId;
use serde::{Deserialize, Serialize};

/// A group of students that study together.  Membership is kept separately.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct StudyGroup {
    /// Identity of the group, or `None` if the group has not been persisted yet.
    id: Option<StudyGroupId>,

    /// Name of the group.
    name: String,
}

impl StudyGroup {
    /// Creates a new study group without identity.
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self { id: None, name: name.into() }
    }

    /// Modifies the entity to record the identity assigned by the database.
    pub(crate) fn with_id(mut self, id: StudyGroupId) -> Self {
        self.id = Some(id);
        self
    }

    /// Records the identity assigned by the database.
    pub(crate) fn set_id(&mut self, id: StudyGroupId) {
        self.id = Some(id);
    }

    /// Gets the group's identity, if already persisted.
    pub fn id(&self) -> Option<StudyGroupId> {
        self.id
    }

    /// Gets the group's name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

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

//! The `Quiz` data type and its tasks.

use crate::model::{FillingId, OneAnsTaskId, QuizId, TaskId};
use campus_core::model::{ModelError, ModelResult};
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

/// Drops the sub-microsecond part of `ts`, which is the finest precision that every database
/// backend can store.
fn truncate_to_micros(ts: OffsetDateTime) -> OffsetDateTime {
    ts - time::Duration::nanoseconds(i64::from(ts.nanosecond() % 1000))
}

/// Deserializes an optional quiz boundary with the same precision the builders apply.
fn deserialize_boundary<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<OffsetDateTime>::deserialize(deserializer)?.map(truncate_to_micros))
}

/// Representation of a quiz and its attempt policy.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Quiz {
    /// Identity of the quiz, or `None` if the quiz has not been persisted yet.
    id: Option<QuizId>,

    /// Title of the quiz.
    name: String,

    /// Time at which the quiz opens, if bounded.
    #[serde(default, deserialize_with = "deserialize_boundary")]
    start: Option<OffsetDateTime>,

    /// Time at which the quiz closes, if bounded.
    #[serde(default, deserialize_with = "deserialize_boundary")]
    end: Option<OffsetDateTime>,

    /// Whether students may return to previous tasks.
    returnable: bool,

    /// Whether tasks are presented in random order.
    random: bool,

    /// Time limit of an attempt, in minutes.
    time_limit: u32,

    /// Whether results are shown to students after an attempt.
    results_shown: bool,

    /// Number of attempts a student is allowed.
    try_count: u32,

    /// Filling this quiz is based on.
    filling_id: FillingId,
}

impl Quiz {
    /// Creates a new unbounded quiz named `name` based on `filling_id`.
    ///
    /// The quiz allows one attempt without time limit, keeps the order of its tasks, does not let
    /// students return to previous tasks and does not show results.
    pub fn new<N: Into<String>>(name: N, filling_id: FillingId) -> Self {
        Self {
            id: None,
            name: name.into(),
            start: None,
            end: None,
            returnable: false,
            random: false,
            time_limit: 0,
            results_shown: false,
            try_count: 1,
            filling_id,
        }
    }

    /// Modifies a quiz to set or clear the time at which it opens.
    ///
    /// Digits below the microsecond are dropped.
    pub fn with_start(mut self, start: Option<OffsetDateTime>) -> Self {
        self.start = start.map(truncate_to_micros);
        self
    }

    /// Modifies a quiz to set or clear the time at which it closes.
    ///
    /// Digits below the microsecond are dropped.
    pub fn with_end(mut self, end: Option<OffsetDateTime>) -> Self {
        self.end = end.map(truncate_to_micros);
        self
    }

    /// Modifies a quiz to allow or forbid returning to previous tasks.
    pub fn with_returnable(mut self, returnable: bool) -> Self {
        self.returnable = returnable;
        self
    }

    /// Modifies a quiz to shuffle its tasks or not.
    pub fn with_random(mut self, random: bool) -> Self {
        self.random = random;
        self
    }

    /// Modifies a quiz to set its time limit in minutes.
    pub fn with_time_limit(mut self, minutes: u32) -> Self {
        self.time_limit = minutes;
        self
    }

    /// Modifies a quiz to show or hide results after an attempt.
    pub fn with_results_shown(mut self, results_shown: bool) -> Self {
        self.results_shown = results_shown;
        self
    }

    /// Modifies a quiz to set the number of allowed attempts.
    pub fn with_try_count(mut self, try_count: u32) -> Self {
        self.try_count = try_count;
        self
    }

    /// Modifies the entity to record the identity assigned by the database.
    pub(crate) fn with_id(mut self, id: QuizId) -> Self {
        self.id = Some(id);
        self
    }

    /// Records the identity assigned by the database.
    pub(crate) fn set_id(&mut self, id: QuizId) {
        self.id = Some(id);
    }

    /// Gets the quiz's identity, if already persisted.
    pub fn id(&self) -> Option<QuizId> {
        self.id
    }

    /// Gets the quiz's title.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the time at which the quiz opens, if any.
    pub fn start(&self) -> Option<OffsetDateTime> {
        self.start
    }

    /// Gets the time at which the quiz closes, if any.
    pub fn end(&self) -> Option<OffsetDateTime> {
        self.end
    }

    /// Returns true if students may return to previous tasks.
    pub fn is_returnable(&self) -> bool {
        self.returnable
    }

    /// Returns true if tasks are shuffled.
    pub fn is_random(&self) -> bool {
        self.random
    }

    /// Gets the time limit of an attempt in minutes.
    pub fn time_limit(&self) -> u32 {
        self.time_limit
    }

    /// Returns true if results are shown after an attempt.
    pub fn results_shown(&self) -> bool {
        self.results_shown
    }

    /// Gets the number of allowed attempts.
    pub fn try_count(&self) -> u32 {
        self.try_count
    }

    /// Gets the filling this quiz is based on.
    pub fn filling_id(&self) -> FillingId {
        self.filling_id
    }
}

/// Kinds of tasks a quiz can contain.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// A question with a single correct answer.  The payload lives in a `OneAnsTask`.
    OneAnswer,
}

impl TaskKind {
    /// Returns the code that represents this kind in the database.
    pub fn code(self) -> i16 {
        match self {
            TaskKind::OneAnswer => 1,
        }
    }

    /// Parses a task kind from its database `code`.
    pub fn from_code(code: i16) -> ModelResult<Self> {
        match code {
            1 => Ok(TaskKind::OneAnswer),
            n => Err(ModelError(format!("Unknown task kind {}", n))),
        }
    }
}

/// A task within a quiz.  The contents of the task live in a kind-specific payload.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Task {
    /// Identity of the task, or `None` if the task has not been persisted yet.
    id: Option<TaskId>,

    /// Kind of the task, which determines where its payload lives.
    kind: TaskKind,

    /// Quiz that owns this task.
    quiz_id: QuizId,
}

impl Task {
    /// Creates a new task of `kind` for `quiz_id`.
    pub fn new(kind: TaskKind, quiz_id: QuizId) -> Self {
        Self { id: None, kind, quiz_id }
    }

    /// Modifies the entity to record the identity assigned by the database.
    pub(crate) fn with_id(mut self, id: TaskId) -> Self {
        self.id = Some(id);
        self
    }

    /// Records the identity assigned by the database.
    pub(crate) fn set_id(&mut self, id: TaskId) {
        self.id = Some(id);
    }

    /// Gets the task's identity, if already persisted.
    pub fn id(&self) -> Option<TaskId> {
        self.id
    }

    /// Gets the task's kind.
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Gets the identity of the quiz that owns this task.
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }
}

/// Payload of a `TaskKind::OneAnswer` task.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct OneAnsTask {
    /// Identity of the payload, or `None` if it has not been persisted yet.
    id: Option<OneAnsTaskId>,

    /// Task this payload belongs to.
    task_id: TaskId,

    /// Question asked to the student.
    question: String,
}

impl OneAnsTask {
    /// Creates a new payload for `task_id` asking `question`.
    pub fn new<Q: Into<String>>(task_id: TaskId, question: Q) -> Self {
        Self { id: None, task_id, question: question.into() }
    }

    /// Modifies the entity to record the identity assigned by the database.
    pub(crate) fn with_id(mut self, id: OneAnsTaskId) -> Self {
        self.id = Some(id);
        self
    }

    /// Records the identity assigned by the database.
    pub(crate) fn set_id(&mut self, id: OneAnsTaskId) {
        self.id = Some(id);
    }

    /// Gets the payload's identity, if already persisted.
    pub fn id(&self) -> Option<OneAnsTaskId> {
        self.id
    }

    /// Gets the identity of the task this payload belongs to.
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Gets the question text.
    pub fn question(&self) -> &str {
        &self.question
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{Token, assert_tokens};
    use time::macros::datetime;

    #[test]
    fn test_quiz_defaults() {
        let quiz = Quiz::new("Midterm", FillingId::new(1).unwrap());
        assert!(quiz.id().is_none());
        assert_eq!("Midterm", quiz.name());
        assert!(quiz.start().is_none());
        assert!(quiz.end().is_none());
        assert!(!quiz.is_returnable());
        assert!(!quiz.is_random());
        assert_eq!(0, quiz.time_limit());
        assert!(!quiz.results_shown());
        assert_eq!(1, quiz.try_count());
        assert_eq!(FillingId::new(1).unwrap(), quiz.filling_id());
    }

    #[test]
    fn test_quiz_builders() {
        let quiz = Quiz::new("Midterm", FillingId::new(1).unwrap())
            .with_start(Some(datetime!(2023-05-01 09:00:00 UTC)))
            .with_end(Some(datetime!(2023-05-01 11:00:00 UTC)))
            .with_returnable(true)
            .with_random(true)
            .with_time_limit(90)
            .with_results_shown(true)
            .with_try_count(3);
        assert_eq!(Some(datetime!(2023-05-01 09:00:00 UTC)), quiz.start());
        assert_eq!(Some(datetime!(2023-05-01 11:00:00 UTC)), quiz.end());
        assert!(quiz.is_returnable());
        assert!(quiz.is_random());
        assert_eq!(90, quiz.time_limit());
        assert!(quiz.results_shown());
        assert_eq!(3, quiz.try_count());

        let quiz = quiz.with_start(None);
        assert!(quiz.start().is_none());
    }

    #[test]
    fn test_quiz_window_truncated_to_microseconds() {
        let quiz = Quiz::new("Midterm", FillingId::new(1).unwrap())
            .with_start(Some(datetime!(2023-11-14 22:13:20.123456789 UTC)))
            .with_end(Some(datetime!(2023-11-14 23:13:20.000000999 UTC)));
        assert_eq!(Some(datetime!(2023-11-14 22:13:20.123456 UTC)), quiz.start());
        assert_eq!(Some(datetime!(2023-11-14 23:13:20 UTC)), quiz.end());
    }

    #[test]
    fn test_truncate_to_micros_keeps_whole_micros() {
        let ts = datetime!(2023-11-14 22:13:20.123456 UTC);
        assert_eq!(ts, truncate_to_micros(ts));
    }

    #[test]
    fn test_task_kind_codes() {
        assert_eq!(1, TaskKind::OneAnswer.code());
        assert_eq!(TaskKind::OneAnswer, TaskKind::from_code(1).unwrap());
        assert_eq!(
            ModelError("Unknown task kind 0".to_owned()),
            TaskKind::from_code(0).unwrap_err()
        );
    }

    #[test]
    fn test_task_kind_ser_de() {
        assert_tokens(
            &TaskKind::OneAnswer,
            &[Token::UnitVariant { name: "TaskKind", variant: "one_answer" }],
        );
    }

    #[test]
    fn test_task_and_payload_getters() {
        let mut task = Task::new(TaskKind::OneAnswer, QuizId::new(2).unwrap());
        assert!(task.id().is_none());
        task.set_id(TaskId::new(4).unwrap());
        assert_eq!(Some(TaskId::new(4).unwrap()), task.id());
        assert_eq!(TaskKind::OneAnswer, task.kind());
        assert_eq!(QuizId::new(2).unwrap(), task.quiz_id());

        let payload = OneAnsTask::new(TaskId::new(4).unwrap(), "What is 2 + 2?");
        assert!(payload.id().is_none());
        assert_eq!(TaskId::new(4).unwrap(), payload.task_id());
        assert_eq!("What is 2 + 2?", payload.question());
    }
}

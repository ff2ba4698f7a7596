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

//! The `User` data type.

use crate::model::UserId;
use campus_core::model::{EmailAddress, ModelError, ModelResult};
use derivative::Derivative;
use serde::{Deserialize, Serialize};

/// Role a user plays in the courses they participate in.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The user attends courses.
    Student,

    /// The user teaches courses.
    Teacher,

    /// The user has not been given a role yet.
    #[default]
    Unspecified,
}

impl Role {
    /// Returns the representation of the role in the database, where an unspecified role is NULL.
    pub(crate) fn to_db(self) -> Option<&'static str> {
        match self {
            Role::Student => Some("student"),
            Role::Teacher => Some("teacher"),
            Role::Unspecified => None,
        }
    }

    /// Parses a role as stored in the database.
    pub(crate) fn from_db(raw: Option<&str>) -> ModelResult<Self> {
        match raw {
            Some("student") => Ok(Role::Student),
            Some("teacher") => Ok(Role::Teacher),
            None => Ok(Role::Unspecified),
            Some(other) => Err(ModelError(format!("Unknown role '{}'", other))),
        }
    }
}

/// Representation of a user's information.
#[derive(Clone, Derivative, Deserialize, PartialEq, Serialize)]
#[derivative(Debug)]
pub struct User {
    /// Identity of the user, or `None` if the user has not been persisted yet.
    id: Option<UserId>,

    /// Display name of the user.
    name: String,

    /// Email address of the user.  Unique across all users.
    email: EmailAddress,

    /// Credential of the user, stored as given.  Never serialized, so users deserialized from
    /// external input carry an empty password.
    #[derivative(Debug = "ignore")]
    #[serde(default, skip_serializing)]
    password: String,

    /// Role of the user.
    #[serde(default)]
    role: Role,
}

impl User {
    /// Creates a new user without identity and with an unspecified role.
    pub fn new<N, P>(name: N, email: EmailAddress, password: P) -> Self
    where
        N: Into<String>,
        P: Into<String>,
    {
        Self {
            id: None,
            name: name.into(),
            email,
            password: password.into(),
            role: Role::default(),
        }
    }

    /// Modifies a user to set its role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Modifies a user to record the identity assigned by the database.
    pub(crate) fn with_id(mut self, id: UserId) -> Self {
        self.id = Some(id);
        self
    }

    /// Records the identity assigned by the database to this user.
    pub(crate) fn set_id(&mut self, id: UserId) {
        self.id = Some(id);
    }

    /// Gets the user's identity, if already persisted.
    pub fn id(&self) -> Option<UserId> {
        self.id
    }

    /// Gets the user's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the user's email address.
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Gets the user's credential.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Gets the user's role.
    pub fn role(&self) -> Role {
        self.role
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{Token, assert_de_tokens, assert_ser_tokens, assert_tokens};

    #[test]
    fn test_user_getters() {
        let user = User::new("Alice", EmailAddress::from("alice@example.com"), "secret");
        assert!(user.id().is_none());
        assert_eq!("Alice", user.name());
        assert_eq!(&EmailAddress::from("alice@example.com"), user.email());
        assert_eq!("secret", user.password());
        assert_eq!(Role::Unspecified, user.role());

        let user = user.with_role(Role::Teacher).with_id(UserId::new(7).unwrap());
        assert_eq!(Some(UserId::new(7).unwrap()), user.id());
        assert_eq!(Role::Teacher, user.role());
    }

    #[test]
    fn test_user_debug_hides_password() {
        let user = User::new("Alice", EmailAddress::from("alice@example.com"), "secret");
        let debug = format!("{:?}", user);
        assert!(debug.contains("Alice"));
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_role_db_representation() {
        for role in [Role::Student, Role::Teacher, Role::Unspecified] {
            assert_eq!(role, Role::from_db(role.to_db()).unwrap());
        }
        assert_eq!(None, Role::Unspecified.to_db());
        assert_eq!(
            ModelError("Unknown role 'admin'".to_owned()),
            Role::from_db(Some("admin")).unwrap_err()
        );
    }

    #[test]
    fn test_user_ser_de_omits_password() {
        let user = User::new("Alice", EmailAddress::from("alice@example.com"), "secret")
            .with_role(Role::Teacher)
            .with_id(UserId::new(7).unwrap());
        let tokens = [
            Token::Struct { name: "User", len: 4 },
            Token::Str("id"),
            Token::Some,
            Token::I64(7),
            Token::Str("name"),
            Token::Str("Alice"),
            Token::Str("email"),
            Token::Str("alice@example.com"),
            Token::Str("role"),
            Token::UnitVariant { name: "Role", variant: "teacher" },
            Token::StructEnd,
        ];
        assert_ser_tokens(&user, &tokens);

        let mut expected = user.clone();
        expected.password = String::new();
        assert_de_tokens(&expected, &tokens);
    }

    #[test]
    fn test_user_de_defaults() {
        let user = User::new("Bob", EmailAddress::from("bob@example.com"), "");
        assert_de_tokens(
            &user,
            &[
                Token::Struct { name: "User", len: 3 },
                Token::Str("id"),
                Token::None,
                Token::Str("name"),
                Token::Str("Bob"),
                Token::Str("email"),
                Token::Str("bob@example.com"),
                Token::StructEnd,
            ],
        );
    }

    #[test]
    fn test_role_ser_de() {
        assert_tokens(&Role::Student, &[Token::UnitVariant { name: "Role", variant: "student" }]);
        assert_tokens(
            &Role::Unspecified,
            &[Token::UnitVariant { name: "Role", variant: "unspecified" }],
        );
    }
}

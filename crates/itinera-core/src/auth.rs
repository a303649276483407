// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use crate::config::{AppConfig, StaticUser};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    pub uid: String,
    pub name: String,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AuthError {
    #[error("Not signed in")]
    MissingToken,
    #[error("Session token not recognised")]
    InvalidToken,
}

pub trait AuthProvider {
    fn identify(&self, token: &str) -> Result<UserIdentity, AuthError>;
}

/// Fixed token table, read from the `users` section of the config.
#[derive(Debug, Clone, Default)]
pub struct StaticAuth {
    users: HashMap<String, UserIdentity>,
}

impl StaticAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: &str, uid: &str, name: &str) -> Self {
        self.users.insert(
            token.to_string(),
            UserIdentity {
                uid: uid.to_string(),
                name: name.to_string(),
            },
        );
        self
    }

    pub fn from_config(config: &AppConfig) -> Self {
        config
            .users
            .iter()
            .fold(Self::new(), |auth, StaticUser { token, uid, name }| {
                auth.with_user(token, uid, name)
            })
    }
}

impl AuthProvider for StaticAuth {
    fn identify(&self, token: &str) -> Result<UserIdentity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }
        self.users.get(token).cloned().ok_or(AuthError::InvalidToken)
    }
}

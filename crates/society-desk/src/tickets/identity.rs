use std::collections::HashMap;

use super::domain::ActorIdentity;
use crate::config::{ActorGrant, IdentityConfig};

/// Raw credentials presented with a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub bearer_token: Option<String>,
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer_token: Some(token.into()),
        }
    }

    /// Extract a bearer token from an `Authorization` header value.
    pub fn from_authorization(header: Option<&str>) -> Self {
        let bearer_token = header
            .and_then(|value| value.trim().strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string);
        Self { bearer_token }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthenticationError {
    #[error("missing bearer credentials")]
    MissingCredentials,
    #[error("credentials do not resolve to a known actor")]
    UnknownCredentials,
}

/// Boundary to whatever authentication scheme is in use.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, credentials: &Credentials) -> Result<ActorIdentity, AuthenticationError>;
}

/// Static token-to-actor map, typically built from `APP_ACTOR_TOKENS`.
#[derive(Debug, Clone, Default)]
pub struct TokenDirectory {
    actors: HashMap<String, ActorIdentity>,
}

impl TokenDirectory {
    pub fn from_config(config: &IdentityConfig) -> Self {
        config
            .grants
            .iter()
            .fold(Self::default(), |directory, grant| directory.with_grant(grant))
    }

    pub fn with_actor(mut self, token: impl Into<String>, actor: ActorIdentity) -> Self {
        self.actors.insert(token.into(), actor);
        self
    }

    fn with_grant(self, grant: &ActorGrant) -> Self {
        let actor = ActorIdentity {
            id: grant.actor_id.clone(),
            name: grant.name.clone(),
            role: grant.role,
            flat_number: grant.flat_number.clone(),
            designation: grant.designation.clone(),
        };
        self.with_actor(grant.token.clone(), actor)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

impl IdentityResolver for TokenDirectory {
    fn resolve(&self, credentials: &Credentials) -> Result<ActorIdentity, AuthenticationError> {
        let token = credentials
            .bearer_token
            .as_deref()
            .ok_or(AuthenticationError::MissingCredentials)?;
        self.actors
            .get(token)
            .cloned()
            .ok_or(AuthenticationError::UnknownCredentials)
    }
}

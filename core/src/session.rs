//! Login marker for the demo front-end.
//!
//! Two ad-hoc keys: the bare token and the serialized session. There is
//! no credential check; a session exists when both keys agree.

use crate::{
    clock::SharedClock,
    config::StorageKeys,
    error::LumaResult,
    kv::SharedKv,
    types::{EntityId, Timestamp},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub user_id: EntityId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: Timestamp,
}

pub struct SessionManager {
    kv: SharedKv,
    token_key: String,
    session_key: String,
    clock: SharedClock,
}

impl SessionManager {
    pub fn new(kv: SharedKv, keys: &StorageKeys, clock: SharedClock) -> Self {
        Self {
            kv,
            token_key: keys.session_token.clone(),
            session_key: keys.session_user.clone(),
            clock,
        }
    }

    /// Start a session for `email`, replacing any existing one.
    pub fn login(&self, email: &str, name: &str, role: Role) -> LumaResult<Session> {
        let session = Session {
            token: uuid::Uuid::new_v4().to_string(),
            user_id: format!("user_{}", email.split('@').next().unwrap_or(email)),
            email: email.to_string(),
            name: name.to_string(),
            role,
            created_at: self.clock.now(),
        };
        self.kv.set(&self.session_key, &serde_json::to_string(&session)?)?;
        self.kv.set(&self.token_key, &session.token)?;
        log::info!("Session started for {email}");
        Ok(session)
    }

    /// The stored session, if both keys are present and agree.
    pub fn current(&self) -> Option<Session> {
        let token = self.kv.get(&self.token_key).ok().flatten()?;
        let raw = self.kv.get(&self.session_key).ok().flatten()?;
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) if session.token == token => Some(session),
            Ok(_) => {
                log::warn!("Session token mismatch; treating as logged out");
                None
            }
            Err(e) => {
                log::error!("Failed to parse stored session: {e}");
                None
            }
        }
    }

    pub fn logout(&self) -> LumaResult<()> {
        self.kv.remove(&self.token_key)?;
        self.kv.remove(&self.session_key)?;
        Ok(())
    }
}

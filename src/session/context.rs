use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use crate::capture::records::{required_string, scalar_to_string, DecodeError};
use crate::session::{SessionError, SessionStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl User {
    /// Decode the user object returned by `/login` and `/signup`.
    /// `id` may be a number. A missing name falls back to `known_name`, then
    /// to the email's local part.
    pub fn from_value(value: &Value, known_name: Option<&str>) -> Result<Self, DecodeError> {
        let object = value.as_object().ok_or_else(|| DecodeError::UnexpectedShape {
            path: "$".to_string(),
            expected: "a user object",
        })?;
        let object = match object.get("user").and_then(Value::as_object) {
            Some(inner) => inner,
            None => object,
        };

        let id = required_string(object, "id", "$")?;
        let email = required_string(object, "email", "$")?;
        let name = object
            .get("name")
            .map(scalar_to_string)
            .filter(|n| !n.is_empty())
            .or_else(|| known_name.filter(|n| !n.is_empty()).map(str::to_string))
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

        Ok(Self { id, email, name })
    }
}

/// Who is signed in. Created from a login/signup response, cleared on
/// logout, restored from the store on startup.
#[derive(Debug)]
pub struct Session {
    store: Option<SessionStore>,
    user: Option<User>,
}

impl Session {
    /// Read the persisted user. A corrupt or unreadable store yields an
    /// anonymous session rather than an error.
    pub fn restore(store: SessionStore) -> Self {
        let user = match store.load() {
            Ok(user) => user,
            Err(e) => {
                warn!("Ignoring stored session: {}", e);
                None
            }
        };
        Self {
            store: Some(store),
            user,
        }
    }

    /// Session that is never persisted, for demo runs.
    pub fn ephemeral(user: User) -> Self {
        Self {
            store: None,
            user: Some(user),
        }
    }

    pub fn establish(&mut self, user: User) -> Result<&User, SessionError> {
        if let Some(store) = &self.store {
            store.save(&user)?;
        }
        info!("Signed in as {}", user.email);
        Ok(&*self.user.insert(user))
    }

    pub fn end(&mut self) -> Result<(), SessionError> {
        if let Some(user) = self.user.take() {
            info!("Signed out {}", user.email);
        }
        match &self.store {
            Some(store) => store.clear(),
            None => Ok(()),
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn email(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.email.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

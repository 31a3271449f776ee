//! Persisted sign-in session
//!
//! Holds the user record and bearer token under two separate keys.
//! Corrupt user data is treated as "signed out" and discarded.

use crate::error::StorageError;
use crate::storage::KeyValueStore;
use crate::user::User;
use tracing::{debug, warn};

pub const USER_KEY: &str = "pdfsmaller_user";
pub const TOKEN_KEY: &str = "pdfsmaller_token";

#[derive(Debug)]
pub struct SessionStore<S> {
    store: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Read the stored user, dropping the entry if it does not parse
    pub fn load(&self) -> Result<Option<User>, StorageError> {
        let Some(raw) = self.store.get(USER_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_str::<User>(&raw) {
            Ok(user) => {
                debug!(user_id = %user.id, plan = %user.plan, "restored session");
                Ok(Some(user))
            }
            Err(e) => {
                warn!(error = %e, "discarding unreadable session data");
                self.store.remove(USER_KEY)?;
                Ok(None)
            }
        }
    }

    pub fn save(&self, user: &User) -> Result<(), StorageError> {
        let json =
            serde_json::to_string(user).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store.set(USER_KEY, &json)
    }

    /// Remove both the user record and the token
    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(USER_KEY)?;
        self.store.remove(TOKEN_KEY)
    }

    pub fn token(&self) -> Result<Option<String>, StorageError> {
        Ok(self.store.get(TOKEN_KEY)?.filter(|t| !t.is_empty()))
    }

    pub fn save_token(&self, token: Option<&str>) -> Result<(), StorageError> {
        match token {
            Some(token) => self.store.set(TOKEN_KEY, token),
            None => self.store.remove(TOKEN_KEY),
        }
    }

    pub fn backend(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Plan;
    use crate::storage::MemoryStore;

    fn store() -> SessionStore<MemoryStore> {
        SessionStore::new(MemoryStore::new())
    }

    #[test]
    fn test_load_empty_store() {
        assert_eq!(store().load().unwrap(), None);
    }

    #[test]
    fn test_save_then_load() {
        let session = store();
        let user = User::new(2, "Pro User", "pro@example.com", Plan::Pro);
        session.save(&user).unwrap();
        assert_eq!(session.load().unwrap(), Some(user));
    }

    #[test]
    fn test_corrupt_data_is_discarded() {
        let session = store();
        session.backend().set(USER_KEY, "{not json").unwrap();

        assert_eq!(session.load().unwrap(), None);
        assert_eq!(session.backend().get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_clear_removes_user_and_token() {
        let session = store();
        session
            .save(&User::new(1, "Demo User", "demo@example.com", Plan::Free))
            .unwrap();
        session.save_token(Some("abc")).unwrap();

        session.clear().unwrap();
        assert_eq!(session.load().unwrap(), None);
        assert_eq!(session.token().unwrap(), None);
        assert!(session.backend().is_empty());
    }

    #[test]
    fn test_empty_token_reads_as_none() {
        let session = store();
        session.save_token(Some("")).unwrap();
        assert_eq!(session.token().unwrap(), None);
    }
}

use rand::Rng;

use crate::db::Database;
use crate::utils::now_millis;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub const USER_ID_KEY: &str = "rum-user-id";

const SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Stable anonymous user identity, persisted once per storage scope.
#[derive(Clone)]
pub struct IdentityStore {
    db: Database,
}

impl IdentityStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the persisted user id, creating and storing one on first use.
    /// Storage failures degrade to an unpersisted id rather than an error.
    pub async fn get_or_create_user_id(&self) -> String {
        match self.db.get_item(USER_ID_KEY).await {
            Ok(Some(existing)) if !existing.is_empty() => return existing,
            Ok(_) => {}
            Err(err) => {
                log_warn!("reading {USER_ID_KEY} failed, using an ephemeral id: {err:?}");
                return new_user_id();
            }
        }

        let user_id = new_user_id();
        match self.db.set_item(USER_ID_KEY, user_id.clone()).await {
            Ok(()) => log_info!("created user id {user_id}"),
            Err(err) => log_warn!("persisting {USER_ID_KEY} failed: {err:?}"),
        }
        user_id
    }
}

pub fn new_user_id() -> String {
    format!("user_{}", random_suffix())
}

/// `session_<millis>_<suffix>`. Collisions are tolerated, not detected.
pub fn new_session_id() -> String {
    format!("session_{}_{}", now_millis(), random_suffix())
}

fn random_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_base36(value: &str) -> bool {
        value
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase())
    }

    #[tokio::test]
    async fn user_id_is_stable_within_a_storage_scope() {
        let db = Database::open_in_memory().unwrap();
        let store = IdentityStore::new(db.clone());

        let first = store.get_or_create_user_id().await;
        let second = IdentityStore::new(db.clone()).get_or_create_user_id().await;

        assert_eq!(first, second);
        assert_eq!(db.get_item(USER_ID_KEY).await.unwrap(), Some(first.clone()));
        let suffix = first.strip_prefix("user_").unwrap();
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(is_base36(suffix));
    }

    #[tokio::test]
    async fn existing_id_is_never_regenerated() {
        let db = Database::open_in_memory().unwrap();
        db.set_item(USER_ID_KEY, "user_preset".into()).await.unwrap();

        let store = IdentityStore::new(db);
        assert_eq!(store.get_or_create_user_id().await, "user_preset");
    }

    #[test]
    fn session_ids_carry_time_and_differ() {
        let a = new_session_id();
        let b = new_session_id();
        assert_ne!(a, b);

        let parts: Vec<&str> = a.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "session");
        assert!(parts[1].parse::<i64>().unwrap() > 0);
        assert!(is_base36(parts[2]));
    }
}

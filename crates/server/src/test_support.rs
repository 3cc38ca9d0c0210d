use std::{
    path::Path,
    sync::{Mutex, MutexGuard, OnceLock},
};

use db::DBService;
use services::services::config::Config;

use crate::Deployment;

const ENV_KEYS: [&str; 3] = ["DATABASE_URL", "TRACKER_ASSET_DIR", "JWT_SECRET"];

pub fn test_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Points the asset dir and database at a scratch location and clears
/// `JWT_SECRET`, restoring all three on drop.
pub struct TestEnvGuard {
    _lock: MutexGuard<'static, ()>,
    previous: Vec<(&'static str, Option<String>)>,
}

impl TestEnvGuard {
    pub fn new(temp_root: &Path, db_url: String) -> Self {
        let lock = test_lock().lock().unwrap_or_else(|err| err.into_inner());
        let previous = ENV_KEYS
            .iter()
            .map(|key| (*key, std::env::var(key).ok()))
            .collect();

        // SAFETY: tests using TestEnvGuard are serialized by test_lock.
        unsafe {
            std::env::set_var("TRACKER_ASSET_DIR", temp_root);
            std::env::set_var("DATABASE_URL", db_url);
            std::env::remove_var("JWT_SECRET");
        }

        Self {
            _lock: lock,
            previous,
        }
    }
}

impl Drop for TestEnvGuard {
    fn drop(&mut self) {
        // SAFETY: tests using TestEnvGuard are serialized by test_lock.
        unsafe {
            for (key, value) in &self.previous {
                match value {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}

/// Deployment over a fresh in-memory database with a fixed signing secret.
pub async fn in_memory_deployment() -> Deployment {
    let db = DBService::connect("sqlite::memory:").await.unwrap();
    let mut config = Config::default();
    config.auth.jwt_secret = Some("router-test-secret".to_string());
    Deployment::with_parts(config, db)
}

//! Shared fixtures for the workspace integration tests: a real snapshot store
//! in a temp dir, wired to the real credential provider with cheap Argon2 cost
//! and a controllable clock.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chirpy_api::AppState;
use chirpy_auth_jwt::{JwtCredentialProvider, PasswordCost, DEFAULT_ISSUER};
use chirpy_core::traits::{CredentialProvider, MockClock};
use chirpy_db_json::JsonRecordStore;
use chrono::DateTime;
use secrecy::SecretString;
use tempfile::TempDir;

pub const START: i64 = 1_700_000_000;
pub const WEBHOOK_KEY: &str = "f271c81ff7084ee5b99a5091b42d486e";

pub struct Harness {
    pub dir: TempDir,
    pub store: Arc<JsonRecordStore>,
    pub auth: Arc<dyn CredentialProvider>,
    pub state: AppState,
    now: Arc<AtomicI64>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let now = Arc::new(AtomicI64::new(START));

        let mut clock = MockClock::new();
        let ticks = now.clone();
        clock
            .expect_now()
            .returning(move || DateTime::from_timestamp(ticks.load(Ordering::SeqCst), 0).unwrap());

        let auth: Arc<dyn CredentialProvider> = Arc::new(
            JwtCredentialProvider::new(
                &SecretString::from("integration-secret".to_string()),
                DEFAULT_ISSUER,
                PasswordCost { memory_kib: 1024, iterations: 1, parallelism: 1 },
            )
            .unwrap()
            .with_clock(Arc::new(clock)),
        );
        let store = Arc::new(JsonRecordStore::open(dir.path().join("database.json"), auth.clone()).unwrap());

        let state = AppState {
            repo: store.clone(),
            auth: auth.clone(),
            access_token_ttl: Duration::from_secs(3600),
            webhook_api_key: Some(SecretString::from(WEBHOOK_KEY.to_string())),
        };

        Self { dir, store, auth, state, now }
    }

    /// Opens a second store over the same file, as a restarted process would.
    pub fn reopen(&self) -> JsonRecordStore {
        JsonRecordStore::open(self.store.path(), self.auth.clone()).unwrap()
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub fn credentials(email: &str, password: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({ "email": email, "password": password })).unwrap()
}

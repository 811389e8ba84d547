//! # Chirpy Binary
//!
//! Assembles the store and credential plugins from configuration.
//!
//! ```text
//! chirpy [--debug] [seed <email> <password>]
//! ```
//!
//! `--debug` deletes the snapshot file before opening the store.

use std::sync::Arc;

use anyhow::{bail, Context};
use chirpy_api::{handlers, AppState};
use chirpy_auth_jwt::{JwtCredentialProvider, PasswordCost};
use chirpy_configs::{LogFormat, Settings};
use chirpy_core::models::RecordKind;
use chirpy_core::traits::{CredentialProvider, RecordRepo};
use chirpy_db_json::JsonRecordStore;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;
    init_tracing(&settings);

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let debug_mode = take_flag(&mut args, "--debug");

    if debug_mode {
        JsonRecordStore::reset(&settings.database.path).context("failed to reset snapshot")?;
    }

    // 1. Credentials
    let password = &settings.auth.password;
    let auth: Arc<dyn CredentialProvider> = Arc::new(JwtCredentialProvider::new(
        settings.jwt_secret()?,
        &settings.auth.issuer,
        PasswordCost {
            memory_kib: password.memory_kib,
            iterations: password.iterations,
            parallelism: password.parallelism,
        },
    )?);

    // 2. Store
    let repo: Arc<dyn RecordRepo> = Arc::new(JsonRecordStore::open(&settings.database.path, auth.clone())?);
    info!(path = %settings.database.path.display(), debug = debug_mode, "store opened");

    let state = AppState {
        repo,
        auth,
        access_token_ttl: settings.access_token_ttl(),
        webhook_api_key: settings.auth.webhook_api_key.clone(),
    };

    match args.as_slice() {
        [] => {
            let posts = state.repo.list(RecordKind::Post)?.len();
            let accounts = state.repo.list(RecordKind::Account)?.len();
            info!(posts, accounts, "snapshot loaded");
        }
        [cmd, email, password] if cmd == "seed" => {
            let body = serde_json::to_vec(&json!({ "email": email, "password": password }))?;
            let account = handlers::register(&state, &body)?;
            info!(id = account.id, email = %account.email, "account seeded");
        }
        other => bail!("unrecognised arguments: {}", other.join(" ")),
    }

    Ok(())
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log.filter));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match settings.log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    let before = args.len();
    args.retain(|arg| arg != flag);
    args.len() != before
}

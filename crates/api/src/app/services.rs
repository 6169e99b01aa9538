use std::sync::Arc;

use anyhow::Context;

use bookstore_auth::{BcryptHasher, CredentialManager, PasswordHasher, SubjectLookup};
use bookstore_infra::{BookStore, FileStore, InMemoryStore, LocalFileStore, PostgresStore, UserStore};

use crate::config::{AppConfig, ConfigError};

/// Collaborators shared by every handler.
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<dyn UserStore>,
    pub books: Arc<dyn BookStore>,
    pub files: Arc<dyn FileStore>,
    pub credentials: Arc<CredentialManager>,
    pub passwords: Arc<dyn PasswordHasher>,
    pub file_extensions: Vec<String>,
}

/// Wire stores from `config`: Postgres when `DATABASE_URL` is set, in-memory
/// otherwise.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    match &config.database_url {
        Some(url) => {
            let store = PostgresStore::connect(url)
                .await
                .context("failed to connect to DATABASE_URL")?;
            store.migrate().await.context("failed to apply schema")?;
            tracing::info!("using postgres stores");
            Ok(assemble(Arc::new(store), config)?)
        }
        None => {
            tracing::info!("DATABASE_URL not set; using in-memory stores");
            Ok(in_memory_services(config)?)
        }
    }
}

pub fn in_memory_services(config: &AppConfig) -> Result<AppServices, ConfigError> {
    assemble(Arc::new(InMemoryStore::new()), config)
}

fn assemble<S>(store: Arc<S>, config: &AppConfig) -> Result<AppServices, ConfigError>
where
    S: UserStore + BookStore + SubjectLookup + 'static,
{
    let credentials = CredentialManager::new(config.signing_keys()?, config.token_settings(), store.clone());

    Ok(AppServices {
        users: store.clone(),
        books: store,
        files: Arc::new(LocalFileStore::new(config.upload_dir.clone())),
        credentials: Arc::new(credentials),
        passwords: Arc::new(BcryptHasher::new(config.bcrypt_cost)),
        file_extensions: config.file_extensions.clone(),
    })
}

impl AppServices {
    /// Runs on the blocking pool.
    pub async fn hash_password(&self, password: String) -> anyhow::Result<String> {
        let hasher = self.passwords.clone();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .context("password hashing task failed")??;
        Ok(hash)
    }

    pub async fn verify_password(&self, password: String, hash: String) -> anyhow::Result<bool> {
        let hasher = self.passwords.clone();
        let ok = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .context("password verification task failed")??;
        Ok(ok)
    }

    pub fn accepts_extension(&self, ext: &str) -> bool {
        self.file_extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }
}

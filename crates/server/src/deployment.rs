use std::sync::Arc;

use db::{DBService, DbErr};
use secrecy::ExposeSecret;
use services::services::{
    account::AccountService,
    comment::CommentService,
    config::{Config, ConfigError, load_config_from_file, resolve_jwt_secret, save_config_to_file},
    contributor::ContributorService,
    issue::IssueService,
    project::ProjectService,
};
use thiserror::Error;
use tokio::sync::RwLock;
use utils::assets::config_path;
use utils_jwt::JwtKeys;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Everything a request handler needs, cheap to clone into router state.
#[derive(Clone)]
pub struct Deployment {
    config: Arc<RwLock<Config>>,
    db: DBService,
    jwt: Arc<JwtKeys>,
    account: AccountService,
    project: ProjectService,
    contributor: ContributorService,
    issue: IssueService,
    comment: CommentService,
}

impl Deployment {
    /// Loads `config.json` from the asset dir, settles the signing secret and
    /// opens the database.
    pub async fn new() -> Result<Self, DeploymentError> {
        let path = config_path();
        let mut config = load_config_from_file(&path).await;
        let (_, generated) = resolve_jwt_secret(&mut config);
        if generated {
            save_config_to_file(&config, &path).await?;
        }

        let db = DBService::new().await?;
        Ok(Self::with_parts(config, db))
    }

    /// Builds a deployment over an already connected database. The config must
    /// resolve to a signing secret; one is generated in memory otherwise.
    pub fn with_parts(mut config: Config, db: DBService) -> Self {
        let (secret, _) = resolve_jwt_secret(&mut config);
        let jwt = JwtKeys::new(
            secret.expose_secret().as_bytes(),
            config.auth.access_token_ttl(),
            config.auth.refresh_token_ttl(),
        );

        Self {
            config: Arc::new(RwLock::new(config)),
            db,
            jwt: Arc::new(jwt),
            account: AccountService::new(),
            project: ProjectService::new(),
            contributor: ContributorService::new(),
            issue: IssueService::new(),
            comment: CommentService::new(),
        }
    }

    pub fn config(&self) -> &Arc<RwLock<Config>> {
        &self.config
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn jwt(&self) -> &JwtKeys {
        &self.jwt
    }

    pub fn account(&self) -> &AccountService {
        &self.account
    }

    pub fn project(&self) -> &ProjectService {
        &self.project
    }

    pub fn contributor(&self) -> &ContributorService {
        &self.contributor
    }

    pub fn issue(&self) -> &IssueService {
        &self.issue
    }

    pub fn comment(&self) -> &CommentService {
        &self.comment
    }
}

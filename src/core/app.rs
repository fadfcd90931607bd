use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::auth::service::AuthService;
use crate::blocking::service::BlockService;
use crate::board::service::BoardService;
use crate::core::clock::{Clock, SystemClock};
use crate::core::config::Config;
use crate::crypto::service::CryptoService;
use crate::storage::database::Database;

/// Owns one store handle and the services built on top of it. Each `App`
/// is independent, so tests can run several side by side.
pub struct App {
    config: Config,
    db: Arc<Database>,
    auth_service: Arc<AuthService>,
    board_service: Arc<BoardService>,
    block_service: Arc<BlockService>,
}

impl App {
    pub async fn new(config: Config) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock)).await
    }

    pub async fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        info!("Initializing application components");

        // Initialize database
        let db = Arc::new(Database::new(&config.database).await?);

        // Run migrations
        db.migrate().await?;

        let crypto_service = Arc::new(CryptoService::new(&config.security)?);

        // Initialize services
        let auth_service = Arc::new(AuthService::new(
            Arc::clone(&db),
            crypto_service,
            Arc::clone(&clock),
        ));

        let block_service = Arc::new(BlockService::new(
            Arc::clone(&db),
            Arc::clone(&auth_service),
            Arc::clone(&clock),
        ));

        let board_service = Arc::new(BoardService::new(
            Arc::clone(&db),
            Arc::clone(&block_service),
            clock,
        ));

        Ok(Self {
            config,
            db,
            auth_service,
            board_service,
            block_service,
        })
    }

    /// Report the state of a freshly migrated store.
    pub async fn run(&self) -> Result<()> {
        let users = self.auth_service.count_users().await?;
        let threads = self.board_service.count_threads().await?;

        info!(
            database = %self.config.database.url,
            users,
            threads,
            "Forum store ready"
        );

        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn auth(&self) -> &Arc<AuthService> {
        &self.auth_service
    }

    pub fn board(&self) -> &Arc<BoardService> {
        &self.board_service
    }

    pub fn blocking(&self) -> &Arc<BlockService> {
        &self.block_service
    }
}

use std::sync::Arc;

use eventhub_core::{
    categories::{CategoryService, CategoryServiceTrait},
    events::{EventService, EventServiceTrait},
    tickets::{TicketService, TicketServiceTrait},
    wallets::{WalletService, WalletServiceTrait},
};
use eventhub_paychangu::PayChanguClient;
use eventhub_storage_sqlite::{
    db::{self, write_actor},
    CategoryRepository, EventRepository, TicketRepository, WalletRepository,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::{
    auth::{AuthManager, InMemoryRevokedTokens},
    config::Config,
};

pub struct AppState {
    pub event_service: Arc<dyn EventServiceTrait>,
    pub category_service: Arc<dyn CategoryServiceTrait>,
    pub ticket_service: Arc<dyn TicketServiceTrait>,
    pub wallet_service: Arc<dyn WalletServiceTrait>,
    pub auth: Arc<AuthManager>,
}

pub fn init_tracing() {
    let log_format = std::env::var("EH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = write_actor::spawn_writer((*pool).clone());

    // One client serves both the catalog and the checkout gateway
    let paychangu = Arc::new(PayChanguClient::new(config.paychangu.clone())?);

    let category_repository = Arc::new(CategoryRepository::new(pool.clone(), writer.clone()));
    let category_service: Arc<dyn CategoryServiceTrait> = Arc::new(CategoryService::new(
        category_repository,
        paychangu.clone(),
    ));

    let event_repository = Arc::new(EventRepository::new(pool.clone(), writer.clone()));
    let event_service: Arc<dyn EventServiceTrait> = Arc::new(
        EventService::new(event_repository, category_service.clone(), paychangu.clone())
            .with_limits(config.event_limits)
            .with_page_size(config.catalog_page_size),
    );

    let ticket_repository = Arc::new(TicketRepository::new(pool.clone(), writer.clone()));
    let ticket_service: Arc<dyn TicketServiceTrait> =
        Arc::new(TicketService::new(ticket_repository, paychangu.clone()));

    let wallet_repository = Arc::new(WalletRepository::new(pool.clone(), writer.clone()));
    let wallet_service: Arc<dyn WalletServiceTrait> =
        Arc::new(WalletService::new(wallet_repository, paychangu));

    let auth = Arc::new(AuthManager::new(
        &config.jwt_secret,
        config.token_ttl,
        Arc::new(InMemoryRevokedTokens::new()),
    ));

    Ok(Arc::new(AppState {
        event_service,
        category_service,
        ticket_service,
        wallet_service,
        auth,
    }))
}

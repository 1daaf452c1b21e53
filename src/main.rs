use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sqlx::migrate::Migrator;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;

use bursar_core::cli::{self, Cli, Commands, DbCommands, TxCommands};
use bursar_core::clients::{
    HttpBankingDirectory, HttpIdentityVerifier, HttpSettlementOracle, HttpStudentDirectory,
};
use bursar_core::config::Config;
use bursar_core::health::{BankingChecker, HealthChecker, PostgresChecker, StudentsChecker};
use bursar_core::services::{Ledger, TransferEngine};
use bursar_core::{create_app, handlers, AppState};

/// OpenAPI declaration for the documented read surface.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::rules::get_rule,
        handlers::stipends::get_stipend,
        handlers::transfers::get_status,
        handlers::reports::disbursement_summary,
    ),
    components(schemas(
        bursar_core::health::HealthResponse,
        bursar_core::health::DependencyStatus,
    )),
    info(
        title = "Bursar Core API",
        version = "0.1.0",
        description = "Stipend calculation, disbursement and audit API"
    ),
    tags(
        (name = "Rules", description = "Deduction rule management"),
        (name = "Stipends", description = "Stipend ledger"),
        (name = "Transfers", description = "Transfer lifecycle"),
        (name = "Reports", description = "Read-only summaries"),
        (name = "Operations", description = "Health and operations"),
    )
)]
pub struct ApiDoc;

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn build_state(config: &Config, pool: sqlx::PgPool) -> AppState {
    let request_timeout = Duration::from_secs(config.request_timeout_secs);

    let banking = Arc::new(HttpBankingDirectory::new(
        config.banking_endpoint.clone(),
        request_timeout,
    ));
    let students = Arc::new(HttpStudentDirectory::new(
        config.students_endpoint.clone(),
        request_timeout,
    ));
    let identity = Arc::new(HttpIdentityVerifier::new(
        config.identity_endpoint.clone(),
        request_timeout,
    ));
    let oracle = Arc::new(HttpSettlementOracle::new(
        config.settlement_endpoint.clone(),
        request_timeout,
    ));

    let transfer = Arc::new(TransferEngine::new(
        pool.clone(),
        banking.clone(),
        oracle,
        config.source_account.clone(),
        request_timeout,
    ));

    let health = Arc::new(
        HealthChecker::new()
            .add_checker(Box::new(PostgresChecker::new(pool.clone())))
            .add_checker(Box::new(BankingChecker::new(banking)))
            .add_checker(Box::new(StudentsChecker::new(students.clone()))),
    );

    AppState {
        db: pool.clone(),
        ledger: Ledger::new(pool),
        transfer,
        students,
        identity,
        health,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing();

    let config_info = Config::from_env()?;
    let config = config_info.config;

    tracing::info!(
        profile = config_info.profile.as_str(),
        overrides = ?config_info.overrides,
        "configuration resolved"
    );

    match args.command.unwrap_or(Commands::Serve) {
        Commands::Config => {
            println!("profile: {}", config_info.profile.as_str());
            println!("http_port: {}", config.http_port);
            println!("banking_endpoint: {}", config.banking_endpoint);
            println!("students_endpoint: {}", config.students_endpoint);
            println!("identity_endpoint: {}", config.identity_endpoint);
            println!("settlement_endpoint: {}", config.settlement_endpoint);
            println!("source_account: {}", config.source_account);
            println!("request_timeout_secs: {}", config.request_timeout_secs);
            println!("db_max_connections: {}", config.db_max_connections);
            println!("overrides: {:?}", config_info.overrides);
            Ok(())
        }
        Commands::Db(DbCommands::Migrate) => {
            let pool = bursar_core::db::create_pool(&config).await?;
            let migrator = Migrator::new(Path::new("./migrations")).await?;
            migrator.run(&pool).await?;
            tracing::info!("database migrations completed");
            Ok(())
        }
        Commands::Tx(tx_command) => {
            let pool = bursar_core::db::create_pool(&config).await?;
            let state = build_state(&config, pool);
            match tx_command {
                TxCommands::Retry { tx_id } => cli::handle_tx_retry(&state.transfer, tx_id).await,
                TxCommands::Cancel { tx_id, reason } => {
                    cli::handle_tx_cancel(&state.transfer, tx_id, &reason).await
                }
            }
        }
        Commands::Serve => {
            let pool = bursar_core::db::create_pool(&config).await?;

            let migrator = Migrator::new(Path::new("./migrations")).await?;
            migrator.run(&pool).await?;
            tracing::info!("database migrations completed");

            let state = build_state(&config, pool);
            let app = create_app(state, config.cors_allowed_origins.as_deref());

            let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
            tracing::info!("listening on {}", addr);

            axum::Server::bind(&addr)
                .serve(app.into_make_service())
                .await?;
            Ok(())
        }
    }
}

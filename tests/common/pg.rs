//! PostgreSQL fixtures for the store tests.
//!
//! One server is shared by the whole run: `TEST_DATABASE_URL` when set,
//! otherwise a throwaway container. Every test gets its own freshly
//! migrated database on that server.

use anyhow::{Context, Result};
use sqlx::{Connection, Executor, PgConnection};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use volunteer_hub::config::DatabaseConfig;
use volunteer_hub::database::DatabaseManager;

struct SharedServer {
    admin_url: String,
    // Keeps the container alive for the entire test run
    _container: Option<ContainerAsync<Postgres>>,
}

static SHARED: OnceCell<Option<SharedServer>> = OnceCell::const_new();

impl SharedServer {
    async fn init() -> Result<Self> {
        if let Ok(url) = std::env::var("TEST_DATABASE_URL") {
            return Ok(Self {
                admin_url: url,
                _container: None,
            });
        }

        let container = Postgres::default()
            .with_tag("16")
            .start()
            .await
            .context("Failed to start Postgres container")?;
        let host = container.get_host().await?;
        let port = container.get_host_port_ipv4(5432).await?;

        Ok(Self {
            admin_url: format!("postgresql://postgres:postgres@{}:{}/postgres", host, port),
            _container: Some(container),
        })
    }

    async fn get() -> Option<&'static Self> {
        SHARED
            .get_or_init(|| async {
                match Self::init().await {
                    Ok(server) => Some(server),
                    Err(e) => {
                        eprintln!("PostgreSQL unavailable, skipping store tests: {:#}", e);
                        None
                    }
                }
            })
            .await
            .as_ref()
    }
}

/// A migrated database of its own, or `None` when no server can be reached.
pub async fn fresh_database() -> Option<DatabaseManager> {
    let server = SharedServer::get().await?;
    Some(
        create_database(&server.admin_url)
            .await
            .expect("failed to prepare test database"),
    )
}

async fn create_database(admin_url: &str) -> Result<DatabaseManager> {
    let name = format!("volunteer_hub_{}", Uuid::new_v4().simple());

    let mut admin = PgConnection::connect(admin_url)
        .await
        .context("Failed to connect to Postgres")?;
    admin
        .execute(format!("CREATE DATABASE \"{}\"", name).as_str())
        .await
        .context("Failed to create test database")?;
    admin.close().await?;

    let (base, _) = admin_url
        .split('?')
        .next()
        .unwrap_or(admin_url)
        .rsplit_once('/')
        .context("database url has no path")?;

    let db = DatabaseManager::connect(&DatabaseConfig {
        url: Some(format!("{}/{}", base, name)),
        max_connections: 5,
        connection_timeout: 10,
        run_migrations: true,
    })
    .await?;
    db.migrate().await?;
    Ok(db)
}

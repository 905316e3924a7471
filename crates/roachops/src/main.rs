use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roachops::connection::CockroachConnection;
#[cfg(feature = "inmemory")]
use roachops::connection::InMemoryConnection;
use roachops::{ConnectionConfig, Dialect, Operations};
use roachops_core::fixtures;
use roachops_core::operations::Connection;

/// roachops - Create and seed CockroachDB tables
#[derive(Parser, Debug)]
#[command(name = "roachops-seed")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Database host
    #[arg(long, short = 'H', default_value = "localhost", env = "COCKROACH_HOST")]
    host: String,

    /// Database port
    #[arg(long, short, default_value = "26257", env = "COCKROACH_PORT")]
    port: u16,

    /// Database name
    #[arg(long, short, default_value = "fluid_prefsdb", env = "COCKROACH_DATABASE")]
    database: String,

    /// User name
    #[arg(long, short, default_value = "maxroach", env = "COCKROACH_USER")]
    user: String,

    /// Password
    #[arg(long, default_value = "", env = "COCKROACH_PASSWORD", hide_env_values = true)]
    password: String,

    /// SQL dialect
    #[arg(long, default_value = "postgres", env = "COCKROACH_DIALECT")]
    dialect: Dialect,

    /// Maximum pooled connections
    #[arg(long, default_value = "5", env = "COCKROACH_MAX_CONNECTIONS")]
    max_connections: u32,

    /// Seconds to wait for a pooled connection
    #[arg(long, default_value = "30", env = "COCKROACH_ACQUIRE_TIMEOUT_SECONDS")]
    acquire_timeout_seconds: u64,

    /// Use an in-memory database instead of CockroachDB
    #[arg(long)]
    in_memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recreate the seed tables and load their data sets
    Seed,
    /// List the databases visible to the user
    Databases,
}

impl Cli {
    fn config(&self) -> ConnectionConfig {
        ConnectionConfig {
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            dialect: self.dialect,
            max_connections: self.max_connections,
            acquire_timeout_seconds: self.acquire_timeout_seconds,
        }
    }

    /// Builds the connection, also returning the CockroachDB handle so its pool can be closed.
    fn connect(&self) -> Result<(Arc<dyn Connection>, Option<CockroachConnection>)> {
        if self.in_memory {
            #[cfg(feature = "inmemory")]
            return Ok((Arc::new(InMemoryConnection::new(self.database.clone())), None));
            #[cfg(not(feature = "inmemory"))]
            anyhow::bail!("--in-memory requires the 'inmemory' feature");
        }

        let config = self.config();
        tracing::info!(url = %config.redacted_url(), "Using CockroachDB");
        let cockroach = CockroachConnection::new(config);
        Ok((Arc::new(cockroach.clone()), Some(cockroach)))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roachops=debug,roachops_seed=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (connection, cockroach) = cli.connect()?;
    let operations = Operations::new(connection);

    let result = match cli.command {
        Command::Seed => seed(&operations).await,
        Command::Databases => list_databases(&operations).await,
    };

    if let Some(cockroach) = cockroach {
        cockroach.close().await;
    }
    result
}

async fn list_databases(operations: &Operations) -> Result<()> {
    for name in operations.database_names().await? {
        println!("{name}");
    }
    Ok(())
}

/// Creates every seed table, then loads every seed data set.
async fn seed(operations: &Operations) -> Result<()> {
    let created = operations
        .create_tables(fixtures::table_definitions())
        .await;
    for item in created.items() {
        match &item.result {
            Ok(_) => println!("created {}", item.table),
            Err(err) => println!("failed to create {}: {err}", item.table),
        }
    }
    if !created.is_success() {
        anyhow::bail!(
            "{} of {} tables could not be created",
            created.failures().count(),
            created.len()
        );
    }

    let data = fixtures::data_sets()?;
    let loaded = operations.load_tables(&data).await;
    for item in loaded.items() {
        match &item.result {
            Ok(rows) => println!("loaded {} rows into {}", rows.len(), item.table),
            Err(err) => println!("failed to load {}: {err}", item.table),
        }
    }
    if !loaded.is_success() {
        anyhow::bail!(
            "{} of {} data sets could not be loaded",
            loaded.failures().count(),
            loaded.len()
        );
    }

    Ok(())
}

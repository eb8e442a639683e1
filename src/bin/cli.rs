use sqlx::Row;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use portal_gate::authz::{Access, PolicyTable};
use portal_gate::jwt::SessionTokenConfig;
use portal_gate::models::RoleKey;

#[derive(Parser, Debug)]
#[command(author, version, about = "portal-gate operator tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending profile-store migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Issue a session token signed with SESSION_JWT_SECRET
    MintToken {
        #[arg(long)]
        email: String,
        #[arg(long, default_value_t = 1)]
        hours: i64,
    },
    /// Evaluate the policy table for a role and path without a running gateway
    Check {
        #[arg(long)]
        role: String,
        #[arg(long)]
        path: String,
        /// JSON policy file; defaults to POLICY_FILE or the built-in table
        #[arg(long)]
        policy: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            print_status(&pool, &migrator).await?;
        }
        Commands::MintToken { email, hours } => {
            let codec = SessionTokenConfig::from_env()?.with_exp_hours(hours);
            println!("{}", codec.encode(&email)?);
        }
        Commands::Check { role, path, policy } => {
            let policy_path = policy.or_else(|| std::env::var("POLICY_FILE").ok().map(PathBuf::from));
            let table = match policy_path {
                Some(path) => PolicyTable::from_file(&path)?,
                None => PolicyTable::builtin(),
            };

            let key = RoleKey::normalize(&role);
            match table.evaluate(key, &path) {
                Access::Allowed => println!("allow  {key} {path}"),
                Access::Denied { home } => println!("redirect  {key} {path} -> {home}"),
            }
        }
    }

    Ok(())
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to database")
}

async fn print_status(pool: &SqlitePool, migrator: &sqlx::migrate::Migrator) -> anyhow::Result<()> {
    let table = sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
        .fetch_optional(pool)
        .await?;
    let applied_versions: HashSet<i64> = if table.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter() {
        let version = migration.version;
        let status = if applied_versions.contains(&version) { "applied" } else { "pending" };
        let desc = migration.description.as_ref().trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, version, name);
    }

    Ok(())
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    // ./migrations when run from the repo root, the crate folder otherwise
    let local = Path::new("./migrations");
    let migrator_path = if local.exists() {
        local.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    };

    let migrator_path_display = migrator_path.display().to_string();
    sqlx::migrate::Migrator::new(migrator_path)
        .await
        .with_context(|| format!("failed to load migrations from {}", migrator_path_display))
}

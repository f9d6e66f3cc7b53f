use anyhow::{Context, Result};
use clap::Parser;
use std::env;

use crate::services::access;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub storage_dir: String,
    pub storage_bucket: String,
    pub public_base_url: String,
    pub downloads_dir: String,
    pub admin_email: String,
    pub admin_password: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Client gallery backend")]
pub struct Args {
    /// Host to bind to (overrides FOCAL_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides FOCAL_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides FOCAL_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Directory where photo objects are stored (overrides FOCAL_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Storage bucket name (overrides FOCAL_STORAGE_BUCKET)
    #[arg(long)]
    pub storage_bucket: Option<String>,

    /// Base URL under which stored objects are publicly reachable
    /// (overrides FOCAL_PUBLIC_BASE_URL)
    #[arg(long)]
    pub public_base_url: Option<String>,

    /// Directory where archive downloads are saved (overrides FOCAL_DOWNLOADS_DIR)
    #[arg(long)]
    pub downloads_dir: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("FOCAL_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("FOCAL_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing FOCAL_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading FOCAL_PORT"),
        };
        let env_db =
            env::var("FOCAL_DATABASE_URL").unwrap_or_else(|_| "sqlite://./data/focal.db".into());
        let env_storage = env::var("FOCAL_STORAGE_DIR").unwrap_or_else(|_| "./data/objects".into());
        let env_bucket = env::var("FOCAL_STORAGE_BUCKET").unwrap_or_else(|_| "photos".into());
        let env_downloads =
            env::var("FOCAL_DOWNLOADS_DIR").unwrap_or_else(|_| "./data/downloads".into());

        let admin_email =
            env::var("FOCAL_ADMIN_EMAIL").unwrap_or_else(|_| "admin@localhost".into());
        let admin_password = match env::var("FOCAL_ADMIN_PASSWORD") {
            Ok(value) if !value.is_empty() => value,
            _ => {
                let generated = access::generate_secret(16);
                tracing::warn!(
                    "FOCAL_ADMIN_PASSWORD not set; generated admin password: {}",
                    generated
                );
                generated
            }
        };

        // --- Merge ---
        let host = args.host.unwrap_or(env_host);
        let port = args.port.unwrap_or(env_port);
        let env_public_base = env::var("FOCAL_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", host, port));

        let cfg = Self {
            host,
            port,
            database_url: args.database_url.unwrap_or(env_db),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            storage_bucket: args.storage_bucket.unwrap_or(env_bucket),
            public_base_url: args.public_base_url.unwrap_or(env_public_base),
            downloads_dir: args.downloads_dir.unwrap_or(env_downloads),
            admin_email,
            admin_password,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

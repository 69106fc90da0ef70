use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Parser;

/// Placeholder JWT secrets that must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Parser)]
#[command(name = "chirp", about = "Chirp post service")]
pub struct Args {
    /// Delete the database file before starting.
    #[arg(long)]
    pub debug: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub static_dir: PathBuf,
    pub jwt_secret: String,
    pub polka_key: String,
}

impl Config {
    /// Read configuration from the environment (after `.env` is loaded).
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .context("PORT must be a port number")?;

        Ok(Self {
            host: std::env::var("CHIRP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            db_path: std::env::var("CHIRP_DB_PATH")
                .unwrap_or_else(|_| "database.json".into())
                .into(),
            static_dir: std::env::var("CHIRP_STATIC_DIR")
                .unwrap_or_else(|_| ".".into())
                .into(),
            jwt_secret,
            polka_key: std::env::var("POLKA_KEY").unwrap_or_default(),
        })
    }
}

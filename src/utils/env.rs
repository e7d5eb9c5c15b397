use anyhow::{Context, Result};

/// Load a `.env` file from the working directory or its parents, if present.
/// Bridge hosts and credentials are usually provided this way.
pub fn load_env() -> Result<()> {
    match dotenvy::dotenv() {
        Ok(path) => {
            tracing::info!("Loaded environment variables from {}", path.display());
            Ok(())
        }
        Err(e) if e.not_found() => {
            tracing::warn!("No .env file found. Skipped loading environment variables.");
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e)).context("Failed to load .env file"),
    }
}

use std::io::ErrorKind;
use std::path::Path;

use shared::shared_wheel_game::Ledger;

use crate::error::Error;

/// Reads the saved ledgers. A missing file means a first start.
pub async fn load_ledgers(path: &Path) -> Result<Vec<Ledger>, Error> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!("No saved statistics at {}, starting fresh", path.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let ledgers: Vec<Ledger> = serde_json::from_slice(&bytes)?;
    tracing::info!("Loaded statistics of {} chat(s) from {}", ledgers.len(), path.display());
    Ok(ledgers)
}

pub async fn save_ledgers(path: &Path, ledgers: &[Ledger]) -> Result<(), Error> {
    let json = serde_json::to_vec_pretty(ledgers)?;
    tokio::fs::write(path, json).await?;
    tracing::info!("Saved statistics of {} chat(s) to {}", ledgers.len(), path.display());
    Ok(())
}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;

/// One successfully stored photo, as written to the report file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub file_name: String,
    pub size: String,
}

/// Overwrite `path` with the transfer list as indented JSON.
pub fn save_report(path: &Path, results: &[TransferResult]) -> Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    fs::write(path, json)?;
    tracing::info!("Wrote {} entr(ies) to {}", results.len(), path.display());
    Ok(())
}

pub fn load_report(path: &Path) -> Result<Vec<TransferResult>> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

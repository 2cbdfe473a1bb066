//! Work list io: the subset of entries a rerun should visit, referenced by
//! stable index.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub index: usize,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub error: String,
}

pub async fn load_work_list(path: &Path) -> anyhow::Result<Vec<WorkItem>> {
    match tokio::fs::try_exists(path).await? {
        false => Ok(vec![]),
        true => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read work list at {}", path.display()))?;
            serde_json::from_str(&raw).context("Failed to parse work list")
        }
    }
}

pub async fn save_work_list(path: &Path, items: &[WorkItem]) -> anyhow::Result<()> {
    let json = serde_json::to_vec_pretty(items).context("Failed to serialize work list")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write work list at {}", path.display()))?;
    Ok(())
}

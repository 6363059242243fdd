//! Trash command - move a remote node to the trash
//!
//! This is the user-side action the backup recovers from: the next run
//! ignores the trashed node and creates a replacement.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use cloudstash_core::domain::RemoteId;
use cloudstash_core::ports::IRemoteStore;

use super::{open_store, CommandContext};

/// Move a remote node to the trash
#[derive(Debug, Args)]
pub struct TrashCommand {
    /// ID of the node, as printed by `cloudstash tree`
    pub remote_id: String,
}

impl TrashCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let id = RemoteId::new(self.remote_id.clone())
            .with_context(|| format!("Invalid remote ID '{}'", self.remote_id))?;

        let config = ctx.load_config()?;
        let (_pool, store) = open_store(&config).await?;
        let connected = store.connect().await;
        if !connected.success {
            anyhow::bail!(
                "Could not open the remote store: {}",
                connected.failure_detail.unwrap_or_default()
            );
        }

        let node = store
            .trash(&id)
            .await
            .with_context(|| format!("Failed to trash {}", id))?;
        info!(remote_id = %id, title = %node.title(), "Trashed remote node");

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::to_value(&node)?);
        } else {
            formatter.success(&format!("Moved '{}' to the trash", node.title()));
        }
        Ok(())
    }
}

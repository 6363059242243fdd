//! Tree command - print the remote store's contents

use anyhow::{Context, Result};
use clap::Args;

use cloudstash_core::domain::NodeKind;
use cloudstash_core::ports::IRemoteStore;
use cloudstash_store::TreeEntry;

use super::{open_store, CommandContext};

/// Print the remote tree
#[derive(Debug, Args)]
pub struct TreeCommand {
    /// Leave trashed nodes (and everything below them) out
    #[arg(long)]
    pub hide_trashed: bool,
}

impl TreeCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let (_pool, store) = open_store(&config).await?;

        let connected = store.connect().await;
        if !connected.success {
            anyhow::bail!(
                "Could not open the remote store: {}",
                connected.failure_detail.unwrap_or_default()
            );
        }

        let mut entries = store.tree().await.context("Failed to list the remote tree")?;
        if self.hide_trashed {
            entries = without_trashed(entries);
        }

        if ctx.format.is_json() {
            let nodes = entries
                .iter()
                .map(|e| {
                    let mut value = serde_json::to_value(&e.node)?;
                    value["depth"] = serde_json::json!(e.depth);
                    Ok(value)
                })
                .collect::<Result<Vec<_>, serde_json::Error>>()?;
            formatter.print_json(&serde_json::Value::Array(nodes));
        } else if entries.is_empty() {
            formatter.info("The remote store is empty");
        } else {
            for line in render(&entries) {
                println!("{}", line);
            }
        }
        Ok(())
    }
}

/// Drops trashed nodes together with their descendants
fn without_trashed(entries: Vec<TreeEntry>) -> Vec<TreeEntry> {
    let mut hidden_below: Option<usize> = None;
    entries
        .into_iter()
        .filter(|entry| {
            if let Some(depth) = hidden_below {
                if entry.depth > depth {
                    return false;
                }
                hidden_below = None;
            }
            if entry.node.is_trashed() {
                hidden_below = Some(entry.depth);
                return false;
            }
            true
        })
        .collect()
}

fn render(entries: &[TreeEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let node = &entry.node;
            let mut line = format!("{}{}", "  ".repeat(entry.depth), node.title());
            if node.kind() == NodeKind::Folder {
                line.push('/');
            } else {
                line.push_str(&format!(" ({} bytes)", node.size_bytes()));
            }
            line.push_str(&format!("  [{}]", node.id()));
            if node.is_trashed() {
                line.push_str(" (trashed)");
            }
            line
        })
        .collect()
}

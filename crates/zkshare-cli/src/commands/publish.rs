use std::path::Path;

use anyhow::{Context as _, Result};

use zkshare_core::artifact::SharedCircuit;
use zkshare_core::store::StoredVia;

use super::Context;
use crate::output;

/// Publish a circuit source file and list it in the local gallery.
///
/// A provider outage is not an error: the circuit is stored locally under a
/// content identifier of the same format and can be fetched on this machine.
pub async fn run(
    ctx: &Context,
    file: &Path,
    title: Option<String>,
    description: String,
    author: String,
    tags: Vec<String>,
    pin: bool,
) -> Result<()> {
    output::print_header("zkshare publish");

    let code = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let title = title.unwrap_or_else(|| {
        file.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".into())
    });

    let mut circuit = SharedCircuit::new(title, code)
        .with_description(description)
        .with_author(author);
    for tag in tags {
        circuit = circuit.with_tag(tag);
    }

    let (store, gallery) = ctx.content().await?;
    let stored = store.upload(&circuit).await?;
    gallery.add(&circuit.with_id(&stored.id)).await?;

    output::print_key_value("ID", &stored.id);
    output::print_key_value("URL", &stored.url);
    match stored.via {
        StoredVia::Remote => output::print_success(storage_notice(stored.via)),
        StoredVia::Local => output::print_warning(storage_notice(stored.via)),
    }

    if pin && stored.via == StoredVia::Remote {
        if store.pin(&stored.id).await {
            output::print_success("Pinned");
        } else {
            output::print_warning("Pin request failed; content may be garbage-collected");
        }
    }

    Ok(())
}

/// The provider never received locally stored content, so there is nothing
/// to pin later; publishing again is the only way to get it remote.
fn storage_notice(via: StoredVia) -> &'static str {
    match via {
        StoredVia::Remote => "Published to IPFS",
        StoredVia::Local => {
            "Provider unavailable: stored locally only. Re-run `zkshare publish` once it is back."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_fallback_suggests_republishing() {
        let notice = storage_notice(StoredVia::Local);
        assert!(notice.contains("zkshare publish"));
        assert!(!notice.contains("zkshare pin"));
    }
}

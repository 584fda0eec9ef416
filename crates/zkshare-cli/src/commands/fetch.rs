use std::path::Path;

use anyhow::{Context as _, Result};

use zkshare_core::cid::CidHasher;

use super::Context;
use crate::output;

/// Fetch a circuit by id and print (or write) its code.
pub async fn run(ctx: &Context, id: &str, out: Option<&Path>, fresh: bool) -> Result<()> {
    if !CidHasher::looks_like_cid(id) {
        anyhow::bail!("{id} is not a content identifier");
    }
    let (store, gallery) = ctx.content().await?;
    let circuit = if fresh {
        store.download_uncached(id).await?
    } else {
        store.download(id).await?
    };
    gallery.increment_views(id).await?;

    match out {
        Some(path) => {
            std::fs::write(path, &circuit.code)
                .with_context(|| format!("failed to write {}", path.display()))?;
            output::print_header(&circuit.title);
            if !circuit.author.is_empty() {
                output::print_key_value("Author", &circuit.author);
            }
            output::print_success(&format!("Wrote {}", path.display()));
        }
        None => println!("{}", circuit.code),
    }

    Ok(())
}

/// Ask the provider to pin `id`.
pub async fn pin(ctx: &Context, id: &str) -> Result<()> {
    let (store, _) = ctx.content().await?;
    if store.pin(id).await {
        output::print_success(&format!("Pinned {id}"));
        Ok(())
    } else {
        output::print_error(&format!("Could not pin {id}"));
        anyhow::bail!("pin failed")
    }
}

use anyhow::Result;

use zkshare_core::gallery::GalleryOrder;

use super::Context;
use crate::output;

pub async fn list(ctx: &Context, order: GalleryOrder, limit: usize) -> Result<()> {
    let gallery = ctx.gallery().await?;
    let entries = gallery.list(order, limit).await?;
    if entries.is_empty() {
        println!("Gallery is empty. Publish a circuit with `zkshare publish <file>`.");
        return Ok(());
    }
    for entry in &entries {
        output::print_entry(entry);
    }
    Ok(())
}

pub async fn search(ctx: &Context, query: &str) -> Result<()> {
    let gallery = ctx.gallery().await?;
    let entries = gallery.search(query).await?;
    if entries.is_empty() {
        println!("No circuits match \"{query}\".");
    }
    for entry in &entries {
        output::print_entry(entry);
    }
    Ok(())
}

pub async fn like(ctx: &Context, id: &str) -> Result<()> {
    let gallery = ctx.gallery().await?;
    if gallery.increment_likes(id).await? {
        output::print_success("Liked");
    } else {
        output::print_warning(&format!("{id} is not in the gallery"));
    }
    Ok(())
}

pub async fn view(ctx: &Context, id: &str) -> Result<()> {
    let gallery = ctx.gallery().await?;
    if !gallery.increment_views(id).await? {
        anyhow::bail!("{id} is not in the gallery");
    }
    if let Some(entry) = gallery.get(id).await? {
        output::print_entry(&entry);
        println!("\n{}", entry.code);
    }
    Ok(())
}

//! Terminal output formatting for the zkshare CLI.
//!
//! Provides consistent, colored output using the [`console`] crate and a
//! stage progress bar for ledger operations.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use zkshare_core::artifact::GalleryEntry;
use zkshare_core::progress::Progress;

/// Print a bold cyan header with an underline separator.
pub fn print_header(text: &str) {
    println!("\n{}", style(text).bold().cyan());
    println!("{}", style("=".repeat(text.len())).dim());
}

/// Print a success message prefixed with green `[OK]`.
pub fn print_success(text: &str) {
    println!("{} {}", style("[OK]").green().bold(), text);
}

/// Print a warning message prefixed with yellow `[WARN]`.
pub fn print_warning(text: &str) {
    println!("{} {}", style("[WARN]").yellow().bold(), text);
}

/// Print an error message prefixed with red `[ERROR]`.
pub fn print_error(text: &str) {
    println!("{} {}", style("[ERROR]").red().bold(), text);
}

/// Print a key-value pair with dimmed key formatting.
pub fn print_key_value(key: &str, value: &str) {
    println!("  {}: {}", style(key).dim(), value);
}

/// One gallery entry as a two-line listing.
pub fn print_entry(entry: &GalleryEntry) {
    let tags = entry.tags.iter().cloned().collect::<Vec<_>>().join(", ");
    println!(
        "{} {}  {}",
        style(&entry.title).bold(),
        style(format!("({})", entry.created_at.format("%Y-%m-%d"))).dim(),
        style(format!("{} views, {} likes", entry.views, entry.likes)).dim(),
    );
    println!("  {}", style(&entry.id).cyan());
    if !entry.description.is_empty() {
        println!("  {}", entry.description);
    }
    if !tags.is_empty() {
        println!("  {} {}", style("tags:").dim(), tags);
    }
}

/// A 0-100 bar driven by orchestrator progress events.
pub fn stage_bar() -> ProgressBar {
    let bar = ProgressBar::new(100);
    let template = ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(template);
    bar
}

/// Callback that moves `bar` to each reported stage.
pub fn on_progress(bar: &ProgressBar) -> impl FnMut(Progress) + Send + '_ {
    move |p: Progress| {
        bar.set_position(u64::from(p.percent));
        bar.set_message(p.label);
    }
}

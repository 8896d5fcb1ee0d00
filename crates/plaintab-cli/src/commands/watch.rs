//! Watch command handler

use anyhow::{Context, Result};
use tracing::info;

use plaintab_core::{ChromeBookmarksFile, NewTab};

use crate::output::Output;

/// Print the bookmarks bar now and every time it is republished, until Ctrl-C
pub async fn run(tab: &NewTab, host: &ChromeBookmarksFile, output: &Output) -> Result<()> {
    let file_watch = host
        .watch_file()
        .with_context(|| format!("Failed to watch {}", host.path().display()))?;
    let mut bookmarks = tab.publisher().subscribe_bookmarks();

    output.message(&format!(
        "Watching {} (Ctrl-C to stop)\n",
        host.path().display()
    ));
    output.print_bookmarks(&tab.display_bookmarks());

    let result = loop {
        tokio::select! {
            changed = bookmarks.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                println!();
                output.print_bookmarks(&tab.display_bookmarks());
            }
            signal = tokio::signal::ctrl_c() => {
                break signal.context("Failed to listen for Ctrl-C");
            }
        }
    };

    drop(file_watch);
    info!("Stopped watching {:?}", host.path());
    result
}

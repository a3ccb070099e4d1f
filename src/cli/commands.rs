use std::io::Write;
use std::path::Path;

use chrono::Local;

use crate::app::{FolioError, Result, ViewerContext};
use crate::domain::CacheEntrySummary;

pub async fn load_document(ctx: &ViewerContext, url: &str, out: Option<&Path>) -> Result<()> {
    let bytes = ctx.cache.load_bytes(url).await?;

    match out {
        Some(path) => {
            std::fs::write(path, &bytes)?;
            println!("Wrote {} bytes to {}", bytes.len(), path.display());
        }
        None => println!("Loaded {} bytes from {}", bytes.len(), url),
    }

    // Let a cache-hit revalidation finish before the process exits.
    ctx.cache.wait_idle().await;
    Ok(())
}

pub async fn list_entries(ctx: &ViewerContext, json: bool) -> Result<()> {
    let entries = ctx.cache.entries().await?;

    if json {
        let out = serde_json::to_string_pretty(&entries)
            .map_err(|e| FolioError::Other(e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }

    if entries.is_empty() {
        println!("Cache is empty");
        return Ok(());
    }

    let mut stdout = std::io::stdout().lock();
    for entry in &entries {
        writeln!(stdout, "{}", format_entry(entry))?;
    }

    let total: u64 = entries.iter().map(|e| e.size_bytes).sum();
    let limits = ctx.cache.limits();
    writeln!(
        stdout,
        "{} of {} documents, {} of {}",
        entries.len(),
        limits.max_entries,
        human_size(total),
        human_size(limits.max_bytes)
    )?;
    Ok(())
}

pub async fn remove_entry(ctx: &ViewerContext, url: &str) -> Result<()> {
    ctx.cache.remove(url).await?;
    println!("Removed {}", url);
    Ok(())
}

pub async fn clear_cache(ctx: &ViewerContext) -> Result<()> {
    let removed = ctx.cache.clear().await?;
    println!("Removed {} cached documents", removed);
    Ok(())
}

pub async fn trim_cache(ctx: &ViewerContext) -> Result<()> {
    let evicted = ctx.cache.trim().await?;
    if evicted.is_empty() {
        println!("Cache is within limits");
    }
    for url in evicted {
        println!("Evicted {}", url);
    }
    Ok(())
}

fn format_entry(entry: &CacheEntrySummary) -> String {
    let read = entry
        .last_accessed_at
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M");
    let tag = entry.etag.as_deref().unwrap_or("-");
    format!(
        "{}  {:>9}  {}\n  etag {}",
        read,
        human_size(entry.size_bytes),
        entry.url,
        tag
    )
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(1023), "1023 B");
        assert_eq!(human_size(1536), "1.5 KiB");
        assert_eq!(human_size(300 * 1024 * 1024), "300.0 MiB");
    }
}

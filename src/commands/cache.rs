//! `papercut cache status | clear`

use anyhow::{Context as _, Result};
use std::io::Write;

use super::Context;

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Print cache location and per-namespace file counts
pub fn cache_status<W: Write>(ctx: &Context, mut out: W) -> Result<()> {
    let stats = ctx.cache.stats();
    writeln!(out, "Cache directory: {}", stats.cache_dir.display())?;
    for (namespace, files) in &stats.namespaces {
        writeln!(out, "  {:<8} {} files", namespace, files)?;
    }
    writeln!(
        out,
        "Total: {} files, {}",
        stats.total_files,
        format_size(stats.total_bytes)
    )?;
    Ok(())
}

/// Delete every cached response
pub fn cache_clear<W: Write>(ctx: &Context, mut out: W) -> Result<()> {
    ctx.cache
        .clear()
        .with_context(|| format!("Failed to clear cache at {}", ctx.cache.cache_dir().display()))?;
    writeln!(out, "Cache cleared: {}", ctx.cache.cache_dir().display())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::utils::CacheKey;

    fn context(dir: &std::path::Path) -> Context {
        let mut config = Config::default();
        config.cache.directory = dir.to_path_buf();
        Context::new(config).unwrap()
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_status_then_clear() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        ctx.cache.put(&CacheKey::doi_record("10.1/a"), b"{}").unwrap();

        let mut out = Vec::new();
        cache_status(&ctx, &mut out).unwrap();
        let status = String::from_utf8(out).unwrap();
        assert!(status.contains("dois     1 files"));
        assert!(status.contains("Total: 1 files, 2 B"));

        let mut out = Vec::new();
        cache_clear(&ctx, &mut out).unwrap();
        assert_eq!(ctx.cache.stats().total_files, 0);
    }
}

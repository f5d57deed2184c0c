//! Page text sources for the `scan` command.
//!
//! A scan target is a single file, a directory walked with the `[scan]`
//! include/exclude globs, or `-` for stdin. Each yields one [`Page`]: the
//! raw text plus the [`Source`] the agent attaches to its batch.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::io::Read;
use std::path::Path;
use walkdir::WalkDir;

use mcp_memory_core::models::Source;

use crate::config::ScanConfig;

/// Text to scan and where it came from.
#[derive(Debug, Clone)]
pub struct Page {
    pub source: Source,
    pub text: String,
}

/// Overrides applied to every page's source.
#[derive(Debug, Clone, Default)]
pub struct SourceOverrides {
    pub url: Option<String>,
    pub title: Option<String>,
}

fn user_agent() -> String {
    format!("mcpm/{}", env!("CARGO_PKG_VERSION"))
}

/// Resolve `target` into pages.
pub fn collect_pages(scan: &ScanConfig, target: &str, overrides: &SourceOverrides) -> Result<Vec<Page>> {
    if target == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read page text from stdin")?;
        let source = make_source(overrides, "stdin".to_string(), "stdin".to_string());
        return Ok(vec![Page { source, text }]);
    }

    let path = Path::new(target);
    if !path.exists() {
        bail!("Scan target does not exist: {}", path.display());
    }
    if path.is_file() {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        return Ok(vec![file_page(path, text, overrides)]);
    }

    let include_set = build_globset(&scan.include_globs)?;
    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(scan.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut pages = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let file = entry.path();
        let relative = file.strip_prefix(path).unwrap_or(file);
        let rel_str = relative.to_string_lossy().to_string();
        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }

        match std::fs::read_to_string(file) {
            Ok(text) => pages.push(file_page(file, text, overrides)),
            Err(e) => tracing::warn!(path = %file.display(), error = %e, "skipping unreadable file"),
        }
    }

    Ok(pages)
}

fn file_page(path: &Path, text: String, overrides: &SourceOverrides) -> Page {
    let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let title = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let source = make_source(overrides, format!("file://{}", absolute.display()), title);
    Page { source, text }
}

fn make_source(overrides: &SourceOverrides, url: String, title: String) -> Source {
    Source::new(
        overrides.url.clone().unwrap_or(url),
        overrides.title.clone().unwrap_or(title),
    )
    .with_user_agent(user_agent())
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

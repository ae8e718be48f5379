//! Read-only view over the agent workspace's markdown memory files.
//!
//! Looks at `<root>/MEMORY.md` and `<root>/memory/*.md`. Nothing here writes.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryDoc {
    /// Absolute path, stable per file.
    pub id: String,
    pub title: String,
    /// Path relative to the workspace root.
    pub file_path: String,
    pub updated_at_ms: i64,
    pub content: String,
}

/// Workspace root: explicit config, then the settings value, then
/// `~/.openclaw/workspace`.
pub fn resolve_workspace_root(configured: Option<&str>, from_settings: &str) -> PathBuf {
    if let Some(dir) = configured.map(str::trim).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    if !from_settings.trim().is_empty() {
        return PathBuf::from(from_settings.trim());
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".openclaw").join("workspace")
}

/// List memory docs newest first, optionally filtered by a case-insensitive
/// substring over title and content. Missing or unreadable files are skipped.
pub fn list_memory_docs(root: &Path, query: Option<&str>) -> Vec<MemoryDoc> {
    let mut files = Vec::new();

    let top = root.join("MEMORY.md");
    if top.is_file() {
        files.push(top);
    }

    match std::fs::read_dir(root.join("memory")) {
        Ok(entries) => {
            for entry in entries.flatten() {
                let path = entry.path();
                let is_md = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("md"));
                if is_md && path.is_file() {
                    files.push(path);
                }
            }
        }
        Err(e) => debug!(root = %root.display(), "no memory dir: {e}"),
    }

    let mut docs: Vec<MemoryDoc> = files
        .into_iter()
        .filter_map(|path| read_doc(root, &path))
        .collect();
    docs.sort_by(|a, b| b.updated_at_ms.cmp(&a.updated_at_ms));

    match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => {
            let needle = q.to_lowercase();
            docs.into_iter()
                .filter(|d| {
                    format!("{}\n{}", d.title, d.content)
                        .to_lowercase()
                        .contains(&needle)
                })
                .collect()
        }
        None => docs,
    }
}

fn read_doc(root: &Path, path: &Path) -> Option<MemoryDoc> {
    let content = std::fs::read_to_string(path).ok()?;
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let file_name = path.file_name()?.to_string_lossy().into_owned();
    Some(MemoryDoc {
        id: path.to_string_lossy().into_owned(),
        title: display_title(&file_name),
        file_path: path
            .strip_prefix(root)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned(),
        updated_at_ms: DateTime::<Utc>::from(modified).timestamp_millis(),
        content,
    })
}

fn display_title(file_name: &str) -> String {
    if file_name.eq_ignore_ascii_case("memory.md") {
        return "Long-term Memory".to_string();
    }
    match file_name.strip_suffix(".md") {
        Some(day) if is_iso_date(day) => format!("Daily Memory · {day}"),
        _ => file_name.to_string(),
    }
}

/// A real calendar day written as zero-padded `YYYY-MM-DD`.
fn is_iso_date(s: &str) -> bool {
    s.len() == 10 && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn titles() {
        assert_eq!(display_title("MEMORY.md"), "Long-term Memory");
        assert_eq!(display_title("2026-03-04.md"), "Daily Memory · 2026-03-04");
        assert_eq!(display_title("notes.md"), "notes.md");
        assert_eq!(display_title("2026-3-4.md"), "2026-3-4.md");
        assert_eq!(display_title("2026-13-40.md"), "2026-13-40.md");
        assert_eq!(display_title("2026-02-30.md"), "2026-02-30.md");
    }

    #[test]
    fn lists_top_level_and_daily_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("MEMORY.md"), "Operator prefers mornings").unwrap();
        fs::create_dir(dir.path().join("memory")).unwrap();
        fs::write(dir.path().join("memory/2026-01-02.md"), "Deployed v2").unwrap();
        fs::write(dir.path().join("memory/scratch.txt"), "ignored").unwrap();

        let docs = list_memory_docs(dir.path(), None);
        assert_eq!(docs.len(), 2);
        let mut titles: Vec<_> = docs.iter().map(|d| d.title.as_str()).collect();
        titles.sort();
        assert_eq!(titles, vec!["Daily Memory · 2026-01-02", "Long-term Memory"]);
        assert!(docs.iter().any(|d| d.file_path == "memory/2026-01-02.md"));
    }

    #[test]
    fn query_is_case_insensitive_over_title_and_content() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("MEMORY.md"), "Operator prefers MORNINGS").unwrap();
        fs::create_dir(dir.path().join("memory")).unwrap();
        fs::write(dir.path().join("memory/2026-01-02.md"), "Deployed v2").unwrap();

        let hits = list_memory_docs(dir.path(), Some("mornings"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Long-term Memory");

        let by_title = list_memory_docs(dir.path(), Some("daily memory"));
        assert_eq!(by_title.len(), 1);

        assert_eq!(list_memory_docs(dir.path(), Some("   ")).len(), 2);
    }

    #[test]
    fn missing_workspace_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_memory_docs(&dir.path().join("nope"), Some("x")).is_empty());
    }

    #[test]
    fn workspace_root_precedence() {
        assert_eq!(
            resolve_workspace_root(Some("/cfg"), "/settings"),
            PathBuf::from("/cfg")
        );
        assert_eq!(
            resolve_workspace_root(Some("  "), " /settings "),
            PathBuf::from("/settings")
        );
        assert!(resolve_workspace_root(None, "")
            .ends_with(Path::new(".openclaw").join("workspace")));
    }
}

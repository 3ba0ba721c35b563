//! Documents folder scanner.
//!
//! Lists `*.pdf` and `*.txt` files directly inside the documents folder.
//! Subdirectories are not descended into and extensions match regardless
//! of case. A missing folder is created and scans as empty.

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const DOCUMENT_GLOBS: &[&str] = &["*.pdf", "*.txt"];

/// Paths of all indexable documents in `folder`, sorted by path.
pub fn scan_documents_folder(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.exists() {
        std::fs::create_dir_all(folder).with_context(|| {
            format!("Failed to create documents folder: {}", folder.display())
        })?;
        tracing::info!(folder = %folder.display(), "created documents folder");
        return Ok(Vec::new());
    }

    let matcher = build_globset(DOCUMENT_GLOBS)?;
    let mut files = Vec::new();

    for entry in WalkDir::new(folder).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if matcher.is_match(entry.file_name()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(GlobBuilder::new(pattern).case_insensitive(true).build()?);
    }
    Ok(builder.build()?)
}

/// File name component used as the document's identity in the store.
pub fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_folder_is_created_and_empty() {
        let tmp = TempDir::new().unwrap();
        let folder = tmp.path().join("documents");
        let files = scan_documents_folder(&folder).unwrap();
        assert!(files.is_empty());
        assert!(folder.is_dir());
    }

    #[test]
    fn test_lists_only_top_level_pdf_and_txt() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::write(root.join("b.txt"), "b").unwrap();
        std::fs::write(root.join("a.PDF"), "a").unwrap();
        std::fs::write(root.join("notes.md"), "x").unwrap();
        std::fs::create_dir(root.join("nested")).unwrap();
        std::fs::write(root.join("nested/deep.txt"), "d").unwrap();

        let names: Vec<String> = scan_documents_folder(root)
            .unwrap()
            .iter()
            .map(|p| document_name(p))
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.txt"]);
    }

    #[test]
    fn test_directory_named_like_a_document_is_ignored() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("folder.txt")).unwrap();
        assert!(scan_documents_folder(tmp.path()).unwrap().is_empty());
    }
}

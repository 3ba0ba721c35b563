//! Index status overview.
//!
//! Lists every document in the folder with its state against the store,
//! plus the total chunk count. Used by `docqa status`.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::fingerprint::{classify, fingerprint, processed_files};
use crate::models::FileStatus;
use crate::progress::format_number;
use crate::scan::{document_name, scan_documents_folder};
use crate::store::VectorStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// Indexed and unchanged since.
    Indexed,
    /// Indexed, but the file changed on disk.
    Stale,
    /// Not indexed yet.
    Pending,
}

impl DocumentState {
    fn label(self) -> &'static str {
        match self {
            DocumentState::Indexed => "indexed",
            DocumentState::Stale => "changed",
            DocumentState::Pending => "not indexed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentStatus {
    pub filename: String,
    pub state: DocumentState,
}

#[derive(Debug, Clone)]
pub struct StatusReport {
    pub folder: PathBuf,
    pub documents: Vec<DocumentStatus>,
    /// Sources in the store with no matching file in the folder.
    pub orphaned: Vec<String>,
    pub chunk_count: usize,
}

pub async fn collect_status(store: &dyn VectorStore, folder: &Path) -> Result<StatusReport> {
    let files = scan_documents_folder(folder)?;
    let mut documents = Vec::with_capacity(files.len());

    for path in &files {
        let filename = document_name(path);
        let state = match classify(store, &filename, &fingerprint(path)).await? {
            FileStatus::Unchanged => DocumentState::Indexed,
            FileStatus::Updated => DocumentState::Stale,
            FileStatus::New => DocumentState::Pending,
        };
        documents.push(DocumentStatus { filename, state });
    }

    let orphaned = processed_files(store)
        .await?
        .into_iter()
        .filter(|s| !documents.iter().any(|d| &d.filename == s))
        .collect();

    Ok(StatusReport {
        folder: folder.to_path_buf(),
        documents,
        orphaned,
        chunk_count: store.count().await?,
    })
}

/// Print `report` to stdout.
pub fn print_status(report: &StatusReport, db_path: &Path) {
    let db_size = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    println!("docqa status");
    println!("============");
    println!();
    println!("  Documents:   {}", report.folder.display());
    println!("  Database:    {} ({})", db_path.display(), format_bytes(db_size));
    println!(
        "  Chunks:      {}",
        format_number(report.chunk_count as u64)
    );

    if report.documents.is_empty() {
        println!();
        println!("  No documents found.");
    } else {
        println!();
        println!("  {:<40} {}", "FILE", "STATE");
        println!("  {}", "-".repeat(56));
        for doc in &report.documents {
            println!("  {:<40} {}", doc.filename, doc.state.label());
        }
    }

    if !report.orphaned.is_empty() {
        println!();
        println!("  Indexed but missing from folder:");
        for source in &report.orphaned {
            println!("    {}", source);
        }
    }
    println!();
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{chunk_record_id, ChunkMetadata, ChunkRecord};
    use crate::store::InMemoryVectorStore;
    use tempfile::TempDir;

    async fn index(store: &InMemoryVectorStore, filename: &str, hash: String) {
        store
            .add(vec![ChunkRecord {
                id: chunk_record_id(filename, 0),
                embedding: vec![1.0],
                text: "t".into(),
                metadata: ChunkMetadata {
                    source: filename.into(),
                    chunk_id: 0,
                    file_hash: hash,
                },
            }])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_marks_indexed_stale_pending_and_orphaned() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::write(root.join("a.txt"), "a").unwrap();
        std::fs::write(root.join("b.txt"), "b").unwrap();
        std::fs::write(root.join("c.txt"), "c").unwrap();

        let store = InMemoryVectorStore::default();
        index(&store, "a.txt", fingerprint(&root.join("a.txt"))).await;
        index(&store, "b.txt", "old-hash".into()).await;
        index(&store, "gone.txt", "x".into()).await;

        let report = collect_status(&store, root).await.unwrap();
        let states: Vec<(&str, DocumentState)> = report
            .documents
            .iter()
            .map(|d| (d.filename.as_str(), d.state))
            .collect();
        assert_eq!(
            states,
            vec![
                ("a.txt", DocumentState::Indexed),
                ("b.txt", DocumentState::Stale),
                ("c.txt", DocumentState::Pending),
            ]
        );
        assert_eq!(report.orphaned, vec!["gone.txt"]);
        assert_eq!(report.chunk_count, 3);
    }

    #[test]
    fn test_bytes_are_humanised() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}

//! Flat-file export of stored records.
//!
//! Reads persisted rows and writes them out for human consumption: CSV with
//! a UTF-8 BOM so spreadsheet tools pick up the Chinese columns, or JSONL
//! one record per line.

use crate::models::ExportRecord;
use crate::store::Store;
use clap::ValueEnum;
use std::error::Error;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Jsonl,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Jsonl => "jsonl",
        }
    }
}

/// Write all stored records (optionally restricted to one listing URL) to
/// `out_path`. Returns the number of records written.
pub async fn export(
    store: &Store,
    format: ExportFormat,
    out_path: &str,
    search_url: Option<&str>,
) -> Result<usize, Box<dyn Error>> {
    let rows = store.export_rows(search_url).await?;

    if let Some(parent) = Path::new(out_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    match format {
        ExportFormat::Csv => write_csv(&rows, out_path)?,
        ExportFormat::Jsonl => write_jsonl(&rows, out_path)?,
    }

    info!(count = rows.len(), path = out_path, ?format, "export written");
    Ok(rows.len())
}

fn write_csv(rows: &[ExportRecord], out_path: &str) -> Result<(), Box<dyn Error>> {
    let mut file = File::create(out_path)?;
    // BOM first, so Excel detects UTF-8.
    file.write_all(b"\xEF\xBB\xBF")?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_jsonl(rows: &[ExportRecord], out_path: &str) -> Result<(), Box<dyn Error>> {
    let mut out = BufWriter::new(File::create(out_path)?);
    for row in rows {
        serde_json::to_writer(&mut out, row)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, ArticleStatus};
    use crate::utils::now_iso;

    async fn seeded_store() -> Store {
        let store = Store::in_memory().await.unwrap();
        store
            .upsert(&Article {
                article_url: "https://example.org/articles/1".to_string(),
                search_url: Some("https://example.org/search".to_string()),
                title: Some("Title, with comma".to_string()),
                journal: Some("Nature".to_string()),
                published_date: Some("2025-01-01".to_string()),
                abstract_en: Some("An abstract.".to_string()),
                abstract_zh: Some("一段摘要。".to_string()),
                abstract_en_hash: None,
                status: ArticleStatus::Translated,
                crawled_at: Some(now_iso()),
                translated_at: Some(now_iso()),
            })
            .await
            .unwrap();
        store
    }

    fn temp_path(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("paper_harvest_{}_{name}", std::process::id()))
            .to_string_lossy()
            .into_owned()
    }

    #[tokio::test]
    async fn test_jsonl_round_trip() {
        let store = seeded_store().await;
        let path = temp_path("export.jsonl");

        let count = export(&store, ExportFormat::Jsonl, &path, None)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let content = std::fs::read_to_string(&path).unwrap();
        let record: ExportRecord = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(record.article_url, "https://example.org/articles/1");
        assert_eq!(record.abstract_zh.as_deref(), Some("一段摘要。"));
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_csv_has_bom_header_and_quoting() {
        let store = seeded_store().await;
        let path = temp_path("export.csv");

        export(&store, ExportFormat::Csv, &path, None).await.unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..3], b"\xEF\xBB\xBF");
        let content = String::from_utf8(bytes[3..].to_vec()).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "article_url,title,journal,published_date,abstract_en,abstract_zh"
        );
        assert!(lines.next().unwrap().contains("\"Title, with comma\""));
        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_export_filtered_by_search_url_is_empty_for_unknown() {
        let store = seeded_store().await;
        let path = temp_path("filtered.jsonl");

        let count = export(
            &store,
            ExportFormat::Jsonl,
            &path,
            Some("https://nowhere.example/search"),
        )
        .await
        .unwrap();
        assert_eq!(count, 0);
        std::fs::remove_file(&path).ok();
    }
}

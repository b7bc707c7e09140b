// System status display: DB stats, configured backend, model availability.

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

use crate::classifier::models;
use crate::config::Config;
use crate::db::Database;

/// Display system status to the terminal.
pub async fn show(config: &Config) -> Result<()> {
    println!("Backend: {}", config.backend.to_string().bold());
    show_models(config);

    if !Path::new(&config.db_path).exists() {
        println!("Database: not initialized");
        println!("\nRun `topical init` to set up the database.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&config.db_path)
        .map(|m| format_bytes(m.len()))
        .unwrap_or_else(|_| "unknown".to_string());
    println!("Database: {} ({})", config.db_path, file_size);

    let db: Arc<dyn Database> = crate::db::open_shared(&config.db_path)?;
    show_counts(db.as_ref()).await
}

fn show_models(config: &Config) {
    let topic_dir = models::topic_model_dir(&config.model_dir);
    let embed_dir =
        models::embedding_model_dir(&config.model_dir, config.sentence_transformers_home.as_deref());

    let present = |ok: bool| {
        if ok {
            "present".green()
        } else {
            "missing".dimmed()
        }
    };
    println!(
        "Topic model: {} ({})",
        present(models::topic_files_present(&topic_dir)),
        topic_dir.display()
    );
    println!(
        "Embedding model: {} ({})",
        present(models::embedding_files_present(&embed_dir)),
        embed_dir.display()
    );
}

async fn show_counts(db: &dyn Database) -> Result<()> {
    let counts = db.counts().await?;
    let publishers = db.list_publishers().await?;

    if publishers.is_empty() {
        println!("Publishers: none");
        println!("  Run `topical add-publisher <slug> <name>` to add one");
    } else {
        let slugs: Vec<&str> = publishers.iter().map(|p| p.slug.as_str()).collect();
        println!("Publishers: {} ({})", counts.publishers, slugs.join(", "));
    }

    println!(
        "Analyzed URLs: {} total, {} with keywords, {} with embeddings",
        counts.analyzed_urls, counts.with_keywords, counts.with_embeddings
    );
    if counts.never_analyzed > 0 {
        println!(
            "  {} URLs have visits but were never analyzed. Run `topical reanalyze`.",
            counts.never_analyzed
        );
    }

    Ok(())
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

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}

//! Siga o Dinheiro seeding CLI
//!
//! Imports an article set through the article service. Titles that already
//! exist are skipped, so the command can be re-run safely.

use anyhow::{bail, Context};
use clap::Parser;
use siga_common::{
    articles::{ArticleFilter, ArticleService, ArticleStore, MemoryArticleStore, NewArticle},
    config::{AppConfig, StoreBackend},
    db::{DbPool, Repository},
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Articles published with the first release of the site
const BUNDLED_ARTICLES: &str = include_str!("../seed/articles.json");

#[derive(Parser)]
#[command(name = "siga-seed", version, about = "Import articles into the store")]
struct Cli {
    /// JSON array of articles to import instead of the bundled set
    #[arg(long)]
    file: Option<PathBuf>,

    /// Configuration file to load instead of the config/ lookup
    #[arg(long)]
    config: Option<String>,

    /// Validate every article without writing anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Report {
    imported: usize,
    skipped: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => AppConfig::from_file(path),
        None => AppConfig::load(),
    }
    .context("failed to load configuration")?;

    let articles = read_articles(cli.file.as_deref())?;
    let catalog = Arc::new(config.catalog()?);

    let store: Arc<dyn ArticleStore> = match config.store.backend {
        StoreBackend::Postgres => {
            let db = DbPool::new(&config.database)
                .await
                .context("failed to connect to the article store")?;
            if config.database.run_migrations {
                db.migrate().await?;
            }
            Arc::new(Repository::new(db))
        }
        StoreBackend::Memory => {
            warn!("store.backend is memory, imported articles vanish on exit");
            Arc::new(MemoryArticleStore::new())
        }
    };

    let service = ArticleService::new(store, catalog);
    let report = seed(&service, articles, cli.dry_run).await?;

    info!(
        imported = report.imported,
        skipped = report.skipped,
        dry_run = cli.dry_run,
        "Import finished"
    );
    Ok(())
}

fn read_articles(file: Option<&Path>) -> anyhow::Result<Vec<NewArticle>> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => BUNDLED_ARTICLES.to_string(),
    };

    serde_json::from_str(&raw).context("seed file must be a JSON array of articles")
}

async fn seed(
    service: &ArticleService,
    articles: Vec<NewArticle>,
    dry_run: bool,
) -> anyhow::Result<Report> {
    let mut titles: HashSet<String> = service
        .list(&ArticleFilter::All)
        .await?
        .into_iter()
        .map(|article| article.title)
        .collect();

    let mut report = Report::default();

    for input in articles {
        let title = input.title.trim().to_string();

        if titles.contains(&title) {
            warn!(%title, "Already exists, skipping");
            report.skipped += 1;
            continue;
        }

        if dry_run {
            if let Err(violations) = input.into_draft(service.catalog()) {
                let reasons: Vec<String> = violations.iter().map(ToString::to_string).collect();
                bail!("'{}' is invalid: {}", title, reasons.join("; "));
            }
            info!(%title, "Valid");
        } else {
            let article = service
                .create(input)
                .await
                .with_context(|| format!("failed to import '{}'", title))?;
            info!(article_id = %article.id, %title, "Imported");
        }

        titles.insert(title);
        report.imported += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use siga_common::articles::CategoryCatalog;

    fn service() -> ArticleService {
        ArticleService::new(
            Arc::new(MemoryArticleStore::new()),
            Arc::new(CategoryCatalog::default()),
        )
    }

    #[test]
    fn test_bundled_articles_parse() {
        let articles = read_articles(None).unwrap();
        assert_eq!(articles.len(), 7);
        assert!(articles.iter().all(|a| a.date.is_some()));
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let service = service();

        let first = seed(&service, read_articles(None).unwrap(), false)
            .await
            .unwrap();
        assert_eq!(
            first,
            Report {
                imported: 7,
                skipped: 0
            }
        );

        let second = seed(&service, read_articles(None).unwrap(), false)
            .await
            .unwrap();
        assert_eq!(
            second,
            Report {
                imported: 0,
                skipped: 7
            }
        );
        assert_eq!(service.count().await.unwrap(), 7);

        let listed = service.list(&ArticleFilter::All).await.unwrap();
        assert_eq!(listed[0].theme_id, "ww2");
        assert_eq!(listed[1].theme_id, "brics");
        assert!(listed[0].date > listed[1].date);
        assert_eq!(listed[6].date.date_naive().to_string(), "2024-12-22");
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let service = service();
        let report = seed(&service, read_articles(None).unwrap(), true)
            .await
            .unwrap();
        assert_eq!(report.imported, 7);
        assert_eq!(service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalid_article_stops_the_import() {
        let service = service();
        let articles = vec![NewArticle {
            title: "Sem categoria".into(),
            summary: "Resumo".into(),
            content: "Texto".into(),
            category: "Illuminati".into(),
            theme_id: "illuminati".into(),
            read_time: "5 min".into(),
            date: None,
        }];

        assert!(seed(&service, articles.clone(), true).await.is_err());
        assert!(seed(&service, articles, false).await.is_err());
        assert_eq!(service.count().await.unwrap(), 0);
    }
}

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::{catalog_for, filter_by_category};
use crate::config::Config;
use crate::error::PipelineError;
use crate::models::{CareCategory, UploadableImage};
use crate::pipeline::{AnalysisPipeline, AnalysisSession, SessionOutcome, Stage, StageObserver};
use crate::presentation::{render_text, ResultsView};
use crate::processing::validation;

#[derive(Parser, Debug)]
#[command(name = "care-label-service")]
#[command(about = "Care-label symbol recognition service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the GraphQL server (default)
    Serve,
    /// Analyze a local care-label photo and print the detected symbols
    Analyze {
        path: PathBuf,
        /// MIME type; guessed from the extension when omitted
        #[arg(long)]
        mime: Option<String>,
        /// Extra attempts after a failed analysis
        #[arg(long, default_value_t = 0)]
        retries: u32,
    },
    /// List reference symbols
    Symbols {
        /// washing, drying, ironing, bleach or dry-cleaning
        #[arg(long)]
        category: Option<String>,
    },
}

pub fn parse_category(raw: &str) -> Option<CareCategory> {
    let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
    CareCategory::BROWSE_ORDER.into_iter().find(|c| c.slug() == normalized)
}

fn guess_mime(path: &Path) -> Option<&'static str> {
    path.extension().and_then(|e| e.to_str()).and_then(validation::mime_for_extension)
}

fn print_stage(stage: &Stage) {
    match stage {
        Stage::Error(e) => eprintln!("✗ {}", e.user_message()),
        Stage::Selecting => {}
        other => eprintln!("[{:>3}%] {}", other.progress(), other.message()),
    }
}

/// Resolves on Ctrl-C. Never resolves where signals can't be registered.
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Runs the session, retrying failed attempts up to `retries` times. Validation failures are
/// final. Every attempt races `interrupt`; when it fires the session is cancelled.
pub async fn run_with_retries<I, F>(
    session: &AnalysisSession,
    observer: &dyn StageObserver,
    retries: u32,
    mut interrupt: I,
) -> SessionOutcome
where
    I: FnMut() -> F,
    F: Future<Output = ()>,
{
    let mut attempt = 0;
    loop {
        let is_retry = attempt > 0;
        let outcome = tokio::select! {
            biased;
            outcome = async move {
                if is_retry { session.retry(observer).await } else { session.run(observer).await }
            } => outcome,
            _ = interrupt() => {
                session.cancel();
                return SessionOutcome::Abandoned;
            }
        };
        match outcome {
            SessionOutcome::Failed(ref e) if attempt < retries && !matches!(e, PipelineError::Validation(_)) => {
                attempt += 1;
                tracing::warn!(attempt, retries, code = e.code(), "Analysis attempt failed; retrying");
            }
            other => return other,
        }
    }
}

pub async fn run_analyze(config: Arc<Config>, path: &Path, mime: Option<String>, retries: u32) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let mime_type = match mime.or_else(|| guess_mime(path).map(str::to_string)) {
        Some(m) => m,
        None => bail!("cannot infer image type of {}; pass --mime", path.display()),
    };
    let mut image = UploadableImage::new(bytes, mime_type);
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        image = image.with_file_name(name);
    }

    let session = AnalysisSession::new(Arc::new(AnalysisPipeline::from_config(config)), image);
    let outcome = run_with_retries(&session, &print_stage, retries, ctrl_c).await;

    match outcome {
        SessionOutcome::Completed(payload) => {
            print!("{}", render_text(&ResultsView::from_handoff(Some(payload))));
            Ok(())
        }
        SessionOutcome::Failed(e) => bail!("{} ({})", e.user_message(), e.code()),
        SessionOutcome::Abandoned => {
            eprintln!("Analysis cancelled");
            Ok(())
        }
    }
}

pub async fn run_symbols(config: Arc<Config>, category: Option<String>) -> Result<()> {
    let selected = match category.as_deref() {
        Some(raw) => match parse_category(raw) {
            Some(c) => vec![c],
            None => bail!("unknown category '{}'", raw),
        },
        None => CareCategory::BROWSE_ORDER.to_vec(),
    };
    let entries = catalog_for(config)
        .list_symbols()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e.user_message()))?;

    for category in selected {
        let symbols = filter_by_category(&entries, category);
        println!("{}", category.label());
        if symbols.is_empty() {
            println!("  (no symbols)");
        }
        for s in symbols {
            println!("  {}: {}", s.title, s.short_description);
        }
    }
    Ok(())
}

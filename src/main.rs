//! rfpreview command line
//!
//! ```text
//! rfpreview classify snippet.html
//! rfpreview compose snippet.html --iframe --out preview.html
//! rfpreview evaluate snippet.html --config preview.json
//! rfpreview batch items/*.html --jobs 8
//! ```

use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info, warn};
use serde::Serialize;

use rfpreview::sandbox::iframe_view;
use rfpreview::{
    classify, compose_snippet, Backend, PreviewConfig, Previewer, RenderDecision, Snippet,
};

/// Compose catalog snippets into sandboxed previews and run the quality gate
#[derive(Parser, Debug)]
#[command(name = "rfpreview")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file with preview configuration (missing fields use defaults)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print how a snippet is classified
    Classify { file: PathBuf },

    /// Print the composed document
    Compose {
        file: PathBuf,

        /// Write to a file instead of stdout
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,

        /// Emit the sandboxed iframe view instead of the bare document
        #[arg(long)]
        iframe: bool,
    },

    /// Run the quality gate on one snippet
    Evaluate {
        file: PathBuf,

        #[arg(long, value_enum, default_value = "static")]
        engine: Engine,
    },

    /// Evaluate many snippets concurrently, one JSON line each
    Batch {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Worker threads (default: number of CPUs)
        #[arg(long)]
        jobs: Option<usize>,

        #[arg(long, value_enum, default_value = "static")]
        engine: Engine,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Engine {
    Static,
    Cdp,
}

impl Engine {
    fn backend(self) -> anyhow::Result<Backend> {
        match self {
            Engine::Static => Ok(Backend::Static),
            #[cfg(feature = "cdp")]
            Engine::Cdp => Ok(Backend::Cdp),
            #[cfg(not(feature = "cdp"))]
            Engine::Cdp => anyhow::bail!("this build has no CDP support; rebuild with --features cdp"),
        }
    }
}

#[derive(Serialize, Debug)]
struct Report<'a> {
    file: &'a Path,
    accepted: bool,
    measured_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> Report<'a> {
    fn decided(file: &'a Path, decision: RenderDecision, digest: String) -> Self {
        Self {
            file,
            accepted: decision.accepted,
            measured_height: decision.measured_height,
            digest: Some(digest),
            error: None,
        }
    }

    fn failed(file: &'a Path, error: &anyhow::Error) -> Self {
        Self {
            file,
            accepted: false,
            measured_height: None,
            digest: None,
            error: Some(format!("{:#}", error)),
        }
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PreviewConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => PreviewConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn read_snippet(path: &Path) -> anyhow::Result<Snippet> {
    let code = std::fs::read_to_string(path)
        .with_context(|| format!("reading snippet {}", path.display()))?;
    Ok(Snippet::new(code))
}

/// Queue one file on `worker`. A file that cannot be read is reported as
/// rejected instead of stopping the batch.
fn queue_file<'a>(
    worker: &Previewer,
    file: &'a Path,
    config: &PreviewConfig,
) -> impl Future<Output = Report<'a>> {
    let queued = read_snippet(file).map(|snippet| {
        let document = compose_snippet(&snippet, config);
        let digest = document.digest();
        (digest, worker.evaluate(document))
    });
    async move {
        match queued {
            Ok((digest, handle)) => {
                let decision = handle.settled().await.unwrap_or_else(RenderDecision::reject);
                Report::decided(file, decision, digest)
            }
            Err(e) => {
                warn!("skipping {}: {:#}", file.display(), e);
                Report::failed(file, &e)
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Classify { file } => {
            let snippet = read_snippet(&file)?;
            let result = classify(&snippet.decoded());
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Command::Compose { file, out, iframe } => {
            let snippet = read_snippet(&file)?;
            let document = compose_snippet(&snippet, &config);
            let text = if iframe {
                iframe_view(&document, &config.sandbox, config.fixed_height)
            } else {
                document.into_string()
            };
            match out {
                Some(path) => std::fs::write(&path, text)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{}", text),
            }
        }

        Command::Evaluate { file, engine } => {
            let snippet = read_snippet(&file)?;
            let document = compose_snippet(&snippet, &config);
            let digest = document.digest();
            let previewer = Previewer::with_backend(config, engine.backend()?).await?;
            let decision = previewer
                .evaluate(document)
                .settled()
                .await
                .context("preview worker stopped before deciding")?;
            println!("{}", serde_json::to_string(&Report::decided(&file, decision, digest))?);
            previewer.close().await?;
        }

        Command::Batch {
            files,
            jobs,
            engine,
        } => {
            let jobs = jobs.unwrap_or_else(num_cpus::get).clamp(1, files.len().max(1));
            let backend = engine.backend()?;
            info!("evaluating {} snippets on {} workers", files.len(), jobs);

            let mut workers = Vec::with_capacity(jobs);
            for _ in 0..jobs {
                workers.push(Previewer::with_backend(config.clone(), backend).await?);
            }

            let pending: Vec<_> = files
                .iter()
                .enumerate()
                .map(|(i, file)| {
                    debug!("queueing {} on worker {}", file.display(), i % jobs);
                    queue_file(&workers[i % jobs], file, &config)
                })
                .collect();
            let reports = futures::future::join_all(pending).await;

            let mut closed = Ok(());
            for worker in workers {
                if let Err(e) = worker.close().await {
                    warn!("closing worker: {}", e);
                    closed = Err(e);
                }
            }
            for report in &reports {
                println!("{}", serde_json::to_string(report)?);
            }
            closed?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreadable_batch_file_is_reported_not_fatal() {
        let config = PreviewConfig::default();
        let worker = Previewer::with_backend(config.clone(), Backend::Static).await.unwrap();
        let missing = Path::new("does/not/exist.html");
        let report = queue_file(&worker, missing, &config).await;
        assert!(!report.accepted);
        assert!(report.digest.is_none());
        assert!(report.error.as_deref().unwrap().contains("does/not/exist.html"));

        // the worker is still usable afterwards
        let dir = std::env::temp_dir().join(format!("rfpreview-batch-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("ok.html");
        std::fs::write(&file, r#"<button class="btn">Buy</button>"#).unwrap();
        let report = queue_file(&worker, &file, &config).await;
        assert!(report.error.is_none());
        assert_eq!(report.digest.as_ref().map(String::len), Some(64));
        worker.close().await.unwrap();
        let _ = std::fs::remove_dir_all(&dir);
    }
}

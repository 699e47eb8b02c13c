//! Falqueue CLI - Command-line interface for the fal.ai queue

mod logging;
mod output;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use falqueue_core::domain::{Headers, JobRequest, QueuePriority};
use falqueue_core::port::MemoryKeyCache;
use falqueue_sdk::{ClientConfig, FalClient, DEFAULT_QUEUE_URL, DEFAULT_RUN_URL};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "falqueue")]
#[command(about = "Submit and track jobs on the fal.ai queue", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// API key
    #[arg(long, env = "FAL_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Queue API base URL
    #[arg(long, env = "FAL_QUEUE_URL", default_value = DEFAULT_QUEUE_URL, global = true)]
    queue_url: String,

    /// Direct-run API base URL
    #[arg(long, env = "FAL_RUN_URL", default_value = DEFAULT_RUN_URL, global = true)]
    run_url: String,

    /// Request timeout in seconds
    #[arg(long, env = "FAL_TIMEOUT_SECS", default_value = "60", global = true)]
    timeout_secs: u64,

    /// Upper bound on a status stream in seconds
    #[arg(long, env = "FAL_STREAM_TIMEOUT_SECS", default_value = "300", global = true)]
    stream_timeout_secs: u64,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a job to the queue
    Submit {
        #[command(flatten)]
        job: JobArgs,

        /// Webhook notified when the job finishes
        #[arg(long, env = "FAL_WEBHOOK_URL")]
        webhook: Option<String>,

        /// Queue priority (normal, low)
        #[arg(long)]
        priority: Option<QueuePriority>,

        /// Routing hint
        #[arg(long)]
        hint: Option<String>,

        /// Submit and follow the job's event stream
        #[arg(long)]
        stream: bool,
    },

    /// Show a job's status
    Status {
        identifier: String,
        request_id: String,

        /// Include log lines
        #[arg(long)]
        logs: bool,
    },

    /// Fetch a finished job's result
    Result {
        identifier: String,
        request_id: String,
    },

    /// Cancel a queued job
    Cancel {
        identifier: String,
        request_id: String,
    },

    /// Follow a job's status stream until it completes
    Stream {
        identifier: String,
        request_id: String,

        /// Include log lines
        #[arg(long)]
        logs: bool,
    },

    /// Run a job synchronously, bypassing the queue
    Run {
        #[command(flatten)]
        job: JobArgs,
    },

    /// Verify a webhook delivery's signature
    VerifyWebhook {
        /// File holding the raw request body
        #[arg(long)]
        body_file: PathBuf,

        /// Value of the x-fal-signature header
        #[arg(long)]
        signature: String,

        /// Value of the x-fal-timestamp header
        #[arg(long)]
        timestamp: String,
    },
}

#[derive(Args)]
struct JobArgs {
    /// Model or workflow identifier (e.g. fal-ai/fast-sdxl)
    identifier: String,

    /// Input as a JSON object
    #[arg(long, conflicts_with = "input_file")]
    input: Option<String>,

    /// File holding the input JSON object
    #[arg(long)]
    input_file: Option<PathBuf>,
}

impl JobArgs {
    fn input(&self) -> Result<Map<String, Value>> {
        let raw = match (&self.input, &self.input_file) {
            (Some(raw), _) => raw.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read input file {}", path.display()))?,
            (None, None) => return Ok(Map::new()),
        };
        parse_input(&raw)
    }
}

fn parse_input(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(raw).context("Invalid JSON input")? {
        Value::Object(map) => Ok(map),
        other => bail!("Input must be a JSON object, got: {}", other),
    }
}

impl Cli {
    fn client(&self) -> Result<FalClient> {
        let api_key = self
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .context("No API key: pass --api-key or set FAL_KEY")?;
        let config = ClientConfig::new(api_key)
            .with_queue_url(self.queue_url.clone())
            .with_run_url(self.run_url.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_stream_timeout(Duration::from_secs(self.stream_timeout_secs));
        FalClient::new(config).context("Failed to create client")
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match &cli.command {
        Commands::Submit {
            job,
            webhook,
            priority,
            hint,
            stream,
        } => {
            let client = cli.client()?;
            let mut request = JobRequest::new(job.identifier.clone(), job.input()?);
            if let Some(url) = webhook {
                request = request.with_webhook(url.clone());
            }
            if let Some(priority) = priority {
                request = request.with_priority(*priority);
            }
            if let Some(hint) = hint {
                request = request.with_hint(hint.clone());
            }

            if *stream {
                for update in client.queue().submit_streaming(&request)? {
                    let update = update.context("Stream failed")?;
                    output::print_summary(&update);
                    output::print_outcome(&update)?;
                }
            } else {
                let outcome = client.queue().submit(&request)?;
                output::print_summary(&outcome);
                output::print_outcome(&outcome)?;
            }
        }

        Commands::Status {
            identifier,
            request_id,
            logs,
        } => {
            let outcome = cli.client()?.queue().status(identifier, request_id, *logs)?;
            output::print_summary(&outcome);
            output::print_logs(&outcome);
            output::print_outcome(&outcome)?;
        }

        Commands::Result {
            identifier,
            request_id,
        } => {
            let outcome = cli.client()?.queue().result(identifier, request_id)?;
            output::print_summary(&outcome);
            output::print_outcome(&outcome)?;
        }

        Commands::Cancel {
            identifier,
            request_id,
        } => {
            let outcome = cli.client()?.queue().cancel(identifier, request_id)?;
            output::print_summary(&outcome);
            output::print_outcome(&outcome)?;
        }

        Commands::Stream {
            identifier,
            request_id,
            logs,
        } => {
            let client = cli.client()?;
            let mut stream = client.queue().stream_status(identifier, request_id, *logs)?;
            for update in stream.by_ref() {
                let update = update.context("Stream failed")?;
                output::print_summary(&update);
                output::print_logs(&update);
                output::print_outcome(&update)?;
            }
            if stream.used_fallback() {
                info!("Event stream unavailable; showed a single status check instead");
            }
        }

        Commands::Run { job } => {
            let client = cli.client()?;
            let request = JobRequest::new(job.identifier.clone(), job.input()?);
            let outcome = client.run(&request)?;
            output::print_summary(&outcome);
            output::print_outcome(&outcome)?;
        }

        Commands::VerifyWebhook {
            body_file,
            signature,
            timestamp,
        } => {
            let body = std::fs::read(body_file)
                .with_context(|| format!("Failed to read body file {}", body_file.display()))?;
            let headers = Headers::new()
                .with("x-fal-signature", signature.clone())
                .with("x-fal-timestamp", timestamp.clone());

            let verifier = falqueue_sdk::webhook_verifier(
                Duration::from_secs(cli.timeout_secs),
                Arc::new(MemoryKeyCache::new()),
            )
            .context("Failed to create webhook verifier")?;

            if verifier.verify(&body, &headers)? {
                println!("{}", "✓ Signature valid".green().bold());
            } else {
                bail!("Signature invalid");
            }
        }
    }

    Ok(())
}

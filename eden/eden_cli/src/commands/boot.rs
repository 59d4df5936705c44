//! Booting a host

use anyhow::{anyhow, Result};
use clap::{Args, ValueEnum};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::warn;

use eden_lifecycle::StageReport;
use eden_permission::{ChannelPrompter, Decision, PromptRequest, StaticPrompter};
use eden_runtime::system::{BootError, RuntimeConfig};
use eden_runtime::Runtime;

use super::init_tracing;
use crate::builtin;

/// Who answers permission prompts during boot
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PromptMode {
    /// Nobody; prompts stay unresolved
    Off,
    /// Grant every prompt
    Allow,
    /// Deny every prompt
    Deny,
    /// Ask on the terminal
    Ask,
}

/// Arguments for the boot command
#[derive(Args)]
pub struct BootArgs {
    /// Path to the configuration file
    #[clap(long)]
    pub config: String,

    /// How permission prompts are answered
    #[clap(long, value_enum, default_value = "off")]
    pub prompt: PromptMode,

    /// Grant every prompt (same as `--prompt allow`)
    #[clap(long, conflicts_with_all = ["prompt", "deny_all"])]
    pub allow_all: bool,

    /// Deny every prompt (same as `--prompt deny`)
    #[clap(long, conflicts_with = "prompt")]
    pub deny_all: bool,

    /// Print stage reports as JSON
    #[clap(long)]
    pub json: bool,
}

impl BootArgs {
    /// Prompt mode after applying the shorthand flags
    pub fn prompt_mode(&self) -> PromptMode {
        if self.allow_all {
            PromptMode::Allow
        } else if self.deny_all {
            PromptMode::Deny
        } else {
            self.prompt
        }
    }
}

/// Boot the configured host and print one report per stage
pub async fn execute(args: BootArgs) -> Result<()> {
    let config = RuntimeConfig::load(Some(&args.config)).await?;
    init_tracing(&config.logging);

    let mut builder = Runtime::builder(config).loader(Arc::new(builtin::catalogue()));
    match args.prompt_mode() {
        PromptMode::Off => {}
        PromptMode::Allow => builder = builder.prompter(Arc::new(StaticPrompter::allow_all())),
        PromptMode::Deny => builder = builder.prompter(Arc::new(StaticPrompter::deny_all())),
        PromptMode::Ask => {
            let (prompter, requests) = ChannelPrompter::new(8);
            tokio::spawn(answer_on_terminal(requests));
            builder = builder.prompter(Arc::new(prompter));
        }
    }

    let runtime = builder.build().await?;
    runtime.register_configured_hooks()?;

    let outcome = runtime.boot().await;
    let reports: Vec<&StageReport> = match &outcome {
        Ok(reports) => reports.iter().collect(),
        Err(e) => e.reports(),
    };

    if args.json {
        let decisions: Vec<Value> = runtime
            .permissions
            .snapshot()
            .into_iter()
            .map(|(descriptor, state)| json!({ "descriptor": descriptor, "state": state }))
            .collect();
        let output = json!({
            "stages": reports.iter().map(|r| report_json(r)).collect::<Vec<_>>(),
            "state": runtime.lifecycle.state(),
            "decisions": decisions,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for report in &reports {
            print_report(report);
        }
    }

    match outcome {
        Ok(_) => Ok(()),
        Err(BootError::GatingFailed { report, .. }) => Err(anyhow!(
            "boot halted at gating stage {} ({} of {} hooks failed)",
            report.stage,
            report.failure_count(),
            report.outcomes.len()
        )),
        Err(e) => Err(e.into()),
    }
}

fn print_report(report: &StageReport) {
    println!(
        "{:<22} {} hook(s), {} failed, {} ms",
        report.stage,
        report.outcomes.len(),
        report.failure_count(),
        report.elapsed.as_millis()
    );
    for outcome in &report.outcomes {
        match &outcome.error {
            Some(error) => println!("  {} {}: {}", outcome.status, outcome.source, error),
            None => println!("  {} {}", outcome.status, outcome.source),
        }
    }
}

fn report_json(report: &StageReport) -> Value {
    json!({
        "stage": report.stage,
        "elapsed_ms": report.elapsed.as_millis() as u64,
        "hooks": report.outcomes.iter().map(|o| json!({
            "source": o.source,
            "status": o.status.to_string(),
            "error": o.error.as_ref().map(|e| e.to_string()),
        })).collect::<Vec<_>>(),
    })
}

/// Answer prompts from stdin until it closes.
///
/// Unanswered requests are dropped, which leaves their descriptors undecided.
async fn answer_on_terminal(mut requests: mpsc::Receiver<PromptRequest>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(request) = requests.recv().await {
        eprint!("Allow {}? [y/N] ", request.descriptor);
        let decision = match lines.next_line().await {
            Ok(Some(line)) if matches!(line.trim(), "y" | "Y" | "yes") => Decision::Grant,
            Ok(Some(_)) => Decision::Deny,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read prompt answer");
                break;
            }
        };
        request.respond(decision);
    }
}

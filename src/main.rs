//! Intent Transfer CLI
//!
//! Runs one transfer attempt against the configured endpoints:
//!
//! ```text
//! intent_transfer --env dev --user <id> "Send 100 TON to Samir"
//! ```
//!
//! While the attempt waits for funds, type `sent` to trigger an immediate
//! balance check. Ctrl-C cancels the attempt.

use anyhow::{Context, bail};
use tokio::io::{AsyncBufReadExt, BufReader};

use intent_transfer::config::AppConfig;
use intent_transfer::logging::init_logging;
use intent_transfer::transfer::{
    AttemptResult, OrchestrationEvent, OrchestrationState, TransferOrchestrator, TransferRequest,
    TransitionDetail,
};

// ============================================================
// ARGUMENTS
// ============================================================

struct CliArgs {
    env: String,
    user_id: String,
    message: String,
}

fn usage() -> &'static str {
    "usage: intent_transfer [--env <env>] --user <id> \"<message>\""
}

fn parse_args() -> anyhow::Result<CliArgs> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut env = "dev".to_string();
    let mut user_id = None;
    let mut words = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--env" | "-e" if i + 1 < args.len() => {
                env = args[i + 1].clone();
                i += 1;
            }
            "--user" | "-u" if i + 1 < args.len() => {
                user_id = Some(args[i + 1].clone());
                i += 1;
            }
            "--help" | "-h" => bail!(usage()),
            other => words.push(other.to_string()),
        }
        i += 1;
    }

    let Some(user_id) = user_id else {
        bail!("missing --user\n{}", usage());
    };
    if words.is_empty() {
        bail!("missing message\n{}", usage());
    }

    Ok(CliArgs {
        env,
        user_id,
        message: words.join(" "),
    })
}

// ============================================================
// PRESENTATION
// ============================================================

fn print_event(event: &OrchestrationEvent) {
    match event {
        OrchestrationEvent::Transition {
            to, detail, ..
        } => match (to, detail) {
            (OrchestrationState::Submitting, _) => println!("Processing your request..."),
            (OrchestrationState::AwaitingFunding, TransitionDetail::Funding(ctx)) => {
                println!("{ctx}");
                if let Some(instructions) = &ctx.funding_instructions {
                    println!("{instructions}");
                }
                println!("Type `sent` once you have topped up, or Ctrl-C to cancel.");
            }
            (OrchestrationState::Retrying, TransitionDetail::Funded(sample)) => {
                println!(
                    "Funds received ({} {}). Retrying your transfer...",
                    sample.amount, sample.token
                );
            }
            _ => {}
        },
        OrchestrationEvent::BalanceObserved { sample, .. } => {
            println!("  balance: {} {}", sample.amount, sample.token);
        }
    }
}

// ============================================================
// MAIN
// ============================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    let app_config = AppConfig::load(&args.env)
        .with_context(|| format!("loading configuration for env `{}`", args.env))?;
    let _log_guard = init_logging(&app_config);

    tracing::info!(
        env = %args.env,
        git_hash = env!("GIT_HASH"),
        intent_url = %app_config.intent.url,
        "Starting intent transfer"
    );

    let orchestrator =
        TransferOrchestrator::from_config(&app_config).context("building HTTP adapters")?;
    let mut handle = orchestrator.submit(TransferRequest::new(args.message, args.user_id))?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().eq_ignore_ascii_case("sent") => handle.funds_received(),
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => stdin_open = false,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("Cancelling...");
                handle.cancel();
            }
        }
    }

    let report = handle.join().await.context("attempt task panicked")?;
    tracing::info!(
        attempt_id = %report.attempt_id,
        state = %report.state(),
        submissions = report.submissions,
        "Attempt finished"
    );

    match report.result {
        AttemptResult::Succeeded(executed) => {
            println!("Transfer complete.");
            if let Some(tx_hash) = executed.tx_hash {
                println!("  tx: {tx_hash}");
            }
            Ok(())
        }
        AttemptResult::Cancelled => {
            println!("Transfer cancelled.");
            Ok(())
        }
        AttemptResult::Failed(reason) => bail!("transfer failed [{}]: {}", reason.kind(), reason),
    }
}

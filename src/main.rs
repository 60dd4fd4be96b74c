//! Loopback demo CLI
//!
//! Runs the ping-pong client/server exchange over a simulated loopback
//! connection, twice, and checks that both runs produce the same transcript.
//!
//! # Example
//!
//! ```bash
//! # Classic exchange: three pongs, then the client ends the stream
//! loopback
//!
//! # Longer exchange with the bit-exact timer policy
//! loopback --pong-limit 5 --timer-policy parity
//!
//! # Show loop internals
//! RUST_LOG=loopback=trace loopback
//! ```

use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use loopback::{LoopbackResult, PingPong, PongLimit, SchedulerConfig, Simulation, TimerPolicy};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Loopback ping-pong demo
///
/// Single-threaded and fully deterministic: the same arguments always give
/// the same transcript.
#[derive(Parser, Debug)]
#[command(name = "loopback")]
#[command(version, about, long_about = None)]
struct Args {
    /// Pongs the client accepts before ending the stream (it stops after
    /// limit + 1)
    #[arg(short = 'p', long, default_value_t = PongLimit::DEFAULT_LIMIT)]
    pong_limit: u64,

    /// How timers that are not yet due are handled
    #[arg(long, value_enum, default_value_t = PolicyArg::Deadline)]
    timer_policy: PolicyArg,

    /// Abort if the queue has not drained after this many iterations
    #[arg(long)]
    max_steps: Option<u64>,

    /// Print the transcript as JSON
    #[cfg(feature = "serialize")]
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    Parity,
    Deadline,
}

impl From<PolicyArg> for TimerPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Parity => TimerPolicy::Parity,
            PolicyArg::Deadline => TimerPolicy::Deadline,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,loopback=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = SchedulerConfig::default().with_timer_policy(args.timer_policy.into());
    if let Some(limit) = args.max_steps {
        config = config.with_step_limit(limit);
    }

    info!(
        pong_limit = args.pong_limit,
        timer_policy = %config.timer_policy,
        max_steps = ?config.step_limit,
        "Starting ping-pong"
    );

    // ── Run 1 ─────────────────────────────────────────────────
    let first = match run_exchange(config, args.pong_limit) {
        Ok(sim) => sim,
        Err(e) => {
            error!(error = %e, "Run 1 failed");
            return ExitCode::FAILURE;
        }
    };

    // ── Run 2: identical replay ───────────────────────────────
    let second = match run_exchange(config, args.pong_limit) {
        Ok(sim) => sim,
        Err(e) => {
            error!(error = %e, "Run 2 failed");
            return ExitCode::FAILURE;
        }
    };

    #[cfg(feature = "serialize")]
    {
        if args.json {
            return match serde_json::to_string_pretty(first.transcript()) {
                Ok(json) => {
                    println!("{}", json);
                    verdict(&first, &second)
                }
                Err(e) => {
                    error!(error = %e, "Failed to encode transcript");
                    ExitCode::FAILURE
                }
            };
        }
    }

    println!();
    println!(
        "  Transcript ({} lines, {} iterations, {}):",
        first.transcript().len(),
        first.steps(),
        first.now()
    );
    for line in first.transcript_lines() {
        println!("    {}", line);
    }
    println!();
    println!("  Run 1 fingerprint: {:016x}", first.fingerprint());
    println!("  Run 2 fingerprint: {:016x}", second.fingerprint());

    verdict(&first, &second)
}

fn run_exchange(config: SchedulerConfig, pong_limit: u64) -> LoopbackResult<Simulation> {
    let mut sim = Simulation::with_config(config);
    sim.connect("C", PingPong::client(pong_limit), "S", PingPong::new())?;
    let steps = sim.run()?;
    info!(steps, now = %sim.now(), lines = sim.transcript().len(), "Exchange finished");
    Ok(sim)
}

fn verdict(first: &Simulation, second: &Simulation) -> ExitCode {
    if first.fingerprint() == second.fingerprint() {
        info!("Transcripts identical, run is deterministic");
        ExitCode::SUCCESS
    } else {
        error!("Transcript mismatch between identical runs");
        ExitCode::FAILURE
    }
}

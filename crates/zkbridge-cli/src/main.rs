// crates/zkbridge-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zkbridge_core::{
    BatchConfig, BridgeConfig, DevicePolicy, DeviceType, ErrorSink, ProofRequest, Prover,
    ProvingBackend,
};
use zkbridge_digest::DigestProver;
use zkbridge_scheduler::{Job, Orchestrator};

#[derive(Parser, Debug)]
#[command(
    name = "zkbridge",
    about = "zkbridge proving CLI",
    long_about = "zkbridge proving CLI.\n\nProve circom witnesses one at a time or in bounded parallel batches, export verification keys, and verify proofs.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    /// TOML config (max_batch_size, device, error_buffer_len).
    /// `ZKBRIDGE_MAX_BATCH_SIZE` / `ZKBRIDGE_DEVICE` override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Generate one proof
    Prove {
        /// Witness file (.wtns)
        #[arg(long)]
        witness: PathBuf,
        /// Proving key (.zkey)
        #[arg(long)]
        zkey: PathBuf,
        /// Output proof JSON
        #[arg(long, default_value = "proof.json")]
        proof: PathBuf,
        /// Output public-inputs JSON
        #[arg(long, default_value = "public.json")]
        public: PathBuf,
        /// Device (defaults to the config value)
        #[arg(long, value_enum)]
        device: Option<DeviceOpt>,
    },

    /// Verify a proof against public inputs and a verification key
    Verify {
        /// Proof JSON
        #[arg(long)]
        proof: PathBuf,
        /// Public-inputs JSON
        #[arg(long)]
        public: PathBuf,
        /// Verification key JSON
        #[arg(long)]
        vk: PathBuf,
    },

    /// Prove many witnesses against one key with bounded concurrency.
    /// Writes `proof_<i>.json` and `public_<i>.json` into --out-dir.
    Batch {
        /// Proving key (.zkey) shared by every job
        #[arg(long)]
        zkey: PathBuf,
        /// Directory for outputs
        #[arg(long, default_value = "proofs")]
        out_dir: PathBuf,
        /// Maximum proofs in flight (0 = default of 10; defaults to config)
        #[arg(long)]
        max_batch_size: Option<usize>,
        /// Device (defaults to the config value)
        #[arg(long, value_enum)]
        device: Option<DeviceOpt>,
        /// Print a JSON report instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
        /// Witness files (.wtns), in job order
        #[arg(required = true)]
        witnesses: Vec<PathBuf>,
    },

    /// Derive a verification key from a proving key
    ExportVk {
        /// Proving key (.zkey)
        #[arg(long)]
        zkey: PathBuf,
        /// Output verification key JSON
        #[arg(long, default_value = "vk.json")]
        out: PathBuf,
    },

    /// List device values and whether this build can prove on them
    Devices,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum DeviceOpt {
    /// CPU only
    Cpu,
    /// Metal GPU
    Metal,
    /// CPU and Metal together
    CpuMetal,
}

impl From<DeviceOpt> for DeviceType {
    fn from(d: DeviceOpt) -> Self {
        match d {
            DeviceOpt::Cpu => Self::Cpu,
            DeviceOpt::Metal => Self::Metal,
            DeviceOpt::CpuMetal => Self::CpuMetal,
        }
    }
}

#[derive(Serialize)]
struct BatchReport<'a> {
    device: DeviceType,
    max_batch_size: usize,
    results: Vec<i64>,
    succeeded: usize,
    failed: usize,
    first_error: Option<&'a str>,
}

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?.apply_env()?;
    match cli.cmd {
        Cmd::Prove {
            witness,
            zkey,
            proof,
            public,
            device,
        } => prove(
            &config,
            &ProofRequest::new(witness, zkey, proof, public),
            device,
        ),

        Cmd::Verify { proof, public, vk } => verify(&proof, &public, &vk),

        Cmd::Batch {
            zkey,
            out_dir,
            max_batch_size,
            device,
            json,
            witnesses,
        } => batch(
            &config,
            &zkey,
            &out_dir,
            max_batch_size,
            device,
            json,
            &witnesses,
        ),

        Cmd::ExportVk { zkey, out } => {
            DigestProver.export_vk(&zkey, &out)?;
            info!(vk = %out.display(), "verification key written");
            Ok(())
        }

        Cmd::Devices => {
            devices();
            Ok(())
        }
    }
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Config file, or defaults when none is given.
fn load_config(path: Option<&Path>) -> Result<BridgeConfig> {
    path.map_or_else(|| Ok(BridgeConfig::default()), BridgeConfig::load)
}

fn prove(config: &BridgeConfig, request: &ProofRequest, device: Option<DeviceOpt>) -> Result<()> {
    let device = device.map_or(config.device, DeviceType::from);
    let prover = Prover::new(&DigestProver);
    let mut buf = vec![0u8; config.error_buffer_len];
    let mut sink = ErrorSink::new(&mut buf);
    if !sink.is_enabled() {
        // No buffer to bound the message; report the error whole.
        prover.try_prove(request, device).context("proof failed")?;
    } else if !prover.prove_one(request, device, &mut sink).is_success() {
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        bail!("proof failed: {}", String::from_utf8_lossy(&buf[..end]));
    }
    info!(
        proof = %request.proof().display(),
        public = %request.public().display(),
        %device,
        "proof written"
    );
    Ok(())
}

fn verify(proof: &Path, public: &Path, vk: &Path) -> Result<()> {
    if Prover::new(&DigestProver).try_verify(proof, public, vk)? {
        println!("OK");
        Ok(())
    } else {
        bail!("proof rejected")
    }
}

fn batch(
    config: &BridgeConfig,
    zkey: &Path,
    out_dir: &Path,
    max_batch_size: Option<usize>,
    device: Option<DeviceOpt>,
    json: bool,
    witnesses: &[PathBuf],
) -> Result<()> {
    let device = device.map_or(config.device, DeviceType::from);
    let limits = max_batch_size.map_or_else(|| config.batch_config(), BatchConfig::new);

    let jobs: Vec<Job> = witnesses
        .iter()
        .enumerate()
        .map(|(i, w)| {
            Ok(ProofRequest::new(
                w,
                zkey,
                out_dir.join(format!("proof_{i}.json")),
                out_dir.join(format!("public_{i}.json")),
            ))
        })
        .collect();

    let outcome = Orchestrator::new(Prover::new(&DigestProver), limits).run(&jobs, device)?;

    if json {
        let report = BatchReport {
            device,
            max_batch_size: limits.max_batch_size(),
            results: outcome.results().iter().map(|r| r.code()).collect(),
            succeeded: outcome.succeeded(),
            failed: outcome.failed(),
            first_error: outcome.first_error(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for (i, (w, r)) in witnesses.iter().zip(outcome.results()).enumerate() {
            let status = if r.is_success() { "ok" } else { "FAILED" };
            println!("{i:>4}  {status:<6}  {}", w.display());
        }
        if let Some(msg) = outcome.first_error() {
            println!("first error: {msg}");
        }
    }

    if outcome.failed() > 0 {
        bail!("{} of {} proofs failed", outcome.failed(), outcome.len());
    }
    Ok(())
}

fn devices() {
    let policy = DevicePolicy::for_build();
    for d in DeviceType::ALL {
        let usable = policy.is_available(d) && DigestProver.supports(d);
        println!(
            "{}  {:<9}  {}",
            d.raw(),
            d.name(),
            if usable { "available" } else { "unavailable" }
        );
    }
}

//! zkbridge-bench-harness
//!
//! Time `parallel_prove`-style batches against the digest backend across a
//! sweep of concurrency bounds and append CSV rows into
//! `benchmarks/reports/bench-<unix>.csv`.
//!
//! Usage:
//!   cargo run --release -p zkbridge-bench-harness -- --profile benchmarks/harness/profiles/small.toml

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use zkbridge_core::{BatchConfig, DeviceType, ProofRequest};
use zkbridge_digest::{encode_container, ContainerKind, DigestProver};
use zkbridge_scheduler::{run_batch, Job};

#[derive(Debug, Deserialize)]
struct Profile {
    /// Witnesses per batch
    jobs: usize,
    /// Payload size of each synthetic witness
    witness_bytes: usize,
    /// Concurrency bounds to sweep (0 = library default)
    max_batch_sizes: Vec<usize>,
    /// Repetitions per bound
    repeats: u32,
}

fn parse_flag(name: &str, default: &str) -> String {
    let mut it = std::env::args().skip(1);
    while let Some(k) = it.next() {
        if k == format!("--{name}") {
            return it.next().unwrap_or_else(|| default.to_string());
        }
    }
    default.to_string()
}

/// Deterministic witness payload for job `i`.
fn payload(i: usize, len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    let mut block = *blake3::hash(&i.to_le_bytes()).as_bytes();
    while out.len() < len {
        out.extend_from_slice(&block);
        block = *blake3::hash(&block).as_bytes();
    }
    out.truncate(len);
    out
}

fn fixtures(dir: &Path, p: &Profile) -> Result<(PathBuf, Vec<PathBuf>)> {
    let zkey = dir.join("circuit.zkey");
    fs::write(
        &zkey,
        encode_container(ContainerKind::ProvingKey, &[(1, &b"bench"[..])]),
    )?;
    let mut witnesses = Vec::with_capacity(p.jobs);
    for i in 0..p.jobs {
        let w = dir.join(format!("w{i}.wtns"));
        let body = payload(i, p.witness_bytes);
        fs::write(&w, encode_container(ContainerKind::Witness, &[(2, &body[..])]))?;
        witnesses.push(w);
    }
    Ok((zkey, witnesses))
}

fn main() -> Result<()> {
    let profile_path = PathBuf::from(parse_flag(
        "profile",
        "benchmarks/harness/profiles/small.toml",
    ));
    let profile_src = fs::read_to_string(&profile_path)
        .with_context(|| format!("read profile {}", profile_path.display()))?;
    let profile: Profile = toml::from_str(&profile_src).context("parse profile toml")?;
    if profile.jobs == 0 || profile.max_batch_sizes.is_empty() {
        bail!("profile needs jobs > 0 and at least one max_batch_size");
    }
    println!(
        "Profile: jobs={}, witness_bytes={}, sweep={:?}, repeats={}",
        profile.jobs, profile.witness_bytes, profile.max_batch_sizes, profile.repeats
    );

    let work = tempfile::tempdir()?;
    let (zkey, witnesses) = fixtures(work.path(), &profile)?;

    fs::create_dir_all("benchmarks/reports")?;
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let csv_path = PathBuf::from(format!("benchmarks/reports/bench-{ts}.csv"));
    let mut csv = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&csv_path)?;
    writeln!(csv, "timestamp,jobs,witness_bytes,max_batch_size,repeat,ms,succeeded,first_proof")?;

    for &max in &profile.max_batch_sizes {
        let limits = BatchConfig::new(max);
        for rep in 0..profile.repeats {
            let out_dir = work.path().join(format!("out-{max}-{rep}"));
            let jobs: Vec<Job> = witnesses
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    Ok(ProofRequest::new(
                        w,
                        &zkey,
                        out_dir.join(format!("proof_{i}.json")),
                        out_dir.join(format!("public_{i}.json")),
                    ))
                })
                .collect();

            let t0 = Instant::now();
            let outcome = run_batch(&DigestProver, &jobs, DeviceType::Cpu, limits)?;
            let ms = t0.elapsed().as_millis();

            let first_proof = fs::read(out_dir.join("proof_0.json"))
                .map(|b| hex::encode(&blake3::hash(&b).as_bytes()[..8]))
                .unwrap_or_default();
            writeln!(
                csv,
                "{ts},{},{},{},{rep},{ms},{},{first_proof}",
                profile.jobs,
                profile.witness_bytes,
                limits.max_batch_size(),
                outcome.succeeded()
            )?;
            let _ = fs::remove_dir_all(&out_dir);
        }
        println!("max_batch_size={} done", limits.max_batch_size());
    }

    println!("Wrote report → {}", csv_path.display());
    Ok(())
}

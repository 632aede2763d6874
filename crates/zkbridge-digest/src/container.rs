//! Circom binary container framing (`.wtns`, `.zkey`).
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! magic[4] | version u32 | n_sections u32 | { kind u32 | size u64 | bytes[size] } * n_sections
//! ```
//!
//! Only the framing is checked here: magic, a non-zero version, and that every
//! section lies inside the file with nothing trailing. Section contents are
//! opaque to the reference prover.

use anyhow::{bail, ensure, Context, Result};
use std::path::Path;

/// Which container a file is expected to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Witness file, magic `wtns`.
    Witness,
    /// Proving key file, magic `zkey`.
    ProvingKey,
}

impl ContainerKind {
    /// Four-byte magic.
    #[must_use]
    pub const fn magic(self) -> &'static [u8; 4] {
        match self {
            Self::Witness => b"wtns",
            Self::ProvingKey => b"zkey",
        }
    }

    const fn what(self) -> &'static str {
        match self {
            Self::Witness => "witness",
            Self::ProvingKey => "proving key",
        }
    }
}

/// One framed section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section<'a> {
    /// Section type id.
    pub kind: u32,
    /// Section payload.
    pub data: &'a [u8],
}

/// A framing-checked container borrowed from its bytes.
#[derive(Debug, Clone)]
pub struct Container<'a> {
    /// Format version from the header.
    pub version: u32,
    /// Sections in file order.
    pub sections: Vec<Section<'a>>,
}

fn take<'a>(bytes: &mut &'a [u8], n: usize, what: &str) -> Result<&'a [u8]> {
    if bytes.len() < n {
        bail!("truncated {what}: need {n} bytes, {} left", bytes.len());
    }
    let (head, rest) = bytes.split_at(n);
    *bytes = rest;
    Ok(head)
}

fn take_u32(bytes: &mut &[u8], what: &str) -> Result<u32> {
    let b = take(bytes, 4, what)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn take_u64(bytes: &mut &[u8], what: &str) -> Result<u64> {
    let b = take(bytes, 8, what)?;
    let mut a = [0u8; 8];
    a.copy_from_slice(b);
    Ok(u64::from_le_bytes(a))
}

/// Parse and check framing of `bytes` as a `kind` container.
pub fn parse(kind: ContainerKind, bytes: &[u8]) -> Result<Container<'_>> {
    let mut rest = bytes;
    let magic = take(&mut rest, 4, "header")?;
    if magic != kind.magic() {
        bail!(
            "not a {} file: magic {:?}, expected {:?}",
            kind.what(),
            String::from_utf8_lossy(magic),
            String::from_utf8_lossy(kind.magic())
        );
    }
    let version = take_u32(&mut rest, "header")?;
    ensure!(version >= 1, "unsupported {} version {version}", kind.what());
    let n_sections = take_u32(&mut rest, "header")?;

    let mut sections = Vec::new();
    for i in 0..n_sections {
        let sec_kind = take_u32(&mut rest, "section header")?;
        let size = take_u64(&mut rest, "section header")?;
        let size = usize::try_from(size)
            .with_context(|| format!("section {i} size {size} does not fit in memory"))?;
        let data = take(&mut rest, size, "section body")
            .with_context(|| format!("section {i} (type {sec_kind})"))?;
        sections.push(Section {
            kind: sec_kind,
            data,
        });
    }
    ensure!(
        rest.is_empty(),
        "{} trailing bytes after {n_sections} sections",
        rest.len()
    );
    Ok(Container { version, sections })
}

/// Read `path` and check its framing. Returns the raw bytes.
pub fn read_checked(kind: ContainerKind, path: &Path) -> Result<Vec<u8>> {
    let bytes = zkbridge_core::io::read_bytes(path)?;
    parse(kind, &bytes).with_context(|| format!("invalid {} {}", kind.what(), path.display()))?;
    Ok(bytes)
}

/// Frame `sections` as a `kind` container (version 1, or 2 for witnesses as
/// circom emits).
#[must_use]
pub fn encode(kind: ContainerKind, sections: &[(u32, &[u8])]) -> Vec<u8> {
    let version: u32 = match kind {
        ContainerKind::Witness => 2,
        ContainerKind::ProvingKey => 1,
    };
    let body: usize = sections.iter().map(|(_, d)| 12 + d.len()).sum();
    let mut out = Vec::with_capacity(12 + body);
    out.extend_from_slice(kind.magic());
    out.extend_from_slice(&version.to_le_bytes());
    out.extend_from_slice(&(sections.len() as u32).to_le_bytes());
    for (sec_kind, data) in sections {
        out.extend_from_slice(&sec_kind.to_le_bytes());
        out.extend_from_slice(&(data.len() as u64).to_le_bytes());
        out.extend_from_slice(data);
    }
    out
}

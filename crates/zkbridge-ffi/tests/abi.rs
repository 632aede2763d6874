//! Drive the exported entry points the way a C host would.

use std::ffi::{CStr, CString};
use std::fs;
use std::os::raw::c_char;
use std::path::Path;
use std::ptr;
use zkbridge_digest::{encode_container, ContainerKind, DigestProver};
use zkbridge_ffi::{free_parallel_results, parallel_prove, prove, results, verify};

const SENTINEL: u8 = 0xAA;

fn c(p: &Path) -> CString {
    CString::new(p.to_str().unwrap()).unwrap()
}

fn message(buf: &[u8]) -> &str {
    let end = buf.iter().position(|&b| b == 0).expect("NUL inside capacity");
    std::str::from_utf8(&buf[..end]).unwrap()
}

struct Batch {
    dir: tempfile::TempDir,
    zkey: CString,
    witnesses: Vec<CString>,
    proofs: Vec<CString>,
    publics: Vec<CString>,
}

impl Batch {
    /// `n` jobs; indices in `corrupt` get an unreadable witness.
    fn new(n: usize, corrupt: &[usize]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let zkey = root.join("circuit.zkey");
        fs::write(&zkey, encode_container(ContainerKind::ProvingKey, &[(1, &b"key"[..])])).unwrap();
        let mut b = Self {
            zkey: c(&zkey),
            witnesses: Vec::new(),
            proofs: Vec::new(),
            publics: Vec::new(),
            dir,
        };
        for i in 0..n {
            let w = b.dir.path().join(format!("w{i}.wtns"));
            if corrupt.contains(&i) {
                fs::write(&w, b"nope").unwrap();
            } else {
                let payload = format!("w-{i}");
                fs::write(&w, encode_container(ContainerKind::Witness, &[(2, payload.as_bytes())]))
                    .unwrap();
            }
            b.witnesses.push(c(&w));
            b.proofs.push(c(&b.dir.path().join(format!("proof_{i}.json"))));
            b.publics.push(c(&b.dir.path().join(format!("public_{i}.json"))));
        }
        b
    }

    fn ptrs(v: &[CString]) -> Vec<*const c_char> {
        v.iter().map(|s| s.as_ptr()).collect()
    }

    fn run(&self, buf: &mut [u8], cap: u64, device: i32, max: u64) -> *mut i64 {
        let (w, p, q) = (Self::ptrs(&self.witnesses), Self::ptrs(&self.proofs), Self::ptrs(&self.publics));
        let err = if buf.is_empty() { ptr::null_mut() } else { buf.as_mut_ptr().cast() };
        // SAFETY: arrays hold `len` valid C strings; `buf` is writable for `cap` bytes.
        unsafe {
            parallel_prove(
                w.as_ptr(),
                self.zkey.as_ptr(),
                p.as_ptr(),
                q.as_ptr(),
                self.witnesses.len() as u64,
                err,
                cap,
                device,
                max,
            )
        }
    }
}

fn codes(ptr: *mut i64, n: usize) -> Vec<i64> {
    assert!(!ptr.is_null());
    // SAFETY: `ptr` is a live array of `n` results.
    unsafe { std::slice::from_raw_parts(ptr, n) }.to_vec()
}

#[test]
fn batch_with_one_bad_witness() {
    let b = Batch::new(4, &[1]);
    let mut buf = [SENTINEL; 256];
    let r = b.run(&mut buf, 256, 0, 2);
    assert_eq!(codes(r, 4), vec![0, 1, 0, 0]);
    let msg = message(&buf);
    assert!(msg.starts_with("proof 1: "), "{msg}");
    assert!(msg.contains("w1.wtns"), "{msg}");
    // SAFETY: returned by parallel_prove with 4 jobs.
    unsafe { free_parallel_results(r, 4) };
    assert!(!results::is_live(r));
}

#[test]
fn clean_batch_clears_the_buffer() {
    let b = Batch::new(3, &[]);
    let mut buf = *b"stale text from last call\0";
    let cap = buf.len() as u64;
    let r = b.run(&mut buf, cap, 0, 0);
    assert_eq!(codes(r, 3), vec![0, 0, 0]);
    assert_eq!(message(&buf), "");
    // SAFETY: returned by parallel_prove with 3 jobs.
    unsafe { free_parallel_results(r, 3) };
}

#[test]
fn message_stays_within_declared_capacity() {
    let b = Batch::new(2, &[0, 1]);
    let mut buf = [SENTINEL; 64];
    let r = b.run(&mut buf, 16, 0, 1);
    assert_eq!(codes(r, 2), vec![1, 1]);
    assert_eq!(message(&buf[..16]).len(), 15);
    assert!(buf[16..].iter().all(|&x| x == SENTINEL));
    // SAFETY: returned by parallel_prove with 2 jobs.
    unsafe { free_parallel_results(r, 2) };
}

#[test]
fn zero_capacity_buffer_is_untouched() {
    let b = Batch::new(1, &[0]);
    let mut buf = [SENTINEL; 8];
    let r = b.run(&mut buf, 0, 0, 1);
    assert_eq!(codes(r, 1), vec![1]);
    assert!(buf.iter().all(|&x| x == SENTINEL));
    // SAFETY: returned by parallel_prove with 1 job.
    unsafe { free_parallel_results(r, 1) };
}

#[test]
fn null_buffer_is_accepted() {
    let b = Batch::new(2, &[1]);
    let r = b.run(&mut [], 256, 0, 0);
    assert_eq!(codes(r, 2), vec![0, 1]);
    // SAFETY: returned by parallel_prove with 2 jobs.
    unsafe { free_parallel_results(r, 2) };
}

#[test]
fn unknown_device_fails_every_job() {
    let b = Batch::new(3, &[]);
    let mut buf = [0u8; 256];
    let r = b.run(&mut buf, 256, 7, 0);
    assert_eq!(codes(r, 3), vec![1, 1, 1]);
    assert!(message(&buf).contains("unknown device type 7"), "{}", message(&buf));
    assert!(!b.dir.path().join("proof_0.json").exists());
    // SAFETY: returned by parallel_prove with 3 jobs.
    unsafe { free_parallel_results(r, 3) };
}

#[cfg(not(feature = "metal"))]
#[test]
fn metal_is_unavailable_in_a_cpu_build() {
    let b = Batch::new(2, &[]);
    let mut buf = [0u8; 256];
    let r = b.run(&mut buf, 256, 1, 0);
    assert_eq!(codes(r, 2), vec![1, 1]);
    assert!(message(&buf).contains("metal"), "{}", message(&buf));
    // SAFETY: returned by parallel_prove with 2 jobs.
    unsafe { free_parallel_results(r, 2) };
}

#[test]
fn null_entry_fails_only_its_own_job() {
    let b = Batch::new(3, &[]);
    let w = vec![b.witnesses[0].as_ptr(), ptr::null(), b.witnesses[2].as_ptr()];
    let p = Batch::ptrs(&b.proofs);
    let q = Batch::ptrs(&b.publics);
    let mut buf = [0u8; 128];
    // SAFETY: three entries each, entry 1 of `w` is null.
    let r = unsafe {
        parallel_prove(w.as_ptr(), b.zkey.as_ptr(), p.as_ptr(), q.as_ptr(), 3, buf.as_mut_ptr().cast(), 128, 0, 0)
    };
    assert_eq!(codes(r, 3), vec![0, 1, 0]);
    assert_eq!(message(&buf), "proof 1: invalid input: witness 1 path is null");
    // SAFETY: returned by parallel_prove with 3 jobs.
    unsafe { free_parallel_results(r, 3) };
}

#[test]
fn empty_batch_returns_a_releasable_handle() {
    let b = Batch::new(0, &[]);
    let mut buf = [0u8; 32];
    let r = b.run(&mut buf, 32, 0, 0);
    assert!(!r.is_null());
    assert!(results::is_live(r));
    // SAFETY: returned by parallel_prove with 0 jobs.
    unsafe { free_parallel_results(r, 0) };
    assert!(!results::is_live(r));
}

#[test]
fn release_contract_is_enforced() {
    let b = Batch::new(2, &[]);
    let r = b.run(&mut [], 0, 0, 0);
    assert!(results::release(r, 3).is_err());
    assert!(results::is_live(r));
    let mut foreign = [7i64; 2];
    // SAFETY: a pointer parallel_prove never returned; the registry rejects it.
    unsafe { free_parallel_results(foreign.as_mut_ptr(), 2) };
    assert_eq!(foreign, [7, 7]);
    assert!(results::is_live(r));
    // SAFETY: returned by parallel_prove with 2 jobs, released once.
    unsafe { free_parallel_results(r, 2) };
    // SAFETY: null is always accepted.
    unsafe { free_parallel_results(ptr::null_mut(), 0) };
}

#[test]
fn single_prove_then_verify() {
    let b = Batch::new(1, &[]);
    let vk = b.dir.path().join("vk.json");
    DigestProver
        .export_vk(&b.dir.path().join("circuit.zkey"), &vk)
        .unwrap();
    let vk = c(&vk);

    let mut buf = [SENTINEL; 128];
    // SAFETY: valid C strings and a 128-byte buffer.
    let rc = unsafe {
        prove(
            b.witnesses[0].as_ptr(),
            b.zkey.as_ptr(),
            b.proofs[0].as_ptr(),
            b.publics[0].as_ptr(),
            buf.as_mut_ptr().cast(),
            128,
            0,
        )
    };
    assert_eq!(rc, 0, "{}", message(&buf));
    assert_eq!(buf[0], 0);

    // SAFETY: valid C strings.
    let ok = unsafe { verify(b.proofs[0].as_ptr(), b.publics[0].as_ptr(), vk.as_ptr()) };
    assert_eq!(ok, 0);
    // SAFETY: null path is reported as failure, not dereferenced.
    let bad = unsafe { verify(ptr::null(), b.publics[0].as_ptr(), vk.as_ptr()) };
    assert_eq!(bad, 1);
}

#[test]
fn single_prove_reports_missing_witness() {
    let b = Batch::new(1, &[]);
    let missing = c(&b.dir.path().join("missing.wtns"));
    let mut buf = [0u8; 256];
    // SAFETY: valid C strings and a 256-byte buffer.
    let rc = unsafe {
        prove(
            missing.as_ptr(),
            b.zkey.as_ptr(),
            b.proofs[0].as_ptr(),
            b.publics[0].as_ptr(),
            buf.as_mut_ptr().cast(),
            256,
            0,
        )
    };
    assert_eq!(rc, 1);
    assert!(message(&buf).contains("missing.wtns"), "{}", message(&buf));
}

#[test]
fn version_string_is_static() {
    // SAFETY: static NUL-terminated string.
    let v = unsafe { CStr::from_ptr(zkbridge_ffi::zkbridge_version()) };
    assert!(!v.to_bytes().is_empty());
}

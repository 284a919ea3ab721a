//! Stamps the pcheck binary with the revision it was built from.
//!
//! `PCHECK_REVISION` is taken from the environment when set (release
//! tarballs carry no .git), otherwise from `git describe`. The stamp shows up
//! in `pcheck --version` and in the startup log line.

use std::env;
use std::path::Path;
use std::process::Command;

const REVISION_ENV: &str = "PCHECK_REVISION";

fn main() {
    let revision = env::var(REVISION_ENV)
        .ok()
        .filter(|r| !r.trim().is_empty())
        .or_else(git_revision)
        .unwrap_or_else(|| "unknown".to_string());
    let built_on = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=PCHECK_REVISION={}", revision.trim());
    println!("cargo:rustc-env=PCHECK_BUILT_ON={}", built_on);
    println!("cargo:rustc-env=PCHECK_PROFILE={}", profile);

    println!("cargo:rerun-if-env-changed={}", REVISION_ENV);
    println!("cargo:rerun-if-changed=build.rs");
    for git_file in ["../.git/HEAD", "../.git/index"] {
        if Path::new(git_file).exists() {
            println!("cargo:rerun-if-changed={}", git_file);
        }
    }
}

/// Short revision with a `-dirty` suffix for uncommitted changes
fn git_revision() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=8"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

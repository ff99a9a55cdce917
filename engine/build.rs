//! Build script embedding version metadata
//!
//! - `GIT_COMMIT_HASH`: short hash printed in the `Codify v… (<hash> - <time>)`
//!   startup line and returned as `commit` by `GET /api/status`
//! - `BUILD_TIMESTAMP`: RFC 3339 build time, printed in the same startup line
//!
//! Builds outside a git checkout report the hash as `unknown`.

use std::process::Command;

fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    let hash = String::from_utf8(output.stdout).ok()?;
    let hash = hash.trim();
    (!hash.is_empty()).then(|| hash.to_string())
}

fn main() {
    let commit = git_short_hash().unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=GIT_COMMIT_HASH={}", commit);
    println!(
        "cargo:rustc-env=BUILD_TIMESTAMP={}",
        chrono::Utc::now().to_rfc3339()
    );

    // New commits change the embedded hash
    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=build.rs");
}

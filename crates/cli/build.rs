//! Build script for labelbench CLI
//!
//! Stamps commit and build time into the binary for `--version`

fn main() {
    built::write_built_file().expect("Failed to acquire build-time information");

    let commit = std::env::var("GIT_COMMIT_HASH").unwrap_or_else(|_| "unknown".to_string());
    println!("cargo:rustc-env=LABELBENCH_COMMIT={}", commit);
    println!(
        "cargo:rustc-env=LABELBENCH_BUILT_AT={}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M UTC")
    );
    println!("cargo:rerun-if-env-changed=GIT_COMMIT_HASH");
}

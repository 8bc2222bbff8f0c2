//! Function artifact packaging
//!
//! Compiles the agent for the Lambda target and zips it under the fixed
//! `bootstrap` entry-point name. Runs the toolchain as child processes;
//! any failure here is a packaging failure, reported separately from
//! provider errors by the setup orchestrator.

use std::path::PathBuf;
use std::process::Command;

type PackageError = Box<dyn std::error::Error + Send + Sync>;

const LAMBDA_TARGET: &str = "aarch64-unknown-linux-musl";

/// Build the deployment archive for the control function.
///
/// Expects to run from the workspace root (the same place `cargo build`
/// works from) with the `zip` CLI and the Lambda target installed.
pub fn build_agent_archive() -> Result<Vec<u8>, PackageError> {
    let output = Command::new("cargo")
        .args([
            "build",
            "--release",
            "--target",
            LAMBDA_TARGET,
            "-p",
            "exitflow-agent",
        ])
        .output()?;

    if !output.status.success() {
        return Err(format!(
            "cargo build failed:\n{}",
            String::from_utf8_lossy(&output.stderr)
        )
        .into());
    }

    let binary: PathBuf = ["target", LAMBDA_TARGET, "release", "exitflow-agent"]
        .iter()
        .collect();
    if !binary.exists() {
        return Err(format!("built binary not found at {}", binary.display()).into());
    }

    // Stage the binary under the entry-point name the runtime expects.
    let staging = std::env::temp_dir().join(format!("exitflow-package-{}", std::process::id()));
    std::fs::create_dir_all(&staging)?;
    let result = zip_bootstrap(&staging, &binary);
    let _ = std::fs::remove_dir_all(&staging);
    result
}

fn zip_bootstrap(staging: &std::path::Path, binary: &std::path::Path) -> Result<Vec<u8>, PackageError> {
    let bootstrap = staging.join("bootstrap");
    std::fs::copy(binary, &bootstrap)?;

    let archive = staging.join("exitflow-agent.zip");
    let output = Command::new("zip")
        .arg("-j")
        .arg("-q")
        .arg(&archive)
        .arg(&bootstrap)
        .output()?;

    if !output.status.success() {
        return Err(format!(
            "zip failed:\n{}",
            String::from_utf8_lossy(&output.stderr)
        )
        .into());
    }

    Ok(std::fs::read(&archive)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Exercises only the zip step; the cross-compile needs the Lambda
    // toolchain and belongs to the deploy path.
    #[test]
    fn zips_the_binary_as_bootstrap() {
        if Command::new("zip").arg("-v").output().is_err() {
            eprintln!("zip CLI not installed, skipping");
            return;
        }

        let staging = tempfile::tempdir().unwrap();
        let fake_binary = staging.path().join("exitflow-agent");
        std::fs::write(&fake_binary, b"\x7fELF-fake").unwrap();

        let archive = zip_bootstrap(staging.path(), &fake_binary).unwrap();

        // Zip magic plus the fixed entry name.
        assert_eq!(&archive[..2], b"PK");
        assert!(
            archive
                .windows(b"bootstrap".len())
                .any(|window| window == b"bootstrap")
        );
    }
}

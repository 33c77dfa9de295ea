//! Building testsuite examples.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result, bail};

/// Target of the emulated LM3S6965 (Cortex-M3).
pub const TARGET: &str = "thumbv7m-none-eabi";

/// Get the project root directory.
pub fn project_root() -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::current_dir().unwrap());

    // If we're in xtask/, go up one level.
    if manifest_dir.ends_with("xtask") {
        manifest_dir.parent().unwrap().to_path_buf()
    } else {
        manifest_dir
    }
}

/// Directory of the testsuite crate.
pub fn testsuite_dir() -> PathBuf {
    project_root().join("testsuite")
}

/// Build an example for the target and return the path to its ELF.
pub fn build_example(example: &str, release: bool) -> Result<PathBuf> {
    let mut cmd = Command::new("cargo");
    cmd.current_dir(testsuite_dir())
        .env("DEFMT_LOG", "debug")
        .args(["build", "--example", example, "--target", TARGET]);

    if release {
        cmd.arg("--release");
    }

    let status = cmd.status().context("Failed to run cargo build")?;
    if !status.success() {
        bail!("cargo build of '{example}' failed");
    }

    let profile = if release { "release" } else { "debug" };
    Ok(project_root()
        .join("target")
        .join(TARGET)
        .join(profile)
        .join("examples")
        .join(example))
}

/// Names of all examples in the testsuite, sorted.
pub fn discover_examples() -> Result<Vec<String>> {
    let examples_dir = testsuite_dir().join("examples");

    let mut examples = Vec::new();
    for entry in fs::read_dir(&examples_dir).context("Failed to read examples directory")? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "rs") {
            if let Some(stem) = path.file_stem() {
                examples.push(stem.to_string_lossy().into_owned());
            }
        }
    }
    examples.sort();
    Ok(examples)
}

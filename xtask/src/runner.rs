//! Test runner: build, run in QEMU and check the output.

use std::fs;
use std::path::Path;

use anyhow::Result;

use crate::build::{build_example, testsuite_dir};
use crate::defmt;
use crate::qemu::run_qemu;

/// Options for running an example.
pub struct RunOptions {
    /// Print the decoded log and UART output (for the `qemu` command).
    pub verbose: bool,
    /// Update expected files instead of comparing (for `test --bless`).
    pub bless: bool,
    /// Build in release mode.
    pub release: bool,
}

/// Run an example with the given options.
///
/// Returns `Ok(true)` if the test passed, `Ok(false)` if it failed.
///
/// A test passes when the guest exits successfully, its UART0 bytes match
/// `expected/<example>.uart`, and its decoded log matches
/// `expected/<example>.expected` if that file exists.
pub fn run_example(example: &str, opts: &RunOptions) -> Result<bool> {
    println!("Building '{example}'...");
    let elf_path = build_example(example, opts.release)?;

    println!("Running in QEMU...");
    let output = run_qemu(&elf_path)?;
    let log = defmt::decode_output(&elf_path, &output.semihosting)?;

    if opts.verbose {
        print!("{log}");
        println!("--- uart0 ---");
        println!("{:?}", String::from_utf8_lossy(&output.uart0));
        println!("--- QEMU run end ---");
    }

    if !output.success {
        println!("  FAIL: guest exited with failure");
        if !opts.verbose {
            print!("{log}");
        }
        return Ok(false);
    }

    let expected = testsuite_dir().join("expected");
    let uart_ok = check_expected(
        &expected.join(format!("{example}.uart")),
        &output.uart0,
        opts.bless,
        true,
    )?;
    let log_ok = check_expected(
        &expected.join(format!("{example}.expected")),
        log.as_bytes(),
        opts.bless,
        false,
    )?;

    let passed = uart_ok && log_ok;
    if passed && !opts.bless {
        println!("  PASS");
    }
    Ok(passed)
}

/// Compare `actual` against the file at `path`, or write it when blessing.
///
/// A missing file fails only if it is `required`.
fn check_expected(path: &Path, actual: &[u8], bless: bool, required: bool) -> Result<bool> {
    let filename = path.file_name().unwrap_or_default().to_string_lossy();

    if bless {
        let status = match fs::read(path) {
            Ok(existing) if existing == actual => "No change",
            Ok(_) => {
                fs::write(path, actual)?;
                "Updated"
            }
            Err(_) => {
                if let Some(dir) = path.parent() {
                    fs::create_dir_all(dir)?;
                }
                fs::write(path, actual)?;
                "Created"
            }
        };
        println!("  {filename}: {status}");
        return Ok(true);
    }

    match fs::read(path) {
        Ok(expected) if expected == actual => Ok(true),
        Ok(expected) => {
            println!("  FAIL: {filename} differs");
            println!("--- expected ---");
            println!("{}", String::from_utf8_lossy(&expected));
            println!("--- actual ---");
            println!("{}", String::from_utf8_lossy(actual));
            Ok(false)
        }
        Err(_) if required => {
            println!("  {filename} missing, run with --bless to create");
            Ok(false)
        }
        Err(_) => Ok(true),
    }
}

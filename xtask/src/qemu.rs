//! QEMU runner for the LM3S6965 evaluation board.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use tempfile::NamedTempFile;

/// Output captured from one QEMU run.
pub struct QemuOutput {
    /// defmt frames written to semihosting stdout.
    pub semihosting: Vec<u8>,
    /// Bytes the driver transmitted on UART0.
    pub uart0: Vec<u8>,
    /// The guest exited through semihosting with a success status.
    pub success: bool,
}

/// Run an ELF to completion.
///
/// UART0 is backed by a file, so the guest never receives anything. A guest
/// failure is reported in [`QemuOutput::success`]; only QEMU failing to start
/// or being killed is an error.
pub fn run_qemu(elf_path: &Path) -> Result<QemuOutput> {
    let uart0_file = NamedTempFile::new().context("Failed to create temp file for UART0")?;
    let uart0_path = uart0_file.path();

    let output = Command::new("qemu-system-arm")
        .args(["-cpu", "cortex-m3", "-machine", "lm3s6965evb"])
        .args(["-nographic", "-monitor", "none"])
        .args(["-semihosting-config", "enable=on,target=native"])
        .arg("-serial")
        .arg(format!("file:{}", uart0_path.display()))
        .arg("-kernel")
        .arg(elf_path)
        .stdin(Stdio::null())
        .output()
        .context("Failed to run QEMU")?;

    if output.status.code().is_none() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("QEMU was terminated by a signal\n{stderr}");
    }

    let uart0 = fs::read(uart0_path).unwrap_or_default();

    Ok(QemuOutput {
        semihosting: output.stdout,
        uart0,
        success: output.status.success(),
    })
}

//! Decoding of the defmt log stream.

use std::fmt::Write;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use defmt_decoder::{DecodeError, Frame, Table};

/// Decode raw defmt frames into one line per log message.
pub fn decode_output(elf_path: &Path, raw_output: &[u8]) -> Result<String> {
    let elf_data = fs::read(elf_path).context("Failed to read ELF file")?;
    let table = Table::parse(&elf_data)
        .context("Failed to parse defmt table from ELF")?
        .ok_or_else(|| anyhow!("No defmt data found in ELF"))?;

    let mut decoder = table.new_stream_decoder();
    decoder.received(raw_output);

    let mut output = String::new();
    loop {
        match decoder.decode() {
            Ok(frame) => writeln!(output, "{}", format_frame(&frame))?,
            Err(DecodeError::UnexpectedEof) => break,
            Err(DecodeError::Malformed) => bail!("Malformed defmt frame"),
        }
    }

    Ok(output)
}

/// `[LEVEL] message`, without source locations so expected files survive
/// unrelated edits.
fn format_frame(frame: &Frame) -> String {
    let level = frame
        .level()
        .map(|l| l.as_str())
        .unwrap_or("print")
        .to_uppercase();
    format!("[{level:<5}] {}", frame.display_message())
}

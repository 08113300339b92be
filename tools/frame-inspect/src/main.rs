//! Frame Inspector
//!
//! Decodes one or more concatenated send frames from a capture file (or
//! stdin) and prints the command, checksum status and metadata of each.
//! Exits non-zero on the first frame that fails to decode.
//!
//! ```text
//! frame-inspect capture.bin --verify
//! frame-inspect capture.bin --no-verify
//! frame-inspect dump.hex --hex --json
//! ```

mod report;

use anyhow::{Context, Result};
use clap::Parser;
use codec::FrameCodec;
use report::{decode_input, Inspector};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "frame-inspect")]
#[command(about = "Decode send frames and report their contents")]
struct Args {
    /// Capture file; `-` reads stdin
    file: PathBuf,

    /// Input is hex text rather than raw bytes
    #[arg(long)]
    hex: bool,

    /// Reject frames whose checksum does not match
    #[arg(long, conflicts_with = "no_verify")]
    verify: bool,

    /// Report checksums without checking them
    #[arg(long)]
    no_verify: bool,

    /// One JSON object per frame instead of text
    #[arg(long)]
    json: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Environment (development, staging, production)
    #[arg(short, long)]
    environment: Option<String>,
}

impl Args {
    /// Command-line flags win over `codec.verify_checksum_on_receive`
    fn verify_checksums(&self, configured: bool) -> bool {
        if self.verify {
            true
        } else if self.no_verify {
            false
        } else {
            configured
        }
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    let mut raw = Vec::new();
    if path.as_os_str() == "-" {
        io::stdin()
            .read_to_end(&mut raw)
            .context("Failed to read stdin")?;
    } else {
        raw = std::fs::read(path).with_context(|| format!("Failed to read {:?}", path))?;
    }
    Ok(raw)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let app_config = config::AppConfig::load(args.config.as_deref(), args.environment.as_deref())?;
    config::init_logging(&app_config.logging)?;

    let verify = args.verify_checksums(app_config.codec.verify_checksum_on_receive);
    let codec = FrameCodec::from_config(&app_config.codec);

    let input = decode_input(read_input(&args.file)?, args.hex)?;
    info!(bytes = input.len(), verify, "Inspecting capture");

    let mut inspector = Inspector::new(input, codec, verify);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut count = 0;

    while let Some(report) = inspector.next_report()? {
        if args.json {
            serde_json::to_writer(&mut out, &report).context("Failed to write report")?;
            writeln!(out)?;
        } else {
            writeln!(out, "{}\n", report)?;
        }
        count += 1;
    }

    info!(frames = count, "Capture decoded");
    Ok(())
}

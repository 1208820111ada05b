//! Decodes, and optionally executes, a raw binary of Arm Thumb code.
//!
//! The binary is read as a sequence of little-endian halfwords starting at
//! address zero. Each instruction is printed as it is decoded. With
//! `--execute`, each one is also run against a zeroed register file and the
//! registers are printed afterwards.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;

use thumbsim::{Armv7M, Error};

#[derive(Parser, Debug)]
#[command(author, version, about = "ARMv7-M Thumb instruction simulator", long_about = None)]
struct Cli {
    /// Path to the raw binary to load
    binary: PathBuf,

    /// Execute each instruction and print the registers
    #[arg(short, long)]
    execute: bool,

    /// Enable debug logging
    #[arg(short, long)]
    trace: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.trace {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let contents = std::fs::read(&cli.binary)
        .with_context(|| format!("Failed to read {}", cli.binary.display()))?;
    if contents.len() % 2 != 0 {
        bail!(
            "{} is {} bytes long, which is not a whole number of halfwords",
            cli.binary.display(),
            contents.len()
        );
    }
    tracing::info!(
        "Loaded {} bytes from {}",
        contents.len(),
        cli.binary.display()
    );

    let mut cpu = Armv7M::new();
    // Where the instruction being decoded started
    let mut start = 0usize;
    for (idx, chunk) in contents.chunks_exact(2).enumerate() {
        let addr = idx * 2;
        let halfword = u16::from_le_bytes([chunk[0], chunk[1]]);
        if cpu.pending().is_none() {
            start = addr;
        }
        let decoded = match cpu.feed(halfword) {
            Ok(decoded) => decoded,
            Err(Error::Incomplete) => continue,
            Err(e) => {
                println!("{:08x}:\t{}", start, e);
                continue;
            }
        };
        println!("{:08x}:\t{}\t{}", start, decoded.word, decoded.instruction);
        if cli.execute {
            if let Err(e) = cpu.execute(decoded.instruction) {
                println!("{:08x}:\t{}", start, e);
            }
            println!("{}", cpu.registers());
        }
    }

    if cpu.pending().is_some() {
        bail!("Binary ends half way through a 32-bit instruction");
    }

    Ok(())
}

// End of file

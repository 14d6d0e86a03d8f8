//! # wirescope - Main Entry Point
//!
//! Subcommands:
//! - **`kernel-version`**: running kernel from the VDSO note
//! - **`symbols`**: symbol addresses or file offsets in an ELF binary
//! - **`read`**: hex dump of bytes at an address or file offset
//! - **`replay`**: feed a JSON-lines capture through the exporters

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use wirescope::cli::{Cli, Command, ReadArgs, ReplayArgs, SymbolsArgs};
use wirescope::config::ExportConfig;
use wirescope::domain::ErrorKind;
use wirescope::preflight::{check_binary_exists, check_symbol_tables, detect_kernel_version};
use wirescope::replay::{run_replay, Capture};
use wirescope::symbolization::{ElfReader, SearchType};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_DATAERR: i32 = 65;
const EXIT_NOINPUT: i32 = 66;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match ErrorKind::of(err) {
        Some(ErrorKind::NotFound) => EXIT_NOINPUT,
        Some(ErrorKind::FailedPrecondition) => EXIT_DATAERR,
        _ => EXIT_ERROR,
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::KernelVersion => {
            let version = detect_kernel_version()?;
            println!("{version}");
            Ok(())
        }
        Command::Symbols(args) => symbols(&args),
        Command::Read(args) => read(&args),
        Command::Replay(args) => replay(&args),
    }
}

fn symbols(args: &SymbolsArgs) -> Result<()> {
    check_binary_exists(&args.binary)?;
    check_symbol_tables(&args.binary);

    let search = if args.offset { SearchType::Offset } else { SearchType::Value };
    let mut reader = ElfReader::new(&args.binary);
    let resolved = reader.get_symbols(&args.names, search)?;
    if resolved.is_empty() {
        bail!("No symbols ending in {} found in {}", args.names.join(", "), args.binary.display());
    }

    let mut resolved: Vec<_> = resolved.into_iter().collect();
    resolved.sort();
    for (name, value) in resolved {
        println!("0x{value:016x}  {name}");
    }
    Ok(())
}

fn read(args: &ReadArgs) -> Result<()> {
    check_binary_exists(&args.binary)?;

    let mut reader = ElfReader::new(&args.binary);
    let mut buf = vec![0u8; args.size];
    reader.read_data(args.section.as_deref(), args.addr, &mut buf).with_context(|| {
        format!("Failed to read {} bytes at 0x{:x}", args.size, args.addr)
    })?;

    for (row, chunk) in buf.chunks(16).enumerate() {
        let bytes: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
        println!("{:016x}  {}", args.addr + (row as u64) * 16, bytes.join(" "));
    }
    Ok(())
}

fn replay(args: &ReplayArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => ExportConfig::from_file(path)?,
        None => ExportConfig::default(),
    };
    config.merge_cli(args);

    let capture = Capture::from_file(&args.capture)?;
    info!("Replaying {} records from {}", capture.records.len(), args.capture.display());

    let report = run_replay(&capture, &config)?;
    for (feed, stats) in &report.feeds {
        eprintln!("{feed}: {stats}");
    }
    eprintln!("evicted correlation keys: {}", report.evicted);
    Ok(())
}

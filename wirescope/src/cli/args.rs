//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "wirescope",
    about = "Resolve probe targets and export kernel connection telemetry",
    after_help = "\
EXAMPLES:
    wirescope kernel-version                          Running kernel from the VDSO
    wirescope symbols ./my-app handle_request         Virtual address of a function
    wirescope symbols ./my-app handle_request --offset  File offset for a uprobe
    wirescope read ./my-app --addr 0x4010a0 --size 16 --section .rodata
    wirescope replay capture.jsonl --output-dir /var/log/wirescope"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the running kernel version
    KernelVersion,

    /// Resolve function symbols in an ELF binary
    Symbols(SymbolsArgs),

    /// Dump raw bytes from an ELF binary
    Read(ReadArgs),

    /// Feed a recorded JSON-lines capture through the exporters
    Replay(ReplayArgs),
}

#[derive(Args)]
pub struct SymbolsArgs {
    /// ELF executable or shared library
    #[arg(value_name = "BINARY")]
    pub binary: PathBuf,

    /// Names to look up; a name matches any symbol ending with it
    #[arg(value_name = "NAME", required = true)]
    pub names: Vec<String>,

    /// Report file offsets instead of virtual addresses
    #[arg(long)]
    pub offset: bool,
}

#[derive(Args)]
pub struct ReadArgs {
    /// ELF executable or shared library
    #[arg(value_name = "BINARY")]
    pub binary: PathBuf,

    /// Address to read from (hex, `0x` prefix optional)
    #[arg(long, value_parser = parse_hex)]
    pub addr: u64,

    /// Number of bytes to read
    #[arg(long)]
    pub size: usize,

    /// Section containing `addr`; without it `addr` is a file offset
    #[arg(long)]
    pub section: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ReplayArgs {
    /// JSON-lines capture file
    #[arg(value_name = "CAPTURE")]
    pub capture: PathBuf,

    /// Path to JSON exporter config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write rotating log/metric files here instead of stdout
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Files kept per sink, including the active one
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Rotate files once they would exceed this many bytes
    #[arg(long)]
    pub max_file_size: Option<u64>,

    /// Seconds between correlation cleanup sweeps
    #[arg(long)]
    pub cleanup_interval: Option<u64>,
}

fn parse_hex(s: &str) -> Result<u64, String> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    u64::from_str_radix(digits, 16).map_err(|e| format!("invalid hex address {s}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("0x4010a0"), Ok(0x0040_10a0));
        assert_eq!(parse_hex("ff"), Ok(255));
        assert!(parse_hex("0xzz").is_err());
    }

    #[test]
    fn test_symbols_subcommand() {
        let cli = Cli::try_parse_from(["wirescope", "symbols", "./app", "foo", "bar", "--offset"])
            .unwrap();
        let Command::Symbols(args) = cli.command else {
            panic!("expected symbols subcommand");
        };
        assert_eq!(args.names, vec!["foo", "bar"]);
        assert!(args.offset);
    }

    #[test]
    fn test_symbols_requires_a_name() {
        assert!(Cli::try_parse_from(["wirescope", "symbols", "./app"]).is_err());
    }

    #[test]
    fn test_read_subcommand() {
        let cli = Cli::try_parse_from([
            "wirescope", "read", "./app", "--addr", "0x10", "--size", "4", "--section", ".text",
        ])
        .unwrap();
        let Command::Read(args) = cli.command else {
            panic!("expected read subcommand");
        };
        assert_eq!(args.addr, 0x10);
        assert_eq!(args.section.as_deref(), Some(".text"));
    }
}

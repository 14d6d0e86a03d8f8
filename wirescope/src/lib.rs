//! # wirescope - Kernel Connection Telemetry, Userspace Side
//!
//! Kernel probes on TCP and HTTP/2 code paths emit raw event records and
//! per-connection counters. wirescope turns those buffers into correlated,
//! deduplicated log and metric lines, and answers the ELF questions that
//! decide where the probes attach.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 Kernel probes (not in this crate)               │
//! │   TCP state / congestion / retransmit, HTTP/2 frame events      │
//! └───────────────┬───────────────────────────────┬─────────────────┘
//!                 │ event records                 │ metric (key, value)
//!                 ▼                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      wirescope (This Crate)                     │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │   Pipeline   │──▶│   Exporters  │──▶│  Line sinks  │         │
//! │  │ (per feed)   │   │ log / metric │   │ stdout/files │         │
//! │  └──────────────┘   └──────┬───────┘   └──────────────┘         │
//! │                            │                                    │
//! │          ┌─────────────────┼──────────────────┐                 │
//! │          ▼                 ▼                  ▼                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │   Decoder    │   │ Correlation  │   │    Clock     │         │
//! │  │ (events/val) │   │   stores     │   │  translator  │         │
//! │  └──────────────┘   └──────────────┘   └──────────────┘         │
//! │                                                                 │
//! │  ┌──────────────────────────────┐                               │
//! │  │ Symbolization (setup time)   │  ELF symbols, sections, VDSO  │
//! │  └──────────────────────────────┘                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! ### Export Path
//!
//! - [`decode`]: typed metric values and tagged event payloads from raw buffers
//! - [`clock`]: kernel-monotonic → wall-clock translation
//! - [`correlation`]: per `(metric, uuid)` emission decisions and last values
//! - [`export`]: formatter, correlator seam, exporters, line sinks
//! - [`pipeline`]: per-feed worker threads and the cleanup sweep
//! - [`replay`]: JSON-lines capture files fed through the pipeline
//!
//! ### Setup Path
//!
//! - [`symbolization`]: ELF symbol/offset lookup, raw reads, kernel version
//! - [`preflight`]: target binary and kernel checks
//!
//! ### Support
//!
//! - [`cli`], [`config`]: argument parsing and exporter settings
//! - [`cursor`]: bounds-checked byte reads
//! - [`domain`]: newtypes and error enums
//!
//! ## Typical Usage
//!
//! ```bash
//! # Where should a uprobe on handle_request attach?
//! ./wirescope symbols ./my-app handle_request --offset
//!
//! # Replay a recorded capture into rotating files
//! ./wirescope replay capture.jsonl --output-dir /var/log/wirescope
//! ```

pub mod cli;
pub mod clock;
pub mod config;
pub mod correlation;
pub mod cursor;
pub mod decode;
pub mod domain;
pub mod export;
pub mod pipeline;
pub mod preflight;
pub mod replay;
pub mod symbolization;

//! # ELF Introspection
//!
//! Answers the setup-time questions that decide where kernel probes attach:
//! where does a function live in a binary, what bytes sit at an address, and
//! which kernel is running.
//!
//! ## Symbol Resolution
//!
//! Probes on user-space functions are attached by file offset, not by
//! virtual address. The symbol table only records virtual addresses, so the
//! owning section's header is used to translate:
//!
//! ```text
//! file_offset = st_value - section.sh_addr + section.sh_offset
//!
//! .text  sh_addr = 0x401000  sh_offset = 0x1000
//! foo    st_value = 0x401a40
//!        → offset 0x1a40
//! ```
//!
//! Both `.symtab` and `.dynsym` are scanned. Mangled names are demangled
//! before matching, and a wanted name matches when it is a suffix of the
//! candidate name:
//!
//! ```text
//! wanted "foo"
//!   _ZN3app4http3foo17h0123456789abcdefE → app::http::foo   match
//!   foo_bar                                                  no match
//! ```
//!
//! Rust symbols (legacy `_ZN...E` and v0 `_R...`) are demangled with
//! `rustc-demangle`. Other Itanium (C++) names fail to demangle and are
//! skipped; look them up by a suffix of their raw mangled form instead.
//!
//! ## Section Cache
//!
//! Every scan records each section's file offset and virtual address in the
//! reader. Later section lookups and [`ElfReader::read_data`] translations
//! are served from that table without touching the file.
//!
//! ## Kernel Version
//!
//! [`vdso`] reads `LINUX_VERSION_CODE` from the note section of the VDSO
//! mapped into this process. No file or syscall is involved beyond
//! `getauxval`.
//!
//! ## Module Structure
//!
//! - **`elf_reader`**: symbol scan, section offsets, raw reads
//! - **`vdso`**: kernel version note probe

pub mod elf_reader;
pub mod vdso;

pub use elf_reader::{ElfReader, SearchType, SectionData};
pub use vdso::{kernel_version, kernel_version_code, parse_kernel_version, KernelVersion};

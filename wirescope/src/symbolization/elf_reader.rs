//! Symbol and section lookups against an ELF file on disk

use cpp_demangle::{DemangleOptions, Symbol as CppSymbol};
use log::debug;
use object::elf;
use object::read::elf::{FileHeader, SectionHeader, SectionTable, Sym};
use object::{Endianness, FileKind, SectionIndex};
use rustc_demangle::try_demangle;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::domain::ElfError;

type Elf32 = elf::FileHeader32<Endianness>;
type Elf64 = elf::FileHeader64<Endianness>;

/// What [`ElfReader::get_symbols`] reports for each match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    /// The symbol's virtual address (`st_value`)
    Value,
    /// The symbol's offset in the file
    Offset,
}

/// Location of a section in the file and in memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionData {
    pub offset: u64,
    pub addr: u64,
}

/// Reader for a single ELF binary
///
/// The file is opened per operation and closed again; only the section table
/// is kept between calls. Every scan records each section's offset and
/// address so later [`ElfReader::section_offset`] calls skip the file.
#[derive(Debug)]
pub struct ElfReader {
    path: PathBuf,
    sections: HashMap<String, SectionData>,
}

impl ElfReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), sections: HashMap::new() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cached section entry, without touching the file
    #[must_use]
    pub fn cached_section(&self, name: &str) -> Option<SectionData> {
        self.sections.get(name).copied()
    }

    /// Resolve every symbol whose (demangled) name ends with one of `wanted`
    ///
    /// Results are keyed by the full candidate name, so `"foo"` may resolve
    /// as `"app::http::foo"`. A later symbol with the same candidate name
    /// overwrites an earlier one. Wanted names that match nothing are simply
    /// absent from the result. In offset mode, symbols without a section of
    /// their own (absolute, common, extended index) are left out.
    ///
    /// # Errors
    /// - [`ElfError::Open`] if the file cannot be read
    /// - [`ElfError::Malformed`] / [`ElfError::UnsupportedVersion`] for bad ELF data
    pub fn get_symbols<W: AsRef<str>>(
        &mut self,
        wanted: &[W],
        search: SearchType,
    ) -> Result<HashMap<String, u64>, ElfError> {
        let wanted: Vec<&str> =
            wanted.iter().map(AsRef::as_ref).filter(|name| !name.is_empty()).collect();
        let data = self.load()?;
        let resolved = match FileKind::parse(&*data)? {
            FileKind::Elf32 => scan_symbols::<Elf32>(&data, &wanted, search, &mut self.sections)?,
            FileKind::Elf64 => scan_symbols::<Elf64>(&data, &wanted, search, &mut self.sections)?,
            kind => return Err(not_elf(kind)),
        };
        debug!(
            "Resolved {} symbols for {} wanted names in {}",
            resolved.len(),
            wanted.len(),
            self.path.display()
        );
        Ok(resolved)
    }

    /// File offset and virtual address of a named section
    ///
    /// # Errors
    /// [`ElfError::SectionNotFound`] if no section has that name, plus the
    /// open/parse errors of [`ElfReader::get_symbols`].
    pub fn section_offset(&mut self, name: &str) -> Result<SectionData, ElfError> {
        if let Some(section) = self.cached_section(name) {
            return Ok(section);
        }

        let data = self.load()?;
        let found = match FileKind::parse(&*data)? {
            FileKind::Elf32 => scan_sections::<Elf32>(&data, Some(name), &mut self.sections)?,
            FileKind::Elf64 => scan_sections::<Elf64>(&data, Some(name), &mut self.sections)?,
            kind => return Err(not_elf(kind)),
        };
        found.ok_or_else(|| ElfError::SectionNotFound(name.to_owned()))
    }

    /// Fill `buf` with bytes from the file
    ///
    /// With a section name, `addr` is a virtual address inside that section
    /// and is translated to a file offset; without one it is already a file
    /// offset.
    ///
    /// # Errors
    /// - [`ElfError::EmptyBuffer`] if `buf` is empty
    /// - [`ElfError::AddressOutsideSection`] if `addr` precedes the section
    /// - [`ElfError::Seek`] / [`ElfError::ShortRead`] if the file is too short
    pub fn read_data(
        &mut self,
        section: Option<&str>,
        addr: u64,
        buf: &mut [u8],
    ) -> Result<(), ElfError> {
        if buf.is_empty() {
            return Err(ElfError::EmptyBuffer);
        }

        let offset = match section {
            Some(name) => {
                let section = self.section_offset(name)?;
                let delta = addr.checked_sub(section.addr).ok_or_else(|| {
                    ElfError::AddressOutsideSection { addr, section: name.to_owned() }
                })?;
                section.offset + delta
            }
            None => addr,
        };

        let mut file = File::open(&self.path)
            .map_err(|source| ElfError::Open { path: self.path.clone(), source })?;
        file.seek(SeekFrom::Start(offset)).map_err(|source| ElfError::Seek { offset, source })?;

        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        if filled != buf.len() {
            return Err(ElfError::ShortRead { expected: buf.len(), actual: filled });
        }
        Ok(())
    }

    fn load(&self) -> Result<Vec<u8>, ElfError> {
        fs::read(&self.path).map_err(|source| ElfError::Open { path: self.path.clone(), source })
    }
}

fn not_elf(kind: FileKind) -> ElfError {
    ElfError::Malformed(format!("expected an ELF file, found {kind:?}"))
}

fn parse_sections<Elf: FileHeader<Endian = Endianness>>(
    data: &[u8],
) -> Result<(Endianness, SectionTable<'_, Elf>), ElfError> {
    let header = Elf::parse(data)?;
    let version = header.e_ident().version;
    if version != elf::EV_CURRENT {
        return Err(ElfError::UnsupportedVersion(version));
    }
    let endian = header.endian()?;
    let sections = header.sections(endian, data)?;
    Ok((endian, sections))
}

/// Record every section header in `cache`, stopping early at `stop_at`
fn scan_sections<Elf: FileHeader<Endian = Endianness>>(
    data: &[u8],
    stop_at: Option<&str>,
    cache: &mut HashMap<String, SectionData>,
) -> Result<Option<SectionData>, ElfError> {
    let (endian, sections) = parse_sections::<Elf>(data)?;
    for section in sections.iter() {
        let Ok(name) = sections.section_name(endian, section) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        let name = String::from_utf8_lossy(name);
        let entry = SectionData {
            offset: section.sh_offset(endian).into(),
            addr: section.sh_addr(endian).into(),
        };
        cache.insert(name.to_string(), entry);
        if stop_at == Some(name.as_ref()) {
            return Ok(Some(entry));
        }
    }
    Ok(None)
}

fn scan_symbols<Elf: FileHeader<Endian = Endianness>>(
    data: &[u8],
    wanted: &[&str],
    search: SearchType,
    cache: &mut HashMap<String, SectionData>,
) -> Result<HashMap<String, u64>, ElfError> {
    scan_sections::<Elf>(data, None, cache)?;
    let (endian, sections) = parse_sections::<Elf>(data)?;

    let mut resolved = HashMap::new();
    for (index, section) in sections.iter().enumerate() {
        let sh_type = section.sh_type(endian);
        if sh_type != elf::SHT_SYMTAB && sh_type != elf::SHT_DYNSYM {
            continue;
        }
        let symbols = object::read::elf::SymbolTable::parse(
            endian,
            data,
            &sections,
            SectionIndex(index),
            section,
        )?;

        for symbol in symbols.iter() {
            let value: u64 = symbol.st_value(endian).into();
            if value == 0 {
                continue;
            }
            let Ok(raw) = symbols.symbol_name(endian, symbol) else {
                continue;
            };
            let Some(candidate) = candidate_name(raw) else {
                continue;
            };
            if !wanted.iter().any(|name| matches_suffix(name, &candidate)) {
                continue;
            }

            let result = match search {
                SearchType::Value => value,
                SearchType::Offset => {
                    let shndx = usize::from(symbol.st_shndx(endian));
                    let Some(owner) = symbol_section(&sections, shndx) else {
                        debug!("Skipping {candidate}: no section header at index {shndx}");
                        continue;
                    };
                    let addr: u64 = owner.sh_addr(endian).into();
                    let offset: u64 = owner.sh_offset(endian).into();
                    value.wrapping_sub(addr).wrapping_add(offset)
                }
            };
            resolved.insert(candidate, result);
        }
    }
    Ok(resolved)
}

/// Section header owning a symbol, or `None` for reserved indices
fn symbol_section<'a, Elf: FileHeader<Endian = Endianness>>(
    sections: &SectionTable<'a, Elf>,
    shndx: usize,
) -> Option<&'a Elf::SectionHeader> {
    if shndx == usize::from(elf::SHN_UNDEF) || shndx >= usize::from(elf::SHN_LORESERVE) {
        return None;
    }
    sections.section(SectionIndex(shndx)).ok()
}

/// Name to match against: demangled for mangled names, raw otherwise
///
/// Rust names (legacy `_ZN..E` and v0 `_R`) go through `rustc-demangle`;
/// anything else with the Itanium prefix is demangled as C++. Returns `None`
/// for anonymous symbols, non-UTF-8 names, and names that carry a mangling
/// prefix but fail both demanglers.
fn candidate_name(raw: &[u8]) -> Option<String> {
    let raw = std::str::from_utf8(raw).ok().filter(|name| !name.is_empty())?;
    if !is_mangled(raw) {
        return Some(raw.to_owned());
    }
    // Mach-O style extra underscore
    let mangled = raw.strip_prefix("__").filter(|rest| rest.starts_with("_Z")).unwrap_or(raw);
    if let Ok(name) = try_demangle(mangled) {
        return Some(format!("{name:#}"));
    }
    if !mangled.starts_with("_Z") {
        return None;
    }
    CppSymbol::new(mangled.as_bytes())
        .ok()
        .and_then(|symbol| symbol.demangle(&DemangleOptions::default()).ok())
}

fn is_mangled(name: &str) -> bool {
    name.starts_with("_Z") || name.starts_with("___Z") || name.starts_with("_R")
}

/// `wanted` must end exactly where `candidate` ends
fn matches_suffix(wanted: &str, candidate: &str) -> bool {
    !wanted.is_empty() && candidate.ends_with(wanted)
}

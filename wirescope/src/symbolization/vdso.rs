//! Running kernel version from the VDSO's `Linux` ELF note
//!
//! The kernel maps a small ELF image (the VDSO) into every process. One of
//! its `SHT_NOTE` sections carries a note owned by `"Linux"` whose 4-byte
//! descriptor is `LINUX_VERSION_CODE`:
//!
//! ```text
//! note: namesz u32 | descsz u32 | type u32 | name (pad 4) | desc (pad 4)
//! code: (major << 16) | (minor << 8) | patch
//! ```
//!
//! The image is walked with a bounds-checked cursor rather than through a
//! generic ELF parser: the VDSO has no file behind it and its extent is only
//! known from its own section header table.

#![allow(unsafe_code)] // reads the VDSO mapping handed over by the kernel

use std::fmt;

use crate::cursor::ByteCursor;
use crate::domain::{DecodeError, ElfError};

const SHT_NOTE: u32 = 7;
const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
const ELFCLASS32: u8 = 1;
const ELFCLASS64: u8 = 2;
const NOTE_OWNER: &[u8] = b"Linux";
const DEFAULT_PAGE_SIZE: usize = 0x1000;

/// Decoded `LINUX_VERSION_CODE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct KernelVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl KernelVersion {
    #[must_use]
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    #[must_use]
    pub fn from_code(code: u32) -> Self {
        Self { major: code >> 16, minor: (code >> 8) & 0xff, patch: code & 0xff }
    }

    /// Parse the leading `M.m[.p]` of a release string such as `6.8.0-45-generic`
    #[must_use]
    pub fn parse_release(release: &str) -> Option<Self> {
        let mut parts = release.split(['.', '-', '+', ' ']).map(|part| {
            let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
            digits.parse::<u32>().ok()
        });
        let major = parts.next()??;
        let minor = parts.next()??;
        let patch = parts.next().flatten().unwrap_or(0);
        Some(Self { major, minor, patch })
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Section header fields the note walk needs
#[derive(Debug, Clone, Copy)]
struct SectionHeader {
    sh_type: u32,
    offset: u64,
    size: u64,
}

#[derive(Debug)]
struct ElfHeader {
    is_64: bool,
    shoff: u64,
    shentsize: u16,
    shnum: u16,
}

impl ElfHeader {
    fn parse(image: &[u8]) -> Result<Self, ElfError> {
        let ident = image
            .get(..16)
            .ok_or_else(|| ElfError::VdsoHeader("image shorter than e_ident".to_owned()))?;
        if ident[..4] != ELF_MAGIC {
            return Err(ElfError::VdsoHeader("missing ELF magic".to_owned()));
        }
        let is_64 = match ident[4] {
            ELFCLASS64 => true,
            ELFCLASS32 => false,
            class => return Err(ElfError::VdsoHeader(format!("unknown ELF class {class}"))),
        };
        Self::read_fields(image, is_64).map_err(header_error)
    }

    fn read_fields(image: &[u8], is_64: bool) -> Result<Self, DecodeError> {
        // Past e_ident, e_type, e_machine, e_version
        let mut cursor = ByteCursor::at(image, 24)?;
        let shoff = if is_64 {
            cursor.skip(16)?; // e_entry, e_phoff
            cursor.read_u64()?
        } else {
            cursor.skip(8)?;
            u64::from(cursor.read_u32()?)
        };
        // e_flags, e_ehsize, e_phentsize, e_phnum
        cursor.skip(10)?;
        let shentsize = cursor.read_u16()?;
        let shnum = cursor.read_u16()?;
        Ok(Self { is_64, shoff, shentsize, shnum })
    }

    /// Bytes from the start of the image to the end of the section headers
    fn extent(&self) -> u64 {
        self.shoff + u64::from(self.shnum) * u64::from(self.shentsize)
    }

    fn section(&self, image: &[u8], index: u16) -> Result<SectionHeader, DecodeError> {
        let at = self.shoff + u64::from(index) * u64::from(self.shentsize);
        let at = usize::try_from(at).map_err(|_| DecodeError::Truncated {
            needed: usize::MAX,
            available: image.len(),
        })?;
        let mut cursor = ByteCursor::at(image, at)?;
        cursor.skip(4)?; // sh_name
        let sh_type = cursor.read_u32()?;
        let (offset, size) = if self.is_64 {
            cursor.skip(16)?; // sh_flags, sh_addr
            (cursor.read_u64()?, cursor.read_u64()?)
        } else {
            cursor.skip(8)?;
            (u64::from(cursor.read_u32()?), u64::from(cursor.read_u32()?))
        };
        Ok(SectionHeader { sh_type, offset, size })
    }
}

fn header_error(err: DecodeError) -> ElfError {
    ElfError::VdsoHeader(err.to_string())
}

/// Find the `LINUX_VERSION_CODE` note in an in-memory ELF image
///
/// # Errors
/// - [`ElfError::VdsoHeader`] if the ELF or a section header cannot be read
/// - [`ElfError::VersionNoteNotFound`] if no note section holds a `Linux`
///   note with a 4-byte descriptor and type 0
pub fn parse_kernel_version(image: &[u8]) -> Result<u32, ElfError> {
    let header = ElfHeader::parse(image)?;
    for index in 0..header.shnum {
        let section = header.section(image, index).map_err(header_error)?;
        if section.sh_type != SHT_NOTE {
            continue;
        }
        let notes = usize::try_from(section.offset)
            .ok()
            .zip(usize::try_from(section.size).ok())
            .and_then(|(start, len)| image.get(start..start.checked_add(len)?))
            .ok_or_else(|| ElfError::VdsoHeader(format!("note section {index} out of bounds")))?;
        if let Some(code) = find_version_note(notes) {
            return Ok(code);
        }
    }
    Err(ElfError::VersionNoteNotFound)
}

/// Walk the notes of one section; a truncated trailing record ends the walk
fn find_version_note(notes: &[u8]) -> Option<u32> {
    let mut cursor = ByteCursor::new(notes);
    while cursor.remaining() >= 12 {
        let (name, desc, note_type) = read_note(&mut cursor).ok()?;
        let owner = name.split(|b| *b == 0).next().unwrap_or_default();
        if owner == NOTE_OWNER && note_type == 0 {
            if let Ok(code) = <[u8; 4]>::try_from(desc) {
                return Some(u32::from_ne_bytes(code));
            }
        }
    }
    None
}

fn read_note<'a>(cursor: &mut ByteCursor<'a>) -> Result<(&'a [u8], &'a [u8], u32), DecodeError> {
    let namesz = cursor.read_u32()? as usize;
    let descsz = cursor.read_u32()? as usize;
    let note_type = cursor.read_u32()?;
    let name = cursor.read_bytes(namesz)?;
    cursor.align_to(4)?;
    let desc = cursor.read_bytes(descsz)?;
    cursor.align_to(4)?;
    Ok((name, desc, note_type))
}

/// `LINUX_VERSION_CODE` of the running kernel, read from this process's VDSO
///
/// # Errors
/// [`ElfError::VdsoNotFound`] if the auxiliary vector has no VDSO, otherwise
/// the errors of [`parse_kernel_version`].
pub fn kernel_version_code() -> Result<u32, ElfError> {
    // SAFETY: getauxval only reads the process's auxiliary vector
    let base = unsafe { libc::getauxval(libc::AT_SYSINFO_EHDR) } as usize;
    if base == 0 {
        return Err(ElfError::VdsoNotFound);
    }
    // SAFETY: as above
    let page_size = match unsafe { libc::getauxval(libc::AT_PAGESZ) } as usize {
        0 => DEFAULT_PAGE_SIZE,
        size => size,
    };

    // SAFETY: the kernel maps at least one readable page of VDSO at `base`,
    // and the ELF header fits within it
    let head = unsafe { std::slice::from_raw_parts(base as *const u8, page_size) };
    let header = ElfHeader::parse(head)?;
    let extent = usize::try_from(header.extent())
        .map_err(|_| ElfError::VdsoHeader("section headers out of range".to_owned()))?
        .max(page_size);

    // SAFETY: the VDSO image, section header table included, is mapped
    // contiguously for the lifetime of the process
    let image = unsafe { std::slice::from_raw_parts(base as *const u8, extent) };
    parse_kernel_version(image)
}

/// Running kernel version, decoded
///
/// # Errors
/// See [`kernel_version_code`].
pub fn kernel_version() -> Result<KernelVersion, ElfError> {
    kernel_version_code().map(KernelVersion::from_code)
}

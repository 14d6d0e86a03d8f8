use object::write::Object;
use object::{Architecture, BinaryFormat, Endianness, SectionKind};
use wirescope::domain::ElfError;
use wirescope::symbolization::{kernel_version, parse_kernel_version, KernelVersion};

fn note(name: &[u8], note_type: u32, desc: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&u32::try_from(name.len()).unwrap().to_le_bytes());
    buf.extend_from_slice(&u32::try_from(desc.len()).unwrap().to_le_bytes());
    buf.extend_from_slice(&note_type.to_le_bytes());
    buf.extend_from_slice(name);
    buf.resize(buf.len().next_multiple_of(4), 0);
    buf.extend_from_slice(desc);
    buf.resize(buf.len().next_multiple_of(4), 0);
    buf
}

/// ELF image shaped like a VDSO: one note section per entry in `sections`
fn image(arch: Architecture, sections: &[Vec<u8>]) -> Vec<u8> {
    let mut obj = Object::new(BinaryFormat::Elf, arch, Endianness::Little);
    for (index, notes) in sections.iter().enumerate() {
        let name = format!(".note.{index}").into_bytes();
        let id = obj.add_section(Vec::new(), name, SectionKind::Note);
        obj.append_section_data(id, notes, 4);
    }
    obj.write().unwrap()
}

#[test]
fn test_finds_linux_note() {
    let code = 0x0006_0802u32;
    let mut notes = note(b"GNU\0", 3, &[0xab; 20]);
    notes.extend(note(b"Linux\0", 0, &code.to_le_bytes()));

    let image = image(Architecture::X86_64, &[notes]);
    assert_eq!(parse_kernel_version(&image).unwrap(), code);
    assert_eq!(KernelVersion::from_code(code).to_string(), "6.8.2");
}

#[test]
fn test_later_note_section() {
    let first = note(b"GNU\0", 1, &[0; 16]);
    let second = note(b"Linux\0", 0, &0x0005_0f00u32.to_le_bytes());

    let image = image(Architecture::X86_64, &[first, second]);
    assert_eq!(parse_kernel_version(&image).unwrap(), 0x0005_0f00);
}

#[test]
fn test_elf32_image() {
    let notes = note(b"Linux\0", 0, &0x0004_1300u32.to_le_bytes());
    let image = image(Architecture::I386, &[notes]);
    assert_eq!(parse_kernel_version(&image).unwrap(), 0x0004_1300);
}

#[test]
fn test_wrong_size_or_type_is_not_a_version() {
    let mut notes = note(b"Linux\0", 0, &[1, 2, 3, 4, 5, 6, 7, 8]);
    notes.extend(note(b"Linux\0", 2, &1u32.to_le_bytes()));

    let image = image(Architecture::X86_64, &[notes]);
    let err = parse_kernel_version(&image).unwrap_err();
    assert!(matches!(err, ElfError::VersionNoteNotFound));
}

#[test]
fn test_no_note_sections() {
    let image = image(Architecture::X86_64, &[]);
    assert!(matches!(parse_kernel_version(&image), Err(ElfError::VersionNoteNotFound)));
}

#[test]
fn test_running_kernel() {
    // Sandboxes without a VDSO still exercise the error path
    match kernel_version() {
        Ok(version) => assert!(version >= KernelVersion::new(2, 6, 0), "implausible {version}"),
        Err(e) => assert!(matches!(
            e,
            ElfError::VdsoNotFound | ElfError::VersionNoteNotFound | ElfError::VdsoHeader(_)
        )),
    }
}

// ─── PE header inspection ───
// Classifies a Windows executable or library as 32-bit or 64-bit from its
// COFF machine field. No heuristics: anything unexpected is an error and the
// caller decides how to degrade.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{ManagerError, ManagerResult};

const DOS_HEADER_LEN: usize = 64;
const PE_OFFSET_FIELD: usize = 60;
const PE_SIGNATURE: [u8; 4] = *b"PE\0\0";

const MACHINE_AMD64: u16 = 0x8664;
const MACHINE_I386: u16 = 0x014c;
const MACHINE_ARM: u16 = 0x01c0;
const MACHINE_ARMNT: u16 = 0x01c4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryArch {
    X86,
    X64,
}

impl std::fmt::Display for BinaryArch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryArch::X86 => write!(f, "x86"),
            BinaryArch::X64 => write!(f, "x64"),
        }
    }
}

/// Inspect the PE image at `path`.
pub fn inspect(path: &Path) -> ManagerResult<BinaryArch> {
    let mut file = File::open(path).map_err(|source| ManagerError::io(path, source))?;
    inspect_reader(&mut file).map_err(|reason| ManagerError::MalformedBinary {
        path: path.to_path_buf(),
        reason,
    })
}

/// Same as [`inspect`] over any seekable reader; the error is a plain reason.
pub fn inspect_reader<R: Read + Seek>(reader: &mut R) -> Result<BinaryArch, String> {
    let mut dos_header = [0u8; DOS_HEADER_LEN];
    reader
        .read_exact(&mut dos_header)
        .map_err(|_| format!("shorter than the {DOS_HEADER_LEN}-byte DOS header"))?;

    if &dos_header[..2] != b"MZ" {
        return Err("missing MZ signature".into());
    }

    let mut offset_bytes = [0u8; 4];
    offset_bytes.copy_from_slice(&dos_header[PE_OFFSET_FIELD..PE_OFFSET_FIELD + 4]);
    let pe_offset = u32::from_le_bytes(offset_bytes);

    reader
        .seek(SeekFrom::Start(u64::from(pe_offset)))
        .map_err(|e| format!("cannot seek to PE header at {pe_offset:#x}: {e}"))?;

    let mut signature = [0u8; 4];
    reader
        .read_exact(&mut signature)
        .map_err(|_| format!("no PE header at {pe_offset:#x}"))?;
    if signature != PE_SIGNATURE {
        return Err(format!("bad PE signature at {pe_offset:#x}"));
    }

    let mut machine_bytes = [0u8; 2];
    reader
        .read_exact(&mut machine_bytes)
        .map_err(|_| "truncated COFF header".to_string())?;

    match u16::from_le_bytes(machine_bytes) {
        MACHINE_AMD64 => Ok(BinaryArch::X64),
        MACHINE_I386 | MACHINE_ARM | MACHINE_ARMNT => Ok(BinaryArch::X86),
        other => Err(format!("unrecognized machine type {other:#06x}")),
    }
}

/// Minimal PE image for tests elsewhere in the crate.
#[cfg(test)]
pub(crate) fn fake_pe(machine: u16) -> Vec<u8> {
    let pe_offset: u32 = 0x80;
    let mut bytes = vec![0u8; pe_offset as usize];
    bytes[..2].copy_from_slice(b"MZ");
    bytes[PE_OFFSET_FIELD..PE_OFFSET_FIELD + 4].copy_from_slice(&pe_offset.to_le_bytes());
    bytes.extend_from_slice(&PE_SIGNATURE);
    bytes.extend_from_slice(&machine.to_le_bytes());
    bytes.extend_from_slice(&[0u8; 18]);
    bytes
}

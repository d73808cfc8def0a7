use crate::npy::{NpyArrayBytes, NpyHeader, read_npy_bytes, write_npy_bytes};
use crate::{IOError, MAX_ARCHIVE_MEMBERS, MAX_ARCHIVE_UNCOMPRESSED_BYTES, NPZ_MAGIC_PREFIX};

const CENTRAL_DIRECTORY_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x01, 0x02];
const END_OF_CENTRAL_DIRECTORY_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x05, 0x06];
const LOCAL_HEADER_LEN: usize = 30;
const CENTRAL_ENTRY_LEN: usize = 46;
const END_RECORD_LEN: usize = 22;

/// A named array inside an NPZ archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpzEntry {
    pub name: String,
    pub array: NpyArrayBytes,
}

fn archive_error(detail: &'static str) -> IOError {
    IOError::NpzArchiveContractViolation(detail)
}

fn zip32(len: usize) -> Result<u32, IOError> {
    u32::try_from(len).map_err(|_| archive_error("npz: member exceeds zip32 size limits"))
}

/// Little-endian field of `N` bytes at `at`, widened to usize.
fn field<const N: usize>(data: &[u8], at: usize) -> Result<usize, IOError> {
    let bytes = data
        .get(at..at + N)
        .ok_or(archive_error("npz: record extends beyond archive"))?;
    Ok(bytes
        .iter()
        .rev()
        .fold(0usize, |acc, byte| (acc << 8) | usize::from(*byte)))
}

/// One STORE member as laid out on disk.
struct StoredMember {
    file_name: String,
    crc: u32,
    size: u32,
    local_offset: u32,
}

impl StoredMember {
    /// Fields shared by the local header and the central directory record,
    /// starting at "version needed".
    fn common_fields(&self) -> Result<Vec<u8>, IOError> {
        let name_len = u16::try_from(self.file_name.len())
            .map_err(|_| archive_error("npz: member name exceeds u16 length"))?;
        let mut fields = Vec::with_capacity(26);
        // version 2.0, no flags, STORE, zeroed DOS time and date
        for word in [20_u16, 0, 0, 0, 0] {
            fields.extend_from_slice(&word.to_le_bytes());
        }
        fields.extend_from_slice(&self.crc.to_le_bytes());
        fields.extend_from_slice(&self.size.to_le_bytes());
        fields.extend_from_slice(&self.size.to_le_bytes());
        fields.extend_from_slice(&name_len.to_le_bytes());
        fields.extend_from_slice(&0_u16.to_le_bytes());
        Ok(fields)
    }

    fn write_local(&self, out: &mut Vec<u8>, body: &[u8]) -> Result<(), IOError> {
        out.extend_from_slice(&NPZ_MAGIC_PREFIX);
        out.extend_from_slice(&self.common_fields()?);
        out.extend_from_slice(self.file_name.as_bytes());
        out.extend_from_slice(body);
        Ok(())
    }

    fn write_central(&self, out: &mut Vec<u8>) -> Result<(), IOError> {
        out.extend_from_slice(&CENTRAL_DIRECTORY_SIGNATURE);
        out.extend_from_slice(&20_u16.to_le_bytes());
        out.extend_from_slice(&self.common_fields()?);
        // comment length, disk number, internal and external attributes
        out.extend_from_slice(&[0u8; 10]);
        out.extend_from_slice(&self.local_offset.to_le_bytes());
        out.extend_from_slice(self.file_name.as_bytes());
        Ok(())
    }
}

/// Write named arrays into an uncompressed NPZ archive (STORE method).
///
/// `.npy` is appended to member names that lack it.
pub fn write_npz_bytes(entries: &[(&str, &NpyHeader, &[u8])]) -> Result<Vec<u8>, IOError> {
    if entries.is_empty() {
        return Err(archive_error("npz: cannot write archive with zero entries"));
    }
    let entry_count = u16::try_from(entries.len())
        .ok()
        .filter(|count| usize::from(*count) <= MAX_ARCHIVE_MEMBERS)
        .ok_or(archive_error("npz: member count exceeds bounded limit"))?;

    let mut archive = Vec::new();
    let mut members = Vec::with_capacity(entries.len());
    for &(name, header, payload) in entries {
        let body = write_npy_bytes(header, payload)?;
        let member = StoredMember {
            file_name: if name.ends_with(".npy") {
                name.to_string()
            } else {
                format!("{name}.npy")
            },
            crc: crc32_ieee(&body),
            size: zip32(body.len())?,
            local_offset: zip32(archive.len())?,
        };
        member.write_local(&mut archive, &body)?;
        members.push(member);
    }

    let directory_offset = zip32(archive.len())?;
    for member in &members {
        member.write_central(&mut archive)?;
    }
    let directory_size = zip32(archive.len())? - directory_offset;

    archive.extend_from_slice(&END_OF_CENTRAL_DIRECTORY_SIGNATURE);
    archive.extend_from_slice(&[0u8; 4]);
    archive.extend_from_slice(&entry_count.to_le_bytes());
    archive.extend_from_slice(&entry_count.to_le_bytes());
    archive.extend_from_slice(&directory_size.to_le_bytes());
    archive.extend_from_slice(&directory_offset.to_le_bytes());
    archive.extend_from_slice(&0_u16.to_le_bytes());
    Ok(archive)
}

/// Central directory record fields needed to locate and verify a member.
struct CentralRecord<'a> {
    file_name: &'a [u8],
    method: usize,
    crc: usize,
    size: usize,
    local_offset: usize,
    next: usize,
}

impl<'a> CentralRecord<'a> {
    fn parse(data: &'a [u8], at: usize) -> Result<Self, IOError> {
        if data.get(at..at + 4) != Some(&CENTRAL_DIRECTORY_SIGNATURE[..]) {
            return Err(archive_error(
                "npz: invalid central directory entry signature",
            ));
        }
        let name_start = at + CENTRAL_ENTRY_LEN;
        let name_len = field::<2>(data, at + 28)?;
        let file_name = data
            .get(name_start..name_start + name_len)
            .ok_or(archive_error("npz: filename extends beyond data"))?;
        Ok(Self {
            file_name,
            method: field::<2>(data, at + 10)?,
            crc: field::<4>(data, at + 16)?,
            size: field::<4>(data, at + 20)?,
            local_offset: field::<4>(data, at + 42)?,
            next: name_start + name_len + field::<2>(data, at + 30)? + field::<2>(data, at + 32)?,
        })
    }

    /// The member body, after skipping its local header.
    fn body(&self, data: &'a [u8]) -> Result<&'a [u8], IOError> {
        let local = self.local_offset;
        if data.get(local..local + LOCAL_HEADER_LEN).is_none() {
            return Err(archive_error("npz: local header offset out of bounds"));
        }
        let name_len = field::<2>(data, local + 26)?;
        let extra_len = field::<2>(data, local + 28)?;
        let start = local + LOCAL_HEADER_LEN + name_len + extra_len;
        data.get(start..start + self.size)
            .ok_or(archive_error("npz: entry data extends beyond archive"))
    }
}

/// Read every member of an NPZ archive.
///
/// Only uncompressed (STORE) members are supported; each must be a valid
/// `.npy` stream whose CRC-32 matches the central directory.
pub fn read_npz_bytes(data: &[u8]) -> Result<Vec<NpzEntry>, IOError> {
    if data.len() < END_RECORD_LEN {
        return Err(archive_error("npz: data too short for a ZIP archive"));
    }
    if !data.starts_with(&NPZ_MAGIC_PREFIX) {
        return Err(archive_error("npz: not a valid ZIP/NPZ archive"));
    }

    let end_record = (0..=data.len() - END_RECORD_LEN)
        .rev()
        .find(|&at| data[at..].starts_with(&END_OF_CENTRAL_DIRECTORY_SIGNATURE))
        .ok_or(archive_error("npz: cannot find end of central directory"))?;
    let entry_count = field::<2>(data, end_record + 10)?;
    if entry_count == 0 || entry_count > MAX_ARCHIVE_MEMBERS {
        return Err(archive_error(
            "npz: archive member count is outside bounded limits",
        ));
    }

    let mut entries = Vec::with_capacity(entry_count);
    let mut budget = MAX_ARCHIVE_UNCOMPRESSED_BYTES;
    let mut at = field::<4>(data, end_record + 16)?;
    for _ in 0..entry_count {
        let record = CentralRecord::parse(data, at)?;
        if record.method != 0 {
            return Err(archive_error(
                "npz: only uncompressed (STORE) entries are supported",
            ));
        }
        budget = budget
            .checked_sub(record.size)
            .ok_or(archive_error("npz: archive decoded size exceeded bounded budget"))?;

        let body = record.body(data)?;
        if crc32_ieee(body) as usize != record.crc {
            return Err(archive_error("npz: member crc-32 mismatch"));
        }

        let file_name = String::from_utf8_lossy(record.file_name);
        entries.push(NpzEntry {
            name: file_name.strip_suffix(".npy").unwrap_or(&file_name).to_string(),
            array: read_npy_bytes(body)?,
        });
        at = record.next;
    }

    Ok(entries)
}

/// IEEE 802.3 CRC-32 (used by ZIP format).
fn crc32_ieee(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0xEDB8_8320;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

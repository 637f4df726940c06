//! Binary encode/decode for the replay format.
//!
//! All integers are little-endian u64. Labels are NUL-terminated UTF-8.
//! There is no compression, alignment padding or version field; the file
//! is framed by the magic at both ends.
//!
//! ```text
//! MAGIC
//! instructionOffset instructionCount regionCount
//! regionCount x { dataType elementCount displayRowStride label\0 }
//! instructionCount x regionCount x { diffCount diffCount x { byteOffset byteCount data } }
//! MAGIC
//! ```

use std::io::{ErrorKind, Read, Write};

use snort_core::{
    validate_diff_list, ByteDiff, DataType, RegionDescriptor, RegionRegistry, MAX_LABEL_LEN,
};

use crate::error::ReplayError;
use crate::types::{InstructionRecord, ReplayData};
use crate::MAGIC;

/// Upper bound on speculative `Vec` capacity taken from untrusted counts.
const MAX_PREALLOC: usize = 4096;

// ── Primitives ──────────────────────────────────────────────────

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), ReplayError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Read a little-endian u64, reporting `context` if the input runs out.
pub fn read_u64_le(r: &mut dyn Read, context: &str) -> Result<u64, ReplayError> {
    let mut buf = [0u8; 8];
    read_exact(r, &mut buf, context)?;
    Ok(u64::from_le_bytes(buf))
}

/// Write a NUL-terminated label.
pub fn write_label(w: &mut dyn Write, label: &str) -> Result<(), ReplayError> {
    w.write_all(label.as_bytes())?;
    w.write_all(&[0])?;
    Ok(())
}

/// Read a NUL-terminated label of at most [`MAX_LABEL_LEN`] bytes.
pub fn read_label(r: &mut dyn Read) -> Result<String, ReplayError> {
    let mut bytes = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        read_exact(r, &mut byte, "region label")?;
        if byte[0] == 0 {
            break;
        }
        if bytes.len() == MAX_LABEL_LEN {
            return Err(ReplayError::MalformedFile {
                detail: format!("region label exceeds {MAX_LABEL_LEN} bytes"),
            });
        }
        bytes.push(byte[0]);
    }
    String::from_utf8(bytes).map_err(|e| ReplayError::MalformedFile {
        detail: format!("region label is not UTF-8: {e}"),
    })
}

fn read_exact(r: &mut dyn Read, buf: &mut [u8], context: &str) -> Result<(), ReplayError> {
    r.read_exact(buf).map_err(|e| truncated_or_io(e, context))
}

fn truncated_or_io(e: std::io::Error, context: &str) -> ReplayError {
    if e.kind() == ErrorKind::UnexpectedEof {
        ReplayError::Truncated {
            context: context.to_string(),
        }
    } else {
        ReplayError::Io(e)
    }
}

fn read_magic(r: &mut dyn Read, context: &str) -> Result<[u8; 8], ReplayError> {
    let mut magic = [0u8; 8];
    read_exact(r, &mut magic, context)?;
    Ok(magic)
}

// ── Header ──────────────────────────────────────────────────────

/// Fixed part of a replay file that precedes the instruction records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayHeader {
    /// Absolute index of the first captured instruction.
    pub instruction_offset: u64,
    /// Number of instruction records that follow.
    pub instruction_count: u64,
    /// Region descriptors.
    pub registry: RegionRegistry,
}

/// Encode the leading magic and the header.
pub fn encode_header(
    w: &mut dyn Write,
    instruction_offset: u64,
    instruction_count: u64,
    registry: &RegionRegistry,
) -> Result<(), ReplayError> {
    w.write_all(&MAGIC)?;
    write_u64_le(w, instruction_offset)?;
    write_u64_le(w, instruction_count)?;
    write_u64_le(w, registry.len() as u64)?;
    for region in registry.iter() {
        write_u64_le(w, region.data_type.ordinal())?;
        write_u64_le(w, region.element_count)?;
        write_u64_le(w, region.element_display_row_stride)?;
        write_label(w, &region.label)?;
    }
    Ok(())
}

/// Decode and validate the leading magic and the header.
pub fn decode_header(r: &mut dyn Read) -> Result<ReplayHeader, ReplayError> {
    let magic = read_magic(r, "leading magic")?;
    if magic != MAGIC {
        return Err(ReplayError::InvalidMagic { found: magic });
    }

    let instruction_offset = read_u64_le(r, "instruction offset")?;
    let instruction_count = read_u64_le(r, "instruction count")?;
    let region_count = read_u64_le(r, "region count")?;
    if region_count == 0 {
        return Err(ReplayError::MalformedFile {
            detail: "region count is zero".into(),
        });
    }

    let mut descriptors = Vec::with_capacity((region_count as usize).min(MAX_PREALLOC));
    for _ in 0..region_count {
        let data_type = DataType::from_ordinal(read_u64_le(r, "region data type")?)?;
        let element_count = read_u64_le(r, "region element count")?;
        let element_display_row_stride = read_u64_le(r, "region display stride")?;
        let label = read_label(r)?;
        descriptors.push(RegionDescriptor {
            data_type,
            element_count,
            element_display_row_stride,
            label,
        });
    }
    let registry = RegionRegistry::new(descriptors)?;

    Ok(ReplayHeader {
        instruction_offset,
        instruction_count,
        registry,
    })
}

// ── Instruction records ─────────────────────────────────────────

/// Encode one instruction record.
///
/// Slots the record does not have are written as empty lists so the
/// reader always sees `region_count` lists.
pub fn encode_instruction(
    w: &mut dyn Write,
    record: &InstructionRecord,
    region_count: usize,
) -> Result<(), ReplayError> {
    for region in 0..region_count {
        let diffs = record.region(region).unwrap_or(&[]);
        write_u64_le(w, diffs.len() as u64)?;
        for diff in diffs {
            write_u64_le(w, diff.byte_offset)?;
            write_u64_le(w, diff.byte_count())?;
            w.write_all(&diff.data)?;
        }
    }
    Ok(())
}

/// Decode one instruction record, validating every diff list against
/// the region sizes in `registry`.
pub fn decode_instruction(
    r: &mut dyn Read,
    registry: &RegionRegistry,
) -> Result<InstructionRecord, ReplayError> {
    let mut record = InstructionRecord::new(registry.len());
    for (region, descriptor) in registry.iter().enumerate() {
        let region_bytes = descriptor.byte_count();
        let diff_count = read_u64_le(r, "diff count")?;
        // Non-overlapping, non-adjacent spans cannot outnumber half the region.
        if diff_count > region_bytes.div_ceil(2) {
            return Err(ReplayError::MalformedFile {
                detail: format!(
                    "region '{}' claims {diff_count} diffs but holds only {region_bytes} bytes",
                    descriptor.label
                ),
            });
        }

        let mut diffs = Vec::with_capacity((diff_count as usize).min(MAX_PREALLOC));
        for _ in 0..diff_count {
            let byte_offset = read_u64_le(r, "diff byte offset")?;
            let byte_count = read_u64_le(r, "diff byte count")?;
            if byte_offset >= region_bytes || byte_count > region_bytes - byte_offset {
                return Err(ReplayError::MalformedFile {
                    detail: format!(
                        "diff [{byte_offset}, +{byte_count}) exceeds region '{}' of {region_bytes} bytes",
                        descriptor.label
                    ),
                });
            }
            let mut data = Vec::new();
            let read = r
                .take(byte_count)
                .read_to_end(&mut data)
                .map_err(|e| truncated_or_io(e, "diff data"))?;
            if read as u64 != byte_count {
                return Err(ReplayError::Truncated {
                    context: "diff data".into(),
                });
            }
            diffs.push(ByteDiff::new(byte_offset, data));
        }
        validate_diff_list(&diffs, region_bytes)?;
        record.set_region(region, diffs);
    }
    Ok(record)
}

// ── Whole file ──────────────────────────────────────────────────

/// Encode a complete replay: magic, header, records, magic.
pub fn encode_replay(w: &mut dyn Write, data: &ReplayData) -> Result<(), ReplayError> {
    encode_header(
        w,
        data.instruction_offset,
        data.instruction_count(),
        &data.registry,
    )?;
    for record in &data.instructions {
        encode_instruction(w, record, data.region_count())?;
    }
    w.write_all(&MAGIC)?;
    Ok(())
}

/// Decode a complete replay.
///
/// Fails if either magic is wrong, the input ends early, any descriptor
/// or diff list is invalid, or bytes follow the trailing magic.
pub fn decode_replay(r: &mut dyn Read) -> Result<ReplayData, ReplayError> {
    let header = decode_header(r)?;

    let capacity = (header.instruction_count as usize).min(MAX_PREALLOC);
    let mut instructions = Vec::with_capacity(capacity);
    for _ in 0..header.instruction_count {
        instructions.push(decode_instruction(r, &header.registry)?);
    }

    let trailer = read_magic(r, "trailing magic")?;
    if trailer != MAGIC {
        return Err(ReplayError::MalformedFile {
            detail: format!(
                "trailing magic mismatch (found {:?})",
                String::from_utf8_lossy(&trailer)
            ),
        });
    }

    let mut extra = [0u8; 1];
    loop {
        match r.read(&mut extra) {
            Ok(0) => break,
            Ok(_) => {
                return Err(ReplayError::MalformedFile {
                    detail: "unexpected bytes after trailing magic".into(),
                })
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ReplayError::Io(e)),
        }
    }

    Ok(ReplayData {
        instruction_offset: header.instruction_offset,
        registry: header.registry,
        instructions,
    })
}

//! Element data types for memory regions.
//!
//! The ordinal of each variant is written to replay files, so the table
//! below is append-only: existing ordinals are never renumbered and
//! readers reject ordinals they do not know instead of guessing a size.

use std::fmt;

use crate::error::CoreError;

/// Version of the ordinal table. Bumped only when variants are appended.
pub const DTYPE_TABLE_VERSION: u32 = 1;

/// Element type of a memory region.
///
/// The numeric and floating-point variants describe how a region's bytes
/// are grouped into elements. The image variants are display-only
/// pseudo-types: their bytes are pixels rather than numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Unsigned 8-bit integer.
    U8,
    /// Unsigned 16-bit integer.
    U16,
    /// Unsigned 32-bit integer.
    U32,
    /// Unsigned 64-bit integer.
    U64,
    /// Signed 8-bit integer.
    I8,
    /// Signed 16-bit integer.
    I16,
    /// Signed 32-bit integer.
    I32,
    /// Signed 64-bit integer.
    I64,
    /// IEEE-754 single precision float.
    F32,
    /// 1-bit image, stored as one byte per pixel.
    R1,
    /// 8-bit grayscale image.
    R8,
    /// 32-bit RGBA image.
    Rgba8,
}

impl DataType {
    /// Every variant, in ordinal order.
    pub const ALL: [DataType; 12] = [
        DataType::U8,
        DataType::U16,
        DataType::U32,
        DataType::U64,
        DataType::I8,
        DataType::I16,
        DataType::I32,
        DataType::I64,
        DataType::F32,
        DataType::R1,
        DataType::R8,
        DataType::Rgba8,
    ];

    /// Size of one element in bytes.
    pub fn element_size(self) -> u64 {
        match self {
            Self::U8 | Self::I8 | Self::R1 | Self::R8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 | Self::Rgba8 => 4,
            Self::U64 | Self::I64 => 8,
        }
    }

    /// Stable on-disk ordinal.
    pub fn ordinal(self) -> u64 {
        match self {
            Self::U8 => 0,
            Self::U16 => 1,
            Self::U32 => 2,
            Self::U64 => 3,
            Self::I8 => 4,
            Self::I16 => 5,
            Self::I32 => 6,
            Self::I64 => 7,
            Self::F32 => 8,
            Self::R1 => 9,
            Self::R8 => 10,
            Self::Rgba8 => 11,
        }
    }

    /// Decode an on-disk ordinal.
    pub fn from_ordinal(ordinal: u64) -> Result<Self, CoreError> {
        Self::ALL
            .iter()
            .copied()
            .find(|dt| dt.ordinal() == ordinal)
            .ok_or(CoreError::UnknownDataType { ordinal })
    }

    /// Whether this is a display-only image type.
    pub fn is_image(self) -> bool {
        matches!(self, Self::R1 | Self::R8 | Self::Rgba8)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F32 => "f32",
            Self::R1 => "r1",
            Self::R8 => "r8",
            Self::Rgba8 => "rgba8",
        };
        f.write_str(name)
    }
}

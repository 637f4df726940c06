//! Memory region descriptors and the per-recording region registry.
//!
//! A region is a fixed-size, typed byte buffer holding one piece of
//! emulated machine state (RAM, registers, display, ...). The set of
//! regions is fixed when a recording starts; order matters and must match
//! between a recorder and any reader, and between two files under comparison.

use std::fmt;

use indexmap::IndexMap;

use crate::dtype::DataType;
use crate::error::CoreError;

/// Longest label, in bytes, that a region may carry.
///
/// Labels are stored NUL-terminated on disk; readers refuse labels longer
/// than this so a corrupt file cannot make them scan unbounded input.
pub const MAX_LABEL_LEN: usize = 255;

/// Static description of one memory region.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RegionDescriptor {
    /// Element type.
    pub data_type: DataType,
    /// Number of elements in the region.
    pub element_count: u64,
    /// Elements per display row. Zero marks a flag-style region.
    pub element_display_row_stride: u64,
    /// Human-readable name, unique within a registry.
    pub label: String,
}

impl RegionDescriptor {
    /// Create a descriptor.
    pub fn new(
        data_type: DataType,
        element_count: u64,
        element_display_row_stride: u64,
        label: impl Into<String>,
    ) -> Self {
        Self {
            data_type,
            element_count,
            element_display_row_stride,
            label: label.into(),
        }
    }

    /// Size of the region in bytes, or `None` on overflow.
    pub fn checked_byte_count(&self) -> Option<u64> {
        self.data_type.element_size().checked_mul(self.element_count)
    }

    /// Size of the region in bytes.
    ///
    /// Only meaningful for validated descriptors; saturates otherwise.
    pub fn byte_count(&self) -> u64 {
        self.checked_byte_count().unwrap_or(u64::MAX)
    }

    /// Check that the descriptor can back a real buffer and be written to disk.
    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid = |reason: String| CoreError::InvalidRegion {
            label: self.label.clone(),
            reason,
        };
        if self.element_count == 0 {
            return Err(invalid("element count must be non-zero".into()));
        }
        let bytes = self
            .checked_byte_count()
            .ok_or_else(|| invalid("byte count overflows u64".into()))?;
        if usize::try_from(bytes).is_err() {
            return Err(invalid(format!("{bytes} bytes do not fit in memory")));
        }
        if self.label.is_empty() {
            return Err(invalid("label must not be empty".into()));
        }
        if self.label.len() > MAX_LABEL_LEN {
            return Err(invalid(format!(
                "label is {} bytes, limit is {MAX_LABEL_LEN}",
                self.label.len()
            )));
        }
        if self.label.as_bytes().contains(&0) {
            return Err(invalid("label contains a NUL byte".into()));
        }
        Ok(())
    }
}

impl fmt::Display for RegionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} x {}, stride {}]",
            self.label, self.data_type, self.element_count, self.element_display_row_stride
        )
    }
}

/// First difference found between two region registries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegionMismatch {
    /// The registries hold a different number of regions.
    Count {
        /// Region count on the left side.
        left: usize,
        /// Region count on the right side.
        right: usize,
    },
    /// Region `index` differs in its data type.
    DataType {
        /// Region index.
        index: usize,
        /// Left data type.
        left: DataType,
        /// Right data type.
        right: DataType,
    },
    /// Region `index` differs in its element count.
    ElementCount {
        /// Region index.
        index: usize,
        /// Left element count.
        left: u64,
        /// Right element count.
        right: u64,
    },
    /// Region `index` differs in its display row stride.
    DisplayStride {
        /// Region index.
        index: usize,
        /// Left stride.
        left: u64,
        /// Right stride.
        right: u64,
    },
    /// Region `index` differs in its label.
    Label {
        /// Region index.
        index: usize,
        /// Left label.
        left: String,
        /// Right label.
        right: String,
    },
}

impl fmt::Display for RegionMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count { left, right } => {
                write!(f, "region count differs: {left} vs {right}")
            }
            Self::DataType { index, left, right } => {
                write!(f, "region {index} data type differs: {left} vs {right}")
            }
            Self::ElementCount { index, left, right } => {
                write!(f, "region {index} element count differs: {left} vs {right}")
            }
            Self::DisplayStride { index, left, right } => {
                write!(f, "region {index} display stride differs: {left} vs {right}")
            }
            Self::Label { index, left, right } => {
                write!(f, "region {index} label differs: '{left}' vs '{right}'")
            }
        }
    }
}

/// Ordered, label-indexed set of region descriptors.
///
/// Insertion order is the region order used by recorders and readers.
/// Every descriptor is validated on construction and labels are unique.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionRegistry {
    regions: IndexMap<String, RegionDescriptor>,
}

impl RegionRegistry {
    /// Build a registry from descriptors in region order.
    pub fn new(descriptors: impl IntoIterator<Item = RegionDescriptor>) -> Result<Self, CoreError> {
        let mut regions = IndexMap::new();
        for descriptor in descriptors {
            descriptor.validate()?;
            if regions.contains_key(&descriptor.label) {
                return Err(CoreError::DuplicateLabel {
                    label: descriptor.label,
                });
            }
            regions.insert(descriptor.label.clone(), descriptor);
        }
        if regions.is_empty() {
            return Err(CoreError::NoRegions);
        }
        Ok(Self { regions })
    }

    /// Number of regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Always false: a registry holds at least one region.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Descriptor at `index`.
    pub fn get(&self, index: usize) -> Option<&RegionDescriptor> {
        self.regions.get_index(index).map(|(_, d)| d)
    }

    /// Region index for `label`.
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.regions.get_index_of(label)
    }

    /// Descriptors in region order.
    pub fn iter(&self) -> impl Iterator<Item = &RegionDescriptor> {
        self.regions.values()
    }

    /// Byte size of region `index`.
    pub fn byte_count(&self, index: usize) -> Option<u64> {
        self.get(index).map(RegionDescriptor::byte_count)
    }

    /// Sum of all region sizes in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.iter().map(RegionDescriptor::byte_count).sum()
    }

    /// Zero-filled buffers, one per region, sized to match.
    ///
    /// Fails with [`CoreError::AllocationFailed`] when a region is too
    /// large to allocate.
    pub fn zeroed_buffers(&self) -> Result<Vec<Vec<u8>>, CoreError> {
        self.iter()
            .map(|d| {
                let bytes = d.byte_count();
                let failed = || CoreError::AllocationFailed {
                    label: d.label.clone(),
                    bytes,
                };
                let len = usize::try_from(bytes).map_err(|_| failed())?;
                let mut buffer = Vec::new();
                buffer.try_reserve_exact(len).map_err(|_| failed())?;
                buffer.resize(len, 0);
                Ok(buffer)
            })
            .collect()
    }

    /// Compare against another registry, returning the first mismatch.
    pub fn check_compatible(&self, other: &RegionRegistry) -> Result<(), RegionMismatch> {
        if self.len() != other.len() {
            return Err(RegionMismatch::Count {
                left: self.len(),
                right: other.len(),
            });
        }
        for (index, (a, b)) in self.iter().zip(other.iter()).enumerate() {
            if a.data_type != b.data_type {
                return Err(RegionMismatch::DataType {
                    index,
                    left: a.data_type,
                    right: b.data_type,
                });
            }
            if a.element_count != b.element_count {
                return Err(RegionMismatch::ElementCount {
                    index,
                    left: a.element_count,
                    right: b.element_count,
                });
            }
            if a.element_display_row_stride != b.element_display_row_stride {
                return Err(RegionMismatch::DisplayStride {
                    index,
                    left: a.element_display_row_stride,
                    right: b.element_display_row_stride,
                });
            }
            if a.label != b.label {
                return Err(RegionMismatch::Label {
                    index,
                    left: a.label.clone(),
                    right: b.label.clone(),
                });
            }
        }
        Ok(())
    }
}

//! Generation-checked handle table.
//!
//! Hands out opaque `u64` tokens for owned values. A token whose value
//! has been removed never resolves again, even after its slot is reused,
//! so closing twice or using a closed handle is a detectable error rather
//! than an access to someone else's recording.

/// A decoded table token: slot index plus the generation it was issued in.
///
/// On the wire the slot occupies the high 32 bits and the generation the low 32.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawHandle {
    /// Slot index.
    pub slot: u32,
    /// Generation the slot had when the handle was issued.
    pub generation: u32,
}

impl RawHandle {
    /// Pack into the `u64` token form.
    pub fn to_bits(self) -> u64 {
        (u64::from(self.slot) << 32) | u64::from(self.generation)
    }

    /// Unpack a `u64` token.
    pub fn from_bits(bits: u64) -> Self {
        Self {
            slot: (bits >> 32) as u32,
            generation: bits as u32,
        }
    }
}

#[derive(Debug)]
struct Entry<T> {
    generation: u32,
    value: Option<T>,
}

/// Owns values and maps [`RawHandle`]s to them.
///
/// Freed slots are reused through a free list; each removal bumps the
/// slot's generation. A slot whose generation would wrap to zero is
/// retired instead of reused.
#[derive(Debug)]
pub struct HandleTable<T> {
    entries: Vec<Entry<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HandleTable<T> {
    /// An empty table.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether no values are live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Store `value` and return its handle.
    pub fn insert(&mut self, value: T) -> RawHandle {
        self.live += 1;
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.entries[slot as usize];
            entry.value = Some(value);
            return RawHandle {
                slot,
                generation: entry.generation,
            };
        }
        let slot = self.entries.len() as u32;
        self.entries.push(Entry {
            generation: 0,
            value: Some(value),
        });
        RawHandle {
            slot,
            generation: 0,
        }
    }

    fn entry(&self, handle: RawHandle) -> Option<&Entry<T>> {
        self.entries
            .get(handle.slot as usize)
            .filter(|e| e.generation == handle.generation)
    }

    /// Whether `handle` currently resolves.
    pub fn contains(&self, handle: RawHandle) -> bool {
        self.get(handle).is_some()
    }

    /// The value behind `handle`, or `None` if it is stale or unknown.
    pub fn get(&self, handle: RawHandle) -> Option<&T> {
        self.entry(handle)?.value.as_ref()
    }

    /// Mutable access to the value behind `handle`.
    pub fn get_mut(&mut self, handle: RawHandle) -> Option<&mut T> {
        let entry = self.entries.get_mut(handle.slot as usize)?;
        if entry.generation != handle.generation {
            return None;
        }
        entry.value.as_mut()
    }

    /// Take the value behind `handle` out of the table, invalidating it.
    pub fn remove(&mut self, handle: RawHandle) -> Option<T> {
        let entry = self.entries.get_mut(handle.slot as usize)?;
        if entry.generation != handle.generation {
            return None;
        }
        let value = entry.value.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        // A wrapped generation would let generation-0 tokens resolve again.
        if entry.generation != 0 {
            self.free.push(handle.slot);
        }
        self.live -= 1;
        Some(value)
    }

    /// Remove every live value, in slot order.
    pub fn drain(&mut self) -> Vec<T> {
        let mut values = Vec::with_capacity(self.live);
        for slot in 0..self.entries.len() as u32 {
            let generation = self.entries[slot as usize].generation;
            if let Some(value) = self.remove(RawHandle { slot, generation }) {
                values.push(value);
            }
        }
        values
    }
}

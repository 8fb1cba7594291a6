//! Byte ranges into a [`SerializedData`](crate::buffer::SerializedData) arena and the
//! per-entity records built from them.
//!
//! Producers write into the arena in increasing offset order, so merging only
//! ever needs to look at the most recently added range. Adding ranges out of
//! order still produces a valid message, it just skips coalescing.

use bytes::{BufMut, BytesMut};

use crate::buffer::SerializedData;
use crate::varint;

/// Half-open `[start, end)` span of bytes inside one arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ByteRange {
    start: usize,
    end: usize,
}

impl ByteRange {
    pub fn new(start: usize, end: usize) -> Self {
        assert!(end >= start, "range end {end} is before start {start}");
        Self { start, end }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn is_adjacent_to(&self, next: &ByteRange) -> bool {
        self.end == next.start
    }

    /// Union of `self` and `next` if `next` starts exactly where `self` ends.
    pub fn merged(&self, next: &ByteRange) -> Option<ByteRange> {
        self.is_adjacent_to(next).then(|| ByteRange::new(self.start, next.end))
    }

    pub fn as_range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// Ordered list of ranges with single-lookback coalescing.
///
/// `count` is the number of logical writes pushed, which stays correct after
/// adjacent ranges collapse into one entry.
#[derive(Debug, Clone, Default)]
pub struct CoalescedRanges {
    ranges: Vec<ByteRange>,
    count: usize,
}

impl CoalescedRanges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, range: ByteRange) {
        self.count += 1;

        if let Some(last) = self.ranges.last_mut() {
            if let Some(merged) = last.merged(&range) {
                *last = merged;
                return;
            }
        }

        self.ranges.push(range);
    }

    pub fn ranges(&self) -> &[ByteRange] {
        &self.ranges
    }

    /// Logical element count.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn byte_len(&self) -> usize {
        self.ranges.iter().map(ByteRange::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
        self.count = 0;
    }
}

/// Change-range record: one entity and the components written for it.
#[derive(Debug, Clone)]
pub struct EntityRanges {
    pub entity: ByteRange,
    pub components: CoalescedRanges,
}

impl EntityRanges {
    pub fn new(entity: ByteRange, mut components: CoalescedRanges) -> Self {
        components.clear();
        Self { entity, components }
    }

    pub fn add_component(&mut self, component: ByteRange) {
        self.components.push(component);
    }

    pub fn components_len(&self) -> usize {
        self.components.count()
    }

    /// Bytes this record occupies in a message: entity, component count, component data.
    pub fn size(&self) -> usize {
        self.entity.len()
            + varint::encoded_len(self.components_len() as u32)
            + self.components.byte_len()
    }

    pub(crate) fn write_to(&self, data: &SerializedData, message: &mut BytesMut) {
        message.put_slice(data.get_range(self.entity));
        varint::write_varint(message, self.components_len() as u32);
        for &range in self.components.ranges() {
            message.put_slice(data.get_range(range));
        }
    }
}

/// Removal record: one entity plus a contiguous run of removed component type ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalRanges {
    pub entity: ByteRange,
    pub ids_len: usize,
    pub fn_ids: ByteRange,
}

impl RemovalRanges {
    pub fn size(&self) -> usize {
        self.entity.len() + varint::encoded_len(self.ids_len as u32) + self.fn_ids.len()
    }

    pub(crate) fn write_to(&self, data: &SerializedData, message: &mut BytesMut) {
        message.put_slice(data.get_range(self.entity));
        varint::write_varint(message, self.ids_len as u32);
        message.put_slice(data.get_range(self.fn_ids));
    }
}

/// Where a builder is in the "start entity, add entity, add components" sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum EntityState {
    #[default]
    Idle,
    /// Started, entity not written yet.
    Pending,
    /// Entity written, accepting components.
    Open,
}

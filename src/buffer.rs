use bytes::{BufMut, BytesMut};

use crate::config::WireConfig;
use crate::protocol::{EntityId, EntityMapping, FnId, Tick};
use crate::ranges::ByteRange;
use crate::varint;

/// Append-only arena holding every value written for one outgoing message.
///
/// Each `write_*` appends at the end and returns the range it occupies, so
/// builders keep ranges instead of copies. [`clear`](Self::clear) resets the
/// length but keeps the allocation for the next tick.
///
/// Slices from [`get_range`](Self::get_range) borrow the arena, so the borrow
/// checker rules out clearing while they are still alive.
#[derive(Debug, Default)]
pub struct SerializedData {
    buffer: BytesMut,
}

impl SerializedData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    pub fn with_config(config: &WireConfig) -> Self {
        Self::with_capacity(config.initial_capacity)
    }

    fn write_with(&mut self, write: impl FnOnce(&mut BytesMut)) -> ByteRange {
        let start = self.buffer.len();
        write(&mut self.buffer);
        ByteRange::new(start, self.buffer.len())
    }

    pub fn write_entity(&mut self, entity: EntityId) -> ByteRange {
        self.write_with(|buf| varint::write_varint(buf, entity))
    }

    pub fn write_tick(&mut self, tick: Tick) -> ByteRange {
        self.write_with(|buf| varint::write_varint(buf, tick))
    }

    pub fn write_u32(&mut self, value: u32) -> ByteRange {
        self.write_with(|buf| varint::write_varint(buf, value))
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> ByteRange {
        self.write_with(|buf| buf.put_slice(bytes))
    }

    /// Writes removed component type ids as one contiguous run, without a count.
    pub fn write_fn_ids(&mut self, fn_ids: &[FnId]) -> ByteRange {
        self.write_with(|buf| {
            for &fn_id in fn_ids {
                varint::write_varint(buf, fn_id);
            }
        })
    }

    /// Writes mapping pairs without a count; the Updates message supplies it.
    pub fn write_mappings(&mut self, mappings: &[EntityMapping]) -> ByteRange {
        self.write_with(|buf| {
            for &mapping in mappings {
                varint::write_entity_pair(buf, mapping);
            }
        })
    }

    /// Writes one component as `[fn_id][size][payload]`.
    pub fn write_component(&mut self, fn_id: FnId, payload: &[u8]) -> ByteRange {
        self.write_with(|buf| {
            varint::write_varint(buf, fn_id);
            varint::write_varint(buf, payload.len() as u32);
            buf.put_slice(payload);
        })
    }

    /// Writes a counted entity array, optionally delta encoded.
    pub fn write_entities(&mut self, entities: &[EntityId], delta: bool) -> ByteRange {
        self.write_with(|buf| varint::write_entities(buf, entities, delta))
    }

    pub fn get_range(&self, range: ByteRange) -> &[u8] {
        &self.buffer[range.as_range()]
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_follow_writes() {
        let mut data = SerializedData::new();

        let entity = data.write_entity(42);
        let tick = data.write_tick(100);
        let value = data.write_u32(1000);

        assert_eq!(entity, ByteRange::new(0, 1));
        assert_eq!(tick, ByteRange::new(1, 2));
        assert_eq!(value, ByteRange::new(2, 4));
        assert_eq!(data.len(), 4);

        let (decoded, read) = varint::decode_varint(data.get_range(value), 0).unwrap();
        assert_eq!(decoded, 1000);
        assert_eq!(read, 2);
    }

    #[test]
    fn test_writes_are_adjacent() {
        let mut data = SerializedData::new();

        let first = data.write_bytes(&[1, 2, 3]);
        let second = data.write_component(7, &[9, 9]);

        assert!(first.is_adjacent_to(&second));
        assert_eq!(data.get_range(second), &[7, 2, 9, 9]);
        assert_eq!(data.get_range(first), &[1, 2, 3]);
    }

    #[test]
    fn test_fn_ids_run() {
        let mut data = SerializedData::new();
        data.write_bytes(&[0xEE]);

        let range = data.write_fn_ids(&[1, 300, 2]);
        assert_eq!(range.start(), 1);
        assert_eq!(data.get_range(range), &[0x01, 0xAC, 0x02, 0x02]);
    }

    #[test]
    fn test_mappings_have_no_count() {
        let mut data = SerializedData::new();
        let range = data.write_mappings(&[EntityMapping::new(10, 1000), EntityMapping::new(20, 2000)]);

        assert_eq!(data.get_range(range), &[10, 0xE8, 0x07, 20, 0xD0, 0x0F]);
    }

    #[test]
    fn test_delta_entities() {
        let mut data = SerializedData::new();
        let range = data.write_entities(&[500, 501, 502], true);

        let decoded = varint::read_entities(&mut data.get_range(range), true).unwrap();
        assert_eq!(decoded, vec![500, 501, 502]);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut data = SerializedData::with_capacity(64);
        for entity in 0..32 {
            data.write_entity(entity);
        }

        let capacity = data.capacity();
        data.clear();

        assert!(data.is_empty());
        assert_eq!(data.capacity(), capacity);
        assert_eq!(data.write_entity(5), ByteRange::new(0, 1));
    }

    #[test]
    fn test_with_config_capacity() {
        let config = WireConfig::new().with_initial_capacity(256);
        let data = SerializedData::with_config(&config);
        assert!(data.capacity() >= 256);
    }
}

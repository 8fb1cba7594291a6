//! One-shot structural diff for a tick: entity mappings, despawns, component
//! removals and component insertions.
//!
//! Layout: `[flags: u8][server_tick][mappings?][despawns?][removals?][changes?]`.
//! Every present segment except the last is prefixed with its element count.
//! The last one has no count and runs until the end of the message.

use std::time::Instant;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::buffer::SerializedData;
use crate::config::WireConfig;
use crate::debug;
use crate::error::{Result, WireError};
use crate::flags::UpdateFlags;
use crate::protocol::{ComponentRemovals, EntityChanges, Tick, UpdatesMessage};
use crate::ranges::{ByteRange, CoalescedRanges, EntityRanges, EntityState, RemovalRanges};
use crate::varint::{self, ensure_remaining, read_varint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
enum Section {
    #[default]
    Mappings,
    Despawns,
    Removals,
    Changes,
}

/// Builder for an Updates message.
///
/// Sections must be filled in wire order: [`set_mappings`](Self::set_mappings),
/// then [`add_despawn`](Self::add_despawn), then [`add_removals`](Self::add_removals),
/// then entity changes. Going back to an earlier section panics.
///
/// Ranges must come from a single [`SerializedData`] and be added in the order
/// they were written; adjacent ranges are coalesced by looking at the previous one only.
#[derive(Debug, Default)]
pub struct Updates {
    mappings: Option<ByteRange>,
    mappings_len: usize,
    despawns: CoalescedRanges,
    removals: Vec<RemovalRanges>,
    changes: Vec<EntityRanges>,
    changes_state: EntityState,
    section: Section,
    ranges_pool: Vec<CoalescedRanges>,
}

impl Updates {
    pub fn new() -> Self {
        Self::default()
    }

    fn enter(&mut self, section: Section) {
        assert!(
            section >= self.section,
            "{section:?} written after {:?}",
            self.section
        );
        self.section = section;
    }

    /// Sets the mapping pairs written by [`SerializedData::write_mappings`].
    pub fn set_mappings(&mut self, mappings: ByteRange, len: usize) {
        self.enter(Section::Mappings);
        assert!(
            self.mappings.is_none(),
            "mappings can only be set once per message"
        );

        if len > 0 {
            self.mappings = Some(mappings);
            self.mappings_len = len;
        }
    }

    pub fn add_despawn(&mut self, entity: ByteRange) {
        self.enter(Section::Despawns);
        self.despawns.push(entity);
    }

    /// Adds removed components for `entity`; `fn_ids` holds `ids_len` type ids
    /// written by [`SerializedData::write_fn_ids`].
    pub fn add_removals(&mut self, entity: ByteRange, ids_len: usize, fn_ids: ByteRange) {
        self.enter(Section::Removals);
        self.removals.push(RemovalRanges {
            entity,
            ids_len,
            fn_ids,
        });
    }

    /// Starts collecting changes for a new entity.
    ///
    /// The entity itself is added lazily with [`add_changed_entity`](Self::add_changed_entity),
    /// usually right before its first component.
    pub fn start_entity_changes(&mut self) {
        self.enter(Section::Changes);
        self.changes_state = EntityState::Pending;
    }

    pub fn changed_entity_added(&self) -> bool {
        self.changes_state == EntityState::Open
    }

    pub fn add_changed_entity(&mut self, entity: ByteRange) {
        assert_eq!(
            self.changes_state,
            EntityState::Pending,
            "changed entity must follow `start_entity_changes`, once per entity"
        );

        let components = self.ranges_pool.pop().unwrap_or_default();
        self.changes.push(EntityRanges::new(entity, components));
        self.changes_state = EntityState::Open;
    }

    pub fn add_inserted_component(&mut self, component: ByteRange) {
        match self.changes.last_mut() {
            Some(entity) if self.changes_state == EntityState::Open => {
                entity.add_component(component)
            }
            _ => panic!("inserted component before a changed entity was added"),
        }
    }

    /// Segments with content, derived on every call.
    pub fn flags(&self) -> UpdateFlags {
        let mut flags = UpdateFlags::empty();

        if self.mappings_len > 0 {
            flags.add_flag(UpdateFlags::MAPPINGS);
        }
        if !self.despawns.is_empty() {
            flags.add_flag(UpdateFlags::DESPAWNS);
        }
        if !self.removals.is_empty() {
            flags.add_flag(UpdateFlags::REMOVALS);
        }
        if !self.changes.is_empty() {
            flags.add_flag(UpdateFlags::CHANGES);
        }

        flags
    }

    pub fn is_empty(&self) -> bool {
        self.flags().is_empty()
    }

    pub fn mappings_len(&self) -> usize {
        self.mappings_len
    }

    pub fn despawns_len(&self) -> usize {
        self.despawns.count()
    }

    pub fn removals_len(&self) -> usize {
        self.removals.len()
    }

    pub fn changes_len(&self) -> usize {
        self.changes.len()
    }

    // `flag` is always a single segment flag.
    fn segment_len(&self, flag: UpdateFlags) -> usize {
        if flag == UpdateFlags::MAPPINGS {
            self.mappings_len
        } else if flag == UpdateFlags::DESPAWNS {
            self.despawns.count()
        } else if flag == UpdateFlags::REMOVALS {
            self.removals.len()
        } else {
            self.changes.len()
        }
    }

    fn segment_size(&self, flag: UpdateFlags) -> usize {
        if flag == UpdateFlags::MAPPINGS {
            self.mappings.map(|range| range.len()).unwrap_or(0)
        } else if flag == UpdateFlags::DESPAWNS {
            self.despawns.byte_len()
        } else if flag == UpdateFlags::REMOVALS {
            self.removals.iter().map(RemovalRanges::size).sum()
        } else {
            self.changes.iter().map(EntityRanges::size).sum()
        }
    }

    fn write_segment(&self, flag: UpdateFlags, data: &SerializedData, message: &mut BytesMut) {
        if flag == UpdateFlags::MAPPINGS {
            if let Some(range) = self.mappings {
                message.put_slice(data.get_range(range));
            }
        } else if flag == UpdateFlags::DESPAWNS {
            for &range in self.despawns.ranges() {
                message.put_slice(data.get_range(range));
            }
        } else if flag == UpdateFlags::REMOVALS {
            for removal in &self.removals {
                removal.write_to(data, message);
            }
        } else {
            for entity in &self.changes {
                entity.write_to(data, message);
            }
        }
    }

    /// Exact length of the message [`serialize`](Self::serialize) produces.
    pub fn serialized_size(&self, server_tick: Tick) -> usize {
        let flags = self.flags();
        let last = flags.last_flag();

        let mut size = 1 + varint::encoded_len(server_tick);
        for flag in flags.set_flags() {
            if flag != last {
                size += varint::encoded_len(self.segment_len(flag) as u32);
            }
            size += self.segment_size(flag);
        }

        size
    }

    /// Copies all referenced ranges out of `data` into one message.
    pub fn serialize(&self, data: &SerializedData, server_tick: Tick) -> Bytes {
        let started = debug::is_trace_enabled().then(Instant::now);

        let flags = self.flags();
        let last = flags.last_flag();

        let mut message = BytesMut::with_capacity(self.serialized_size(server_tick));
        message.put_u8(flags.bits());
        varint::write_varint(&mut message, server_tick);

        for flag in flags.set_flags() {
            if flag != last {
                varint::write_varint(&mut message, self.segment_len(flag) as u32);
            }
            self.write_segment(flag, data, &mut message);
        }

        let message = message.freeze();
        if let Some(started) = started {
            debug::trace_serialization("updates", message.len(), started.elapsed().as_micros());
        }

        message
    }

    /// Resets for the next tick, keeping allocations.
    pub fn clear(&mut self) {
        self.mappings = None;
        self.mappings_len = 0;
        self.despawns.clear();
        self.removals.clear();
        self.ranges_pool
            .extend(self.changes.drain(..).map(|entity| entity.components));
        self.changes_state = EntityState::Idle;
        self.section = Section::Mappings;
    }

    pub fn deserialize(message: Bytes) -> Result<UpdatesMessage> {
        Self::deserialize_with_config(message, &WireConfig::default())
    }

    pub fn deserialize_with_config(mut message: Bytes, config: &WireConfig) -> Result<UpdatesMessage> {
        let started = debug::is_trace_enabled().then(Instant::now);
        let size = message.len();

        if size > config.max_message_size {
            return Err(WireError::MessageTooLarge {
                size,
                max: config.max_message_size,
            });
        }

        ensure_remaining(&message, 1)?;
        let bits = message.get_u8();
        let flags = UpdateFlags::from_bits(bits).ok_or(WireError::InvalidFlags(bits))?;
        let last = flags.last_flag();

        let mut updates = UpdatesMessage {
            server_tick: read_varint(&mut message)?,
            ..Default::default()
        };

        for flag in flags.set_flags() {
            let count = if flag == last {
                None
            } else {
                Some(read_varint(&mut message)?)
            };

            if flag == UpdateFlags::MAPPINGS {
                updates.mappings = read_segment(&mut message, count, |m| varint::read_entity_pair(m))?;
            } else if flag == UpdateFlags::DESPAWNS {
                updates.despawns = read_segment(&mut message, count, |m| read_varint(m))?;
            } else if flag == UpdateFlags::REMOVALS {
                updates.removals = read_segment(&mut message, count, |m| {
                    ComponentRemovals::read(m, config.max_fn_ids_per_removal)
                })?;
            } else {
                updates.changes = read_segment(&mut message, count, |m| {
                    EntityChanges::read(m, config.max_components_per_entity)
                })?;
            }
        }

        if message.has_remaining() {
            return Err(WireError::TrailingBytes(message.remaining()));
        }

        if let Some(started) = started {
            debug::trace_deserialization("updates", size, started.elapsed().as_micros());
        }
        debug::log_updates("Received", &updates);

        Ok(updates)
    }
}

/// Reads `count` elements, or until the message ends when there is no count.
fn read_segment<T>(
    message: &mut Bytes,
    count: Option<u32>,
    mut read: impl FnMut(&mut Bytes) -> Result<T>,
) -> Result<Vec<T>> {
    let mut elements = Vec::new();

    match count {
        Some(count) => {
            for _ in 0..count {
                elements.push(read(message)?);
            }
        }
        None => {
            while message.has_remaining() {
                elements.push(read(message)?);
            }
        }
    }

    Ok(elements)
}

//! Steady-state component value stream, sent independently of Updates.
//!
//! Layout: `[update_tick][server_tick]{[entity][count][component] x count}*`
//! with entities continuing until the end of the message. There is only one
//! kind of segment, so no flags byte.

use std::time::Instant;

use bytes::{Buf, Bytes, BytesMut};

use crate::buffer::SerializedData;
use crate::config::WireConfig;
use crate::debug;
use crate::error::{Result, WireError};
use crate::protocol::{EntityChanges, MutationsMessage, Tick};
use crate::ranges::{ByteRange, CoalescedRanges, EntityRanges, EntityState};
use crate::varint::{self, read_varint};

/// Builder for a Mutations message.
///
/// Open each entity with [`start_entity`](Self::start_entity), add it with
/// [`add_entity`](Self::add_entity) once it has something to send, then attach
/// its components. Ranges follow the same single-arena, written-order rules as
/// [`Updates`](crate::updates::Updates).
#[derive(Debug, Default)]
pub struct Mutations {
    entities: Vec<EntityRanges>,
    state: EntityState,
    update_tick: Tick,
    server_tick: Tick,
    ranges_pool: Vec<CoalescedRanges>,
}

impl Mutations {
    pub fn new() -> Self {
        Self::default()
    }

    /// `update_tick` is the last Updates tick these values depend on,
    /// `server_tick` the tick they were sampled at.
    pub fn set_ticks(&mut self, update_tick: Tick, server_tick: Tick) {
        self.update_tick = update_tick;
        self.server_tick = server_tick;
    }

    pub fn update_tick(&self) -> Tick {
        self.update_tick
    }

    pub fn server_tick(&self) -> Tick {
        self.server_tick
    }

    pub fn start_entity(&mut self) {
        self.state = EntityState::Pending;
    }

    /// Whether the entity opened by the last [`start_entity`](Self::start_entity) was written.
    pub fn entity_was_added(&self) -> bool {
        self.state == EntityState::Open
    }

    pub fn add_entity(&mut self, entity: ByteRange) {
        assert_eq!(
            self.state,
            EntityState::Pending,
            "mutated entity must follow `start_entity`, once per entity"
        );

        let components = self.ranges_pool.pop().unwrap_or_default();
        self.entities.push(EntityRanges::new(entity, components));
        self.state = EntityState::Open;
    }

    pub fn add_component(&mut self, component: ByteRange) {
        match self.entities.last_mut() {
            Some(entity) if self.state == EntityState::Open => entity.add_component(component),
            _ => panic!("mutated component before an entity was added"),
        }
    }

    pub fn entities_len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn header_size(&self) -> usize {
        varint::encoded_len(self.update_tick) + varint::encoded_len(self.server_tick)
    }

    fn write_header(&self, message: &mut BytesMut) {
        varint::write_varint(message, self.update_tick);
        varint::write_varint(message, self.server_tick);
    }

    pub fn serialized_size(&self) -> usize {
        self.header_size() + self.entities.iter().map(EntityRanges::size).sum::<usize>()
    }

    pub fn serialize(&self, data: &SerializedData) -> Bytes {
        let started = debug::is_trace_enabled().then(Instant::now);

        let mut message = BytesMut::with_capacity(self.serialized_size());
        self.write_header(&mut message);
        for entity in &self.entities {
            entity.write_to(data, &mut message);
        }

        let message = message.freeze();
        if let Some(started) = started {
            debug::trace_serialization("mutations", message.len(), started.elapsed().as_micros());
        }

        message
    }

    /// Packs entities into messages of at most `max_size` bytes, each with the full header.
    ///
    /// Entities are never split, so one that does not fit even in an empty
    /// message is sent alone and exceeds the limit. Returns no messages if
    /// there are no entities.
    pub fn serialize_split(&self, data: &SerializedData, max_size: usize) -> Vec<Bytes> {
        let mut messages = Vec::new();
        if self.entities.is_empty() {
            return messages;
        }

        let header_size = self.header_size();
        let mut message = BytesMut::with_capacity(self.serialized_size().min(max_size));
        self.write_header(&mut message);

        for entity in &self.entities {
            if message.len() > header_size && message.len() + entity.size() > max_size {
                messages.push(message.split().freeze());
                self.write_header(&mut message);
            }
            entity.write_to(data, &mut message);
        }
        messages.push(message.freeze());

        if debug::is_trace_enabled() {
            tracing::trace!(target: "tx2_wire", "split {} mutated entities into {} messages",
                self.entities.len(), messages.len());
        }

        messages
    }

    /// Resets for the next batch, keeping allocations.
    pub fn clear(&mut self) {
        self.ranges_pool
            .extend(self.entities.drain(..).map(|entity| entity.components));
        self.state = EntityState::Idle;
        self.update_tick = 0;
        self.server_tick = 0;
    }

    pub fn deserialize(message: Bytes) -> Result<MutationsMessage> {
        Self::deserialize_with_config(message, &WireConfig::default())
    }

    pub fn deserialize_with_config(mut message: Bytes, config: &WireConfig) -> Result<MutationsMessage> {
        let started = debug::is_trace_enabled().then(Instant::now);
        let size = message.len();

        if size > config.max_message_size {
            return Err(WireError::MessageTooLarge {
                size,
                max: config.max_message_size,
            });
        }

        let update_tick = read_varint(&mut message)?;
        let server_tick = read_varint(&mut message)?;

        let mut entities = Vec::new();
        while message.has_remaining() {
            entities.push(EntityChanges::read(&mut message, config.max_components_per_entity)?);
        }

        let mutations = MutationsMessage {
            update_tick,
            server_tick,
            entities,
        };

        if let Some(started) = started {
            debug::trace_deserialization("mutations", size, started.elapsed().as_micros());
        }
        debug::log_mutations("Received", &mutations);

        Ok(mutations)
    }
}

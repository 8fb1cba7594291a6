//! Base-128 variable-length integers.
//!
//! Seven value bits per byte, least significant group first, with the high bit
//! set on every byte except the last. Values below 128 take one byte, below
//! 16 384 two bytes, and so on up to five bytes for a full `u32`.
//!
//! Entities, counts, ticks and component type ids all go through this codec.

use bytes::{Buf, BufMut};

use crate::error::{Result, WireError};
use crate::protocol::{EntityId, EntityMapping};

/// Longest accepted encoding. Anything longer is rejected on decode.
pub const MAX_VARINT_LEN: usize = 5;

const CONTINUATION: u8 = 0x80;
const PAYLOAD: u8 = 0x7F;

/// Number of bytes `value` occupies once encoded.
pub fn encoded_len(value: u32) -> usize {
    let bits = (u32::BITS - value.leading_zeros()) as usize;
    bits.div_ceil(7).max(1)
}

pub fn write_varint<B: BufMut>(buf: &mut B, mut value: u32) {
    while value >= u32::from(CONTINUATION) {
        buf.put_u8((value as u8 & PAYLOAD) | CONTINUATION);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

pub fn encode_varint(value: u32) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(value));
    write_varint(&mut out, value);
    out
}

/// Reads one varint, advancing `buf` past it.
pub fn read_varint<B: Buf>(buf: &mut B) -> Result<u32> {
    let mut value = 0u32;

    for index in 0..MAX_VARINT_LEN {
        ensure_remaining(buf, 1)?;
        let byte = buf.get_u8();

        if index == MAX_VARINT_LEN - 1 {
            if byte & CONTINUATION != 0 {
                return Err(WireError::VarintTooLong {
                    max: MAX_VARINT_LEN,
                });
            }
            // Only the low 4 bits of the fifth byte fit into 32 bits.
            if byte > 0x0F {
                return Err(WireError::VarintOverflow);
            }
        }

        value |= u32::from(byte & PAYLOAD) << (7 * index);
        if byte & CONTINUATION == 0 {
            return Ok(value);
        }
    }

    Err(WireError::VarintTooLong {
        max: MAX_VARINT_LEN,
    })
}

/// Decodes the varint starting at `offset`, returning the value and how many bytes it used.
pub fn decode_varint(bytes: &[u8], offset: usize) -> Result<(u32, usize)> {
    let mut slice = bytes.get(offset..).ok_or(WireError::UnexpectedEof {
        needed: offset,
        remaining: bytes.len(),
    })?;

    let before = slice.len();
    let value = read_varint(&mut slice)?;

    Ok((value, before - slice.len()))
}

pub(crate) fn ensure_remaining<B: Buf>(buf: &B, needed: usize) -> Result<()> {
    let remaining = buf.remaining();
    if remaining < needed {
        return Err(WireError::UnexpectedEof { needed, remaining });
    }
    Ok(())
}

pub fn write_entity_pair<B: BufMut>(buf: &mut B, mapping: EntityMapping) {
    write_varint(buf, mapping.server_entity);
    write_varint(buf, mapping.client_entity);
}

pub fn read_entity_pair<B: Buf>(buf: &mut B) -> Result<EntityMapping> {
    let server_entity = read_varint(buf)?;
    let client_entity = read_varint(buf)?;
    Ok(EntityMapping::new(server_entity, client_entity))
}

/// Writes `[count][server][client] x count`.
pub fn write_entity_pairs<B: BufMut>(buf: &mut B, mappings: &[EntityMapping]) {
    write_varint(buf, mappings.len() as u32);
    for &mapping in mappings {
        write_entity_pair(buf, mapping);
    }
}

pub fn read_entity_pairs<B: Buf>(buf: &mut B) -> Result<Vec<EntityMapping>> {
    let count = read_varint(buf)?;
    let mut mappings = Vec::new();
    for _ in 0..count {
        mappings.push(read_entity_pair(buf)?);
    }
    Ok(mappings)
}

/// Writes `[count][first][rest...]`.
///
/// With `delta` set, every entity after the first is stored as the wrapping
/// difference from its predecessor, which keeps clustered ids to one byte.
pub fn write_entities<B: BufMut>(buf: &mut B, entities: &[EntityId], delta: bool) {
    write_varint(buf, entities.len() as u32);

    let mut previous = 0;
    for (index, &entity) in entities.iter().enumerate() {
        if delta && index > 0 {
            write_varint(buf, entity.wrapping_sub(previous));
        } else {
            write_varint(buf, entity);
        }
        previous = entity;
    }
}

pub fn read_entities<B: Buf>(buf: &mut B, delta: bool) -> Result<Vec<EntityId>> {
    let count = read_varint(buf)?;
    let mut entities = Vec::new();

    let mut running = 0u32;
    for index in 0..count {
        let value = read_varint(buf)?;
        running = if delta && index > 0 {
            running.wrapping_add(value)
        } else {
            value
        };
        entities.push(running);
    }

    Ok(entities)
}

use bytes::{Buf, Bytes};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WireError};
use crate::varint::{ensure_remaining, read_varint};

pub type EntityId = u32;
pub type FnId = u32;
pub type Tick = u32;

/// Correlates a server entity with the entity a client spawned for it ahead of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityMapping {
    pub server_entity: EntityId,
    pub client_entity: EntityId,
}

impl EntityMapping {
    pub fn new(server_entity: EntityId, client_entity: EntityId) -> Self {
        Self {
            server_entity,
            client_entity,
        }
    }
}

impl From<(EntityId, EntityId)> for EntityMapping {
    fn from((server_entity, client_entity): (EntityId, EntityId)) -> Self {
        Self::new(server_entity, client_entity)
    }
}

impl PartialEq<(EntityId, EntityId)> for EntityMapping {
    fn eq(&self, other: &(EntityId, EntityId)) -> bool {
        self.server_entity == other.0 && self.client_entity == other.1
    }
}

/// One serialized component as it appears on the wire: type id plus raw payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentChange {
    pub fn_id: FnId,
    pub data: Bytes,
}

impl ComponentChange {
    /// Reads `[fn_id][size][payload]`. The payload shares `buf`'s storage when it is `Bytes`.
    pub fn read<B: Buf>(buf: &mut B) -> Result<Self> {
        let fn_id = read_varint(buf)?;
        let size = read_varint(buf)? as usize;
        ensure_remaining(buf, size)?;

        Ok(Self {
            fn_id,
            data: buf.copy_to_bytes(size),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntityChanges {
    pub entity: EntityId,
    pub components: Vec<ComponentChange>,
}

impl EntityChanges {
    /// Reads `[entity][count][component] x count`.
    pub fn read<B: Buf>(buf: &mut B, max_components: usize) -> Result<Self> {
        let entity = read_varint(buf)?;
        let count = read_varint(buf)? as usize;
        if count > max_components {
            return Err(WireError::LimitExceeded(format!(
                "{count} components on entity {entity}, limit is {max_components}"
            )));
        }

        let mut components = Vec::new();
        for _ in 0..count {
            components.push(ComponentChange::read(buf)?);
        }

        Ok(Self { entity, components })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComponentRemovals {
    pub entity: EntityId,
    pub fn_ids: Vec<FnId>,
}

impl ComponentRemovals {
    /// Reads `[entity][count][fn_id] x count`.
    pub fn read<B: Buf>(buf: &mut B, max_fn_ids: usize) -> Result<Self> {
        let entity = read_varint(buf)?;
        let count = read_varint(buf)? as usize;
        if count > max_fn_ids {
            return Err(WireError::LimitExceeded(format!(
                "{count} removed components on entity {entity}, limit is {max_fn_ids}"
            )));
        }

        let mut fn_ids = Vec::new();
        for _ in 0..count {
            fn_ids.push(read_varint(buf)?);
        }

        Ok(Self { entity, fn_ids })
    }
}

/// Decoded structural diff for one tick.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdatesMessage {
    pub server_tick: Tick,
    pub mappings: Vec<EntityMapping>,
    pub despawns: Vec<EntityId>,
    pub removals: Vec<ComponentRemovals>,
    pub changes: Vec<EntityChanges>,
}

impl UpdatesMessage {
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
            && self.despawns.is_empty()
            && self.removals.is_empty()
            && self.changes.is_empty()
    }

    pub fn fn_ids(&self) -> impl Iterator<Item = FnId> + '_ {
        let removed = self.removals.iter().flat_map(|r| r.fn_ids.iter().copied());
        let changed = self
            .changes
            .iter()
            .flat_map(|c| c.components.iter().map(|component| component.fn_id));
        removed.chain(changed)
    }
}

/// Decoded component value stream for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MutationsMessage {
    pub update_tick: Tick,
    pub server_tick: Tick,
    pub entities: Vec<EntityChanges>,
}

impl MutationsMessage {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn component_count(&self) -> usize {
        self.entities.iter().map(|e| e.components.len()).sum()
    }

    pub fn fn_ids(&self) -> impl Iterator<Item = FnId> + '_ {
        self.entities
            .iter()
            .flat_map(|e| e.components.iter().map(|component| component.fn_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_from_tuple() {
        let mapping = EntityMapping::from((10, 1000));

        assert_eq!(mapping.server_entity, 10);
        assert_eq!(mapping.client_entity, 1000);
        assert_eq!(mapping, (10, 1000));
    }

    #[test]
    fn test_updates_message_fn_ids() {
        let message = UpdatesMessage {
            server_tick: 1,
            removals: vec![ComponentRemovals {
                entity: 3,
                fn_ids: vec![7, 8],
            }],
            changes: vec![EntityChanges {
                entity: 4,
                components: vec![ComponentChange {
                    fn_id: 9,
                    data: Bytes::from_static(&[1, 2]),
                }],
            }],
            ..Default::default()
        };

        assert!(!message.is_empty());
        assert_eq!(message.fn_ids().collect::<Vec<_>>(), vec![7, 8, 9]);
    }

    #[test]
    fn test_component_shares_storage() {
        let mut message = Bytes::from_static(&[4, 3, 0xA, 0xB, 0xC, 0xFF]);

        let component = ComponentChange::read(&mut message).unwrap();
        assert_eq!(component.fn_id, 4);
        assert_eq!(component.data, Bytes::from_static(&[0xA, 0xB, 0xC]));
        assert_eq!(message.as_ref(), &[0xFF]);
    }

    #[test]
    fn test_component_payload_truncated() {
        let mut message = Bytes::from_static(&[4, 3, 0xA]);
        assert!(matches!(
            ComponentChange::read(&mut message),
            Err(WireError::UnexpectedEof { needed: 3, remaining: 1 })
        ));
    }

    #[test]
    fn test_entity_changes_limit() {
        let mut message = Bytes::from_static(&[9, 5, 1, 0]);
        assert!(matches!(
            EntityChanges::read(&mut message, 4),
            Err(WireError::LimitExceeded(_))
        ));
    }

    #[test]
    fn test_removals_read() {
        let mut message: &[u8] = &[7, 2, 0xAC, 0x02, 1];

        let removals = ComponentRemovals::read(&mut message, 16).unwrap();
        assert_eq!(removals.entity, 7);
        assert_eq!(removals.fn_ids, vec![300, 1]);
    }

    #[test]
    fn test_json_dump() {
        let message = MutationsMessage {
            update_tick: 5,
            server_tick: 6,
            entities: vec![EntityChanges {
                entity: 1,
                components: vec![ComponentChange {
                    fn_id: 2,
                    data: Bytes::from_static(&[0xFF]),
                }],
            }],
        };

        let json = serde_json::to_string(&message).unwrap();
        let decoded: MutationsMessage = serde_json::from_str(&json).unwrap();

        assert_eq!(decoded, message);
        assert_eq!(decoded.component_count(), 1);
    }
}

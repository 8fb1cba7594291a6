use crate::error::{Result, WireError};
use crate::protocol::{FnId, MutationsMessage, UpdatesMessage};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

const UNKNOWN_NAME: &str = "<unknown>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub fn_id: FnId,
    pub name: String,
    pub description: Option<String>,
}

impl ComponentInfo {
    pub fn new(fn_id: FnId, name: impl Into<String>) -> Self {
        Self {
            fn_id,
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Component type ids both peers agreed on.
///
/// Used to reject messages that reference types the receiver cannot apply
/// and to name components in debug output.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    components: AHashMap<FnId, ComponentInfo>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_register(&mut self, info: ComponentInfo) -> Result<()> {
        if self.components.contains_key(&info.fn_id) {
            return Err(WireError::DuplicateComponent(info.fn_id));
        }

        self.components.insert(info.fn_id, info);
        Ok(())
    }

    /// Registers `name` under `fn_id`.
    ///
    /// # Panics
    ///
    /// Panics if `fn_id` is already registered.
    pub fn register(&mut self, fn_id: FnId, name: impl Into<String>) {
        if let Err(e) = self.try_register(ComponentInfo::new(fn_id, name)) {
            panic!("{e}");
        }
    }

    pub fn get(&self, fn_id: FnId) -> Option<&ComponentInfo> {
        self.components.get(&fn_id)
    }

    pub fn name_of(&self, fn_id: FnId) -> &str {
        self.get(fn_id)
            .map(|info| info.name.as_str())
            .unwrap_or(UNKNOWN_NAME)
    }

    pub fn contains(&self, fn_id: FnId) -> bool {
        self.components.contains_key(&fn_id)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Registered components ordered by type id.
    pub fn get_all(&self) -> Vec<&ComponentInfo> {
        let mut all: Vec<_> = self.components.values().collect();
        all.sort_by_key(|info| info.fn_id);
        all
    }

    pub fn validate_updates(&self, message: &UpdatesMessage) -> Result<()> {
        self.validate_fn_ids(message.fn_ids())
    }

    pub fn validate_mutations(&self, message: &MutationsMessage) -> Result<()> {
        self.validate_fn_ids(message.fn_ids())
    }

    fn validate_fn_ids(&self, mut fn_ids: impl Iterator<Item = FnId>) -> Result<()> {
        match fn_ids.find(|fn_id| !self.contains(*fn_id)) {
            Some(fn_id) => Err(WireError::UnknownComponent(fn_id)),
            None => Ok(()),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.get_all())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let infos: Vec<ComponentInfo> = serde_json::from_str(json)?;

        let mut registry = Self::new();
        for info in infos {
            registry.try_register(info)?;
        }

        Ok(registry)
    }

    pub fn clear(&mut self) {
        self.components.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ComponentChange, ComponentRemovals, EntityChanges};
    use bytes::Bytes;

    #[test]
    fn test_component_registry() {
        let mut registry = ComponentRegistry::new();

        registry
            .try_register(ComponentInfo::new(1, "Position").with_description("2D position component"))
            .unwrap();
        registry.register(2, "Velocity");

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.name_of(1), "Position");
        assert_eq!(registry.name_of(9), "<unknown>");
        assert_eq!(
            registry.get(1).unwrap().description.as_deref(),
            Some("2D position component")
        );
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = ComponentRegistry::new();
        registry.register(1, "Position");

        let result = registry.try_register(ComponentInfo::new(1, "Other"));
        assert!(matches!(result, Err(WireError::DuplicateComponent(1))));
        assert_eq!(registry.name_of(1), "Position");
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_register_twice_panics() {
        let mut registry = ComponentRegistry::new();
        registry.register(1, "Position");
        registry.register(1, "Position");
    }

    #[test]
    fn test_validate_updates() {
        let mut registry = ComponentRegistry::new();
        registry.register(1, "Position");

        let mut message = UpdatesMessage {
            changes: vec![EntityChanges {
                entity: 5,
                components: vec![ComponentChange {
                    fn_id: 1,
                    data: Bytes::from_static(&[0]),
                }],
            }],
            ..Default::default()
        };
        assert!(registry.validate_updates(&message).is_ok());

        message.removals.push(ComponentRemovals {
            entity: 5,
            fn_ids: vec![1, 4],
        });
        assert!(matches!(
            registry.validate_updates(&message),
            Err(WireError::UnknownComponent(4))
        ));
    }

    #[test]
    fn test_validate_mutations() {
        let registry = ComponentRegistry::new();
        let message = MutationsMessage {
            entities: vec![EntityChanges {
                entity: 1,
                components: vec![ComponentChange {
                    fn_id: 3,
                    data: Bytes::new(),
                }],
            }],
            ..Default::default()
        };

        assert!(matches!(
            registry.validate_mutations(&message),
            Err(WireError::UnknownComponent(3))
        ));
        assert!(registry.validate_mutations(&MutationsMessage::default()).is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let mut registry = ComponentRegistry::new();
        registry.register(2, "Velocity");
        registry.register(1, "Position");

        let json = registry.to_json().unwrap();
        let restored = ComponentRegistry::from_json(&json).unwrap();

        assert_eq!(restored.get_all(), registry.get_all());
        assert_eq!(restored.get_all()[0].name, "Position");
    }

    #[test]
    fn test_json_with_duplicates_rejected() {
        let json = r#"[{"fn_id":1,"name":"A","description":null},{"fn_id":1,"name":"B","description":null}]"#;
        assert!(matches!(
            ComponentRegistry::from_json(json),
            Err(WireError::DuplicateComponent(1))
        ));
    }
}

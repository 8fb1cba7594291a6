use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireConfig {
    /// Initial arena capacity in bytes.
    pub initial_capacity: usize,
    /// Longest message a decoder will accept.
    pub max_message_size: usize,
    pub max_components_per_entity: usize,
    pub max_fn_ids_per_removal: usize,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 8192,
            max_message_size: 1024 * 1024,
            max_components_per_entity: 4096,
            max_fn_ids_per_removal: 4096,
        }
    }
}

impl WireConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_max_message_size(mut self, max: usize) -> Self {
        self.max_message_size = max;
        self
    }

    pub fn with_max_components_per_entity(mut self, max: usize) -> Self {
        self.max_components_per_entity = max;
        self
    }

    pub fn with_max_fn_ids_per_removal(mut self, max: usize) -> Self {
        self.max_fn_ids_per_removal = max;
        self
    }
}

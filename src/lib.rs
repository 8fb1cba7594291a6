pub mod protocol;
pub mod varint;
pub mod ranges;
pub mod buffer;
pub mod flags;
pub mod updates;
pub mod mutations;
pub mod registry;
pub mod config;
pub mod error;
pub mod debug;

pub use protocol::{
    EntityId, FnId, Tick,
    EntityMapping, ComponentChange, EntityChanges, ComponentRemovals,
    UpdatesMessage, MutationsMessage,
};

pub use varint::{
    encode_varint, decode_varint, encoded_len,
    read_varint, write_varint,
    read_entity_pairs, write_entity_pairs,
    read_entities, write_entities,
    MAX_VARINT_LEN,
};

pub use ranges::{
    ByteRange, CoalescedRanges, EntityRanges, RemovalRanges,
};

pub use buffer::SerializedData;

pub use flags::UpdateFlags;

pub use updates::Updates;

pub use mutations::Mutations;

pub use registry::{
    ComponentInfo, ComponentRegistry,
};

pub use config::WireConfig;

pub use error::{
    WireError, Result,
};

pub use debug::{
    init_debug_mode, set_debug_mode, is_debug_enabled, is_trace_enabled,
    log_updates, log_mutations,
    trace_serialization, trace_deserialization,
    format_bytes, updates_summary, mutations_summary,
};

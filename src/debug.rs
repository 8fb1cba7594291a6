use crate::protocol::{MutationsMessage, UpdatesMessage};
use crate::registry::ComponentRegistry;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_MODE: AtomicBool = AtomicBool::new(false);
static TRACE_MODE: AtomicBool = AtomicBool::new(false);

/// Initialize debug mode from environment variables
///
/// - `TX2_DEBUG=1` or `TX2_DEBUG_JSON=1`: Log every decoded message as JSON
/// - `TX2_TRACE=1`: Log one line per serialize/deserialize call
///
/// Output goes through `tracing` on the `tx2_wire` target.
pub fn init_debug_mode() {
    let debug = env::var("TX2_DEBUG").is_ok() || env::var("TX2_DEBUG_JSON").is_ok();

    let trace = env::var("TX2_TRACE").is_ok();

    set_debug_mode(debug, trace);

    if debug {
        tracing::info!(target: "tx2_wire", "debug mode enabled, decoded messages will be logged as JSON");
    }

    if trace {
        tracing::info!(target: "tx2_wire", "trace mode enabled");
    }
}

/// Set both switches directly, bypassing the environment.
pub fn set_debug_mode(debug: bool, trace: bool) {
    DEBUG_MODE.store(debug, Ordering::Relaxed);
    TRACE_MODE.store(trace, Ordering::Relaxed);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_MODE.load(Ordering::Relaxed)
}

pub fn is_trace_enabled() -> bool {
    TRACE_MODE.load(Ordering::Relaxed)
}

/// Log an Updates message as JSON if debug mode is enabled
pub fn log_updates(direction: &str, message: &UpdatesMessage) {
    if !is_debug_enabled() {
        return;
    }

    match serde_json::to_string_pretty(message) {
        Ok(json) => {
            tracing::debug!(target: "tx2_wire", "{} Updates (tick {}):\n{}", direction, message.server_tick, json);
        }
        Err(e) => {
            tracing::warn!(target: "tx2_wire", "failed to serialize Updates to JSON: {}", e);
        }
    }
}

/// Log a Mutations message as JSON if debug mode is enabled
pub fn log_mutations(direction: &str, message: &MutationsMessage) {
    if !is_debug_enabled() {
        return;
    }

    match serde_json::to_string_pretty(message) {
        Ok(json) => {
            tracing::debug!(target: "tx2_wire", "{} Mutations ({} entities):\n{}",
                direction, message.entities.len(), json);
        }
        Err(e) => {
            tracing::warn!(target: "tx2_wire", "failed to serialize Mutations to JSON: {}", e);
        }
    }
}

pub fn trace_serialization(kind: &str, size_bytes: usize, duration_micros: u128) {
    if !is_trace_enabled() {
        return;
    }

    tracing::trace!(target: "tx2_wire", "serialized {} into {} in {}µs",
        kind, format_bytes(size_bytes), duration_micros);
}

pub fn trace_deserialization(kind: &str, size_bytes: usize, duration_micros: u128) {
    if !is_trace_enabled() {
        return;
    }

    tracing::trace!(target: "tx2_wire", "deserialized {} from {} in {}µs",
        kind, format_bytes(size_bytes), duration_micros);
}

/// Format bytes in human-readable format (KB, MB, etc.)
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;
    const GB: usize = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// One-line summary of an Updates message
pub fn updates_summary(message: &UpdatesMessage) -> String {
    let mut parts = Vec::new();

    if !message.mappings.is_empty() {
        parts.push(format!("{} mapped", message.mappings.len()));
    }
    if !message.despawns.is_empty() {
        parts.push(format!("-{} despawned", message.despawns.len()));
    }
    if !message.removals.is_empty() {
        let removed: usize = message.removals.iter().map(|r| r.fn_ids.len()).sum();
        parts.push(format!("-{} components on {} entities", removed, message.removals.len()));
    }
    if !message.changes.is_empty() {
        let inserted: usize = message.changes.iter().map(|c| c.components.len()).sum();
        parts.push(format!("+{} components on {} entities", inserted, message.changes.len()));
    }

    if parts.is_empty() {
        format!("Updates (tick: {}, empty)", message.server_tick)
    } else {
        format!("Updates (tick: {}, {})", message.server_tick, parts.join(", "))
    }
}

/// One-line summary of a Mutations message, naming components when a registry is given
pub fn mutations_summary(message: &MutationsMessage, registry: Option<&ComponentRegistry>) -> String {
    let mut summary = format!(
        "Mutations (tick: {}, server tick: {}, {} components on {} entities",
        message.update_tick,
        message.server_tick,
        message.component_count(),
        message.entities.len()
    );

    if let Some(registry) = registry {
        let mut names: Vec<&str> = message.fn_ids().map(|fn_id| registry.name_of(fn_id)).collect();
        names.sort_unstable();
        names.dedup();
        if !names.is_empty() {
            summary.push_str(": ");
            summary.push_str(&names.join(", "));
        }
    }

    summary.push(')');
    summary
}

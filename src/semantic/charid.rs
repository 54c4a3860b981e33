//! Deterministic custom-character id generation (spec §6.3): "same display
//! name always produces same hash". `DefaultHasher` (SipHash-1-3) is stable
//! across calls within one build, which is all the spec requires; it is not
//! guaranteed stable across Rust/stdlib versions, a tradeoff recorded in
//! DESIGN.md.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Build `custom-<hex hash>` from a display name.
pub fn custom_char_id(display_name: &str) -> String {
    let mut hasher = DefaultHasher::new();
    display_name.hash(&mut hasher);
    format!("custom-{:016x}", hasher.finish())
}

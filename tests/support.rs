//! Shared test fixtures: included via `#[path = "support.rs"] mod support;`
//! in each integration test file (the teacher's own tests/ directory uses
//! the same `#[path = "..."] mod` pattern for its shared corpus loader, see
//! `tests/parser/ensemble_01_two_paragraphs.rs`).

use momoscript::pack::StaticPackRegistry;

/// A small in-memory registry standing in for a real asset bundle: one
/// default pack `"ba"` with a handful of characters used across the
/// scenario and boundary tests, plus a second, non-default pack `"event"`
/// only reachable through an explicit `usepack` alias.
pub fn test_registry() -> StaticPackRegistry {
    StaticPackRegistry::builder()
        .default_pack("ba")
        .character("ba", "星野", "星野")
        .character("ba", "白子", "白子")
        .character("ba", "梦", "梦")
        .character("ba", "日富美", "日富美")
        .avatar("ba", "梦", "assets/ba/梦/default.png")
        .character("event", "限定角色", "限定角色")
        .build()
}

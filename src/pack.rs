//! Pack registry interface (spec §4.3) and a reference in-memory
//! implementation.
//!
//! The compiler only ever reads through the `PackRegistry` trait; loading
//! real pack bundles from disk (manifest parsing, path-traversal
//! validation) is explicitly out of scope for the core (spec §1, §4.3) —
//! `StaticPackRegistry` exists so tests and the reference CLI have
//! something concrete to compile against.

use std::collections::HashMap;

/// Read-only view over one or more character packs (spec §4.3). Must be
/// safe for concurrent reads (spec §5): independent callers may compile
/// different documents in parallel against the same registry.
pub trait PackRegistry: Send + Sync {
    fn lookup_by_name(&self, pack_id: &str, name: &str) -> Option<String>;
    fn default_avatar_path(&self, pack_id: &str, char_id: &str) -> Option<String>;
    fn expressions_dir(&self, pack_id: &str, char_id: &str) -> Option<String>;
    fn tags_file(&self, pack_id: &str, char_id: &str) -> Option<String>;
    fn known_packs(&self) -> Vec<String>;

    /// The fixed default namespace resolution order (spec §4.2): built-in
    /// packs in their declared default order, *before* `custom` and
    /// registered aliases are tried. The sole hardcoded char_id outside any
    /// pack is `"__Sensei"` (spec §6.3) — packs themselves are never
    /// privileged by the core.
    fn default_namespaces(&self) -> Vec<String>;
}

#[derive(Debug, Clone, Default)]
struct PackData {
    by_name: HashMap<String, String>,
    avatars: HashMap<String, String>,
    expressions: HashMap<String, String>,
    tags: HashMap<String, String>,
}

/// A simple in-memory `PackRegistry` built from explicit tables, standing
/// in for the adapter that would otherwise load `manifest`/`char_id.json`/
/// `asset_mapping.json` off disk (spec §4.3).
#[derive(Debug, Clone, Default)]
pub struct StaticPackRegistry {
    packs: HashMap<String, PackData>,
    default_order: Vec<String>,
}

impl StaticPackRegistry {
    pub fn builder() -> StaticPackRegistryBuilder {
        StaticPackRegistryBuilder::new()
    }
}

impl PackRegistry for StaticPackRegistry {
    fn lookup_by_name(&self, pack_id: &str, name: &str) -> Option<String> {
        self.packs.get(pack_id)?.by_name.get(name).cloned()
    }

    fn default_avatar_path(&self, pack_id: &str, char_id: &str) -> Option<String> {
        self.packs.get(pack_id)?.avatars.get(char_id).cloned()
    }

    fn expressions_dir(&self, pack_id: &str, char_id: &str) -> Option<String> {
        self.packs.get(pack_id)?.expressions.get(char_id).cloned()
    }

    fn tags_file(&self, pack_id: &str, char_id: &str) -> Option<String> {
        self.packs.get(pack_id)?.tags.get(char_id).cloned()
    }

    fn known_packs(&self) -> Vec<String> {
        self.packs.keys().cloned().collect()
    }

    fn default_namespaces(&self) -> Vec<String> {
        self.default_order.clone()
    }
}

pub struct StaticPackRegistryBuilder {
    packs: HashMap<String, PackData>,
    default_order: Vec<String>,
}

impl StaticPackRegistryBuilder {
    pub fn new() -> Self {
        Self {
            packs: HashMap::new(),
            default_order: Vec::new(),
        }
    }

    /// Declare `pack_id` as a default-resolution-order namespace (spec
    /// §4.2). The example built-in is `"ba"`, which is not privileged by
    /// the core in any other way (spec §6.3).
    pub fn default_pack(mut self, pack_id: impl Into<String>) -> Self {
        let pack_id = pack_id.into();
        self.packs.entry(pack_id.clone()).or_default();
        self.default_order.push(pack_id);
        self
    }

    pub fn character(
        mut self,
        pack_id: impl Into<String>,
        name: impl Into<String>,
        char_id: impl Into<String>,
    ) -> Self {
        let pack_id = pack_id.into();
        let entry = self.packs.entry(pack_id).or_default();
        entry.by_name.insert(name.into(), char_id.into());
        self
    }

    pub fn avatar(
        mut self,
        pack_id: impl Into<String>,
        char_id: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        let pack_id = pack_id.into();
        let entry = self.packs.entry(pack_id).or_default();
        entry.avatars.insert(char_id.into(), path.into());
        self
    }

    pub fn expressions_dir(
        mut self,
        pack_id: impl Into<String>,
        char_id: impl Into<String>,
        dir: impl Into<String>,
    ) -> Self {
        let pack_id = pack_id.into();
        let entry = self.packs.entry(pack_id).or_default();
        entry.expressions.insert(char_id.into(), dir.into());
        self
    }

    pub fn build(self) -> StaticPackRegistry {
        StaticPackRegistry {
            packs: self.packs,
            default_order: self.default_order,
        }
    }
}

impl Default for StaticPackRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//! The resource registry: id allocation, per-kind caches, and storage for
//! both resources and views (`spec.md` §3–§4.4).
//!
//! Cross-references between views and resources are ids, not owned
//! pointers (the redesign in `spec.md` §9 for the original's cyclic
//! object graph) — the registry is the single place that owns the actual
//! records, keyed by id.

use crate::resource::{ids, FontInfo, Id, ResourceKind};
use crate::view::ViewRecord;
use std::collections::HashMap;

/// A stored resource: its defining content plus, for named resources, the
/// cache key that keeps it alive until explicitly removed.
#[derive(Debug)]
pub struct ResourceRecord {
    pub kind: ResourceKind,
    /// `Some` for resources the application gave a name (TTF/Image files,
    /// by convention) — these persist until explicit removal rather than
    /// on last-handle-drop (`spec.md` §3 "Ownership").
    pub named: bool,
    pub font_info: Option<FontInfo>,
}

/// Cache key for the Font cache: `(ttf_id, style, size bits, flags)`.
/// `f32` doesn't implement `Eq`/`Hash`, so the size is compared by its bit
/// pattern — fine here since the key only needs to distinguish sizes an
/// application actually requested, not to support arbitrary float algebra.
pub type FontKey = (Id, i32, u32, i32);

/// Cache key for the Animation cache: `(duration_ms, ease bits)`.
pub type AnimKey = (i32, u32);

/// Owns every resource and view record for one session, plus the
/// content-keyed caches from `spec.md` §3.
#[derive(Debug)]
pub struct Registry {
    next_id: Id,
    resources: HashMap<Id, ResourceRecord>,
    views: HashMap<Id, ViewRecord>,

    color_cache: HashMap<u32, Id>,
    ttf_cache: HashMap<String, Id>,
    font_cache: HashMap<FontKey, Id>,
    image_cache: HashMap<String, Id>,
    anim_cache: HashMap<AnimKey, Id>,
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            next_id: ids::ID_CLIENT,
            resources: HashMap::new(),
            views: HashMap::new(),
            color_cache: HashMap::new(),
            ttf_cache: HashMap::new(),
            font_cache: HashMap::new(),
            image_cache: HashMap::new(),
            anim_cache: HashMap::new(),
        }
    }

    /// Allocate the next application id. Monotonic, never reused within a
    /// session (`spec.md` §3).
    pub fn alloc_id(&mut self) -> Id {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // -- Resources --------------------------------------------------------

    pub fn insert_resource(&mut self, id: Id, kind: ResourceKind, named: bool) {
        self.resources.insert(
            id,
            ResourceRecord {
                kind,
                named,
                font_info: None,
            },
        );
    }

    pub fn resource(&self, id: Id) -> Option<&ResourceRecord> {
        self.resources.get(&id)
    }

    pub fn resource_mut(&mut self, id: Id) -> Option<&mut ResourceRecord> {
        self.resources.get_mut(&id)
    }

    pub fn remove_resource(&mut self, id: Id) -> Option<ResourceRecord> {
        self.resources.remove(&id)
    }

    pub fn set_font_info(&mut self, id: Id, info: FontInfo) {
        if let Some(record) = self.resources.get_mut(&id) {
            record.font_info = Some(info);
        }
    }

    // -- Color cache --------------------------------------------------------

    pub fn cached_color(&self, argb: u32) -> Option<Id> {
        self.color_cache.get(&argb).copied()
    }

    pub fn cache_color(&mut self, argb: u32, id: Id) {
        self.color_cache.insert(argb, id);
    }

    pub fn uncache_color(&mut self, argb: u32) {
        self.color_cache.remove(&argb);
    }

    // -- TTF cache --------------------------------------------------------

    pub fn cached_ttf(&self, name: &str) -> Option<Id> {
        self.ttf_cache.get(name).copied()
    }

    pub fn cache_ttf(&mut self, name: String, id: Id) {
        self.ttf_cache.insert(name, id);
    }

    pub fn uncache_ttf(&mut self, name: &str) {
        self.ttf_cache.remove(name);
    }

    // -- Font cache --------------------------------------------------------

    pub fn cached_font(&self, key: FontKey) -> Option<Id> {
        self.font_cache.get(&key).copied()
    }

    pub fn cache_font(&mut self, key: FontKey, id: Id) {
        self.font_cache.insert(key, id);
    }

    pub fn uncache_font(&mut self, key: FontKey) {
        self.font_cache.remove(&key);
    }

    // -- Image cache --------------------------------------------------------

    pub fn cached_image(&self, name: &str) -> Option<Id> {
        self.image_cache.get(name).copied()
    }

    pub fn cache_image(&mut self, name: String, id: Id) {
        self.image_cache.insert(name, id);
    }

    pub fn uncache_image(&mut self, name: &str) {
        self.image_cache.remove(name);
    }

    // -- Animation cache --------------------------------------------------------

    pub fn cached_anim(&self, key: AnimKey) -> Option<Id> {
        self.anim_cache.get(&key).copied()
    }

    pub fn cache_anim(&mut self, key: AnimKey, id: Id) {
        self.anim_cache.insert(key, id);
    }

    pub fn uncache_anim(&mut self, key: AnimKey) {
        self.anim_cache.remove(&key);
    }

    // -- Views --------------------------------------------------------

    pub fn insert_view(&mut self, id: Id, view: ViewRecord) {
        self.views.insert(id, view);
    }

    pub fn view(&self, id: Id) -> Option<&ViewRecord> {
        self.views.get(&id)
    }

    pub fn view_mut(&mut self, id: Id) -> Option<&mut ViewRecord> {
        self.views.get_mut(&id)
    }

    pub fn remove_view(&mut self, id: Id) -> Option<ViewRecord> {
        self.views.remove(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_client_and_never_repeat() {
        let mut reg = Registry::new();
        let a = reg.alloc_id();
        let b = reg.alloc_id();
        assert_eq!(a, ids::ID_CLIENT);
        assert_eq!(b, ids::ID_CLIENT + 1);
    }

    #[test]
    fn color_cache_round_trips() {
        let mut reg = Registry::new();
        assert_eq!(reg.cached_color(0xff00ff00), None);
        reg.cache_color(0xff00ff00, 2048);
        assert_eq!(reg.cached_color(0xff00ff00), Some(2048));
        reg.uncache_color(0xff00ff00);
        assert_eq!(reg.cached_color(0xff00ff00), None);
    }
}

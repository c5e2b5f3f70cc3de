//! The view scene graph (`spec.md` §3–§4.4).
//!
//! `ViewRecord` is the shadow state the registry stores per view: enough
//! to answer "would this mutation change anything" without a round trip
//! to the receiver (§4.4 "State elision"). The `View` handle in
//! [`crate::shared`] is what applications actually call methods on; this
//! module only holds the data and the elision predicates, so it has no
//! dependency on the writer/command layer.

use crate::command::Command;
use crate::error::SessionError;
use crate::handle::ResourceHandle;
use crate::resource::{ids, Id};
use crate::shared::{resolve_animation, Shared};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shadow state for one view. Mirrors the fields `hme.py`'s `View` keeps
/// in Python instance attributes.
#[derive(Clone, Debug)]
pub struct ViewRecord {
    pub parent: Option<Id>,
    pub children: Vec<Id>,

    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,

    pub visible: bool,
    pub painting: bool,
    pub transparency: f32,

    pub xscale: f32,
    pub yscale: f32,
    pub xt: i32,
    pub yt: i32,

    pub resource_id: Option<Id>,
    pub resource_flags: i32,
}

impl ViewRecord {
    /// A freshly `ADD`ed view: full opacity, unscaled, untranslated, not
    /// painting a resource, and — for every view but the root — visible.
    /// The root view starts invisible until the session's startup hook
    /// runs (`SPEC_FULL.md` Scene graph module).
    pub fn new(parent: Option<Id>, x: i32, y: i32, w: i32, h: i32, visible: bool) -> Self {
        ViewRecord {
            parent,
            children: Vec::new(),
            x,
            y,
            w,
            h,
            visible,
            painting: true,
            transparency: 1.0,
            xscale: 1.0,
            yscale: 1.0,
            xt: 0,
            yt: 0,
            resource_id: None,
            resource_flags: 0,
        }
    }

    /// The distinguished root view: id [`ids::ID_ROOT_VIEW`], no parent,
    /// invisible until startup runs.
    pub fn root(w: i32, h: i32) -> Self {
        ViewRecord::new(None, 0, 0, w, h, false)
    }

    pub fn is_root(id: Id) -> bool {
        id == ids::ID_ROOT_VIEW
    }

    /// Whether a `set_bounds` to this rectangle would be a no-op.
    /// `set_bounds` is never elided (`spec.md` §4.4) — kept here only for
    /// symmetry and future callers that want to log "was already this
    /// size", never to suppress the command itself.
    pub fn bounds_unchanged(&self, x: i32, y: i32, w: i32, h: i32) -> bool {
        self.x == x && self.y == y && self.w == w && self.h == h
    }

    pub fn scale_unchanged(&self, xscale: f32, yscale: f32) -> bool {
        self.xscale == xscale && self.yscale == yscale
    }

    pub fn translation_unchanged(&self, xt: i32, yt: i32) -> bool {
        self.xt == xt && self.yt == yt
    }

    pub fn transparency_unchanged(&self, alpha: f32) -> bool {
        self.transparency == alpha
    }

    pub fn visible_unchanged(&self, visible: bool) -> bool {
        self.visible == visible
    }

    pub fn painting_unchanged(&self, painting: bool) -> bool {
        self.painting == painting
    }

    pub fn resource_unchanged(&self, resource_id: Option<Id>, flags: i32) -> bool {
        self.resource_id == resource_id && self.resource_flags == flags
    }
}

/// A live handle to a view: `id` plus the shared writer/registry it was
/// created against, and the resource currently bound to it (if any),
/// which this view owns (`spec.md` §9: "typically the view that bound
/// it"). Cloning an existing `View` is a cheap `Arc` bump over the same
/// underlying view — it does not create a new view on the receiver.
pub struct View<W: Write> {
    id: Id,
    shared: Arc<Shared<W>>,
    bound: Arc<Mutex<Option<ResourceHandle<W>>>>,
}

impl<W: Write> Clone for View<W> {
    fn clone(&self) -> Self {
        View {
            id: self.id,
            shared: self.shared.clone(),
            bound: self.bound.clone(),
        }
    }
}

impl<W: Write + 'static> View<W> {
    pub fn id(&self) -> Id {
        self.id
    }

    /// Wrap the distinguished root view ([`ids::ID_ROOT_VIEW`]), already
    /// seeded into the registry by [`Shared::new`].
    pub fn root(shared: Arc<Shared<W>>) -> Self {
        View {
            id: ids::ID_ROOT_VIEW,
            shared,
            bound: Arc::new(Mutex::new(None)),
        }
    }

    /// Create a new view parented to this one (`hme.py`'s `View.child`).
    pub fn child(&self, x: i32, y: i32, w: i32, h: i32, visible: bool) -> Result<Self, SessionError> {
        let id = self.shared.alloc_id();
        self.shared.emit(&Command::ViewAdd {
            id,
            parent_id: self.id,
            x,
            y,
            w,
            h,
            visible,
        })?;
        self.shared.with_registry(|r| {
            r.insert_view(id, ViewRecord::new(Some(self.id), x, y, w, h, visible));
            if let Some(parent) = r.view_mut(self.id) {
                parent.children.push(id);
            }
        });
        Ok(View {
            id,
            shared: self.shared.clone(),
            bound: Arc::new(Mutex::new(None)),
        })
    }

    /// Never elided (`spec.md` §4.4).
    pub fn set_bounds(&self, x: i32, y: i32, w: i32, h: i32, animation: Option<Id>, duration: Duration) -> Result<(), SessionError> {
        let animation_id = resolve_animation(&self.shared, animation, duration)?;
        self.shared.emit(&Command::ViewSetBounds {
            id: self.id,
            x,
            y,
            w,
            h,
            animation_id,
        })?;
        self.shared.with_registry(|r| {
            if let Some(v) = r.view_mut(self.id) {
                v.x = x;
                v.y = y;
                v.w = w;
                v.h = h;
            }
        });
        Ok(())
    }

    pub fn set_scale(&self, xscale: f32, yscale: f32, animation: Option<Id>, duration: Duration) -> Result<(), SessionError> {
        let unchanged = self
            .shared
            .with_registry(|r| r.view(self.id).map(|v| v.scale_unchanged(xscale, yscale)))
            .unwrap_or(true);
        if unchanged {
            return Ok(());
        }
        let animation_id = resolve_animation(&self.shared, animation, duration)?;
        self.shared.emit(&Command::ViewSetScale {
            id: self.id,
            xscale,
            yscale,
            animation_id,
        })?;
        self.shared.with_registry(|r| {
            if let Some(v) = r.view_mut(self.id) {
                v.xscale = xscale;
                v.yscale = yscale;
            }
        });
        Ok(())
    }

    pub fn set_translation(&self, xt: i32, yt: i32, animation: Option<Id>, duration: Duration) -> Result<(), SessionError> {
        let unchanged = self
            .shared
            .with_registry(|r| r.view(self.id).map(|v| v.translation_unchanged(xt, yt)))
            .unwrap_or(true);
        if unchanged {
            return Ok(());
        }
        let animation_id = resolve_animation(&self.shared, animation, duration)?;
        self.shared.emit(&Command::ViewSetTranslation {
            id: self.id,
            xt,
            yt,
            animation_id,
        })?;
        self.shared.with_registry(|r| {
            if let Some(v) = r.view_mut(self.id) {
                v.xt = xt;
                v.yt = yt;
            }
        });
        Ok(())
    }

    /// Translate with coordinates relative to the view's current
    /// translation (`hme.py` `View.translate`).
    pub fn translate(&self, dx: i32, dy: i32, animation: Option<Id>, duration: Duration) -> Result<(), SessionError> {
        let (xt, yt) = self
            .shared
            .with_registry(|r| r.view(self.id).map(|v| (v.xt, v.yt)))
            .unwrap_or((0, 0));
        self.set_translation(xt + dx, yt + dy, animation, duration)
    }

    pub fn set_transparency(&self, alpha: f32, animation: Option<Id>, duration: Duration) -> Result<(), SessionError> {
        let unchanged = self
            .shared
            .with_registry(|r| r.view(self.id).map(|v| v.transparency_unchanged(alpha)))
            .unwrap_or(true);
        if unchanged {
            return Ok(());
        }
        let animation_id = resolve_animation(&self.shared, animation, duration)?;
        self.shared.emit(&Command::ViewSetTransparency {
            id: self.id,
            alpha,
            animation_id,
        })?;
        self.shared.with_registry(|r| {
            if let Some(v) = r.view_mut(self.id) {
                v.transparency = alpha;
            }
        });
        Ok(())
    }

    pub fn set_visible(&self, visible: bool, animation: Option<Id>, duration: Duration) -> Result<(), SessionError> {
        let unchanged = self
            .shared
            .with_registry(|r| r.view(self.id).map(|v| v.visible_unchanged(visible)))
            .unwrap_or(true);
        if unchanged {
            return Ok(());
        }
        let animation_id = resolve_animation(&self.shared, animation, duration)?;
        self.shared.emit(&Command::ViewSetVisible {
            id: self.id,
            visible,
            animation_id,
        })?;
        self.shared.with_registry(|r| {
            if let Some(v) = r.view_mut(self.id) {
                v.visible = visible;
            }
        });
        Ok(())
    }

    pub fn set_painting(&self, painting: bool) -> Result<(), SessionError> {
        let unchanged = self
            .shared
            .with_registry(|r| r.view(self.id).map(|v| v.painting_unchanged(painting)))
            .unwrap_or(true);
        if unchanged {
            return Ok(());
        }
        self.shared
            .emit(&Command::ViewSetPainting { id: self.id, painting })?;
        self.shared.with_registry(|r| {
            if let Some(v) = r.view_mut(self.id) {
                v.painting = painting;
            }
        });
        Ok(())
    }

    /// Bind `resource` to this view, replacing (and releasing, if it was
    /// anonymous and this was the only handle to it) whatever was bound
    /// before.
    pub fn set_resource(&self, resource: ResourceHandle<W>, flags: i32) -> Result<(), SessionError> {
        let resource_id = resource.id();
        let unchanged = self
            .shared
            .with_registry(|r| {
                r.view(self.id)
                    .map(|v| v.resource_unchanged(Some(resource_id), flags))
            })
            .unwrap_or(false);
        if unchanged {
            return Ok(());
        }
        self.shared.emit(&Command::ViewSetResource {
            id: self.id,
            resource_id,
            flags,
        })?;
        self.shared.with_registry(|r| {
            if let Some(v) = r.view_mut(self.id) {
                v.resource_id = Some(resource_id);
                v.resource_flags = flags;
            }
        });
        *self.bound.lock().unwrap() = Some(resource);
        Ok(())
    }

    /// Allocate a Text resource and bind it in one call
    /// (`hme.py` `View.set_text`).
    pub fn set_text(&self, font_id: Id, color_id: Id, text: &str, flags: i32) -> Result<(), SessionError> {
        let resource = self.shared.add_text(font_id, color_id, text)?;
        self.set_resource(resource, flags)
    }

    /// Allocate (or reuse a cached) Image resource and bind it in one
    /// call (`hme.py` `View.set_image`).
    pub fn set_image(&self, name: Option<&str>, data: Vec<u8>, flags: i32) -> Result<(), SessionError> {
        let resource = self.shared.add_image(name, data)?;
        self.set_resource(resource, flags)
    }

    /// Allocate (or reuse a cached) Color resource and bind it in one
    /// call (`hme.py` `View.set_color`).
    pub fn set_color(&self, argb: u32) -> Result<(), SessionError> {
        let resource = self.shared.add_color(argb)?;
        self.set_resource(resource, 0)
    }

    /// Remove the view, detaching it from its parent. A removed view's
    /// id must never be referenced again (`spec.md` §3).
    pub fn remove(&self, animation: Option<Id>, duration: Duration) -> Result<(), SessionError> {
        let animation_id = resolve_animation(&self.shared, animation, duration)?;
        self.shared.emit(&Command::ViewRemove { id: self.id, animation_id })?;
        self.shared.with_registry(|r| {
            if let Some(view) = r.remove_view(self.id) {
                if let Some(parent_id) = view.parent {
                    if let Some(parent) = r.view_mut(parent_id) {
                        parent.children.retain(|&c| c != self.id);
                    }
                }
            }
        });
        *self.bound.lock().unwrap() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_starts_invisible() {
        let root = ViewRecord::root(1920, 1080);
        assert!(!root.visible);
        assert_eq!(root.w, 1920);
        assert_eq!(root.h, 1080);
        assert!(root.parent.is_none());
    }

    #[test]
    fn fresh_view_is_unscaled_and_opaque() {
        let v = ViewRecord::new(Some(ids::ID_ROOT_VIEW), 0, 0, 100, 100, true);
        assert_eq!(v.transparency, 1.0);
        assert_eq!(v.xscale, 1.0);
        assert_eq!(v.yscale, 1.0);
        assert_eq!(v.xt, 0);
        assert_eq!(v.yt, 0);
        assert!(v.painting);
    }

    #[test]
    fn elision_predicates_match_current_state() {
        let v = ViewRecord::new(None, 0, 0, 100, 100, true);
        assert!(v.transparency_unchanged(1.0));
        assert!(!v.transparency_unchanged(0.5));
        assert!(v.scale_unchanged(1.0, 1.0));
        assert!(!v.scale_unchanged(2.0, 1.0));
        assert!(v.translation_unchanged(0, 0));
        assert!(!v.translation_unchanged(1, 0));
    }

    fn test_shared() -> Arc<Shared<Vec<u8>>> {
        Shared::new(Vec::new(), 1920, 1080)
    }

    #[test]
    fn child_emits_view_add_and_updates_parent_children() {
        let shared = test_shared();
        let root = View::root(shared.clone());
        let child = root.child(0, 0, 100, 50, true).unwrap();

        shared.with_registry(|r| {
            let parent = r.view(ids::ID_ROOT_VIEW).unwrap();
            assert_eq!(parent.children, vec![child.id()]);
            let v = r.view(child.id()).unwrap();
            assert_eq!(v.parent, Some(ids::ID_ROOT_VIEW));
            assert_eq!((v.w, v.h), (100, 50));
        });
    }

    #[test]
    fn set_transparency_is_elided_when_unchanged() {
        let shared = test_shared();
        let root = View::root(shared.clone());
        let before = shared.with_registry(|r| r.view(root.id()).unwrap().clone());
        root.set_transparency(1.0, None, Duration::ZERO).unwrap();
        let after = shared.with_registry(|r| r.view(root.id()).unwrap().clone());
        assert_eq!(before.transparency, after.transparency);
    }

    #[test]
    fn set_bounds_always_updates_even_when_unchanged() {
        let shared = test_shared();
        let root = View::root(shared.clone());
        root.set_bounds(0, 0, 1920, 1080, None, Duration::ZERO).unwrap();
        let after = shared.with_registry(|r| r.view(root.id()).unwrap().clone());
        assert_eq!((after.x, after.y, after.w, after.h), (0, 0, 1920, 1080));
    }
}

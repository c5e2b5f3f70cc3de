//! The public application surface (`spec.md` §4.5–§4.6,
//! `SPEC_FULL.md`'s Public application surface module).
//!
//! `Application` mirrors `hme.py`'s `Application` class hook-for-hook,
//! each with the same default behavior the Python base class gives it.
//! `FocusHandler` is the capability-set replacement for the original's
//! duck-typed focus dispatch (`spec.md` §9): a focus holder implements
//! whichever subset of handlers it cares about, and dispatch falls back
//! to the application-level handler for the rest.

use crate::event::Resolution;
use crate::resource::{FontInfo, Id};
use crate::view::View;
use std::io::Write;

/// Re-exported so callers matching on key events don't need a second
/// `use` for a type that's really part of the event loop's vocabulary.
pub use crate::event::KeyAction;

/// One key/value pair read out of a `DEVICE_INFO`/`APP_INFO`/`RSRC_INFO`
/// parameter list.
pub type InfoParams = Vec<(String, String)>;

/// Application-level hooks (`hme.py`'s `Application` class). Every
/// method has a default matching the original's base-class behavior, so
/// an implementor overrides only the handlers it cares about.
pub trait Application<W: Write + 'static>: Send + Sync {
    /// Called once after the handshake completes and the root view's
    /// initial visibility has been emitted.
    fn startup(&self, _root: &View<W>) {}

    /// Called once while the session transitions from Running to
    /// Draining, before `SET_ACTIVE(false)` is sent for the root stream.
    fn cleanup(&self) {}

    fn handle_key_press(&self, _keynum: i32, _rawcode: i32) {}

    /// Defaults to forwarding to [`Application::handle_key_press`],
    /// matching the original's default.
    fn handle_key_repeat(&self, keynum: i32, rawcode: i32) {
        self.handle_key_press(keynum, rawcode);
    }

    fn handle_key_release(&self, _keynum: i32, _rawcode: i32) {}

    /// `APP_INFO` carried `active=true` or `active=false`.
    fn handle_active(&self, _active: bool) {}

    /// `APP_INFO` carried an `error.code`, with optional `error.text`.
    fn handle_error(&self, _code: &str, _text: Option<&str>) {}

    /// Any other `APP_INFO` (no `error.code`, no `active` key).
    fn handle_app_info(&self, _params: &InfoParams) {}

    fn handle_device_info(&self, _params: &InfoParams) {}

    fn handle_resource_info(&self, _resource_id: Id, _status: crate::resource::ResourceStatus, _params: &InfoParams) {}

    fn handle_font_info(&self, _font_id: Id, _info: &FontInfo) {}

    /// Returns whether the idle condition was handled. Defaults to
    /// "not handled", matching the original.
    fn handle_idle(&self) -> bool {
        false
    }

    /// Returns the preferred resolution. Defaults to keeping the
    /// current one.
    fn handle_resolution(&self, current: Resolution, _available: &[Resolution]) -> Resolution {
        current
    }

    /// Called with `(init_params, memento)` when an `INIT_INFO` event
    /// arrives through the normal event loop.
    fn handle_init_info(&self, _params: &crate::protocol::Dict, _memento: &[u8]) {}
}

/// A capability-set focus holder (`spec.md` §9's redesign of the
/// original's duck-typed `getattr(focus, 'onKey', None)` dispatch).
/// Every method defaults to "not handled"; dispatch falls back to the
/// application-level handler for anything a given focus holder doesn't
/// implement.
pub trait FocusHandler<W: Write + 'static>: Send + Sync {
    fn on_key(&self, _action: KeyAction, _keynum: i32, _rawcode: i32) -> bool {
        false
    }
    fn on_device_info(&self, _params: &InfoParams) -> bool {
        false
    }
    fn on_app_info(&self, _params: &InfoParams) -> bool {
        false
    }
    fn on_resource_info(&self, _resource_id: Id, _status: crate::resource::ResourceStatus, _params: &InfoParams) -> bool {
        false
    }
    fn on_font_info(&self, _font_id: Id, _info: &FontInfo) -> bool {
        false
    }
    fn on_idle(&self) -> Option<bool> {
        None
    }
    fn on_init_info(&self, _params: &crate::protocol::Dict, _memento: &[u8]) -> bool {
        false
    }
    fn on_resolution(&self, _current: Resolution, _available: &[Resolution]) -> Option<Resolution> {
        None
    }

    /// Called on the outgoing holder before the incoming one gains
    /// focus (lose-focus), and on the incoming holder after (gain-focus)
    /// — `gained` distinguishes the two calls.
    fn on_focus(&self, _gained: bool) {}
}

//! The single mutex guarding the outbound writer and the registry
//! (`spec.md` §5, `SPEC_FULL.md` Session lifecycle / Concurrency core).
//!
//! One [`Shared`] is created per session and handed out as an `Arc` to
//! the reader thread and every worker thread an application spawns.
//! Every command frame and every piece of registry bookkeeping that must
//! be consistent with it goes through the same lock, so "build frame +
//! write" and "update the cache / shadow state" are atomic together —
//! exactly the pairing `spec.md` §5 requires ("the registry lock may be
//! the same lock as the writer lock for simplicity").

use crate::command::Command;
use crate::error::SessionError;
use crate::protocol::Dict;
use crate::registry::{AnimKey, FontKey, Registry};
use crate::resource::{ids, Id};
use crate::view::ViewRecord;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct Inner<W> {
    writer: W,
    registry: Registry,
}

pub struct Shared<W> {
    inner: Mutex<Inner<W>>,
}

impl<W: Write> Shared<W> {
    /// Build the shared writer/registry state, seeding the registry with
    /// the root view at the session's initial resolution.
    pub fn new(writer: W, root_width: i32, root_height: i32) -> Arc<Self> {
        let mut registry = Registry::new();
        registry.insert_view(ids::ID_ROOT_VIEW, ViewRecord::root(root_width, root_height));
        Arc::new(Shared {
            inner: Mutex::new(Inner { writer, registry }),
        })
    }

    /// Serialize and write one command frame while holding the lock.
    /// Does not flush — callers that need the bytes on the wire
    /// immediately call [`Shared::flush`] afterward (the event loop and
    /// `sleep` do this; a burst of scene-graph edits need not).
    pub fn emit(&self, cmd: &Command) -> Result<(), SessionError> {
        log::trace!("emit {cmd:?}");
        let mut inner = self.inner.lock().unwrap();
        cmd.write(&mut inner.writer)?;
        Ok(())
    }

    pub fn flush(&self) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().unwrap();
        inner.writer.flush()?;
        Ok(())
    }

    pub fn alloc_id(&self) -> Id {
        self.inner.lock().unwrap().registry.alloc_id()
    }

    /// Run `f` against the registry while holding the same lock `emit`
    /// uses, so a caller that both emits and updates the shadow
    /// state/cache does so as one atomic step.
    pub fn with_registry<T>(&self, f: impl FnOnce(&mut Registry) -> T) -> T {
        let mut inner = self.inner.lock().unwrap();
        f(&mut inner.registry)
    }
}

impl<W: Write + 'static> Shared<W> {
    /// Create or reuse a cached Color resource. Alpha is forced to
    /// `0xff` if the caller left it clear — "the alpha doesn't work
    /// except in the simulator" (`hme.py` `Color.__init__`), preserved
    /// here as a doc note rather than special-cased behavior.
    pub fn add_color(self: &Arc<Self>, argb: u32) -> Result<crate::handle::ResourceHandle<W>, SessionError> {
        let argb = argb | 0xff000000;
        if let Some(id) = self.with_registry(|r| r.cached_color(argb)) {
            return Ok(crate::handle::ResourceHandle::new(self.clone(), id, false));
        }
        let id = self.alloc_id();
        self.emit(&Command::AddColor { id, argb })?;
        self.with_registry(|r| {
            r.insert_resource(id, crate::resource::ResourceKind::Color { argb }, true);
            r.cache_color(argb, id);
        });
        Ok(crate::handle::ResourceHandle::new(self.clone(), id, false))
    }

    /// Create or reuse a cached TTF resource. `name` is the cache key;
    /// pass `None` to always allocate a fresh, uncached font file.
    pub fn add_ttf(
        self: &Arc<Self>,
        name: Option<&str>,
        data: Vec<u8>,
    ) -> Result<crate::handle::ResourceHandle<W>, SessionError> {
        if let Some(name) = name {
            if let Some(id) = self.with_registry(|r| r.cached_ttf(name)) {
                return Ok(crate::handle::ResourceHandle::new(self.clone(), id, false));
            }
        }
        let id = self.alloc_id();
        self.emit(&Command::AddTtf { id, data })?;
        self.with_registry(|r| {
            r.insert_resource(
                id,
                crate::resource::ResourceKind::Ttf {
                    name: name.map(String::from),
                },
                true,
            );
            if let Some(name) = name {
                r.cache_ttf(name.to_string(), id);
            }
        });
        Ok(crate::handle::ResourceHandle::new(self.clone(), id, false))
    }

    /// Create or reuse a cached Font resource, keyed by
    /// `(ttf_id, style, size, flags)`.
    pub fn add_font(
        self: &Arc<Self>,
        ttf_id: Id,
        style: crate::resource::FontStyle,
        size: f32,
        flags: i32,
    ) -> Result<crate::handle::ResourceHandle<W>, SessionError> {
        let key = font_cache_key(ttf_id, style, size, flags);
        if let Some(id) = self.with_registry(|r| r.cached_font(key)) {
            return Ok(crate::handle::ResourceHandle::new(self.clone(), id, false));
        }
        let id = self.alloc_id();
        self.emit(&Command::AddFont {
            id,
            ttf_id,
            style,
            size,
            flags,
        })?;
        self.with_registry(|r| {
            r.insert_resource(
                id,
                crate::resource::ResourceKind::Font {
                    ttf_id,
                    style,
                    size,
                    flags,
                },
                true,
            );
            r.cache_font(key, id);
        });
        Ok(crate::handle::ResourceHandle::new(self.clone(), id, false))
    }

    /// Create a Text resource. Not cached — owned by whichever handle
    /// the caller holds (typically the view it gets bound to).
    pub fn add_text(
        self: &Arc<Self>,
        font_id: Id,
        color_id: Id,
        text: &str,
    ) -> Result<crate::handle::ResourceHandle<W>, SessionError> {
        let id = self.alloc_id();
        self.emit(&Command::AddText {
            id,
            font_id,
            color_id,
            text: text.to_string(),
        })?;
        self.with_registry(|r| {
            r.insert_resource(
                id,
                crate::resource::ResourceKind::Text {
                    font_id,
                    color_id,
                    text: text.to_string(),
                },
                false,
            );
        });
        Ok(crate::handle::ResourceHandle::new(self.clone(), id, true))
    }

    /// Create or reuse a cached Image resource, keyed by name.
    pub fn add_image(
        self: &Arc<Self>,
        name: Option<&str>,
        data: Vec<u8>,
    ) -> Result<crate::handle::ResourceHandle<W>, SessionError> {
        if let Some(name) = name {
            if let Some(id) = self.with_registry(|r| r.cached_image(name)) {
                return Ok(crate::handle::ResourceHandle::new(self.clone(), id, false));
            }
        }
        let id = self.alloc_id();
        self.emit(&Command::AddImage { id, data })?;
        self.with_registry(|r| {
            r.insert_resource(
                id,
                crate::resource::ResourceKind::Image {
                    name: name.map(String::from),
                },
                true,
            );
            if let Some(name) = name {
                r.cache_image(name.to_string(), id);
            }
        });
        Ok(crate::handle::ResourceHandle::new(self.clone(), id, false))
    }

    /// Create a Sound resource from raw audio bytes. Not cached.
    pub fn add_sound(self: &Arc<Self>, data: Vec<u8>) -> Result<crate::handle::ResourceHandle<W>, SessionError> {
        let id = self.alloc_id();
        self.emit(&Command::AddSound { id, data })?;
        self.with_registry(|r| {
            r.insert_resource(id, crate::resource::ResourceKind::Sound { system_id: None }, false);
        });
        Ok(crate::handle::ResourceHandle::new(self.clone(), id, true))
    }

    /// Reference one of the predefined system sounds (`ids::ID_BONK_SOUND`
    /// and friends) rather than uploading audio data.
    pub fn system_sound(self: &Arc<Self>, system_id: Id) -> crate::handle::ResourceHandle<W> {
        self.with_registry(|r| {
            r.insert_resource(
                system_id,
                crate::resource::ResourceKind::Sound {
                    system_id: Some(system_id),
                },
                true,
            );
        });
        crate::handle::ResourceHandle::new(self.clone(), system_id, false)
    }

    /// Create a Stream resource. Not cached — "streams seem to be
    /// playable only once" (`hme.py` `Stream` docstring).
    pub fn add_stream(
        self: &Arc<Self>,
        url: &str,
        mime: &str,
        autoplay: bool,
        params: Dict,
    ) -> Result<crate::handle::ResourceHandle<W>, SessionError> {
        let id = self.alloc_id();
        self.emit(&Command::AddStream {
            id,
            url: url.to_string(),
            mime: mime.to_string(),
            autoplay,
            params: params.clone(),
        })?;
        self.with_registry(|r| {
            r.insert_resource(
                id,
                crate::resource::ResourceKind::Stream {
                    url: url.to_string(),
                    mime: mime.to_string(),
                    autoplay,
                    params,
                },
                false,
            );
        });
        Ok(crate::handle::ResourceHandle::new(self.clone(), id, true))
    }
}

/// Resolve a mutation's animation argument to a concrete animation id
/// (`spec.md` §4.4 "Animation binding"):
/// - an explicit id is used as-is;
/// - `duration == 0` resolves to the canonical null animation
///   ([`ids::ID_NULL`]), which the receiver treats as instantaneous;
/// - a nonzero duration allocates (or reuses, from the animation cache)
///   a linear (`ease = 0.0`) animation resource for that duration.
pub fn resolve_animation<W: Write>(
    shared: &Arc<Shared<W>>,
    animation: Option<Id>,
    duration: Duration,
) -> Result<Id, SessionError> {
    if let Some(id) = animation {
        return Ok(id);
    }
    let duration_ms = duration.as_millis() as i32;
    if duration_ms == 0 {
        return Ok(ids::ID_NULL);
    }
    let key: AnimKey = (duration_ms, 0.0f32.to_bits());
    if let Some(id) = shared.with_registry(|r| r.cached_anim(key)) {
        return Ok(id);
    }
    let id = shared.alloc_id();
    shared.emit(&Command::AddAnim {
        id,
        duration_ms,
        ease: 0.0,
    })?;
    shared.with_registry(|r| {
        r.insert_resource(
            id,
            crate::resource::ResourceKind::Animation {
                duration_ms,
                ease: 0.0,
            },
            true,
        );
        r.cache_anim(key, id);
    });
    Ok(id)
}

pub fn font_cache_key(ttf_id: Id, style: crate::resource::FontStyle, size: f32, flags: i32) -> FontKey {
    (ttf_id, style as i32, size.to_bits(), flags)
}

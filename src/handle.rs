//! Owning handles over registry resources (`SPEC_FULL.md` Resource
//! registry module, "Ownership / implicit finalization").
//!
//! Named (cached) resources — Color, TTF, Font, Animation — are owned by
//! the registry itself once created; a [`ResourceHandle`] for one of
//! these is just a reference, and only an explicit [`ResourceHandle::remove`]
//! deletes it. Unnamed resources — Text, Sound, Stream — have no cache
//! entry keeping them alive, so their handle is the only thing standing
//! between them and deletion: dropping the last clone emits
//! `CMD_RSRC_REMOVE` automatically, the Rust analogue of the original's
//! reliance on Python garbage collection (`spec.md` §9).

use crate::command::Command;
use crate::error::SessionError;
use crate::shared::Shared;
use crate::resource::Id;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct ResourceInner<W: Write> {
    id: Id,
    shared: Arc<Shared<W>>,
    /// `true` for Text/Sound/Stream — resources with no cache entry, so
    /// the last handle drop is the only thing that ever removes them.
    anonymous: bool,
    removed: AtomicBool,
}

impl<W: Write> ResourceInner<W> {
    fn do_remove(&self) -> Result<(), SessionError> {
        if self.removed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.shared.emit(&Command::ResourceRemove { id: self.id })?;
        self.shared.with_registry(|r| {
            r.remove_resource(self.id);
        });
        Ok(())
    }
}

impl<W: Write> Drop for ResourceInner<W> {
    fn drop(&mut self) {
        if self.anonymous {
            if let Err(err) = self.do_remove() {
                log::error!("implicit removal of resource {} failed: {err}", self.id);
            }
        }
    }
}

/// A live reference to a resource. Cloning is cheap (an `Arc` bump); the
/// resource is removed when the last clone of an anonymous handle drops,
/// or whenever [`ResourceHandle::remove`] is called explicitly.
pub struct ResourceHandle<W: Write> {
    inner: Arc<ResourceInner<W>>,
}

impl<W: Write> Clone for ResourceHandle<W> {
    fn clone(&self) -> Self {
        ResourceHandle {
            inner: self.inner.clone(),
        }
    }
}

impl<W: Write> ResourceHandle<W> {
    pub(crate) fn new(shared: Arc<Shared<W>>, id: Id, anonymous: bool) -> Self {
        ResourceHandle {
            inner: Arc::new(ResourceInner {
                id,
                shared,
                anonymous,
                removed: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> Id {
        self.inner.id
    }

    pub fn set_active(&self, active: bool) -> Result<(), SessionError> {
        self.inner.shared.emit(&Command::ResourceSetActive {
            id: self.id(),
            active,
        })
    }

    pub fn set_position(&self, position_ms: i32) -> Result<(), SessionError> {
        self.inner.shared.emit(&Command::ResourceSetPosition {
            id: self.id(),
            position_ms,
        })
    }

    pub fn set_speed(&self, speed: f32) -> Result<(), SessionError> {
        self.inner.shared.emit(&Command::ResourceSetSpeed {
            id: self.id(),
            speed,
        })
    }

    pub fn play(&self) -> Result<(), SessionError> {
        self.set_speed(1.0)
    }

    pub fn pause(&self) -> Result<(), SessionError> {
        self.set_speed(0.0)
    }

    pub fn close(&self) -> Result<(), SessionError> {
        self.inner.shared.emit(&Command::ResourceClose { id: self.id() })
    }

    /// Explicitly remove the resource. A no-op if already removed
    /// (including by a prior implicit drop).
    pub fn remove(&self) -> Result<(), SessionError> {
        self.inner.do_remove()
    }
}

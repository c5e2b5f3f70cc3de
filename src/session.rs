//! Session lifecycle and event dispatch (`spec.md` §4.5–§4.6).
//!
//! [`Session`] owns the inbound half of the connection — "the session
//! runs on one reader thread" (`spec.md` §5) — and hosts the event loop.
//! [`SessionHandle`] is the `Clone`-able, `Send + Sync` half an
//! application hands to worker threads: it reaches the same
//! [`Shared`] writer/registry `Session` uses, plus cooperative
//! cancellation, without needing access to the reader.

use crate::app::{Application, FocusHandler};
use crate::command::{send_key_command, Command, Direction, MAX_MEMENTO_LEN};
use crate::error::SessionError;
use crate::event::{read_event, Event, KeyAction};
use crate::protocol::{framing, Dict, ProtocolError};
use crate::resource::ids;
use crate::shared::Shared;
use crate::view::View;
use std::io::{Cursor, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const HANDSHAKE_MAJOR: u8 = 0;
const HANDSHAKE_MINOR: u8 = 49;

/// The writer/registry/cancellation an application shares with its
/// worker threads (`spec.md` §5: "one reader and potentially many
/// writers"). Cloning is a cheap `Arc` bump.
pub struct SessionHandle<W: Write + 'static> {
    shared: Arc<Shared<W>>,
    active: Arc<AtomicBool>,
}

impl<W: Write + 'static> Clone for SessionHandle<W> {
    fn clone(&self) -> Self {
        SessionHandle {
            shared: self.shared.clone(),
            active: self.active.clone(),
        }
    }
}

impl<W: Write + 'static> SessionHandle<W> {
    pub fn shared(&self) -> Arc<Shared<W>> {
        self.shared.clone()
    }

    pub fn root_view(&self) -> View<W> {
        View::root(self.shared.clone())
    }

    /// Whether the session is still running. Workers should check this
    /// between command bursts (`spec.md` §5: "workers observe it
    /// between iterations").
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// The sole cancellation primitive (`spec.md` §5). There is no
    /// forced abort — the reader notices after the in-flight event
    /// finishes, a worker after its current iteration.
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// Flush the outbound writer, then suspend the calling thread. A
    /// failed flush cancels the session rather than suspending with
    /// unflushed state (`spec.md` §5).
    pub fn sleep(&self, duration: Duration) {
        if self.shared.flush().is_err() {
            self.stop();
            return;
        }
        std::thread::sleep(duration);
    }

    /// Inject a synthetic key press into the root stream, echoed back
    /// through the normal `EVT_KEY` path (`hme.py` `Application.send_key`).
    pub fn send_key(&self, keycode: i32) -> Result<(), SessionError> {
        self.shared.emit(&send_key_command(ids::ID_ROOT_STREAM, keycode))?;
        self.shared.flush()
    }

    /// Request a transition to a different application (`spec.md` §6).
    /// A memento over [`MAX_MEMENTO_LEN`] bytes fails locally without
    /// touching the wire; the session otherwise continues running.
    pub fn transition(&self, url: &str, direction: Direction, params: Dict, memento: Vec<u8>) -> Result<(), SessionError> {
        if memento.len() > MAX_MEMENTO_LEN {
            return Err(SessionError::MementoTooLarge(memento.len()));
        }
        self.shared.emit(&Command::Transition {
            url: url.to_string(),
            direction,
            params,
            memento,
        })?;
        self.shared.flush()
    }
}

/// One client session: handshake, startup, the event loop, and an
/// orderly drain on the way out.
pub struct Session<R: Read, W: Write + 'static> {
    reader: R,
    handle: SessionHandle<W>,
    focus: Mutex<Option<Arc<dyn FocusHandler<W>>>>,
}

impl<R: Read, W: Write + 'static> Session<R, W> {
    /// Perform the 8-byte handshake (`spec.md` §4.3, §6:
    /// `"SBTV"` + two zero bytes + `<major><minor>`) and build a
    /// `Session` ready for [`Session::run`]. A magic mismatch or a
    /// closed transport fails here rather than producing a `Session` —
    /// the **Idle → Dead** transition with no `Session` ever reaching
    /// **Running**.
    pub fn start(mut reader: R, mut writer: W, root_width: i32, root_height: i32) -> Result<Self, SessionError> {
        writer.write_all(b"SBTV")?;
        writer.write_all(&[0, 0, HANDSHAKE_MAJOR, HANDSHAKE_MINOR])?;
        writer.flush()?;

        let mut peer = [0u8; 8];
        reader.read_exact(&mut peer).map_err(|_| SessionError::TransportClosed)?;
        if &peer[0..4] != b"SBTV" {
            return Err(SessionError::Protocol(ProtocolError::BadMagic));
        }

        let shared = Shared::new(writer, root_width, root_height);
        Ok(Session {
            reader,
            handle: SessionHandle {
                shared,
                active: Arc::new(AtomicBool::new(true)),
            },
            focus: Mutex::new(None),
        })
    }

    /// A handle workers and the application itself can clone out and
    /// move across threads.
    pub fn handle(&self) -> SessionHandle<W> {
        self.handle.clone()
    }

    /// Set (or clear) the focus object. Notifies the outgoing holder
    /// before the incoming one, per `spec.md` §4.5.
    pub fn set_focus(&self, focus: Option<Arc<dyn FocusHandler<W>>>) {
        let mut slot = self.focus.lock().unwrap();
        if let Some(old) = slot.as_ref() {
            old.on_focus(false);
        }
        if let Some(new) = &focus {
            new.on_focus(true);
        }
        *slot = focus;
    }

    fn with_focus(&self, f: impl FnOnce(&dyn FocusHandler<W>) -> bool) -> bool {
        let focus = self.focus.lock().unwrap();
        focus.as_ref().map(|h| f(h.as_ref())).unwrap_or(false)
    }

    fn with_focus_opt<T>(&self, f: impl FnOnce(&dyn FocusHandler<W>) -> Option<T>) -> Option<T> {
        let focus = self.focus.lock().unwrap();
        focus.as_ref().and_then(|h| f(h.as_ref()))
    }

    /// Drive the session to completion: **Handshaken → Running →
    /// Draining → Dead** (`spec.md` §4.6). Consumes `self` — a session
    /// runs once.
    pub fn run(mut self, app: &dyn Application<W>) -> Result<(), SessionError> {
        let root = self.handle.root_view();
        app.startup(&root);
        root.set_visible(true, None, Duration::ZERO)?;
        self.handle.shared.flush()?;

        let mut result = Ok(());
        while self.handle.is_active() {
            let message = match framing::read_message(&mut self.reader) {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    result = Err(SessionError::TransportClosed);
                    break;
                }
                Err(err) => {
                    result = Err(SessionError::Protocol(err));
                    break;
                }
            };
            let mut cursor = Cursor::new(message);
            let event = match read_event(&mut cursor) {
                Ok(event) => event,
                Err(err) => {
                    result = Err(SessionError::Protocol(err));
                    break;
                }
            };
            if let Err(err) = self.dispatch(app, event) {
                result = Err(err);
                break;
            }
        }

        app.cleanup();
        let _ = self.handle.shared.emit(&Command::ResourceSetActive {
            id: ids::ID_ROOT_STREAM,
            active: false,
        });
        let _ = self.handle.shared.flush();

        // Drain remaining inbound events without dispatch on the way to Dead.
        while matches!(framing::read_message(&mut self.reader), Ok(Some(_))) {}

        result
    }

    fn dispatch(&self, app: &dyn Application<W>, event: Event) -> Result<(), SessionError> {
        match event {
            Event::DeviceInfo { params, .. } => {
                if !self.with_focus(|f| f.on_device_info(&params)) {
                    app.handle_device_info(&params);
                }
            }
            Event::AppInfo { params, .. } => {
                if let Some((_, code)) = params.iter().find(|(k, _)| k == "error.code") {
                    let text = params
                        .iter()
                        .find(|(k, _)| k == "error.text")
                        .map(|(_, v)| v.as_str());
                    if !self.with_focus(|f| f.on_app_info(&params)) {
                        app.handle_error(code, text);
                    }
                } else if params.iter().any(|(k, v)| k == "active" && v == "true") {
                    if !self.with_focus(|f| f.on_app_info(&params)) {
                        app.handle_active(true);
                    }
                } else if params.iter().any(|(k, v)| k == "active" && v == "false") {
                    self.handle.stop();
                } else if !self.with_focus(|f| f.on_app_info(&params)) {
                    app.handle_app_info(&params);
                }
            }
            Event::ResourceInfo {
                resource_id,
                status,
                params,
            } => {
                if !self.with_focus(|f| f.on_resource_info(resource_id, status, &params)) {
                    app.handle_resource_info(resource_id, status, &params);
                }
            }
            Event::Key {
                action,
                keynum,
                rawcode,
                ..
            } => {
                if !self.with_focus(|f| f.on_key(action, keynum, rawcode)) {
                    match action {
                        KeyAction::Press => app.handle_key_press(keynum, rawcode),
                        KeyAction::Repeat => app.handle_key_repeat(keynum, rawcode),
                        KeyAction::Release => app.handle_key_release(keynum, rawcode),
                        KeyAction::Other(_) => {}
                    }
                }
            }
            Event::Idle { .. } => {
                let handled = self
                    .with_focus_opt(|f| f.on_idle())
                    .unwrap_or_else(|| app.handle_idle());
                self.handle.shared.emit(&Command::AcknowledgeIdle { handled })?;
            }
            Event::FontInfo { resource_id, info } => {
                self.handle
                    .shared
                    .with_registry(|r| r.set_font_info(resource_id, info.clone()));
                if !self.with_focus(|f| f.on_font_info(resource_id, &info)) {
                    app.handle_font_info(resource_id, &info);
                }
            }
            Event::InitInfo {
                params, memento, ..
            } => {
                if !self.with_focus(|f| f.on_init_info(&params, &memento)) {
                    app.handle_init_info(&params, &memento);
                }
            }
            Event::ResolutionInfo {
                current, available, ..
            } => {
                let preferred = self
                    .with_focus_opt(|f| f.on_resolution(current, &available))
                    .unwrap_or_else(|| app.handle_resolution(current, &available));
                if preferred != current && available.contains(&preferred) {
                    self.handle.shared.emit(&Command::SetResolution {
                        w: preferred.w,
                        h: preferred.h,
                        px: preferred.px,
                        py: preferred.py,
                    })?;
                    self.handle.shared.with_registry(|r| {
                        if let Some(v) = r.view_mut(ids::ID_ROOT_VIEW) {
                            v.w = preferred.w;
                            v.h = preferred.h;
                        }
                    });
                }
            }
            Event::Unknown { .. } => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::InfoParams;
    use std::io::Cursor as IoCursor;
    use std::sync::atomic::AtomicUsize;

    fn handshake_bytes(major: u8, minor: u8) -> Vec<u8> {
        let mut bytes = b"SBTV".to_vec();
        bytes.extend_from_slice(&[0, 0, major, minor]);
        bytes
    }

    #[test]
    fn valid_handshake_builds_a_session() {
        let reader = IoCursor::new(handshake_bytes(0, 49));
        let writer = Vec::new();
        let session = Session::start(reader, writer, 1920, 1080);
        assert!(session.is_ok());
    }

    #[test]
    fn bad_magic_fails_before_any_session_exists() {
        let mut bytes = handshake_bytes(0, 49);
        bytes[0] = b'X';
        let reader = IoCursor::new(bytes);
        let writer = Vec::new();
        let err = Session::start(reader, writer, 1920, 1080).unwrap_err();
        assert!(matches!(err, SessionError::Protocol(ProtocolError::BadMagic)));
    }

    struct CountingApp {
        presses: AtomicUsize,
    }

    impl Application<Vec<u8>> for CountingApp {
        fn handle_key_press(&self, _keynum: i32, _rawcode: i32) {
            self.presses.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn key_press_reaches_the_application_handler_absent_focus() {
        let reader = IoCursor::new(handshake_bytes(0, 49));
        let writer = Vec::new();
        let session = Session::start(reader, writer, 1920, 1080).unwrap();
        let app = CountingApp {
            presses: AtomicUsize::new(0),
        };
        let mut params: InfoParams = Vec::new();
        params.push(("active".to_string(), "false".to_string()));
        session.dispatch(&app, Event::AppInfo { resource_id: ids::ID_ROOT_STREAM, params }).unwrap();
        assert!(!session.handle.is_active());
        session.dispatch(
            &app,
            Event::Key {
                resource_id: ids::ID_ROOT_STREAM,
                action: KeyAction::Press,
                keynum: 7,
                rawcode: 0,
            },
        ).unwrap();
        assert_eq!(app.presses.load(Ordering::SeqCst), 1);
    }

    struct PressOnlyFocus {
        presses: AtomicUsize,
    }

    impl FocusHandler<Vec<u8>> for PressOnlyFocus {
        fn on_key(&self, action: KeyAction, _keynum: i32, _rawcode: i32) -> bool {
            if action == KeyAction::Press {
                self.presses.fetch_add(1, Ordering::SeqCst);
                true
            } else {
                false
            }
        }
    }

    #[test]
    fn focus_handler_intercepts_key_before_the_application() {
        let reader = IoCursor::new(handshake_bytes(0, 49));
        let writer = Vec::new();
        let session = Session::start(reader, writer, 1920, 1080).unwrap();
        let app = CountingApp {
            presses: AtomicUsize::new(0),
        };
        let focus = Arc::new(PressOnlyFocus {
            presses: AtomicUsize::new(0),
        });
        session.set_focus(Some(focus.clone()));
        session
            .dispatch(
                &app,
                Event::Key {
                    resource_id: ids::ID_ROOT_STREAM,
                    action: KeyAction::Press,
                    keynum: 7,
                    rawcode: 0,
                },
            )
            .unwrap();
        assert_eq!(focus.presses.load(Ordering::SeqCst), 1);
        assert_eq!(app.presses.load(Ordering::SeqCst), 0);
    }
}

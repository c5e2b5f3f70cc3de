//! Client-side runtime for TiVo's HME ("Home Media Extensions")
//! application protocol: the chunk-framed binary protocol spoken over a
//! TCP connection between a set-top receiver and a server-side
//! interactive application.
//!
//! This crate is the library an application is built on — it owns the
//! wire codec, the resource/view registry, command emission, and the
//! event loop. It does not include an HTTP front door, service
//! discovery, or file serving; callers hand it an already-connected,
//! bidirectional byte stream positioned right after those concerns.
//!
//! Start a session with [`session::Session::start`], drive it with
//! [`session::Session::run`], and build scene graph / resources through
//! the [`view::View`] and [`shared::Shared`] handles it hands back.

pub mod app;
pub mod command;
pub mod error;
pub mod event;
pub mod handle;
pub mod protocol;
pub mod registry;
pub mod resource;
pub mod session;
pub mod shared;
pub mod view;

pub use app::{Application, FocusHandler};
pub use error::SessionError;
pub use event::Event;
pub use handle::ResourceHandle;
pub use session::{Session, SessionHandle};
pub use view::View;

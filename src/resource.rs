//! Resource ids, kinds, and the constant tables from `hme.py` that name
//! them (`spec.md` §3, supplemented per `SPEC_FULL.md`).

use crate::protocol::Dict;
use std::collections::HashMap;

/// A resource or view id. IDs below [`ids::ID_CLIENT`] are reserved system
/// ids; application-allocated ids start at `ID_CLIENT` and never repeat
/// within a session.
pub type Id = u32;

/// Reserved system resource and view ids (`spec.md` §3).
pub mod ids {
    use super::Id;

    pub const ID_NULL: Id = 0;
    pub const ID_ROOT_STREAM: Id = 1;
    pub const ID_ROOT_VIEW: Id = 2;
    pub const ID_DEFAULT_TTF: Id = 10;
    pub const ID_SYSTEM_TTF: Id = 11;
    pub const ID_BONK_SOUND: Id = 20;
    pub const ID_UPDOWN_SOUND: Id = 21;
    pub const ID_THUMBSUP_SOUND: Id = 22;
    pub const ID_THUMBSDOWN_SOUND: Id = 23;
    pub const ID_SELECT_SOUND: Id = 24;
    pub const ID_TIVO_SOUND: Id = 25;
    pub const ID_LEFT_SOUND: Id = 26;
    pub const ID_RIGHT_SOUND: Id = 27;
    pub const ID_PAGEUP_SOUND: Id = 28;
    pub const ID_PAGEDOWN_SOUND: Id = 29;
    pub const ID_ALERT_SOUND: Id = 30;
    pub const ID_DESELECT_SOUND: Id = 31;
    pub const ID_ERROR_SOUND: Id = 32;
    pub const ID_SLOWDOWN1_SOUND: Id = 33;
    pub const ID_SPEEDUP1_SOUND: Id = 34;
    pub const ID_SPEEDUP2_SOUND: Id = 35;
    pub const ID_SPEEDUP3_SOUND: Id = 36;
    /// First id handed out by [`crate::registry::Registry::alloc_id`].
    pub const ID_CLIENT: Id = 2048;
}

/// Font style flags for `ADD_FONT` (`spec.md` §4.4).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum FontStyle {
    Plain = 0,
    Bold = 1,
    Italic = 2,
    BoldItalic = 3,
}

/// Bitwise flags passed to `ADD_FONT` requesting `FONT_INFO` data back.
/// Undocumented in the formal spec but present in every known
/// implementation (`hme.py` comment: "This is not documented in the HME
/// spec").
pub mod font_metrics {
    pub const BASIC: i32 = 1;
    pub const GLYPH: i32 = 2;
}

/// `SET_RESOURCE` / text-and-image layout flags. Opaque to this crate —
/// it does not interpret rendering, only names the bits (`spec.md` §1
/// Non-goals).
pub mod rsrc_flags {
    pub const HALIGN_LEFT: i32 = 1;
    pub const HALIGN_CENTER: i32 = 2;
    pub const HALIGN_RIGHT: i32 = 4;
    pub const VALIGN_TOP: i32 = 0x10;
    pub const VALIGN_CENTER: i32 = 0x20;
    pub const VALIGN_BOTTOM: i32 = 0x40;
    pub const TEXT_WRAP: i32 = 0x0100;
    pub const IMAGE_HFIT: i32 = 0x1000;
    pub const IMAGE_VFIT: i32 = 0x2000;
    pub const IMAGE_BESTFIT: i32 = 0x4000;
}

/// Status codes carried by `RSRC_INFO` events.
///
/// `Other` covers any value the receiver sends that isn't one of the
/// documented codes — receiver data is not under this crate's control, so
/// decoding never panics on an unrecognized value.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResourceStatus {
    Unknown,
    Connecting,
    Connected,
    Loading,
    Ready,
    Playing,
    Paused,
    Seeking,
    Closed,
    Complete,
    Error,
    Other(i32),
}

impl From<i32> for ResourceStatus {
    fn from(value: i32) -> Self {
        match value {
            0 => ResourceStatus::Unknown,
            1 => ResourceStatus::Connecting,
            2 => ResourceStatus::Connected,
            3 => ResourceStatus::Loading,
            4 => ResourceStatus::Ready,
            5 => ResourceStatus::Playing,
            6 => ResourceStatus::Paused,
            7 => ResourceStatus::Seeking,
            8 => ResourceStatus::Closed,
            9 => ResourceStatus::Complete,
            10 => ResourceStatus::Error,
            other => ResourceStatus::Other(other),
        }
    }
}

/// Resource error codes carried alongside a non-ready `RSRC_INFO` status.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResourceErrorCode {
    Unknown,
    BadData,
    BadMagic,
    BadVersion,
    ConnectionLost,
    ConnectionTimeout,
    ConnectFailed,
    HostNotFound,
    Incompatible,
    NotSupported,
    BadArgument,
    BadState,
    Other(i32),
}

impl From<i32> for ResourceErrorCode {
    fn from(value: i32) -> Self {
        match value {
            0 => ResourceErrorCode::Unknown,
            1 => ResourceErrorCode::BadData,
            2 => ResourceErrorCode::BadMagic,
            3 => ResourceErrorCode::BadVersion,
            4 => ResourceErrorCode::ConnectionLost,
            5 => ResourceErrorCode::ConnectionTimeout,
            6 => ResourceErrorCode::ConnectFailed,
            7 => ResourceErrorCode::HostNotFound,
            8 => ResourceErrorCode::Incompatible,
            9 => ResourceErrorCode::NotSupported,
            20 => ResourceErrorCode::BadArgument,
            21 => ResourceErrorCode::BadState,
            other => ResourceErrorCode::Other(other),
        }
    }
}

/// Application error codes (`APP_ERROR_*`). `EVT_APP_INFO`'s `error.code`
/// is transmitted as a string (`spec.md` §4.5); these constants are for
/// applications that want to compare against the documented numeric
/// codes without hardcoding the literal strings.
pub mod app_error {
    pub const UNKNOWN: &str = "0";
    pub const BAD_ARGUMENT: &str = "1";
    pub const BAD_COMMAND: &str = "2";
    pub const RSRC_NOT_FOUND: &str = "3";
    pub const VIEW_NOT_FOUND: &str = "4";
    pub const OUT_OF_MEMORY: &str = "5";
    pub const INVALID_TRANSITION: &str = "6";
    pub const INVALID_RESOLUTION: &str = "7";
    pub const OTHER: &str = "100";
}

/// Per-glyph metrics populated by an `EVT_FONT_INFO` reply.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GlyphMetrics {
    pub advance: f32,
    pub bounding: f32,
}

/// Font metrics populated after the receiver replies to an `ADD_FONT`
/// that requested them (`spec.md` §3, §4.5).
#[derive(Clone, Debug, Default)]
pub struct FontInfo {
    pub ascent: f32,
    pub descent: f32,
    pub height: f32,
    pub line_gap: f32,
    pub glyphs: HashMap<u32, GlyphMetrics>,
}

/// The content backing a resource, as created via a `CMD_RSRC_ADD_*`
/// command. Stored in the registry so a cache hit can report back the
/// key it was constructed from.
#[derive(Clone, Debug, PartialEq)]
pub enum ResourceKind {
    Color {
        argb: u32,
    },
    Ttf {
        name: Option<String>,
    },
    Font {
        ttf_id: Id,
        style: FontStyle,
        size: f32,
        flags: i32,
    },
    Text {
        font_id: Id,
        color_id: Id,
        text: String,
    },
    Image {
        name: Option<String>,
    },
    Sound {
        system_id: Option<Id>,
    },
    Stream {
        url: String,
        mime: String,
        autoplay: bool,
        params: Dict,
    },
    Animation {
        duration_ms: i32,
        ease: f32,
    },
}

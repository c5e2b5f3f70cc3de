//! Event decoding (`spec.md` §4.5) and the key-code / error-code tables
//! that `hme.py` defines alongside them.

use crate::protocol::{self, Dict, ProtocolError};
use crate::resource::{FontInfo, GlyphMetrics, Id, ResourceStatus};
use std::collections::HashMap;
use std::io::Read;

/// Event opcodes (the first `vint` of every event message).
pub mod evnum {
    pub const DEVICE_INFO: i32 = 1;
    pub const APP_INFO: i32 = 2;
    pub const RSRC_INFO: i32 = 3;
    pub const KEY: i32 = 4;
    pub const IDLE: i32 = 5;
    pub const FONT_INFO: i32 = 6;
    pub const INIT_INFO: i32 = 7;
    pub const RESOLUTION_INFO: i32 = 8;
}

/// `KEY`'s action field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Repeat,
    Release,
    /// Any value other than 1/2/3 — the receiver is not under this
    /// crate's control.
    Other(i32),
}

impl From<i32> for KeyAction {
    fn from(value: i32) -> Self {
        match value {
            1 => KeyAction::Press,
            2 => KeyAction::Repeat,
            3 => KeyAction::Release,
            other => KeyAction::Other(other),
        }
    }
}

/// Key codes sent in `EVT_KEY` (`hme.py`, "Key codes for EVT_KEY").
/// Several option-button codes alias each other in the original; this
/// crate keeps the same aliasing as duplicate constants rather than
/// distinct values, so application code matching on the original's names
/// still compiles and compares equal.
pub mod keys {
    pub const KEY_UNKNOWN: i32 = 0;
    /// Never sent by a real receiver.
    pub const KEY_TIVO: i32 = 1;
    pub const KEY_UP: i32 = 2;
    pub const KEY_DOWN: i32 = 3;
    pub const KEY_LEFT: i32 = 4;
    pub const KEY_RIGHT: i32 = 5;
    pub const KEY_SELECT: i32 = 6;
    pub const KEY_PLAY: i32 = 7;
    pub const KEY_PAUSE: i32 = 8;
    pub const KEY_SLOW: i32 = 9;
    pub const KEY_REVERSE: i32 = 10;
    pub const KEY_FORWARD: i32 = 11;
    pub const KEY_REPLAY: i32 = 12;
    pub const KEY_ADVANCE: i32 = 13;
    pub const KEY_THUMBSUP: i32 = 14;
    pub const KEY_THUMBSDOWN: i32 = 15;
    pub const KEY_VOLUMEUP: i32 = 16;
    pub const KEY_VOLUMEDOWN: i32 = 17;
    pub const KEY_CHANNELUP: i32 = 18;
    pub const KEY_CHANNELDOWN: i32 = 19;
    pub const KEY_MUTE: i32 = 20;
    pub const KEY_RECORD: i32 = 21;
    pub const KEY_OPT_WINDOW: i32 = 22;
    pub const KEY_OPT_PIP: i32 = KEY_OPT_WINDOW;
    pub const KEY_OPT_ASPECT: i32 = KEY_OPT_WINDOW;
    /// Never sent.
    pub const KEY_LIVE_TV: i32 = 23;
    /// Never sent.
    pub const KEY_OPT_EXIT: i32 = 24;
    pub const KEY_INFO: i32 = 25;
    pub const KEY_DISPLAY: i32 = KEY_INFO;
    /// Never sent.
    pub const KEY_OPT_LIST: i32 = 26;
    /// Never sent.
    pub const KEY_OPT_GUIDE: i32 = 27;
    pub const KEY_CLEAR: i32 = 28;
    pub const KEY_ENTER: i32 = 29;
    pub const KEY_NUM0: i32 = 40;
    pub const KEY_NUM1: i32 = 41;
    pub const KEY_NUM2: i32 = 42;
    pub const KEY_NUM3: i32 = 43;
    pub const KEY_NUM4: i32 = 44;
    pub const KEY_NUM5: i32 = 45;
    pub const KEY_NUM6: i32 = 46;
    pub const KEY_NUM7: i32 = 47;
    pub const KEY_NUM8: i32 = 48;
    pub const KEY_NUM9: i32 = 49;
    pub const KEY_OPT_STOP: i32 = 51;
    pub const KEY_OPT_MENU: i32 = 52;
    pub const KEY_OPT_TOP_MENU: i32 = 53;
    pub const KEY_OPT_ANGLE: i32 = 54;
    /// Never sent.
    pub const KEY_OPT_DVD: i32 = 55;
    pub const KEY_OPT_A: i32 = 56;
    pub const KEY_OPT_B: i32 = 57;
    pub const KEY_OPT_C: i32 = 58;
    pub const KEY_OPT_D: i32 = 59;
    pub const KEY_OPT_TV_POWER: i32 = 60;
    pub const KEY_OPT_TV_INPUT: i32 = 61;
    pub const KEY_OPT_VOD: i32 = 62;
    pub const KEY_OPT_POWER: i32 = 63;
}

/// A resolution quadruple: `(w, h, px, py)` in emission order, carried
/// verbatim (`SPEC_FULL.md` Open Questions — the 3rd/4th fields are not
/// renamed to imply pixel-aspect-ratio meaning).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub w: i32,
    pub h: i32,
    pub px: i32,
    pub py: i32,
}

/// One fully decoded event, after `evnum`/`resource_id` have been
/// stripped from the front of the message.
#[derive(Clone, Debug)]
pub enum Event {
    DeviceInfo {
        resource_id: Id,
        params: Vec<(String, String)>,
    },
    AppInfo {
        resource_id: Id,
        params: Vec<(String, String)>,
    },
    ResourceInfo {
        resource_id: Id,
        status: ResourceStatus,
        params: Vec<(String, String)>,
    },
    Key {
        resource_id: Id,
        action: KeyAction,
        keynum: i32,
        rawcode: i32,
    },
    Idle {
        resource_id: Id,
        entering: bool,
    },
    FontInfo {
        resource_id: Id,
        info: FontInfo,
    },
    InitInfo {
        resource_id: Id,
        params: Dict,
        memento: Vec<u8>,
    },
    ResolutionInfo {
        resource_id: Id,
        current: Resolution,
        available: Vec<Resolution>,
    },
    /// An event opcode this crate doesn't recognize. Kept rather than
    /// rejected, since a future receiver may send event kinds a fixed
    /// match can't anticipate.
    Unknown {
        evnum: i32,
        resource_id: Id,
    },
}

fn read_string_pairs<R: Read>(reader: &mut R) -> Result<Vec<(String, String)>, ProtocolError> {
    let count = protocol::read_vint(reader)?;
    let mut pairs = Vec::with_capacity(count.max(0) as usize);
    for _ in 0..count {
        let key = protocol::read_string(reader)?;
        let value = protocol::read_string(reader)?;
        pairs.push((key, value));
    }
    Ok(pairs)
}

fn read_resolution_fields<R: Read>(reader: &mut R, field_count: usize) -> Result<Resolution, ProtocolError> {
    let mut fields = [0i32; 4];
    for i in 0..field_count {
        let v = protocol::read_vint(reader)?;
        if i < 4 {
            fields[i] = v;
        }
    }
    Ok(Resolution {
        w: fields[0],
        h: fields[1],
        px: fields[2],
        py: fields[3],
    })
}

/// Decode one event from a message's bytes, after framing has already
/// produced a complete message (`spec.md` §4.5).
pub fn read_event<R: Read>(reader: &mut R) -> Result<Event, ProtocolError> {
    let evnum = protocol::read_vint(reader)?;
    let resource_id = protocol::read_vint(reader)? as Id;
    match evnum {
        evnum::DEVICE_INFO => Ok(Event::DeviceInfo {
            resource_id,
            params: read_string_pairs(reader)?,
        }),
        evnum::APP_INFO => Ok(Event::AppInfo {
            resource_id,
            params: read_string_pairs(reader)?,
        }),
        evnum::RSRC_INFO => {
            let status = ResourceStatus::from(protocol::read_vint(reader)?);
            let params = read_string_pairs(reader)?;
            Ok(Event::ResourceInfo {
                resource_id,
                status,
                params,
            })
        }
        evnum::KEY => {
            let action = KeyAction::from(protocol::read_vint(reader)?);
            let keynum = protocol::read_vint(reader)?;
            let rawcode = protocol::read_vint(reader)?;
            Ok(Event::Key {
                resource_id,
                action,
                keynum,
                rawcode,
            })
        }
        evnum::IDLE => Ok(Event::Idle {
            resource_id,
            entering: protocol::read_bool(reader)?,
        }),
        evnum::FONT_INFO => {
            let ascent = protocol::read_float(reader)?;
            let descent = protocol::read_float(reader)?;
            let height = protocol::read_float(reader)?;
            let line_gap = protocol::read_float(reader)?;
            let extras = protocol::read_vint(reader)?.max(0) as usize;
            let glyph_count = protocol::read_vint(reader)?;
            let mut glyphs = HashMap::new();
            for _ in 0..glyph_count {
                let codepoint = protocol::read_vint(reader)?;
                let advance = protocol::read_float(reader)?;
                let bounding = protocol::read_float(reader)?;
                if extras > 0 {
                    let mut skip = vec![0u8; extras * 4];
                    reader
                        .read_exact(&mut skip)
                        .map_err(|_| ProtocolError::Truncated)?;
                }
                glyphs.insert(codepoint as u32, GlyphMetrics { advance, bounding });
            }
            Ok(Event::FontInfo {
                resource_id,
                info: FontInfo {
                    ascent,
                    descent,
                    height,
                    line_gap,
                    glyphs,
                },
            })
        }
        evnum::INIT_INFO => {
            let params = protocol::read_dict(reader)?;
            let memento = protocol::read_vdata(reader)?;
            Ok(Event::InitInfo {
                resource_id,
                params,
                memento,
            })
        }
        evnum::RESOLUTION_INFO => {
            let field_count = protocol::read_vint(reader)?.max(0) as usize;
            let current = read_resolution_fields(reader, field_count)?;
            let res_count = protocol::read_vint(reader)?;
            let mut available = Vec::with_capacity(res_count.max(0) as usize);
            for _ in 0..res_count {
                available.push(read_resolution_fields(reader, field_count)?);
            }
            Ok(Event::ResolutionInfo {
                resource_id,
                current,
                available,
            })
        }
        other => Ok(Event::Unknown {
            evnum: other,
            resource_id,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::write_vint;
    use std::io::Cursor;

    #[test]
    fn key_event_round_trip() {
        let mut buf = Vec::new();
        write_vint(&mut buf, evnum::KEY).unwrap();
        write_vint(&mut buf, 1).unwrap();
        write_vint(&mut buf, 1).unwrap(); // press
        write_vint(&mut buf, keys::KEY_SELECT).unwrap();
        write_vint(&mut buf, 0).unwrap();

        let mut cursor = Cursor::new(buf);
        match read_event(&mut cursor).unwrap() {
            Event::Key {
                action, keynum, ..
            } => {
                assert_eq!(action, KeyAction::Press);
                assert_eq!(keynum, keys::KEY_SELECT);
            }
            other => panic!("expected Key, got {other:?}"),
        }
    }

    #[test]
    fn resolution_info_skips_extra_fields() {
        let mut buf = Vec::new();
        write_vint(&mut buf, evnum::RESOLUTION_INFO).unwrap();
        write_vint(&mut buf, 1).unwrap();
        write_vint(&mut buf, 6).unwrap(); // field_count = 6
        for v in [1920, 1080, 1, 1, 99, 98] {
            write_vint(&mut buf, v).unwrap();
        }
        write_vint(&mut buf, 1).unwrap(); // res_count
        for v in [1280, 720, 1, 1, 7, 7] {
            write_vint(&mut buf, v).unwrap();
        }

        let mut cursor = Cursor::new(buf);
        match read_event(&mut cursor).unwrap() {
            Event::ResolutionInfo {
                current, available, ..
            } => {
                assert_eq!(
                    current,
                    Resolution {
                        w: 1920,
                        h: 1080,
                        px: 1,
                        py: 1
                    }
                );
                assert_eq!(available.len(), 1);
                assert_eq!(available[0].w, 1280);
            }
            other => panic!("expected ResolutionInfo, got {other:?}"),
        }
    }

    #[test]
    fn font_info_skips_per_glyph_extras() {
        let mut buf = Vec::new();
        write_vint(&mut buf, evnum::FONT_INFO).unwrap();
        write_vint(&mut buf, 2048).unwrap();
        for v in [10.0f32, 2.0, 12.0, 1.0] {
            buf.extend_from_slice(&v.to_be_bytes());
        }
        write_vint(&mut buf, 1).unwrap(); // extras = 1 extra f32 per glyph
        write_vint(&mut buf, 1).unwrap(); // glyph_count
        write_vint(&mut buf, 65).unwrap(); // 'A'
        buf.extend_from_slice(&6.0f32.to_be_bytes());
        buf.extend_from_slice(&8.0f32.to_be_bytes());
        buf.extend_from_slice(&0.0f32.to_be_bytes()); // skipped extra

        let mut cursor = Cursor::new(buf);
        match read_event(&mut cursor).unwrap() {
            Event::FontInfo { info, .. } => {
                assert_eq!(info.ascent, 10.0);
                let glyph = info.glyphs.get(&65).unwrap();
                assert_eq!(glyph.advance, 6.0);
                assert_eq!(glyph.bounding, 8.0);
            }
            other => panic!("expected FontInfo, got {other:?}"),
        }
    }
}

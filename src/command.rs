//! Command opcodes and serialization (`spec.md` §4.4).
//!
//! Every command frame is `vint(opcode), vint(target_id)` followed by
//! opcode-specific fields. [`Command`] enumerates every frame this crate
//! can emit; [`Command::write`] serializes one onto any `Write`.

use crate::protocol::{self, Dict, ProtocolError};
use crate::resource::{ids, FontStyle, Id};
use std::io::Write;

/// View command opcodes.
pub mod view_op {
    pub const ADD: i32 = 1;
    pub const SET_BOUNDS: i32 = 2;
    pub const SET_SCALE: i32 = 3;
    pub const SET_TRANSLATION: i32 = 4;
    pub const SET_TRANSPARENCY: i32 = 5;
    pub const SET_VISIBLE: i32 = 6;
    pub const SET_PAINTING: i32 = 7;
    pub const SET_RESOURCE: i32 = 8;
    pub const REMOVE: i32 = 9;
}

/// Resource command opcodes.
pub mod rsrc_op {
    pub const ADD_COLOR: i32 = 20;
    pub const ADD_TTF: i32 = 21;
    pub const ADD_FONT: i32 = 22;
    pub const ADD_TEXT: i32 = 23;
    pub const ADD_IMAGE: i32 = 24;
    pub const ADD_SOUND: i32 = 25;
    pub const ADD_STREAM: i32 = 26;
    pub const ADD_ANIM: i32 = 27;
    pub const SET_ACTIVE: i32 = 40;
    pub const SET_POSITION: i32 = 41;
    pub const SET_SPEED: i32 = 42;
    pub const SEND_EVENT: i32 = 44;
    pub const CLOSE: i32 = 45;
    pub const REMOVE: i32 = 46;
}

/// Receiver command opcodes.
pub mod recv_op {
    pub const ACKNOWLEDGE_IDLE: i32 = 60;
    pub const TRANSITION: i32 = 61;
    pub const SET_RESOLUTION: i32 = 62;
}

/// Largest memento a `TRANSITION` command may carry (`spec.md` §6).
pub const MAX_MEMENTO_LEN: usize = 10240;

/// `TRANSITION`'s direction field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward = 1,
    Back = 2,
    Teleport = 3,
}

/// `KEY`'s action field — also reused when synthesizing `send_key`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Press = 1,
    Repeat = 2,
    Release = 3,
}

/// Every command frame this crate can emit, grouped by `spec.md` §4.4.
#[derive(Clone, Debug)]
pub enum Command {
    ViewAdd {
        id: Id,
        parent_id: Id,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        visible: bool,
    },
    ViewSetBounds {
        id: Id,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        animation_id: Id,
    },
    ViewSetScale {
        id: Id,
        xscale: f32,
        yscale: f32,
        animation_id: Id,
    },
    ViewSetTranslation {
        id: Id,
        xt: i32,
        yt: i32,
        animation_id: Id,
    },
    ViewSetTransparency {
        id: Id,
        alpha: f32,
        animation_id: Id,
    },
    ViewSetVisible {
        id: Id,
        visible: bool,
        animation_id: Id,
    },
    ViewSetPainting {
        id: Id,
        painting: bool,
    },
    ViewSetResource {
        id: Id,
        resource_id: Id,
        flags: i32,
    },
    ViewRemove {
        id: Id,
        animation_id: Id,
    },

    AddColor {
        id: Id,
        argb: u32,
    },
    AddTtf {
        id: Id,
        data: Vec<u8>,
    },
    AddFont {
        id: Id,
        ttf_id: Id,
        style: FontStyle,
        size: f32,
        flags: i32,
    },
    AddText {
        id: Id,
        font_id: Id,
        color_id: Id,
        text: String,
    },
    AddImage {
        id: Id,
        data: Vec<u8>,
    },
    AddSound {
        id: Id,
        data: Vec<u8>,
    },
    AddStream {
        id: Id,
        url: String,
        mime: String,
        autoplay: bool,
        params: Dict,
    },
    AddAnim {
        id: Id,
        duration_ms: i32,
        ease: f32,
    },
    ResourceSetActive {
        id: Id,
        active: bool,
    },
    ResourceSetPosition {
        id: Id,
        position_ms: i32,
    },
    ResourceSetSpeed {
        id: Id,
        speed: f32,
    },
    ResourceSendEvent {
        id: Id,
        event: i32,
        param1: i32,
        param2: i32,
    },
    ResourceClose {
        id: Id,
    },
    ResourceRemove {
        id: Id,
    },

    AcknowledgeIdle {
        handled: bool,
    },
    Transition {
        url: String,
        direction: Direction,
        params: Dict,
        memento: Vec<u8>,
    },
    SetResolution {
        w: i32,
        h: i32,
        px: i32,
        py: i32,
    },
}

fn write_header<W: Write>(writer: &mut W, opcode: i32, target_id: Id) -> Result<(), ProtocolError> {
    protocol::write_vint(writer, opcode)?;
    protocol::write_vint(writer, target_id as i32)
}

impl Command {
    /// Serialize this command as `vint(opcode), vint(target_id)` followed
    /// by its opcode-specific fields.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), ProtocolError> {
        match self {
            Command::ViewAdd {
                id,
                parent_id,
                x,
                y,
                w,
                h,
                visible,
            } => {
                write_header(writer, view_op::ADD, *id)?;
                protocol::write_vint(writer, *parent_id as i32)?;
                protocol::write_vint(writer, *x as i32)?;
                protocol::write_vint(writer, *y as i32)?;
                protocol::write_vint(writer, *w as i32)?;
                protocol::write_vint(writer, *h as i32)?;
                protocol::write_bool(writer, *visible)?;
            }
            Command::ViewSetBounds {
                id,
                x,
                y,
                w,
                h,
                animation_id,
            } => {
                write_header(writer, view_op::SET_BOUNDS, *id)?;
                protocol::write_vint(writer, *x as i32)?;
                protocol::write_vint(writer, *y as i32)?;
                protocol::write_vint(writer, *w as i32)?;
                protocol::write_vint(writer, *h as i32)?;
                protocol::write_vint(writer, *animation_id as i32)?;
            }
            Command::ViewSetScale {
                id,
                xscale,
                yscale,
                animation_id,
            } => {
                write_header(writer, view_op::SET_SCALE, *id)?;
                protocol::write_float(writer, *xscale)?;
                protocol::write_float(writer, *yscale)?;
                protocol::write_vint(writer, *animation_id as i32)?;
            }
            Command::ViewSetTranslation {
                id,
                xt,
                yt,
                animation_id,
            } => {
                write_header(writer, view_op::SET_TRANSLATION, *id)?;
                protocol::write_vint(writer, *xt as i32)?;
                protocol::write_vint(writer, *yt as i32)?;
                protocol::write_vint(writer, *animation_id as i32)?;
            }
            Command::ViewSetTransparency {
                id,
                alpha,
                animation_id,
            } => {
                write_header(writer, view_op::SET_TRANSPARENCY, *id)?;
                protocol::write_float(writer, *alpha)?;
                protocol::write_vint(writer, *animation_id as i32)?;
            }
            Command::ViewSetVisible {
                id,
                visible,
                animation_id,
            } => {
                write_header(writer, view_op::SET_VISIBLE, *id)?;
                protocol::write_bool(writer, *visible)?;
                protocol::write_vint(writer, *animation_id as i32)?;
            }
            Command::ViewSetPainting { id, painting } => {
                write_header(writer, view_op::SET_PAINTING, *id)?;
                protocol::write_bool(writer, *painting)?;
            }
            Command::ViewSetResource {
                id,
                resource_id,
                flags,
            } => {
                write_header(writer, view_op::SET_RESOURCE, *id)?;
                protocol::write_vint(writer, *resource_id as i32)?;
                protocol::write_vint(writer, *flags as i32)?;
            }
            Command::ViewRemove { id, animation_id } => {
                write_header(writer, view_op::REMOVE, *id)?;
                protocol::write_vint(writer, *animation_id as i32)?;
            }

            Command::AddColor { id, argb } => {
                write_header(writer, rsrc_op::ADD_COLOR, *id)?;
                writer.write_all(&argb.to_be_bytes())?;
            }
            Command::AddTtf { id, data } => {
                write_header(writer, rsrc_op::ADD_TTF, *id)?;
                writer.write_all(data)?;
            }
            Command::AddFont {
                id,
                ttf_id,
                style,
                size,
                flags,
            } => {
                write_header(writer, rsrc_op::ADD_FONT, *id)?;
                protocol::write_vint(writer, *ttf_id as i32)?;
                protocol::write_vint(writer, *style as i32)?;
                protocol::write_float(writer, *size)?;
                protocol::write_vint(writer, *flags as i32)?;
            }
            Command::AddText {
                id,
                font_id,
                color_id,
                text,
            } => {
                write_header(writer, rsrc_op::ADD_TEXT, *id)?;
                protocol::write_vint(writer, *font_id as i32)?;
                protocol::write_vint(writer, *color_id as i32)?;
                protocol::write_string(writer, text)?;
            }
            Command::AddImage { id, data } => {
                write_header(writer, rsrc_op::ADD_IMAGE, *id)?;
                writer.write_all(data)?;
            }
            Command::AddSound { id, data } => {
                write_header(writer, rsrc_op::ADD_SOUND, *id)?;
                writer.write_all(data)?;
            }
            Command::AddStream {
                id,
                url,
                mime,
                autoplay,
                params,
            } => {
                write_header(writer, rsrc_op::ADD_STREAM, *id)?;
                protocol::write_string(writer, url)?;
                protocol::write_string(writer, mime)?;
                protocol::write_bool(writer, *autoplay)?;
                protocol::write_dict(writer, params)?;
            }
            Command::AddAnim {
                id,
                duration_ms,
                ease,
            } => {
                write_header(writer, rsrc_op::ADD_ANIM, *id)?;
                protocol::write_vint(writer, *duration_ms as i32)?;
                protocol::write_float(writer, *ease)?;
            }
            Command::ResourceSetActive { id, active } => {
                write_header(writer, rsrc_op::SET_ACTIVE, *id)?;
                protocol::write_bool(writer, *active)?;
            }
            Command::ResourceSetPosition { id, position_ms } => {
                write_header(writer, rsrc_op::SET_POSITION, *id)?;
                protocol::write_vint(writer, *position_ms as i32)?;
            }
            Command::ResourceSetSpeed { id, speed } => {
                write_header(writer, rsrc_op::SET_SPEED, *id)?;
                protocol::write_float(writer, *speed)?;
            }
            Command::ResourceSendEvent {
                id,
                event,
                param1,
                param2,
            } => {
                write_header(writer, rsrc_op::SEND_EVENT, *id)?;
                protocol::write_vint(writer, *event as i32)?;
                protocol::write_vint(writer, *param1 as i32)?;
                protocol::write_vint(writer, *param2 as i32)?;
            }
            Command::ResourceClose { id } => {
                write_header(writer, rsrc_op::CLOSE, *id)?;
            }
            Command::ResourceRemove { id } => {
                write_header(writer, rsrc_op::REMOVE, *id)?;
            }

            Command::AcknowledgeIdle { handled } => {
                write_header(writer, recv_op::ACKNOWLEDGE_IDLE, ids::ID_ROOT_STREAM)?;
                protocol::write_bool(writer, *handled)?;
            }
            Command::Transition {
                url,
                direction,
                params,
                memento,
            } => {
                // Size is validated by the caller (`Session::transition`)
                // before a `Transition` command is ever constructed.
                write_header(writer, recv_op::TRANSITION, ids::ID_ROOT_STREAM)?;
                protocol::write_string(writer, url)?;
                protocol::write_vint(writer, *direction as i32)?;
                protocol::write_dict(writer, params)?;
                protocol::write_vdata(writer, memento)?;
            }
            Command::SetResolution { w, h, px, py } => {
                write_header(writer, recv_op::SET_RESOLUTION, ids::ID_ROOT_STREAM)?;
                protocol::write_vint(writer, *w as i32)?;
                protocol::write_vint(writer, *h as i32)?;
                protocol::write_vint(writer, *px as i32)?;
                protocol::write_vint(writer, *py as i32)?;
            }
        }
        Ok(())
    }
}

/// Build the `SEND_EVENT` frame `send_key` uses to inject a synthetic key
/// press into the root stream, echoed back through the normal `EVT_KEY`
/// path (`hme.py` `Application.send_key`).
pub fn send_key_command(root_stream_id: Id, keycode: i32) -> Command {
    Command::ResourceSendEvent {
        id: root_stream_id,
        event: KeyAction::Press as i32,
        param1: keycode,
        param2: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{self as proto, BE};
    use byteorder::ReadBytesExt;
    use std::io::Cursor;

    #[test]
    fn view_add_serializes_header_then_fields() {
        let cmd = Command::ViewAdd {
            id: 2048,
            parent_id: 2,
            x: 0,
            y: 0,
            w: 100,
            h: 50,
            visible: true,
        };
        let mut buf = Vec::new();
        cmd.write(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(proto::read_vint(&mut cursor).unwrap(), view_op::ADD);
        assert_eq!(proto::read_vint(&mut cursor).unwrap(), 2048);
        assert_eq!(proto::read_vint(&mut cursor).unwrap(), 2);
        assert_eq!(proto::read_vint(&mut cursor).unwrap(), 0);
        assert_eq!(proto::read_vint(&mut cursor).unwrap(), 0);
        assert_eq!(proto::read_vint(&mut cursor).unwrap(), 100);
        assert_eq!(proto::read_vint(&mut cursor).unwrap(), 50);
        assert!(proto::read_bool(&mut cursor).unwrap());
    }

    #[test]
    fn add_color_writes_raw_be_argb() {
        let cmd = Command::AddColor {
            id: 2049,
            argb: 0xFF00FFAA,
        };
        let mut buf = Vec::new();
        cmd.write(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(proto::read_vint(&mut cursor).unwrap(), rsrc_op::ADD_COLOR);
        assert_eq!(proto::read_vint(&mut cursor).unwrap(), 2049);
        assert_eq!(cursor.read_u32::<BE>().unwrap(), 0xFF00FFAA);
    }

    #[test]
    fn transition_serializes_url_direction_params_and_memento() {
        let cmd = Command::Transition {
            url: "hme://localhost/app".into(),
            direction: Direction::Forward,
            params: Vec::new(),
            memento: vec![1, 2, 3],
        };
        let mut buf = Vec::new();
        cmd.write(&mut buf).unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(
            proto::read_vint(&mut cursor).unwrap(),
            recv_op::TRANSITION
        );
        assert_eq!(
            proto::read_vint(&mut cursor).unwrap(),
            crate::resource::ids::ID_ROOT_STREAM as i32
        );
        assert_eq!(
            proto::read_string(&mut cursor).unwrap(),
            "hme://localhost/app"
        );
        assert_eq!(proto::read_vint(&mut cursor).unwrap(), Direction::Forward as i32);
    }

    #[test]
    fn send_key_targets_root_stream_with_press_action() {
        let cmd = send_key_command(crate::resource::ids::ID_ROOT_STREAM, 7);
        match cmd {
            Command::ResourceSendEvent {
                id,
                event,
                param1,
                ..
            } => {
                assert_eq!(id, crate::resource::ids::ID_ROOT_STREAM);
                assert_eq!(event, KeyAction::Press as i32);
                assert_eq!(param1, 7);
            }
            _ => panic!("expected ResourceSendEvent"),
        }
    }
}

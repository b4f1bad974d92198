//! Minimal companion-link (companion_link.dll) FFI surface.
//!
//! The assistance host ships a bridge DLL exporting a handful of C entry
//! points:
//! * overlay_session_status – last session error code (0 = healthy).
//! * overlay_target_window / overlay_target_process_id – calibration result.
//! * overlay_config – packed snapshot of the saved overlay settings.
//! * overlay_draw_list – fills a caller-owned buffer with one frame's
//!   draw commands.
//!
//! All function resolution is lazy and cached (OnceCell). `BridgeHost` wraps
//! the raw table behind the `Host` trait; a missing DLL is reported as "no
//! session" rather than an error, since the host simply is not running.

use crate::geometry::Rect;
use crate::host::{ConfigSnapshot, DrawCommand, DrawKind, Host, TargetSelection};
use once_cell::sync::OnceCell;
use windows::Win32::System::LibraryLoader::{GetModuleHandleA, GetProcAddress, LoadLibraryA};
use windows::core::PCSTR;

/// Upper bound on draw commands fetched per frame.
const DRAW_LIST_CAPACITY: usize = 512;

/// Wire layout of one draw command as produced by the bridge DLL.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct RawDrawCommand {
    /// Primitive tag; see `kind_from_raw`.
    pub kind: i32,
    /// r, g, b, a.
    pub color: [i32; 4],
    pub thickness: i32,
    /// left, top, right, bottom (interpretation depends on the kind).
    pub dimensions: [i32; 4],
    /// NUL-terminated UTF-8 label, used by text commands.
    pub text: [u8; 128],
}

impl Default for RawDrawCommand {
    fn default() -> Self {
        unsafe { std::mem::zeroed() }
    }
}

/// Wire layout of the saved overlay settings.
#[repr(C)]
#[derive(Copy, Clone, Default)]
struct RawConfig {
    stream_proof: i32,
    debug: i32,
    target_fps: i32,
    random_offset_min: i32,
    random_offset_max: i32,
    quit_key: i32,
}

type PfnSessionStatus = unsafe extern "system" fn() -> i32;
type PfnTargetWindow = unsafe extern "system" fn() -> u32;
type PfnTargetPid = unsafe extern "system" fn() -> u32;
type PfnConfig = unsafe extern "system" fn(*mut RawConfig) -> i32;
type PfnDrawList = unsafe extern "system" fn(*mut RawDrawCommand, u32) -> u32;

struct BridgeFns {
    session_status: PfnSessionStatus,
    target_window: PfnTargetWindow,
    target_pid: PfnTargetPid,
    config: PfnConfig,
    draw_list: PfnDrawList,
}
static FNS: OnceCell<Option<BridgeFns>> = OnceCell::new();

/// Attempt to load (or retrieve cached) function pointers for the bridge DLL.
#[allow(clippy::missing_transmute_annotations)]
fn load_bridge() -> Option<&'static BridgeFns> {
    FNS.get_or_init(|| unsafe {
        let name = PCSTR(b"companion_link.dll\0".as_ptr());
        let h = GetModuleHandleA(name)
            .ok()
            .or_else(|| LoadLibraryA(name).ok());
        let hmod = h?;
        let sym = |s: &str| {
            let mut v = Vec::with_capacity(s.len() + 1);
            v.extend_from_slice(s.as_bytes());
            v.push(0);
            GetProcAddress(hmod, PCSTR(v.as_ptr()))
        };
        macro_rules! need {
            ($n:literal) => {
                match sym($n) {
                    Some(p) => p,
                    None => return None,
                }
            };
        }
        let session_status = need!("overlay_session_status");
        let target_window = need!("overlay_target_window");
        let target_pid = need!("overlay_target_process_id");
        let config = need!("overlay_config");
        let draw_list = need!("overlay_draw_list");
        Some(BridgeFns {
            session_status: std::mem::transmute::<_, PfnSessionStatus>(session_status),
            target_window: std::mem::transmute::<_, PfnTargetWindow>(target_window),
            target_pid: std::mem::transmute::<_, PfnTargetPid>(target_pid),
            config: std::mem::transmute::<_, PfnConfig>(config),
            draw_list: std::mem::transmute::<_, PfnDrawList>(draw_list),
        })
    })
    .as_ref()
}

/// Map a wire kind tag to the primitive enum. Unknown tags yield `None` and
/// the command is skipped (the only validation the core performs).
fn kind_from_raw(kind: i32) -> Option<DrawKind> {
    match kind {
        0 => Some(DrawKind::Text),
        1 => Some(DrawKind::Line),
        2 => Some(DrawKind::Box),
        3 => Some(DrawKind::BoxFilled),
        4 => Some(DrawKind::Circle),
        5 => Some(DrawKind::CircleFilled),
        _ => None,
    }
}

/// Decode one wire command; colors, thickness, and extents pass through.
pub(crate) fn command_from_raw(raw: &RawDrawCommand) -> Option<DrawCommand> {
    let kind = kind_from_raw(raw.kind)?;
    let len = raw.text.iter().position(|&b| b == 0).unwrap_or(raw.text.len());
    Some(DrawCommand {
        kind,
        color: raw.color,
        thickness: raw.thickness,
        bounds: Rect::new(
            raw.dimensions[0],
            raw.dimensions[1],
            raw.dimensions[2],
            raw.dimensions[3],
        ),
        text: String::from_utf8_lossy(&raw.text[..len]).into_owned(),
    })
}

/// `Host` implementation backed by the companion-link DLL.
pub struct BridgeHost;

impl BridgeHost {
    pub fn new() -> Self {
        Self
    }
}

impl Host for BridgeHost {
    fn session_ok(&self) -> bool {
        match load_bridge() {
            Some(f) => unsafe { (f.session_status)() == 0 },
            None => false,
        }
    }

    fn target_selection(&self) -> Option<TargetSelection> {
        let f = load_bridge()?;
        let handle = unsafe { (f.target_window)() };
        if handle == 0 {
            return None;
        }
        let pid = unsafe { (f.target_pid)() };
        if pid == 0 {
            return None;
        }
        Some(TargetSelection {
            handle: handle as isize,
            pid,
        })
    }

    fn config(&self) -> ConfigSnapshot {
        let Some(f) = load_bridge() else {
            return ConfigSnapshot::default();
        };
        let mut raw = RawConfig::default();
        if unsafe { (f.config)(&mut raw) } != 0 {
            return ConfigSnapshot::default();
        }
        ConfigSnapshot {
            stream_proof: raw.stream_proof != 0,
            debug: raw.debug != 0,
            target_fps: raw.target_fps,
            random_offset_min: raw.random_offset_min,
            random_offset_max: raw.random_offset_max,
            quit_key: raw.quit_key,
        }
    }

    fn draw_commands(&self) -> Vec<DrawCommand> {
        let Some(f) = load_bridge() else {
            return Vec::new();
        };
        let mut buf = vec![RawDrawCommand::default(); DRAW_LIST_CAPACITY];
        let count = unsafe { (f.draw_list)(buf.as_mut_ptr(), buf.len() as u32) } as usize;
        buf[..count.min(buf.len())]
            .iter()
            .filter_map(command_from_raw)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(kind: i32) -> RawDrawCommand {
        let mut raw = RawDrawCommand::default();
        raw.kind = kind;
        raw.color = [255, 0, 64, 200];
        raw.thickness = 2;
        raw.dimensions = [10, 20, 30, 40];
        raw
    }

    #[test]
    fn known_kinds_decode() {
        for (tag, kind) in [
            (0, DrawKind::Text),
            (1, DrawKind::Line),
            (2, DrawKind::Box),
            (3, DrawKind::BoxFilled),
            (4, DrawKind::Circle),
            (5, DrawKind::CircleFilled),
        ] {
            let cmd = command_from_raw(&raw(tag)).expect("kind should decode");
            assert_eq!(cmd.kind, kind);
            assert_eq!(cmd.color, [255, 0, 64, 200]);
            assert_eq!(cmd.thickness, 2);
            assert_eq!(cmd.bounds, Rect::new(10, 20, 30, 40));
        }
    }

    #[test]
    fn unknown_kind_is_skipped() {
        assert!(command_from_raw(&raw(17)).is_none());
        assert!(command_from_raw(&raw(-1)).is_none());
    }

    #[test]
    fn text_payload_is_read_to_nul() {
        let mut r = raw(0);
        r.text[..5].copy_from_slice(b"hello");
        let cmd = command_from_raw(&r).unwrap();
        assert_eq!(cmd.text, "hello");
    }

    #[test]
    fn out_of_range_style_values_pass_through() {
        let mut r = raw(2);
        r.color = [9999, -5, 300, 70000];
        r.thickness = -3;
        let cmd = command_from_raw(&r).unwrap();
        assert_eq!(cmd.color, [9999, -5, 300, 70000]);
        assert_eq!(cmd.thickness, -3);
    }
}

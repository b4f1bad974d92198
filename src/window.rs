//! Overlay window lifecycle.
//!
//! The window is a popup in the topmost/transparent/layered/no-activate
//! style set, created once per session and destroyed once at shutdown. When
//! UIAccess elevation succeeded it is created in the UIAccess band via the
//! undocumented `CreateWindowInBand` export, which places it above fullscreen
//! and protected-content surfaces; otherwise the plain desktop band is used.
//! `SetWindowDisplayAffinity` hides the window from capture APIs unless debug
//! mode keeps it visible.

use crate::elevate::Elevation;
use crate::platform::{OVERLAY_EX_STYLE, WindowId};
use once_cell::sync::OnceCell;
use thiserror::Error;
use tracing::{debug, warn};
use widestring::U16CString;
use windows::Win32::Foundation::{HINSTANCE, HMODULE, HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::Graphics::Dwm::DwmExtendFrameIntoClientArea;
use windows::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress, LoadLibraryW};
use windows::Win32::UI::Controls::MARGINS;
use windows::Win32::UI::WindowsAndMessaging::{
    CW_USEDEFAULT, CreateWindowExW, DefWindowProcW, DestroyWindow, FindWindowW, HMENU, LWA_ALPHA,
    MB_ICONERROR, MB_OK, MessageBoxW, PostQuitMessage, RegisterClassExW, SetLayeredWindowAttributes,
    UnregisterClassW, WDA_EXCLUDEFROMCAPTURE, WM_DESTROY, WNDCLASSEXW, WS_POPUP,
    SetWindowDisplayAffinity, ShowWindow, SW_SHOWNOACTIVATE,
};
use windows::core::{PCWSTR, w};

const WINDOW_CLASS: PCWSTR = w!("GlasspaneOverlay");

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("another overlay instance is already running")]
    AlreadyRunning,
    #[error("window class registration failed: {0}")]
    ClassRegistration(#[source] windows::core::Error),
    #[error("window creation failed: {0}")]
    Creation(#[source] windows::core::Error),
}

/// Z-order band the window is created in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Band {
    Desktop,
    UiAccess,
}

impl Band {
    /// ZBID value consumed by CreateWindowInBand.
    fn zbid(self) -> u32 {
        match self {
            Band::Desktop => 1,
            Band::UiAccess => 2,
        }
    }

    /// The band the session can actually use given the elevation outcome.
    pub fn for_elevation(elevation: Elevation) -> Self {
        match elevation {
            Elevation::AlreadySufficient => Band::UiAccess,
            Elevation::Unavailable => Band::Desktop,
        }
    }
}

#[allow(clippy::too_many_arguments)]
type PfnCreateWindowInBand = unsafe extern "system" fn(
    u32,     // extended style
    PCWSTR,  // class name
    PCWSTR,  // window name
    u32,     // style
    i32,     // x
    i32,     // y
    i32,     // width
    i32,     // height
    HWND,    // parent
    HMENU,   // menu
    HINSTANCE,
    *const core::ffi::c_void,
    u32, // band
) -> HWND;

static CREATE_WINDOW_IN_BAND: OnceCell<Option<PfnCreateWindowInBand>> = OnceCell::new();

/// Resolve the undocumented band-aware creation export; absent on systems
/// that do not ship it.
#[allow(clippy::missing_transmute_annotations)]
fn create_window_in_band() -> Option<PfnCreateWindowInBand> {
    *CREATE_WINDOW_IN_BAND.get_or_init(|| unsafe {
        let user32 = GetModuleHandleW(w!("user32.dll"))
            .ok()
            .or_else(|| LoadLibraryW(w!("user32.dll")).ok())?;
        GetProcAddress(user32, windows::core::s!("CreateWindowInBand"))
            .map(|p| std::mem::transmute::<_, PfnCreateWindowInBand>(p))
    })
}

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    match msg {
        WM_DESTROY => {
            unsafe { PostQuitMessage(0) };
            LRESULT(0)
        }
        _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}

/// The process's own transparent, click-through drawing surface.
pub struct OverlayWindow {
    id: WindowId,
    instance: HINSTANCE,
}

impl OverlayWindow {
    /// Create the overlay window in the requested band.
    ///
    /// Fails with `AlreadyRunning` when a window of our class already exists
    /// anywhere on the desktop; the caller turns that into a startup
    /// precondition failure rather than racing two overlays.
    pub fn create(band: Band, stream_proof: bool, debug_mode: bool) -> Result<Self, WindowError> {
        unsafe {
            if FindWindowW(WINDOW_CLASS, PCWSTR::null()).is_ok() {
                return Err(WindowError::AlreadyRunning);
            }

            let module: HMODULE =
                GetModuleHandleW(None).map_err(WindowError::ClassRegistration)?;
            let instance = HINSTANCE(module.0);
            let class = WNDCLASSEXW {
                cbSize: size_of::<WNDCLASSEXW>() as u32,
                lpfnWndProc: Some(window_proc),
                hInstance: instance,
                lpszClassName: WINDOW_CLASS,
                ..Default::default()
            };
            if RegisterClassExW(&class) == 0 {
                return Err(WindowError::ClassRegistration(
                    windows::core::Error::from_win32(),
                ));
            }

            let hwnd = Self::create_native(band, instance)?;
            let id = WindowId(hwnd.0 as isize);

            SetLayeredWindowAttributes(hwnd, windows::Win32::Foundation::COLORREF(0), 255, LWA_ALPHA)
                .map_err(WindowError::Creation)?;

            // Negative margins let the D3D alpha channel show through.
            let margins = MARGINS {
                cxLeftWidth: -1,
                cxRightWidth: -1,
                cyTopHeight: -1,
                cyBottomHeight: -1,
            };
            if let Err(e) = DwmExtendFrameIntoClientArea(hwnd, &margins) {
                warn!(error = %e, "frame extension failed, overlay may not be transparent");
            }

            if stream_proof && !debug_mode {
                if let Err(e) = SetWindowDisplayAffinity(hwnd, WDA_EXCLUDEFROMCAPTURE) {
                    warn!(error = %e, "capture exclusion unavailable");
                }
            }

            let _ = ShowWindow(hwnd, SW_SHOWNOACTIVATE);
            debug!(?band, stream_proof, "overlay window created");
            Ok(Self { id, instance })
        }
    }

    unsafe fn create_native(band: Band, instance: HINSTANCE) -> Result<HWND, WindowError> {
        if let Some(in_band) = create_window_in_band() {
            let hwnd = unsafe {
                in_band(
                    OVERLAY_EX_STYLE.0,
                    WINDOW_CLASS,
                    PCWSTR::null(),
                    WS_POPUP.0,
                    0,
                    0,
                    CW_USEDEFAULT,
                    CW_USEDEFAULT,
                    HWND::default(),
                    HMENU::default(),
                    instance,
                    core::ptr::null(),
                    band.zbid(),
                )
            };
            if !hwnd.is_invalid() {
                return Ok(hwnd);
            }
            warn!(?band, "band window creation failed, using plain creation");
        }
        unsafe {
            CreateWindowExW(
                OVERLAY_EX_STYLE,
                WINDOW_CLASS,
                PCWSTR::null(),
                WS_POPUP,
                0,
                0,
                CW_USEDEFAULT,
                CW_USEDEFAULT,
                None,
                None,
                Some(instance),
                None,
            )
            .map_err(WindowError::Creation)
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    /// Destroy the native window and unregister the class. Idempotent via
    /// `Drop`, which calls this at most once more with no effect.
    pub fn destroy(&mut self) {
        unsafe {
            if !self.id.hwnd().is_invalid() {
                let _ = DestroyWindow(self.id.hwnd());
                self.id = WindowId(0);
                let _ = UnregisterClassW(WINDOW_CLASS, Some(self.instance));
            }
        }
    }
}

impl Drop for OverlayWindow {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Blocking user-facing notification for startup precondition failures.
pub fn alert(title: &str, text: &str) {
    let title = U16CString::from_str_truncate(title);
    let text = U16CString::from_str_truncate(text);
    unsafe {
        MessageBoxW(
            None,
            PCWSTR(text.as_ptr()),
            PCWSTR(title.as_ptr()),
            MB_OK | MB_ICONERROR,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevation_outcome_selects_the_band() {
        assert_eq!(
            Band::for_elevation(Elevation::AlreadySufficient),
            Band::UiAccess
        );
        assert_eq!(Band::for_elevation(Elevation::Unavailable), Band::Desktop);
    }

    #[test]
    fn band_ids_match_the_win32_zbid_table() {
        assert_eq!(Band::Desktop.zbid(), 1);
        assert_eq!(Band::UiAccess.zbid(), 2);
    }
}

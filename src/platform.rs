//! Platform services behind a narrow trait.
//!
//! Every recurring OS call the tracker, state machine, and scheduler make
//! goes through `WindowServices`, so all of their conditional logic can be
//! unit-tested against the scripted fake below. `Win32Services` is the one
//! concrete implementation; it owns no state, all handles are passed in.

use crate::geometry::Rect;
use std::time::Duration;
use windows::Win32::Foundation::{HWND, POINT, RECT};
use windows::Win32::Graphics::Gdi::MapWindowPoints;
use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, GWL_EXSTYLE, GetClassNameW, GetClientRect, GetForegroundWindow,
    GetWindowThreadProcessId, IsWindow, MSG, PM_REMOVE, PeekMessageW, SWP_NOACTIVATE,
    SWP_SHOWWINDOW, SetWindowLongPtrW, SetWindowPos, TranslateMessage, WINDOW_EX_STYLE, WM_QUIT,
    WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_EX_TRANSPARENT,
};

/// Opaque window identifier; the raw HWND value without the FFI type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct WindowId(pub isize);

impl WindowId {
    pub(crate) fn hwnd(self) -> HWND {
        HWND(self.0 as *mut core::ffi::c_void)
    }
}

/// The extended style set the overlay window must keep: above everything,
/// click-through, and never activated.
pub const OVERLAY_EX_STYLE: WINDOW_EX_STYLE = WINDOW_EX_STYLE(
    WS_EX_TOPMOST.0 | WS_EX_TRANSPARENT.0 | WS_EX_LAYERED.0 | WS_EX_TOOLWINDOW.0
        | WS_EX_NOACTIVATE.0,
);

/// OS window queries and manipulation used once per frame.
pub trait WindowServices {
    /// Whether the handle currently refers to a live window.
    fn is_window(&self, window: WindowId) -> bool;

    /// Owning process id of the window; 0 when the query fails.
    fn window_pid(&self, window: WindowId) -> u32;

    /// Class name of the window; `None` when the read fails.
    fn window_class(&self, window: WindowId) -> Option<String>;

    /// The window currently in the foreground, if any.
    fn foreground_window(&self) -> Option<WindowId>;

    /// The window's client area mapped into screen coordinates.
    fn client_rect_on_screen(&self, window: WindowId) -> Option<Rect>;

    /// Move/resize the window to the given screen rectangle.
    fn move_window(&self, window: WindowId, rect: Rect);

    /// Re-apply the overlay's extended style flags (click-through,
    /// no-activate) in case something stripped them.
    fn reassert_overlay_styles(&self, window: WindowId);

    /// Edge-triggered check of the panic hotkey: true only for a press since
    /// the previous call.
    fn key_just_pressed(&self, vk: i32) -> bool;

    /// Drain all pending window messages; returns true when WM_QUIT was seen.
    fn pump_messages(&self) -> bool;

    fn sleep(&self, duration: Duration);
}

/// Utility: read a UTF-16 string via a provided fill closure returning number
/// of u16 written.
fn read_wstr<F: FnOnce(&mut [u16]) -> i32>(cap: usize, fill: F) -> String {
    let mut buf = vec![0u16; cap];
    let len = fill(&mut buf) as usize;
    let slice = &buf[..buf.iter().position(|&c| c == 0).unwrap_or(len)];
    String::from_utf16_lossy(slice)
}

/// Production implementation over user32/gdi32.
pub struct Win32Services;

impl WindowServices for Win32Services {
    fn is_window(&self, window: WindowId) -> bool {
        unsafe { IsWindow(Some(window.hwnd())).as_bool() }
    }

    fn window_pid(&self, window: WindowId) -> u32 {
        let mut pid: u32 = 0;
        unsafe {
            GetWindowThreadProcessId(window.hwnd(), Some(&mut pid));
        }
        pid
    }

    fn window_class(&self, window: WindowId) -> Option<String> {
        let class = read_wstr(256, |b| unsafe { GetClassNameW(window.hwnd(), b) });
        if class.is_empty() { None } else { Some(class) }
    }

    fn foreground_window(&self) -> Option<WindowId> {
        let fg = unsafe { GetForegroundWindow() };
        if fg.is_invalid() {
            None
        } else {
            Some(WindowId(fg.0 as isize))
        }
    }

    fn client_rect_on_screen(&self, window: WindowId) -> Option<Rect> {
        unsafe {
            let mut client = RECT::default();
            GetClientRect(window.hwnd(), &mut client).ok()?;
            // Client coordinates are window-relative; map the two corners
            // into screen space.
            let mut points = [
                POINT {
                    x: client.left,
                    y: client.top,
                },
                POINT {
                    x: client.right,
                    y: client.bottom,
                },
            ];
            MapWindowPoints(Some(window.hwnd()), None, &mut points);
            Some(Rect::new(
                points[0].x,
                points[0].y,
                points[1].x,
                points[1].y,
            ))
        }
    }

    fn move_window(&self, window: WindowId, rect: Rect) {
        unsafe {
            let _ = SetWindowPos(
                window.hwnd(),
                None,
                rect.left,
                rect.top,
                rect.width(),
                rect.height(),
                SWP_SHOWWINDOW | SWP_NOACTIVATE,
            );
        }
    }

    fn reassert_overlay_styles(&self, window: WindowId) {
        unsafe {
            SetWindowLongPtrW(window.hwnd(), GWL_EXSTYLE, OVERLAY_EX_STYLE.0 as isize);
        }
    }

    fn key_just_pressed(&self, vk: i32) -> bool {
        // Low bit is set when the key was pressed since the last call.
        unsafe { GetAsyncKeyState(vk) & 1 != 0 }
    }

    fn pump_messages(&self) -> bool {
        let mut quit = false;
        unsafe {
            let mut msg = MSG::default();
            while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
                if msg.message == WM_QUIT {
                    quit = true;
                }
            }
        }
        quit
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted stand-in for `Win32Services` used across the tracker, state
    //! machine, and scheduler tests.

    use super::{WindowId, WindowServices};
    use crate::geometry::Rect;
    use std::cell::{Cell, RefCell};
    use std::collections::{HashMap, VecDeque};
    use std::time::Duration;

    #[derive(Clone, Debug, Default)]
    pub struct FakeWindow {
        pub pid: u32,
        pub class: Option<String>,
        pub client_rect: Rect,
    }

    #[derive(Default)]
    pub struct FakeServices {
        pub windows: RefCell<HashMap<isize, FakeWindow>>,
        pub foreground: Cell<Option<WindowId>>,
        pub moves: RefCell<Vec<(WindowId, Rect)>>,
        pub style_reasserts: Cell<usize>,
        /// Per-call script for `key_just_pressed`; empty means "not pressed".
        pub key_script: RefCell<VecDeque<bool>>,
        /// Per-call script for `pump_messages`; empty means "no quit".
        pub pump_script: RefCell<VecDeque<bool>>,
        pub sleeps: RefCell<Vec<Duration>>,
    }

    impl FakeServices {
        pub fn add_window(&self, handle: isize, pid: u32, class: &str, rect: Rect) {
            self.windows.borrow_mut().insert(
                handle,
                FakeWindow {
                    pid,
                    class: Some(class.to_string()),
                    client_rect: rect,
                },
            );
        }

        pub fn remove_window(&self, handle: isize) {
            self.windows.borrow_mut().remove(&handle);
        }

        pub fn set_foreground(&self, handle: isize) {
            self.foreground.set(Some(WindowId(handle)));
        }
    }

    impl WindowServices for FakeServices {
        fn is_window(&self, window: WindowId) -> bool {
            self.windows.borrow().contains_key(&window.0)
        }

        fn window_pid(&self, window: WindowId) -> u32 {
            self.windows
                .borrow()
                .get(&window.0)
                .map(|w| w.pid)
                .unwrap_or(0)
        }

        fn window_class(&self, window: WindowId) -> Option<String> {
            self.windows.borrow().get(&window.0)?.class.clone()
        }

        fn foreground_window(&self) -> Option<WindowId> {
            self.foreground.get()
        }

        fn client_rect_on_screen(&self, window: WindowId) -> Option<Rect> {
            self.windows.borrow().get(&window.0).map(|w| w.client_rect)
        }

        fn move_window(&self, window: WindowId, rect: Rect) {
            self.moves.borrow_mut().push((window, rect));
        }

        fn reassert_overlay_styles(&self, _window: WindowId) {
            self.style_reasserts.set(self.style_reasserts.get() + 1);
        }

        fn key_just_pressed(&self, _vk: i32) -> bool {
            self.key_script.borrow_mut().pop_front().unwrap_or(false)
        }

        fn pump_messages(&self) -> bool {
            self.pump_script.borrow_mut().pop_front().unwrap_or(false)
        }

        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
        }
    }
}

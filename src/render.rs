//! GPU surface ownership: device, swap chain, and render-target view.
//!
//! The device and swap chain live for the whole session; the render-target
//! view has a nested lifecycle and is rebuilt on every window resize. The
//! view must be dropped before `ResizeBuffers` runs or the resize call fails
//! with outstanding-reference errors.

use crate::platform::WindowId;
use thiserror::Error;
use tracing::{debug, warn};
use windows::Win32::Foundation::{E_FAIL, HMODULE};
use windows::Win32::Graphics::Direct3D::{D3D_DRIVER_TYPE, D3D_DRIVER_TYPE_HARDWARE, D3D_DRIVER_TYPE_WARP};
use windows::Win32::Graphics::Direct3D11::{
    D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_SDK_VERSION, D3D11CreateDeviceAndSwapChain,
    ID3D11Device, ID3D11DeviceContext, ID3D11RenderTargetView, ID3D11Texture2D,
};
use windows::Win32::Graphics::Dxgi::Common::{
    DXGI_FORMAT_B8G8R8A8_UNORM, DXGI_FORMAT_UNKNOWN, DXGI_MODE_DESC, DXGI_SAMPLE_DESC,
};
use windows::Win32::Graphics::Dxgi::{
    DXGI_ERROR_UNSUPPORTED, DXGI_PRESENT, DXGI_SWAP_CHAIN_DESC, DXGI_SWAP_CHAIN_FLAG,
    DXGI_SWAP_EFFECT_DISCARD, DXGI_USAGE_RENDER_TARGET_OUTPUT, IDXGISwapChain,
};

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("graphics device creation failed: {0}")]
    DeviceCreation(#[source] windows::core::Error),
    #[error("swap chain resize failed: {0}")]
    Resize(#[source] windows::core::Error),
    #[error("render target view creation failed: {0}")]
    RenderTarget(#[source] windows::core::Error),
}

/// Per-frame surface operations the scheduler drives.
///
/// One concrete implementation exists; the trait is here so the loop logic
/// can run against a recording fake in tests.
pub trait Surface {
    /// Rebuild the backbuffer and view for a new window size.
    fn resize(&mut self, width: u32, height: u32) -> Result<(), SurfaceError>;

    /// Clear the render target to fully transparent.
    fn clear(&mut self);

    /// Present the backbuffer. `sync_interval` 0 presents immediately; a
    /// larger value blocks for that many vsync intervals, which the idle
    /// path uses as a cheap throttle.
    fn present(&mut self, sync_interval: u32);

    /// Release view, swap chain, context, and device, in that order. Safe to
    /// call more than once.
    fn destroy(&mut self);
}

/// Direct3D 11 swap chain bound to the overlay window.
pub struct D3D11Surface {
    device: Option<ID3D11Device>,
    context: Option<ID3D11DeviceContext>,
    swap_chain: Option<IDXGISwapChain>,
    render_target: Option<ID3D11RenderTargetView>,
}

const CLEAR_TRANSPARENT: [f32; 4] = [0.0, 0.0, 0.0, 0.0];

fn create_device_with_driver(
    driver: D3D_DRIVER_TYPE,
    desc: &DXGI_SWAP_CHAIN_DESC,
) -> windows::core::Result<(ID3D11Device, ID3D11DeviceContext, IDXGISwapChain)> {
    let mut device: Option<ID3D11Device> = None;
    let mut context: Option<ID3D11DeviceContext> = None;
    let mut swap_chain: Option<IDXGISwapChain> = None;
    unsafe {
        D3D11CreateDeviceAndSwapChain(
            None,
            driver,
            HMODULE::default(),
            D3D11_CREATE_DEVICE_BGRA_SUPPORT,
            None,
            D3D11_SDK_VERSION,
            Some(desc),
            Some(&mut swap_chain),
            Some(&mut device),
            None,
            Some(&mut context),
        )?;
    }
    // The API contract guarantees all three on success.
    let missing = || windows::core::Error::from(E_FAIL);
    Ok((
        device.ok_or_else(missing)?,
        context.ok_or_else(missing)?,
        swap_chain.ok_or_else(missing)?,
    ))
}

impl D3D11Surface {
    /// Create the device and swap chain for the overlay window. Hardware
    /// acceleration is attempted first; an unsupported-device failure falls
    /// back to the WARP software rasterizer before giving up.
    pub fn create(window: WindowId, width: u32, height: u32) -> Result<Self, SurfaceError> {
        let desc = DXGI_SWAP_CHAIN_DESC {
            BufferDesc: DXGI_MODE_DESC {
                Width: width,
                Height: height,
                Format: DXGI_FORMAT_B8G8R8A8_UNORM,
                ..Default::default()
            },
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: 1,
            OutputWindow: window.hwnd(),
            Windowed: true.into(),
            SwapEffect: DXGI_SWAP_EFFECT_DISCARD,
            ..Default::default()
        };

        let (device, context, swap_chain) =
            match create_device_with_driver(D3D_DRIVER_TYPE_HARDWARE, &desc) {
                Ok(parts) => parts,
                Err(e) if e.code() == DXGI_ERROR_UNSUPPORTED => {
                    warn!("hardware device unsupported, falling back to WARP");
                    create_device_with_driver(D3D_DRIVER_TYPE_WARP, &desc)
                        .map_err(SurfaceError::DeviceCreation)?
                }
                Err(e) => return Err(SurfaceError::DeviceCreation(e)),
            };

        let mut surface = Self {
            device: Some(device),
            context: Some(context),
            swap_chain: Some(swap_chain),
            render_target: None,
        };
        surface.rebuild_render_target()?;
        debug!(width, height, "render surface created");
        Ok(surface)
    }

    fn rebuild_render_target(&mut self) -> Result<(), SurfaceError> {
        let (Some(device), Some(context), Some(swap_chain)) =
            (&self.device, &self.context, &self.swap_chain)
        else {
            return Ok(());
        };
        unsafe {
            let back_buffer: ID3D11Texture2D = swap_chain
                .GetBuffer(0)
                .map_err(SurfaceError::RenderTarget)?;
            let mut view: Option<ID3D11RenderTargetView> = None;
            device
                .CreateRenderTargetView(&back_buffer, None, Some(&mut view))
                .map_err(SurfaceError::RenderTarget)?;
            context.OMSetRenderTargets(Some(&[view.clone()]), None);
            self.render_target = view;
        }
        Ok(())
    }
}

impl Surface for D3D11Surface {
    fn resize(&mut self, width: u32, height: u32) -> Result<(), SurfaceError> {
        // The backbuffer reference must go away before ResizeBuffers.
        self.render_target = None;
        if let Some(swap_chain) = &self.swap_chain {
            unsafe {
                swap_chain
                    .ResizeBuffers(0, width, height, DXGI_FORMAT_UNKNOWN, DXGI_SWAP_CHAIN_FLAG(0))
                    .map_err(SurfaceError::Resize)?;
            }
        }
        self.rebuild_render_target()?;
        debug!(width, height, "render surface resized");
        Ok(())
    }

    fn clear(&mut self) {
        if let (Some(context), Some(view)) = (&self.context, &self.render_target) {
            unsafe {
                context.ClearRenderTargetView(view, &CLEAR_TRANSPARENT);
            }
        }
    }

    fn present(&mut self, sync_interval: u32) {
        // Present failures are not individually retried; the next iteration's
        // liveness and focus checks catch anything persistent.
        if let Some(swap_chain) = &self.swap_chain {
            unsafe {
                let _ = swap_chain.Present(sync_interval, DXGI_PRESENT(0));
            }
        }
    }

    fn destroy(&mut self) {
        self.render_target = None;
        self.swap_chain = None;
        self.context = None;
        self.device = None;
    }
}

impl Drop for D3D11Surface {
    fn drop(&mut self) {
        self.destroy();
    }
}

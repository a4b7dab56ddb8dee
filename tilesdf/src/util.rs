// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Helpers to get a device and a surface the renderer can draw into.

use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

use wgpu::{
    Adapter, Device, Instance, PresentMode, Queue, Surface, SurfaceConfiguration, SurfaceTarget,
    TextureFormat, TextureUsages,
};

use crate::{Error, RendererOptions, Result};

/// Formats the raster pipeline can target, in order of preference.
const SURFACE_FORMATS: [TextureFormat; 2] = [TextureFormat::Rgba8Unorm, TextureFormat::Bgra8Unorm];

/// A wgpu instance and the devices opened on it.
pub struct RenderContext {
    pub instance: Instance,
    pub devices: Vec<DeviceHandle>,
}

pub struct DeviceHandle {
    adapter: Adapter,
    pub device: Device,
    pub queue: Queue,
}

impl DeviceHandle {
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }
}

impl RenderContext {
    /// Creates an instance, honoring the `WGPU_BACKEND` and related
    /// environment variables.
    #[expect(
        clippy::new_without_default,
        reason = "Creating a wgpu Instance is something which should only be done rarely"
    )]
    pub fn new() -> Self {
        let instance = Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::from_env().unwrap_or_default(),
            flags: wgpu::InstanceFlags::from_build_config().with_env(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::from_env_or_default(),
        });
        Self {
            instance,
            devices: Vec::new(),
        }
    }

    /// Returns the index of a device which can present to
    /// `compatible_surface`, opening one if needed.
    ///
    /// Without a surface any open device will do. Returns `None` if no
    /// adapter is available.
    pub async fn device(&mut self, compatible_surface: Option<&Surface<'_>>) -> Option<usize> {
        let existing = self.devices.iter().position(|handle| {
            compatible_surface.is_none_or(|surface| handle.adapter.is_surface_supported(surface))
        });
        match existing {
            Some(id) => Some(id),
            None => self.open_device(compatible_surface).await,
        }
    }

    /// Like [`device`](Self::device) without a surface, for headless use.
    pub async fn first_device(&mut self) -> Result<&DeviceHandle> {
        let id = self.device(None).await.ok_or(Error::NoCompatibleDevice)?;
        Ok(&self.devices[id])
    }

    async fn open_device(&mut self, compatible_surface: Option<&Surface<'_>>) -> Option<usize> {
        let adapter =
            wgpu::util::initialize_adapter_from_env_or_default(&self.instance, compatible_surface)
                .await
                .ok()?;
        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("tilesdf"),
                ..Default::default()
            })
            .await
            .inspect_err(|err| log::warn!("adapter {} refused a device: {err}", info.name))
            .ok()?;
        self.devices.push(DeviceHandle {
            adapter,
            device,
            queue,
        });
        Some(self.devices.len() - 1)
    }

    /// Creates a surface for `window` and configures it at `width` by
    /// `height` with an RGBA8 or BGRA8 format.
    pub async fn create_surface<'w>(
        &mut self,
        window: impl Into<SurfaceTarget<'w>>,
        width: u32,
        height: u32,
        present_mode: PresentMode,
    ) -> Result<RenderSurface<'w>> {
        let surface = self.instance.create_surface(window.into())?;
        let dev_id = self
            .device(Some(&surface))
            .await
            .ok_or(Error::NoCompatibleDevice)?;
        let capabilities = surface.get_capabilities(&self.devices[dev_id].adapter);
        let format = SURFACE_FORMATS
            .into_iter()
            .find(|format| capabilities.formats.contains(format))
            .ok_or(Error::UnsupportedSurfaceFormat)?;
        let surface = RenderSurface {
            surface,
            config: SurfaceConfiguration {
                usage: TextureUsages::RENDER_ATTACHMENT,
                format,
                width,
                height,
                present_mode,
                desired_maximum_frame_latency: 2,
                alpha_mode: wgpu::CompositeAlphaMode::Auto,
                view_formats: vec![],
            },
            dev_id,
        };
        surface.configure(&self.devices[dev_id].device);
        Ok(surface)
    }

    /// Resizes the surface and reconfigures it.
    ///
    /// # Panics
    ///
    /// If `width` or `height` is zero.
    pub fn resize_surface(&self, surface: &mut RenderSurface<'_>, width: u32, height: u32) {
        surface.config.width = width;
        surface.config.height = height;
        surface.configure(&self.devices[surface.dev_id].device);
    }
}

/// A configured surface and the index of the device it belongs to.
///
/// The raster pass draws straight into the surface texture.
#[derive(Debug)]
pub struct RenderSurface<'s> {
    pub surface: Surface<'s>,
    pub config: SurfaceConfiguration,
    pub dev_id: usize,
}

impl RenderSurface<'_> {
    pub fn format(&self) -> TextureFormat {
        self.config.format
    }

    /// Options for a [`Renderer`](crate::Renderer) drawing into this surface.
    pub fn renderer_options(&self) -> RendererOptions {
        RendererOptions {
            surface_format: Some(self.format()),
            ..Default::default()
        }
    }

    fn configure(&self, device: &Device) {
        self.surface.configure(device, &self.config);
    }
}

struct NullWake;

impl Wake for NullWake {
    fn wake(self: Arc<Self>) {}
}

/// Drives `fut` to completion, waiting on `device` whenever it is pending.
///
/// Only futures resolved by GPU progress, such as buffer mapping or error
/// scopes, may be passed. Anything else never completes.
///
/// # Panics
///
/// On WebAssembly, and if the device is lost.
#[cfg_attr(docsrs, doc(hidden))]
pub fn block_on_wgpu<F: Future>(device: &Device, fut: F) -> F::Output {
    assert!(
        !cfg!(target_arch = "wasm32"),
        "blocking on the GPU is not possible on WebAssembly"
    );
    let waker = Waker::from(Arc::new(NullWake));
    let mut cx = Context::from_waker(&waker);
    let mut fut = std::pin::pin!(fut);
    loop {
        if let Poll::Ready(output) = fut.as_mut().poll(&mut cx) {
            return output;
        }
        device
            .poll(wgpu::PollType::wait_indefinitely())
            .expect("device lost while waiting for GPU work");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_on_ready_future_skips_polling() {
        // A ready future must not touch the device, so any device would do;
        // without an adapter there is nothing to check.
        let mut context = RenderContext::new();
        let Some(id) = pollster::block_on(context.device(None)) else {
            return;
        };
        let device = &context.devices[id].device;
        assert_eq!(block_on_wgpu(device, std::future::ready(7)), 7);
    }
}

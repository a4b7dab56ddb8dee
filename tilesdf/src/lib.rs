// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tilesdf draws 2D shapes described by signed distance functions, using [`wgpu`].
//!
//! Shapes are encoded into a [`CommandStream`] each frame. A compute pass
//! bins every command into the screen tiles its bounding box overlaps,
//! building one linked list per tile, and an indirect draw then rasterizes
//! one quad per occupied tile, evaluating only the commands of that tile.
//!
//! ## Getting started
//!
//! ```ignore
//! let device: wgpu::Device = ...;
//! let queue: wgpu::Queue = ...;
//! let mut renderer = Renderer::new(
//!     &device,
//!     RendererOptions {
//!         surface_format: Some(texture_format),
//!         ..Default::default()
//!     },
//! )?;
//! renderer.resize(&device, width, height);
//!
//! // Each frame.
//! renderer.begin_frame();
//! renderer
//!     .stream()
//!     .disc(Point::new(100.0, 100.0), 50.0, palette::css::ORANGE);
//! renderer.end_frame(&device, &queue);
//! renderer.bin_commands();
//! let surface_texture = surface.get_current_texture()?;
//! renderer.render_to_surface(&device, &queue, &surface_texture)?;
//! surface_texture.present();
//! ```
//!
//! Up to [`MAX_FRAMES_IN_FLIGHT`] frames are processed by the GPU at once.
//! The per-frame buffers are triple buffered, and [`Renderer::end_frame`]
//! blocks until the slot it writes is no longer read by the GPU.

// LINEBENDER LINT SET - lib.rs - v2
// See https://linebender.org/wiki/canonical-lints/
// These lints aren't included in Cargo.toml because they
// shouldn't apply to examples and tests
#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
// The following lints are part of the Linebender standard set,
// but resolving them has been deferred for now.
#![allow(missing_docs, reason = "We have many as-yet undocumented items.")]
#![allow(
    missing_debug_implementations,
    unnameable_types,
    unreachable_pub,
    clippy::cast_possible_truncation,
    clippy::missing_assert_message,
    reason = "Deferred"
)]

mod frame;
mod pacing;
mod recording;
mod render;
mod shaders;
mod wgpu_engine;

pub mod cpu;
pub mod util;

pub mod low_level {
    //! Utilities which can be used to drive the tile pipeline without a [`Renderer`][crate::Renderer].
    //!
    //! These APIs have not been carefully designed, and might change without notice.

    pub use crate::frame::{FrameRing, SlotState, SlotTracker};
    pub use crate::pacing::FramePacer;
    pub use crate::recording::{
        BufferProxy, Command, DrawParams, ImageProxy, Recording, ResourceId, ShaderId,
    };
    pub use crate::render::{record_binning, record_raster, FrameBuffers, TileBuffers};
    pub use crate::shaders::FullShaders;
}

/// Styling and other types.
pub use peniko;
/// 2D geometry, with a focus on curves.
pub use peniko::kurbo;

#[doc(hidden)]
pub use tilesdf_encoding as encoding;
pub use tilesdf_encoding::{
    BinCounters, Camera, Capacities, CommandStream, FillMode, FrameStats, Paint, RenderParams,
    SdfOperator, Shape, Viewport, MAX_FRAMES_IN_FLIGHT, MAX_TARGET_EXTENT, TILE_SIZE,
};
pub use wgpu;

use std::path::PathBuf;

use tilesdf_encoding::{
    tiles_for, ClipRect, ConfigUniform, DrawCommand, DrawIndirect, QuantizedAabb, TileNode,
    MAX_TILE_INDEX,
};
use wgpu::{Buffer, BufferUsages, Device, Queue, SurfaceTexture, TextureFormat, TextureView};

use frame::FrameRing;
use pacing::FramePacer;
use recording::{BufferProxy, ImageProxy, Recording};
use render::{FrameBuffers, TileBuffers};
use shaders::FullShaders;
use util::block_on_wgpu;
use wgpu_engine::{ExternalResource, WgpuEngine};

/// Errors that can occur in tilesdf.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// There is no available device with the features required by tilesdf.
    #[error("Couldn't find suitable device")]
    NoCompatibleDevice,
    /// Failed to create surface.
    /// See [`wgpu::CreateSurfaceError`] for more information.
    #[error("Couldn't create wgpu surface")]
    WgpuCreateSurfaceError(#[from] wgpu::CreateSurfaceError),
    /// Surface doesn't support the required texture formats.
    /// Make sure that you have a surface which provides one of
    /// [`TextureFormat::Rgba8Unorm`] or [`TextureFormat::Bgra8Unorm`] as texture formats,
    /// and that it matches [`RendererOptions::surface_format`].
    #[error("Couldn't find `Rgba8Unorm` or `Bgra8Unorm` texture formats for surface")]
    UnsupportedSurfaceFormat,

    /// Used a buffer inside a recording while it was not available.
    #[error("Buffer '{0}' is not available but used for {1}")]
    UnavailableBufferUsed(&'static str, &'static str),
    /// Failed to async map a buffer.
    /// See [`wgpu::BufferAsyncError`] for more information.
    #[error("Failed to async map a buffer")]
    BufferAsyncError(#[from] wgpu::BufferAsyncError),
    /// The mapping callback of a download was dropped without running.
    #[error("Failed to download internal buffer '{0}'")]
    DownloadError(&'static str),
    /// Waiting for the device failed, usually because it was lost.
    #[error("Failed to wait for the device")]
    DevicePoll(#[from] wgpu::PollError),

    #[error("wgpu Error from scope")]
    WgpuErrorFromScope(#[from] wgpu::Error),

    /// Failed to compile the shaders.
    #[cfg(feature = "hot_reload")]
    #[error("Failed to compile shaders:\n{0}")]
    #[doc(hidden)] // End-users of tilesdf should not have `hot_reload` enabled.
    ShaderCompilation(#[from] tilesdf_shaders::compile::ErrorVec),
}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

/// Options which are set at renderer creation time, used in [`Renderer::new`].
#[derive(Clone, Debug)]
pub struct RendererOptions {
    /// The format of the texture the tiles are drawn into.
    ///
    /// Defaults to [`TextureFormat::Rgba8Unorm`] when `None`.
    pub surface_format: Option<TextureFormat>,

    /// Sizes of the per-frame buffers and of the tile node pool.
    pub capacities: Capacities,

    /// Block in [`Renderer::flush_to_view`] until the GPU has finished the frame.
    ///
    /// Turning this off lets the CPU encode the next frames while the GPU
    /// works, bounded by [`MAX_FRAMES_IN_FLIGHT`].
    pub wait_for_completion: bool,

    /// Directory to load shaders from in [`Renderer::reload_shaders`].
    ///
    /// Only used with the `hot_reload` feature. `None` uses the sources of
    /// the `tilesdf_shaders` crate.
    pub shader_dir: Option<PathBuf>,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            surface_format: None,
            capacities: Capacities::default(),
            wait_for_completion: true,
            shader_dir: None,
        }
    }
}

/// Diagnostics of a [`Renderer`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RendererStats {
    /// Usage of the command stream.
    pub stream: FrameStats,
    /// Frames submitted whose GPU work is not done yet.
    pub in_flight: usize,
    /// Frames whose GPU work is done.
    pub completed_frames: u64,
    /// Current antialiasing width in pixels.
    pub aa_width: f32,
}

/// Where the renderer is in the lifecycle of a frame.
#[derive(Debug)]
enum FrameState {
    Idle,
    /// Between `begin_frame` and `end_frame`.
    Recording,
    /// Buffers are written for `frame`.
    Sealed { frame: u64, config: ConfigUniform },
    /// The binning passes are recorded.
    Binned {
        frame: u64,
        config: ConfigUniform,
        recording: Recording,
    },
}

/// The triple buffered streams of a frame.
struct FrameRings {
    config: FrameRing<ConfigUniform>,
    commands: FrameRing<DrawCommand>,
    draw_data: FrameRing<f32>,
    aabbs: FrameRing<QuantizedAabb>,
    clips: FrameRing<ClipRect>,
}

impl FrameRings {
    fn new(device: &Device, capacities: &Capacities) -> Self {
        let storage = BufferUsages::STORAGE;
        Self {
            config: FrameRing::new(device, "config", 1, BufferUsages::UNIFORM),
            commands: FrameRing::new(device, "commands", capacities.commands, storage),
            draw_data: FrameRing::new(device, "draw_data", capacities.draw_data, storage),
            aabbs: FrameRing::new(device, "aabbs", capacities.commands, storage),
            clips: FrameRing::new(device, "clips", capacities.clips, storage),
        }
    }

    fn proxies(&self, frame: u64) -> FrameBuffers {
        FrameBuffers {
            config: self.config.proxy(frame),
            commands: self.commands.proxy(frame),
            draw_data: self.draw_data.proxy(frame),
            aabbs: self.aabbs.proxy(frame),
            clips: self.clips.proxy(frame),
        }
    }

    fn external_resources(&self, frame: u64) -> [ExternalResource<'_>; 5] {
        [
            ExternalResource::Buffer(self.config.proxy(frame), self.config.buffer(frame)),
            ExternalResource::Buffer(self.commands.proxy(frame), self.commands.buffer(frame)),
            ExternalResource::Buffer(self.draw_data.proxy(frame), self.draw_data.buffer(frame)),
            ExternalResource::Buffer(self.aabbs.proxy(frame), self.aabbs.buffer(frame)),
            ExternalResource::Buffer(self.clips.proxy(frame), self.clips.buffer(frame)),
        ]
    }
}

/// Tile-indexed buffers, reallocated when the target is resized.
///
/// Only the GPU reads and writes them. Frames in flight share them, which
/// is sound because the queue runs submissions in order.
struct TileResources {
    proxies: TileBuffers,
    heads: Buffer,
    nodes: Buffer,
    counters: Buffer,
    tile_indices: Buffer,
    indirect: Buffer,
}

impl TileResources {
    fn new(device: &Device, width: u32, height: u32, max_nodes: u32) -> Self {
        let per_axis = |extent| tiles_for(extent).min(MAX_TILE_INDEX + 1);
        let tile_count = (per_axis(width) * per_axis(height)).max(1) as u64;
        let node_size = max_nodes.max(1) as u64 * size_of::<TileNode>() as u64;
        let create = |name: &'static str, size: u64, usage: BufferUsages| {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(name),
                size,
                usage,
                mapped_at_creation: false,
            });
            (BufferProxy::new(size, name), buffer)
        };
        let (heads_proxy, heads) = create("heads", tile_count * 4, BufferUsages::STORAGE);
        let (nodes_proxy, nodes) = create("nodes", node_size, BufferUsages::STORAGE);
        let (counters_proxy, counters) = create(
            "counters",
            size_of::<BinCounters>() as u64,
            BufferUsages::STORAGE | BufferUsages::COPY_SRC,
        );
        let (tile_indices_proxy, tile_indices) =
            create("tile_indices", tile_count * 4, BufferUsages::STORAGE);
        let (indirect_proxy, indirect) = create(
            "indirect",
            size_of::<DrawIndirect>() as u64,
            BufferUsages::STORAGE | BufferUsages::INDIRECT | BufferUsages::COPY_DST,
        );
        Self {
            proxies: TileBuffers {
                heads: heads_proxy,
                nodes: nodes_proxy,
                counters: counters_proxy,
                tile_indices: tile_indices_proxy,
                indirect: indirect_proxy,
            },
            heads,
            nodes,
            counters,
            tile_indices,
            indirect,
        }
    }

    fn external_resources(&self) -> [ExternalResource<'_>; 5] {
        let p = &self.proxies;
        [
            ExternalResource::Buffer(p.heads, &self.heads),
            ExternalResource::Buffer(p.nodes, &self.nodes),
            ExternalResource::Buffer(p.counters, &self.counters),
            ExternalResource::Buffer(p.tile_indices, &self.tile_indices),
            ExternalResource::Buffer(p.indirect, &self.indirect),
        ]
    }
}

/// Encodes, bins and rasterizes frames of SDF shapes.
///
/// A frame goes through [`begin_frame`](Self::begin_frame), draw calls on
/// [`stream`](Self::stream), [`end_frame`](Self::end_frame),
/// [`bin_commands`](Self::bin_commands) and finally
/// [`flush_to_view`](Self::flush_to_view) or
/// [`render_to_surface`](Self::render_to_surface). Calling these out of
/// order panics.
pub struct Renderer {
    options: RendererOptions,
    engine: WgpuEngine,
    shaders: FullShaders,
    stream: CommandStream,
    params: RenderParams,
    rings: FrameRings,
    tiles: TileResources,
    pacer: FramePacer,
    state: FrameState,
    warned_extent: bool,
}
// This is not `Send` (or `Sync`) on WebAssembly as the
// underlying wgpu types are not.
#[cfg(not(target_arch = "wasm32"))]
static_assertions::assert_impl_all!(Renderer: Send);

impl Renderer {
    /// Creates a new renderer for the specified device.
    ///
    /// Pipelines which fail to build are logged and their work is skipped,
    /// so frames still complete.
    pub fn new(device: &Device, mut options: RendererOptions) -> Result<Self> {
        options.capacities = options.capacities.validated();
        let mut engine = WgpuEngine::new();
        let shaders = shaders::full_shaders(device, &mut engine, &options)?;
        // Failures are already logged, and the pipelines left empty.
        let _ = engine.take_failure();
        let capacities = options.capacities;
        Ok(Self {
            engine,
            shaders,
            stream: CommandStream::new(capacities),
            params: RenderParams::default(),
            rings: FrameRings::new(device, &capacities),
            tiles: TileResources::new(device, 0, 0, capacities.nodes),
            pacer: FramePacer::new(),
            state: FrameState::Idle,
            warned_extent: false,
            options,
        })
    }

    /// Sets the size of the target and reallocates the tile buffers.
    ///
    /// # Panics
    ///
    /// If called during a frame.
    pub fn resize(&mut self, device: &Device, width: u32, height: u32) {
        assert!(
            matches!(self.state, FrameState::Idle),
            "resize called during a frame"
        );
        if (width > MAX_TARGET_EXTENT || height > MAX_TARGET_EXTENT) && !self.warned_extent {
            log::warn!(
                "target of {width}x{height} exceeds {MAX_TARGET_EXTENT} pixels, tiles past it are not drawn"
            );
            self.warned_extent = true;
        }
        self.stream.set_viewport(width, height);
        self.tiles = TileResources::new(device, width, height, self.options.capacities.nodes);
        log::info!(
            "resized to {width}x{height}, {}x{} tiles",
            tiles_for(width),
            tiles_for(height)
        );
    }

    /// Starts a frame, resetting the command stream, camera and clip stack.
    ///
    /// # Panics
    ///
    /// If the previous frame was not flushed.
    pub fn begin_frame(&mut self) {
        assert!(
            matches!(self.state, FrameState::Idle),
            "begin_frame called before the previous frame was flushed"
        );
        self.stream.begin_frame();
        self.state = FrameState::Recording;
    }

    /// The command stream of the current frame, to issue draw calls on.
    pub fn stream(&mut self) -> &mut CommandStream {
        &mut self.stream
    }

    /// Seals the frame and writes its buffers.
    ///
    /// Blocks until fewer than [`MAX_FRAMES_IN_FLIGHT`] frames are being
    /// processed by the GPU, so the buffer slot of this frame is free.
    ///
    /// # Panics
    ///
    /// Outside a frame, or with an open combination.
    pub fn end_frame(&mut self, device: &Device, queue: &Queue) {
        assert!(
            matches!(self.state, FrameState::Recording),
            "end_frame called outside a frame"
        );
        self.stream.end_frame();
        let frame = self.pacer.acquire(device);
        let completed = self.pacer.completed();
        let config = self
            .stream
            .config(&self.params, self.options.capacities.nodes);
        let data = self.stream.frame_data();
        let rings = &mut self.rings;
        rings.config.write(queue, frame, completed, &[config]);
        rings.commands.write(queue, frame, completed, data.commands);
        rings.draw_data.write(queue, frame, completed, data.draw_data);
        rings.aabbs.write(queue, frame, completed, data.aabbs);
        rings.clips.write(queue, frame, completed, data.clips);
        log::trace!(
            "frame {frame}: {} commands, {} draw data",
            data.commands.len(),
            data.draw_data.len()
        );
        self.state = FrameState::Sealed { frame, config };
    }

    /// Records the clear, binning and indirect argument passes of the sealed frame.
    ///
    /// The work is submitted together with the draw in the flush.
    ///
    /// # Panics
    ///
    /// If the frame is not sealed.
    pub fn bin_commands(&mut self) {
        let FrameState::Sealed { frame, config } = self.state else {
            panic!("bin_commands called before end_frame");
        };
        let mut recording = Recording::default();
        render::record_binning(
            &mut recording,
            &self.shaders,
            &self.rings.proxies(frame),
            &self.tiles.proxies,
            &config,
        );
        self.state = FrameState::Binned {
            frame,
            config,
            recording,
        };
    }

    /// Submits the binned frame, drawing the occupied tiles into `view`.
    ///
    /// The view must have the format the renderer was created for. Pixels
    /// outside occupied tiles get the background color.
    ///
    /// # Panics
    ///
    /// If the frame was not binned.
    pub fn flush_to_view(&mut self, device: &Device, queue: &Queue, view: &TextureView) -> Result<()> {
        let FrameState::Binned {
            frame,
            config,
            mut recording,
        } = std::mem::replace(&mut self.state, FrameState::Idle)
        else {
            panic!("flush called before bin_commands");
        };
        let target = ImageProxy::new(config.target_width, config.target_height);
        render::record_raster(
            &mut recording,
            &self.shaders,
            &self.rings.proxies(frame),
            &self.tiles.proxies,
            target,
            cpu::clear_color(&config),
        );
        let mut external_resources = Vec::with_capacity(11);
        external_resources.extend(self.rings.external_resources(frame));
        external_resources.extend(self.tiles.external_resources());
        external_resources.push(ExternalResource::Image(target, view));
        let result = self.engine.run_recording(
            device,
            queue,
            &recording,
            &external_resources,
            "tilesdf.flush",
        );
        // Completes the frame even if nothing was submitted for it.
        self.pacer.on_submitted(queue);
        result?;
        if self.options.wait_for_completion {
            device.poll(wgpu::PollType::wait_indefinitely())?;
        }
        Ok(())
    }

    /// Submits the binned frame, drawing into a surface texture.
    ///
    /// The surface must have been configured with
    /// [`RendererOptions::surface_format`].
    pub fn render_to_surface(
        &mut self,
        device: &Device,
        queue: &Queue,
        surface: &SurfaceTexture,
    ) -> Result<()> {
        if surface.texture.format() != self.target_format() {
            return Err(Error::UnsupportedSurfaceFormat);
        }
        let view = surface
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.flush_to_view(device, queue, &view)
    }

    /// Format of the textures the raster pipeline draws into.
    pub fn target_format(&self) -> TextureFormat {
        self.options
            .surface_format
            .unwrap_or(TextureFormat::Rgba8Unorm)
    }

    /// Reads back the binning counters of the last flushed frame.
    ///
    /// Node pool exhaustion is logged. This waits for the GPU, so it is
    /// meant for diagnostics and tests.
    pub fn bin_counters(&mut self, device: &Device, queue: &Queue) -> Result<BinCounters> {
        let size = size_of::<BinCounters>() as u64;
        let download = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("counters download"),
            size,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("tilesdf.bin_counters"),
        });
        encoder.copy_buffer_to_buffer(&self.tiles.counters, 0, &download, 0, size);
        queue.submit(Some(encoder.finish()));

        let buf_slice = download.slice(..);
        let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
        buf_slice.map_async(wgpu::MapMode::Read, move |v| {
            // The receiver is only gone if the download was abandoned.
            let _ = sender.send(v);
        });
        block_on_wgpu(device, receiver.receive()).ok_or(Error::DownloadError("counters"))??;
        let counters: BinCounters = bytemuck::pod_read_unaligned(&buf_slice.get_mapped_range());
        download.unmap();
        if counters.failed != 0 {
            log::error!(
                "tile node pool of {} exhausted after {} nodes, some tiles are incomplete",
                self.options.capacities.nodes,
                counters.node_count
            );
        }
        Ok(counters)
    }

    /// Rebuilds the pipelines.
    ///
    /// With the `hot_reload` feature the sources are read again from
    /// [`RendererOptions::shader_dir`]. On failure the previous pipelines
    /// are kept and the error is returned.
    pub fn reload_shaders(&mut self, device: &Device) -> Result<()> {
        let mut engine = WgpuEngine::new();
        let shaders = shaders::full_shaders(device, &mut engine, &self.options).inspect_err(|err| {
            log::error!("keeping the previous shaders: {err}");
        })?;
        if let Some((label, err)) = engine.take_failure() {
            log::error!("keeping the previous shaders, {label} failed");
            return Err(err.into());
        }
        self.engine = engine;
        self.shaders = shaders;
        log::info!("reloaded shaders");
        Ok(())
    }

    /// Sets the width of the antialiasing ramp in pixels.
    pub fn set_aa_width(&mut self, aa_width: f32) {
        self.stream.set_aa_width(aa_width);
    }

    /// Sets the background and outline colors, from the next sealed frame on.
    pub fn set_render_params(&mut self, params: RenderParams) {
        self.params = params;
    }

    pub fn render_params(&self) -> &RenderParams {
        &self.params
    }

    pub fn stats(&self) -> RendererStats {
        RendererStats {
            stream: self.stream.stats(),
            in_flight: self.pacer.in_flight(),
            completed_frames: self.pacer.completed(),
            aa_width: self.stream.aa_width(),
        }
    }
}

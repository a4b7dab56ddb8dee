// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Runs recordings with the CPU mirrors of the shaders.
//!
//! This renders a sealed [`CommandStream`] without a GPU, for tests and
//! headless use. The results match the GPU path up to floating point
//! differences in the distance functions.

use std::cell::RefCell;
use std::collections::HashMap;

use bytemuck::Pod;
use tilesdf_encoding::{
    BinCounters, CommandStream, ConfigUniform, DrawIndirect, RenderParams, TileNode,
};
use tilesdf_shaders::cpu::{pack4x8unorm, unpack4x8unorm, CpuBinding};

use crate::recording::{BufferProxy, Command, ImageProxy, Recording, ResourceId, ShaderId};
use crate::render::{record_binning, record_raster, FrameBuffers, TileBuffers};
use crate::shaders::cpu_shaders;
use crate::{Error, Result};

type CpuShader = fn(u32, &[CpuBinding<'_>]);

/// Executes [`Recording`]s on the CPU.
#[derive(Default)]
pub struct CpuEngine {
    shaders: Vec<CpuShader>,
}

/// Memory backing the proxies of a CPU run.
///
/// Images are stored as packed RGBA8 pixels, row major.
#[derive(Default)]
pub struct CpuResources {
    bufs: HashMap<ResourceId, RefCell<Vec<u8>>>,
}

impl CpuResources {
    /// Allocates a zeroed buffer of `size` bytes.
    pub fn alloc(&mut self, size: u64, name: &'static str) -> BufferProxy {
        let proxy = BufferProxy::new(size.max(4), name);
        self.bufs
            .insert(proxy.id, RefCell::new(vec![0; proxy.size as usize]));
        proxy
    }

    /// Allocates a buffer holding `data`.
    ///
    /// Empty data still gets room for one element, as every binding must be
    /// backed by memory.
    pub fn upload<T: Pod>(&mut self, data: &[T], name: &'static str) -> BufferProxy {
        let len = data.len().max(1) * size_of::<T>();
        let proxy = self.alloc(len as u64, name);
        let bytes: &[u8] = bytemuck::cast_slice(data);
        self.bufs[&proxy.id].borrow_mut()[..bytes.len()].copy_from_slice(bytes);
        proxy
    }

    /// Allocates an image filled with the packed color `fill`.
    pub fn alloc_image(&mut self, width: u32, height: u32, fill: u32) -> ImageProxy {
        let proxy = ImageProxy::new(width, height);
        let pixels = (width as usize * height as usize).max(1);
        let bytes = std::iter::repeat_n(fill.to_ne_bytes(), pixels)
            .flatten()
            .collect();
        self.bufs.insert(proxy.id, RefCell::new(bytes));
        proxy
    }

    fn get(&self, id: ResourceId, name: &'static str, usage: &'static str) -> Result<&RefCell<Vec<u8>>> {
        self.bufs
            .get(&id)
            .ok_or(Error::UnavailableBufferUsed(name, usage))
    }

    /// Reads the start of a buffer as a `T`.
    pub fn read<T: Pod>(&self, proxy: BufferProxy) -> Result<T> {
        let buf = self.get(proxy.id, proxy.name, "read")?.borrow();
        Ok(bytemuck::pod_read_unaligned(&buf[..size_of::<T>()]))
    }

    /// Returns the packed pixels of an image.
    pub fn image(&self, proxy: ImageProxy) -> Result<Vec<u32>> {
        let pixels = self.get(proxy.id, "image", "read")?.borrow();
        let len = proxy.width as usize * proxy.height as usize;
        Ok(bytemuck::cast_slice::<u8, u32>(&pixels)[..len].to_vec())
    }
}

impl CpuEngine {
    pub fn add_shader(&mut self, shader: CpuShader) -> ShaderId {
        let id = self.shaders.len();
        self.shaders.push(shader);
        ShaderId(id)
    }

    /// Runs the commands of `recording` in order against `resources`.
    pub fn run_recording(&self, recording: &Recording, resources: &CpuResources) -> Result<()> {
        let bindings = |proxies: &[BufferProxy], usage| {
            proxies
                .iter()
                .map(|p| Ok(CpuBinding::BufferRW(resources.get(p.id, p.name, usage)?)))
                .collect::<Result<Vec<_>>>()
        };
        for command in &recording.commands {
            match command {
                Command::Clear(proxy, offset, size) => {
                    let mut buf = resources.get(proxy.id, proxy.name, "clear")?.borrow_mut();
                    let mut slice = &mut buf[*offset as usize..];
                    if let Some(size) = size {
                        slice = &mut slice[..*size as usize];
                    }
                    slice.fill(0);
                }
                Command::Dispatch(shader_id, (x, y, z), proxies) => {
                    if *x == 0 || *y == 0 || *z == 0 {
                        continue;
                    }
                    let resources = bindings(proxies, "dispatch")?;
                    (self.shaders[shader_id.0])(*x, &resources);
                }
                Command::DrawIndirect(params) => {
                    let indirect: DrawIndirect = resources.read(params.indirect)?;
                    let target = resources.get(params.target.id, "target", "draw")?;
                    if let Some(color) = params.clear_color {
                        let packed = pack4x8unorm(color);
                        bytemuck::cast_slice_mut::<u8, u32>(&mut target.borrow_mut()).fill(packed);
                    }
                    let mut resources = bindings(&params.resources, "draw")?;
                    resources.push(CpuBinding::BufferRW(target));
                    (self.shaders[params.shader_id.0])(indirect.instance_count, &resources);
                }
            }
        }
        Ok(())
    }
}

/// A frame rendered on the CPU.
#[derive(Clone, Debug)]
pub struct CpuFrame {
    pub width: u32,
    pub height: u32,
    /// Premultiplied RGBA8 pixels, row major.
    pub pixels: Vec<u8>,
    /// Binning counters of the frame.
    pub counters: BinCounters,
}

impl CpuFrame {
    /// Returns the premultiplied RGBA8 value of a pixel.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let ix = (y as usize * self.width as usize + x as usize) * 4;
        let mut out = [0; 4];
        out.copy_from_slice(&self.pixels[ix..ix + 4]);
        out
    }
}

/// Premultiplied clear color of the target, matching the packed background.
pub(crate) fn clear_color(config: &ConfigUniform) -> [f32; 4] {
    unpack4x8unorm(config.background)
}

/// Bins and rasterizes a sealed stream on the CPU.
///
/// `max_nodes` is the capacity of the tile node pool.
///
/// # Panics
///
/// If the stream is inside a frame.
pub fn render_to_pixels(
    stream: &CommandStream,
    params: &RenderParams,
    max_nodes: u32,
) -> Result<CpuFrame> {
    assert!(
        !stream.is_in_frame(),
        "render_to_pixels called before end_frame"
    );
    let max_nodes = max_nodes.max(1);
    let config = stream.config(params, max_nodes);
    let data = stream.frame_data();

    let mut engine = CpuEngine::default();
    let shaders = cpu_shaders(&mut engine);
    let mut resources = CpuResources::default();
    let frame = FrameBuffers {
        config: resources.upload(&[config], "config"),
        commands: resources.upload(data.commands, "commands"),
        draw_data: resources.upload(data.draw_data, "draw_data"),
        aabbs: resources.upload(data.aabbs, "aabbs"),
        clips: resources.upload(data.clips, "clips"),
    };
    let tile_count = config.tile_count().max(1) as u64;
    let tiles = TileBuffers {
        heads: resources.alloc(tile_count * 4, "heads"),
        nodes: resources.alloc(max_nodes as u64 * size_of::<TileNode>() as u64, "nodes"),
        counters: resources.alloc(size_of::<BinCounters>() as u64, "counters"),
        tile_indices: resources.alloc(tile_count * 4, "tile_indices"),
        indirect: resources.alloc(size_of::<DrawIndirect>() as u64, "indirect"),
    };
    let target = resources.alloc_image(config.target_width, config.target_height, 0);

    let mut recording = Recording::default();
    record_binning(&mut recording, &shaders, &frame, &tiles, &config);
    record_raster(
        &mut recording,
        &shaders,
        &frame,
        &tiles,
        target,
        clear_color(&config),
    );
    engine.run_recording(&recording, &resources)?;

    let counters: BinCounters = resources.read(tiles.counters)?;
    if counters.failed != 0 {
        log::error!(
            "tile node pool of {max_nodes} exhausted, some tiles are incomplete"
        );
    }
    let pixels = resources
        .image(target)?
        .into_iter()
        .flat_map(u32::to_le_bytes)
        .collect();
    Ok(CpuFrame {
        width: config.target_width,
        height: config.target_height,
        pixels,
        counters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use peniko::color::palette;
    use peniko::kurbo::Point;
    use tilesdf_encoding::Capacities;

    #[test]
    fn clear_zeroes_a_range() {
        let mut resources = CpuResources::default();
        let buf = resources.upload(&[1_u32, 2, 3, 4], "buf");
        let mut recording = Recording::default();
        recording.push(Command::Clear(buf, 4, Some(8)));
        CpuEngine::default()
            .run_recording(&recording, &resources)
            .unwrap();
        let values: [u32; 4] = resources.read(buf).unwrap();
        assert_eq!(values, [1, 0, 0, 4]);
    }

    #[test]
    fn unknown_buffer_is_an_error() {
        let resources = CpuResources::default();
        let mut recording = Recording::default();
        recording.clear_all(BufferProxy::new(4, "ghost"));
        let result = CpuEngine::default().run_recording(&recording, &resources);
        assert!(matches!(
            result,
            Err(Error::UnavailableBufferUsed("ghost", "clear"))
        ));
    }

    #[test]
    fn node_exhaustion_is_reported() {
        let mut stream = CommandStream::new(Capacities::default());
        stream.set_viewport(256, 256);
        stream.begin_frame();
        stream.disc(Point::new(128.0, 128.0), 120.0, palette::css::RED);
        stream.end_frame();
        let frame = render_to_pixels(&stream, &RenderParams::default(), 4).unwrap();
        assert_eq!(frame.counters.failed, 1);
        assert_eq!(frame.pixels.len(), 256 * 256 * 4);
    }
}

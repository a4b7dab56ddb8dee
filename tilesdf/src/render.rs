// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Build the recordings which bin and rasterize a sealed frame.

use tilesdf_encoding::ConfigUniform;

use crate::recording::{BufferProxy, DrawParams, ImageProxy, Recording};
use crate::shaders::{FullShaders, BINNING_WG, CLEAR_WG};

/// Frame-scoped buffers written by the CPU.
#[derive(Clone, Copy, Debug)]
pub struct FrameBuffers {
    pub config: BufferProxy,
    pub commands: BufferProxy,
    pub draw_data: BufferProxy,
    pub aabbs: BufferProxy,
    pub clips: BufferProxy,
}

/// Tile-indexed buffers written by the GPU.
#[derive(Clone, Copy, Debug)]
pub struct TileBuffers {
    pub heads: BufferProxy,
    pub nodes: BufferProxy,
    pub counters: BufferProxy,
    pub tile_indices: BufferProxy,
    pub indirect: BufferProxy,
}

/// Records clear, binning and indirect argument emission, in that order.
///
/// Each dispatch is its own pass, so binning observes the cleared heads and
/// counters, and the indirect arguments see the final occupancy.
pub fn record_binning(
    recording: &mut Recording,
    shaders: &FullShaders,
    frame: &FrameBuffers,
    tiles: &TileBuffers,
    config: &ConfigUniform,
) {
    recording.clear_all(tiles.indirect);
    recording.dispatch(
        shaders.clear,
        (config.tile_count().div_ceil(CLEAR_WG).max(1), 1, 1),
        [frame.config, tiles.heads, tiles.counters],
    );
    recording.dispatch(
        shaders.binning,
        (
            config.width_in_tiles.div_ceil(BINNING_WG),
            config.height_in_tiles.div_ceil(BINNING_WG),
            1,
        ),
        [
            frame.config,
            frame.commands,
            frame.draw_data,
            frame.aabbs,
            frame.clips,
            tiles.heads,
            tiles.nodes,
            tiles.counters,
            tiles.tile_indices,
        ],
    );
    recording.dispatch(
        shaders.write_indirect,
        (1, 1, 1),
        [tiles.counters, tiles.indirect],
    );
}

/// Records the indirect draw of one quad per occupied tile into `target`,
/// which is first cleared to `background`.
pub fn record_raster(
    recording: &mut Recording,
    shaders: &FullShaders,
    frame: &FrameBuffers,
    tiles: &TileBuffers,
    target: ImageProxy,
    background: [f32; 4],
) {
    recording.draw_indirect(DrawParams {
        shader_id: shaders.raster,
        indirect: tiles.indirect,
        resources: vec![
            frame.config,
            frame.commands,
            frame.draw_data,
            frame.clips,
            tiles.heads,
            tiles.nodes,
            tiles.tile_indices,
        ],
        target,
        clear_color: Some(background),
    });
}

// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert;

/// Width and height of a binning tile in pixels.
pub const TILE_SIZE: u32 = 32;

/// Largest tile index representable in a [`QuantizedAabb`](crate::QuantizedAabb).
pub const MAX_TILE_INDEX: u32 = u8::MAX as u32;

/// Largest supported target extent along either axis, in pixels.
pub const MAX_TARGET_EXTENT: u32 = (MAX_TILE_INDEX + 1) * TILE_SIZE;

/// Number of frames which may be in flight on the GPU at once.
pub const MAX_FRAMES_IN_FLIGHT: usize = 3;

/// Number of per-frame buffer slots in a frame ring.
pub const FRAME_SLOTS: usize = 3;

const_assert!(FRAME_SLOTS == MAX_FRAMES_IN_FLIGHT);

/// Default maximum number of draw commands per frame.
pub const MAX_COMMANDS: u32 = 16384;

/// Default maximum number of `f32` payload values per frame.
pub const MAX_DRAWDATA: u32 = 131072;

/// Default number of tile list nodes.
pub const MAX_NODES: u32 = 1 << 20;

/// Default number of clip rectangles per frame, including the full viewport
/// rectangle at index 0.
pub const MAX_CLIPS: u32 = 32;

/// Value of an empty tile list head or the end of a list.
pub const TILE_SENTINEL: u32 = 0xffff_ffff;

/// Default width of the antialiasing ramp, in pixels.
pub const DEFAULT_AA_WIDTH: f32 = 1.25;

/// Default width of outline bands, in pixels.
pub const DEFAULT_OUTLINE_WIDTH: f32 = 2.0;

/// Fixed capacities of the per-frame logical buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capacities {
    /// Maximum number of draw commands per frame.
    pub commands: u32,
    /// Maximum number of `f32` payload values per frame.
    pub draw_data: u32,
    /// Number of tile list nodes available to the binning pass.
    pub nodes: u32,
    /// Maximum number of clip rectangles, including the viewport.
    pub clips: u32,
}

impl Default for Capacities {
    fn default() -> Self {
        Self {
            commands: MAX_COMMANDS,
            draw_data: MAX_DRAWDATA,
            nodes: MAX_NODES,
            clips: MAX_CLIPS,
        }
    }
}

impl Capacities {
    /// Clamps capacities to what the wire format can address.
    ///
    /// Clip indices are stored in a byte and at least the viewport clip is
    /// always present.
    pub fn validated(self) -> Self {
        Self {
            commands: self.commands.max(1),
            draw_data: self.draw_data.max(1),
            nodes: self.nodes.max(1),
            clips: self.clips.clamp(1, u8::MAX as u32 + 1),
        }
    }
}

/// Uniform render configuration shared by every pass of a frame.
///
/// This must be kept in sync with the struct in `shader/shared/config.wgsl`
#[derive(Clone, Copy, Debug, Default, Zeroable, Pod)]
#[repr(C)]
pub struct ConfigUniform {
    /// Width of the target in tiles.
    pub width_in_tiles: u32,
    /// Height of the target in tiles.
    pub height_in_tiles: u32,
    /// Width of the target in pixels.
    pub target_width: u32,
    /// Height of the target in pixels.
    pub target_height: u32,
    /// Number of draw commands in this frame.
    pub n_commands: u32,
    /// Number of clip rectangles in this frame.
    pub n_clips: u32,
    /// Capacity of the tile node buffer.
    pub max_nodes: u32,
    /// Tile size in pixels.
    pub tile_size: u32,
    /// Width of the antialiasing ramp in pixels.
    pub aa_width: f32,
    /// Width of outline bands in pixels.
    pub outline_width: f32,
    /// Packed premultiplied RGBA background color, red in the low byte.
    pub background: u32,
    /// Packed premultiplied RGBA outline color, red in the low byte.
    pub outline_color: u32,
}

impl ConfigUniform {
    /// Number of tiles in the target.
    pub fn tile_count(&self) -> u32 {
        self.width_in_tiles * self.height_in_tiles
    }
}

/// Returns the number of tiles needed to cover `extent` pixels.
pub fn tiles_for(extent: u32) -> u32 {
    extent.div_ceil(TILE_SIZE)
}

/// A node of a per-tile command list.
///
/// This must be kept in sync with the struct in `shader/shared/tile.wgsl`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct TileNode {
    /// Index of the draw command.
    pub command_index: u32,
    /// Index of the next node, or [`TILE_SENTINEL`].
    pub next: u32,
}

/// Counters written by the binning pass.
///
/// This must be kept in sync with the struct in `shader/shared/tile.wgsl`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct BinCounters {
    /// Number of nodes allocated, may exceed the capacity on failure.
    pub node_count: u32,
    /// Number of tiles with a non-empty list.
    pub occupied_tiles: u32,
    /// Non-zero if node allocation failed.
    pub failed: u32,
    pub _padding: u32,
}

/// Arguments for an indirect non-indexed draw.
///
/// Layout matches `wgpu::util::DrawIndirectArgs`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct DrawIndirect {
    pub vertex_count: u32,
    pub instance_count: u32,
    pub first_vertex: u32,
    pub first_instance: u32,
}

/// Vertices emitted per tile quad.
pub const VERTICES_PER_TILE: u32 = 6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_sizes() {
        assert_eq!(size_of::<ConfigUniform>(), 48);
        assert_eq!(size_of::<TileNode>(), 8);
        assert_eq!(size_of::<BinCounters>(), 16);
        assert_eq!(size_of::<DrawIndirect>(), 16);
    }

    #[test]
    fn every_frame_in_flight_owns_a_slot() {
        assert_eq!(FRAME_SLOTS, MAX_FRAMES_IN_FLIGHT);
    }

    #[test]
    fn tile_rounding() {
        assert_eq!(tiles_for(0), 0);
        assert_eq!(tiles_for(1), 1);
        assert_eq!(tiles_for(32), 1);
        assert_eq!(tiles_for(33), 2);
        assert_eq!(tiles_for(1920), 60);
    }

    #[test]
    fn clip_capacity_fits_in_a_byte() {
        let caps = Capacities {
            clips: 1000,
            ..Default::default()
        }
        .validated();
        assert_eq!(caps.clips, 256);
    }
}

// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command stream encoding for the tilesdf renderer.
//!
//! Draw calls in world space are turned into three parallel streams which
//! the GPU consumes directly: packed [`DrawCommand`]s, their `f32` payloads,
//! and a [`QuantizedAabb`] per command in tile units.

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
#![allow(missing_docs, reason = "We have many as-yet undocumented items.")]

mod arena;
mod camera;
mod command;
mod config;
pub mod font;
mod math;
mod stream;

pub use arena::{Arena, CapacityError};
pub use camera::{Camera, Viewport};
pub use command::{
    pack_color, ClipRect, CommandTag, DrawCommand, FillMode, PrimitiveKind, SdfOperator, Shape,
    COMBINATION_OUTLINE, MAX_SHAPE_PAYLOAD,
};
pub use config::{
    tiles_for, BinCounters, Capacities, ConfigUniform, DrawIndirect, TileNode, DEFAULT_AA_WIDTH,
    DEFAULT_OUTLINE_WIDTH, FRAME_SLOTS, MAX_CLIPS, MAX_COMMANDS, MAX_DRAWDATA,
    MAX_FRAMES_IN_FLIGHT, MAX_NODES, MAX_TARGET_EXTENT, MAX_TILE_INDEX, TILE_SENTINEL, TILE_SIZE,
    VERTICES_PER_TILE,
};
pub use math::{Aabb, QuantizedAabb};
pub use stream::{CommandStream, FrameData, FrameStats, Paint, RenderParams};

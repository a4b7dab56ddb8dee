// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use tilesdf_encoding::{
    ClipRect, ConfigUniform, DrawCommand, FillMode, PrimitiveKind, SdfOperator, TileNode,
    COMBINATION_OUTLINE, TILE_SENTINEL,
};

use super::sdf::{self, smooth_max, smooth_min, BIG};
use super::util::{mix, pack4x8unorm, unpack4x8unorm, Vec2};
use super::CpuBinding;

struct Frame<'a> {
    config: &'a ConfigUniform,
    commands: &'a [DrawCommand],
    draw_data: &'a [f32],
    clips: &'a [ClipRect],
    heads: &'a [u32],
    nodes: &'a [TileNode],
}

fn coverage(config: &ConfigUniform, d: f32) -> f32 {
    (0.5 - d / config.aa_width).clamp(0.0, 1.0)
}

fn scale(c: [f32; 4], s: f32) -> [f32; 4] {
    [c[0] * s, c[1] * s, c[2] * s, c[3] * s]
}

/// `acc + (1 - acc.a) * src`
fn under(acc: [f32; 4], src: [f32; 4]) -> [f32; 4] {
    let t = 1.0 - acc[3];
    let mut out = acc;
    for i in 0..4 {
        out[i] += t * src[i];
    }
    out
}

fn mix4(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    let mut out = [0.0; 4];
    for i in 0..4 {
        out[i] = mix(a[i], b[i], t);
    }
    out
}

fn shade(config: &ConfigUniform, d: f32, fill: FillMode, color: [f32; 4]) -> [f32; 4] {
    let band_d = d.abs() - 0.5 * config.outline_width;
    match fill {
        FillMode::Solid => scale(color, coverage(config, d)),
        FillMode::Hollow => scale(color, coverage(config, band_d)),
        FillMode::Outline => {
            let band = scale(
                unpack4x8unorm(config.outline_color),
                coverage(config, band_d),
            );
            under(band, scale(color, coverage(config, d)))
        }
    }
}

fn in_clip(frame: &Frame<'_>, cmd: &DrawCommand, p: Vec2) -> bool {
    frame.clips[cmd.clip_index as usize].contains([p.x, p.y])
}

fn fs_main(frame: &Frame<'_>, tile_ix: u32, p: Vec2) -> [f32; 4] {
    let config = frame.config;
    let mut acc = [0.0; 4];

    let mut in_group = false;
    let mut group_d = BIG;
    let mut group_color = [0.0; 4];
    let mut group_mask = -BIG;
    let mut group_k = 0.0;
    let mut group_flags = 0;

    let mut node_ix = frame.heads[tile_ix as usize];
    let mut steps = 0;
    while node_ix != TILE_SENTINEL && steps < config.max_nodes {
        let node = frame.nodes[node_ix as usize];
        node_ix = node.next;
        steps += 1;
        let cmd = &frame.commands[node.command_index as usize];
        let Some(tag) = cmd.tag() else {
            continue;
        };
        let data = &frame.draw_data[cmd.data_index as usize..];
        match tag.kind {
            PrimitiveKind::CombinationEnd => {
                in_group = true;
                group_d = BIG;
                group_color = [0.0; 4];
                group_mask = -BIG;
                group_k = data[0];
                group_flags = cmd.custom_data;
                continue;
            }
            PrimitiveKind::CombinationBegin => {
                if in_group {
                    in_group = false;
                    if in_clip(frame, cmd, p) {
                        let fill = if group_flags & COMBINATION_OUTLINE != 0 {
                            FillMode::Outline
                        } else {
                            FillMode::Solid
                        };
                        acc = under(acc, shade(config, group_d, fill, group_color));
                    }
                }
            }
            kind => {
                if in_clip(frame, cmd, p) {
                    let color = unpack4x8unorm(cmd.color);
                    let mut d = sdf::eval(kind, data, p);
                    if !in_group {
                        acc = under(acc, shade(config, d, tag.fill, color));
                    } else {
                        if tag.fill == FillMode::Hollow {
                            d = d.abs() - 0.5 * config.outline_width;
                        }
                        let k = group_k;
                        match cmd.op().unwrap_or_default() {
                            SdfOperator::Subtraction => {
                                group_mask = smooth_max(group_mask, -d, k);
                            }
                            SdfOperator::Overlap => {
                                group_mask = smooth_max(group_mask, d, k);
                            }
                            SdfOperator::Add => {
                                let masked = smooth_max(d, group_mask, k);
                                let (blend_d, h) = smooth_min(group_d, masked, k);
                                // Color only mixes outside the shapes already folded in.
                                if group_d >= 0.0 {
                                    group_color = mix4(color, group_color, h);
                                }
                                group_d = blend_d;
                            }
                            SdfOperator::Union => {
                                let masked = smooth_max(d, group_mask, k);
                                let (blend_d, h) = smooth_min(group_d, masked, k);
                                group_color = mix4(color, group_color, h);
                                group_d = blend_d;
                            }
                        }
                    }
                }
            }
        }
        if acc[3] >= 0.999 {
            break;
        }
    }
    under(acc, unpack4x8unorm(config.background))
}

fn raster_main(frame: &Frame<'_>, tile_indices: &[u32], n_instances: u32, target: &mut [u32]) {
    let config = frame.config;
    let width = config.target_width as usize;
    let height = config.target_height as usize;
    let tile_size = config.tile_size as usize;
    for instance_ix in 0..n_instances as usize {
        let tile_ix = tile_indices[instance_ix];
        let tile_x = (tile_ix % config.width_in_tiles) as usize;
        let tile_y = (tile_ix / config.width_in_tiles) as usize;
        let x0 = tile_x * tile_size;
        let y0 = tile_y * tile_size;
        for y in y0..(y0 + tile_size).min(height) {
            for x in x0..(x0 + tile_size).min(width) {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                target[y * width + x] = pack4x8unorm(fs_main(frame, tile_ix, p));
            }
        }
    }
}

/// Draws `n_instances` tile quads into the packed RGBA8 pixels bound after
/// the shader resources.
///
/// Pixels of tiles which are not drawn keep their previous value.
pub fn raster(n_instances: u32, resources: &[CpuBinding<'_>]) {
    let config = resources[0].as_typed::<ConfigUniform>();
    let commands = resources[1].as_slice::<DrawCommand>();
    let draw_data = resources[2].as_slice::<f32>();
    let clips = resources[3].as_slice::<ClipRect>();
    let heads = resources[4].as_slice::<u32>();
    let nodes = resources[5].as_slice::<TileNode>();
    let tile_indices = resources[6].as_slice::<u32>();
    let mut target = resources[7].as_slice_mut();
    let frame = Frame {
        config: &config,
        commands: &commands,
        draw_data: &draw_data,
        clips: &clips,
        heads: &heads,
        nodes: &nodes,
    };
    raster_main(&frame, &tile_indices, n_instances, &mut target);
}

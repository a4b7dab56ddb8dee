// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use tilesdf_encoding::{
    BinCounters, ClipRect, ConfigUniform, DrawCommand, PrimitiveKind, QuantizedAabb, SdfOperator,
    TileNode,
};

use super::CpuBinding;

fn binning_main(
    config: &ConfigUniform,
    commands: &[DrawCommand],
    draw_data: &[u32],
    aabbs: &[QuantizedAabb],
    clips: &[ClipRect],
    heads: &mut [u32],
    nodes: &mut [TileNode],
    counters: &mut BinCounters,
    tile_indices: &mut [u32],
) {
    let tile_size = config.tile_size as f32;
    for tile_y in 0..config.height_in_tiles {
        for tile_x in 0..config.width_in_tiles {
            let tile_ix = (tile_y * config.width_in_tiles + tile_x) as usize;
            let x0 = tile_x as f32 * tile_size;
            let y0 = tile_y as f32 * tile_size;
            let (x1, y1) = (x0 + tile_size, y0 + tile_size);

            let mut count = 0;
            let mut group_hit = false;
            let mut i = 0;
            while i < config.n_commands as usize {
                let cmd = commands[i];
                let kind = PrimitiveKind::from_u8(cmd.tag & 0xf);
                let hit = aabbs[i].contains_tile(tile_x, tile_y)
                    && clips[cmd.clip_index as usize].overlaps(x0, y0, x1, y1);
                let mut keep = hit;
                match kind {
                    Some(PrimitiveKind::CombinationBegin) => {
                        if !hit {
                            // Skip the whole group, children included.
                            let end_ix = draw_data[cmd.data_index as usize + 1] as usize;
                            i = (end_ix + 1).max(i + 1);
                            continue;
                        }
                        group_hit = true;
                    }
                    Some(PrimitiveKind::CombinationEnd) => {
                        keep = group_hit;
                        group_hit = false;
                    }
                    _ => {
                        if group_hit && cmd.op == SdfOperator::Overlap as u8 {
                            keep = true;
                        }
                    }
                }
                if keep {
                    let node_ix = counters.node_count;
                    counters.node_count += 1;
                    if node_ix >= config.max_nodes {
                        counters.failed = 1;
                        break;
                    }
                    nodes[node_ix as usize] = TileNode {
                        command_index: i as u32,
                        next: heads[tile_ix],
                    };
                    heads[tile_ix] = node_ix;
                    count += 1;
                }
                i += 1;
            }
            if count != 0 {
                let slot = counters.occupied_tiles;
                counters.occupied_tiles += 1;
                tile_indices[slot as usize] = tile_ix as u32;
            }
        }
    }
}

pub fn binning(_n_wg: u32, resources: &[CpuBinding<'_>]) {
    let config = resources[0].as_typed();
    let commands = resources[1].as_slice();
    let draw_data = resources[2].as_slice();
    let aabbs = resources[3].as_slice();
    let clips = resources[4].as_slice();
    let mut heads = resources[5].as_slice_mut();
    let mut nodes = resources[6].as_slice_mut();
    let mut counters = resources[7].as_typed_mut();
    let mut tile_indices = resources[8].as_slice_mut();
    binning_main(
        &config,
        &commands,
        &draw_data,
        &aabbs,
        &clips,
        &mut heads,
        &mut nodes,
        &mut counters,
        &mut tile_indices,
    );
}

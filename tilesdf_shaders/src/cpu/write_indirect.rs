// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use tilesdf_encoding::{BinCounters, DrawIndirect, VERTICES_PER_TILE};

use super::CpuBinding;

fn write_indirect_main(counters: &BinCounters, indirect: &mut DrawIndirect) {
    *indirect = DrawIndirect {
        vertex_count: VERTICES_PER_TILE,
        instance_count: counters.occupied_tiles,
        first_vertex: 0,
        first_instance: 0,
    };
}

pub fn write_indirect(_n_wg: u32, resources: &[CpuBinding<'_>]) {
    let counters = resources[0].as_typed();
    let mut indirect = resources[1].as_typed_mut();
    write_indirect_main(&counters, &mut indirect);
}

// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use tilesdf_encoding::{BinCounters, ConfigUniform, TILE_SENTINEL};

use super::CpuBinding;

fn clear_main(config: &ConfigUniform, heads: &mut [u32], counters: &mut BinCounters) {
    for i in 0..config.tile_count() as usize {
        heads[i] = TILE_SENTINEL;
    }
    *counters = BinCounters::default();
}

pub fn clear(_n_wg: u32, resources: &[CpuBinding<'_>]) {
    let config = resources[0].as_typed();
    let mut heads = resources[1].as_slice_mut();
    let mut counters = resources[2].as_typed_mut();
    clear_main(&config, &mut heads, &mut counters);
}

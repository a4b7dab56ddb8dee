// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU binning stage tests.

use std::cell::RefCell;

use bytemuck::{bytes_of, cast_slice, from_bytes};
use peniko::color::palette;
use peniko::kurbo::{Point, Rect};
use tilesdf_encoding::{
    BinCounters, Capacities, CommandStream, DrawIndirect, Paint, RenderParams, SdfOperator,
    TileNode, TILE_SENTINEL,
};
use tilesdf_shaders::cpu::{binning, clear, write_indirect, CpuBinding};

struct Binned {
    heads: Vec<u32>,
    nodes: Vec<TileNode>,
    counters: BinCounters,
    tile_indices: Vec<u32>,
    indirect: DrawIndirect,
}

impl Binned {
    /// Command indices of a tile, in list order.
    fn list(&self, tile_ix: usize) -> Vec<u32> {
        let mut out = vec![];
        let mut node_ix = self.heads[tile_ix];
        while node_ix != TILE_SENTINEL {
            let node = self.nodes[node_ix as usize];
            out.push(node.command_index);
            node_ix = node.next;
        }
        out
    }
}

fn bin(stream: &CommandStream, max_nodes: u32) -> Binned {
    let config = stream.config(&RenderParams::default(), max_nodes);
    let frame = stream.frame_data();
    let n_tiles = config.tile_count().max(1) as usize;
    let heads = RefCell::new(vec![0_u8; n_tiles * 4]);
    let nodes = RefCell::new(vec![0_u8; max_nodes as usize * size_of::<TileNode>()]);
    let counters = RefCell::new(vec![0_u8; size_of::<BinCounters>()]);
    let tile_indices = RefCell::new(vec![0_u8; n_tiles * 4]);
    let indirect = RefCell::new(vec![0_u8; size_of::<DrawIndirect>()]);

    clear(
        1,
        &[
            CpuBinding::Buffer(bytes_of(&config)),
            CpuBinding::BufferRW(&heads),
            CpuBinding::BufferRW(&counters),
        ],
    );
    binning(
        1,
        &[
            CpuBinding::Buffer(bytes_of(&config)),
            CpuBinding::Buffer(cast_slice(frame.commands)),
            CpuBinding::Buffer(cast_slice(frame.draw_data)),
            CpuBinding::Buffer(cast_slice(frame.aabbs)),
            CpuBinding::Buffer(cast_slice(frame.clips)),
            CpuBinding::BufferRW(&heads),
            CpuBinding::BufferRW(&nodes),
            CpuBinding::BufferRW(&counters),
            CpuBinding::BufferRW(&tile_indices),
        ],
    );
    write_indirect(
        1,
        &[
            CpuBinding::BufferRW(&counters),
            CpuBinding::BufferRW(&indirect),
        ],
    );

    let binned = Binned {
        heads: cast_slice::<u8, u32>(&heads.borrow()).to_vec(),
        nodes: cast_slice::<u8, TileNode>(&nodes.borrow()).to_vec(),
        counters: *from_bytes(&counters.borrow()),
        tile_indices: cast_slice::<u8, u32>(&tile_indices.borrow()).to_vec(),
        indirect: *from_bytes(&indirect.borrow()),
    };
    binned
}

/// A stream for a 128x64 target, which is 4x2 tiles.
fn stream() -> CommandStream {
    let mut stream = CommandStream::new(Capacities::default());
    stream.set_viewport(128, 64);
    stream
}

#[test]
fn lists_are_in_reverse_emission_order() {
    let mut s = stream();
    s.begin_frame();
    s.disc(Point::new(16.0, 16.0), 8.0, palette::css::RED);
    s.disc(Point::new(16.0, 16.0), 6.0, palette::css::GREEN);
    s.disc(Point::new(16.0, 16.0), 4.0, palette::css::BLUE);
    s.end_frame();

    let binned = bin(&s, 64);
    assert_eq!(binned.list(0), [2, 1, 0]);
    for tile_ix in 1..8 {
        assert!(binned.list(tile_ix).is_empty(), "tile {tile_ix} not empty");
    }
    assert_eq!(binned.counters.occupied_tiles, 1);
    assert_eq!(binned.counters.node_count, 3);
    assert_eq!(binned.counters.failed, 0);
    assert_eq!(binned.tile_indices[0], 0);
    assert_eq!(
        binned.indirect,
        DrawIndirect {
            vertex_count: 6,
            instance_count: 1,
            first_vertex: 0,
            first_instance: 0,
        }
    );
}

#[test]
fn missed_combination_is_skipped() {
    let mut s = stream();
    s.begin_frame();
    s.begin_combination(2.0);
    s.disc(Point::new(112.0, 16.0), 8.0, palette::css::RED);
    s.end_combination(false);
    s.disc(Point::new(16.0, 16.0), 8.0, palette::css::BLUE);
    s.end_frame();

    let binned = bin(&s, 64);
    assert_eq!(binned.list(0), [3]);
    assert_eq!(binned.list(3), [2, 1, 0]);
    assert_eq!(binned.counters.occupied_tiles, 2);
}

#[test]
fn overlap_children_reach_every_tile_of_their_group() {
    let mut s = stream();
    s.begin_frame();
    s.begin_combination(0.0);
    s.disc(Point::new(64.0, 32.0), 60.0, palette::css::RED);
    s.disc(
        Point::new(16.0, 16.0),
        8.0,
        Paint::new(palette::css::RED).with_op(SdfOperator::Overlap),
    );
    s.end_combination(false);
    s.end_frame();

    let binned = bin(&s, 64);
    assert_eq!(binned.list(0), [3, 2, 1, 0]);
    // The overlap disc is far from tile 3 but still carves it.
    assert_eq!(binned.list(3), [3, 2, 1, 0]);
    assert_eq!(binned.counters.occupied_tiles, 8);
}

#[test]
fn clip_rect_culls_tiles() {
    let mut s = stream();
    s.begin_frame();
    s.set_clip_rect(Rect::new(0.0, 0.0, 32.0, 32.0));
    s.disc(Point::new(64.0, 32.0), 60.0, palette::css::RED);
    s.reset_clip();
    s.end_frame();

    let binned = bin(&s, 64);
    assert_eq!(binned.list(0), [0]);
    for tile_ix in 1..8 {
        assert!(binned.list(tile_ix).is_empty(), "tile {tile_ix} not empty");
    }
}

#[test]
fn node_exhaustion_is_flagged() {
    let mut s = stream();
    s.begin_frame();
    s.disc(Point::new(64.0, 32.0), 60.0, palette::css::RED);
    s.end_frame();

    let binned = bin(&s, 3);
    assert_eq!(binned.counters.failed, 1);
    assert!(binned.counters.node_count > 3);
    assert_eq!(binned.counters.occupied_tiles, 3);
    for tile_ix in 0..3 {
        assert_eq!(binned.list(tile_ix), [0]);
    }
    for tile_ix in 3..8 {
        assert!(binned.list(tile_ix).is_empty());
    }
}

#[test]
fn empty_frame_draws_nothing() {
    let mut s = stream();
    s.begin_frame();
    s.end_frame();

    let binned = bin(&s, 16);
    assert_eq!(binned.counters, BinCounters::default());
    assert_eq!(binned.indirect.instance_count, 0);
    assert!(binned.heads.iter().all(|&head| head == TILE_SENTINEL));
}

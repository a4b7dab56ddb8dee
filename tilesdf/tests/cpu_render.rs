// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Whole frames rendered through the CPU mirrors of the shaders.

use tilesdf::cpu::{render_to_pixels, CpuFrame};
use tilesdf::kurbo::{Point, Rect};
use tilesdf::peniko::color::palette;
use tilesdf::{Capacities, CommandStream, FillMode, Paint, RenderParams, SdfOperator};

const BACKGROUND: [u8; 4] = [0x1e, 0x1e, 0x24, 0xff];
const RED: [u8; 4] = [0xff, 0, 0, 0xff];
const LIME: [u8; 4] = [0, 0xff, 0, 0xff];
const BLUE: [u8; 4] = [0, 0, 0xff, 0xff];
const WHITE: [u8; 4] = [0xff; 4];

fn render(width: u32, height: u32, draw: impl FnOnce(&mut CommandStream)) -> CpuFrame {
    let mut stream = CommandStream::new(Capacities::default());
    stream.set_viewport(width, height);
    stream.begin_frame();
    draw(&mut stream);
    stream.end_frame();
    render_to_pixels(&stream, &RenderParams::default(), 1 << 16).unwrap()
}

#[test]
fn disc_scenario() {
    let mut stream = CommandStream::new(Capacities::default());
    stream.set_viewport(800, 600);
    stream.begin_frame();
    stream.disc(Point::new(100.0, 100.0), 50.0, palette::css::RED);
    stream.end_frame();

    let aabb = stream.frame_data().aabbs[0];
    assert_eq!(
        [aabb.min_x, aabb.min_y, aabb.max_x, aabb.max_y],
        [1, 1, 4, 4]
    );

    let frame = render_to_pixels(&stream, &RenderParams::default(), 1 << 16).unwrap();
    assert_eq!((frame.width, frame.height), (800, 600));
    assert_eq!(frame.counters.occupied_tiles, 16);
    assert_eq!(frame.counters.node_count, 16);
    assert_eq!(frame.counters.failed, 0);
    assert_eq!(frame.pixel(100, 100), RED);
    assert_eq!(frame.pixel(700, 500), BACKGROUND);
    // Inside a binned tile but outside the disc.
    assert_eq!(frame.pixel(35, 35), BACKGROUND);
}

#[test]
fn later_shapes_draw_on_top() {
    let frame = render(128, 128, |s| {
        s.disc(Point::new(64.0, 64.0), 40.0, palette::css::RED);
        s.disc(Point::new(64.0, 64.0), 30.0, palette::css::LIME);
        s.disc(Point::new(64.0, 64.0), 20.0, palette::css::BLUE);
    });
    assert_eq!(frame.pixel(64, 64), BLUE);
    assert_eq!(frame.pixel(64 + 25, 64), LIME);
    assert_eq!(frame.pixel(64 + 35, 64), RED);
    assert_eq!(frame.pixel(64 + 45, 64), BACKGROUND);
}

#[test]
fn smooth_union_bridges_a_gap() {
    let gap = Point::new(130.0, 100.0);
    let separate = render(256, 200, |s| {
        s.disc(Point::new(100.0, 100.0), 30.0, palette::css::RED);
        s.disc(Point::new(160.0, 100.0), 30.0, palette::css::RED);
    });
    let blended = render(256, 200, |s| {
        s.begin_combination(10.0);
        s.disc(Point::new(100.0, 100.0), 30.0, palette::css::RED);
        s.disc(Point::new(160.0, 100.0), 30.0, palette::css::RED);
        s.end_combination(false);
    });
    let (x, y) = (gap.x as u32, gap.y as u32);
    assert_eq!(blended.pixel(x, y), RED);
    assert_ne!(separate.pixel(x, y), RED);
}

#[test]
fn add_keeps_interior_of_later_shape_solid() {
    // A small earlier disc sharing a tile with the later, larger one.
    let draw = |op: SdfOperator| {
        move |s: &mut CommandStream| {
            s.begin_combination(4.0);
            s.disc(
                Point::new(124.0, 70.0),
                2.0,
                Paint::new(palette::css::RED).with_op(op),
            );
            s.disc(
                Point::new(100.0, 64.0),
                50.0,
                Paint::new(palette::css::BLUE).with_op(op),
            );
            s.end_combination(false);
        }
    };
    let added = render(256, 160, draw(SdfOperator::Add));
    let united = render(256, 160, draw(SdfOperator::Union));
    for (x, y) in [(99, 66), (80, 40), (120, 90)] {
        assert_eq!(added.pixel(x, y), BLUE, "({x}, {y})");
        assert_eq!(united.pixel(x, y), BLUE, "({x}, {y})");
    }
}

#[test]
fn subtraction_cuts_a_hole() {
    let frame = render(128, 128, |s| {
        s.begin_combination(1.0);
        s.disc(Point::new(64.0, 64.0), 40.0, palette::css::RED);
        s.disc(
            Point::new(64.0, 64.0),
            15.0,
            Paint::new(palette::css::WHITE).with_op(SdfOperator::Subtraction),
        );
        s.end_combination(false);
    });
    assert_eq!(frame.pixel(64, 64), BACKGROUND);
    assert_eq!(frame.pixel(64 + 27, 64), RED);
    assert_eq!(frame.pixel(64 + 45, 64), BACKGROUND);
}

#[test]
fn overlap_keeps_the_intersection() {
    let frame = render(128, 128, |s| {
        s.begin_combination(1.0);
        s.disc(Point::new(50.0, 64.0), 30.0, palette::css::RED);
        s.disc(
            Point::new(90.0, 64.0),
            30.0,
            Paint::new(palette::css::WHITE).with_op(SdfOperator::Overlap),
        );
        s.end_combination(false);
    });
    assert_eq!(frame.pixel(70, 64), RED);
    // Inside the first disc only, in a tile the second disc doesn't reach.
    assert_eq!(frame.pixel(30, 64), BACKGROUND);
    // Overlapping shapes only mask, they are never drawn.
    assert_eq!(frame.pixel(100, 64), BACKGROUND);
}

#[test]
fn outline_fill_draws_a_band_over_the_shape() {
    // The edge passes through the center of pixel (94, 64).
    let frame = render(128, 128, |s| {
        s.disc(
            Point::new(64.5, 64.5),
            30.0,
            Paint::new(palette::css::RED).with_fill(FillMode::Outline),
        );
    });
    assert_eq!(frame.pixel(94, 64), WHITE);
    assert_eq!(frame.pixel(64, 64), RED);
    assert_eq!(frame.pixel(110, 64), BACKGROUND);
}

#[test]
fn hollow_fill_draws_only_the_band() {
    let frame = render(128, 128, |s| {
        s.disc(
            Point::new(64.5, 64.5),
            30.0,
            Paint::new(palette::css::RED).with_fill(FillMode::Hollow),
        );
    });
    assert_eq!(frame.pixel(94, 64), RED);
    assert_eq!(frame.pixel(64, 64), BACKGROUND);
    assert_eq!(frame.pixel(110, 64), BACKGROUND);
}

#[test]
fn combination_outline_follows_the_blended_shape() {
    let draw = |outline: bool| {
        move |s: &mut CommandStream| {
            s.begin_combination(1.0);
            s.disc(Point::new(44.5, 64.5), 30.0, palette::css::RED);
            s.disc(Point::new(84.5, 64.5), 30.0, palette::css::RED);
            s.end_combination(outline);
        }
    };
    let outlined = render(128, 128, draw(true));
    // Outer edge of the left disc.
    assert_eq!(outlined.pixel(14, 64), WHITE);
    // The left disc's edge lies inside the right one, so no band there.
    assert_eq!(outlined.pixel(74, 64), RED);

    let plain = render(128, 128, draw(false));
    assert_ne!(plain.pixel(14, 64), WHITE);
    assert_eq!(plain.pixel(74, 64), RED);
}

#[test]
fn clip_rect_hides_pixels() {
    let frame = render(256, 256, |s| {
        s.set_clip_rect(Rect::new(0.0, 0.0, 100.0, 256.0));
        s.disc(Point::new(100.0, 100.0), 50.0, palette::css::RED);
        s.reset_clip();
    });
    assert_eq!(frame.pixel(75, 100), RED);
    assert_eq!(frame.pixel(125, 100), BACKGROUND);
}

#[test]
fn empty_frame_is_background() {
    let frame = render(64, 48, |_| {});
    assert_eq!(frame.counters.occupied_tiles, 0);
    assert_eq!(frame.pixels.len(), 64 * 48 * 4);
    assert!(frame.pixels.chunks_exact(4).all(|p| p == BACKGROUND));
}

#[test]
fn text_is_drawn() {
    let frame = render(256, 64, |s| {
        s.text(Point::new(8.0, 8.0), 32.0, "TILE", palette::css::WHITE);
    });
    assert!(frame.counters.occupied_tiles > 0);
    let drawn = (0..64)
        .flat_map(|y| (0..256).map(move |x| (x, y)))
        .filter(|&(x, y)| frame.pixel(x, y) != BACKGROUND)
        .count();
    assert!(drawn > 0);
}

#[test]
fn custom_background() {
    let mut stream = CommandStream::new(Capacities::default());
    stream.set_viewport(32, 32);
    stream.begin_frame();
    stream.end_frame();
    let params = RenderParams {
        background: palette::css::BLACK,
        ..Default::default()
    };
    let frame = render_to_pixels(&stream, &params, 16).unwrap();
    assert_eq!(frame.pixel(0, 0), [0, 0, 0, 0xff]);
}

#[test]
#[should_panic(expected = "before end_frame")]
fn open_frame_panics() {
    let mut stream = CommandStream::new(Capacities::default());
    stream.set_viewport(32, 32);
    stream.begin_frame();
    let _ = render_to_pixels(&stream, &RenderParams::default(), 16);
}

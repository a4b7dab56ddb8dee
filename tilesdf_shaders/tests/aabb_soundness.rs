// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Every pixel a shape can color must lie inside its quantized bounding box.

use peniko::color::palette;
use peniko::kurbo::{Point, Rect, Vec2 as KVec2};
use tilesdf_encoding::{Capacities, CommandStream, TILE_SIZE};
use tilesdf_shaders::cpu::{sdf, Vec2};

const WIDTH: u32 = 256;
const HEIGHT: u32 = 256;

type Draw = fn(&mut CommandStream);

fn shapes() -> [(&'static str, Draw); 9] {
    [
        ("disc", |s: &mut CommandStream| {
            s.disc(Point::new(100.0, 90.0), 37.0, palette::css::RED);
        }),
        ("oriented box", |s: &mut CommandStream| {
            s.oriented_box(
                Point::new(40.0, 200.0),
                Point::new(150.0, 170.0),
                20.0,
                3.0,
                palette::css::RED,
            );
        }),
        ("ellipse", |s: &mut CommandStream| {
            s.ellipse(
                Point::new(130.0, 40.0),
                Point::new(200.0, 100.0),
                24.0,
                palette::css::RED,
            );
        }),
        ("triangle", |s: &mut CommandStream| {
            s.triangle(
                Point::new(20.0, 20.0),
                Point::new(90.0, 40.0),
                Point::new(50.0, 110.0),
                4.0,
                palette::css::RED,
            );
        }),
        ("pie", |s: &mut CommandStream| {
            s.pie(
                Point::new(180.0, 180.0),
                KVec2::new(1.0, 1.0),
                50.0,
                1.2,
                palette::css::RED,
            );
        }),
        ("arc", |s: &mut CommandStream| {
            s.arc(
                Point::new(128.0, 128.0),
                KVec2::new(0.0, -1.0),
                70.0,
                2.5,
                9.0,
                palette::css::RED,
            );
        }),
        ("uneven capsule", |s: &mut CommandStream| {
            s.uneven_capsule(
                Point::new(60.0, 60.0),
                Point::new(190.0, 150.0),
                30.0,
                8.0,
                palette::css::RED,
            );
        }),
        ("trapezoid", |s: &mut CommandStream| {
            s.trapezoid(
                Point::new(30.0, 230.0),
                Point::new(200.0, 220.0),
                20.0,
                5.0,
                palette::css::RED,
            );
        }),
        ("box", |s: &mut CommandStream| {
            s.aabox(Rect::new(33.0, 65.0, 95.0, 127.0), 6.0, palette::css::RED);
        }),
    ]
}

fn check(name: &str, draw: Draw, world_box: Option<Rect>) {
    let mut s = CommandStream::new(Capacities::default());
    s.set_viewport(WIDTH, HEIGHT);
    s.set_world_box(world_box);
    s.begin_frame();
    draw(&mut s);
    s.end_frame();

    let frame = s.frame_data();
    assert_eq!(frame.commands.len(), 1, "{name}");
    let cmd = frame.commands[0];
    let kind = cmd.kind().unwrap();
    let payload = cmd.payload(frame.draw_data).unwrap();
    let aabb = frame.aabbs[0];
    // Coverage is non-zero up to half the ramp, plus half an outline band.
    let reach = 0.5 * s.aa_width() + 0.5 * s.outline_width();

    let mut touched = 0;
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            if sdf::eval(kind, payload, p) < reach {
                touched += 1;
                let (tx, ty) = (x / TILE_SIZE, y / TILE_SIZE);
                assert!(
                    aabb.contains_tile(tx, ty),
                    "{name}: pixel ({x}, {y}) outside of {aabb:?}"
                );
            }
        }
    }
    assert!(touched > 0, "{name} is not visible");
}

#[test]
fn bounds_contain_coverage() {
    for (name, draw) in shapes() {
        check(name, draw, None);
    }
}

#[test]
fn bounds_contain_coverage_after_camera_transform() {
    for (name, draw) in shapes() {
        check(name, draw, Some(Rect::new(-20.0, -20.0, 300.0, 300.0)));
    }
}

#[test]
fn bounds_contain_smoothed_coverage() {
    let smoothness = 12.0;
    let mut s = CommandStream::new(Capacities::default());
    s.set_viewport(WIDTH, HEIGHT);
    s.begin_frame();
    s.begin_combination(smoothness);
    s.disc(Point::new(90.0, 120.0), 30.0, palette::css::RED);
    s.aabox(Rect::new(130.0, 100.0, 170.0, 140.0), 4.0, palette::css::BLUE);
    s.end_combination(true);
    s.end_frame();

    let frame = s.frame_data();
    assert_eq!(frame.commands.len(), 4);
    let group = frame.aabbs[0];
    assert_eq!(frame.aabbs[3], group);
    // Smoothing pulls each shape's distance down near its neighbours, by at
    // most a quarter of `smoothness` once they are within `smoothness`.
    let reach = 0.5 * s.aa_width() + 0.5 * s.outline_width() + smoothness as f32;

    for (cmd, aabb) in frame.commands[1..3].iter().zip(&frame.aabbs[1..3]) {
        let kind = cmd.kind().unwrap();
        let payload = cmd.payload(frame.draw_data).unwrap();
        let mut touched = 0;
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
                if sdf::eval(kind, payload, p) < reach {
                    touched += 1;
                    let (tx, ty) = (x / TILE_SIZE, y / TILE_SIZE);
                    assert!(
                        aabb.contains_tile(tx, ty),
                        "{kind:?}: pixel ({x}, {y}) outside of {aabb:?}"
                    );
                    assert!(
                        group.contains_tile(tx, ty),
                        "{kind:?}: pixel ({x}, {y}) outside of the combination {group:?}"
                    );
                }
            }
        }
        assert!(touched > 0, "{kind:?} is not visible");
    }
}

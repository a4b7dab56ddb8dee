// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A tiny stroke font for labels.
//!
//! Glyphs live on a 4 by 6 grid with the origin at the top left and y
//! pointing down. Each stroke is a segment `[x0, y0, x1, y1]`. A stroke with
//! coincident ends is a dot.

/// One segment of a glyph, in grid units.
pub type Stroke = [i8; 4];

/// Height of a capital letter in grid units.
pub const CAP_HEIGHT: f64 = 6.0;

/// Horizontal distance between glyph origins in grid units.
pub const ADVANCE: f64 = 5.0;

/// Vertical distance between lines in grid units.
pub const LINE_HEIGHT: f64 = 9.0;

/// Stroke radius in grid units.
pub const STROKE_RADIUS: f64 = 0.4;

const RING: &[Stroke] = &[
    [1, 0, 3, 0],
    [3, 0, 4, 1],
    [4, 1, 4, 5],
    [4, 5, 3, 6],
    [3, 6, 1, 6],
    [1, 6, 0, 5],
    [0, 5, 0, 1],
    [0, 1, 1, 0],
];

const BOWL: &[Stroke] = &[
    [0, 6, 0, 0],
    [0, 0, 3, 0],
    [3, 0, 4, 1],
    [4, 1, 4, 2],
    [4, 2, 3, 3],
    [3, 3, 0, 3],
];

/// Strokes of `c`, or `None` if the font has no glyph for it.
///
/// Lowercase letters use the uppercase glyphs. Space has a glyph with no
/// strokes.
pub fn glyph(c: char) -> Option<&'static [Stroke]> {
    Some(match c.to_ascii_uppercase() {
        ' ' => &[],
        'A' => &[[0, 6, 2, 0], [2, 0, 4, 6], [1, 3, 3, 3]],
        'B' => &[
            [0, 0, 0, 6],
            [0, 0, 3, 0],
            [3, 0, 4, 1],
            [4, 1, 4, 2],
            [4, 2, 3, 3],
            [0, 3, 3, 3],
            [3, 3, 4, 4],
            [4, 4, 4, 5],
            [4, 5, 3, 6],
            [3, 6, 0, 6],
        ],
        'C' => &[[4, 0, 1, 0], [1, 0, 0, 1], [0, 1, 0, 5], [0, 5, 1, 6], [1, 6, 4, 6]],
        'D' => &[[0, 0, 0, 6], [0, 0, 2, 0], [2, 0, 4, 2], [4, 2, 4, 4], [4, 4, 2, 6], [2, 6, 0, 6]],
        'E' => &[[4, 0, 0, 0], [0, 0, 0, 6], [0, 6, 4, 6], [0, 3, 3, 3]],
        'F' => &[[4, 0, 0, 0], [0, 0, 0, 6], [0, 3, 3, 3]],
        'G' => &[
            [4, 1, 3, 0],
            [3, 0, 1, 0],
            [1, 0, 0, 1],
            [0, 1, 0, 5],
            [0, 5, 1, 6],
            [1, 6, 3, 6],
            [3, 6, 4, 5],
            [4, 5, 4, 3],
            [4, 3, 2, 3],
        ],
        'H' => &[[0, 0, 0, 6], [4, 0, 4, 6], [0, 3, 4, 3]],
        'I' => &[[1, 0, 3, 0], [2, 0, 2, 6], [1, 6, 3, 6]],
        'J' => &[[4, 0, 4, 5], [4, 5, 3, 6], [3, 6, 1, 6], [1, 6, 0, 5]],
        'K' => &[[0, 0, 0, 6], [4, 0, 0, 4], [1, 3, 4, 6]],
        'L' => &[[0, 0, 0, 6], [0, 6, 4, 6]],
        'M' => &[[0, 6, 0, 0], [0, 0, 2, 3], [2, 3, 4, 0], [4, 0, 4, 6]],
        'N' => &[[0, 6, 0, 0], [0, 0, 4, 6], [4, 6, 4, 0]],
        'O' => RING,
        'P' => BOWL,
        'Q' => &[
            [1, 0, 3, 0],
            [3, 0, 4, 1],
            [4, 1, 4, 5],
            [4, 5, 3, 6],
            [3, 6, 1, 6],
            [1, 6, 0, 5],
            [0, 5, 0, 1],
            [0, 1, 1, 0],
            [2, 4, 4, 6],
        ],
        'R' => &[
            [0, 6, 0, 0],
            [0, 0, 3, 0],
            [3, 0, 4, 1],
            [4, 1, 4, 2],
            [4, 2, 3, 3],
            [3, 3, 0, 3],
            [2, 3, 4, 6],
        ],
        'S' => &[
            [4, 1, 3, 0],
            [3, 0, 1, 0],
            [1, 0, 0, 1],
            [0, 1, 0, 2],
            [0, 2, 1, 3],
            [1, 3, 3, 3],
            [3, 3, 4, 4],
            [4, 4, 4, 5],
            [4, 5, 3, 6],
            [3, 6, 1, 6],
            [1, 6, 0, 5],
        ],
        'T' => &[[0, 0, 4, 0], [2, 0, 2, 6]],
        'U' => &[[0, 0, 0, 5], [0, 5, 1, 6], [1, 6, 3, 6], [3, 6, 4, 5], [4, 5, 4, 0]],
        'V' => &[[0, 0, 2, 6], [2, 6, 4, 0]],
        'W' => &[[0, 0, 1, 6], [1, 6, 2, 3], [2, 3, 3, 6], [3, 6, 4, 0]],
        'X' => &[[0, 0, 4, 6], [4, 0, 0, 6]],
        'Y' => &[[0, 0, 2, 3], [4, 0, 2, 3], [2, 3, 2, 6]],
        'Z' => &[[0, 0, 4, 0], [4, 0, 0, 6], [0, 6, 4, 6]],
        '0' => &[
            [1, 0, 3, 0],
            [3, 0, 4, 1],
            [4, 1, 4, 5],
            [4, 5, 3, 6],
            [3, 6, 1, 6],
            [1, 6, 0, 5],
            [0, 5, 0, 1],
            [0, 1, 1, 0],
            [3, 1, 1, 5],
        ],
        '1' => &[[1, 1, 2, 0], [2, 0, 2, 6], [1, 6, 3, 6]],
        '2' => &[[0, 1, 1, 0], [1, 0, 3, 0], [3, 0, 4, 1], [4, 1, 4, 2], [4, 2, 0, 6], [0, 6, 4, 6]],
        '3' => &[
            [0, 1, 1, 0],
            [1, 0, 3, 0],
            [3, 0, 4, 1],
            [4, 1, 4, 2],
            [4, 2, 3, 3],
            [3, 3, 1, 3],
            [3, 3, 4, 4],
            [4, 4, 4, 5],
            [4, 5, 3, 6],
            [3, 6, 1, 6],
            [1, 6, 0, 5],
        ],
        '4' => &[[3, 6, 3, 0], [3, 0, 0, 4], [0, 4, 4, 4]],
        '5' => &[
            [4, 0, 0, 0],
            [0, 0, 0, 3],
            [0, 3, 3, 3],
            [3, 3, 4, 4],
            [4, 4, 4, 5],
            [4, 5, 3, 6],
            [3, 6, 0, 6],
        ],
        '6' => &[
            [3, 0, 1, 0],
            [1, 0, 0, 1],
            [0, 1, 0, 5],
            [0, 5, 1, 6],
            [1, 6, 3, 6],
            [3, 6, 4, 5],
            [4, 5, 4, 4],
            [4, 4, 3, 3],
            [3, 3, 0, 3],
        ],
        '7' => &[[0, 0, 4, 0], [4, 0, 1, 6]],
        '8' => &[
            [1, 0, 3, 0],
            [3, 0, 4, 1],
            [4, 1, 4, 2],
            [4, 2, 3, 3],
            [3, 3, 1, 3],
            [1, 3, 0, 2],
            [0, 2, 0, 1],
            [0, 1, 1, 0],
            [3, 3, 4, 4],
            [4, 4, 4, 5],
            [4, 5, 3, 6],
            [3, 6, 1, 6],
            [1, 6, 0, 5],
            [0, 5, 0, 4],
            [0, 4, 1, 3],
        ],
        '9' => &[
            [4, 3, 1, 3],
            [1, 3, 0, 2],
            [0, 2, 0, 1],
            [0, 1, 1, 0],
            [1, 0, 3, 0],
            [3, 0, 4, 1],
            [4, 1, 4, 5],
            [4, 5, 3, 6],
            [3, 6, 1, 6],
        ],
        '-' => &[[1, 3, 3, 3]],
        '+' => &[[1, 3, 3, 3], [2, 2, 2, 4]],
        '=' => &[[0, 2, 4, 2], [0, 4, 4, 4]],
        '_' => &[[0, 6, 4, 6]],
        '.' => &[[2, 6, 2, 6]],
        ',' => &[[2, 5, 1, 7]],
        ':' => &[[2, 2, 2, 2], [2, 5, 2, 5]],
        '!' => &[[2, 0, 2, 4], [2, 6, 2, 6]],
        '?' => &[
            [0, 1, 1, 0],
            [1, 0, 3, 0],
            [3, 0, 4, 1],
            [4, 1, 4, 2],
            [4, 2, 2, 3],
            [2, 3, 2, 4],
            [2, 6, 2, 6],
        ],
        '/' => &[[4, 0, 0, 6]],
        '%' => &[[4, 0, 0, 6], [1, 1, 1, 1], [3, 5, 3, 5]],
        '\'' => &[[2, 0, 2, 2]],
        '"' => &[[1, 0, 1, 2], [3, 0, 3, 2]],
        '#' => &[[1, 1, 1, 5], [3, 1, 3, 5], [0, 2, 4, 2], [0, 4, 4, 4]],
        '*' => &[[2, 1, 2, 5], [0, 2, 4, 4], [4, 2, 0, 4]],
        '<' => &[[4, 1, 0, 3], [0, 3, 4, 5]],
        '>' => &[[0, 1, 4, 3], [4, 3, 0, 5]],
        '(' => &[[3, 0, 2, 1], [2, 1, 2, 5], [2, 5, 3, 6]],
        ')' => &[[1, 0, 2, 1], [2, 1, 2, 5], [2, 5, 1, 6]],
        '[' => &[[3, 0, 1, 0], [1, 0, 1, 6], [1, 6, 3, 6]],
        ']' => &[[1, 0, 3, 0], [3, 0, 3, 6], [3, 6, 1, 6]],
        _ => return None,
    })
}

/// A positioned stroke produced by [`layout`], in the caller's units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlacedStroke {
    pub p0: [f64; 2],
    pub p1: [f64; 2],
    pub radius: f64,
}

/// Lays out `text` with its first glyph's top left corner at `origin` and
/// capital letters `size` units tall.
///
/// Characters without a glyph advance the pen without drawing. A newline
/// starts a new line below `origin`.
pub fn layout(origin: [f64; 2], size: f64, text: &str) -> impl Iterator<Item = PlacedStroke> + '_ {
    let unit = size / CAP_HEIGHT;
    let mut pen = origin;
    text.chars().flat_map(move |c| {
        let at = pen;
        let strokes: &'static [Stroke] = if c == '\n' {
            pen = [origin[0], pen[1] + LINE_HEIGHT * unit];
            &[]
        } else {
            pen[0] += ADVANCE * unit;
            glyph(c).unwrap_or(&[])
        };
        strokes.iter().map(place(at, unit))
    })
}

fn place(at: [f64; 2], unit: f64) -> impl Fn(&Stroke) -> PlacedStroke {
    move |s| PlacedStroke {
        p0: [at[0] + s[0] as f64 * unit, at[1] + s[1] as f64 * unit],
        p1: [at[0] + s[2] as f64 * unit, at[1] + s[3] as f64 * unit],
        radius: STROKE_RADIUS * unit,
    }
}

// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use bytemuck::{Pod, Zeroable};

use crate::config::{MAX_TILE_INDEX, TILE_SIZE};

/// Screen space axis aligned bounding box in pixels.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// Box which contains nothing and is the identity for [`Aabb::union`].
    pub const EMPTY: Self = Self {
        min: [f32::MAX, f32::MAX],
        max: [f32::MIN, f32::MIN],
    };

    pub fn new(min: [f32; 2], max: [f32; 2]) -> Self {
        Self { min, max }
    }

    /// Box around a circle.
    pub fn from_circle(center: [f32; 2], radius: f32) -> Self {
        Self {
            min: [center[0] - radius, center[1] - radius],
            max: [center[0] + radius, center[1] + radius],
        }
    }

    /// Smallest box containing all `points`.
    pub fn from_points(points: &[[f32; 2]]) -> Self {
        points.iter().fold(Self::EMPTY, |acc, p| acc.union_point(*p))
    }

    pub fn is_empty(&self) -> bool {
        !(self.min[0] <= self.max[0] && self.min[1] <= self.max[1])
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            max: [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
        }
    }

    pub fn union_point(&self, p: [f32; 2]) -> Self {
        Self {
            min: [self.min[0].min(p[0]), self.min[1].min(p[1])],
            max: [self.max[0].max(p[0]), self.max[1].max(p[1])],
        }
    }

    /// Grows the box by `margin` on every side.
    pub fn inflate(&self, margin: f32) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self {
            min: [self.min[0] - margin, self.min[1] - margin],
            max: [self.max[0] + margin, self.max[1] + margin],
        }
    }

    /// Converts the box to inclusive tile indices for a target of
    /// `width` by `height` pixels.
    ///
    /// Returns [`QuantizedAabb::EMPTY`] when the box does not touch the
    /// target at all.
    pub fn quantize(&self, width: u32, height: u32) -> QuantizedAabb {
        if self.is_empty() || width == 0 || height == 0 {
            return QuantizedAabb::EMPTY;
        }
        let (w, h) = (width as f32, height as f32);
        if self.max[0] < 0.0 || self.max[1] < 0.0 || self.min[0] >= w || self.min[1] >= h {
            return QuantizedAabb::EMPTY;
        }
        let last_x = (width - 1) / TILE_SIZE;
        let last_y = (height - 1) / TILE_SIZE;
        let tile = |v: f32, last: u32| -> u8 {
            let t = (v.max(0.0) / TILE_SIZE as f32).floor() as u32;
            t.min(last).min(MAX_TILE_INDEX) as u8
        };
        QuantizedAabb {
            min_x: tile(self.min[0], last_x),
            min_y: tile(self.min[1], last_y),
            max_x: tile(self.max[0], last_x),
            max_y: tile(self.max[1], last_y),
        }
    }
}

/// Per-command bounding box in inclusive tile units.
///
/// This must be kept in sync with `unpack_aabb` in `shader/shared/command.wgsl`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct QuantizedAabb {
    pub min_x: u8,
    pub min_y: u8,
    pub max_x: u8,
    pub max_y: u8,
}

impl Default for QuantizedAabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl QuantizedAabb {
    /// A box that covers no tile.
    pub const EMPTY: Self = Self {
        min_x: 255,
        min_y: 255,
        max_x: 0,
        max_y: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Returns true if tile (`x`, `y`) lies inside the box.
    pub fn contains_tile(&self, x: u32, y: u32) -> bool {
        x >= self.min_x as u32
            && x <= self.max_x as u32
            && y >= self.min_y as u32
            && y <= self.max_y as u32
    }

    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

pub(crate) fn sub(a: [f32; 2], b: [f32; 2]) -> [f32; 2] {
    [a[0] - b[0], a[1] - b[1]]
}

pub(crate) fn dot(a: [f32; 2], b: [f32; 2]) -> f32 {
    a[0] * b[0] + a[1] * b[1]
}

pub(crate) fn length(a: [f32; 2]) -> f32 {
    dot(a, a).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantize_disc() {
        // Disc at (100, 100) with radius 50 inflated by a 2.25 pixel margin.
        let aabb = Aabb::from_circle([100.0, 100.0], 50.0).inflate(2.25);
        let q = aabb.quantize(256, 256);
        assert_eq!(
            q,
            QuantizedAabb {
                min_x: 1,
                min_y: 1,
                max_x: 4,
                max_y: 4
            }
        );
    }

    #[test]
    fn quantize_clamps_to_target() {
        let aabb = Aabb::new([-40.0, -40.0], [5000.0, 70.0]);
        let q = aabb.quantize(100, 100);
        assert_eq!(
            q,
            QuantizedAabb {
                min_x: 0,
                min_y: 0,
                max_x: 3,
                max_y: 2
            }
        );
    }

    #[test]
    fn quantize_offscreen_is_empty() {
        assert!(Aabb::new([-50.0, 0.0], [-1.0, 10.0])
            .quantize(100, 100)
            .is_empty());
        assert!(Aabb::new([100.0, 0.0], [150.0, 10.0])
            .quantize(100, 100)
            .is_empty());
        assert!(Aabb::EMPTY.quantize(100, 100).is_empty());
    }

    #[test]
    fn quantize_clamps_to_byte_range() {
        let aabb = Aabb::new([9000.0, 0.0], [9500.0, 10.0]);
        let q = aabb.quantize(10000, 64);
        assert_eq!((q.min_x, q.max_x), (255, 255));
    }

    #[test]
    fn quantized_union_ignores_empty() {
        let a = QuantizedAabb {
            min_x: 2,
            min_y: 3,
            max_x: 4,
            max_y: 5,
        };
        assert_eq!(a.union(&QuantizedAabb::EMPTY), a);
        assert_eq!(QuantizedAabb::EMPTY.union(&a), a);
    }
}

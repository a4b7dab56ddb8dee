// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use bytemuck::{Pod, Zeroable};
use peniko::Color;

use crate::math::{dot, length, sub, Aabb};

/// Kind of a draw command.
///
/// Shape kinds are drawable. The combination kinds are markers which bracket
/// a run of commands blended into one shape.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PrimitiveKind {
    Disc = 0,
    OrientedBox = 1,
    Ellipse = 2,
    Triangle = 3,
    Pie = 4,
    Arc = 5,
    UnevenCapsule = 6,
    Trapezoid = 7,
    Box = 8,
    CombinationBegin = 14,
    CombinationEnd = 15,
}

impl PrimitiveKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Disc,
            1 => Self::OrientedBox,
            2 => Self::Ellipse,
            3 => Self::Triangle,
            4 => Self::Pie,
            5 => Self::Arc,
            6 => Self::UnevenCapsule,
            7 => Self::Trapezoid,
            8 => Self::Box,
            14 => Self::CombinationBegin,
            15 => Self::CombinationEnd,
            _ => return None,
        })
    }

    /// Returns true for the combination markers.
    pub fn is_marker(self) -> bool {
        matches!(self, Self::CombinationBegin | Self::CombinationEnd)
    }

    /// Number of `f32` payload values the command carries.
    pub fn payload_len(self) -> usize {
        match self {
            Self::Disc => 3,
            Self::OrientedBox => 6,
            Self::Ellipse => 5,
            Self::Triangle => 7,
            Self::Pie => 6,
            Self::Arc => 7,
            Self::UnevenCapsule => 6,
            Self::Trapezoid => 6,
            Self::Box => 5,
            Self::CombinationBegin => 2,
            Self::CombinationEnd => 1,
        }
    }
}

/// How a shape's distance turns into coverage.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FillMode {
    /// Filled interior.
    #[default]
    Solid = 0,
    /// Filled interior plus an outline band in the outline color.
    Outline = 1,
    /// Only the outline band, in the shape color.
    Hollow = 2,
}

impl FillMode {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Solid,
            1 => Self::Outline,
            2 => Self::Hollow,
            _ => return None,
        })
    }
}

/// How a shape inside a combination merges with the rest of the group.
///
/// Outside a combination the operator has no effect and shapes are
/// composited on top of each other.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SdfOperator {
    /// Smooth union which keeps the color of the later shape inside it.
    Add = 0,
    /// Smooth union with colors blended across the seam.
    #[default]
    Union = 1,
    /// Carves the shape out of the earlier shapes of the group.
    Subtraction = 2,
    /// Keeps only the part of the earlier shapes inside this one.
    Overlap = 3,
}

impl SdfOperator {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Add,
            1 => Self::Union,
            2 => Self::Subtraction,
            3 => Self::Overlap,
            _ => return None,
        })
    }
}

/// Tagged form of the packed `tag` byte of a [`DrawCommand`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommandTag {
    pub kind: PrimitiveKind,
    pub fill: FillMode,
}

impl CommandTag {
    pub const FILL_SHIFT: u32 = 4;

    pub fn new(kind: PrimitiveKind, fill: FillMode) -> Self {
        Self { kind, fill }
    }

    pub fn pack(self) -> u8 {
        self.kind as u8 | ((self.fill as u8) << Self::FILL_SHIFT)
    }

    pub fn unpack(byte: u8) -> Option<Self> {
        Some(Self {
            kind: PrimitiveKind::from_u8(byte & 0xf)?,
            fill: FillMode::from_u8((byte >> Self::FILL_SHIFT) & 0x3)?,
        })
    }
}

/// Bit of `custom_data` on a combination end which requests an outline.
pub const COMBINATION_OUTLINE: u8 = 1;

/// A draw command as consumed by the binning and raster shaders.
///
/// This must be kept in sync with the struct in `shader/shared/command.wgsl`
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
#[repr(C)]
pub struct DrawCommand {
    /// Primitive kind in the low nibble, fill mode in bits 4 and 5.
    pub tag: u8,
    /// Index of the clip rectangle active at emission.
    pub clip_index: u8,
    /// [`SdfOperator`] of the command.
    pub op: u8,
    /// Kind specific flags.
    pub custom_data: u8,
    /// Packed premultiplied RGBA color, red in the low byte.
    pub color: u32,
    /// Index of the first payload value in the draw data stream.
    pub data_index: u32,
}

impl DrawCommand {
    /// Decodes the tag byte.
    pub fn tag(&self) -> Option<CommandTag> {
        CommandTag::unpack(self.tag)
    }

    pub fn kind(&self) -> Option<PrimitiveKind> {
        PrimitiveKind::from_u8(self.tag & 0xf)
    }

    pub fn op(&self) -> Option<SdfOperator> {
        SdfOperator::from_u8(self.op)
    }

    /// Payload of the command inside `draw_data`.
    pub fn payload<'a>(&self, draw_data: &'a [f32]) -> Option<&'a [f32]> {
        let len = self.kind()?.payload_len();
        let start = self.data_index as usize;
        draw_data.get(start..start + len)
    }
}

/// Clip rectangle in screen pixels.
///
/// This must be kept in sync with the struct in `shader/shared/command.wgsl`
#[derive(Copy, Clone, Debug, Default, PartialEq, Zeroable, Pod)]
#[repr(C)]
pub struct ClipRect {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

impl ClipRect {
    pub fn new(min: [f32; 2], max: [f32; 2]) -> Self {
        Self { min, max }
    }

    /// Returns true if the rectangle overlaps the pixel range
    /// `[x0, x1) x [y0, y1)`.
    pub fn overlaps(&self, x0: f32, y0: f32, x1: f32, y1: f32) -> bool {
        self.max[0] > x0 && self.min[0] < x1 && self.max[1] > y0 && self.min[1] < y1
    }

    pub fn contains(&self, p: [f32; 2]) -> bool {
        p[0] >= self.min[0] && p[0] < self.max[0] && p[1] >= self.min[1] && p[1] < self.max[1]
    }
}

/// Packs a color into the wire representation.
pub fn pack_color(color: Color) -> u32 {
    color.premultiply().to_rgba8().to_u32()
}

/// A drawable shape in screen space.
///
/// Angles are in radians. Apertures are half angles measured from
/// `direction`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Shape {
    Disc {
        center: [f32; 2],
        radius: f32,
    },
    /// Box spanning the segment `p0`..`p1` with the given full `width`.
    OrientedBox {
        p0: [f32; 2],
        p1: [f32; 2],
        width: f32,
        roundness: f32,
    },
    /// Ellipse whose major axis is the segment `p0`..`p1`, with the given
    /// full minor axis `width`.
    Ellipse {
        p0: [f32; 2],
        p1: [f32; 2],
        width: f32,
    },
    Triangle {
        p0: [f32; 2],
        p1: [f32; 2],
        p2: [f32; 2],
        roundness: f32,
    },
    Pie {
        center: [f32; 2],
        direction: [f32; 2],
        radius: f32,
        aperture: f32,
    },
    Arc {
        center: [f32; 2],
        direction: [f32; 2],
        radius: f32,
        aperture: f32,
        thickness: f32,
    },
    UnevenCapsule {
        p0: [f32; 2],
        p1: [f32; 2],
        r0: f32,
        r1: f32,
    },
    /// Isosceles trapezoid along `p0`..`p1` with half widths `r0` and `r1`.
    Trapezoid {
        p0: [f32; 2],
        p1: [f32; 2],
        r0: f32,
        r1: f32,
    },
    Box {
        min: [f32; 2],
        max: [f32; 2],
        roundness: f32,
    },
}

/// Longest payload of any shape.
pub const MAX_SHAPE_PAYLOAD: usize = 7;

impl Shape {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Self::Disc { .. } => PrimitiveKind::Disc,
            Self::OrientedBox { .. } => PrimitiveKind::OrientedBox,
            Self::Ellipse { .. } => PrimitiveKind::Ellipse,
            Self::Triangle { .. } => PrimitiveKind::Triangle,
            Self::Pie { .. } => PrimitiveKind::Pie,
            Self::Arc { .. } => PrimitiveKind::Arc,
            Self::UnevenCapsule { .. } => PrimitiveKind::UnevenCapsule,
            Self::Trapezoid { .. } => PrimitiveKind::Trapezoid,
            Self::Box { .. } => PrimitiveKind::Box,
        }
    }

    /// Writes the payload into `out` and returns its length.
    pub fn encode(&self, out: &mut [f32; MAX_SHAPE_PAYLOAD]) -> usize {
        match *self {
            Self::Disc { center, radius } => put(out, &[center[0], center[1], radius]),
            Self::OrientedBox {
                p0,
                p1,
                width,
                roundness,
            } => put(out, &[p0[0], p0[1], p1[0], p1[1], width, roundness]),
            Self::Ellipse { p0, p1, width } => put(out, &[p0[0], p0[1], p1[0], p1[1], width]),
            Self::Triangle {
                p0,
                p1,
                p2,
                roundness,
            } => put(out, &[p0[0], p0[1], p1[0], p1[1], p2[0], p2[1], roundness]),
            Self::Pie {
                center,
                direction,
                radius,
                aperture,
            } => put(
                out,
                &[
                    center[0],
                    center[1],
                    direction[0],
                    direction[1],
                    radius,
                    aperture,
                ],
            ),
            Self::Arc {
                center,
                direction,
                radius,
                aperture,
                thickness,
            } => put(
                out,
                &[
                    center[0],
                    center[1],
                    direction[0],
                    direction[1],
                    radius,
                    aperture,
                    thickness,
                ],
            ),
            Self::UnevenCapsule { p0, p1, r0, r1 } | Self::Trapezoid { p0, p1, r0, r1 } => {
                put(out, &[p0[0], p0[1], p1[0], p1[1], r0, r1])
            }
            Self::Box {
                min,
                max,
                roundness,
            } => put(out, &[min[0], min[1], max[0], max[1], roundness]),
        }
    }

    /// Rebuilds a shape from its kind and payload.
    ///
    /// Returns `None` for markers and for short payloads.
    pub fn decode(kind: PrimitiveKind, data: &[f32]) -> Option<Self> {
        if data.len() < kind.payload_len() {
            return None;
        }
        let p = |i: usize| [data[i], data[i + 1]];
        Some(match kind {
            PrimitiveKind::Disc => Self::Disc {
                center: p(0),
                radius: data[2],
            },
            PrimitiveKind::OrientedBox => Self::OrientedBox {
                p0: p(0),
                p1: p(2),
                width: data[4],
                roundness: data[5],
            },
            PrimitiveKind::Ellipse => Self::Ellipse {
                p0: p(0),
                p1: p(2),
                width: data[4],
            },
            PrimitiveKind::Triangle => Self::Triangle {
                p0: p(0),
                p1: p(2),
                p2: p(4),
                roundness: data[6],
            },
            PrimitiveKind::Pie => Self::Pie {
                center: p(0),
                direction: p(2),
                radius: data[4],
                aperture: data[5],
            },
            PrimitiveKind::Arc => Self::Arc {
                center: p(0),
                direction: p(2),
                radius: data[4],
                aperture: data[5],
                thickness: data[6],
            },
            PrimitiveKind::UnevenCapsule => Self::UnevenCapsule {
                p0: p(0),
                p1: p(2),
                r0: data[4],
                r1: data[5],
            },
            PrimitiveKind::Trapezoid => Self::Trapezoid {
                p0: p(0),
                p1: p(2),
                r0: data[4],
                r1: data[5],
            },
            PrimitiveKind::Box => Self::Box {
                min: p(0),
                max: p(2),
                roundness: data[4],
            },
            PrimitiveKind::CombinationBegin | PrimitiveKind::CombinationEnd => return None,
        })
    }

    /// Checks the shape for degeneracies and clamps its parameters into
    /// range.
    ///
    /// Returns `None` if the shape has no area, which happens routinely
    /// while a shape is being dragged out.
    pub fn normalized(self) -> Option<Self> {
        const EPSILON: f32 = 1e-4;
        let finite = |v: &[f32]| v.iter().all(|x| x.is_finite());
        let mut payload = [0.0; MAX_SHAPE_PAYLOAD];
        let len = self.encode(&mut payload);
        if !finite(&payload[..len]) {
            return None;
        }
        match self {
            Self::Disc { radius, .. } => (radius > EPSILON).then_some(self),
            Self::OrientedBox {
                p0,
                p1,
                width,
                roundness,
            } => {
                let l = length(sub(p1, p0));
                if l <= EPSILON || width <= EPSILON {
                    return None;
                }
                Some(Self::OrientedBox {
                    p0,
                    p1,
                    width,
                    roundness: roundness.clamp(0.0, 0.5 * l.min(width)),
                })
            }
            Self::Ellipse { p0, p1, width } => {
                (length(sub(p1, p0)) > EPSILON && width > EPSILON).then_some(self)
            }
            Self::Triangle {
                p0,
                p1,
                p2,
                roundness,
            } => {
                let e0 = sub(p1, p0);
                let e1 = sub(p2, p0);
                let area = (e0[0] * e1[1] - e0[1] * e1[0]).abs();
                (area > EPSILON).then_some(Self::Triangle {
                    p0,
                    p1,
                    p2,
                    roundness: roundness.max(0.0),
                })
            }
            Self::Pie {
                center,
                direction,
                radius,
                aperture,
            } => {
                let direction = normalize(direction)?;
                if radius <= EPSILON || aperture <= EPSILON {
                    return None;
                }
                Some(Self::Pie {
                    center,
                    direction,
                    radius,
                    aperture: aperture.min(std::f32::consts::PI),
                })
            }
            Self::Arc {
                center,
                direction,
                radius,
                aperture,
                thickness,
            } => {
                let direction = normalize(direction)?;
                if radius <= EPSILON || aperture <= EPSILON || thickness <= EPSILON {
                    return None;
                }
                Some(Self::Arc {
                    center,
                    direction,
                    radius,
                    aperture: aperture.min(std::f32::consts::PI),
                    thickness,
                })
            }
            Self::UnevenCapsule { p0, p1, r0, r1 } => {
                let (r0, r1) = (r0.max(0.0), r1.max(0.0));
                if r0.max(r1) <= EPSILON {
                    return None;
                }
                let h = length(sub(p1, p0));
                // One end disc swallows the other.
                if h <= (r0 - r1).abs() + EPSILON {
                    return Some(if r0 >= r1 {
                        Self::Disc {
                            center: p0,
                            radius: r0,
                        }
                    } else {
                        Self::Disc {
                            center: p1,
                            radius: r1,
                        }
                    });
                }
                Some(Self::UnevenCapsule { p0, p1, r0, r1 })
            }
            Self::Trapezoid { p0, p1, r0, r1 } => {
                let (r0, r1) = (r0.max(0.0), r1.max(0.0));
                if length(sub(p1, p0)) <= EPSILON || r0.max(r1) <= EPSILON {
                    return None;
                }
                Some(Self::Trapezoid { p0, p1, r0, r1 })
            }
            Self::Box {
                min,
                max,
                roundness,
            } => {
                let min2 = [min[0].min(max[0]), min[1].min(max[1])];
                let max2 = [min[0].max(max[0]), min[1].max(max[1])];
                let extent = (max2[0] - min2[0]).min(max2[1] - min2[1]);
                (extent > EPSILON).then_some(Self::Box {
                    min: min2,
                    max: max2,
                    roundness: roundness.clamp(0.0, 0.5 * extent),
                })
            }
        }
    }

    /// Exact bounds of the shape's interior, without any margin.
    pub fn bounds(&self) -> Aabb {
        match *self {
            Self::Disc { center, radius } => Aabb::from_circle(center, radius),
            Self::OrientedBox { p0, p1, width, .. } => {
                let d = sub(p1, p0);
                let l = length(d);
                let half = 0.5 * width / l;
                let n = [-d[1] * half, d[0] * half];
                Aabb::from_points(&[
                    [p0[0] + n[0], p0[1] + n[1]],
                    [p0[0] - n[0], p0[1] - n[1]],
                    [p1[0] + n[0], p1[1] + n[1]],
                    [p1[0] - n[0], p1[1] - n[1]],
                ])
            }
            Self::Ellipse { p0, p1, width } => {
                let d = sub(p1, p0);
                let l = length(d);
                let (a, b) = (0.5 * l, 0.5 * width);
                let (cos, sin) = (d[0] / l, d[1] / l);
                let ex = (a * a * cos * cos + b * b * sin * sin).sqrt();
                let ey = (a * a * sin * sin + b * b * cos * cos).sqrt();
                let c = [0.5 * (p0[0] + p1[0]), 0.5 * (p0[1] + p1[1])];
                Aabb::new([c[0] - ex, c[1] - ey], [c[0] + ex, c[1] + ey])
            }
            Self::Triangle {
                p0,
                p1,
                p2,
                roundness,
            } => Aabb::from_points(&[p0, p1, p2]).inflate(roundness),
            Self::Pie { center, radius, .. } => Aabb::from_circle(center, radius),
            Self::Arc {
                center,
                radius,
                thickness,
                ..
            } => Aabb::from_circle(center, radius + 0.5 * thickness),
            Self::UnevenCapsule { p0, p1, r0, r1 } | Self::Trapezoid { p0, p1, r0, r1 } => {
                Aabb::from_circle(p0, r0).union(&Aabb::from_circle(p1, r1))
            }
            Self::Box { min, max, .. } => Aabb::new(min, max),
        }
    }
}

fn put(out: &mut [f32; MAX_SHAPE_PAYLOAD], values: &[f32]) -> usize {
    out[..values.len()].copy_from_slice(values);
    values.len()
}

fn normalize(v: [f32; 2]) -> Option<[f32; 2]> {
    let l = dot(v, v).sqrt();
    (l > 1e-6).then(|| [v[0] / l, v[1] / l])
}

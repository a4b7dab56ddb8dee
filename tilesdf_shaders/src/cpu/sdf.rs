// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Signed distance functions of `shader/shared/sdf.wgsl`.

use tilesdf_encoding::PrimitiveKind;

use super::util::{mix, sign, Vec2};

/// Distance used for "infinitely far away".
pub const BIG: f32 = 1e9;

pub fn sd_disc(p: Vec2, center: Vec2, radius: f32) -> f32 {
    (p - center).length() - radius
}

pub fn sd_oriented_box(p: Vec2, a: Vec2, b: Vec2, width: f32, roundness: f32) -> f32 {
    let l = (b - a).length();
    let d = (b - a) / l;
    let c = p - 0.5 * (a + b);
    let local = Vec2::new(d.x * c.x + d.y * c.y, d.x * c.y - d.y * c.x);
    let q = (local.abs() - 0.5 * Vec2::new(l, width)).add_scalar(roundness);
    q.max(Vec2::ZERO).length() + q.x.max(q.y).min(0.0) - roundness
}

pub fn sd_ellipse(p: Vec2, a: Vec2, b: Vec2, width: f32) -> f32 {
    let l = (b - a).length();
    let d = (b - a) / l;
    let c = p - 0.5 * (a + b);
    let q = Vec2::new(c.dot(d), d.cross(c));
    let ab = Vec2::new(0.5 * l, 0.5 * width);
    let k1 = q.div_by(ab.scale(ab)).length();
    if k1 < 1e-6 {
        return -ab.x.min(ab.y);
    }
    let k0 = q.div_by(ab).length();
    k0 * (k0 - 1.0) / k1
}

pub fn sd_triangle(p: Vec2, p0: Vec2, p1: Vec2, p2: Vec2, roundness: f32) -> f32 {
    let e0 = p1 - p0;
    let e1 = p2 - p1;
    let e2 = p0 - p2;
    let v0 = p - p0;
    let v1 = p - p1;
    let v2 = p - p2;
    let pq0 = v0 - e0 * (v0.dot(e0) / e0.dot(e0)).clamp(0.0, 1.0);
    let pq1 = v1 - e1 * (v1.dot(e1) / e1.dot(e1)).clamp(0.0, 1.0);
    let pq2 = v2 - e2 * (v2.dot(e2) / e2.dot(e2)).clamp(0.0, 1.0);
    let s = sign(e0.cross(e2));
    let d = Vec2::new(pq0.dot(pq0), s * v0.cross(e0))
        .min(Vec2::new(pq1.dot(pq1), s * v1.cross(e1)))
        .min(Vec2::new(pq2.dot(pq2), s * v2.cross(e2)));
    -d.x.sqrt() * sign(d.y) - roundness
}

fn sector_local(p: Vec2, center: Vec2, direction: Vec2) -> Vec2 {
    let c = p - center;
    Vec2::new(direction.cross(c).abs(), c.dot(direction))
}

pub fn sd_pie(p: Vec2, center: Vec2, direction: Vec2, radius: f32, aperture: f32) -> f32 {
    let q = sector_local(p, center, direction);
    let sc = Vec2::new(aperture.sin(), aperture.cos());
    let l = q.length() - radius;
    let m = (q - sc * q.dot(sc).clamp(0.0, radius)).length();
    l.max(m * sign(sc.y * q.x - sc.x * q.y))
}

pub fn sd_arc(
    p: Vec2,
    center: Vec2,
    direction: Vec2,
    radius: f32,
    aperture: f32,
    thickness: f32,
) -> f32 {
    let q = sector_local(p, center, direction);
    let sc = Vec2::new(aperture.sin(), aperture.cos());
    let d = if sc.y * q.x > sc.x * q.y {
        (q - sc * radius).length()
    } else {
        (q.length() - radius).abs()
    };
    d - 0.5 * thickness
}

pub fn sd_uneven_capsule(p: Vec2, pa: Vec2, pb: Vec2, ra: f32, rb: f32) -> f32 {
    let v = p - pa;
    let ba = pb - pa;
    let h = ba.dot(ba);
    let mut q = Vec2::new(v.dot(Vec2::new(ba.y, -ba.x)), v.dot(ba)) / h;
    q.x = q.x.abs();
    let b = ra - rb;
    let c = Vec2::new((h - b * b).max(0.0).sqrt(), b);
    let k = c.cross(q);
    let m = c.dot(q);
    let n = q.dot(q);
    if k < 0.0 {
        (h * n).sqrt() - ra
    } else if k > c.x {
        (h * (n + 1.0 - 2.0 * q.y)).sqrt() - rb
    } else {
        m - ra
    }
}

pub fn sd_trapezoid(p: Vec2, a: Vec2, b: Vec2, ra: f32, rb: f32) -> f32 {
    let rba = rb - ra;
    let baba = (b - a).dot(b - a);
    let papa = (p - a).dot(p - a);
    let paba = (p - a).dot(b - a) / baba;
    let x = (papa - paba * paba * baba).max(0.0).sqrt();
    let cax = (x - if paba < 0.5 { ra } else { rb }).max(0.0);
    let cay = (paba - 0.5).abs() - 0.5;
    let k = rba * rba + baba;
    let f = ((rba * (x - ra) + paba * baba) / k).clamp(0.0, 1.0);
    let cbx = x - ra - f * rba;
    let cby = paba - f;
    let s = if cbx < 0.0 && cay < 0.0 { -1.0 } else { 1.0 };
    s * (cax * cax + cay * cay * baba)
        .min(cbx * cbx + cby * cby * baba)
        .sqrt()
}

pub fn sd_box(p: Vec2, bmin: Vec2, bmax: Vec2, roundness: f32) -> f32 {
    let q = ((p - 0.5 * (bmin + bmax)).abs() - 0.5 * (bmax - bmin)).add_scalar(roundness);
    q.max(Vec2::ZERO).length() + q.x.max(q.y).min(0.0) - roundness
}

/// Polynomial smooth minimum of `a` and `b` with radius `k`.
///
/// Returns the distance and the weight of `a`, for blending attributes.
pub fn smooth_min(a: f32, b: f32, k: f32) -> (f32, f32) {
    let kk = k.max(1e-4);
    let h = (0.5 + 0.5 * (b - a) / kk).clamp(0.0, 1.0);
    (mix(b, a, h) - kk * h * (1.0 - h), h)
}

pub fn smooth_max(a: f32, b: f32, k: f32) -> f32 {
    -smooth_min(-a, -b, k).0
}

/// Evaluates the distance of a shape from its kind and payload.
///
/// Markers and short payloads evaluate to [`BIG`].
pub fn eval(kind: PrimitiveKind, data: &[f32], p: Vec2) -> f32 {
    if data.len() < kind.payload_len() {
        return BIG;
    }
    let pt = |i: usize| Vec2::new(data[i], data[i + 1]);
    match kind {
        PrimitiveKind::Disc => sd_disc(p, pt(0), data[2]),
        PrimitiveKind::OrientedBox => sd_oriented_box(p, pt(0), pt(2), data[4], data[5]),
        PrimitiveKind::Ellipse => sd_ellipse(p, pt(0), pt(2), data[4]),
        PrimitiveKind::Triangle => sd_triangle(p, pt(0), pt(2), pt(4), data[6]),
        PrimitiveKind::Pie => sd_pie(p, pt(0), pt(2), data[4], data[5]),
        PrimitiveKind::Arc => sd_arc(p, pt(0), pt(2), data[4], data[5], data[6]),
        PrimitiveKind::UnevenCapsule => sd_uneven_capsule(p, pt(0), pt(2), data[4], data[5]),
        PrimitiveKind::Trapezoid => sd_trapezoid(p, pt(0), pt(2), data[4], data[5]),
        PrimitiveKind::Box => sd_box(p, pt(0), pt(2), data[4]),
        PrimitiveKind::CombinationBegin | PrimitiveKind::CombinationEnd => BIG,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> Vec2 {
        Vec2::new(x, y)
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn disc_distance() {
        assert!(close(sd_disc(v(3.0, 4.0), v(0.0, 0.0), 2.0), 3.0));
        assert!(close(sd_disc(v(0.0, 0.0), v(0.0, 0.0), 2.0), -2.0));
    }

    #[test]
    fn box_distance() {
        let (min, max) = (v(0.0, 0.0), v(10.0, 4.0));
        assert!(close(sd_box(v(5.0, 2.0), min, max, 0.0), -2.0));
        assert!(close(sd_box(v(13.0, 2.0), min, max, 0.0), 3.0));
        assert!(close(sd_box(v(13.0, 8.0), min, max, 0.0), 5.0));
        // Roundness pulls the corners in.
        assert!(sd_box(v(10.0, 4.0), min, max, 1.0) > 0.0);
    }

    #[test]
    fn oriented_box_matches_axis_aligned_box() {
        let a = v(0.0, 5.0);
        let b = v(20.0, 5.0);
        for p in [v(3.0, 1.0), v(25.0, 9.0), v(10.0, 5.0), v(-4.0, 0.0)] {
            let expected = sd_box(p, v(0.0, 0.0), v(20.0, 10.0), 0.0);
            assert!(close(sd_oriented_box(p, a, b, 10.0, 0.0), expected));
        }
    }

    #[test]
    fn ellipse_sign() {
        let (a, b) = (v(-10.0, 0.0), v(10.0, 0.0));
        assert!(sd_ellipse(v(0.0, 0.0), a, b, 6.0) < 0.0);
        assert!(sd_ellipse(v(9.0, 0.0), a, b, 6.0) < 0.0);
        assert!(sd_ellipse(v(0.0, 4.0), a, b, 6.0) > 0.0);
        assert!(close(sd_ellipse(v(12.0, 0.0), a, b, 6.0), 2.0));
    }

    #[test]
    fn triangle_distance() {
        let (p0, p1, p2) = (v(0.0, 0.0), v(10.0, 0.0), v(0.0, 10.0));
        assert!(sd_triangle(v(2.0, 2.0), p0, p1, p2, 0.0) < 0.0);
        assert!(close(sd_triangle(v(5.0, -3.0), p0, p1, p2, 0.0), 3.0));
        // Winding does not matter.
        assert!(close(sd_triangle(v(5.0, -3.0), p0, p2, p1, 0.0), 3.0));
        assert!(close(sd_triangle(v(5.0, -3.0), p0, p1, p2, 1.0), 2.0));
    }

    #[test]
    fn pie_opens_around_direction() {
        let c = v(0.0, 0.0);
        let dir = v(1.0, 0.0);
        let quarter = std::f32::consts::FRAC_PI_4;
        assert!(sd_pie(v(5.0, 0.0), c, dir, 10.0, quarter) < 0.0);
        assert!(sd_pie(v(-5.0, 0.0), c, dir, 10.0, quarter) > 0.0);
        assert!(sd_pie(v(0.0, 5.0), c, dir, 10.0, quarter) > 0.0);
        assert!(close(sd_pie(v(12.0, 0.0), c, dir, 10.0, quarter), 2.0));
    }

    #[test]
    fn arc_band() {
        let c = v(0.0, 0.0);
        let dir = v(0.0, -1.0);
        let aperture = 1.0;
        assert!(close(sd_arc(v(0.0, -10.0), c, dir, 10.0, aperture, 2.0), -1.0));
        assert!(close(sd_arc(v(0.0, -14.0), c, dir, 10.0, aperture, 2.0), 3.0));
        // Opposite side of the circle is outside the arc.
        assert!(sd_arc(v(0.0, 10.0), c, dir, 10.0, aperture, 2.0) > 5.0);
    }

    #[test]
    fn capsule_ends() {
        let (a, b) = (v(0.0, 0.0), v(20.0, 0.0));
        assert!(close(sd_uneven_capsule(v(-6.0, 0.0), a, b, 4.0, 2.0), 2.0));
        assert!(close(sd_uneven_capsule(v(25.0, 0.0), a, b, 4.0, 2.0), 3.0));
        assert!(sd_uneven_capsule(v(10.0, 0.0), a, b, 4.0, 2.0) < 0.0);
        // Equal radii give a plain capsule.
        assert!(close(sd_uneven_capsule(v(10.0, 7.0), a, b, 3.0, 3.0), 4.0));
    }

    #[test]
    fn trapezoid_distance() {
        let (a, b) = (v(0.0, 0.0), v(0.0, 10.0));
        assert!(sd_trapezoid(v(0.0, 5.0), a, b, 4.0, 2.0) < 0.0);
        assert!(close(sd_trapezoid(v(0.0, -3.0), a, b, 4.0, 2.0), 3.0));
        assert!(close(sd_trapezoid(v(0.0, 12.0), a, b, 4.0, 2.0), 2.0));
    }

    #[test]
    fn smooth_min_limits() {
        let (d, h) = smooth_min(1.0, 5.0, 0.0);
        assert!(close(d, 1.0));
        assert_eq!(h, 1.0);
        let (d, h) = smooth_min(BIG, 3.0, 2.0);
        assert!(close(d, 3.0));
        assert_eq!(h, 0.0);
        // Equal inputs dip below both.
        let (d, h) = smooth_min(1.0, 1.0, 2.0);
        assert!(close(d, 0.5));
        assert_eq!(h, 0.5);
        assert!(close(smooth_max(-BIG, 2.0, 1.0), 2.0));
    }
}

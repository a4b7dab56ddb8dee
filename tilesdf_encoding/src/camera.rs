// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use peniko::kurbo::{Affine, Point, Rect, Vec2};

/// Camera position and zoom, applied before the projection.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Camera {
    /// World point that maps to the projection origin.
    pub position: Point,
    /// Uniform zoom factor.
    pub scale: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Point::ORIGIN,
            scale: 1.0,
        }
    }
}

/// Maps world space authoring coordinates to target pixels.
///
/// The projection fits a world box into the target while preserving the
/// aspect ratio, growing the box along the axis which would otherwise leave
/// the target partly uncovered. By default the world box is the target
/// itself, so world units are pixels.
#[derive(Clone, Debug)]
pub struct Viewport {
    width: u32,
    height: u32,
    world_box: Option<Rect>,
    camera: Camera,
    projection: Affine,
    projection_scale: f64,
    world_to_screen: Affine,
    screen_to_world: Affine,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        let mut viewport = Self {
            width,
            height,
            world_box: None,
            camera: Camera::default(),
            projection: Affine::IDENTITY,
            projection_scale: 1.0,
            world_to_screen: Affine::IDENTITY,
            screen_to_world: Affine::IDENTITY,
        };
        viewport.update();
        viewport
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    /// Sets the target size in pixels.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.update();
    }

    /// Sets the world box fitted into the target, or `None` for a one to
    /// one pixel mapping.
    pub fn set_world_box(&mut self, world_box: Option<Rect>) {
        self.world_box = world_box.filter(|r| r.width() > 0.0 && r.height() > 0.0);
        self.update();
    }

    /// Sets the camera. Non-positive or non-finite scales are ignored.
    pub fn set_camera(&mut self, position: Point, scale: f64) {
        if !(scale.is_finite() && scale > 0.0 && position.is_finite()) {
            log::debug!("ignoring invalid camera {position:?} x {scale}");
            return;
        }
        self.camera = Camera { position, scale };
        self.update();
    }

    pub fn reset_camera(&mut self) {
        self.camera = Camera::default();
        self.update();
    }

    /// Full world to screen transform.
    pub fn transform(&self) -> Affine {
        self.world_to_screen
    }

    pub fn world_to_screen(&self, p: Point) -> Point {
        self.world_to_screen * p
    }

    pub fn screen_to_world(&self, p: Point) -> Point {
        self.screen_to_world * p
    }

    /// Factor applied to scalar lengths such as radii and widths.
    pub fn radius_scale(&self) -> f64 {
        self.projection_scale * self.camera.scale
    }

    /// Screen point in the form stored in the draw data.
    pub fn to_screen(&self, p: Point) -> [f32; 2] {
        let s = self.world_to_screen(p);
        [s.x as f32, s.y as f32]
    }

    /// Screen length in the form stored in the draw data.
    pub fn scale_length(&self, length: f64) -> f32 {
        (length * self.radius_scale()) as f32
    }

    /// Screen direction of a world direction. Only valid because the
    /// transform never rotates or shears.
    pub fn to_screen_direction(&self, v: Vec2) -> [f32; 2] {
        [v.x as f32, v.y as f32]
    }

    fn update(&mut self) {
        let target = Rect::new(0.0, 0.0, self.width as f64, self.height as f64);
        let (projection, scale) = match self.world_box {
            Some(world) if target.width() > 0.0 && target.height() > 0.0 => {
                let scale = (target.width() / world.width()).min(target.height() / world.height());
                let projection = Affine::translate(target.center().to_vec2())
                    * Affine::scale(scale)
                    * Affine::translate(-world.center().to_vec2());
                (projection, scale)
            }
            _ => (Affine::IDENTITY, 1.0),
        };
        self.projection = projection;
        self.projection_scale = scale;
        self.world_to_screen = self.projection
            * Affine::scale(self.camera.scale)
            * Affine::translate(-self.camera.position.to_vec2());
        self.screen_to_world = self.world_to_screen.inverse();
    }
}

// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use peniko::kurbo::{Point, Rect, Vec2};
use peniko::Color;

use crate::{
    font, pack_color, tiles_for, Aabb, Arena, Capacities, CapacityError, ClipRect, CommandTag,
    ConfigUniform, DrawCommand, FillMode, PrimitiveKind, QuantizedAabb, SdfOperator, Shape,
    Viewport, COMBINATION_OUTLINE, DEFAULT_AA_WIDTH, DEFAULT_OUTLINE_WIDTH, MAX_SHAPE_PAYLOAD,
    MAX_TILE_INDEX, TILE_SIZE,
};

/// Color, fill mode and operator of a draw call.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Paint {
    pub color: Color,
    pub fill: FillMode,
    pub op: SdfOperator,
}

impl Paint {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            fill: FillMode::Solid,
            op: SdfOperator::Union,
        }
    }

    pub fn with_fill(mut self, fill: FillMode) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_op(mut self, op: SdfOperator) -> Self {
        self.op = op;
        self
    }
}

impl From<Color> for Paint {
    fn from(color: Color) -> Self {
        Self::new(color)
    }
}

/// Colors which apply to the whole frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RenderParams {
    /// Color of pixels not covered by any shape.
    pub background: Color,
    /// Color of outline bands of [`FillMode::Outline`] shapes and of
    /// outlined combinations.
    pub outline_color: Color,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            background: Color::from_rgb8(0x1e, 0x1e, 0x24),
            outline_color: Color::WHITE,
        }
    }
}

/// Usage counters of the command stream.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Commands in the current frame.
    pub commands: u32,
    /// Highest command count of any frame so far.
    pub peak_commands: u32,
    /// Draw data values in the current frame.
    pub draw_data: u32,
    /// Highest draw data count of any frame so far.
    pub peak_draw_data: u32,
    /// Clip rectangles in the current frame.
    pub clips: u32,
    /// Draw calls dropped this frame because a buffer was full.
    pub dropped_commands: u32,
    /// Exhaustion warnings logged this frame.
    pub warnings: u32,
}

/// Borrowed view of a sealed frame, in the layout the GPU consumes.
#[derive(Copy, Clone, Debug)]
pub struct FrameData<'a> {
    pub commands: &'a [DrawCommand],
    pub draw_data: &'a [f32],
    pub aabbs: &'a [QuantizedAabb],
    pub clips: &'a [ClipRect],
}

#[derive(Clone, Debug)]
struct OpenCombination {
    /// Index of the begin marker, `None` if it could not be emitted.
    begin: Option<u32>,
    /// Smoothness in pixels.
    smoothness: f32,
    /// Union of the children's bounds, including margins.
    bounds: Aabb,
}

/// Builds the per-frame command, draw data, bounding box and clip streams.
///
/// All draw calls take world space geometry, which is transformed by the
/// current [`Viewport`] before it is stored.
#[derive(Clone, Debug)]
pub struct CommandStream {
    viewport: Viewport,
    commands: Arena<DrawCommand>,
    draw_data: Arena<f32>,
    aabbs: Arena<QuantizedAabb>,
    clips: Arena<ClipRect>,
    current_clip: u8,
    combination: Option<OpenCombination>,
    in_frame: bool,
    aa_width: f32,
    outline_width: f32,
    stats: FrameStats,
    warned: Vec<&'static str>,
}

impl CommandStream {
    pub fn new(capacities: Capacities) -> Self {
        let capacities = capacities.validated();
        Self {
            viewport: Viewport::new(0, 0),
            commands: Arena::new("commands", capacities.commands),
            draw_data: Arena::new("draw data", capacities.draw_data),
            aabbs: Arena::new("bounding boxes", capacities.commands),
            clips: Arena::new("clip rects", capacities.clips),
            current_clip: 0,
            combination: None,
            in_frame: false,
            aa_width: DEFAULT_AA_WIDTH,
            outline_width: DEFAULT_OUTLINE_WIDTH,
            stats: FrameStats::default(),
            warned: Vec::new(),
        }
    }

    /// Starts a frame, resetting all streams, the camera and the clip stack.
    pub fn begin_frame(&mut self) {
        assert!(!self.in_frame, "begin_frame called inside a frame");
        self.commands.clear();
        self.draw_data.clear();
        self.aabbs.clear();
        self.clips.clear();
        self.combination = None;
        self.warned.clear();
        self.viewport.reset_camera();
        self.stats.dropped_commands = 0;
        self.stats.warnings = 0;
        let full = ClipRect::new(
            [0.0, 0.0],
            [self.viewport.width() as f32, self.viewport.height() as f32],
        );
        // Capacities are validated to hold at least the viewport clip.
        let _ = self.clips.push(full);
        self.current_clip = 0;
        self.in_frame = true;
    }

    /// Seals the frame.
    ///
    /// Panics if a combination is still open.
    pub fn end_frame(&mut self) {
        assert!(self.in_frame, "end_frame called outside a frame");
        assert!(
            self.combination.is_none(),
            "end_frame called with an open combination"
        );
        self.in_frame = false;
        self.stats.peak_commands = self.stats.peak_commands.max(self.commands.len());
        self.stats.peak_draw_data = self.stats.peak_draw_data.max(self.draw_data.len());
        log::trace!(
            "sealed frame: {} commands, {} draw data, {} clips",
            self.commands.len(),
            self.draw_data.len(),
            self.clips.len()
        );
    }

    pub fn is_in_frame(&self) -> bool {
        self.in_frame
    }

    pub fn frame_data(&self) -> FrameData<'_> {
        FrameData {
            commands: self.commands.as_slice(),
            draw_data: self.draw_data.as_slice(),
            aabbs: self.aabbs.as_slice(),
            clips: self.clips.as_slice(),
        }
    }

    pub fn stats(&self) -> FrameStats {
        FrameStats {
            commands: self.commands.len(),
            draw_data: self.draw_data.len(),
            clips: self.clips.len(),
            ..self.stats
        }
    }

    /// Uniform configuration for the current frame.
    pub fn config(&self, params: &RenderParams, max_nodes: u32) -> ConfigUniform {
        let width = self.viewport.width();
        let height = self.viewport.height();
        ConfigUniform {
            width_in_tiles: tiles_for(width).min(MAX_TILE_INDEX + 1),
            height_in_tiles: tiles_for(height).min(MAX_TILE_INDEX + 1),
            target_width: width,
            target_height: height,
            n_commands: self.commands.len(),
            n_clips: self.clips.len(),
            max_nodes,
            tile_size: TILE_SIZE,
            aa_width: self.aa_width,
            outline_width: self.outline_width,
            background: pack_color(params.background),
            outline_color: pack_color(params.outline_color),
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Sets the target size in pixels.
    ///
    /// Takes effect for the viewport clip at the next frame.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport.set_size(width, height);
    }

    /// Sets the world box fitted into the target.
    pub fn set_world_box(&mut self, world_box: Option<Rect>) {
        self.viewport.set_world_box(world_box);
    }

    pub fn set_camera(&mut self, position: Point, scale: f64) {
        self.viewport.set_camera(position, scale);
    }

    pub fn world_to_screen(&self, p: Point) -> Point {
        self.viewport.world_to_screen(p)
    }

    pub fn screen_to_world(&self, p: Point) -> Point {
        self.viewport.screen_to_world(p)
    }

    pub fn aa_width(&self) -> f32 {
        self.aa_width
    }

    /// Sets the antialiasing ramp width in pixels.
    pub fn set_aa_width(&mut self, aa_width: f32) {
        if aa_width.is_finite() {
            self.aa_width = aa_width.clamp(0.01, 16.0);
        }
    }

    pub fn outline_width(&self) -> f32 {
        self.outline_width
    }

    pub fn set_outline_width(&mut self, outline_width: f32) {
        if outline_width.is_finite() {
            self.outline_width = outline_width.max(0.0);
        }
    }

    /// Makes `rect` (in world space) the clip rectangle of subsequent
    /// commands.
    pub fn set_clip_rect(&mut self, rect: Rect) {
        self.assert_in_frame();
        let a = self.viewport.to_screen(Point::new(rect.x0, rect.y0));
        let b = self.viewport.to_screen(Point::new(rect.x1, rect.y1));
        let clip = ClipRect::new([a[0].min(b[0]), a[1].min(b[1])], [a[0].max(b[0]), a[1].max(b[1])]);
        if self.clips.get(self.current_clip as u32) == Some(&clip) {
            return;
        }
        match self.clips.push(clip) {
            Ok(index) => self.current_clip = index as u8,
            Err(err) => self.warn_exhausted(err),
        }
    }

    /// Returns to the full viewport clip.
    pub fn reset_clip(&mut self) {
        self.current_clip = 0;
    }

    /// Opens a combination: subsequent shapes blend into one shape until
    /// [`CommandStream::end_combination`].
    ///
    /// `smoothness` is the blend radius in world units. Panics if a
    /// combination is already open.
    pub fn begin_combination(&mut self, smoothness: f64) {
        self.assert_in_frame();
        assert!(
            self.combination.is_none(),
            "begin_combination called while a combination is open"
        );
        let smoothness = self.viewport.scale_length(smoothness.max(0.0));
        let command = DrawCommand {
            tag: CommandTag::new(PrimitiveKind::CombinationBegin, FillMode::Solid).pack(),
            clip_index: self.current_clip,
            ..Default::default()
        };
        // Keep a command and a value in reserve for the end marker.
        let begin = match self.try_emit(command, &[smoothness, 0.0], QuantizedAabb::EMPTY, 1) {
            Ok(index) => Some(index),
            Err(err) => {
                self.drop_command(err);
                None
            }
        };
        self.combination = Some(OpenCombination {
            begin,
            smoothness,
            bounds: Aabb::EMPTY,
        });
    }

    /// Closes the open combination, optionally drawing one outline around
    /// the blended shape.
    ///
    /// Panics if no combination is open.
    pub fn end_combination(&mut self, draw_outline: bool) {
        self.assert_in_frame();
        let Some(combination) = self.combination.take() else {
            panic!("end_combination called without begin_combination");
        };
        let Some(begin) = combination.begin else {
            return;
        };
        let aabb = combination
            .bounds
            .quantize(self.viewport.width(), self.viewport.height());
        let Some(begin_command) = self.commands.get(begin).copied() else {
            return;
        };
        let end_index = self.commands.len();
        let command = DrawCommand {
            tag: CommandTag::new(PrimitiveKind::CombinationEnd, FillMode::Solid).pack(),
            clip_index: begin_command.clip_index,
            custom_data: if draw_outline { COMBINATION_OUTLINE } else { 0 },
            ..Default::default()
        };
        if let Err(err) = self.try_emit(command, &[combination.smoothness], aabb, 0) {
            // The reserve makes this unreachable, but never leave a begin
            // marker without its end.
            self.drop_command(err);
            self.commands.truncate(begin);
            self.aabbs.truncate(begin);
            self.draw_data.truncate(begin_command.data_index);
            return;
        }
        if let Some(slot) = self.aabbs.get_mut(begin) {
            *slot = aabb;
        }
        if let Some(slot) = self.draw_data.get_mut(begin_command.data_index + 1) {
            *slot = f32::from_bits(end_index);
        }
    }

    pub fn is_combination_open(&self) -> bool {
        self.combination.is_some()
    }

    pub fn disc(&mut self, center: Point, radius: f64, paint: impl Into<Paint>) {
        let shape = Shape::Disc {
            center: self.viewport.to_screen(center),
            radius: self.viewport.scale_length(radius),
        };
        self.shape(shape, paint.into());
    }

    /// Box spanning `p0`..`p1` with the given full `width`.
    pub fn oriented_box(
        &mut self,
        p0: Point,
        p1: Point,
        width: f64,
        roundness: f64,
        paint: impl Into<Paint>,
    ) {
        let shape = Shape::OrientedBox {
            p0: self.viewport.to_screen(p0),
            p1: self.viewport.to_screen(p1),
            width: self.viewport.scale_length(width),
            roundness: self.viewport.scale_length(roundness),
        };
        self.shape(shape, paint.into());
    }

    /// Ellipse with major axis `p0`..`p1` and full minor axis `width`.
    pub fn ellipse(&mut self, p0: Point, p1: Point, width: f64, paint: impl Into<Paint>) {
        let shape = Shape::Ellipse {
            p0: self.viewport.to_screen(p0),
            p1: self.viewport.to_screen(p1),
            width: self.viewport.scale_length(width),
        };
        self.shape(shape, paint.into());
    }

    pub fn triangle(
        &mut self,
        p0: Point,
        p1: Point,
        p2: Point,
        roundness: f64,
        paint: impl Into<Paint>,
    ) {
        let shape = Shape::Triangle {
            p0: self.viewport.to_screen(p0),
            p1: self.viewport.to_screen(p1),
            p2: self.viewport.to_screen(p2),
            roundness: self.viewport.scale_length(roundness),
        };
        self.shape(shape, paint.into());
    }

    /// Circular sector around `direction`, spanning `aperture` radians on
    /// either side.
    pub fn pie(
        &mut self,
        center: Point,
        direction: Vec2,
        radius: f64,
        aperture: f64,
        paint: impl Into<Paint>,
    ) {
        let shape = Shape::Pie {
            center: self.viewport.to_screen(center),
            direction: self.viewport.to_screen_direction(direction),
            radius: self.viewport.scale_length(radius),
            aperture: aperture as f32,
        };
        self.shape(shape, paint.into());
    }

    /// Ring segment around `direction`, spanning `aperture` radians on
    /// either side.
    pub fn arc(
        &mut self,
        center: Point,
        direction: Vec2,
        radius: f64,
        aperture: f64,
        thickness: f64,
        paint: impl Into<Paint>,
    ) {
        let shape = Shape::Arc {
            center: self.viewport.to_screen(center),
            direction: self.viewport.to_screen_direction(direction),
            radius: self.viewport.scale_length(radius),
            aperture: aperture as f32,
            thickness: self.viewport.scale_length(thickness),
        };
        self.shape(shape, paint.into());
    }

    /// Arc starting at `p0`, passing through `p1` and ending at `p2`.
    ///
    /// Collinear points have no circumscribed circle and are dropped.
    pub fn arc_from_points(
        &mut self,
        p0: Point,
        p1: Point,
        p2: Point,
        thickness: f64,
        paint: impl Into<Paint>,
    ) {
        self.assert_in_frame();
        let Some((center, direction, radius, aperture)) = arc_through(p0, p1, p2) else {
            log::trace!("dropping arc through collinear points");
            return;
        };
        self.arc(center, direction, radius, aperture, thickness, paint);
    }

    /// Capsule with radius `r0` around `p0` and `r1` around `p1`.
    pub fn uneven_capsule(
        &mut self,
        p0: Point,
        p1: Point,
        r0: f64,
        r1: f64,
        paint: impl Into<Paint>,
    ) {
        let shape = Shape::UnevenCapsule {
            p0: self.viewport.to_screen(p0),
            p1: self.viewport.to_screen(p1),
            r0: self.viewport.scale_length(r0),
            r1: self.viewport.scale_length(r1),
        };
        self.shape(shape, paint.into());
    }

    /// Trapezoid along `p0`..`p1` with half widths `r0` and `r1`.
    pub fn trapezoid(
        &mut self,
        p0: Point,
        p1: Point,
        r0: f64,
        r1: f64,
        paint: impl Into<Paint>,
    ) {
        let shape = Shape::Trapezoid {
            p0: self.viewport.to_screen(p0),
            p1: self.viewport.to_screen(p1),
            r0: self.viewport.scale_length(r0),
            r1: self.viewport.scale_length(r1),
        };
        self.shape(shape, paint.into());
    }

    /// Axis aligned box with rounded corners.
    pub fn aabox(&mut self, rect: Rect, roundness: f64, paint: impl Into<Paint>) {
        let shape = Shape::Box {
            min: self.viewport.to_screen(Point::new(rect.x0, rect.y0)),
            max: self.viewport.to_screen(Point::new(rect.x1, rect.y1)),
            roundness: self.viewport.scale_length(roundness),
        };
        self.shape(shape, paint.into());
    }

    /// Draws `text` with the built-in stroke font, capital letters `size`
    /// world units tall and the top left corner at `origin`.
    ///
    /// The strokes form one combination so the string gets a single
    /// outline. Inside an open combination the strokes join that one.
    pub fn text(&mut self, origin: Point, size: f64, text: &str, paint: impl Into<Paint>) {
        self.assert_in_frame();
        let paint = paint.into();
        let stroke = Paint {
            fill: match paint.fill {
                FillMode::Outline => FillMode::Solid,
                fill => fill,
            },
            op: SdfOperator::Union,
            ..paint
        };
        let own_combination = self.combination.is_none();
        if own_combination {
            self.begin_combination(0.0);
        }
        for s in font::layout([origin.x, origin.y], size, text) {
            let (p0, p1) = (Point::new(s.p0[0], s.p0[1]), Point::new(s.p1[0], s.p1[1]));
            self.uneven_capsule(p0, p1, s.radius, s.radius, stroke);
        }
        if own_combination {
            self.end_combination(paint.fill == FillMode::Outline);
        }
    }

    /// Emits a shape given in screen space.
    pub fn shape(&mut self, shape: Shape, paint: Paint) {
        self.assert_in_frame();
        let Some(shape) = shape.normalized() else {
            log::trace!("dropping degenerate {:?}", shape.kind());
            return;
        };
        if matches!(&self.combination, Some(c) if c.begin.is_none()) {
            self.stats.dropped_commands += 1;
            return;
        }
        let bounds = shape.bounds().inflate(self.margin());
        let aabb = bounds.quantize(self.viewport.width(), self.viewport.height());
        let mut payload = [0.0; MAX_SHAPE_PAYLOAD];
        let len = shape.encode(&mut payload);
        let command = DrawCommand {
            tag: CommandTag::new(shape.kind(), paint.fill).pack(),
            clip_index: self.current_clip,
            op: paint.op as u8,
            custom_data: 0,
            color: pack_color(paint.color),
            data_index: 0,
        };
        let reserve = u32::from(self.combination.is_some());
        match self.try_emit(command, &payload[..len], aabb, reserve) {
            Ok(_) => {
                if let Some(combination) = &mut self.combination {
                    combination.bounds = combination.bounds.union(&bounds);
                }
            }
            Err(err) => self.drop_command(err),
        }
    }

    /// Distance around a shape which can still receive coverage.
    fn margin(&self) -> f32 {
        let smoothness = self.combination.as_ref().map_or(0.0, |c| c.smoothness);
        self.aa_width + smoothness + 0.5 * self.outline_width
    }

    /// Appends a command and its payload, keeping `reserve` command slots
    /// and draw data values free.
    ///
    /// On failure the reserved command slot is released.
    fn try_emit(
        &mut self,
        mut command: DrawCommand,
        payload: &[f32],
        aabb: QuantizedAabb,
        reserve: u32,
    ) -> Result<u32, CapacityError> {
        self.commands.check_room(1 + reserve)?;
        command.data_index = self.draw_data.len();
        let index = self.commands.push(command)?;
        if let Err(err) = self.draw_data.check_room(payload.len() as u32 + reserve) {
            self.commands.pop();
            return Err(err);
        }
        self.draw_data.extend(payload)?;
        self.aabbs.push(aabb)?;
        Ok(index)
    }

    fn drop_command(&mut self, err: CapacityError) {
        self.stats.dropped_commands += 1;
        self.warn_exhausted(err);
    }

    fn warn_exhausted(&mut self, err: CapacityError) {
        if self.warned.contains(&err.name) {
            return;
        }
        self.warned.push(err.name);
        self.stats.warnings += 1;
        log::warn!("{err}, further requests this frame are dropped");
    }

    fn assert_in_frame(&self) {
        assert!(
            self.in_frame,
            "draw calls must be made between begin_frame and end_frame"
        );
    }
}

/// Circle through three points, as center, direction of the arc midpoint,
/// radius and half aperture.
fn arc_through(p0: Point, p1: Point, p2: Point) -> Option<(Point, Vec2, f64, f64)> {
    use std::f64::consts::TAU;
    let (a, b) = (p1 - p0, p2 - p0);
    let cross = a.cross(b);
    if cross.abs() <= 1e-9 * a.hypot() * b.hypot() || cross == 0.0 {
        return None;
    }
    // Circumcenter relative to p0.
    let (a2, b2) = (a.hypot2(), b.hypot2());
    let offset = Vec2::new(b.y * a2 - a.y * b2, a.x * b2 - b.x * a2) / (2.0 * cross);
    let center = p0 + offset;
    let radius = offset.hypot();
    let angle = |p: Point| (p - center).atan2();
    let start = angle(p0);
    let sweep = (angle(p2) - start).rem_euclid(TAU);
    let through = (angle(p1) - start).rem_euclid(TAU);
    let sweep = if through <= sweep { sweep } else { sweep - TAU };
    let mid = start + 0.5 * sweep;
    Some((center, Vec2::from_angle(mid), radius, 0.5 * sweep.abs()))
}

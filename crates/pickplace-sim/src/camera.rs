//! Synthetic orthographic cameras.
//!
//! A [`SyntheticCamera`] rasterizes the few things the task cares about into
//! a packed RGB8 frame: the target as a green square, the cube as a red
//! square sized by its footprint and the end effector as a blue dot, on a
//! gray background. Even-numbered cameras look straight down (x-y plane),
//! odd-numbered ones look from the side (x-z plane).

use nalgebra::Vector3;

use pickplace_core::config::CameraConfig;
use pickplace_core::types::ImageFrame;

const BACKGROUND: [u8; 3] = [96, 96, 96];
const TARGET: [u8; 3] = [40, 200, 40];
const CUBE: [u8; 3] = [210, 40, 40];
const END_EFFECTOR: [u8; 3] = [40, 40, 220];

/// World-space extent covered by every view (m).
const X_RANGE: (f32, f32) = (-0.2, 1.4);
const Y_RANGE: (f32, f32) = (-0.6, 1.0);
const Z_RANGE: (f32, f32) = (0.4, 2.0);

/// Half-size of the target and end-effector markers (m).
const MARKER_HALF: f32 = 0.03;

/// Projection plane of a [`SyntheticCamera`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraView {
    /// Looking down the z axis; image rows follow y.
    TopDown,
    /// Looking along the y axis; image rows follow z.
    Side,
}

impl CameraView {
    /// View assigned to the `index`-th configured camera.
    pub const fn for_index(index: usize) -> Self {
        if index % 2 == 0 { Self::TopDown } else { Self::Side }
    }

    /// Project a world point onto the view's `(horizontal, vertical)` axes.
    fn project(self, p: &Vector3<f32>) -> (f32, f32) {
        match self {
            Self::TopDown => (p.x, p.y),
            Self::Side => (p.x, p.z),
        }
    }

    const fn vertical_range(self) -> (f32, f32) {
        match self {
            Self::TopDown => Y_RANGE,
            Self::Side => Z_RANGE,
        }
    }
}

/// What a camera sees in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneSnapshot {
    pub end_effector: Vector3<f32>,
    pub cube: Vector3<f32>,
    pub cube_size: Vector3<f32>,
    pub target: Vector3<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticCamera {
    label: String,
    width: u32,
    height: u32,
    view: CameraView,
}

impl SyntheticCamera {
    pub fn new(config: &CameraConfig, view: CameraView) -> Self {
        Self {
            label: config.label.clone(),
            width: config.width.max(1),
            height: config.height.max(1),
            view,
        }
    }

    /// One camera per config entry, alternating views.
    pub fn rig(cameras: &[CameraConfig]) -> Vec<Self> {
        cameras
            .iter()
            .enumerate()
            .map(|(i, c)| Self::new(c, CameraView::for_index(i)))
            .collect()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub const fn view(&self) -> CameraView {
        self.view
    }

    /// Rasterize `scene`. Later markers paint over earlier ones, so the end
    /// effector is always visible.
    pub fn render(&self, scene: &SceneSnapshot, timestamp_ns: u64) -> ImageFrame {
        let mut canvas = Canvas::new(self.width, self.height, self.view);

        canvas.fill_box(&scene.target, MARKER_HALF, MARKER_HALF, TARGET);
        let (half_w, half_h) = match self.view {
            CameraView::TopDown => (scene.cube_size.x / 2.0, scene.cube_size.y / 2.0),
            CameraView::Side => (scene.cube_size.x / 2.0, scene.cube_size.z / 2.0),
        };
        canvas.fill_box(&scene.cube, half_w, half_h, CUBE);
        canvas.fill_box(&scene.end_effector, MARKER_HALF / 2.0, MARKER_HALF / 2.0, END_EFFECTOR);

        ImageFrame {
            timestamp_ns,
            width: self.width,
            height: self.height,
            label: self.label.clone(),
            data: canvas.data,
        }
    }
}

// ---------------------------------------------------------------------------
// Canvas
// ---------------------------------------------------------------------------

struct Canvas {
    width: u32,
    height: u32,
    view: CameraView,
    data: Vec<u8>,
}

impl Canvas {
    fn new(width: u32, height: u32, view: CameraView) -> Self {
        Self {
            width,
            height,
            view,
            data: BACKGROUND.repeat(pixel_count(width, height)),
        }
    }

    /// Fill the axis-aligned box of half extents `(half_u, half_v)` centred on
    /// `center`'s projection. Boxes entirely outside the view draw nothing,
    /// partly visible ones are cut at the image border.
    fn fill_box(&mut self, center: &Vector3<f32>, half_u: f32, half_v: f32, rgb: [u8; 3]) {
        let (u, v) = self.view.project(center);
        let Some((c0, c1)) = self.columns(u - half_u, u + half_u) else {
            return;
        };
        let Some((r0, r1)) = self.rows(v - half_v, v + half_v) else {
            return;
        };
        let width = self.width as usize;
        for y in r0 as usize..=r1 as usize {
            for x in c0 as usize..=c1 as usize {
                let offset = (y * width + x) * 3;
                self.data[offset..offset + 3].copy_from_slice(&rgb);
            }
        }
    }

    fn columns(&self, lo: f32, hi: f32) -> Option<(u32, u32)> {
        pixel_span(lo, hi, X_RANGE, self.width)
    }

    /// Image rows grow downward, so the vertical axis is flipped.
    fn rows(&self, lo: f32, hi: f32) -> Option<(u32, u32)> {
        let (bottom, top) = self.view.vertical_range();
        let flip = |v: f32| top + bottom - v;
        pixel_span(flip(hi), flip(lo), (bottom, top), self.height)
    }
}

/// Pixel count in `usize`, so large resolutions cannot overflow `u32`.
const fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

/// Pixel indices covered by the world interval `[lo, hi]`, or `None` when it
/// misses `range` entirely.
fn pixel_span(lo: f32, hi: f32, range: (f32, f32), size: u32) -> Option<(u32, u32)> {
    if !(lo.is_finite() && hi.is_finite()) || hi < range.0 || lo > range.1 {
        return None;
    }
    Some((to_pixel(lo, range, size)?, to_pixel(hi, range, size)?))
}

/// Map `value` in `range` to a pixel index in `0..size`, clamping values that
/// fall outside. `None` for non-finite input.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn to_pixel(value: f32, (lo, hi): (f32, f32), size: u32) -> Option<u32> {
    if !value.is_finite() {
        return None;
    }
    let t = ((value - lo) / (hi - lo)).clamp(0.0, 1.0);
    Some(((t * size as f32) as u32).min(size - 1))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> SceneSnapshot {
        SceneSnapshot {
            end_effector: Vector3::new(0.2, -0.4, 1.8),
            cube: Vector3::new(0.6, 0.3, 0.85),
            cube_size: Vector3::new(0.133, 0.133, 0.0715),
            target: Vector3::new(1.2, 0.8, 1.0),
        }
    }

    fn pixel(frame: &ImageFrame, x: u32, y: u32) -> [u8; 3] {
        let offset = (y as usize * frame.width as usize + x as usize) * 3;
        [frame.data[offset], frame.data[offset + 1], frame.data[offset + 2]]
    }

    fn camera(view: CameraView) -> SyntheticCamera {
        SyntheticCamera::new(&CameraConfig::new("camera1", 64, 64), view)
    }

    #[test]
    fn frame_has_rgb8_layout() {
        let frame = camera(CameraView::TopDown).render(&scene(), 42);
        assert_eq!(frame.width, 64);
        assert_eq!(frame.height, 64);
        assert_eq!(frame.data.len(), 64 * 64 * 3);
        assert_eq!(frame.timestamp_ns, 42);
        assert_eq!(frame.label, "camera1");
    }

    #[test]
    fn top_down_places_cube_by_xy() {
        let frame = camera(CameraView::TopDown).render(&scene(), 0);
        // x = 0.6 -> column 32; y = 0.3 -> row 64 - 36 = 28.
        assert_eq!(pixel(&frame, 32, 28), CUBE);
        assert_eq!(pixel(&frame, 0, 63), BACKGROUND);
    }

    #[test]
    fn side_view_places_cube_by_xz() {
        let frame = camera(CameraView::Side).render(&scene(), 0);
        // z = 0.85 -> row 64 - 18 = 46.
        assert_eq!(pixel(&frame, 32, 46), CUBE);
        assert_eq!(pixel(&frame, 32, 28), BACKGROUND);
    }

    #[test]
    fn end_effector_paints_over_cube() {
        let mut s = scene();
        s.end_effector = s.cube;
        let frame = camera(CameraView::TopDown).render(&s, 0);
        assert_eq!(pixel(&frame, 32, 28), END_EFFECTOR);
    }

    #[test]
    fn target_is_drawn() {
        let frame = camera(CameraView::TopDown).render(&scene(), 0);
        // x = 1.2 -> column 56; y = 0.8 -> row 64 - 56 = 8.
        assert_eq!(pixel(&frame, 56, 8), TARGET);
    }

    #[test]
    fn rig_alternates_views() {
        let rig = SyntheticCamera::rig(&[
            CameraConfig::new("camera1", 8, 8),
            CameraConfig::new("camera2", 8, 8),
            CameraConfig::new("camera3", 8, 8),
        ]);
        let views: Vec<CameraView> = rig.iter().map(SyntheticCamera::view).collect();
        assert_eq!(views, [CameraView::TopDown, CameraView::Side, CameraView::TopDown]);
        assert_eq!(rig[1].label(), "camera2");
    }

    #[test]
    fn out_of_view_points_clamp_to_edge() {
        assert_eq!(to_pixel(-5.0, X_RANGE, 64), Some(0));
        assert_eq!(to_pixel(5.0, X_RANGE, 64), Some(63));
        assert_eq!(to_pixel(f32::NAN, X_RANGE, 64), None);
    }

    #[test]
    fn boxes_outside_the_view_are_not_drawn() {
        let mut s = scene();
        s.cube = Vector3::new(3.0, 0.3, 0.85);
        let frame = camera(CameraView::TopDown).render(&s, 0);
        assert!(frame.data.chunks(3).all(|px| px != &CUBE[..]));

        assert_eq!(pixel_span(-1.0, -0.5, X_RANGE, 64), None);
        assert_eq!(pixel_span(f32::NAN, 0.0, X_RANGE, 64), None);
    }

    #[test]
    fn partly_visible_boxes_are_cut_at_the_border() {
        assert_eq!(pixel_span(-0.3, -0.11, X_RANGE, 64), Some((0, 3)));
        let mut s = scene();
        s.cube = Vector3::new(-0.2, 0.3, 0.85);
        let frame = camera(CameraView::TopDown).render(&s, 0);
        assert_eq!(pixel(&frame, 0, 28), CUBE);
    }

    #[test]
    fn large_resolutions_size_the_buffer_without_overflow() {
        assert_eq!(pixel_count(70_000, 70_000), 4_900_000_000);
        assert_eq!(Canvas::new(70_000, 1, CameraView::TopDown).data.len(), 70_000 * 3);
        assert_eq!(to_pixel(1.4, X_RANGE, 70_000), Some(69_999));
    }
}

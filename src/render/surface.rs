/// A 2D canvas with its origin at the top-left corner and y growing
/// downward.
pub trait DrawSurface {
    fn width(&self) -> f32;
    fn height(&self) -> f32;

    fn clear(&mut self);

    /// Stroke a connected line through `points`.
    fn stroke_polyline(&mut self, points: &[(f32, f32)]);

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32);
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Clear,
    Polyline(Vec<(f32, f32)>),
    Rect { x: f32, y: f32, width: f32, height: f32 },
}

/// Surface that records draw calls instead of rasterizing them.
///
/// Frontends replay the ops onto their own canvas; tests inspect them.
#[derive(Debug, Clone)]
pub struct RecordedSurface {
    width: f32,
    height: f32,
    ops: Vec<DrawOp>,
}

impl RecordedSurface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }

    /// Ops since the last `clear`.
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn polylines(&self) -> impl Iterator<Item = &[(f32, f32)]> + '_ {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Polyline(points) => Some(points.as_slice()),
            _ => None,
        })
    }

    pub fn rects(&self) -> impl Iterator<Item = (f32, f32, f32, f32)> + '_ {
        self.ops.iter().filter_map(|op| match *op {
            DrawOp::Rect { x, y, width, height } => Some((x, y, width, height)),
            _ => None,
        })
    }

    pub fn is_blank(&self) -> bool {
        self.ops.iter().all(|op| matches!(op, DrawOp::Clear))
    }
}

impl DrawSurface for RecordedSurface {
    fn width(&self) -> f32 {
        self.width
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn clear(&mut self) {
        self.ops.clear();
        self.ops.push(DrawOp::Clear);
    }

    fn stroke_polyline(&mut self, points: &[(f32, f32)]) {
        self.ops.push(DrawOp::Polyline(points.to_vec()));
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.ops.push(DrawOp::Rect { x, y, width, height });
    }
}

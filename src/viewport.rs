use crate::host::{Host, Rect};

/// The visible area grown by a fixed margin on every side.
///
/// `top`/`left` are fixed at construction; `bottom`/`right` follow the
/// visible size and are recomputed on [`ViewportTracker::refresh`].
#[derive(Debug, Clone)]
pub struct ViewportTracker {
    offset: f64,
    rect: Rect,
}

impl ViewportTracker {
    pub fn new(offset: f64) -> Self {
        let offset = offset.max(0.0);
        let mut tracker = Self {
            offset,
            rect: Rect::default(),
        };
        tracker.init_offset(offset);
        tracker
    }

    fn init_offset(&mut self, offset: f64) {
        self.rect.top = 0.0 - offset;
        self.rect.left = 0.0 - offset;
    }

    /// Re-read the visible dimensions from the host.
    pub fn refresh<H: Host>(&mut self, host: &H) {
        let (width, height) = host.viewport_size();
        self.rect.bottom = height + self.offset;
        self.rect.right = width + self.offset;
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn contains(&self, element_box: &Rect) -> bool {
        element_box.intersects(&self.rect)
    }
}

use std::fmt::Debug;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle given by its four edges.
///
/// Used both for element boxes (viewport-relative, as returned by the host)
/// and for the expanded viewport the validator tests against.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

impl Rect {
    pub fn new(top: f64, left: f64, bottom: f64, right: f64) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    /// Build a rectangle from an origin and a size.
    pub fn from_origin_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(y, x, y + height, x + width)
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Overlap test with inclusive boundaries: touching edges count.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.right >= other.left
            && self.bottom >= other.top
            && self.left <= other.right
            && self.top <= other.bottom
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.top + dy, self.left + dx, self.bottom + dy, self.right + dx)
    }
}

/// Where a scroll signal originates.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalTarget<E> {
    Window,
    Element(E),
}

/// A bindable host signal.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal<E> {
    Scroll(SignalTarget<E>),
    Resize,
}

/// Outcome of an asynchronous image probe.
pub type ProbeResult = Result<(), ProbeFailure>;

/// The probe could not fetch or decode the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFailure {
    pub src: String,
}

/// Completion handler for [`Host::probe_image`].
///
/// Runs later on the host's event loop with mutable access to the host so it
/// can mark the element it captured.
pub type ProbeCallback<H> = Box<dyn FnOnce(&mut H, ProbeResult)>;

/// Document environment the loader runs against.
///
/// The host owns the element tree, the viewport and the event loop. The loader
/// only asks questions and requests mutations through this trait; signal
/// dispatch back into the loader is the host's job (see
/// [`crate::LazyLoader::on_scroll`] and [`crate::LazyLoader::on_resize`]).
pub trait Host: Sized + 'static {
    type Element: Clone + PartialEq + Debug + 'static;

    /// Elements matching `selector`, in document order.
    fn query_selector_all(&self, selector: &str) -> Vec<Self::Element>;

    /// Current box of the element in viewport-relative coordinates.
    fn bounding_rect(&self, element: &Self::Element) -> Rect;

    /// Rendered width and height; zero for elements that are not displayed.
    fn offset_size(&self, element: &Self::Element) -> (f64, f64);

    fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;
    fn remove_attribute(&mut self, element: &Self::Element, name: &str);
    fn has_class(&self, element: &Self::Element, class: &str) -> bool;
    fn add_class(&mut self, element: &Self::Element, class: &str);

    /// True for `<img>`-like elements.
    fn is_image(&self, element: &Self::Element) -> bool;

    /// True when the element exposes a native, settable source property.
    fn has_src_property(&self, element: &Self::Element) -> bool;

    fn set_src(&mut self, element: &Self::Element, src: &str);
    fn set_background_image(&mut self, element: &Self::Element, src: &str);

    /// Visible viewport width and height.
    fn viewport_size(&self) -> (f64, f64);
    fn screen_width(&self) -> f64;
    fn device_pixel_ratio(&self) -> f64;
    fn now(&self) -> Instant;

    fn bind(&mut self, signal: Signal<Self::Element>);
    fn unbind(&mut self, signal: Signal<Self::Element>);

    /// Start fetching `src` without blocking; `done` fires exactly once if the
    /// fetch ever settles.
    fn probe_image(&mut self, src: &str, done: ProbeCallback<Self>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects_inclusive_edges() {
        let viewport = Rect::new(-100.0, -100.0, 900.0, 1124.0);

        let touching_bottom = Rect::new(900.0, 0.0, 1000.0, 100.0);
        assert!(touching_bottom.intersects(&viewport));

        let below = Rect::new(900.5, 0.0, 1000.0, 100.0);
        assert!(!below.intersects(&viewport));

        let touching_top = Rect::new(-200.0, 0.0, -100.0, 100.0);
        assert!(touching_top.intersects(&viewport));

        let right_of = Rect::new(0.0, 1124.1, 100.0, 1200.0);
        assert!(!right_of.intersects(&viewport));
    }

    #[test]
    fn test_zero_area_rect_can_still_intersect() {
        let viewport = Rect::new(0.0, 0.0, 500.0, 500.0);
        let collapsed = Rect::new(10.0, 10.0, 10.0, 10.0);

        assert_eq!(collapsed.width(), 0.0);
        assert!(collapsed.intersects(&viewport));
    }

    #[test]
    fn test_from_origin_size_and_translate() {
        let rect = Rect::from_origin_size(10.0, 20.0, 30.0, 40.0);
        assert_eq!(rect, Rect::new(20.0, 10.0, 60.0, 40.0));
        assert_eq!(rect.width(), 30.0);
        assert_eq!(rect.height(), 40.0);

        let moved = rect.translate(-10.0, -20.0);
        assert_eq!(moved, Rect::new(0.0, 0.0, 40.0, 30.0));
    }
}

pub mod test_helpers {
    use crate::config::Callbacks;
    use crate::error::LoadError;
    use crate::host::Rect;
    use crate::simulated::{ElementSpec, NodeId, SimulatedDocument};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// One callback invocation seen by [`CallbackRecorder`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Recorded {
        Success(NodeId),
        Error(NodeId, &'static str),
    }

    /// Collects success/error callbacks for later assertions.
    #[derive(Debug, Clone, Default)]
    pub struct CallbackRecorder {
        events: Rc<RefCell<Vec<Recorded>>>,
    }

    impl CallbackRecorder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn callbacks(&self) -> Callbacks<NodeId> {
            let ok = self.events.clone();
            let err = self.events.clone();
            Callbacks::new()
                .on_success(move |element: &NodeId| {
                    ok.borrow_mut().push(Recorded::Success(*element))
                })
                .on_error(move |element: &NodeId, error: &LoadError| {
                    err.borrow_mut()
                        .push(Recorded::Error(*element, error.reason()))
                })
        }

        pub fn events(&self) -> Vec<Recorded> {
            self.events.borrow().clone()
        }

        pub fn errors_for(&self, element: NodeId) -> Vec<&'static str> {
            self.events
                .borrow()
                .iter()
                .filter_map(|event| match event {
                    Recorded::Error(e, reason) if *e == element => Some(*reason),
                    _ => None,
                })
                .collect()
        }

        pub fn successes(&self) -> usize {
            self.events
                .borrow()
                .iter()
                .filter(|event| matches!(event, Recorded::Success(_)))
                .count()
        }
    }

    /// Builder for a vertical page of lazily loaded images
    pub struct PageBuilder {
        doc: SimulatedDocument,
        ids: Vec<NodeId>,
    }

    impl PageBuilder {
        pub fn new(width: f64, height: f64) -> Self {
            Self {
                doc: SimulatedDocument::new(width, height),
                ids: Vec::new(),
            }
        }

        /// Add a `.b-lazy` image at `top` with `data-src` set to `src`
        pub fn image_at(mut self, top: f64, src: &str) -> Self {
            let id = self.doc.add_element(
                ElementSpec::new("img")
                    .id(&format!("img-{}", self.ids.len()))
                    .class("b-lazy")
                    .attr("data-src", src)
                    .rect(Rect::from_origin_size(0.0, top, 200.0, 150.0)),
            );
            self.ids.push(id);
            self
        }

        /// Add an arbitrary element
        pub fn element(mut self, spec: ElementSpec) -> Self {
            let id = self.doc.add_element(spec);
            self.ids.push(id);
            self
        }

        pub fn pixel_ratio(mut self, ratio: f64) -> Self {
            self.doc.set_device_pixel_ratio(ratio);
            self
        }

        pub fn screen_width(mut self, width: f64) -> Self {
            self.doc.set_screen_width(width);
            self
        }

        pub fn build(self) -> (SimulatedDocument, Vec<NodeId>) {
            (self.doc, self.ids)
        }
    }
}

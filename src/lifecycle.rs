use log::{debug, info};

use crate::config::{Callbacks, Options};
use crate::host::{Host, Signal, SignalTarget};
use crate::loader::Loader;
use crate::registry::CandidateRegistry;
use crate::throttle::Throttle;
use crate::validator::{self, PassSummary};
use crate::viewport::ViewportTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No signals bound, registry empty.
    Inactive,
    /// Signals bound, candidates pending.
    Active,
}

/// One lazy-loading instance over a host document.
///
/// Owns its viewport, registry and throttles; several instances can run over
/// the same host independently. The host delivers bound signals by calling
/// [`LazyLoader::on_scroll`] and [`LazyLoader::on_resize`].
pub struct LazyLoader<H: Host> {
    loader: Loader<H>,
    viewport: ViewportTracker,
    registry: CandidateRegistry<H::Element>,
    containers: Vec<H::Element>,
    validate_throttle: Throttle,
    viewport_throttle: Throttle,
    state: LifecycleState,
    last_pass: Option<PassSummary>,
}

impl<H: Host> LazyLoader<H> {
    /// Build an instance with default callbacks and start it.
    pub fn start(host: &mut H, options: Options) -> Self {
        Self::with_callbacks(host, options, Callbacks::new())
    }

    /// Build an instance and run the initial validation pass.
    ///
    /// Breakpoints, pixel density and containers are resolved here once.
    pub fn with_callbacks(
        host: &mut H,
        options: Options,
        callbacks: Callbacks<H::Element>,
    ) -> Self {
        let options = options.normalized();

        let viewport = ViewportTracker::new(options.offset);

        let containers = match options.container.as_deref() {
            Some(selector) => host.query_selector_all(selector),
            None => Vec::new(),
        };

        let validate_throttle = Throttle::new(options.validate_delay());
        let viewport_throttle = Throttle::new(options.save_viewport_offset_delay());
        let loader = Loader::new(&*host, options, callbacks);

        let mut lazy = Self {
            loader,
            viewport,
            registry: CandidateRegistry::new(),
            containers,
            validate_throttle,
            viewport_throttle,
            state: LifecycleState::Inactive,
            last_pass: None,
        };
        lazy.initialize(host);
        lazy
    }

    /// Re-query the selector, rebinding signals if the instance had torn
    /// itself down, and validate immediately.
    pub fn revalidate(&mut self, host: &mut H) -> PassSummary {
        self.initialize(host)
    }

    fn initialize(&mut self, host: &mut H) -> PassSummary {
        self.registry.rebuild(&*host, &self.loader.options().selector);

        if self.state == LifecycleState::Inactive {
            // The viewport may have changed while no resize signal was bound
            self.viewport.refresh(&*host);
            for container in &self.containers {
                host.bind(Signal::Scroll(SignalTarget::Element(container.clone())));
            }
            host.bind(Signal::Resize);
            host.bind(Signal::Scroll(SignalTarget::Window));
            self.state = LifecycleState::Active;
            info!(
                "Lazy loading active: {} candidates, {} containers",
                self.registry.len(),
                self.containers.len()
            );
        }

        self.validate(host)
    }

    /// Run one unthrottled validation pass. Tears down once nothing is left.
    pub fn validate(&mut self, host: &mut H) -> PassSummary {
        let summary =
            validator::validate(host, &mut self.registry, &self.viewport, &self.loader);
        self.last_pass = Some(summary);
        if self.registry.is_empty() {
            self.destroy(host);
        }
        summary
    }

    /// Scroll signal from the window or a container. `None` when the call was
    /// dropped by the throttle or the instance is inactive.
    pub fn on_scroll(
        &mut self,
        host: &mut H,
        target: &SignalTarget<H::Element>,
    ) -> Option<PassSummary> {
        if !self.is_active() {
            return None;
        }
        debug!("Scroll from {target:?}");
        self.throttled_validate(host)
    }

    /// Resize signal: refresh the viewport, then validate. Each step is
    /// throttled on its own.
    pub fn on_resize(&mut self, host: &mut H) -> Option<PassSummary> {
        if !self.is_active() {
            return None;
        }
        let now = host.now();
        let viewport = &mut self.viewport;
        self.viewport_throttle.call(now, || viewport.refresh(&*host));
        self.throttled_validate(host)
    }

    fn throttled_validate(&mut self, host: &mut H) -> Option<PassSummary> {
        let now = host.now();
        if self.validate_throttle.call(now, || ()).is_none() {
            return None;
        }
        Some(self.validate(host))
    }

    /// Load one element directly, whatever the lifecycle state or registry
    /// membership.
    pub fn load(&self, host: &mut H, element: &H::Element, force: bool) {
        self.loader.load(host, element, force);
    }

    pub fn load_all<'a, I>(&self, host: &mut H, elements: I, force: bool)
    where
        I: IntoIterator<Item = &'a H::Element>,
    {
        for element in elements {
            self.loader.load(host, element, force);
        }
    }

    /// Unbind every signal and forget all candidates. No-op when inactive.
    pub fn destroy(&mut self, host: &mut H) {
        if self.state == LifecycleState::Inactive {
            return;
        }
        for container in &self.containers {
            host.unbind(Signal::Scroll(SignalTarget::Element(container.clone())));
        }
        host.unbind(Signal::Scroll(SignalTarget::Window));
        host.unbind(Signal::Resize);
        self.registry.clear();
        self.state = LifecycleState::Inactive;
        info!("Lazy loading inactive");
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == LifecycleState::Active
    }

    /// Summary of the most recent validation pass.
    pub fn last_pass(&self) -> Option<PassSummary> {
        self.last_pass
    }

    pub fn registry(&self) -> &CandidateRegistry<H::Element> {
        &self.registry
    }

    pub fn viewport(&self) -> &ViewportTracker {
        &self.viewport
    }

    pub fn containers(&self) -> &[H::Element] {
        &self.containers
    }

    pub fn options(&self) -> &Options {
        self.loader.options()
    }

    pub fn src_attribute(&self) -> &str {
        self.loader.src_attribute()
    }
}

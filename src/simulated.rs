//! In-memory document used by the replay tool and the test-suite.
//!
//! Geometry is document-relative; [`Host::bounding_rect`] subtracts the window
//! scroll position and the scroll of the element's container (if any), which
//! is what a browser reports from `getBoundingClientRect`.

use log::debug;
use regex::Regex;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use crate::host::{Host, ProbeCallback, ProbeFailure, Rect, Signal};

/// Handle to an element of a [`SimulatedDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

const SRC_PROPERTY_TAGS: &[&str] = &["img", "iframe", "video", "audio", "source", "embed"];

/// Builder for elements added with [`SimulatedDocument::add_element`].
#[derive(Debug, Clone)]
pub struct ElementSpec {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    rect: Rect,
    displayed: bool,
    src_property: Option<bool>,
    container: Option<NodeId>,
}

impl ElementSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            id: None,
            classes: Vec::new(),
            attributes: BTreeMap::new(),
            rect: Rect::default(),
            displayed: true,
            src_property: None,
            container: None,
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    /// Document-relative box.
    pub fn rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    /// Rendered with zero size (`display: none`).
    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    /// Override whether the element exposes a native `src` property.
    pub fn src_property(mut self, has_src: bool) -> Self {
        self.src_property = Some(has_src);
        self
    }

    /// Place the element inside a scrollable container.
    pub fn in_container(mut self, container: NodeId) -> Self {
        self.container = Some(container);
        self
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: BTreeMap<String, String>,
    rect: Rect,
    displayed: bool,
    has_src_property: bool,
    container: Option<NodeId>,
    scroll: (f64, f64),
    src: Option<String>,
    background_image: Option<String>,
}

/// A document with a window viewport, an event-free signal registry and a
/// queue of pending image probes.
pub struct SimulatedDocument {
    nodes: Vec<Node>,
    viewport: (f64, f64),
    screen_width: f64,
    pixel_ratio: f64,
    window_scroll: (f64, f64),
    origin: Instant,
    elapsed: Duration,
    bound: Vec<Signal<NodeId>>,
    bind_calls: usize,
    unbind_calls: usize,
    pending_probes: VecDeque<(String, ProbeCallback<SimulatedDocument>)>,
    probed_urls: Vec<String>,
    broken_urls: HashSet<String>,
}

impl SimulatedDocument {
    /// A document whose viewport and screen are `width` x `height`.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            nodes: Vec::new(),
            viewport: (width, height),
            screen_width: width,
            pixel_ratio: 1.0,
            window_scroll: (0.0, 0.0),
            origin: Instant::now(),
            elapsed: Duration::ZERO,
            bound: Vec::new(),
            bind_calls: 0,
            unbind_calls: 0,
            pending_probes: VecDeque::new(),
            probed_urls: Vec::new(),
            broken_urls: HashSet::new(),
        }
    }

    pub fn add_element(&mut self, spec: ElementSpec) -> NodeId {
        let has_src_property = spec
            .src_property
            .unwrap_or_else(|| SRC_PROPERTY_TAGS.contains(&spec.tag.as_str()));
        self.nodes.push(Node {
            tag: spec.tag,
            id: spec.id,
            classes: spec.classes,
            attributes: spec.attributes,
            rect: spec.rect,
            displayed: spec.displayed,
            has_src_property,
            container: spec.container,
            scroll: (0.0, 0.0),
            src: None,
            background_image: None,
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.id.as_deref() == Some(id))
            .map(NodeId)
    }

    pub fn element_id(&self, element: &NodeId) -> Option<String> {
        self.node(element).and_then(|node| node.id.clone())
    }

    pub fn classes(&self, element: &NodeId) -> Vec<String> {
        self.node(element)
            .map(|node| node.classes.clone())
            .unwrap_or_default()
    }

    pub fn src(&self, element: &NodeId) -> Option<String> {
        self.node(element).and_then(|node| node.src.clone())
    }

    /// The `background-image` style value, e.g. `url("a.png")`.
    pub fn background_image(&self, element: &NodeId) -> Option<String> {
        self.node(element)
            .and_then(|node| node.background_image.clone())
    }

    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn set_displayed(&mut self, element: &NodeId, displayed: bool) {
        if let Some(node) = self.node_mut(element) {
            node.displayed = displayed;
        }
    }

    pub fn scroll_window_to(&mut self, x: f64, y: f64) {
        self.window_scroll = (x, y);
    }

    pub fn scroll_element_to(&mut self, container: &NodeId, x: f64, y: f64) {
        if let Some(node) = self.node_mut(container) {
            node.scroll = (x, y);
        }
    }

    pub fn resize_viewport(&mut self, width: f64, height: f64) {
        self.viewport = (width, height);
    }

    pub fn set_screen_width(&mut self, width: f64) {
        self.screen_width = width;
    }

    pub fn set_device_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = ratio;
    }

    /// Move the virtual clock forward.
    pub fn advance(&mut self, by: Duration) {
        self.elapsed += by;
    }

    /// Make every future probe of `url` fail.
    pub fn fail_url(&mut self, url: &str) {
        self.broken_urls.insert(url.to_string());
    }

    pub fn is_bound(&self, signal: &Signal<NodeId>) -> bool {
        self.bound.contains(signal)
    }

    pub fn bound_signals(&self) -> &[Signal<NodeId>] {
        &self.bound
    }

    pub fn bind_calls(&self) -> usize {
        self.bind_calls
    }

    pub fn unbind_calls(&self) -> usize {
        self.unbind_calls
    }

    pub fn pending_probes(&self) -> usize {
        self.pending_probes.len()
    }

    /// Every URL handed to [`Host::probe_image`], in order.
    pub fn probed_urls(&self) -> &[String] {
        &self.probed_urls
    }

    /// Settle all pending probes in FIFO order. Returns how many ran.
    pub fn pump_probes(&mut self) -> usize {
        let mut settled = 0;
        while let Some((url, done)) = self.pending_probes.pop_front() {
            let result = if self.broken_urls.contains(&url) {
                Err(ProbeFailure { src: url })
            } else {
                Ok(())
            };
            done(self, result);
            settled += 1;
        }
        settled
    }

    fn node(&self, element: &NodeId) -> Option<&Node> {
        self.nodes.get(element.0)
    }

    fn node_mut(&mut self, element: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(element.0)
    }

    fn scroll_offset_of(&self, node: &Node) -> (f64, f64) {
        let (mut dx, mut dy) = self.window_scroll;
        let mut container = node.container;
        while let Some(id) = container {
            let Some(parent) = self.node(&id) else { break };
            dx += parent.scroll.0;
            dy += parent.scroll.1;
            container = parent.container;
        }
        (dx, dy)
    }
}

static COMPOUND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*|[A-Za-z][A-Za-z0-9-]*)?((?:[.#][A-Za-z0-9_-]+|\[[A-Za-z0-9_-]+\])*)$")
        .expect("Failed to compile compound selector regex")
});

static PART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([.#])([A-Za-z0-9_-]+)|\[([A-Za-z0-9_-]+)\]")
        .expect("Failed to compile selector part regex")
});

/// One simple compound selector: `tag#id.class[attr]`.
#[derive(Debug, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<String>,
}

impl Compound {
    fn matches(&self, node: &Node) -> bool {
        self.tag.as_ref().is_none_or(|tag| node.tag == *tag)
            && self
                .id
                .as_ref()
                .is_none_or(|id| node.id.as_deref() == Some(id.as_str()))
            && self.classes.iter().all(|class| node.classes.contains(class))
            && self
                .attributes
                .iter()
                .all(|attr| node.attributes.contains_key(attr))
    }
}

/// Parse a comma-separated selector list. `None` if any part is unsupported.
fn parse_selector(selector: &str) -> Option<Vec<Compound>> {
    let mut compounds = Vec::new();
    for raw in selector.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let caps = COMPOUND_RE.captures(raw)?;
        let mut compound = Compound {
            tag: caps
                .get(1)
                .map(|m| m.as_str().to_ascii_lowercase())
                .filter(|tag| tag != "*"),
            ..Compound::default()
        };
        let parts = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        for part in PART_RE.captures_iter(parts) {
            if let Some(attr) = part.get(3) {
                compound.attributes.push(attr.as_str().to_string());
                continue;
            }
            let value = part[2].to_string();
            match &part[1] {
                "#" => compound.id = Some(value),
                _ => compound.classes.push(value),
            }
        }
        compounds.push(compound);
    }
    Some(compounds)
}

impl Host for SimulatedDocument {
    type Element = NodeId;

    fn query_selector_all(&self, selector: &str) -> Vec<NodeId> {
        let Some(compounds) = parse_selector(selector) else {
            debug!("Unsupported selector '{selector}', matching nothing");
            return Vec::new();
        };
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| compounds.iter().any(|c| c.matches(node)))
            .map(|(index, _)| NodeId(index))
            .collect()
    }

    fn bounding_rect(&self, element: &NodeId) -> Rect {
        let Some(node) = self.node(element) else {
            return Rect::default();
        };
        if !node.displayed {
            return Rect::default();
        }
        let (dx, dy) = self.scroll_offset_of(node);
        node.rect.translate(-dx, -dy)
    }

    fn offset_size(&self, element: &NodeId) -> (f64, f64) {
        match self.node(element) {
            Some(node) if node.displayed => (node.rect.width(), node.rect.height()),
            _ => (0.0, 0.0),
        }
    }

    fn attribute(&self, element: &NodeId, name: &str) -> Option<String> {
        self.node(element)
            .and_then(|node| node.attributes.get(name).cloned())
    }

    fn remove_attribute(&mut self, element: &NodeId, name: &str) {
        if let Some(node) = self.node_mut(element) {
            node.attributes.remove(name);
        }
    }

    fn has_class(&self, element: &NodeId, class: &str) -> bool {
        self.node(element)
            .is_some_and(|node| node.classes.iter().any(|c| c == class))
    }

    fn add_class(&mut self, element: &NodeId, class: &str) {
        if let Some(node) = self.node_mut(element) {
            if !node.classes.iter().any(|c| c == class) {
                node.classes.push(class.to_string());
            }
        }
    }

    fn is_image(&self, element: &NodeId) -> bool {
        self.node(element).is_some_and(|node| node.tag == "img")
    }

    fn has_src_property(&self, element: &NodeId) -> bool {
        self.node(element).is_some_and(|node| node.has_src_property)
    }

    fn set_src(&mut self, element: &NodeId, src: &str) {
        if let Some(node) = self.node_mut(element) {
            node.src = Some(src.to_string());
        }
    }

    fn set_background_image(&mut self, element: &NodeId, src: &str) {
        if let Some(node) = self.node_mut(element) {
            node.background_image = Some(format!("url(\"{src}\")"));
        }
    }

    fn viewport_size(&self) -> (f64, f64) {
        self.viewport
    }

    fn screen_width(&self) -> f64 {
        self.screen_width
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn now(&self) -> Instant {
        self.origin + self.elapsed
    }

    fn bind(&mut self, signal: Signal<NodeId>) {
        self.bind_calls += 1;
        self.bound.push(signal);
    }

    // One listener per bind, so instances sharing a signal unbind independently
    fn unbind(&mut self, signal: Signal<NodeId>) {
        self.unbind_calls += 1;
        if let Some(index) = self.bound.iter().position(|bound| *bound == signal) {
            self.bound.remove(index);
        }
    }

    fn probe_image(&mut self, src: &str, done: ProbeCallback<Self>) {
        self.probed_urls.push(src.to_string());
        self.pending_probes.push_back((src.to_string(), done));
    }
}

//! Scripted replays of a page against a [`SimulatedDocument`].
//!
//! A scenario lists the page's elements and a sequence of user actions. The
//! replay dispatches scroll and resize signals only while the loader has them
//! bound, the way a browser event loop would.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::config::{Callbacks, Options};
use crate::error::{LoadError, ScenarioError};
use crate::host::{Host, Rect, Signal, SignalTarget};
use crate::lifecycle::LazyLoader;
use crate::simulated::{ElementSpec, NodeId, SimulatedDocument};
use crate::validator::PassSummary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementDef {
    pub id: String,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub hidden: bool,
    /// Id of a previously declared scroll container.
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub src_property: Option<bool>,
}

fn default_tag() -> String {
    "img".to_string()
}

fn default_pixel_ratio() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Scroll {
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    },
    ScrollContainer {
        id: String,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
    },
    Resize {
        width: f64,
        height: f64,
    },
    Advance {
        ms: u64,
    },
    Pump,
    Load {
        selector: String,
        #[serde(default)]
        force: bool,
    },
    Revalidate,
    Destroy,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Scroll { x, y } => write!(f, "scroll to ({x}, {y})"),
            Step::ScrollContainer { id, x, y } => write!(f, "scroll #{id} to ({x}, {y})"),
            Step::Resize { width, height } => write!(f, "resize to {width}x{height}"),
            Step::Advance { ms } => write!(f, "advance {ms}ms"),
            Step::Pump => write!(f, "settle probes"),
            Step::Load { selector, force } => {
                write!(f, "load '{selector}'")?;
                if *force {
                    write!(f, " (forced)")?;
                }
                Ok(())
            }
            Step::Revalidate => write!(f, "revalidate"),
            Step::Destroy => write!(f, "destroy"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    pub viewport: Size,
    /// Defaults to the viewport width.
    #[serde(default)]
    pub screen_width: Option<f64>,
    #[serde(default = "default_pixel_ratio")]
    pub pixel_ratio: f64,
    #[serde(default)]
    pub broken_urls: Vec<String>,
    #[serde(default)]
    pub options: Option<Options>,
    pub elements: Vec<ElementDef>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_yaml_str(content: &str) -> Result<Self, ScenarioError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Build the document described by this scenario.
    pub fn build_document(&self) -> Result<SimulatedDocument, ScenarioError> {
        let mut doc = SimulatedDocument::new(self.viewport.width, self.viewport.height);
        doc.set_screen_width(self.screen_width.unwrap_or(self.viewport.width));
        doc.set_device_pixel_ratio(self.pixel_ratio);
        for url in &self.broken_urls {
            doc.fail_url(url);
        }

        let mut seen = HashSet::new();
        for def in &self.elements {
            if !seen.insert(def.id.as_str()) {
                return Err(ScenarioError::DuplicateId(def.id.clone()));
            }
            let mut spec = ElementSpec::new(&def.tag)
                .id(&def.id)
                .rect(Rect::from_origin_size(def.x, def.y, def.width, def.height));
            for class in &def.classes {
                spec = spec.class(class);
            }
            for (name, value) in &def.attributes {
                spec = spec.attr(name, value);
            }
            if def.hidden {
                spec = spec.hidden();
            }
            if let Some(has_src) = def.src_property {
                spec = spec.src_property(has_src);
            }
            if let Some(container) = &def.container {
                let parent = doc
                    .find_by_id(container)
                    .ok_or_else(|| ScenarioError::UnknownElement(container.clone()))?;
                spec = spec.in_container(parent);
            }
            doc.add_element(spec);
        }
        Ok(doc)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Missing,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackEvent {
    pub element: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: String,
    /// Whether a validation pass ran (`false` when throttled or unbound).
    pub validated: bool,
    pub loaded: usize,
    pub registry: usize,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementState {
    pub id: String,
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub src_attribute: String,
    pub steps: Vec<StepReport>,
    pub events: Vec<CallbackEvent>,
    pub elements: Vec<ElementState>,
}

/// Run `scenario` to completion. `options` overrides the scenario's own.
pub fn replay(
    scenario: &Scenario,
    options: Option<Options>,
) -> Result<ReplayReport, ScenarioError> {
    let mut doc = scenario.build_document()?;
    let options = options
        .or_else(|| scenario.options.clone())
        .unwrap_or_default();

    let events: Rc<RefCell<Vec<(NodeId, Outcome)>>> = Rc::default();
    let on_success = events.clone();
    let on_error = events.clone();
    let callbacks = Callbacks::new()
        .on_success(move |element: &NodeId| {
            on_success.borrow_mut().push((*element, Outcome::Success))
        })
        .on_error(move |element: &NodeId, error: &LoadError| {
            let outcome = match error {
                LoadError::Missing => Outcome::Missing,
                LoadError::Invalid { .. } => Outcome::Invalid,
            };
            on_error.borrow_mut().push((*element, outcome))
        });

    info!(
        "Replaying scenario {:?} ({} elements, {} steps)",
        scenario.name,
        scenario.elements.len(),
        scenario.steps.len()
    );

    let mut lazy = LazyLoader::with_callbacks(&mut doc, options, callbacks);
    let mut steps = vec![StepReport {
        step: "start".to_string(),
        validated: true,
        loaded: lazy.last_pass().map(|pass| pass.loaded).unwrap_or(0),
        registry: lazy.registry().len(),
        active: lazy.is_active(),
    }];

    for step in &scenario.steps {
        debug!("Step: {step}");
        let summary = run_step(&mut doc, &mut lazy, step)?;
        steps.push(StepReport {
            step: step.to_string(),
            validated: summary.is_some(),
            loaded: summary.map(|s| s.loaded).unwrap_or(0),
            registry: lazy.registry().len(),
            active: lazy.is_active(),
        });
    }

    let settled = doc.pump_probes();
    if settled > 0 {
        debug!("Settled {settled} outstanding probes");
    }

    let label = |doc: &SimulatedDocument, element: &NodeId| {
        doc.element_id(element)
            .unwrap_or_else(|| format!("#{}", element.0))
    };
    let events: Vec<CallbackEvent> = events
        .borrow()
        .iter()
        .map(|(element, outcome)| CallbackEvent {
            element: label(&doc, element),
            outcome: outcome.clone(),
        })
        .collect();
    let elements: Vec<ElementState> = doc
        .elements()
        .map(|element| ElementState {
            id: label(&doc, &element),
            classes: doc.classes(&element),
            src: doc.src(&element),
            background_image: doc.background_image(&element),
        })
        .collect();

    Ok(ReplayReport {
        name: scenario.name.clone(),
        src_attribute: lazy.src_attribute().to_string(),
        steps,
        events,
        elements,
    })
}

fn run_step(
    doc: &mut SimulatedDocument,
    lazy: &mut LazyLoader<SimulatedDocument>,
    step: &Step,
) -> Result<Option<PassSummary>, ScenarioError> {
    let summary = match step {
        Step::Scroll { x, y } => {
            doc.scroll_window_to(*x, *y);
            let target = SignalTarget::Window;
            if doc.is_bound(&Signal::Scroll(target.clone())) {
                lazy.on_scroll(doc, &target)
            } else {
                None
            }
        }
        Step::ScrollContainer { id, x, y } => {
            let container = doc
                .find_by_id(id)
                .ok_or_else(|| ScenarioError::UnknownElement(id.clone()))?;
            doc.scroll_element_to(&container, *x, *y);
            let target = SignalTarget::Element(container);
            if doc.is_bound(&Signal::Scroll(target.clone())) {
                lazy.on_scroll(doc, &target)
            } else {
                None
            }
        }
        Step::Resize { width, height } => {
            doc.resize_viewport(*width, *height);
            if doc.is_bound(&Signal::Resize) {
                lazy.on_resize(doc)
            } else {
                None
            }
        }
        Step::Advance { ms } => {
            doc.advance(Duration::from_millis(*ms));
            None
        }
        Step::Pump => {
            doc.pump_probes();
            None
        }
        Step::Load { selector, force } => {
            let elements = doc.query_selector_all(selector);
            lazy.load_all(doc, &elements, *force);
            None
        }
        Step::Revalidate => Some(lazy.revalidate(doc)),
        Step::Destroy => {
            lazy.destroy(doc);
            None
        }
    };
    Ok(summary)
}

impl fmt::Display for ReplayReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            writeln!(f, "Scenario: {name}")?;
        }
        writeln!(f, "Source attribute: {}", self.src_attribute)?;
        writeln!(f)?;
        writeln!(f, "Steps:")?;
        for (index, step) in self.steps.iter().enumerate() {
            let pass = if step.validated {
                format!("loaded {}", step.loaded)
            } else {
                "no pass".to_string()
            };
            let state = if step.active { "active" } else { "inactive" };
            writeln!(
                f,
                "  {index:>3}. {:<32} {:<10} pending {:<4} {state}",
                step.step, pass, step.registry
            )?;
        }
        writeln!(f)?;
        writeln!(f, "Callbacks:")?;
        if self.events.is_empty() {
            writeln!(f, "  (none)")?;
        }
        for event in &self.events {
            let outcome = match event.outcome {
                Outcome::Success => "success",
                Outcome::Missing => "error: missing",
                Outcome::Invalid => "error: invalid",
            };
            writeln!(f, "  {:<16} {outcome}", event.element)?;
        }
        writeln!(f)?;
        writeln!(f, "Elements:")?;
        for element in &self.elements {
            let source = element
                .src
                .as_deref()
                .or(element.background_image.as_deref())
                .unwrap_or("-");
            writeln!(
                f,
                "  {:<16} [{}] {source}",
                element.id,
                element.classes.join(" ")
            )?;
        }
        Ok(())
    }
}

use log::{debug, warn};

use crate::config::{Callbacks, Options};
use crate::error::LoadError;
use crate::host::{Host, ProbeResult};

/// Pick the source for the current display out of a `standard|high-density`
/// list. A single entry is used regardless of density.
pub fn select_source<'a>(data_src: &'a str, separator: &str, high_density: bool) -> &'a str {
    let sources: Vec<&str> = data_src.split(separator).collect();
    let index = if high_density && sources.len() > 1 { 1 } else { 0 };
    sources[index]
}

/// Promotes an element's deferred source to a live one.
///
/// The attribute name and pixel density are captured once at construction;
/// a new loader must be built to pick up a different screen.
pub struct Loader<H: Host> {
    options: Options,
    src_attribute: String,
    high_density: bool,
    callbacks: Callbacks<H::Element>,
}

impl<H: Host> Loader<H> {
    pub fn new(host: &H, options: Options, callbacks: Callbacks<H::Element>) -> Self {
        let src_attribute = options
            .resolve_src_attribute(host.screen_width())
            .to_string();
        let high_density = host.device_pixel_ratio() > 1.0;
        debug!(
            "Loader reads '{}' (high density: {})",
            src_attribute, high_density
        );
        Self {
            options,
            src_attribute,
            high_density,
            callbacks,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Attribute chosen by the breakpoint table for this screen.
    pub fn src_attribute(&self) -> &str {
        &self.src_attribute
    }

    pub fn is_high_density(&self) -> bool {
        self.high_density
    }

    pub fn is_loaded(&self, host: &H, element: &H::Element) -> bool {
        host.has_class(element, &self.options.success_class)
    }

    /// Load `element` if it is visible, `force` is set on an unloaded element,
    /// or invisible loading is enabled. Failures surface only through the
    /// error class and callback.
    pub fn load(&self, host: &mut H, element: &H::Element, force: bool) {
        if !self.should_load(host, element, force) {
            return;
        }

        let Some(data_src) = self.read_data_src(host, element) else {
            warn!("No deferred source on {element:?}");
            mark_error(
                host,
                element,
                &self.options.error_class,
                &self.callbacks,
                LoadError::Missing,
            );
            return;
        };

        let src = select_source(&data_src, &self.options.separator, self.high_density).to_string();
        for attribute in self.options.all_src_attributes() {
            host.remove_attribute(element, attribute);
        }

        let is_image = host.is_image(element);
        if is_image || !host.has_src_property(element) {
            self.probe(host, element, &src, is_image);
        }

        // Assigned before the probe settles; markers and callbacks wait for it
        if is_image || host.has_src_property(element) {
            host.set_src(element, &src);
        }
    }

    fn should_load(&self, host: &H, element: &H::Element, force: bool) -> bool {
        if force && !self.is_loaded(host, element) {
            return true;
        }
        if self.options.load_invisible {
            return true;
        }
        let (width, height) = host.offset_size(element);
        width > 0.0 && height > 0.0
    }

    fn read_data_src(&self, host: &H, element: &H::Element) -> Option<String> {
        host.attribute(element, &self.src_attribute)
            .filter(|value| !value.is_empty())
            .or_else(|| host.attribute(element, &self.options.src))
            .filter(|value| !value.is_empty())
    }

    fn probe(&self, host: &mut H, element: &H::Element, src: &str, is_image: bool) {
        debug!("Probing {src} for {element:?}");
        let element = element.clone();
        let src = src.to_string();
        let success_class = self.options.success_class.clone();
        let error_class = self.options.error_class.clone();
        let callbacks = self.callbacks.clone();

        let probe_src = src.clone();
        host.probe_image(
            &probe_src,
            Box::new(move |host: &mut H, result: ProbeResult| match result {
                Ok(()) => {
                    if is_image {
                        host.set_src(&element, &src);
                    } else {
                        host.set_background_image(&element, &src);
                    }
                    host.add_class(&element, &success_class);
                    debug!("Loaded {src} for {element:?}");
                    callbacks.success(&element);
                }
                Err(failure) => {
                    warn!("Failed to load {} for {element:?}", failure.src);
                    mark_error(
                        host,
                        &element,
                        &error_class,
                        &callbacks,
                        LoadError::Invalid { src: failure.src },
                    );
                }
            }),
        );
    }
}

fn mark_error<H: Host>(
    host: &mut H,
    element: &H::Element,
    error_class: &str,
    callbacks: &Callbacks<H::Element>,
    error: LoadError,
) {
    callbacks.error(element, &error);
    host.add_class(element, error_class);
}

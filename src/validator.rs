use log::debug;

use crate::host::Host;
use crate::loader::Loader;
use crate::registry::CandidateRegistry;
use crate::viewport::ViewportTracker;

/// What one validation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Candidates handed to the loader.
    pub loaded: usize,
    /// Candidates dropped because they already carried the success class.
    pub pruned: usize,
    /// Candidates still waiting afterwards.
    pub remaining: usize,
}

/// Scan every candidate once, loading those inside the expanded viewport and
/// pruning those loaded by other means.
///
/// Candidates are visited in document order. Elements that already carry the
/// success class are removed without touching the loader again.
pub fn validate<H: Host>(
    host: &mut H,
    registry: &mut CandidateRegistry<H::Element>,
    viewport: &ViewportTracker,
    loader: &Loader<H>,
) -> PassSummary {
    let mut summary = PassSummary::default();

    for index in (0..registry.len()).rev() {
        let Some(element) = registry.get(index) else {
            continue;
        };

        if loader.is_loaded(host, element) {
            registry.remove(index);
            summary.pruned += 1;
            continue;
        }

        if viewport.contains(&host.bounding_rect(element)) {
            let element = registry.remove(index);
            loader.load(host, &element, false);
            summary.loaded += 1;
        }
    }

    summary.remaining = registry.len();
    debug!(
        "Validation pass: {} loaded, {} pruned, {} remaining",
        summary.loaded, summary.pruned, summary.remaining
    );
    summary
}

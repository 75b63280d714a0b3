use queuewatch_core::AlertDecision;
use tracing::warn;

use crate::surface::Surface;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    Audible,
    Visual,
    /// Audible delivery failed and the visual fallback was shown instead.
    Degraded,
}

/// Hand an alert decision to the surface. Never fails: a playback error falls
/// back to the visual indicator.
pub fn deliver(surface: &dyn Surface, decision: &AlertDecision) -> Delivery {
    match decision {
        AlertDecision::VisualOnly(event) => {
            surface.on_visual_fallback(event);
            Delivery::Visual
        }
        AlertDecision::Audible(event) => match surface.on_alert(event) {
            Ok(()) => Delivery::Audible,
            Err(e) => {
                warn!("{e}; falling back to visual alert");
                surface.on_visual_fallback(event);
                Delivery::Degraded
            }
        },
    }
}

use serde::{Deserialize, Serialize};

use crate::ids::ItemId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSuppression {
    pub manually_muted: bool,
    /// Driven by an external busy/on-call signal.
    pub externally_suppressed: bool,
}

impl AlertSuppression {
    pub fn is_suppressed(&self) -> bool {
        self.manually_muted || self.externally_suppressed
    }
}

/// One alert per poll, however many items arrived.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub count: usize,
    pub ids: Vec<ItemId>,
}

impl AlertEvent {
    pub fn new(ids: Vec<ItemId>) -> Self {
        Self {
            count: ids.len(),
            ids,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AlertDecision {
    /// Sound, flash and (if permitted) desktop notification.
    Audible(AlertEvent),
    /// Title/tab style indicator only.
    VisualOnly(AlertEvent),
}

impl AlertDecision {
    pub fn event(&self) -> &AlertEvent {
        match self {
            AlertDecision::Audible(e) | AlertDecision::VisualOnly(e) => e,
        }
    }
}

/// Decide how a batch of additions is announced. `None` when nothing was added.
pub fn gate(suppression: AlertSuppression, added: &[ItemId]) -> Option<AlertDecision> {
    if added.is_empty() {
        return None;
    }
    let event = AlertEvent::new(added.to_vec());
    if suppression.is_suppressed() {
        Some(AlertDecision::VisualOnly(event))
    } else {
        Some(AlertDecision::Audible(event))
    }
}

use serde::{Deserialize, Serialize};

/// Foreground/background state of the host context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Foreground,
    Background,
}

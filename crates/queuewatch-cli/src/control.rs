use anyhow::{bail, Result};

/// One line typed on stdin while `queuewatch run` is active.
#[derive(Debug, PartialEq, Eq)]
pub enum Control {
    Foreground,
    Background,
    Mute,
    Unmute,
    Busy,
    Free,
    Sound(String),
    /// Play the selected sound once.
    Test,
    Status,
    Quit,
}

pub const HELP: &str = "commands: fg | bg | mute | unmute | busy | free | sound <key> | test | status | quit";

/// Blank lines parse to `None`.
pub fn parse_control(line: &str) -> Result<Option<Control>> {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    if words.next().is_some() {
        bail!("too many arguments; {HELP}");
    }
    let control = match (cmd.to_ascii_lowercase().as_str(), arg) {
        ("fg" | "foreground", None) => Control::Foreground,
        ("bg" | "background", None) => Control::Background,
        ("mute", None) => Control::Mute,
        ("unmute", None) => Control::Unmute,
        ("busy", None) => Control::Busy,
        ("free", None) => Control::Free,
        ("sound", Some(key)) => Control::Sound(key.to_string()),
        ("sound", None) => bail!("usage: sound <key> (see `queuewatch sounds`)"),
        ("test", None) => Control::Test,
        ("status", None) => Control::Status,
        ("quit" | "exit", None) => Control::Quit,
        _ => bail!("unknown command {line:?}; {HELP}"),
    };
    Ok(Some(control))
}

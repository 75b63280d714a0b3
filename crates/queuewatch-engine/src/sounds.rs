/// A selectable alert sound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlertSound {
    pub key: &'static str,
    pub name: &'static str,
    pub file: &'static str,
}

impl AlertSound {
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.file)
    }
}

pub const DEFAULT_SOUND: &str = "cow";

pub const SOUNDS: &[AlertSound] = &[
    AlertSound { key: "cow", name: "Cow Moo", file: "cow-moo.mp3" },
    AlertSound { key: "guitar", name: "Guitar Alert", file: "guitaralert.wav" },
    AlertSound { key: "beep", name: "Beep", file: "Beep.wav" },
    AlertSound { key: "scratch", name: "Scratch", file: "scratch-389.mp3" },
    AlertSound { key: "stars", name: "Stars", file: "Stars.mp3" },
    AlertSound { key: "sting", name: "Sting", file: "sting.mp3" },
    AlertSound { key: "uhoh", name: "Uh Oh", file: "uhoh.mp3" },
    AlertSound { key: "fatality", name: "MoKo", file: "fatality.mp3" },
    AlertSound { key: "pacman", name: "Pac-Man", file: "pacman.mp3" },
    AlertSound { key: "sfperfect", name: "SF Perfect", file: "sfperfect.mp3" },
    AlertSound { key: "mgs-alert", name: "MGS Alert", file: "mgsAlert.mp3" },
    AlertSound { key: "hey-listen", name: "Listen", file: "HeyListen.mp3" },
    AlertSound { key: "infant", name: "DCC Infant", file: "infant.mp3" },
    AlertSound { key: "reward", name: "DCC Reward", file: "reward.mp3" },
    AlertSound { key: "what-happened", name: "DCC What Happened", file: "whathappened.mp3" },
];

pub fn find(key: &str) -> Option<&'static AlertSound> {
    SOUNDS.iter().find(|s| s.key.eq_ignore_ascii_case(key))
}

pub fn default_sound() -> &'static AlertSound {
    &SOUNDS[0]
}

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// One of the four thumb-shift keys a profile configures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ThumbSide {
    Left,
    Right,
    Ext1,
    Ext2,
}

impl ThumbSide {
    pub const ALL: [ThumbSide; 4] = [
        ThumbSide::Left,
        ThumbSide::Right,
        ThumbSide::Ext1,
        ThumbSide::Ext2,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ThumbSide::Left => "left",
            ThumbSide::Right => "right",
            ThumbSide::Ext1 => "ext1",
            ThumbSide::Ext2 => "ext2",
        }
    }
}

impl fmt::Display for ThumbSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThumbSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(ThumbSide::Left),
            "right" => Ok(ThumbSide::Right),
            "ext1" => Ok(ThumbSide::Ext1),
            "ext2" => Ok(ThumbSide::Ext2),
            other => Err(format!("unknown thumb side: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThumbKeySelect {
    None,
    Esc,
    Tab,
    Muhenkan,
    Space,
    Henkan,
    Enter,
    BackSpace,
    Delete,
    Insert,
    Up,
    Left,
    Right,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    LeftShift,
    RightShift,
    LeftCtrl,
    RightCtrl,
    Extended1,
    Extended2,
    Extended3,
    Extended4,
}

/// What a thumb key does when pressed and released alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SinglePress {
    #[serde(rename = "None")]
    Disable,
    Enable,
    PrefixShift,
    SpaceKey,
}

impl SinglePress {
    /// Key repeat only has an effect when the key still emits itself.
    pub fn allows_repeat(self) -> bool {
        matches!(self, SinglePress::Enable | SinglePress::SpaceKey)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImeMode {
    Auto,
    Tsf,
    Imm,
    Ignore,
    /// Engine-side override; not offered by the form but kept on save.
    ForceAlpha,
}

impl Default for ImeMode {
    fn default() -> Self {
        Self::Auto
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuspendKey {
    None,
    ScrollLock,
    Pause,
    Insert,
    RightShift,
    RightControl,
    RightAlt,
}

impl Default for SuspendKey {
    fn default() -> Self {
        Self::None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbSideConfig {
    pub key: ThumbKeySelect,
    pub continuous: bool,
    pub single_press: SinglePress,
    pub repeat: bool,
}

impl ThumbSideConfig {
    fn with_key(key: ThumbKeySelect) -> Self {
        Self {
            key,
            ..Self::default()
        }
    }
}

impl Default for ThumbSideConfig {
    fn default() -> Self {
        Self {
            key: ThumbKeySelect::None,
            continuous: false,
            single_press: SinglePress::Disable,
            repeat: false,
        }
    }
}

/// The configuration document mirrored from the backend.
///
/// Only the fields the settings surface edits are typed. Everything else the
/// backend sends is kept in `extra` and written back verbatim, so a save
/// never drops engine settings this client does not know about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub thumb_left: ThumbSideConfig,
    pub thumb_right: ThumbSideConfig,
    pub extended_thumb1: ThumbSideConfig,
    pub extended_thumb2: ThumbSideConfig,
    #[serde(default = "default_overlap_ratio")]
    pub thumb_shift_overlap_ratio: f64,

    pub char_key_repeat_assigned: bool,
    #[serde(default = "default_char_key_repeat_unassigned")]
    pub char_key_repeat_unassigned: bool,
    pub char_key_continuous: bool,
    #[serde(default = "default_overlap_ratio")]
    pub char_key_overlap_ratio: f64,

    pub ime_mode: ImeMode,
    pub suspend_key: SuspendKey,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_overlap_ratio() -> f64 {
    0.35
}

fn default_char_key_repeat_unassigned() -> bool {
    true
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            thumb_left: ThumbSideConfig::with_key(ThumbKeySelect::Muhenkan),
            thumb_right: ThumbSideConfig::with_key(ThumbKeySelect::Henkan),
            extended_thumb1: ThumbSideConfig::with_key(ThumbKeySelect::Extended1),
            extended_thumb2: ThumbSideConfig::with_key(ThumbKeySelect::Extended2),
            thumb_shift_overlap_ratio: 0.35,

            char_key_repeat_assigned: false,
            char_key_repeat_unassigned: true,
            char_key_continuous: false,
            char_key_overlap_ratio: 0.35,

            ime_mode: ImeMode::Auto,
            suspend_key: SuspendKey::None,

            extra: Map::new(),
        }
    }
}

impl Profile {
    pub fn thumb(&self, side: ThumbSide) -> &ThumbSideConfig {
        match side {
            ThumbSide::Left => &self.thumb_left,
            ThumbSide::Right => &self.thumb_right,
            ThumbSide::Ext1 => &self.extended_thumb1,
            ThumbSide::Ext2 => &self.extended_thumb2,
        }
    }

    pub fn thumb_mut(&mut self, side: ThumbSide) -> &mut ThumbSideConfig {
        match side {
            ThumbSide::Left => &mut self.thumb_left,
            ThumbSide::Right => &mut self.thumb_right,
            ThumbSide::Ext1 => &mut self.extended_thumb1,
            ThumbSide::Ext2 => &mut self.extended_thumb2,
        }
    }
}

/// Stored ratio -> form percentage.
pub fn ratio_to_percent(ratio: f64) -> u8 {
    // NaN saturates to 0 in the cast
    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Form percentage -> stored ratio.
pub fn percent_to_ratio(percent: u8) -> f64 {
    f64::from(percent) / 100.0
}

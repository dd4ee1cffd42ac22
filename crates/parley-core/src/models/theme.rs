//! Bot colour themes.
//!
//! A theme is a flat palette of `#rrggbb` colours. Themes either come from
//! the preset table below or are hand-edited, in which case `preset` is
//! [`CUSTOM_PRESET`].

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const DEFAULT_PRESET: &str = "default";

pub const CUSTOM_PRESET: &str = "custom";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub preset: String,
    pub primary: String,
    pub secondary: String,
    pub background: String,
    pub foreground: String,
    pub chat_bg: String,
    pub user_bubble: String,
    pub user_text: String,
    pub bot_bubble: String,
    pub bot_text: String,
}

/// Palette slots that can be edited individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeColor {
    Primary,
    Secondary,
    Background,
    Foreground,
    ChatBg,
    UserBubble,
    UserText,
    BotBubble,
    BotText,
}

impl ThemeColor {
    pub const ALL: [ThemeColor; 9] = [
        ThemeColor::Primary,
        ThemeColor::Secondary,
        ThemeColor::Background,
        ThemeColor::Foreground,
        ThemeColor::ChatBg,
        ThemeColor::UserBubble,
        ThemeColor::UserText,
        ThemeColor::BotBubble,
        ThemeColor::BotText,
    ];

    pub fn field_name(self) -> &'static str {
        match self {
            ThemeColor::Primary => "primary",
            ThemeColor::Secondary => "secondary",
            ThemeColor::Background => "background",
            ThemeColor::Foreground => "foreground",
            ThemeColor::ChatBg => "chat_bg",
            ThemeColor::UserBubble => "user_bubble",
            ThemeColor::UserText => "user_text",
            ThemeColor::BotBubble => "bot_bubble",
            ThemeColor::BotText => "bot_text",
        }
    }
}

/// (key, label, palette) for every built-in preset, in display order.
/// Palette order follows [`ThemeColor::ALL`].
const PRESETS: &[(&str, &str, [&str; 9])] = &[
    (
        "default",
        "Default",
        [
            "#2563eb", "#1e40af", "#ffffff", "#111827", "#f9fafb", "#2563eb", "#ffffff",
            "#ffffff", "#111827",
        ],
    ),
    (
        "ocean",
        "Ocean",
        [
            "#0e7490", "#155e75", "#f0fdfa", "#134e4a", "#ecfeff", "#0891b2", "#ffffff",
            "#ffffff", "#134e4a",
        ],
    ),
    (
        "forest",
        "Forest",
        [
            "#15803d", "#166534", "#f7fee7", "#14532d", "#f0fdf4", "#16a34a", "#ffffff",
            "#ffffff", "#14532d",
        ],
    ),
    (
        "sunset",
        "Sunset",
        [
            "#ea580c", "#c2410c", "#fff7ed", "#431407", "#ffedd5", "#f97316", "#ffffff",
            "#ffffff", "#431407",
        ],
    ),
    (
        "rose",
        "Rose",
        [
            "#e11d48", "#be123c", "#fff1f2", "#4c0519", "#ffe4e6", "#f43f5e", "#ffffff",
            "#ffffff", "#4c0519",
        ],
    ),
    (
        "midnight",
        "Midnight",
        [
            "#6366f1", "#4338ca", "#0f172a", "#e2e8f0", "#1e293b", "#6366f1", "#ffffff",
            "#334155", "#e2e8f0",
        ],
    ),
];

impl Default for Theme {
    fn default() -> Self {
        Self::from_palette(DEFAULT_PRESET, &PRESETS[0].2)
    }
}

impl Theme {
    /// Look up a built-in preset by key.
    pub fn preset(key: &str) -> Result<Self, CoreError> {
        PRESETS
            .iter()
            .find(|(k, _, _)| *k == key)
            .map(|(k, _, palette)| Self::from_palette(k, palette))
            .ok_or_else(|| CoreError::UnknownPreset(key.to_string()))
    }

    /// `(key, label)` pairs of every built-in preset.
    pub fn preset_names() -> impl Iterator<Item = (&'static str, &'static str)> {
        PRESETS.iter().map(|(key, label, _)| (*key, *label))
    }

    fn from_palette(key: &str, palette: &[&str; 9]) -> Self {
        Self {
            preset: key.to_string(),
            primary: palette[0].to_string(),
            secondary: palette[1].to_string(),
            background: palette[2].to_string(),
            foreground: palette[3].to_string(),
            chat_bg: palette[4].to_string(),
            user_bubble: palette[5].to_string(),
            user_text: palette[6].to_string(),
            bot_bubble: palette[7].to_string(),
            bot_text: palette[8].to_string(),
        }
    }

    pub fn color(&self, slot: ThemeColor) -> &str {
        match slot {
            ThemeColor::Primary => &self.primary,
            ThemeColor::Secondary => &self.secondary,
            ThemeColor::Background => &self.background,
            ThemeColor::Foreground => &self.foreground,
            ThemeColor::ChatBg => &self.chat_bg,
            ThemeColor::UserBubble => &self.user_bubble,
            ThemeColor::UserText => &self.user_text,
            ThemeColor::BotBubble => &self.bot_bubble,
            ThemeColor::BotText => &self.bot_text,
        }
    }

    /// Replace one colour. Any manual edit turns the theme into a custom one.
    pub fn set_color(&mut self, slot: ThemeColor, value: impl Into<String>) {
        let value = value.into();
        match slot {
            ThemeColor::Primary => self.primary = value,
            ThemeColor::Secondary => self.secondary = value,
            ThemeColor::Background => self.background = value,
            ThemeColor::Foreground => self.foreground = value,
            ThemeColor::ChatBg => self.chat_bg = value,
            ThemeColor::UserBubble => self.user_bubble = value,
            ThemeColor::UserText => self.user_text = value,
            ThemeColor::BotBubble => self.bot_bubble = value,
            ThemeColor::BotText => self.bot_text = value,
        }
        self.preset = CUSTOM_PRESET.to_string();
    }

    /// Check that every slot holds a `#rrggbb` colour.
    pub fn validate(&self) -> Result<(), CoreError> {
        for slot in ThemeColor::ALL {
            let value = self.color(slot);
            if !is_hex_color(value) {
                return Err(CoreError::InvalidColor {
                    field: slot.field_name(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

//! User-facing presentation settings.
//!
//! Settings are a plain value owned by whoever renders. There is no process-wide theme: a
//! renderer receives the `Settings` it should use, and toggling produces a new value that the
//! owner stores.

use crossterm::style::{Attribute, Color, ContentStyle};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Colour scheme for rendered output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Terminal styling used by renderers for this theme.
    pub fn palette(&self) -> Palette {
        let (heading, muted) = match self {
            Theme::Light => (Color::DarkBlue, Color::DarkGrey),
            Theme::Dark => (Color::Cyan, Color::Grey),
        };
        Palette {
            heading: ContentStyle {
                foreground_color: Some(heading),
                attributes: Attribute::Bold.into(),
                ..ContentStyle::new()
            },
            muted: ContentStyle {
                foreground_color: Some(muted),
                ..ContentStyle::new()
            },
            styled: true,
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme '{other}' (expected light or dark)")),
        }
    }
}

/// Text styles for one theme.
///
/// A plain palette renders text unchanged, for output that is not a terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    heading: ContentStyle,
    muted: ContentStyle,
    styled: bool,
}

impl Palette {
    #[must_use]
    pub fn plain(self) -> Self {
        Self {
            styled: false,
            ..self
        }
    }

    pub fn is_styled(&self) -> bool {
        self.styled
    }

    pub fn heading(&self, text: &str) -> String {
        self.render(self.heading, text)
    }

    pub fn muted(&self, text: &str) -> String {
        self.render(self.muted, text)
    }

    fn render(&self, style: ContentStyle, text: &str) -> String {
        if self.styled {
            style.apply(text).to_string()
        } else {
            text.to_string()
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub theme: Theme,
}

impl Settings {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }

    /// Returns these settings with the theme flipped.
    #[must_use]
    pub fn toggle_theme(self) -> Self {
        let theme = match self.theme {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        };
        Self { theme }
    }
}

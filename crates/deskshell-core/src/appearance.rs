//! Reflecting theme and font size onto the document root.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use crate::settings::Theme;

/// Class placed on the document root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeClass {
    Light,
    Dark,
}

impl ThemeClass {
    pub const ALL: [ThemeClass; 2] = [ThemeClass::Light, ThemeClass::Dark];

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeClass::Light => "light",
            ThemeClass::Dark => "dark",
        }
    }
}

/// `auto` follows the system color-scheme preference.
pub fn resolve_theme(theme: Theme, prefers_dark: bool) -> ThemeClass {
    match theme {
        Theme::Light => ThemeClass::Light,
        Theme::Dark => ThemeClass::Dark,
        Theme::Auto if prefers_dark => ThemeClass::Dark,
        Theme::Auto => ThemeClass::Light,
    }
}

/// Root `font-size` declaration for a pixel size.
pub fn font_size_style(px: u32) -> String {
    format!("{px}px")
}

/// Where theme and font size changes land.
pub trait AppearanceSink: Send + Sync {
    /// Replace any theme class on the root with `class`.
    fn apply_theme(&self, class: ThemeClass);
    fn apply_font_size(&self, px: u32);
    /// Whether the system asks for a dark color scheme.
    fn prefers_dark(&self) -> bool {
        false
    }
}

pub fn apply_theme(sink: &dyn AppearanceSink, theme: Theme) -> ThemeClass {
    let class = resolve_theme(theme, sink.prefers_dark());
    sink.apply_theme(class);
    class
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentRoot {
    pub classes: Vec<String>,
    pub font_size: Option<String>,
}

/// In-memory model of the document root element.
#[derive(Debug, Default)]
pub struct DocumentAppearance {
    root: Mutex<DocumentRoot>,
    prefers_dark: bool,
}

impl DocumentAppearance {
    pub fn new(prefers_dark: bool) -> Self {
        Self {
            root: Mutex::new(DocumentRoot::default()),
            prefers_dark,
        }
    }

    pub fn snapshot(&self) -> DocumentRoot {
        self.root
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl AppearanceSink for DocumentAppearance {
    fn apply_theme(&self, class: ThemeClass) {
        let mut root = self.root.lock().unwrap_or_else(PoisonError::into_inner);
        root.classes
            .retain(|existing| ThemeClass::ALL.iter().all(|c| c.as_str() != existing));
        root.classes.push(class.as_str().to_string());
    }

    fn apply_font_size(&self, px: u32) {
        let mut root = self.root.lock().unwrap_or_else(PoisonError::into_inner);
        root.font_size = Some(font_size_style(px));
    }

    fn prefers_dark(&self) -> bool {
        self.prefers_dark
    }
}

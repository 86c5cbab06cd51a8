//! The settings aggregate, its defaults and the schema check applied to persisted blobs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const FONT_SIZE_MIN: u32 = 12;
pub const FONT_SIZE_MAX: u32 = 20;
pub const MEMORY_LIMIT_MIN: u32 = 256;

/// Top-level keys of the persisted object, in validation order.
pub const TOP_LEVEL_KEYS: [&str; 5] = [
    "theme",
    "fontSize",
    "notifications",
    "performance",
    "privacy",
];

/// Theme preference options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Theme::Light, Theme::Dark, Theme::Auto];

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Auto => "auto",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Theme::ALL
            .into_iter()
            .find(|theme| theme.as_str() == value)
            .ok_or_else(|| format!("unknown theme '{value}' (expected light, dark or auto)"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub desktop: bool,
    pub sound: bool,
    pub auto_hide: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            desktop: true,
            sound: false,
            auto_hide: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSettings {
    pub hardware_acceleration: bool,
    pub background_processing: bool,
    /// Megabytes; at least [`MEMORY_LIMIT_MIN`].
    pub memory_limit: u32,
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            hardware_acceleration: true,
            background_processing: false,
            memory_limit: 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacySettings {
    pub analytics: bool,
    pub crash_reports: bool,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            analytics: false,
            crash_reports: true,
        }
    }
}

/// Every user-configurable preference, persisted as one JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub theme: Theme,
    /// Root font size in pixels, within [`FONT_SIZE_MIN`]..=[`FONT_SIZE_MAX`].
    pub font_size: u32,
    pub notifications: NotificationSettings,
    pub performance: PerformanceSettings,
    pub privacy: PrivacySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            font_size: 14,
            notifications: NotificationSettings::default(),
            performance: PerformanceSettings::default(),
            privacy: PrivacySettings::default(),
        }
    }
}

impl Settings {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// One schema violation found in a settings blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Errors raised when turning untrusted text into [`Settings`].
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings are not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("settings failed validation: {}", join_violations(.0))]
    Invalid(Vec<ValidationError>),
}

pub fn join_violations(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, Copy)]
enum FieldKind {
    Bool,
    Integer { min: u32, max: u32 },
}

const NOTIFICATION_FIELDS: &[(&str, FieldKind)] = &[
    ("desktop", FieldKind::Bool),
    ("sound", FieldKind::Bool),
    ("autoHide", FieldKind::Bool),
];

const PERFORMANCE_FIELDS: &[(&str, FieldKind)] = &[
    ("hardwareAcceleration", FieldKind::Bool),
    ("backgroundProcessing", FieldKind::Bool),
    (
        "memoryLimit",
        FieldKind::Integer {
            min: MEMORY_LIMIT_MIN,
            max: u32::MAX,
        },
    ),
];

const PRIVACY_FIELDS: &[(&str, FieldKind)] = &[
    ("analytics", FieldKind::Bool),
    ("crashReports", FieldKind::Bool),
];

/// Nested groups and their fields, in validation order.
const GROUPS: [(&str, &[(&str, FieldKind)]); 3] = [
    ("notifications", NOTIFICATION_FIELDS),
    ("performance", PERFORMANCE_FIELDS),
    ("privacy", PRIVACY_FIELDS),
];

/// Returns the nested field names of a group, or `None` for an unknown group.
pub fn group_fields(group: &str) -> Option<Vec<&'static str>> {
    GROUPS
        .iter()
        .find(|(name, _)| *name == group)
        .map(|(_, fields)| fields.iter().map(|(field, _)| *field).collect())
}

/// Checks a persisted blob against the settings schema.
///
/// Every violation is collected. Absent top-level keys are allowed because
/// [`merge_with_defaults`] fills them, but a nested group that is present must
/// carry all of its fields with the right types.
pub fn validate(value: &Value) -> Vec<ValidationError> {
    let Some(object) = value.as_object() else {
        return vec![ValidationError::new("$", "settings must be a JSON object")];
    };

    let mut errors = Vec::new();

    if let Some(theme) = object.get("theme") {
        let known = theme
            .as_str()
            .is_some_and(|name| name.parse::<Theme>().is_ok());
        if !known {
            errors.push(ValidationError::new(
                "theme",
                format!("must be one of light, dark, auto (got {theme})"),
            ));
        }
    }

    if let Some(size) = object.get("fontSize") {
        check_field(
            &mut errors,
            "fontSize",
            size,
            FieldKind::Integer {
                min: FONT_SIZE_MIN,
                max: FONT_SIZE_MAX,
            },
        );
    }

    for (group, fields) in GROUPS {
        if let Some(value) = object.get(group) {
            check_group(&mut errors, group, value, fields);
        }
    }

    errors
}

fn check_group(
    errors: &mut Vec<ValidationError>,
    group: &str,
    value: &Value,
    fields: &[(&str, FieldKind)],
) {
    let Some(members) = value.as_object() else {
        errors.push(ValidationError::new(group, "must be an object"));
        return;
    };

    for (field, kind) in fields {
        let path = format!("{group}.{field}");
        match members.get(*field) {
            Some(value) => check_field(errors, &path, value, *kind),
            None => errors.push(ValidationError::new(path, "is missing")),
        }
    }
}

fn check_field(errors: &mut Vec<ValidationError>, path: &str, value: &Value, kind: FieldKind) {
    match kind {
        FieldKind::Bool => {
            if !value.is_boolean() {
                errors.push(ValidationError::new(path, "must be a boolean"));
            }
        }
        FieldKind::Integer { min, max } => match value.as_u64() {
            Some(number) if number >= u64::from(min) && number <= u64::from(max) => {}
            Some(_) | None if value.is_number() => {
                let message = if max == u32::MAX {
                    format!("must be an integer of at least {min} (got {value})")
                } else {
                    format!("must be an integer between {min} and {max} (got {value})")
                };
                errors.push(ValidationError::new(path, message));
            }
            _ => errors.push(ValidationError::new(path, "must be a number")),
        },
    }
}

/// Shallow top-level merge: each present top-level key replaces its default wholesale.
pub fn merge_with_defaults(value: &Value) -> Result<Settings, serde_json::Error> {
    let mut merged = Settings::default().to_value();
    if let (Some(target), Some(source)) = (merged.as_object_mut(), value.as_object()) {
        overlay_known_keys(target, source);
    }
    serde_json::from_value(merged)
}

fn overlay_known_keys(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for key in TOP_LEVEL_KEYS {
        if let Some(value) = source.get(key) {
            target.insert(key.to_string(), value.clone());
        }
    }
}

/// Parses, validates and merges untrusted settings text.
pub fn parse_settings(raw: &str) -> Result<Settings, SettingsError> {
    let value: Value = serde_json::from_str(raw)?;
    parse_settings_value(&value)
}

pub fn parse_settings_value(value: &Value) -> Result<Settings, SettingsError> {
    let violations = validate(value);
    if !violations.is_empty() {
        return Err(SettingsError::Invalid(violations));
    }
    Ok(merge_with_defaults(value)?)
}

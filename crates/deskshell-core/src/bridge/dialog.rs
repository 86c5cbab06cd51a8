//! Native dialog requests and results, shaped like the front-end expects them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageBoxKind {
    #[default]
    None,
    Info,
    Error,
    Question,
    Warning,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageBoxOptions {
    #[serde(rename = "type")]
    pub kind: MessageBoxKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_id: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_id: Option<usize>,
}

impl MessageBoxOptions {
    pub fn new(kind: MessageBoxKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: Some(title.into()),
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(MessageBoxKind::Info, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(MessageBoxKind::Error, title, message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageBoxResult {
    /// Index of the clicked button.
    pub response: usize,
    pub checkbox_checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFilter {
    pub name: String,
    pub extensions: Vec<String>,
}

impl FileFilter {
    pub fn new(name: impl Into<String>, extensions: &[&str]) -> Self {
        Self {
            name: name.into(),
            extensions: extensions.iter().map(|ext| (*ext).to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OpenDialogProperty {
    OpenFile,
    OpenDirectory,
    MultiSelections,
    ShowHiddenFiles,
    CreateDirectory,
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenDialogOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button_label: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FileFilter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<OpenDialogProperty>,
}

impl OpenDialogOptions {
    pub fn has(&self, property: OpenDialogProperty) -> bool {
        self.properties.contains(&property)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OpenDialogResult {
    pub canceled: bool,
    pub file_paths: Vec<String>,
}

impl OpenDialogResult {
    pub fn canceled() -> Self {
        Self {
            canceled: true,
            file_paths: Vec::new(),
        }
    }

    pub fn picked(paths: Vec<String>) -> Self {
        Self {
            canceled: paths.is_empty(),
            file_paths: paths,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveDialogOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub button_label: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FileFilter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveDialogResult {
    pub canceled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

impl SaveDialogResult {
    pub fn canceled() -> Self {
        Self {
            canceled: true,
            file_path: None,
        }
    }

    pub fn picked(path: impl Into<String>) -> Self {
        Self {
            canceled: false,
            file_path: Some(path.into()),
        }
    }

    /// The chosen path, unless the user backed out.
    pub fn chosen_path(&self) -> Option<&str> {
        if self.canceled {
            return None;
        }
        self.file_path.as_deref().filter(|path| !path.is_empty())
    }
}

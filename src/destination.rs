//! Destination subfolder planning for organize runs.

use crate::file_category::ExtensionClassifier;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

/// How files are grouped into subfolders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationMode {
    /// One folder per extension category (`Documents`, `Images`, ...).
    #[default]
    #[serde(alias = "bytype")]
    Type,
    /// One folder per month of last modification (`YYYY-MM`).
    #[serde(alias = "bydate")]
    Date,
}

impl fmt::Display for ClassificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassificationMode::Type => write!(f, "type"),
            ClassificationMode::Date => write!(f, "date"),
        }
    }
}

impl FromStr for ClassificationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "type" | "bytype" | "by-type" => Ok(ClassificationMode::Type),
            "date" | "bydate" | "by-date" => Ok(ClassificationMode::Date),
            other => Err(format!("unknown organize mode '{}': expected type or date", other)),
        }
    }
}

/// Computes destination subfolders for files.
#[derive(Debug, Clone, Default)]
pub struct DestinationPlanner {
    classifier: ExtensionClassifier,
}

impl DestinationPlanner {
    pub fn new(classifier: ExtensionClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &ExtensionClassifier {
        &self.classifier
    }

    /// Returns the subfolder a file belongs in. Never empty.
    pub fn destination(
        &self,
        extension: &str,
        modified: SystemTime,
        mode: ClassificationMode,
    ) -> String {
        match mode {
            ClassificationMode::Type => self.classifier.classify(extension).to_string(),
            ClassificationMode::Date => month_folder(modified),
        }
    }
}

/// Formats a timestamp as a `YYYY-MM` folder name in local time.
pub fn month_folder(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format("%Y-%m").to_string()
}

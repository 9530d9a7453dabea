//! Pattern-based file renaming.
//!
//! A [`RenameSpec`] describes how to compute a new name for each file of a
//! batch: an optional counter pattern, an optional find/replace pair and a
//! prefix/suffix. The original extension is always carried over untouched.

use serde::{Deserialize, Serialize};

/// Placeholder substituted with the zero-padded counter.
pub const COUNTER_TOKEN: &str = "{n}";

const FALLBACK_START: i64 = 1;
const FALLBACK_PADDING: usize = 1;

/// Immutable rename configuration for one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameSpec {
    /// Name template; only used when it contains [`COUNTER_TOKEN`].
    pub pattern: Option<String>,
    /// Counter value assigned to the first file of the batch.
    pub start: i64,
    /// Minimum number of digits of the counter.
    pub padding: usize,
    /// Literal text to look for in the working name.
    pub find: Option<String>,
    /// Replacement for every occurrence of `find`.
    pub replace: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
}

impl Default for RenameSpec {
    fn default() -> Self {
        Self {
            pattern: None,
            start: 1,
            padding: 3,
            find: None,
            replace: None,
            prefix: None,
            suffix: None,
        }
    }
}

/// Rename settings as typed by a user, before numeric validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameInputs {
    pub pattern: Option<String>,
    pub start: Option<String>,
    pub padding: Option<String>,
    pub find: Option<String>,
    pub replace: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
}

impl RenameSpec {
    /// Builds a spec from raw user input, layered over `defaults`.
    ///
    /// Missing fields take the default. If either numeric field is present
    /// but not an integer, both counter settings fall back to start 1,
    /// padding 1. Any integer is accepted; a negative padding means no
    /// padding.
    ///
    /// An empty string counts as unset and takes the default, so clearing a
    /// field restores the configured value instead of triggering the (1, 1)
    /// fallback.
    pub fn from_inputs(inputs: RenameInputs, defaults: &RenameSpec) -> Self {
        let start = non_empty(inputs.start);
        let padding = non_empty(inputs.padding);

        let parsed_start = start.as_deref().map(|s| s.trim().parse::<i64>());
        let parsed_padding = padding.as_deref().map(|s| s.trim().parse::<i64>());

        let (start, padding) = match (parsed_start, parsed_padding) {
            (Some(Err(_)), _) | (_, Some(Err(_))) => (FALLBACK_START, FALLBACK_PADDING),
            (start, padding) => (
                start.and_then(Result::ok).unwrap_or(defaults.start),
                padding
                    .and_then(Result::ok)
                    .map(|p| usize::try_from(p).unwrap_or(0))
                    .unwrap_or(defaults.padding),
            ),
        };

        Self {
            pattern: non_empty(inputs.pattern).or_else(|| defaults.pattern.clone()),
            start,
            padding,
            find: non_empty(inputs.find).or_else(|| defaults.find.clone()),
            replace: inputs.replace.or_else(|| defaults.replace.clone()),
            prefix: non_empty(inputs.prefix).or_else(|| defaults.prefix.clone()),
            suffix: non_empty(inputs.suffix).or_else(|| defaults.suffix.clone()),
        }
    }

    /// True when the pattern defines a counter and will replace file names.
    pub fn uses_counter(&self) -> bool {
        self.pattern
            .as_deref()
            .is_some_and(|pattern| pattern.contains(COUNTER_TOKEN))
    }

    /// Computes the new file name for one file of the batch.
    ///
    /// `stem` and `extension` are the two halves of the original name (the
    /// extension includes its dot and is appended verbatim). `index` is the
    /// counter value for this file.
    ///
    /// # Examples
    ///
    /// ```
    /// use tidyboard::rename::RenameSpec;
    ///
    /// let spec = RenameSpec {
    ///     pattern: Some("Photo_{n}".to_string()),
    ///     start: 5,
    ///     padding: 3,
    ///     ..Default::default()
    /// };
    /// assert_eq!(spec.rename("IMG_0001", ".jpg", 5), "Photo_005.jpg");
    /// ```
    pub fn rename(&self, stem: &str, extension: &str, index: i64) -> String {
        let mut working = match self.pattern.as_deref() {
            Some(pattern) if pattern.contains(COUNTER_TOKEN) => {
                pattern.replace(COUNTER_TOKEN, &format_counter(index, self.padding))
            }
            _ => stem.to_string(),
        };

        if let Some(find) = self.find.as_deref()
            && !find.is_empty()
        {
            working = working.replace(find, self.replace.as_deref().unwrap_or(""));
        }

        format!(
            "{}{}{}{}",
            self.prefix.as_deref().unwrap_or(""),
            working,
            self.suffix.as_deref().unwrap_or(""),
            extension
        )
    }
}

/// Formats a counter value zero-padded to `padding` digits.
///
/// Negative values keep their sign in front of the padding, so the sign
/// counts toward the width.
fn format_counter(index: i64, padding: usize) -> String {
    format!("{:0width$}", index, width = padding)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

//! Extension-based file categorization.
//!
//! Files are classified by their filename extension only, against an ordered
//! table of categories. The first category whose extension set contains the
//! extension wins; anything unmatched lands in [`FALLBACK_CATEGORY`].
//!
//! # Examples
//!
//! ```
//! use tidyboard::file_category::ExtensionClassifier;
//!
//! let classifier = ExtensionClassifier::default();
//! assert_eq!(classifier.classify(".pdf"), "Documents");
//! assert_eq!(classifier.classify(".JPG"), "Images");
//! assert_eq!(classifier.classify(".xyz"), "Others");
//! ```
use std::collections::HashSet;
use std::path::{Component, Path};

/// Category used when no rule matches an extension.
pub const FALLBACK_CATEGORY: &str = "Others";

/// The built-in categories, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Text documents, office files and PDFs
    Documents,
    /// Raster and vector images
    Images,
    /// Video containers
    Videos,
    /// Audio files
    Music,
    /// Compressed archives
    Archives,
    /// Source code and markup
    Code,
}

impl Category {
    /// Every built-in category in table order.
    pub const ALL: [Category; 6] = [
        Category::Documents,
        Category::Images,
        Category::Videos,
        Category::Music,
        Category::Archives,
        Category::Code,
    ];

    /// Returns the directory name for this category.
    ///
    /// # Examples
    ///
    /// ```
    /// use tidyboard::file_category::Category;
    ///
    /// assert_eq!(Category::Images.dir_name(), "Images");
    /// assert_eq!(Category::Music.dir_name(), "Music");
    /// ```
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Documents => "Documents",
            Category::Images => "Images",
            Category::Videos => "Videos",
            Category::Music => "Music",
            Category::Archives => "Archives",
            Category::Code => "Code",
        }
    }

    /// Lower-cased extensions (without the dot) belonging to this category.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Category::Documents => &[
                "pdf", "doc", "docx", "txt", "xlsx", "xls", "pptx", "ppt", "csv", "odt", "ods",
                "odp", "rtf", "md",
            ],
            Category::Images => &[
                "jpg", "jpeg", "png", "svg", "gif", "bmp", "webp", "tiff", "ico", "heic",
            ],
            Category::Videos => &["mp4", "mov", "avi", "mkv", "webm", "wmv", "flv", "3gp"],
            Category::Music => &["mp3", "wav", "flac", "ogg", "aac", "m4a", "wma"],
            Category::Archives => &["zip", "rar", "7z", "tar", "gz", "bz2", "xz"],
            Category::Code => &[
                "py", "html", "css", "js", "ts", "cpp", "c", "h", "hpp", "java", "rs", "go", "sh",
                "json", "xml", "yaml", "yml", "toml",
            ],
        }
    }
}

/// One row of the classification table.
#[derive(Debug, Clone)]
struct CategoryRule {
    name: String,
    extensions: HashSet<String>,
}

/// Maps file extensions to category names.
///
/// Lookup walks the rules in insertion order: rules added with
/// [`ExtensionClassifier::with_category`] are consulted before the built-in
/// table, so configuration can claim an extension the defaults already use.
#[derive(Debug, Clone)]
pub struct ExtensionClassifier {
    custom: Vec<CategoryRule>,
    builtin: Vec<CategoryRule>,
}

impl ExtensionClassifier {
    /// Creates a classifier holding only the built-in table.
    pub fn new() -> Self {
        let builtin = Category::ALL
            .iter()
            .map(|category| CategoryRule {
                name: category.dir_name().to_string(),
                extensions: category.extensions().iter().map(|e| e.to_string()).collect(),
            })
            .collect();

        Self {
            custom: Vec::new(),
            builtin,
        }
    }

    /// Adds a user-defined category ahead of the built-in table.
    ///
    /// Extensions are normalized: lower-cased, leading dot optional.
    pub fn with_category<I, S>(mut self, name: &str, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.custom.push(CategoryRule {
            name: name.to_string(),
            extensions: extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()))
                .filter(|ext| !ext.is_empty())
                .collect(),
        });
        self
    }

    /// Classifies an extension into a category name.
    ///
    /// Matching is case-insensitive and accepts the extension with or
    /// without its leading dot. Total: every input maps to exactly one
    /// category, [`FALLBACK_CATEGORY`] when nothing matches.
    pub fn classify(&self, extension: &str) -> &str {
        let ext = normalize_extension(extension);
        if ext.is_empty() {
            return FALLBACK_CATEGORY;
        }

        self.custom
            .iter()
            .chain(self.builtin.iter())
            .find(|rule| rule.extensions.contains(&ext))
            .map(|rule| rule.name.as_str())
            .unwrap_or(FALLBACK_CATEGORY)
    }
}

impl Default for ExtensionClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_extension(extension: &str) -> String {
    extension
        .strip_prefix('.')
        .unwrap_or(extension)
        .to_lowercase()
}

/// Splits a file name into its stem and extension (dot included).
///
/// The extension starts at the last dot; leading dots belong to the stem,
/// so dot-files such as `.bashrc` have no extension.
///
/// ```
/// use tidyboard::file_category::split_extension;
///
/// assert_eq!(split_extension("report.final.PDF"), ("report.final", ".PDF"));
/// assert_eq!(split_extension(".bashrc"), (".bashrc", ""));
/// assert_eq!(split_extension("README"), ("README", ""));
/// ```
pub fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) if file_name[..idx].chars().any(|c| c != '.') => file_name.split_at(idx),
        _ => (file_name, ""),
    }
}

/// True when `name` is exactly one ordinary path component: not empty, no
/// separators, not `.` or `..`, not a root or drive prefix.
pub fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(part)), None) if part == name
    )
}

//! Format registry: which extensions a backend accepts, grouped by category.

use crate::model::FormatCategory;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Extensions every registry starts with.
pub const PDF_EXTENSIONS: &[&str] = &["pdf"];

/// Raster formats the image codec can decode.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "bmp", "gif", "tiff", "tif", "webp",
];

/// Spreadsheets the office automation suite opens.
pub const OFFICE_TABLE_EXTENSIONS: &[&str] = &["xls", "xlsx", "xlsm"];

/// Documents the office automation suite opens.
pub const OFFICE_DOCUMENT_EXTENSIONS: &[&str] = &["doc", "docx", "rtf"];

/// Presentations the office automation suite opens.
pub const OFFICE_PRESENTATION_EXTENSIONS: &[&str] = &["ppt", "pptx"];

/// Spreadsheets the headless suite converts.
pub const SUITE_TABLE_EXTENSIONS: &[&str] = &["xls", "xlsx", "xlsm", "ods", "csv"];

/// Documents the headless suite converts.
pub const SUITE_DOCUMENT_EXTENSIONS: &[&str] = &["doc", "docx", "odt", "rtf", "txt"];

/// Presentations the headless suite converts.
pub const SUITE_PRESENTATION_EXTENSIONS: &[&str] = &["ppt", "pptx", "odp"];

/// Mapping from [`FormatCategory`] to the extensions it accepts.
///
/// Extensions are stored lower-cased without the leading dot and matched
/// case-insensitively. A registry always knows about PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatRegistry {
    categories: BTreeMap<FormatCategory, BTreeSet<String>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::base()
    }
}

impl FormatRegistry {
    /// A registry that only accepts PDF.
    pub fn base() -> Self {
        let mut categories = BTreeMap::new();
        categories.insert(FormatCategory::Pdf, normalize_all(PDF_EXTENSIONS));
        Self { categories }
    }

    /// Registry for backends that can only rasterize images.
    pub fn image_only() -> Self {
        Self::base().with_category(FormatCategory::Image, IMAGE_EXTENSIONS)
    }

    /// Registry of the office automation backend.
    pub fn office_automation() -> Self {
        Self::image_only()
            .with_category(FormatCategory::Table, OFFICE_TABLE_EXTENSIONS)
            .with_category(FormatCategory::Document, OFFICE_DOCUMENT_EXTENSIONS)
            .with_category(FormatCategory::Presentation, OFFICE_PRESENTATION_EXTENSIONS)
    }

    /// Registry of the headless suite backend.
    pub fn headless_suite() -> Self {
        Self::image_only()
            .with_category(FormatCategory::Table, SUITE_TABLE_EXTENSIONS)
            .with_category(FormatCategory::Document, SUITE_DOCUMENT_EXTENSIONS)
            .with_category(FormatCategory::Presentation, SUITE_PRESENTATION_EXTENSIONS)
    }

    /// Add extensions to `category`, keeping whatever is already there.
    pub fn with_category(mut self, category: FormatCategory, extensions: &[&str]) -> Self {
        self.categories
            .entry(category)
            .or_default()
            .extend(normalize_all(extensions));
        self
    }

    /// Union of `self` and `other`, category by category.
    pub fn merge(mut self, other: &FormatRegistry) -> Self {
        for (category, exts) in &other.categories {
            self.categories
                .entry(*category)
                .or_default()
                .extend(exts.iter().cloned());
        }
        self
    }

    /// Category for `path`, based on its extension.
    ///
    /// Returns `None` for files without an extension or with one no
    /// category claims.
    pub fn category_of(&self, path: &Path) -> Option<FormatCategory> {
        let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
        self.category_of_extension(&ext)
    }

    /// Category for a bare extension (with or without the leading dot).
    pub fn category_of_extension(&self, ext: &str) -> Option<FormatCategory> {
        let ext = normalize(ext);
        self.categories
            .iter()
            .find(|(_, exts)| exts.contains(&ext))
            .map(|(category, _)| *category)
    }

    /// Whether `path` must go through a conversion backend first.
    ///
    /// Everything that is not a PDF does, including unknown extensions,
    /// which the backend then reports as failed. Use [`supports`] to
    /// tell those apart up front.
    ///
    /// [`supports`]: FormatRegistry::supports
    pub fn needs_conversion(&self, path: &Path) -> bool {
        self.category_of(path) != Some(FormatCategory::Pdf)
    }

    /// Whether `path` is accepted at all.
    pub fn supports(&self, path: &Path) -> bool {
        self.category_of(path).is_some()
    }

    /// Extensions registered under `category`, sorted.
    pub fn extensions(&self, category: FormatCategory) -> Vec<String> {
        self.categories
            .get(&category)
            .map(|exts| exts.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every registered extension, sorted and deduplicated.
    pub fn all_extensions(&self) -> Vec<String> {
        self.categories
            .values()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Categories that have at least one extension.
    pub fn categories(&self) -> impl Iterator<Item = FormatCategory> + '_ {
        self.categories
            .iter()
            .filter(|(_, exts)| !exts.is_empty())
            .map(|(category, _)| *category)
    }
}

fn normalize(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

fn normalize_all(exts: &[&str]) -> BTreeSet<String> {
    exts.iter()
        .map(|ext| normalize(ext))
        .filter(|ext| !ext.is_empty())
        .collect()
}

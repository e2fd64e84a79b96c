//! Fallback backend for hosts without any office suite.

use super::Backend;
use super::Routed;
use super::image::ImageCodec;
use crate::formats::FormatRegistry;
use crate::model::{ConversionResult, FileRef};
use crate::progress::ProgressSink;

/// Converts images only; every other non-PDF input fails.
#[derive(Debug, Clone)]
pub struct ImageOnlyBackend {
    codec: ImageCodec,
    registry: FormatRegistry,
}

impl Default for ImageOnlyBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageOnlyBackend {
    /// Create the backend.
    pub fn new() -> Self {
        Self {
            codec: ImageCodec::new(),
            registry: ImageCodec::registry(),
        }
    }
}

impl Backend for ImageOnlyBackend {
    fn name(&self) -> &'static str {
        "image-only"
    }

    fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    fn convert_to_pdf(&self, files: &[FileRef], sink: &dyn ProgressSink) -> ConversionResult {
        let routed = Routed::new(&self.registry, files);
        let mut result = ConversionResult::new();
        routed.convert_without_engine(&self.codec, sink, &mut result);
        result
    }
}

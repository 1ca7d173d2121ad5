//! Run configuration with a builder.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capture::PageRegion;
use crate::error::PagesnapError;
use crate::pipeline::assemble::PageSeparator;
use crate::pipeline::reading_order::{ResolvedLayout, Tolerances};
use crate::progress::RunProgressCallback;

/// How the typesetting direction is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutMode {
    /// Detect from the first recognized page's fragment geometry.
    #[default]
    Auto,
    /// Horizontal lines, top-to-bottom, left-to-right within a line.
    Horizontal,
    /// Vertical columns, right-to-left, top-to-bottom within a column.
    Vertical,
}

impl LayoutMode {
    /// The forced layout, if this mode is not `Auto`.
    pub fn forced(self) -> Option<ResolvedLayout> {
        match self {
            LayoutMode::Auto => None,
            LayoutMode::Horizontal => Some(ResolvedLayout::Horizontal),
            LayoutMode::Vertical => Some(ResolvedLayout::Vertical),
        }
    }
}

/// Configuration for a conversion run.
///
/// Build with [`RunConfig::builder`]; [`RunConfig::default`] gives the
/// same defaults without the builder ceremony.
#[derive(Clone)]
pub struct RunConfig {
    /// Which part of each capture carries the page.
    pub region: PageRegion,
    /// Typesetting-direction selection.
    pub layout: LayoutMode,
    /// Clustering tolerances for reading-order reconstruction.
    pub tolerances: Tolerances,
    /// Pages recognized concurrently.
    pub concurrency: usize,
    /// OCR retries per page after the first attempt.
    pub max_retries: u8,
    /// Base backoff between retries; doubles each attempt.
    pub retry_backoff_ms: u64,
    /// Hard cap on captured pages.
    pub max_pages: usize,
    /// Separator between pages in the Markdown transcript.
    pub page_separator: PageSeparator,
    /// Merge layout-broken lines into paragraphs in the transcript.
    pub merge_paragraphs: bool,
    /// Resolution captured pixels are placed into the PDF at.
    pub pdf_dpi: f32,
    /// TTF font embedded in the PDF text layer.
    pub font_path: Option<PathBuf>,
    /// Document title for the PDF metadata.
    pub title: Option<String>,
    /// Progress observer. Defaults to a no-op.
    pub progress: Arc<dyn RunProgressCallback>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            region: PageRegion::Full,
            layout: LayoutMode::Auto,
            tolerances: Tolerances::default(),
            concurrency: 4,
            max_retries: 2,
            retry_backoff_ms: 250,
            max_pages: 1000,
            page_separator: PageSeparator::Blank,
            merge_paragraphs: false,
            pdf_dpi: 96.0,
            font_path: None,
            title: None,
            progress: Arc::new(crate::progress::NoProgress),
        }
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("region", &self.region)
            .field("layout", &self.layout)
            .field("tolerances", &self.tolerances)
            .field("concurrency", &self.concurrency)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("max_pages", &self.max_pages)
            .field("page_separator", &self.page_separator)
            .field("merge_paragraphs", &self.merge_paragraphs)
            .field("pdf_dpi", &self.pdf_dpi)
            .field("font_path", &self.font_path)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

impl RunConfig {
    /// Start building a configuration from the defaults.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder {
            config: RunConfig::default(),
        }
    }

    /// Check the configuration for values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), PagesnapError> {
        if self.concurrency == 0 {
            return Err(PagesnapError::InvalidConfig(
                "concurrency must be at least 1".into(),
            ));
        }
        if self.max_pages == 0 {
            return Err(PagesnapError::InvalidConfig(
                "max_pages must be at least 1".into(),
            ));
        }
        if !(self.pdf_dpi.is_finite() && self.pdf_dpi > 0.0) {
            return Err(PagesnapError::InvalidConfig(format!(
                "pdf_dpi must be a positive number, got {}",
                self.pdf_dpi
            )));
        }
        if !(self.tolerances.line > 0.0 && self.tolerances.column > 0.0) {
            return Err(PagesnapError::InvalidConfig(
                "tolerances must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`RunConfig`].
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn region(mut self, region: PageRegion) -> Self {
        self.config.region = region;
        self
    }

    pub fn layout(mut self, layout: LayoutMode) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn tolerances(mut self, tolerances: Tolerances) -> Self {
        self.config.tolerances = tolerances;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    pub fn max_retries(mut self, max_retries: u8) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    pub fn retry_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.config.retry_backoff_ms = backoff_ms;
        self
    }

    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    pub fn page_separator(mut self, separator: PageSeparator) -> Self {
        self.config.page_separator = separator;
        self
    }

    pub fn merge_paragraphs(mut self, merge: bool) -> Self {
        self.config.merge_paragraphs = merge;
        self
    }

    pub fn pdf_dpi(mut self, dpi: f32) -> Self {
        self.config.pdf_dpi = dpi;
        self
    }

    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_path = Some(path.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = Some(title.into());
        self
    }

    pub fn progress(mut self, progress: Arc<dyn RunProgressCallback>) -> Self {
        self.config.progress = progress;
        self
    }

    /// Validate and produce the configuration.
    pub fn build(self) -> Result<RunConfig, PagesnapError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(RunConfig::default().validate().is_ok());
    }

    #[test]
    fn builder_sets_fields() {
        let config = RunConfig::builder()
            .layout(LayoutMode::Vertical)
            .concurrency(8)
            .merge_paragraphs(true)
            .title("猫")
            .build()
            .unwrap();
        assert_eq!(config.layout, LayoutMode::Vertical);
        assert_eq!(config.concurrency, 8);
        assert!(config.merge_paragraphs);
        assert_eq!(config.title.as_deref(), Some("猫"));
    }

    #[test]
    fn zero_concurrency_rejected() {
        let err = RunConfig::builder().concurrency(0).build();
        assert!(matches!(err, Err(PagesnapError::InvalidConfig(_))));
    }

    #[test]
    fn bad_dpi_rejected() {
        let err = RunConfig::builder().pdf_dpi(0.0).build();
        assert!(matches!(err, Err(PagesnapError::InvalidConfig(_))));
    }

    #[test]
    fn forced_layout_mapping() {
        assert_eq!(LayoutMode::Auto.forced(), None);
        assert_eq!(
            LayoutMode::Vertical.forced(),
            Some(ResolvedLayout::Vertical)
        );
    }
}

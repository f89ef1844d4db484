//! Configuration types for story generation and preview rendering.
//!
//! All behaviour is controlled through [`GenerateConfig`], built via its
//! [`GenerateConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across tasks and to diff two runs to understand
//! why their outputs differ.

use crate::error::ConteurError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default zoom floor, percent.
pub const DEFAULT_ZOOM_MIN: u32 = 50;
/// Default zoom ceiling, percent.
pub const DEFAULT_ZOOM_MAX: u32 = 400;
/// Default zoom step, percentage points.
pub const DEFAULT_ZOOM_STEP: u32 = 25;

/// Configuration for story generation and the preview controller.
///
/// Built via [`GenerateConfig::builder()`] or [`GenerateConfig::default()`].
///
/// # Example
/// ```rust
/// use conteur::GenerateConfig;
///
/// let config = GenerateConfig::builder()
///     .max_rendered_pixels(1600)
///     .concurrency(4)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GenerateConfig {
    /// Maximum rendered image dimension (width or height) in pixels.
    /// Default: 2000.
    ///
    /// A safety cap independent of zoom. A children's book spread rendered
    /// at 400% could otherwise produce a multi-hundred-megapixel surface;
    /// this field caps either dimension, scaling the other proportionally.
    pub max_rendered_pixels: u32,

    /// Number of pages rasterised concurrently during generation.
    /// Default: 4.
    ///
    /// Page paints are CPU-bound and each holds a `spawn_blocking` slot, so
    /// values much above the core count buy nothing.
    pub concurrency: usize,

    /// Download timeout for URL template inputs, seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Zoom floor in percent. Default: 50.
    pub zoom_min: u32,

    /// Zoom ceiling in percent. Default: 400.
    pub zoom_max: u32,

    /// Zoom step for `zoom_in`/`zoom_out`, percentage points. Default: 25.
    pub zoom_step: u32,

    /// Fit-to-width feedback epsilon, percentage points. Default: 0.5.
    ///
    /// A computed fit-width zoom is reported back to the caller only when it
    /// differs from the previous value by more than this; otherwise the
    /// report would itself trigger a relayout and another render, looping
    /// forever on sub-pixel differences.
    pub fit_epsilon: f32,

    /// Coalescing window for the dimensions callback, milliseconds.
    /// Default: 100.
    pub debounce_ms: u64,

    /// Progress observer driven during generation. Default: none.
    pub observer: Option<Arc<dyn crate::progress::GenerationObserver>>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            max_rendered_pixels: 2000,
            concurrency: 4,
            download_timeout_secs: 120,
            zoom_min: DEFAULT_ZOOM_MIN,
            zoom_max: DEFAULT_ZOOM_MAX,
            zoom_step: DEFAULT_ZOOM_STEP,
            fit_epsilon: 0.5,
            debounce_ms: 100,
            observer: None,
        }
    }
}

impl std::fmt::Debug for GenerateConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerateConfig")
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("zoom_min", &self.zoom_min)
            .field("zoom_max", &self.zoom_max)
            .field("zoom_step", &self.zoom_step)
            .field("fit_epsilon", &self.fit_epsilon)
            .field("debounce_ms", &self.debounce_ms)
            .field("observer", &self.observer.as_ref().map(|_| "<dyn GenerationObserver>"))
            .finish()
    }
}

impl GenerateConfig {
    /// Create a new builder for `GenerateConfig`.
    pub fn builder() -> GenerateConfigBuilder {
        GenerateConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GenerateConfig`].
#[derive(Debug)]
pub struct GenerateConfigBuilder {
    config: GenerateConfig,
}

impl GenerateConfigBuilder {
    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn zoom_bounds(mut self, min: u32, max: u32) -> Self {
        self.config.zoom_min = min;
        self.config.zoom_max = max;
        self
    }

    pub fn zoom_step(mut self, step: u32) -> Self {
        self.config.zoom_step = step.max(1);
        self
    }

    pub fn fit_epsilon(mut self, eps: f32) -> Self {
        self.config.fit_epsilon = eps.max(0.0);
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.config.debounce_ms = ms;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn crate::progress::GenerationObserver>) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerateConfig, ConteurError> {
        let c = &self.config;
        if c.zoom_min == 0 {
            return Err(ConteurError::InvalidConfig("zoom floor must be ≥ 1".into()));
        }
        if c.zoom_min > c.zoom_max {
            return Err(ConteurError::InvalidConfig(format!(
                "zoom floor {} exceeds ceiling {}",
                c.zoom_min, c.zoom_max
            )));
        }
        if c.concurrency == 0 {
            return Err(ConteurError::InvalidConfig("concurrency must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

/// Zoom mode for the preview controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ZoomMode {
    /// Fixed zoom in percent, clamped to the configured bounds.
    Fixed(u32),
    /// Derive zoom from the available container width at render time.
    FitWidth { container_width: f32 },
}

impl Default for ZoomMode {
    fn default() -> Self {
        ZoomMode::Fixed(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let c = GenerateConfig::builder().build().unwrap();
        assert_eq!(c.zoom_min, 50);
        assert_eq!(c.zoom_max, 400);
        assert_eq!(c.zoom_step, 25);
        assert_eq!(c.debounce_ms, 100);
    }

    #[test]
    fn inverted_zoom_bounds_rejected() {
        let err = GenerateConfig::builder()
            .zoom_bounds(300, 100)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("zoom floor"));
    }

    #[test]
    fn zero_zoom_floor_rejected() {
        assert!(GenerateConfig::builder().zoom_bounds(0, 100).build().is_err());
    }

    #[test]
    fn concurrency_clamped_to_one() {
        let c = GenerateConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn max_pixels_floor() {
        let c = GenerateConfig::builder().max_rendered_pixels(10).build().unwrap();
        assert_eq!(c.max_rendered_pixels, 100);
    }
}

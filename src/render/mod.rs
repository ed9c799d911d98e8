//! Profile plots.
//!
//! Turns a recorded scan into a PNG scatter of sample positions, coloured by
//! range reading with a discrete qualitative palette and a colour bar. The
//! output depends only on the data file, so re-rendering the same scan gives
//! the same image.

mod palette;

pub use palette::QualitativePalette;

use crate::data::{Profile, ProfileSummary};
use crate::error::{AppResult, DaqError};
use plotters::prelude::*;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use tracing::info;

/// Label of the horizontal axis.
pub const X_AXIS_LABEL: &str = "Horizontal Position [mm]";
/// Label of the vertical axis.
pub const Y_AXIS_LABEL: &str = "Scan Position [mm]";
/// Label of the colour bar.
pub const COLOR_BAR_LABEL: &str = "Range [mm]";

const FONT: &str = "sans-serif";

/// Renders recorded profiles to PNG images.
#[derive(Clone, Debug)]
pub struct ProfileRenderer {
    width: u32,
    height: u32,
    marker_size: i32,
    palette: QualitativePalette,
}

impl Default for ProfileRenderer {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            marker_size: 3,
            palette: QualitativePalette::set1(),
        }
    }
}

impl ProfileRenderer {
    /// Renderer with the default 800x600 canvas.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the canvas size in pixels.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Reads `data_path` and writes the plot to `image_path`.
    ///
    /// # Errors
    ///
    /// `DaqError::DataUnavailable` when the data file cannot be opened or
    /// has no valid samples; `DaqError::Render` when drawing fails.
    pub fn render(&self, data_path: &Path, image_path: &Path) -> AppResult<ProfileSummary> {
        let profile = Profile::load(data_path)?;
        self.draw(&profile, image_path)?;

        let summary = profile.summary();
        info!(
            "Rendered {} samples ({} discarded) from {} to {}",
            summary.valid_samples,
            summary.discarded_samples,
            data_path.display(),
            image_path.display()
        );
        Ok(summary)
    }

    /// Writes the plot of an already loaded profile.
    pub fn draw(&self, profile: &Profile, image_path: &Path) -> AppResult<()> {
        if let Some(parent) = image_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let bounds = profile.bounds();
        let (x_lo, x_hi) = widen(bounds.x_min, bounds.x_max);
        let (y_lo, y_hi) = widen(bounds.y_min, bounds.y_max);
        let (z_min, z_max) = profile.z_range();
        let (bar_lo, bar_hi) = widen(z_min, z_max);
        let legend = self.legend(z_min, z_max);

        let root = BitMapBackend::new(image_path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_error)?;

        let (plot_area, bar_area) = root.split_horizontally(self.width as i32 * 5 / 6);

        let mut chart = ChartBuilder::on(&plot_area)
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
            .map_err(render_error)?;

        chart
            .configure_mesh()
            .x_desc(X_AXIS_LABEL)
            .y_desc(Y_AXIS_LABEL)
            .label_style((FONT, 12))
            .axis_desc_style((FONT, 13))
            .draw()
            .map_err(render_error)?;

        chart
            .draw_series(profile.samples().iter().map(|p| {
                let color = self.palette.color_of(p.z, z_min, z_max);
                Circle::new((p.x, p.y), self.marker_size, color.filled())
            }))
            .map_err(render_error)?;

        let mut bar = ChartBuilder::on(&bar_area)
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0..1.0, bar_lo..bar_hi)
            .map_err(render_error)?;

        bar.configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .disable_x_axis()
            .y_desc(COLOR_BAR_LABEL)
            .label_style((FONT, 12))
            .axis_desc_style((FONT, 13))
            .draw()
            .map_err(render_error)?;

        bar.draw_series(
            legend
                .into_iter()
                .map(|(lo, hi, color)| Rectangle::new([(0.0, lo), (1.0, hi)], color.filled())),
        )
        .map_err(render_error)?;

        root.present().map_err(render_error)?;
        Ok(())
    }

    /// Colour-bar bands for readings spanning `[z_min, z_max]`. Every band
    /// carries the colour the scatter gives to readings inside it; a single
    /// distinct reading gets one class-0 band over the widened range.
    fn legend(&self, z_min: f64, z_max: f64) -> Vec<(f64, f64, RGBColor)> {
        if z_max > z_min {
            self.palette.bands(z_min, z_max)
        } else {
            let (lo, hi) = widen(z_min, z_max);
            vec![(lo, hi, self.palette.color(0))]
        }
    }
}

/// Chart ranges must not be empty; a single distinct value gets ±0.5 mm.
fn widen(lo: f64, hi: f64) -> (f64, f64) {
    if hi > lo {
        (lo, hi)
    } else {
        (lo - 0.5, hi + 0.5)
    }
}

fn render_error<E: Display>(e: E) -> DaqError {
    DaqError::Render(e.to_string())
}

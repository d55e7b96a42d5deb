//! The figure builder: global configuration plus the ordered list of series.
//!
//! A [`Figure`] is configured through `&mut self` setters and append-only
//! series registration, then consumed by [`Figure::save`]. Because `save`
//! takes `self`, a rendered figure cannot be touched again.

use crate::config::RenderOptions;
use crate::error::Result;
use crate::models::{AxisStyle, Dimensions, LegendPosition, Range, Series, SeriesKind};
use crate::output;
use crate::render;
use std::path::{Path, PathBuf};

/// Accumulated plot state for one output target.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    output: PathBuf,
    axis_style: AxisStyle,
    x_range: Option<Range>,
    y_range: Option<Range>,
    grid: bool,
    dimensions: Option<Dimensions>,
    x_label: Option<String>,
    y_label: Option<String>,
    legend_position: Option<LegendPosition>,
    series: Vec<Series>,
}

impl Figure {
    /// New figure writing to `output`. The extension picks the pipeline at save time:
    /// `.pdf`/`.eps` are compiled, anything else receives the raw markup.
    pub fn new<P: Into<PathBuf>>(output: P) -> Self {
        Self {
            output: output.into(),
            axis_style: AxisStyle::Standard,
            x_range: None,
            y_range: None,
            grid: false,
            dimensions: None,
            x_label: None,
            y_label: None,
            legend_position: None,
            series: Vec::new(),
        }
    }

    pub fn set_axis_style(&mut self, style: AxisStyle) {
        self.axis_style = style;
    }

    /// String form of [`set_axis_style`](Self::set_axis_style). Unknown names are
    /// rejected here, so nothing has been written when the error surfaces.
    pub fn set_axis_style_str(&mut self, style: &str) -> Result<()> {
        self.axis_style = style.parse()?;
        Ok(())
    }

    pub fn set_x_range(&mut self, min: f64, max: f64) {
        self.x_range = Some(Range { min, max });
    }

    pub fn set_y_range(&mut self, min: f64, max: f64) {
        self.y_range = Some(Range { min, max });
    }

    pub fn set_grid(&mut self, on: bool) {
        self.grid = on;
    }

    /// Width and height in centimeters.
    pub fn set_dimensions(&mut self, width_cm: f64, height_cm: f64) {
        self.dimensions = Some(Dimensions {
            width_cm,
            height_cm,
        });
    }

    pub fn set_x_label<S: Into<String>>(&mut self, text: S) {
        self.x_label = Some(text.into());
    }

    pub fn set_y_label<S: Into<String>>(&mut self, text: S) {
        self.y_label = Some(text.into());
    }

    pub fn set_legend_position(&mut self, pos: LegendPosition) {
        self.legend_position = Some(pos);
    }

    /// String form of [`set_legend_position`](Self::set_legend_position), e.g. `"north east"`.
    pub fn set_legend_position_str(&mut self, pos: &str) -> Result<()> {
        self.legend_position = Some(pos.parse()?);
        Ok(())
    }

    /// Append a line series. `x` and `y` must have the same length.
    pub fn add_line(
        &mut self,
        x: &[f64],
        y: &[f64],
        color: Option<&str>,
        legend: Option<&str>,
    ) -> Result<()> {
        self.add_series(SeriesKind::Line, x, y, color, legend)
    }

    /// Append a stem series. `x` and `y` must have the same length.
    pub fn add_stem(
        &mut self,
        x: &[f64],
        y: &[f64],
        color: Option<&str>,
        legend: Option<&str>,
    ) -> Result<()> {
        self.add_series(SeriesKind::Stem, x, y, color, legend)
    }

    fn add_series(
        &mut self,
        kind: SeriesKind,
        x: &[f64],
        y: &[f64],
        color: Option<&str>,
        legend: Option<&str>,
    ) -> Result<()> {
        let series = Series::from_xy(
            kind,
            x,
            y,
            color.map(str::to_owned),
            legend.map(str::to_owned),
        )?;
        log::debug!(
            "figure '{}': appended {:?} series #{} with {} points",
            self.output.display(),
            kind,
            self.series.len(),
            series.points.len()
        );
        self.series.push(series);
        Ok(())
    }

    /// Append an already-built series.
    pub fn push_series(&mut self, series: Series) {
        self.series.push(series);
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn axis_style(&self) -> AxisStyle {
        self.axis_style
    }

    pub fn x_range(&self) -> Option<Range> {
        self.x_range
    }

    pub fn y_range(&self) -> Option<Range> {
        self.y_range
    }

    pub fn grid(&self) -> bool {
        self.grid
    }

    pub fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
    }

    pub fn x_label(&self) -> Option<&str> {
        self.x_label.as_deref()
    }

    pub fn y_label(&self) -> Option<&str> {
        self.y_label.as_deref()
    }

    pub fn legend_position(&self) -> Option<LegendPosition> {
        self.legend_position
    }

    /// Series in insertion order.
    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// The `tikzpicture` markup for the current state, without touching the filesystem.
    pub fn to_markup(&self) -> String {
        render::markup(self)
    }

    /// Render and write the figure with default [`RenderOptions`], consuming it.
    pub fn save(self) -> Result<PathBuf> {
        self.save_with(&RenderOptions::default())
    }

    /// Render and write the figure, consuming it. Returns the path of the final artifact.
    pub fn save_with(self, opts: &RenderOptions) -> Result<PathBuf> {
        output::save_figure(self, opts, &output::LatexCompiler::from_options(opts))
    }

    /// Like [`save_with`](Self::save_with) but with a caller-supplied compiler,
    /// e.g. a wrapper script or a fake in tests.
    pub fn save_using<C: output::DocumentCompiler>(
        self,
        opts: &RenderOptions,
        compiler: &C,
    ) -> Result<PathBuf> {
        output::save_figure(self, opts, compiler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_figure_defaults() {
        let f = Figure::new("out.tikz");
        assert_eq!(f.output(), Path::new("out.tikz"));
        assert_eq!(f.axis_style(), AxisStyle::Standard);
        assert!(f.x_range().is_none());
        assert!(f.y_range().is_none());
        assert!(!f.grid());
        assert!(f.dimensions().is_none());
        assert!(f.x_label().is_none());
        assert!(f.y_label().is_none());
        assert!(f.legend_position().is_none());
        assert!(f.series().is_empty());
    }

    #[test]
    fn setters_are_last_write_wins() {
        let mut f = Figure::new("out.tikz");
        f.set_x_range(0.0, 1.0);
        f.set_x_range(-5.0, 5.0);
        f.set_x_label("a");
        f.set_x_label("b");
        f.set_grid(true);
        f.set_grid(false);
        assert_eq!(f.x_range(), Some(Range { min: -5.0, max: 5.0 }));
        assert_eq!(f.x_label(), Some("b"));
        assert!(!f.grid());
    }

    #[test]
    fn zero_range_is_configured() {
        let mut f = Figure::new("out.tikz");
        f.set_x_range(0.0, 0.0);
        f.set_dimensions(0.0, 0.0);
        assert_eq!(f.x_range(), Some(Range { min: 0.0, max: 0.0 }));
        assert!(f.dimensions().is_some());
    }

    #[test]
    fn mismatched_lengths_leave_figure_untouched() {
        let mut f = Figure::new("out.tikz");
        let err = f
            .add_line(&[1.0, 2.0], &[1.0], Some("red"), None)
            .unwrap_err();
        assert!(err.is_usage_error());
        assert!(f.series().is_empty());
    }

    #[test]
    fn invalid_style_strings_keep_previous_value() {
        let mut f = Figure::new("out.tikz");
        f.set_axis_style_str("center").unwrap();
        assert!(f.set_axis_style_str("polar").is_err());
        assert_eq!(f.axis_style(), AxisStyle::Centered);
        assert!(f.set_legend_position_str("top").is_err());
        assert!(f.legend_position().is_none());
    }

    #[test]
    fn series_kept_in_call_order() {
        let mut f = Figure::new("out.tikz");
        f.add_stem(&[0.0], &[1.0], None, Some("s")).unwrap();
        f.add_line(&[0.0], &[2.0], Some("teal"), None).unwrap();
        let kinds: Vec<SeriesKind> = f.series().iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SeriesKind::Stem, SeriesKind::Line]);
        assert_eq!(f.series()[1].color.as_deref(), Some("teal"));
        assert_eq!(f.series()[0].legend.as_deref(), Some("s"));
    }
}

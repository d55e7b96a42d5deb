//! Configuration: render options for the output pipelines, and a JSON figure
//! description that hosts (and the `texplot` CLI) can load from disk.

use crate::error::{PlotError, Result};
use crate::figure::Figure;
use crate::models::{Dimensions, Range, Series, SeriesKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default limit for one compile.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Knobs for [`Figure::save_with`]. Only the compile pipeline reads them.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Limit for the whole toolchain run of one save (`latex` and `dvips`
    /// share it for EPS); the running process is killed when it is exceeded.
    pub timeout: Duration,
    /// Used for PDF targets.
    pub latex_program: String,
    /// Used for EPS targets (produces DVI for `dvips`).
    pub dvi_latex_program: String,
    pub dvips_program: String,
    /// Keep `.tex`, `.aux`, `.log` after a successful compile.
    pub keep_intermediate: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            latex_program: "pdflatex".into(),
            dvi_latex_program: "latex".into(),
            dvips_program: "dvips".into(),
            keep_intermediate: false,
        }
    }
}

impl RenderOptions {
    /// Defaults overlaid with `TEXPLOT_LATEX` and `TEXPLOT_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let mut opts = Self::default();
        if let Ok(prog) = std::env::var("TEXPLOT_LATEX")
            && !prog.trim().is_empty()
        {
            opts.latex_program = prog;
        }
        if let Ok(secs) = std::env::var("TEXPLOT_TIMEOUT_SECS") {
            match secs.trim().parse::<u64>() {
                Ok(s) if s > 0 => opts.timeout = Duration::from_secs(s),
                _ => log::warn!("ignoring invalid TEXPLOT_TIMEOUT_SECS={secs:?}"),
            }
        }
        opts
    }
}

/// One series in a [`FigureConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeriesConfig {
    pub kind: SeriesKind,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub color: Option<String>,
    pub legend: Option<String>,
}

/// Whole-figure description, e.g.
///
/// ```json
/// {
///   "output": "fig.pdf",
///   "axis_style": "center",
///   "x_range": { "min": 0, "max": 10 },
///   "grid": true,
///   "series": [
///     { "kind": "line", "x": [0, 1], "y": [0, 1], "color": "teal" }
///   ]
/// }
/// ```
///
/// Style names stay strings here so they are validated by the same code path
/// as [`Figure::set_axis_style_str`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FigureConfig {
    pub output: PathBuf,
    pub axis_style: Option<String>,
    pub x_range: Option<Range>,
    pub y_range: Option<Range>,
    #[serde(default)]
    pub grid: bool,
    pub dimensions: Option<Dimensions>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub legend_position: Option<String>,
    #[serde(default)]
    pub series: Vec<SeriesConfig>,
}

impl FigureConfig {
    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| PlotError::Config(e.to_string()))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| PlotError::io(path, e))?;
        Self::from_json(&text)
    }

    /// Build a [`Figure`] through the regular setters and appends.
    /// Fails on the first invalid style name or mismatched series.
    pub fn into_figure(self) -> Result<Figure> {
        let mut fig = Figure::new(self.output);
        if let Some(style) = &self.axis_style {
            fig.set_axis_style_str(style)?;
        }
        if let Some(r) = self.x_range {
            fig.set_x_range(r.min, r.max);
        }
        if let Some(r) = self.y_range {
            fig.set_y_range(r.min, r.max);
        }
        fig.set_grid(self.grid);
        if let Some(d) = self.dimensions {
            fig.set_dimensions(d.width_cm, d.height_cm);
        }
        if let Some(label) = self.x_label {
            fig.set_x_label(label);
        }
        if let Some(label) = self.y_label {
            fig.set_y_label(label);
        }
        if let Some(pos) = &self.legend_position {
            fig.set_legend_position_str(pos)?;
        }
        for s in self.series {
            fig.push_series(Series::from_xy(s.kind, &s.x, &s.y, s.color, s.legend)?);
        }
        Ok(fig)
    }
}

//! texplot_rs
//!
//! A small Rust library for turning numeric series into PGFPlots/TikZ figures.
//! Pairs with the `texplot` CLI.
//!
//! ### Features
//! - Line and stem series with optional color and legend entry
//! - Standard or centered (through-the-origin) axes
//! - Optional axis ranges, grid, physical size, labels, and legend position;
//!   anything left unset is simply not emitted
//! - Raw `.tikz`/`.tex` output, or `.pdf`/`.eps` via a LaTeX toolchain
//!
//! ### Example
//! ```no_run
//! use texplot_rs::{AxisStyle, Figure};
//!
//! let x: Vec<f64> = (0..100).map(|i| i as f64 * 0.1).collect();
//! let y: Vec<f64> = x.iter().map(|t| (-t / 8.0).exp() * (2.0 * t).sin()).collect();
//!
//! let mut fig = Figure::new("damped.pdf");
//! fig.add_line(&x, &y, Some("teal"), Some("$y(t)$"))?;
//! fig.set_axis_style(AxisStyle::Centered);
//! fig.set_grid(true);
//! fig.set_dimensions(12.0, 8.0);
//! fig.save()?;
//! # Ok::<(), texplot_rs::PlotError>(())
//! ```

pub mod config;
pub mod error;
pub mod figure;
pub mod models;
pub mod output;
pub mod render;

pub use config::{FigureConfig, RenderOptions};
pub use error::{PlotError, Result};
pub use figure::Figure;
pub use models::{AxisStyle, LegendPosition, Series, SeriesKind};

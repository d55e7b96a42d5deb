//! Markup serializer: turns a [`Figure`] into PGFPlots/TikZ text.
//!
//! Output layout:
//! - `\begin{tikzpicture}` / `\begin{axis}[` opening
//! - the centered-axis block (only for [`AxisStyle::Centered`])
//! - configured options, in fixed order: x range, y range, grid, width, height,
//!   x label, y label, legend position. Unset options emit no line at all.
//! - one `\addplot` block per series, in insertion order, each followed by
//!   `\addlegendentry{..}` when the series has a legend label
//! - closing `\end{axis}` / `\end{tikzpicture}`
//!
//! Numbers are fixed-point with [`PRECISION`] fractional digits.

use crate::figure::Figure;
use crate::models::{AxisStyle, Series, SeriesKind};
use std::fmt::{self, Write};

/// Fractional digits for every coordinate, range bound and dimension.
pub const PRECISION: usize = 6;

/// Fixed block emitted for [`AxisStyle::Centered`]: axes through the origin,
/// labels anchored at the positive ends of the axis lines.
pub const CENTERED_AXIS_BLOCK: &str = "axis lines=center,\n\
axis x line=middle,\n\
every axis x label/.style={at={(ticklabel* cs:1.0)}, anchor=west},\n\
every axis y label/.style={at={(ticklabel* cs:1.0)}, anchor=south},\n";

const LINE_STYLE: &str = "line width=1pt";
const STEM_STYLE: &str = "mark=*, mark options={scale=1.5}, line width=1pt";

/// Minimal standalone document around the picture for the compile pipeline.
pub const DOCUMENT_PREAMBLE: &str = "\\documentclass[tikz]{standalone}\n\
\\usepackage{pgfplots}\n\
\\pgfplotsset{compat=1.18}\n\
\\begin{document}\n";

pub const DOCUMENT_END: &str = "\\end{document}\n";

/// Fixed-point number, never scientific notation.
pub fn num(v: f64) -> String {
    format!("{:.*}", PRECISION, v)
}

/// Full `tikzpicture` markup for the figure.
pub fn markup(fig: &Figure) -> String {
    let mut out = String::new();
    // fmt::Write for String is infallible.
    let _ = write_picture(&mut out, fig);
    out
}

/// Picture markup wrapped in [`DOCUMENT_PREAMBLE`] / [`DOCUMENT_END`].
pub fn standalone_document(fig: &Figure) -> String {
    let mut out = String::from(DOCUMENT_PREAMBLE);
    let _ = write_picture(&mut out, fig);
    out.push_str(DOCUMENT_END);
    out
}

fn write_picture<W: Write>(w: &mut W, fig: &Figure) -> fmt::Result {
    w.write_str("\\begin{tikzpicture}\n")?;
    write_axis_options(w, fig)?;
    for series in fig.series() {
        write_series(w, series)?;
    }
    w.write_str("\\end{axis}\n")?;
    w.write_str("\\end{tikzpicture}\n")
}

fn write_axis_options<W: Write>(w: &mut W, fig: &Figure) -> fmt::Result {
    w.write_str("\\begin{axis}[\n")?;

    match fig.axis_style() {
        AxisStyle::Centered => w.write_str(CENTERED_AXIS_BLOCK)?,
        AxisStyle::Standard => {}
    }

    if let Some(r) = fig.x_range() {
        writeln!(w, "xmin={}, xmax={},", num(r.min), num(r.max))?;
    }
    if let Some(r) = fig.y_range() {
        writeln!(w, "ymin={}, ymax={},", num(r.min), num(r.max))?;
    }
    if fig.grid() {
        w.write_str("grid=major,\n")?;
    }
    if let Some(d) = fig.dimensions() {
        writeln!(w, "width={} cm,", num(d.width_cm))?;
        writeln!(w, "height={} cm,", num(d.height_cm))?;
    }
    if let Some(label) = fig.x_label() {
        writeln!(w, "xlabel={{{label}}},")?;
    }
    if let Some(label) = fig.y_label() {
        writeln!(w, "ylabel={{{label}}},")?;
    }
    if let Some(pos) = fig.legend_position() {
        writeln!(w, "legend pos={pos},")?;
    }

    w.write_str("]\n")
}

/// Option list for one `\addplot`, e.g. `[color=teal, line width=1pt]`.
fn plot_options(series: &Series) -> String {
    let mut opts: Vec<String> = Vec::with_capacity(3);
    if series.kind == SeriesKind::Stem {
        opts.push("ycomb".to_string());
    }
    if let Some(color) = &series.color {
        opts.push(format!("color={color}"));
    }
    opts.push(
        match series.kind {
            SeriesKind::Line => LINE_STYLE,
            SeriesKind::Stem => STEM_STYLE,
        }
        .to_string(),
    );
    format!("[{}]", opts.join(", "))
}

fn write_series<W: Write>(w: &mut W, series: &Series) -> fmt::Result {
    writeln!(w, "\\addplot {} coordinates {{", plot_options(series))?;
    for p in &series.points {
        writeln!(w, "    ({},{})", num(p.x), num(p.y))?;
    }
    w.write_str("};\n")?;
    if let Some(entry) = &series.legend {
        writeln!(w, "\\addlegendentry{{{entry}}}")?;
    }
    Ok(())
}

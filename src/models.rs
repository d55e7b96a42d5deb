use crate::error::PlotError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of plotted series; decides the `\addplot` template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    /// Connected line through the points.
    Line,
    /// Vertical stems from the x axis to each point, with a marker on top.
    Stem,
}

/// Axis layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisStyle {
    /// Boxed axes in the lower-left corner (pgfplots default). Adds no directives.
    #[default]
    Standard,
    /// Axis lines through the origin with the axis labels moved to the line ends.
    #[serde(alias = "center")]
    Centered,
}

impl FromStr for AxisStyle {
    type Err = PlotError;

    /// Accepts `standard` and `center`/`centered`, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(AxisStyle::Standard),
            "center" | "centered" => Ok(AxisStyle::Centered),
            _ => Err(PlotError::UnknownAxisStyle(s.to_string())),
        }
    }
}

/// Named legend anchors understood by `legend pos=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LegendPosition {
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
    OuterNorthEast,
}

impl LegendPosition {
    /// The pgfplots anchor name, e.g. `north east`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LegendPosition::NorthEast => "north east",
            LegendPosition::NorthWest => "north west",
            LegendPosition::SouthEast => "south east",
            LegendPosition::SouthWest => "south west",
            LegendPosition::OuterNorthEast => "outer north east",
        }
    }
}

impl fmt::Display for LegendPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LegendPosition {
    type Err = PlotError;

    /// Accepts the anchor names with spaces, `_` or `-` as separators, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .trim()
            .to_ascii_lowercase()
            .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        match norm.as_str() {
            "north east" => Ok(LegendPosition::NorthEast),
            "north west" => Ok(LegendPosition::NorthWest),
            "south east" => Ok(LegendPosition::SouthEast),
            "south west" => Ok(LegendPosition::SouthWest),
            "outer north east" => Ok(LegendPosition::OuterNorthEast),
            _ => Err(PlotError::UnknownLegendPosition(s.to_string())),
        }
    }
}

impl TryFrom<String> for LegendPosition {
    type Error = PlotError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<LegendPosition> for String {
    fn from(p: LegendPosition) -> Self {
        p.as_str().to_string()
    }
}

/// Axis bounds. No ordering check: `min > max` is passed through verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

/// Physical figure size in centimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width_cm: f64,
    pub height_cm: f64,
}

/// One coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// One plotted dataset. Points keep the order in which they were appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub kind: SeriesKind,
    /// `None` lets pgfplots pick the color from its cycle list.
    pub color: Option<String>,
    /// `None` means no `\addlegendentry` for this series.
    pub legend: Option<String>,
    pub points: Vec<Point>,
}

impl Series {
    /// Interleave `x` and `y` into points. Returns an error before allocating
    /// anything when the lengths differ.
    pub fn from_xy(
        kind: SeriesKind,
        x: &[f64],
        y: &[f64],
        color: Option<String>,
        legend: Option<String>,
    ) -> Result<Self, PlotError> {
        if x.len() != y.len() {
            return Err(PlotError::LengthMismatch {
                x_len: x.len(),
                y_len: y.len(),
            });
        }
        let points = x
            .iter()
            .zip(y)
            .map(|(&x, &y)| Point { x, y })
            .collect();
        Ok(Self {
            kind,
            color,
            legend,
            points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_style_parsing() {
        assert_eq!("standard".parse::<AxisStyle>().unwrap(), AxisStyle::Standard);
        assert_eq!("Center".parse::<AxisStyle>().unwrap(), AxisStyle::Centered);
        assert_eq!("centered".parse::<AxisStyle>().unwrap(), AxisStyle::Centered);
        let err = "diagonal".parse::<AxisStyle>().unwrap_err();
        assert!(matches!(err, PlotError::UnknownAxisStyle(ref s) if s == "diagonal"));
    }

    #[test]
    fn legend_position_parsing() {
        assert_eq!(
            "north east".parse::<LegendPosition>().unwrap(),
            LegendPosition::NorthEast
        );
        assert_eq!(
            "South_West".parse::<LegendPosition>().unwrap(),
            LegendPosition::SouthWest
        );
        assert_eq!(
            "outer-north-east".parse::<LegendPosition>().unwrap(),
            LegendPosition::OuterNorthEast
        );
        assert!("middle".parse::<LegendPosition>().is_err());
        assert_eq!(LegendPosition::NorthWest.to_string(), "north west");
    }

    #[test]
    fn from_xy_preserves_order() {
        let s = Series::from_xy(
            SeriesKind::Line,
            &[3.0, 1.0, 2.0],
            &[30.0, 10.0, 20.0],
            None,
            None,
        )
        .unwrap();
        let xs: Vec<f64> = s.points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![3.0, 1.0, 2.0]);
        assert_eq!(s.points[2], Point { x: 2.0, y: 20.0 });
    }

    #[test]
    fn from_xy_rejects_mismatch() {
        let err = Series::from_xy(SeriesKind::Stem, &[1.0], &[], None, None).unwrap_err();
        assert!(matches!(err, PlotError::LengthMismatch { x_len: 1, y_len: 0 }));
    }
}

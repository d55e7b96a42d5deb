//! Error type shared by the figure builder, the renderer, and the output pipelines.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Everything that can go wrong while building or saving a figure.
///
/// Variants fall into three groups:
/// - **usage errors**: the caller broke a contract (mismatched arrays, unknown style names);
/// - **resource errors**: the output path could not be written;
/// - **external-tool errors**: the document compiler or its cleanup failed.
///
/// None of them are retried internally.
#[derive(Debug, Error)]
pub enum PlotError {
    /// `x` and `y` slices passed to `add_line`/`add_stem` differ in length.
    #[error("x and y must have the same length (x has {x_len}, y has {y_len})")]
    LengthMismatch { x_len: usize, y_len: usize },

    /// Axis style string other than `standard` or `center`.
    #[error("unknown axis style '{0}', expected 'standard' or 'center'")]
    UnknownAxisStyle(String),

    /// Legend position string that is not a known pgfplots anchor.
    #[error(
        "unknown legend position '{0}', expected one of 'north east', 'north west', \
         'south east', 'south west', 'outer north east'"
    )]
    UnknownLegendPosition(String),

    /// Figure description file could not be parsed.
    #[error("invalid figure config: {0}")]
    Config(String),

    /// Could not create, write, or persist a file.
    #[error("cannot write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The compiler executable could not be started.
    #[error("failed to start '{program}': {source}")]
    CompilerSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The compiler did not finish in time and was killed.
    #[error("'{program}' did not finish within {timeout:?}")]
    CompilerTimeout { program: String, timeout: Duration },

    /// The compiler ran but reported failure. The markup file is left in place.
    #[error("compilation of '{}' failed ({status}){}", markup.display(), excerpt_suffix(log_excerpt))]
    CompileFailed {
        markup: PathBuf,
        status: String,
        log_excerpt: Option<String>,
    },

    /// The compiler reported success but the expected artifact is absent.
    #[error("compiler reported success but '{}' was not produced", artifact.display())]
    MissingArtifact { artifact: PathBuf },

    /// Deleting an intermediate or auxiliary file failed.
    #[error("cannot remove intermediate file '{}': {source}", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn excerpt_suffix(excerpt: &Option<String>) -> String {
    match excerpt {
        Some(s) if !s.is_empty() => format!(": {s}"),
        _ => String::new(),
    }
}

impl PlotError {
    /// Caller contract violations (as opposed to I/O or toolchain failures).
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            PlotError::LengthMismatch { .. }
                | PlotError::UnknownAxisStyle(_)
                | PlotError::UnknownLegendPosition(_)
                | PlotError::Config(_)
        )
    }

    /// Failures of the external compiler step, after the markup was written.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            PlotError::CompilerSpawn { .. }
                | PlotError::CompilerTimeout { .. }
                | PlotError::CompileFailed { .. }
                | PlotError::MissingArtifact { .. }
                | PlotError::Cleanup { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PlotError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used across the crate.
pub type Result<T, E = PlotError> = std::result::Result<T, E>;

//! Output pipelines: write raw markup, or wrap it in a standalone document and
//! hand it to a LaTeX toolchain.
//!
//! The pipeline is chosen once from the target's extension ([`OutputPipeline::for_target`]):
//! `.pdf` and `.eps` (case-insensitive) compile, anything else gets the raw
//! `tikzpicture` text.
//!
//! The compiler is a trait ([`DocumentCompiler`]) so the compile pipeline can be
//! exercised without a TeX installation.

use crate::config::RenderOptions;
use crate::error::{PlotError, Result};
use crate::figure::Figure;
use crate::render;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

/// Final artifact produced by the compile pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Pdf,
    Eps,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Pdf => "pdf",
            ArtifactKind::Eps => "eps",
        }
    }
}

/// How a figure is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPipeline {
    /// Write the `tikzpicture` markup straight to the target.
    Markup,
    /// Wrap in a standalone document, compile, clean up.
    Compile(ArtifactKind),
}

impl OutputPipeline {
    pub fn for_target(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("pdf") => OutputPipeline::Compile(ArtifactKind::Pdf),
            Some("eps") => OutputPipeline::Compile(ArtifactKind::Eps),
            _ => OutputPipeline::Markup,
        }
    }
}

/// Everything a compiler needs to turn `<dir>/<stem>.tex` into `<dir>/<stem>.<ext>`.
#[derive(Debug, Clone)]
pub struct CompileJob {
    /// Directory holding the `.tex` file; the compiler runs inside it.
    pub workdir: PathBuf,
    /// File stem shared by the `.tex`, auxiliary files, and the artifact.
    pub stem: String,
    pub kind: ArtifactKind,
    pub timeout: Duration,
}

impl CompileJob {
    fn file(&self, ext: &str) -> PathBuf {
        self.workdir.join(format!("{}.{ext}", self.stem))
    }

    pub fn tex_path(&self) -> PathBuf {
        self.file("tex")
    }

    pub fn log_path(&self) -> PathBuf {
        self.file("log")
    }

    /// Where the toolchain leaves its result.
    pub fn artifact_path(&self) -> PathBuf {
        self.file(self.kind.extension())
    }

    /// Files deleted after a successful compile.
    pub fn intermediates(&self) -> Vec<PathBuf> {
        let mut files = vec![self.tex_path(), self.file("aux"), self.log_path()];
        if self.kind == ArtifactKind::Eps {
            files.push(self.file("dvi"));
        }
        files
    }
}

/// What the compiler reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutcome {
    pub success: bool,
    /// Human-readable status, e.g. `exit status: 1`.
    pub status: String,
    /// First error lines from the compiler log, if any.
    pub log_excerpt: Option<String>,
}

impl CompileOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            status: "exit status: 0".into(),
            log_excerpt: None,
        }
    }
}

/// External document compiler. Invoked exactly once per compile-pipeline save.
pub trait DocumentCompiler {
    /// Compile `job.tex_path()`. Spawn failures and timeouts are errors; a
    /// compiler that ran and failed is reported through the outcome.
    fn compile(&self, job: &CompileJob) -> Result<CompileOutcome>;
}

/// The real toolchain: `pdflatex` for PDF, `latex` + `dvips -E` for EPS.
#[derive(Debug, Clone)]
pub struct LatexCompiler {
    pub pdflatex: String,
    pub latex: String,
    pub dvips: String,
}

impl Default for LatexCompiler {
    fn default() -> Self {
        Self::from_options(&RenderOptions::default())
    }
}

impl LatexCompiler {
    pub fn from_options(opts: &RenderOptions) -> Self {
        Self {
            pdflatex: opts.latex_program.clone(),
            latex: opts.dvi_latex_program.clone(),
            dvips: opts.dvips_program.clone(),
        }
    }

    fn latex_args(job: &CompileJob) -> Vec<String> {
        vec![
            "-interaction=nonstopmode".into(),
            "-halt-on-error".into(),
            format!("{}.tex", job.stem),
        ]
    }
}

impl DocumentCompiler for LatexCompiler {
    fn compile(&self, job: &CompileJob) -> Result<CompileOutcome> {
        let program = match job.kind {
            ArtifactKind::Pdf => &self.pdflatex,
            ArtifactKind::Eps => &self.latex,
        };
        // One deadline covers the whole toolchain, `dvips` included.
        let deadline = Instant::now() + job.timeout;
        let args = Self::latex_args(job);
        let status = run_until(program, &args, &job.workdir, deadline, job.timeout)?;
        if !status.success() {
            return Ok(CompileOutcome {
                success: false,
                status: status.to_string(),
                log_excerpt: log_excerpt(&job.log_path()),
            });
        }

        if job.kind == ArtifactKind::Eps {
            let args = vec![
                "-E".to_string(),
                "-o".to_string(),
                format!("{}.eps", job.stem),
                format!("{}.dvi", job.stem),
            ];
            let status = run_until(&self.dvips, &args, &job.workdir, deadline, job.timeout)?;
            if !status.success() {
                return Ok(CompileOutcome {
                    success: false,
                    status: format!("{}: {status}", self.dvips),
                    log_excerpt: None,
                });
            }
        }

        Ok(CompileOutcome {
            success: true,
            status: status.to_string(),
            log_excerpt: None,
        })
    }
}

/// Run `program` in `cwd`, killing it once `deadline` has passed. `limit` is
/// the budget reported in [`PlotError::CompilerTimeout`].
fn run_until(
    program: &str,
    args: &[String],
    cwd: &Path,
    deadline: Instant,
    limit: Duration,
) -> Result<ExitStatus> {
    debug!("running {program} {} in '{}'", args.join(" "), cwd.display());
    let mut child = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| PlotError::CompilerSpawn {
            program: program.to_string(),
            source,
        })?;

    loop {
        let polled = child.try_wait().map_err(|source| PlotError::CompilerSpawn {
            program: program.to_string(),
            source,
        })?;
        if let Some(status) = polled {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            // Already exited between the poll and here is fine; reap either way.
            let _ = child.kill();
            let _ = child.wait();
            return Err(PlotError::CompilerTimeout {
                program: program.to_string(),
                timeout: limit,
            });
        }
        thread::sleep(Duration::from_millis(25));
    }
}

/// TeX error lines start with `!`; keep the first one plus the line after it.
fn log_excerpt(log: &Path) -> Option<String> {
    let bytes = fs::read(log).ok()?;
    let text = String::from_utf8_lossy(&bytes);
    let mut lines = text.lines().skip_while(|l| !l.starts_with('!'));
    let first = lines.next()?;
    match lines.next() {
        Some(next) if !next.trim().is_empty() => Some(format!("{first} {}", next.trim())),
        _ => Some(first.to_string()),
    }
}

type LockMap = HashMap<PathBuf, Arc<Mutex<()>>>;

fn locks() -> MutexGuard<'static, LockMap> {
    static LOCKS: OnceLock<Mutex<LockMap>> = OnceLock::new();
    LOCKS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

/// Key shared by every file a job touches: `<dir>/<stem>`, with `dir`
/// canonicalized so `./a.pdf` and `a.pdf` collide as they should.
fn lock_key(job: &CompileJob) -> PathBuf {
    fs::canonicalize(&job.workdir)
        .unwrap_or_else(|_| job.workdir.clone())
        .join(&job.stem)
}

/// Jobs with the same key share intermediate files, so they take turns.
fn acquire_lock(key: &Path) -> Arc<Mutex<()>> {
    locks().entry(key.to_path_buf()).or_default().clone()
}

/// Drop the map entry once no other job holds or waits on it. The caller
/// must have dropped its own `Arc` first.
fn release_lock(key: &Path) {
    let mut map = locks();
    if map.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
        map.remove(key);
    }
}

/// Delete a file if present.
fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("removed stale '{}'", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(PlotError::io(path, e)),
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Write `contents` to a temp file beside `target` and rename it into place,
/// so a failed write never leaves a truncated file at `target`.
fn write_atomic(target: &Path, contents: &str) -> Result<()> {
    let dir = parent_dir(target);
    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| PlotError::io(&dir, e))?;
    tmp.write_all(contents.as_bytes())
        .and_then(|_| tmp.flush())
        .map_err(|e| PlotError::io(target, e))?;
    tmp.persist(target)
        .map_err(|e| PlotError::io(target, e.error))?;
    debug!("wrote {} bytes to '{}'", contents.len(), target.display());
    Ok(())
}

fn remove_intermediates(files: &[PathBuf]) -> Result<()> {
    for f in files {
        match fs::remove_file(f) {
            Ok(()) => debug!("removed '{}'", f.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(PlotError::Cleanup {
                    path: f.clone(),
                    source,
                });
            }
        }
    }
    Ok(())
}

/// Render `fig` through the pipeline its target selects. Consumes the figure.
pub fn save_figure<C: DocumentCompiler + ?Sized>(
    fig: Figure,
    opts: &RenderOptions,
    compiler: &C,
) -> Result<PathBuf> {
    let target = fig.output().to_path_buf();
    let pipeline = OutputPipeline::for_target(&target);
    debug!(
        "saving '{}' via {:?} ({} series)",
        target.display(),
        pipeline,
        fig.series().len()
    );

    match pipeline {
        OutputPipeline::Markup => write_atomic(&target, &render::markup(&fig))?,
        OutputPipeline::Compile(kind) => compile_figure(&fig, &target, kind, opts, compiler)?,
    }

    info!("saved figure to '{}'", target.display());
    Ok(target)
}

fn compile_figure<C: DocumentCompiler + ?Sized>(
    fig: &Figure,
    target: &Path,
    kind: ArtifactKind,
    opts: &RenderOptions,
    compiler: &C,
) -> Result<()> {
    let stem = target
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            PlotError::io(
                target,
                io::Error::new(io::ErrorKind::InvalidInput, "output name has no usable stem"),
            )
        })?
        .to_string();

    let job = CompileJob {
        workdir: parent_dir(target),
        stem,
        kind,
        timeout: opts.timeout,
    };

    let key = lock_key(&job);
    let lock = acquire_lock(&key);
    let result = {
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        compile_locked(fig, target, &job, opts, compiler)
    };
    drop(lock);
    release_lock(&key);
    result
}

fn compile_locked<C: DocumentCompiler + ?Sized>(
    fig: &Figure,
    target: &Path,
    job: &CompileJob,
    opts: &RenderOptions,
    compiler: &C,
) -> Result<()> {
    // Output from an earlier run must not pass for this run's artifact.
    let artifact = job.artifact_path();
    remove_stale(&artifact)?;
    if artifact != target {
        remove_stale(target)?;
    }

    let tex = job.tex_path();
    write_atomic(&tex, &render::standalone_document(fig))?;

    let outcome = compiler.compile(job)?;
    if !outcome.success {
        warn!(
            "compilation of '{}' failed ({}); keeping intermediate files",
            tex.display(),
            outcome.status
        );
        return Err(PlotError::CompileFailed {
            markup: tex,
            status: outcome.status,
            log_excerpt: outcome.log_excerpt,
        });
    }

    if !artifact.exists() {
        return Err(PlotError::MissingArtifact { artifact });
    }
    // `FIG.PDF` is produced as `FIG.pdf`; move it onto the requested name.
    if artifact != target {
        fs::rename(&artifact, target).map_err(|e| PlotError::io(target, e))?;
    }

    if opts.keep_intermediate {
        debug!("keeping intermediate files for '{}'", target.display());
        Ok(())
    } else {
        remove_intermediates(&job.intermediates())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::tempdir;

    /// Writes the artifact plus the usual aux/log files, like a successful run.
    struct FakeOk {
        calls: Cell<usize>,
    }

    impl DocumentCompiler for FakeOk {
        fn compile(&self, job: &CompileJob) -> Result<CompileOutcome> {
            self.calls.set(self.calls.get() + 1);
            assert!(job.tex_path().exists());
            for ext in ["aux", "log", job.kind.extension()] {
                fs::write(job.workdir.join(format!("{}.{ext}", job.stem)), b"x").unwrap();
            }
            Ok(CompileOutcome::ok())
        }
    }

    #[test]
    fn pipeline_from_extension() {
        use OutputPipeline::*;
        assert_eq!(
            OutputPipeline::for_target(Path::new("a.pdf")),
            Compile(ArtifactKind::Pdf)
        );
        assert_eq!(
            OutputPipeline::for_target(Path::new("dir/a.EPS")),
            Compile(ArtifactKind::Eps)
        );
        assert_eq!(OutputPipeline::for_target(Path::new("a.tikz")), Markup);
        assert_eq!(OutputPipeline::for_target(Path::new("a.tex")), Markup);
        assert_eq!(OutputPipeline::for_target(Path::new("noext")), Markup);
        assert_eq!(OutputPipeline::for_target(Path::new(".pdf")), Markup);
    }

    #[test]
    fn eps_job_cleans_dvi_too() {
        let job = CompileJob {
            workdir: PathBuf::from("w"),
            stem: "fig".into(),
            kind: ArtifactKind::Eps,
            timeout: Duration::from_secs(1),
        };
        assert_eq!(job.artifact_path(), PathBuf::from("w/fig.eps"));
        assert!(job.intermediates().contains(&PathBuf::from("w/fig.dvi")));
    }

    #[test]
    fn compile_success_cleans_up() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("plot.pdf");
        let fig = Figure::new(&target);
        let fake = FakeOk {
            calls: Cell::new(0),
        };
        let out = save_figure(fig, &RenderOptions::default(), &fake).unwrap();
        assert_eq!(out, target);
        assert_eq!(fake.calls.get(), 1);
        assert!(target.exists());
        for ext in ["tex", "aux", "log"] {
            assert!(!dir.path().join(format!("plot.{ext}")).exists(), "{ext} left behind");
        }
    }

    #[test]
    fn keep_intermediate_leaves_tex() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("plot.pdf");
        let opts = RenderOptions {
            keep_intermediate: true,
            ..RenderOptions::default()
        };
        let fake = FakeOk {
            calls: Cell::new(0),
        };
        save_figure(Figure::new(&target), &opts, &fake).unwrap();
        let tex = fs::read_to_string(dir.path().join("plot.tex")).unwrap();
        assert!(tex.starts_with("\\documentclass[tikz]{standalone}"));
        assert!(tex.ends_with("\\end{document}\n"));
    }

    #[test]
    fn log_excerpt_picks_first_error() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("x.log");
        fs::write(
            &log,
            "This is pdfTeX\n(./x.tex\n! Undefined control sequence.\nl.7 \\foo\n\n! second\n",
        )
        .unwrap();
        assert_eq!(
            log_excerpt(&log).as_deref(),
            Some("! Undefined control sequence. l.7 \\foo")
        );
        assert_eq!(log_excerpt(&dir.path().join("missing.log")), None);
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let dir = tempdir().unwrap();
        let limit = Duration::from_secs(1);
        let err = run_until(
            "texplot-definitely-not-a-program",
            &[],
            dir.path(),
            Instant::now() + limit,
            limit,
        )
        .unwrap_err();
        assert!(matches!(err, PlotError::CompilerSpawn { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn slow_program_times_out() {
        let dir = tempdir().unwrap();
        let start = Instant::now();
        let limit = Duration::from_millis(100);
        let err = run_until("sleep", &["5".to_string()], dir.path(), start + limit, limit)
            .unwrap_err();
        assert!(matches!(err, PlotError::CompilerTimeout { timeout, .. } if timeout == limit));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn second_run_gets_only_the_remaining_budget() {
        let dir = tempdir().unwrap();
        let limit = Duration::from_millis(1500);
        let deadline = Instant::now() + limit;
        let one_sec = ["1".to_string()];
        run_until("sleep", &one_sec, dir.path(), deadline, limit).unwrap();
        let err = run_until("sleep", &one_sec, dir.path(), deadline, limit).unwrap_err();
        assert!(matches!(err, PlotError::CompilerTimeout { .. }));
    }

    #[test]
    fn latex_runs_on_relative_stem_in_workdir() {
        let job = CompileJob {
            workdir: PathBuf::from("some/dir"),
            stem: "fig".into(),
            kind: ArtifactKind::Pdf,
            timeout: Duration::from_secs(1),
        };
        let args = LatexCompiler::latex_args(&job);
        assert_eq!(args.last().map(String::as_str), Some("fig.tex"));
        assert!(!args.iter().any(|a| a.contains("some/dir")));
    }

    #[test]
    fn same_stem_shares_a_lock_key() {
        let dir = tempdir().unwrap();
        let job = |kind| CompileJob {
            workdir: dir.path().to_path_buf(),
            stem: "plot".into(),
            kind,
            timeout: Duration::from_secs(1),
        };
        assert_eq!(lock_key(&job(ArtifactKind::Pdf)), lock_key(&job(ArtifactKind::Eps)));
    }

    #[test]
    fn lock_entry_released_after_save() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("released.pdf");
        let fake = FakeOk {
            calls: Cell::new(0),
        };
        save_figure(Figure::new(&target), &RenderOptions::default(), &fake).unwrap();
        let key = fs::canonicalize(dir.path()).unwrap().join("released");
        assert!(!locks().contains_key(&key));
    }
}

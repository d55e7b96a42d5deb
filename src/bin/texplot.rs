use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use texplot_rs::{AxisStyle, Figure, FigureConfig, RenderOptions};

#[derive(Parser, Debug)]
#[command(
    name = "texplot",
    version,
    about = "Render numeric series as PGFPlots/TikZ figures (raw markup, PDF, or EPS)"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a JSON figure description to its output target.
    Render(RenderArgs),
    /// Print the markup of a JSON figure description to stdout.
    Markup {
        /// Path to the figure description (JSON).
        config: PathBuf,
    },
    /// Render the built-in sample figure (damped responses plus a stem plot).
    Demo(DemoArgs),
}

#[derive(Args, Debug)]
struct CompileArgs {
    /// Kill the LaTeX toolchain after this many seconds.
    #[arg(long)]
    timeout: Option<u64>,
    /// Keep the .tex/.aux/.log files after a successful compile.
    #[arg(long, default_value_t = false)]
    keep_intermediate: bool,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Path to the figure description (JSON).
    config: PathBuf,
    /// Override the output target from the description (.pdf/.eps compile, anything else is raw markup).
    #[arg(long)]
    out: Option<PathBuf>,
    #[command(flatten)]
    compile: CompileArgs,
}

#[derive(Args, Debug)]
struct DemoArgs {
    /// Output target (.pdf/.eps compile, anything else is raw markup).
    #[arg(long, default_value = "out.pdf")]
    out: PathBuf,
    #[command(flatten)]
    compile: CompileArgs,
}

fn render_options(args: &CompileArgs) -> RenderOptions {
    let mut opts = RenderOptions::from_env();
    if let Some(secs) = args.timeout {
        opts.timeout = Duration::from_secs(secs);
    }
    opts.keep_intermediate = args.keep_intermediate;
    opts
}

fn load_figure(path: &Path, out: Option<&Path>) -> Result<Figure> {
    let mut cfg = FigureConfig::from_path(path)
        .with_context(|| format!("loading figure description {}", path.display()))?;
    if let Some(out) = out {
        cfg.output = out.to_path_buf();
    }
    Ok(cfg.into_figure()?)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_module_path(false)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Markup { config } => {
            let fig = load_figure(&config, None)?;
            print!("{}", fig.to_markup());
            Ok(())
        }
        Command::Demo(args) => cmd_demo(args),
    }
}

fn cmd_render(args: RenderArgs) -> Result<()> {
    let fig = load_figure(&args.config, args.out.as_deref())?;
    let opts = render_options(&args.compile);
    let written = fig.save_with(&opts)?;
    eprintln!("Wrote figure to {}", written.display());
    Ok(())
}

fn linspace(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

fn cmd_demo(args: DemoArgs) -> Result<()> {
    let t = linspace(0.0, 0.01, 1000);
    let damped_sin: Vec<f64> = t.iter().map(|&x| (-x / 8.0).exp() * (2.0 * x).sin()).collect();
    let crit_damped: Vec<f64> = t.iter().map(|&x| x * (-x / 2.0).exp()).collect();

    let n = linspace(0.0, 1.0, 11);
    let decay: Vec<f64> = n.iter().map(|&k| 0.75f64.powf(k)).collect();

    let mut fig = Figure::new(&args.out);
    fig.add_line(&t, &damped_sin, Some("teal"), Some("$y_1(t)$"))?;
    fig.add_line(&t, &crit_damped, Some("orange"), Some("$y_2(t)$"))?;
    fig.add_stem(&n, &decay, Some("red"), Some("$y_d[n]$"))?;

    fig.set_axis_style(AxisStyle::Centered);
    fig.set_x_range(0.0, 10.0);
    fig.set_y_range(-1.1, 1.1);
    fig.set_grid(true);
    fig.set_dimensions(12.0, 8.0);
    fig.set_x_label("$t$");
    fig.set_y_label("$y(t)$");

    let written = fig
        .save_with(&render_options(&args.compile))
        .with_context(|| format!("rendering demo figure to {}", args.out.display()))?;
    eprintln!("Wrote figure to {}", written.display());
    Ok(())
}

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr};
use scrivet_core::{Editor, EditorConfig};

mod script;

#[derive(Parser)]
#[command(version, about = "Scrivet - replay editing scripts against HTML fragments", long_about = None)]
struct Cli {
    /// HTML fragment to edit (`-` reads stdin)
    input: PathBuf,

    /// Script file, one step per line
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Extra steps, run after the script file
    #[arg(short = 'e', long = "exec")]
    exec: Vec<String>,

    /// Editor configuration as JSON
    #[arg(short, long, env = "SCRIVET_CONFIG")]
    config: Option<PathBuf>,

    /// Print the final markup with selection markers and classes
    #[arg(long)]
    markers: bool,
}

fn main() -> Result<()> {
    init_miette()?;
    init_tracing();

    let cli = Cli::parse();

    let markup = read_input(&cli.input)?;
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EditorConfig::default(),
    };

    let mut src = match &cli.script {
        Some(path) => std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("reading script {}", path.display()))?,
        None => String::new(),
    };
    for step in &cli.exec {
        src.push('\n');
        src.push_str(step);
    }
    let steps = script::parse(&src)?;

    let mut editor = Editor::from_markup(&markup, config)
        .into_diagnostic()
        .wrap_err("parsing input markup")?;
    tracing::debug!(steps = steps.len(), "replaying script");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    script::run(&mut editor, &steps, &mut out)?;

    let result = if cli.markers {
        editor.markup()
    } else {
        editor.content_markup()
    };
    writeln!(out, "{result}").into_diagnostic()?;
    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        return std::io::read_to_string(std::io::stdin()).into_diagnostic();
    }
    std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading {}", path.display()))
}

fn load_config(path: &Path) -> Result<EditorConfig> {
    let raw = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&raw)
        .into_diagnostic()
        .wrap_err_with(|| format!("parsing config {}", path.display()))
}

/// Logs go to stderr so stdout stays pure markup. `RUST_LOG` overrides
/// the default `warn` level.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

fn init_miette() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))?;
    miette::set_panic_hook();
    Ok(())
}

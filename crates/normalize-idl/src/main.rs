use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use normalize_idl::{Config, Translator};

/// Translate IDL source files into numpy-based Python.
#[derive(Parser, Debug)]
#[command(name = "idl2py", version, about)]
struct Args {
    /// Input files; `-` reads standard input.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Write the translation here (single input only). Defaults to the
    /// input path with a `.py` extension, or stdout for `-`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file, instead of the discovered one.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report diagnostics without writing any output.
    #[arg(long)]
    check: bool,
}

fn main() -> ExitCode {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.output.is_some() && args.inputs.len() > 1 {
        eprintln!("idl2py: --output requires a single input file");
        return ExitCode::FAILURE;
    }

    let translator = match Config::load(args.config.as_deref()).and_then(Translator::new) {
        Ok(translator) => translator,
        Err(err) => {
            eprintln!("idl2py: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut clean = true;
    for input in &args.inputs {
        if let Err(err) = run(&translator, input, &args, &mut clean) {
            eprintln!("idl2py: {}: {err}", display_name(input));
            clean = false;
        }
    }

    if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn display_name(path: &Path) -> String {
    if is_stdin(path) {
        "<stdin>".to_string()
    } else {
        path.display().to_string()
    }
}

fn run(
    translator: &Translator,
    input: &Path,
    args: &Args,
    clean: &mut bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = if is_stdin(input) {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        source
    } else {
        std::fs::read_to_string(input)?
    };

    let translation = translator.translate(&source)?;
    let name = display_name(input);
    for diagnostic in &translation.diagnostics {
        eprintln!("{name}:{diagnostic}");
    }
    if !translation.is_clean() {
        *clean = false;
    }
    tracing::debug!(input = %name, diagnostics = translation.diagnostics.len(), "translated");

    if args.check {
        return Ok(());
    }
    match (&args.output, is_stdin(input)) {
        (Some(path), _) => std::fs::write(path, &translation.code)?,
        (None, true) => std::io::stdout().write_all(translation.code.as_bytes())?,
        (None, false) => std::fs::write(input.with_extension("py"), &translation.code)?,
    }
    Ok(())
}

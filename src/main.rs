use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use p4ir::ir::blocks::P4Program;
use p4ir::ir::dbprint::{DbPrintOptions, dbprint_with};
use p4ir::ir::json::{from_json_str, to_json_string};
use p4ir::ir::pipeline::{Pass, Pipeline};
use p4ir::ir::transforms::{AnnotationFilter, DuplicateDeclarationCheck, RenameDeclarations};
use p4ir::ir::visitor::{NodeCounter, inspect};
use p4ir::ir::{DiagnosticCollector, IdAllocator, Node, TracingSink};
use p4ir::logging::init_logger;

#[derive(Parser, Debug)]
#[command(name = "p4ir")]
#[command(about = "Inspect and transform P4 IR trees stored as JSON")]
struct Args {
    /// Log level for stderr (otherwise RUST_LOG, otherwise info)
    #[arg(long = "log-level")]
    log_level: Option<String>,

    /// Disable ANSI colors in log output
    #[arg(long = "no-color")]
    no_color: bool,

    /// Also write a DEBUG log file to the user cache directory
    #[arg(long = "log-file")]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a tree and report duplicate declarations and convention warnings
    Check {
        input: PathBuf,
    },
    /// Print a tree, one line per top-level declaration
    Print {
        input: PathBuf,
        /// One line per node with internal names and locations
        #[arg(long)]
        debug: bool,
        /// Include inferred expression types (with --debug)
        #[arg(long)]
        types: bool,
    },
    /// Re-emit a tree as JSON, optionally transformed
    Json {
        input: PathBuf,
        /// Drop annotations with this name (repeatable)
        #[arg(long = "drop-annotation")]
        drop_annotations: Vec<String>,
        /// Rename declarations and references, written OLD=NEW (repeatable)
        #[arg(long = "rename")]
        renames: Vec<String>,
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn load(path: &Path, ids: &IdAllocator) -> Result<Node> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let root = from_json_str(&text, ids).with_context(|| format!("loading IR from {}", path.display()))?;
    let mut counter = NodeCounter::new();
    inspect(&root, &mut counter);
    debug!("loaded {} node(s) from {}", counter.total(), path.display());
    Ok(root)
}

fn check(input: &Path) -> Result<ExitCode> {
    let ids = IdAllocator::new();
    let root = load(input, &ids)?;
    let mut pipeline = Pipeline::new();
    pipeline.add_pass(Pass::inspector("duplicates", &[], DuplicateDeclarationCheck::new()))?;
    let mut diagnostics = DiagnosticCollector::new();
    pipeline.run(&root, &mut diagnostics)?;
    for d in diagnostics.iter() {
        println!("{}", d);
    }
    info!("{} error(s), {} warning(s)", diagnostics.error_count(), diagnostics.warning_count());
    Ok(if diagnostics.error_count() > 0 { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

fn print(input: &Path, debug: bool, types: bool) -> Result<()> {
    let ids = IdAllocator::new();
    let root = load(input, &ids)?;
    if debug {
        print!("{}", dbprint_with(&root, DbPrintOptions { show_types: types }));
    } else if let Some(program) = root.to::<P4Program>() {
        for object in program.objects.iter() {
            println!("{} {}", object.kind(), object);
        }
    } else {
        println!("{} {}", root.kind(), root);
    }
    Ok(())
}

fn parse_rename(spec: &str) -> Result<(&str, &str)> {
    match spec.split_once('=') {
        Some((from, to)) if !from.is_empty() && !to.is_empty() => Ok((from, to)),
        _ => bail!("invalid rename '{}', expected OLD=NEW", spec),
    }
}

fn json(input: &Path, drop_annotations: &[String], renames: &[String], output: Option<&Path>) -> Result<()> {
    let ids = IdAllocator::new();
    let root = load(input, &ids)?;

    let mut pipeline = Pipeline::new();
    if !drop_annotations.is_empty() {
        pipeline.add_pass(Pass::transform(
            "drop-annotations",
            &[],
            AnnotationFilter::dropping(drop_annotations.iter().cloned()),
        ))?;
    }
    if !renames.is_empty() {
        let mut rename = RenameDeclarations::new();
        for spec in renames {
            let (from, to) = parse_rename(spec)?;
            rename = rename.rename(from, to);
        }
        pipeline.add_pass(Pass::transform("rename", &[], rename))?;
    }
    let root = pipeline.run(&root, &mut TracingSink)?;

    let text = to_json_string(&root)?;
    match output {
        Some(path) => fs::write(path, text).with_context(|| format!("writing {}", path.display()))?,
        None => println!("{}", text),
    }
    Ok(())
}

fn run(args: Args) -> Result<ExitCode> {
    match args.command {
        Command::Check { input } => check(&input),
        Command::Print { input, debug, types } => print(&input, debug, types).map(|()| ExitCode::SUCCESS),
        Command::Json { input, drop_annotations, renames, output } => {
            json(&input, &drop_annotations, &renames, output.as_deref()).map(|()| ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let _guard = match init_logger(args.no_color, args.log_level.as_deref(), args.log_file) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

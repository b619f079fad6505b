use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use extract_interface_bulk::config::{discover_config, load_from_path, RunConfig};
use extract_interface_bulk::recognize::{classify, interface_name, ClassStatus};
use extract_interface_bulk::{
    walk_project, CommandHost, ExtractHost, HourlyFileSink, InterfaceRewriter, NamespaceOutcome,
    NoHost, RunContext, RunSummary, TextBuffer,
};
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "extract-interface-bulk")]
#[command(about = "Batch interface extraction for C# class files", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract interfaces for every eligible class in a project
    Run {
        /// Project root directory
        #[arg(short, long, default_value = ".")]
        project: PathBuf,

        /// Config file (defaults to extract-interface.toml in the project)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Dry run - report what would be extracted without invoking the host
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Output format for the summary
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// List class files and whether they still need an interface
    Scan {
        #[arg(short, long, default_value = ".")]
        project: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Apply the interface rewrite rules to existing interface files
    Rewrite {
        /// Interface files (I<Name>.cs)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Show what would change without writing
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            project,
            config,
            dry_run,
            format,
        } => cmd_run(&project, config, dry_run, format),

        Commands::Scan { project, config } => cmd_scan(&project, config),

        Commands::Rewrite {
            files,
            config,
            dry_run,
            diff,
        } => cmd_rewrite(&files, config, dry_run, diff),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Helper: Load the explicit config, or discover one next to the project,
/// or fall back to defaults.
fn load_config(project: &Path, explicit: Option<PathBuf>) -> Result<RunConfig> {
    let path = match explicit {
        Some(path) => Some(path),
        None => discover_config(project),
    };
    match path {
        Some(path) => {
            eprintln!("{}", format!("Config: {}", path.display()).dimmed());
            Ok(load_from_path(&path)?)
        }
        None => {
            eprintln!("{}", "No config file found, using defaults".dimmed());
            Ok(RunConfig::default())
        }
    }
}

fn cmd_run(project: &Path, config: Option<PathBuf>, dry_run: bool, format: Format) -> Result<()> {
    let project = project
        .canonicalize()
        .with_context(|| format!("project root {} not found", project.display()))?;
    let config = load_config(&project, config)?;

    let host: Box<dyn ExtractHost> = match &config.host.program {
        Some(program) => {
            let host = CommandHost::new(program.clone(), config.host.args.clone())
                .with_working_dir(&project);
            tracing::debug!(program = host.program(), "using command host");
            Box::new(host)
        }
        None if dry_run => Box::new(NoHost),
        None => anyhow::bail!(
            "{}\n  {}",
            "No host command configured.".red(),
            "Set [host] program in extract-interface.toml, or pass --dry-run"
        ),
    };

    let log_dir = config
        .log
        .dir
        .clone()
        .unwrap_or_else(HourlyFileSink::default_dir);
    let sink = HourlyFileSink::new(log_dir);

    // stdout carries only the summary
    eprintln!("Project: {}", project.display());
    eprintln!("{}", format!("Run log: {}", sink.dir().display()).dimmed());
    if dry_run {
        eprintln!("{}", "[DRY RUN - the host will not be invoked]".cyan());
    }
    eprintln!();

    let summary = RunContext::new(&project, &config, host.as_ref(), &sink)
        .dry_run(dry_run)
        .run()?;

    match format {
        Format::Text => print_summary(&summary),
        Format::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }

    if summary.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let verb = if summary.dry_run {
        "Would extract"
    } else {
        "Extracted"
    };
    for class in &summary.processed {
        println!("{} {}: {}", "✓".green(), verb, class);
    }
    for class in &summary.already_extracted {
        println!("{} Already has interface: {}", "⊙".yellow(), class);
    }
    for skipped in &summary.skipped {
        println!(
            "{} {} ({})",
            "⊘".cyan(),
            skipped.path.display(),
            skipped.reason.dimmed()
        );
    }
    for failed in &summary.failed {
        eprintln!(
            "{} {}: {} - {}",
            "✗".red(),
            failed.path.display(),
            failed.stage,
            failed.reason
        );
    }
    for path in &summary.unreadable {
        eprintln!("{} Could not read {}", "✗".red(), path.display());
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} processed", format!("{}", summary.processed.len()).green());
    println!(
        "  {} already extracted",
        format!("{}", summary.already_extracted.len()).yellow()
    );
    println!("  {} skipped", format!("{}", summary.skipped.len()).cyan());
    println!(
        "  {} failed",
        format!("{}", summary.failed.len() + summary.unreadable.len()).red()
    );
}

fn cmd_scan(project: &Path, config: Option<PathBuf>) -> Result<()> {
    let config = load_config(project, config)?;
    let walk = walk_project(project, &config.walk.exclude_folders)?;
    let filter = config.candidate_filter();

    let mut pending = Vec::new();
    let mut done = Vec::new();
    let mut ignored = Vec::new();

    for path in filter.filter(&walk.files) {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), path.display(), e);
                continue;
            }
        };
        match classify(&content, &config.classes.ignore) {
            ClassStatus::Candidate(decl) => pending.push((decl.name, path)),
            ClassStatus::AlreadyExtracted(decl) => done.push((decl.name, path)),
            ClassStatus::Ignored(decl) => ignored.push((decl.name, path)),
            ClassStatus::NotFound => {}
        }
    }

    println!("{}", "Class Scan Report".bold());
    println!("Project: {}", project.display());
    println!();

    let groups = [
        ("⊙".yellow(), "NEEDS INTERFACE".yellow().bold(), &pending),
        ("✓".green(), "HAS INTERFACE".green().bold(), &done),
        ("⊘".cyan(), "IGNORED".cyan().bold(), &ignored),
    ];
    for (icon, title, entries) in groups {
        if entries.is_empty() {
            continue;
        }
        println!("{} {} ({} classes)", icon, title, entries.len());
        for (name, path) in entries.iter() {
            println!("  - {} {}", name, path.display().to_string().dimmed());
        }
        println!();
    }

    for failure in &walk.failures {
        eprintln!("{} {}", "✗".red(), failure);
    }
    Ok(())
}

fn cmd_rewrite(
    files: &[PathBuf],
    config: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
) -> Result<()> {
    let config = load_config(Path::new("."), config)?;
    let rewriter = InterfaceRewriter::new(&config.interface, &config.classes.base_exempt);
    let mut failed = 0;

    for file in files {
        let Some(class_name) = class_name_for(file) else {
            eprintln!(
                "{} {}: not an interface file name (expected I<Name>)",
                "✗".red(),
                file.display()
            );
            failed += 1;
            continue;
        };

        let mut buffer = match TextBuffer::open(file) {
            Ok(buffer) => buffer,
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                failed += 1;
                continue;
            }
        };
        let original = buffer.text().to_string();

        let report = match rewriter.rewrite(&mut buffer, &class_name) {
            Ok(report) => report,
            Err(e) => {
                eprintln!("{} {}: {}", "✗".red(), file.display(), e);
                failed += 1;
                continue;
            }
        };

        if !report.changed() {
            println!("{} {}: Already rewritten", "⊙".yellow(), file.display());
            continue;
        }
        if report.namespace == NamespaceOutcome::NotFound {
            println!(
                "{} {}: namespace to rewrite not found",
                "⊘".cyan(),
                file.display()
            );
        }

        if dry_run {
            println!("{} {}: Would rewrite", "✓".green(), file.display());
        } else if let Err(e) = buffer.save() {
            eprintln!("{} {}: {}", "✗".red(), file.display(), e);
            failed += 1;
            continue;
        } else {
            println!("{} {}: Rewritten", "✓".green(), file.display());
        }

        if show_diff {
            display_diff(file, &original, buffer.text());
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

/// `IWidget.cs` -> `Widget`
fn class_name_for(file: &Path) -> Option<String> {
    let stem = file.file_stem()?.to_str()?;
    let class = stem.strip_prefix('I').filter(|rest| !rest.is_empty())?;
    (interface_name(class) == stem).then(|| class.to_string())
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (rewritten)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

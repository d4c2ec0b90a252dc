use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use covar::app::{App, ExportResult, LookupOutcome, ProgressEvent, ProgressSink, VariantReport};
use covar::assets::Assets;
use covar::config::{ConfigLoader, ConfigOverrides, ResolvedConfig};
use covar::domain::{KeyField, SearchKey};
use covar::error::CovarError;
use covar::output::{JsonOutput, OutputMode};
use covar::pages;
use covar::store::Store;
use covar::tui::Tui;

#[derive(Parser)]
#[command(name = "covar")]
#[command(about = "Molecular and epidemiological lookup for major SARS-CoV-2 variants")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    #[arg(long, global = true, help = "Path to a covar.json config file")]
    config: Option<String>,

    #[arg(long, global = true, help = "SQLite database holding the covar table")]
    db: Option<String>,

    #[arg(long, global = true, help = "Directory with mutation charts and help media")]
    resources: Option<String>,

    #[arg(long, global = true, help = "Directory that receives exported workbooks")]
    out: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Look a variant up by Pango lineage or WHO label")]
    Lookup(LookupArgs),
    #[command(about = "Write the mutation workbook of a variant")]
    Export(ExportArgs),
    #[command(about = "List stored variants")]
    List,
    #[command(about = "Show credits, data sources and disclaimer")]
    About,
    #[command(about = "Show the usage guide and help media")]
    Guide,
}

#[derive(Args)]
struct LookupArgs {
    #[arg(long)]
    lineage: Option<String>,

    #[arg(long)]
    label: Option<String>,

    #[arg(long, help = "Also write \"<key> mutations.xlsx\"")]
    export: bool,
}

#[derive(Args)]
struct ExportArgs {
    key: String,

    #[arg(long, value_enum, default_value_t = KeyField::Lineage)]
    by: KeyField,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(covar) = report.downcast_ref::<CovarError>() {
            return ExitCode::from(map_exit_code(covar));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CovarError) -> u8 {
    match error {
        CovarError::NotFound(_) | CovarError::EmptyKey | CovarError::InvalidKeyField(_) => 2,
        CovarError::StoreUnavailable(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = ConfigLoader::resolve(cli.config.as_deref())?.with_overrides(ConfigOverrides {
        database: cli.db,
        resources: cli.resources,
        export_dir: cli.out,
    });
    let app = App::new(
        Store::new(config.database.clone()),
        Assets::new(config.resources.clone()),
    );

    match cli.command {
        Some(Commands::Lookup(args)) => run_lookup(args, &app, &config, output_mode),
        Some(Commands::Export(args)) => run_export(args, &app, &config, output_mode),
        Some(Commands::List) => run_list(&app, output_mode),
        Some(Commands::About) => run_about(output_mode),
        Some(Commands::Guide) => run_guide(&app, output_mode),
        None => match output_mode {
            OutputMode::Interactive => {
                let mut tui = Tui::new(config.export_dir.clone());
                tui.run(&app)
            }
            OutputMode::NonInteractive => Err(miette::Report::msg(
                "command required (try `covar --help`)",
            )),
        },
    }
}

fn run_lookup(
    args: LookupArgs,
    app: &App<Store>,
    config: &ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let key = covar::app::select_key(
        args.lineage.as_deref().unwrap_or_default(),
        args.label.as_deref().unwrap_or_default(),
    )?
    .ok_or(CovarError::EmptyKey)?;
    let sink = StderrProgress { output_mode };
    let outcome = app.lookup(&key, &sink)?;

    let export = match (&outcome, args.export) {
        (LookupOutcome::Found(report), true) => {
            Some(app.export_report(report, &config.export_dir, &sink)?)
        }
        _ => None,
    };

    match output_mode {
        OutputMode::NonInteractive => {
            JsonOutput::print_lookup(&outcome).into_diagnostic()?;
            if let Some(export) = &export {
                JsonOutput::print_export(export).into_diagnostic()?;
            }
        }
        OutputMode::Interactive => {
            if let Some(report) = outcome.report() {
                print_report(report);
            }
            if let Some(export) = &export {
                print_export(export);
            }
        }
    }

    match outcome {
        LookupOutcome::Found(_) => Ok(()),
        LookupOutcome::NotFound { message, .. } => Err(CovarError::NotFound(message).into()),
    }
}

fn run_export(
    args: ExportArgs,
    app: &App<Store>,
    config: &ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let key = SearchKey::new(args.by, &args.key)?;
    let sink = StderrProgress { output_mode };
    let result = app.export(&key, &config.export_dir, &sink)?;
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_export(&result).into_diagnostic()?,
        OutputMode::Interactive => print_export(&result),
    }
    Ok(())
}

fn run_list(app: &App<Store>, output_mode: OutputMode) -> miette::Result<()> {
    let sink = StderrProgress { output_mode };
    let result = app.list(&sink)?;
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_list(&result).into_diagnostic()?,
        OutputMode::Interactive => {
            println!("Stored variants: {}", result.variants.len());
            for entry in &result.variants {
                println!(
                    "  {:<12} {:<10} {}",
                    entry.lineage_code, entry.who_label, entry.monitoring_status
                );
            }
        }
    }
    Ok(())
}

fn run_about(output_mode: OutputMode) -> miette::Result<()> {
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_about(pages::ABOUT).into_diagnostic()?,
        OutputMode::Interactive => {
            for notice in pages::ABOUT {
                print_notice(notice);
            }
        }
    }
    Ok(())
}

fn run_guide(app: &App<Store>, output_mode: OutputMode) -> miette::Result<()> {
    let page = pages::help(app.assets());
    match output_mode {
        OutputMode::NonInteractive => JsonOutput::print_help(&page).into_diagnostic()?,
        OutputMode::Interactive => {
            print_notice(&page.guide);
            for asset in &page.media {
                let state = if asset.exists { "available" } else { "missing" };
                println!("  {}: {} ({state})", asset.name, asset.path);
            }
            println!("  video source: {}", page.media_source);
        }
    }
    Ok(())
}

struct StderrProgress {
    output_mode: OutputMode,
}

impl ProgressSink for StderrProgress {
    fn event(&self, event: ProgressEvent) {
        if matches!(self.output_mode, OutputMode::Interactive) && event.message.starts_with("phase=")
        {
            eprintln!("\x1b[90m{}\x1b[0m", event.message);
        }
    }
}

fn print_notice(notice: &pages::Notice) {
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";
    println!("{cyan}{}{reset}", notice.title);
    for line in notice.lines {
        println!("  {line}");
    }
}

fn print_report(report: &VariantReport) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}{}{reset}", report.title);
    println!("{yellow}General Info{reset}");
    for (header, value) in covar::views::SUMMARY_HEADERS
        .iter()
        .zip(report.summary.cells())
    {
        println!("  {header:<22} {value}");
    }

    println!(
        "{yellow}Molecular Info{reset} ({} mutations)",
        report.mutations.rows.len()
    );
    for row in &report.mutations.rows {
        println!("  {:<22} {}", row.nucleotide, row.amino_acid);
    }
    if report.mutations.unpaired > 0 {
        println!("  ({} unpaired entries dropped)", report.mutations.unpaired);
    }

    println!("{yellow}{}{reset}", report.structure_caption);
    println!("  PDB {}", report.structure.viewer.structure_id);
    println!("  {}", report.structure.viewer.to_html());
    println!("{yellow}{}{reset}", report.chart_caption);
    let chart_state = if report.structure.chart.svg.is_some() {
        "loaded"
    } else {
        "missing"
    };
    println!("  {} ({chart_state})", report.structure.chart.path);

    println!("{yellow}{}{reset}", report.geography_caption);
    for row in &report.geography.rows {
        let value = row
            .percentage
            .map(|value| format!("{value:.2}"))
            .unwrap_or_else(|| "n/a".to_string());
        println!("  {:<22} {green}{value}{reset}", row.country);
    }
}

fn print_export(result: &ExportResult) {
    let green = "\x1b[32m";
    let reset = "\x1b[0m";
    println!(
        "{green}Saved {} mutation rows of {} to {}{reset}",
        result.rows, result.key, result.path
    );
}

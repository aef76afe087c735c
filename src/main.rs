use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use sheetwise::MetricCatalog;
use sheetwise::QueryProcessor;
use sheetwise::SheetStructure;
use sheetwise::Workbook;
use std::io::BufRead;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sheetwise", version, about = "Ask questions about semi-structured financial spreadsheets")]
struct Cli {
    /// TOML metric catalog replacing the built-in aliases, definitions and weights
    #[arg(long, global = true, env = "SHEETWISE_CATALOG")]
    catalog: Option<PathBuf>,

    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a free-text query
    Query {
        file: PathBuf,
        #[arg(required = true)]
        text: Vec<String>,
        /// Print the full response, chart data included, as JSON
        #[arg(long)]
        json: bool,
    },
    /// Answer a JSON query, given inline or as @path
    Structured {
        file: PathBuf,
        query: String,
        #[arg(long)]
        json: bool,
    },
    /// List the inferred column headers
    Headers {
        file: PathBuf,
        /// Sheet name glob
        #[arg(long, default_value = "*")]
        sheet: String,
    },
    /// Show the inferred layout of each sheet
    Structure {
        file: PathBuf,
        #[arg(long, default_value = "*")]
        sheet: String,
    },
    /// Read queries from stdin until `exit`
    Repl { file: PathBuf },
    /// List suggested queries and metric ranges
    Suggest,
}

/// Layout summary printed by the `structure` command.
#[derive(Serialize)]
struct StructureSummary<'a> {
    sheet: &'a str,
    header_rows: &'a [usize],
    repeating_header_rows: &'a [usize],
    glossary_start: Option<usize>,
    sectors: Vec<(usize, &'a str)>,
    data_rows: usize,
    primary_key_column: usize,
}

impl<'a> From<&'a SheetStructure> for StructureSummary<'a> {
    fn from(structure: &'a SheetStructure) -> Self {
        StructureSummary {
            sheet: &structure.sheet_name,
            header_rows: &structure.header_rows,
            repeating_header_rows: &structure.repeating_header_rows,
            glossary_start: structure.glossary_start,
            sectors: structure.sectors.iter().map(|sector| (sector.row, sector.label.as_str())).collect(),
            data_rows: structure.data_rows.len(),
            primary_key_column: structure.primary_key_column,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let catalog = Arc::new(load_catalog(cli.catalog.as_deref())?);

    match cli.command {
        Commands::Query { file, text, json } => {
            let processor = QueryProcessor::new(open_workbook(&file)?, catalog);
            let response = processor.process_query(&text.join(" "));
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", response.text);
            }
        }
        Commands::Structured { file, query, json } => {
            let query = match query.strip_prefix('@') {
                Some(path) => std::fs::read_to_string(path).with_context(|| format!("failed to read query file {path}"))?,
                None => query,
            };
            let processor = QueryProcessor::new(open_workbook(&file)?, catalog);
            let response = processor.process_structured_json(&query);
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                println!("{}", response.text);
            }
        }
        Commands::Headers { file, sheet } => {
            let workbook = open_workbook(&file)?;
            for matched in workbook.matching_sheets(&sheet)? {
                println!("{}:", matched.name());
                if let Some(structure) = workbook.structure(matched.name()) {
                    for line in structure.describe_headers() {
                        println!("  {line}");
                    }
                }
            }
        }
        Commands::Structure { file, sheet } => {
            let workbook = open_workbook(&file)?;
            let summaries: Vec<StructureSummary> = workbook
                .matching_sheets(&sheet)?
                .into_iter()
                .filter_map(|matched| workbook.structure(matched.name()))
                .map(StructureSummary::from)
                .collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        Commands::Repl { file } => {
            let mut processor = QueryProcessor::new(open_workbook(&file)?, catalog);
            repl(&mut processor)?;
        }
        Commands::Suggest => {
            for query in &catalog.suggested_queries {
                println!("{query}");
            }
            if !catalog.ranges.is_empty() {
                println!();
                for (metric, range) in &catalog.ranges {
                    println!("{metric}: {} to {} (step {})", range.min, range.max, range.step);
                }
            }
        }
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_catalog(path: Option<&Path>) -> Result<MetricCatalog> {
    match path {
        Some(path) => MetricCatalog::load(path).context("failed to load metric catalog"),
        None => Ok(MetricCatalog::default()),
    }
}

fn open_workbook(path: &Path) -> Result<Workbook> {
    Workbook::open(path).with_context(|| format!("failed to open workbook {}", path.display()))
}

/// `reload` re-reads the workbook, `headers <sheet>` lists a sheet's columns.
fn repl(processor: &mut QueryProcessor) -> Result<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        let query = line.trim();
        match query {
            "exit" | "quit" => break,
            "" => {}
            "reload" => {
                processor.reload().context("failed to reload workbook")?;
                writeln!(stdout, "Reloaded {}.", processor.workbook().name())?;
            }
            _ => match query.strip_prefix("headers ") {
                Some(sheet) => match processor.describe_headers(sheet.trim()) {
                    Some(lines) => writeln!(stdout, "{}", lines.join("\n"))?,
                    None => writeln!(stdout, "Sheet '{}' not found.", sheet.trim())?,
                },
                None => writeln!(stdout, "{}", processor.process_query(query).text)?,
            },
        }
        write!(stdout, "> ")?;
        stdout.flush()?;
    }
    Ok(())
}

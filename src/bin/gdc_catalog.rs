use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use gdc_catalog::catalog::Catalog;
use gdc_catalog::config::ConfigLoader;
use gdc_catalog::domain::{CatalogMode, DataModel};
use gdc_catalog::error::CatalogError;
use gdc_catalog::gdc::{
    DEFAULT_ENDPOINT, FilesQuery, GdcClient, GdcHttpClient, fetch_aliquots, flatten_samples,
    read_token,
};
use gdc_catalog::table;
use gdc_catalog::variety::FastqNaming;

#[derive(Parser)]
#[command(name = "gdc-catalog")]
#[command(about = "Build a catalog of GDC sequencing data files")]
#[command(version, author)]
struct Cli {
    /// Print debugging information to stderr
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Join reads and aliquots into a catalog")]
    Catalog(CatalogArgs),
    #[command(about = "Write the aliquot table of a case from a GDC sample response")]
    Aliquots(AliquotsArgs),
    #[command(about = "Query the GDC files endpoint for aligned reads of cases")]
    Files(FilesArgs),
}

#[derive(Args)]
struct CatalogArgs {
    /// Harmonized or submitted reads file
    reads: Utf8PathBuf,

    /// Aliquots file
    #[arg(short = 'Q', long)]
    aliquots: Utf8PathBuf,

    /// Disease code
    #[arg(short = 'D', long)]
    disease: Option<String>,

    /// Project name
    #[arg(short = 'P', long)]
    project: Option<String>,

    /// Reads file carries methylation columns
    #[arg(long)]
    methylation: bool,

    /// Use literal read and lane substrings for FASTQ varieties
    #[arg(long)]
    legacy_fastq: bool,

    /// Extract FASTQ-style tokens from unaligned BAM filenames
    #[arg(long)]
    unaligned_bam_tokens: bool,

    /// JSON config with vocabulary additions and defaults
    #[arg(short, long)]
    config: Option<String>,

    /// Output file name; stdout when absent
    #[arg(short, long)]
    output: Option<Utf8PathBuf>,

    /// Do not print header
    #[arg(short, long)]
    no_header: bool,
}

#[derive(Args)]
struct AliquotsArgs {
    /// Case name prepended to every row
    #[arg(short, long)]
    case: String,

    /// GDC data model associating case and aliquots
    #[arg(short = 'm', long, value_enum, default_value_t = DataModel::Cptac)]
    data_model: DataModel,

    /// Saved GraphQL response; queries GDC when absent
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Query endpoint url
    #[arg(short = 'e', long, default_value = DEFAULT_ENDPOINT)]
    url: String,

    /// File holding the GDC authentication token
    #[arg(short, long)]
    token: Option<PathBuf>,

    /// Output file name; stdout when absent
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct FilesArgs {
    /// One or more cases
    cases: Vec<String>,

    /// Read cases from file, one per line
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Query endpoint url
    #[arg(short = 'e', long, default_value = DEFAULT_ENDPOINT)]
    url: String,

    /// File holding the GDC authentication token
    #[arg(short, long)]
    token: Option<PathBuf>,

    /// Size limit of the POST query
    #[arg(short, long, default_value_t = 2000)]
    size: u32,

    /// Format of the POST response
    #[arg(short = 'f', long, default_value = "TSV")]
    response_format: String,

    /// Output file name; stdout when absent
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<CatalogError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &CatalogError) -> u8 {
    match error {
        CatalogError::UnknownSampleType(_) => 2,
        CatalogError::GdcHttp(_) | CatalogError::GdcStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.debug { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Catalog(args) => run_catalog(args),
        Commands::Aliquots(args) => run_aliquots(args),
        Commands::Files(args) => run_files(args),
    }
}

fn run_catalog(args: CatalogArgs) -> miette::Result<()> {
    let config = ConfigLoader::resolve(args.config.as_deref())?;

    let mode = if args.methylation {
        CatalogMode::Methylation
    } else {
        config.mode
    };
    let fastq_naming = if args.legacy_fastq {
        FastqNaming::Legacy
    } else {
        config.fastq_naming
    };

    let catalog = Catalog::builder(mode)
        .disease(args.disease.unwrap_or(config.disease))
        .project(args.project.unwrap_or(config.project))
        .vocabulary(config.vocabulary)
        .annotation_rules(config.annotation_rules)
        .fastq_naming(fastq_naming)
        .unaligned_bam_tokens(args.unaligned_bam_tokens || config.unaligned_bam_tokens)
        .build();

    let reads = table::read_reads(&args.reads, mode)?;
    let aliquots = table::read_aliquots(&args.aliquots)?;
    let records = catalog.generate(&reads, &aliquots)?;

    match args.output {
        Some(path) => table::write_catalog_atomic(&path, &records, !args.no_header)?,
        None => table::write_catalog_stdout(&records, !args.no_header)?,
    }
    Ok(())
}

fn run_aliquots(args: AliquotsArgs) -> miette::Result<()> {
    let aliquots = match &args.input {
        Some(path) => {
            let response = fs::read_to_string(path).into_diagnostic()?;
            flatten_samples(&response, &args.case, args.data_model)?
        }
        None => {
            let client = http_client(&args.url, args.token.as_ref())?;
            fetch_aliquots(&client, &args.case, args.data_model)?
        }
    };

    let mut out = open_output(args.output.as_ref())?;
    table::write_aliquots(&mut out, &aliquots)?;
    Ok(())
}

fn run_files(args: FilesArgs) -> miette::Result<()> {
    let mut cases = args.cases;
    if let Some(path) = &args.input {
        let mut content = String::new();
        fs::File::open(path)
            .and_then(|mut file| file.read_to_string(&mut content))
            .into_diagnostic()?;
        cases.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }
    if cases.is_empty() {
        return Err(miette::Report::msg(
            "at least one case is required (positional or --input)",
        ));
    }
    tracing::debug!("querying files for {} case(s)", cases.len());

    let query = FilesQuery {
        size: args.size,
        format: args.response_format,
        ..FilesQuery::new(cases)
    };
    let client = http_client(&args.url, args.token.as_ref())?;
    let body = client.query_files(&query)?;

    let mut out = open_output(args.output.as_ref())?;
    out.write_all(body.as_bytes()).into_diagnostic()?;
    if let Some(path) = &args.output {
        tracing::info!("written to {}", path.display());
    }
    Ok(())
}

fn http_client(url: &str, token: Option<&PathBuf>) -> miette::Result<GdcHttpClient> {
    let token = token.map(|path| read_token(path)).transpose()?;
    Ok(GdcHttpClient::new(url, token.as_deref())?)
}

fn open_output(path: Option<&PathBuf>) -> miette::Result<Box<dyn Write>> {
    match path {
        Some(path) => Ok(Box::new(fs::File::create(path).into_diagnostic()?)),
        None => Ok(Box::new(io::stdout())),
    }
}

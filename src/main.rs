use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;

use enrollment_funding::models::{Bucket, EnrollmentRecord};
use enrollment_funding::settings::Settings;
use enrollment_funding::{db, export, logging, report, source};

#[derive(Parser)]
#[command(name = "enrollment-funding")]
#[command(about = "Enrollment funding status and revenue reports for Group Scholar", long_about = None)]
struct Cli {
    /// Funding settings file (TOML); built-in rates are used when omitted
    #[arg(long, global = true, env = "FUNDING_CONFIG")]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("source")
        .args(["csv", "json", "term"])
        .required(true)
        .multiple(false)
))]
struct SourceArgs {
    /// Read enrollment records from a CSV file
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Read enrollment records from a JSON array
    #[arg(long)]
    json: Option<PathBuf>,
    /// Read a term's enrollment records from Postgres (DATABASE_URL)
    #[arg(long)]
    term: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum BucketArg {
    Completed,
    Active,
    NotFunded,
}

impl From<BucketArg> for Bucket {
    fn from(value: BucketArg) -> Self {
        match value {
            BucketArg::Completed => Bucket::Completed,
            BucketArg::Active => Bucket::Active,
            BucketArg::NotFunded => Bucket::NotFunded,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write the funding summary as JSON
    Summary {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export one bucket's records as CSV
    Export {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        student_type: String,
        #[arg(long, value_enum)]
        bucket: BucketArg,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

async fn load_records(args: &SourceArgs) -> anyhow::Result<Vec<EnrollmentRecord>> {
    if let Some(path) = &args.csv {
        return source::load_csv(path)
            .with_context(|| format!("failed to load {}", path.display()));
    }
    if let Some(path) = &args.json {
        return source::load_json(path)
            .with_context(|| format!("failed to load {}", path.display()));
    }

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to read enrollments from Postgres")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    db::fetch_enrollments(&pool, args.term.as_deref()).await
}

fn write_output(out: Option<&Path>, contents: &str) -> anyhow::Result<()> {
    match out {
        Some(path) => std::fs::write(path, contents)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{contents}");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let settings = Settings::load(cli.config.as_deref()).context("failed to load funding settings")?;

    match cli.command {
        Commands::Summary { source, out } => {
            let records = load_records(&source).await?;
            let term_report = report::build_term_report(&records, &settings);
            let json = serde_json::to_string_pretty(&term_report)?;
            write_output(out.as_deref(), &json)?;
        }
        Commands::Report { source, out } => {
            let records = load_records(&source).await?;
            let term_report = report::build_term_report(&records, &settings);
            let generated_on = chrono::Local::now().date_naive();
            let markdown = report::build_report(source.term.as_deref(), generated_on, &term_report);
            std::fs::write(&out, markdown)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export {
            source,
            student_type,
            bucket,
            out,
        } => {
            let records = load_records(&source).await?;
            let term_report = report::build_term_report(&records, &settings);
            let summary = term_report
                .student_type(&student_type)
                .with_context(|| format!("no records found for student type `{student_type}`"))?;
            let rows = &summary.bucket(bucket.into()).records;

            let written = match out {
                Some(path) => {
                    let file = std::fs::File::create(&path)
                        .with_context(|| format!("failed to create {}", path.display()))?;
                    let written = export::write_csv(file, rows)?;
                    eprintln!("Exported {written} rows to {}.", path.display());
                    written
                }
                None => export::write_csv(std::io::stdout().lock(), rows)?,
            };
            tracing::info!(written, student_type = %student_type, "exported bucket records");
        }
    }

    Ok(())
}

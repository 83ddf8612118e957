use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod catalog;
mod dataset;
mod describe;
mod error;
mod frequency;
mod hypothesis;
mod models;
mod report;
mod views;

use catalog::{Catalog, VariableKind};

#[derive(Parser)]
#[command(name = "cohort-eda")]
#[command(about = "Exploratory analysis of offender vs control cohorts", long_about = None)]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// CSV export of the dataset
    #[arg(long, env = "COHORT_EDA_DATA", default_value = "datos.csv", global = true)]
    data: PathBuf,
    /// JSON variable catalog replacing the built-in one
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,
    #[arg(long, default_value_t = ',', global = true)]
    delimiter: char,
    /// Decimal separator of numeric cells, e.g. ',' for Spanish-locale exports
    #[arg(long, default_value_t = '.', global = true)]
    decimal: char,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List declared variables by kind
    Variables,
    /// Show the raw dataset and its shape
    Overview {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Descriptive statistics and Mann-Whitney tests for quantitative variables
    Quantitative {
        #[arg(long)]
        variable: Option<String>,
    },
    /// Frequency table and chi-squared tests for categorical variables
    Categorical {
        #[arg(long)]
        variable: Option<String>,
        /// Disable the continuity correction on 2x2 tables
        #[arg(long)]
        no_yates: bool,
    },
    /// Write a full markdown report
    Report {
        #[arg(long)]
        quantitative: Option<String>,
        #[arg(long)]
        categorical: Option<String>,
        #[arg(long)]
        no_yates: bool,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cohort_eda=info")),
        )
        .init();

    let cli = Cli::parse();
    let catalog = match &cli.source.catalog {
        Some(path) => Catalog::from_json_file(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?,
        None => Catalog::default(),
    };

    if let Commands::Variables = cli.command {
        return emit(cli.format, &catalog, || {
            let mut output = String::new();
            for kind in [VariableKind::Quantitative, VariableKind::Categorical] {
                output.push_str(&format!("{}:\n", kind.label()));
                for name in catalog.names(kind) {
                    output.push_str(&format!("- {name}\n"));
                }
            }
            output
        });
    }

    let dataset = load_dataset(&cli.source, &catalog)?;

    match cli.command {
        Commands::Variables => {}
        Commands::Overview { limit } => {
            let overview = views::overview(&dataset, limit);
            emit(cli.format, &overview, || report::render_overview(&overview))?;
        }
        Commands::Quantitative { variable } => {
            let selected = catalog.select(variable.as_deref(), VariableKind::Quantitative)?;
            let view = views::quantitative_report(&dataset, &catalog, selected)?;
            emit(cli.format, &view, || report::render_quantitative(&view))?;
        }
        Commands::Categorical { variable, no_yates } => {
            let selected = catalog.select(variable.as_deref(), VariableKind::Categorical)?;
            let view = views::categorical_report(&dataset, &catalog, selected, !no_yates)?;
            emit(cli.format, &view, || report::render_categorical(&view))?;
        }
        Commands::Report {
            quantitative,
            categorical,
            no_yates,
            out,
        } => {
            let quantitative_var =
                catalog.select(quantitative.as_deref(), VariableKind::Quantitative)?;
            let categorical_var =
                catalog.select(categorical.as_deref(), VariableKind::Categorical)?;

            let overview = views::overview(&dataset, None);
            let quantitative = views::quantitative_report(&dataset, &catalog, quantitative_var)?;
            let categorical =
                views::categorical_report(&dataset, &catalog, categorical_var, !no_yates)?;

            let document = report::build_report(
                &cli.source.data.display().to_string(),
                chrono::Local::now().date_naive(),
                &overview,
                &quantitative,
                &categorical,
            );
            std::fs::write(&out, document)
                .with_context(|| format!("failed to write {}", out.display()))?;
            info!(path = %out.display(), "report written");
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

fn load_dataset(source: &SourceArgs, catalog: &Catalog) -> anyhow::Result<dataset::Dataset> {
    let delimiter = u8::try_from(source.delimiter)
        .context("delimiter must be a single-byte character")?;
    let format = dataset::CsvFormat {
        delimiter,
        decimal: source.decimal,
    };
    dataset::load(&source.data, catalog, format)
        .with_context(|| format!("failed to load dataset {}", source.data.display()))
}

fn emit<T, F>(format: OutputFormat, value: &T, render: F) -> anyhow::Result<()>
where
    T: Serialize,
    F: FnOnce() -> String,
{
    match format {
        OutputFormat::Text => print!("{}", render()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

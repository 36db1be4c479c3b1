use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use transfer_planner::core::normalizer::{normalize_institution, normalize_major};
use transfer_planner::core::parser::AgreementParser;
use transfer_planner::core::report::format_requirements;
use transfer_planner::utils::logger;
use transfer_planner::{ElementTree, PlannerConfig};

#[derive(Debug, Parser)]
#[command(name = "agreement_report")]
#[command(about = "Print the requirements parsed from an articulation agreement snapshot")]
struct Args {
    #[arg(long)]
    document: PathBuf,

    #[arg(long = "from")]
    source_institution: String,

    #[arg(long = "to")]
    target_institution: String,

    #[arg(long)]
    major: String,

    #[arg(long, default_value = "2024-2025")]
    academic_year: String,

    #[arg(long, help = "TOML configuration file (for planner.default_units)")]
    config: Option<PathBuf>,

    #[arg(long, help = "Print the parsed model as JSON")]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let config = match &args.config {
        Some(path) => PlannerConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PlannerConfig::default(),
    };

    let content = std::fs::read_to_string(&args.document)
        .with_context(|| format!("reading {}", args.document.display()))?;
    let tree = ElementTree::from_json_str(&content).context("parsing agreement snapshot")?;

    let model = AgreementParser::new(config.planner.default_units).parse(
        &tree,
        &args.academic_year,
        &normalize_institution(&args.source_institution),
        &normalize_institution(&args.target_institution),
        &normalize_major(&args.major),
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&model)?);
    } else {
        print!("{}", format_requirements(&model));
    }

    if model.is_incomplete() {
        anyhow::bail!(
            "no requirement sections recognized for {}; check that the snapshot is scoped to one major",
            model.major
        );
    }
    Ok(())
}

use crate::config::toml_config::PlannerConfig;
use crate::core::planner::PlanRequest;
use crate::domain::model::CompletedCourse;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use chrono::{Datelike, NaiveDate};
use clap::Parser;
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "transfer-planner")]
#[command(about = "Plan one term of transfer coursework from an articulation agreement")]
pub struct CliConfig {
    /// Agreement snapshot (JSON element tree)
    #[arg(long)]
    pub document: PathBuf,

    #[arg(long = "from", help = "Institution the student attends now")]
    pub source_institution: String,

    #[arg(long = "to", help = "Institution the student transfers to")]
    pub target_institution: String,

    #[arg(long)]
    pub major: String,

    #[arg(long, default_value = "2024-2025")]
    pub academic_year: String,

    /// Completed courses CSV (code,term,year,grade)
    #[arg(long)]
    pub completed: Option<PathBuf>,

    #[arg(long, help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Override planner.target_units")]
    pub target_units: Option<Decimal>,

    #[arg(long, help = "Override planner.term_label, e.g. \"Fall 2025\"")]
    pub term: Option<String>,

    #[arg(long, help = "Never call the schedule generator")]
    pub no_generator: bool,

    #[arg(long, help = "Print the schedule as JSON")]
    pub json: bool,

    #[arg(long, help = "Also write the JSON schedule to this file")]
    pub output: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,
}

impl CliConfig {
    /// Loads the config file (or defaults) and applies command-line overrides.
    pub fn load_planner_config(&self) -> Result<PlannerConfig> {
        let mut config = match &self.config {
            Some(path) => PlannerConfig::from_file(path)?,
            None => PlannerConfig::default(),
        };
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut PlannerConfig) {
        if let Some(units) = self.target_units {
            config.planner.target_units = units;
        }
        if let Some(term) = &self.term {
            config.planner.term_label = Some(term.clone());
        }
        if self.no_generator {
            config.disable_generator();
        }
    }

    pub fn plan_request(
        &self,
        config: &PlannerConfig,
        completed: Vec<CompletedCourse>,
        today: NaiveDate,
    ) -> PlanRequest {
        PlanRequest {
            academic_year: self.academic_year.clone(),
            source_institution: self.source_institution.clone(),
            target_institution: self.target_institution.clone(),
            major: self.major.clone(),
            completed,
            target_units: config.planner.target_units,
            term_label: config
                .planner
                .term_label
                .clone()
                .unwrap_or_else(|| default_term_label(today)),
        }
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("from", &self.source_institution)?;
        validation::validate_non_empty_string("to", &self.target_institution)?;
        validation::validate_non_empty_string("major", &self.major)?;
        validation::validate_academic_year("academic_year", &self.academic_year)?;
        validation::validate_input_file("document", &self.document, &["json"])?;
        if let Some(completed) = &self.completed {
            validation::validate_input_file("completed", completed, &["csv"])?;
        }
        if let Some(output) = &self.output {
            validation::validate_schedule_output("output", output)?;
        }
        if let Some(units) = self.target_units {
            validation::validate_range("target_units", units, Decimal::ONE, Decimal::from(40))?;
        }
        Ok(())
    }
}

/// `"<Season> <year>"` for the term containing `date`.
pub fn default_term_label(date: NaiveDate) -> String {
    let season = match date.month() {
        1..=3 => "Winter",
        4..=6 => "Spring",
        7..=8 => "Summer",
        _ => "Fall",
    };
    format!("{} {}", season, date.year())
}

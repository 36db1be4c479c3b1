use clap::Parser;
use transfer_planner::adapters::completed::read_completed_bytes;
use transfer_planner::adapters::schedule_document::ScheduleDocument;
use transfer_planner::core::Storage;
use transfer_planner::domain::model::TermPlan;
use transfer_planner::utils::error::{ErrorSeverity, PlannerError};
use transfer_planner::utils::{logger, validation::Validate};
use transfer_planner::{CliConfig, ElementTree, LocalStorage, PlanSource};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting transfer-planner");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(&cli).await {
        tracing::error!(
            "❌ Planning failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(cli: &CliConfig) -> Result<(), PlannerError> {
    // 驗證配置
    cli.validate()?;
    let config = cli.load_planner_config()?;
    let engine = config.build_engine()?;

    let storage = LocalStorage::new(".");
    let document = storage.read_file(&cli.document.display().to_string()).await?;
    let tree = ElementTree::from_json_slice(&document)?;
    tracing::debug!("Loaded agreement snapshot with {} nodes", tree.len());

    let completed = match &cli.completed {
        Some(path) => read_completed_bytes(&storage.read_file(&path.display().to_string()).await?)?,
        None => Vec::new(),
    };

    let request = cli.plan_request(&config, completed, chrono::Local::now().date_naive());
    let outcome = engine.plan(&request, &tree).await?;

    if let Some(failure) = &outcome.generator_failure {
        eprintln!("⚠️ {}", failure.user_friendly_message());
    }
    if let PlanSource::Generated { generator } = &outcome.source {
        tracing::info!("Plan produced by {}", generator);
    }

    let document = ScheduleDocument::from(&outcome.plan);
    if let Some(output) = &cli.output {
        storage
            .write_file(
                &output.display().to_string(),
                document.to_json_pretty()?.as_bytes(),
            )
            .await?;
        tracing::info!("📁 Schedule saved to: {}", output.display());
    }

    if cli.json {
        println!("{}", document.to_json_pretty()?);
    } else {
        print_plan(&outcome.plan);
    }

    Ok(())
}

fn print_plan(plan: &TermPlan) {
    println!("📅 {}", plan.term_label);
    println!("{}", "-".repeat(50));
    for selected in &plan.courses {
        println!(
            "   • {} - {} ({} units) [{}]",
            selected.course.code,
            selected.course.title,
            selected.course.units.normalize(),
            selected.category
        );
        println!("     {}", selected.reason);
    }
    println!("Total: {} units", plan.total_units.normalize());
    if plan.diversity_relaxed {
        println!("(includes more than one course from the same subject)");
    }

    if !plan.warnings.is_empty() {
        println!("\n⚠️ Warnings:");
        for warning in &plan.warnings {
            println!("   - {}", warning);
        }
    }
    if !plan.recommendations.is_empty() {
        println!("\n💡 Recommendations:");
        for line in &plan.recommendations {
            println!("   - {}", line);
        }
    }
    println!("\n{}", plan.notes);
}

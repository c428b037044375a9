use anyhow::{Context, Result};
use prompt_pipeline::cli::commands::{HistoryCommand, RunCommand, ValidateCommand};
use prompt_pipeline::cli::output::*;
use prompt_pipeline::cli::{Cli, Command};
use prompt_pipeline::core::config::PipelineConfig;
use prompt_pipeline::execution::{ExecutionEngine, ExecutionEvent};
use prompt_pipeline::persistence::{create_record, PersistenceBackend, RunRecord};
use tracing::{error, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd).await?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
        Command::History(cmd) => show_history(cmd).await?,
    }

    Ok(())
}

#[cfg(feature = "sqlite")]
async fn open_store() -> Result<Box<dyn PersistenceBackend>> {
    let store = prompt_pipeline::persistence::SqliteRunStore::with_default_path().await?;
    Ok(Box::new(store))
}

#[cfg(not(feature = "sqlite"))]
async fn open_store() -> Result<Box<dyn PersistenceBackend>> {
    warn!("Built without the sqlite feature; history is not kept between runs");
    Ok(Box::new(prompt_pipeline::persistence::InMemoryPersistence::new()))
}

async fn run_pipeline(cmd: &RunCommand) -> Result<()> {
    let mut config =
        PipelineConfig::from_file(&cmd.file).context("Failed to load pipeline config")?;

    eprintln!("{} Loaded pipeline: {}", INFO, style(&config.name).bold());

    for (key, value) in &cmd.var {
        config
            .variables
            .insert(key.clone(), serde_yaml::Value::String(value.clone()));
        eprintln!(
            "{} Variable override: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
    }

    let mut pipeline = config
        .to_pipeline(|name| std::env::var(name).ok())
        .context("Failed to build pipeline")?;

    let progress = create_progress_bar(pipeline.steps().len());
    let bar = progress.clone();
    let engine = ExecutionEngine::new().with_event_handler(move |event| {
        if let Some(line) = format_execution_event(&event) {
            bar.println(line);
        }
        match &event {
            ExecutionEvent::StepStarted { step_name, .. } => bar.set_message(step_name.clone()),
            ExecutionEvent::StepCompleted { .. } => bar.inc(1),
            _ => {}
        }
    });

    let result = engine.run(&mut pipeline, cmd.input.as_deref()).await;
    progress.finish_and_clear();

    if !cmd.no_history {
        let record = create_record(&pipeline, result.as_ref().err());
        match open_store().await {
            Ok(store) => {
                store.save_run(&record).await?;
                eprintln!(
                    "{} Run saved to history (ID: {})",
                    INFO,
                    style(record.run_id).dim()
                );
            }
            Err(e) => warn!("Run not saved to history: {:#}", e),
        }
    }

    if cmd.dump {
        eprintln!("{} Memory:", INFO);
        println!("{}", pipeline.memory().to_json_pretty()?);
    }

    match result {
        Ok(output) => {
            eprintln!(
                "{} {} completed {}",
                CHECK,
                style(&pipeline.name).bold(),
                style("successfully").green()
            );
            println!("{}", format_decoded(&output));
            Ok(())
        }
        Err(e) => {
            eprintln!(
                "{} {} {}",
                CROSS,
                style(&pipeline.name).bold(),
                style("failed").red()
            );
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating pipeline...", INFO);

    match PipelineConfig::from_file(&cmd.file) {
        Ok(config) => {
            println!("{} Pipeline configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Steps: {}", style(config.steps.len()).cyan());
            println!("  Variables: {}", style(config.variables.len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}

async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let store = open_store().await?;

    if let Some(run_id) = &cmd.run_id {
        let run_id = uuid::Uuid::parse_str(run_id).context("Invalid run ID format")?;

        match store.load_run(run_id).await? {
            Some(record) if cmd.json => println!("{}", serde_json::to_string_pretty(&record)?),
            Some(record) => print_run_details(&record)?,
            None => println!("{} Run not found", WARN),
        }
        return Ok(());
    }

    let mut runs = match &cmd.pipeline {
        Some(pipeline_name) => store.list_runs(pipeline_name).await?,
        None => {
            let mut all_runs = Vec::new();
            for pipeline in store.list_pipelines().await? {
                all_runs.extend(store.list_runs(&pipeline).await?);
            }
            all_runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
            all_runs
        }
    };
    runs.truncate(cmd.limit);

    if cmd.json {
        let data = serde_json::json!({ "runs": runs });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!("{} No runs found", INFO);
        return Ok(());
    }

    println!("{} Run history (showing latest {}):", INFO, runs.len());
    for record in &runs {
        println!("  {}", format_run_record(record));
    }

    Ok(())
}

fn print_run_details(record: &RunRecord) -> Result<()> {
    println!("{} Run Details", INFO);
    println!("  ID: {}", style(record.run_id).cyan());
    println!("  Pipeline: {}", style(&record.pipeline_name).bold());
    println!("  Status: {}", format_status(record.status));
    println!("  Started: {}", style(record.started_at.to_rfc3339()).dim());
    if let Some(completed) = record.completed_at {
        println!("  Completed: {}", style(completed.to_rfc3339()).dim());
        if let Ok(duration) = completed.signed_duration_since(record.started_at).to_std() {
            println!("  Duration: {}", style(format_duration(duration)).dim());
        }
    }
    println!(
        "  Progress: {} ({}/{})",
        style(format!("{:.0}%", record.progress() * 100.0)).cyan(),
        record.completed_steps,
        record.total_steps
    );
    if let Some(step) = &record.failed_step {
        println!("  Failed step: {}", style(step).red());
    }
    if let Some(error) = &record.error {
        println!("  Error: {}", style(error).red());
    }

    println!("\n  {}", style("Memory:").bold());
    let json = serde_json::to_string_pretty(&record.memory)?;
    for line in json.lines() {
        println!("    {}", line);
    }

    Ok(())
}

//! CLI entrypoint for Agora
//!
//! Wires every layer together with dependency injection and runs one
//! workflow through the coordination core, printing the per-sub-task
//! outcomes and the run's metrics.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use agora_application::ports::durable_store::DurableStore;
use agora_application::{
    AgentRegistry, DecisionPipeline, EventBus, FeedbackProcessor, LearningEngine, ModelRouter,
    Orchestrator, BudgetKeeper,
};
use agora_domain::{
    Capability, Constraints, DecisionContext, DecisionMaker, DecisionOption, OperatingMode,
    SubTaskSpec, WorkflowSpec,
};
use agora_infrastructure::{
    ConfigLoader, InMemoryStore, JsonlEventLog, JsonlStore, SimulatedBackend, SimulatedConnector,
    WorkerAgent,
};

#[derive(Parser, Debug)]
#[command(name = "agora", version, about = "Multi-agent decision coordination core")]
struct Cli {
    /// Goal for the demo workflow
    #[arg(default_value = "refresh stale marketplace listings")]
    goal: String,

    /// Run under constrained resources (cheaper scoring, deferred writes)
    #[arg(long)]
    constrained: bool,

    /// Explicit config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip config files and use built-in defaults
    #[arg(long)]
    no_config: bool,

    /// Print config file locations and exit
    #[arg(long)]
    config_sources: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if cli.config_sources {
        ConfigLoader::print_config_sources();
        return Ok(());
    }

    let file_config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("loading configuration")?
    };
    file_config.validate().context("validating configuration")?;

    let mode = if cli.constrained {
        OperatingMode::Constrained
    } else {
        file_config.mode
    };
    let store_path = file_config.store_path.clone();
    let event_log_path = file_config.event_log_path.clone();
    let config = file_config.into_coordination();
    info!(mode = %mode, "Starting agora");

    // === Dependency injection ===
    let bus = Arc::new(EventBus::new(config.bus.clone()));
    let event_log = event_log_path
        .as_deref()
        .and_then(JsonlEventLog::open)
        .map(Arc::new)
        .map(|log| log.attach(&bus));

    let store: Arc<dyn DurableStore> = match &store_path {
        Some(path) => Arc::new(JsonlStore::open(path).context("opening durable store")?),
        None => Arc::new(InMemoryStore::new()),
    };

    let budget = BudgetKeeper::spawn(config.budget.daily_limit, config.budget.per_request_max);
    let mut router = ModelRouter::new(config.router.clone(), budget.clone(), Arc::clone(&bus));
    for backend in SimulatedBackend::full_set() {
        router = router.with_backend(backend);
    }
    let router = Arc::new(router);

    let registry = Arc::new(AgentRegistry::new(config.registry.clone(), Arc::clone(&bus)));
    let sweeper = registry.start_sweeper();
    let tracker = Arc::new(agora_application::DecisionTracker::new(
        Arc::clone(&store),
        Arc::clone(&bus),
    ));
    let learning = LearningEngine::spawn(config.learning.clone());
    let pipeline = Arc::new(DecisionPipeline::new(
        DecisionMaker::new(config.scoring.clone()),
        config.validation.build_validator(),
        Arc::clone(&tracker),
        learning.clone(),
    ));
    // The feedback processor shares the pipeline's learning handle, so
    // outcome signals shift the weights the next proposal scores with
    let feedback = Arc::new(FeedbackProcessor::new(
        Arc::clone(&store),
        Arc::clone(&bus),
        Arc::clone(&tracker),
        learning,
    ));
    let orchestrator = Orchestrator::new(
        config.orchestrator.clone(),
        Arc::clone(&registry),
        Arc::clone(&pipeline),
        Arc::clone(&feedback),
        Arc::clone(&bus),
    );

    // Demo agent pool: every capability the demo workflow needs
    let connector = Arc::new(SimulatedConnector::new());
    registry
        .register(Arc::new(
            WorkerAgent::new(
                "pricer-1",
                [Capability::Pricing],
                Arc::clone(&router),
                Arc::clone(&connector) as _,
            )
            .with_affinity_tags(["electronics".to_string()]),
        ))
        .await;
    registry
        .register(Arc::new(WorkerAgent::new(
            "lister-1",
            [Capability::Listing],
            Arc::clone(&router),
            Arc::clone(&connector) as _,
        )))
        .await;
    registry
        .register(Arc::new(WorkerAgent::new(
            "analyst-1",
            [Capability::Analytics],
            Arc::clone(&router),
            Arc::clone(&connector) as _,
        )))
        .await;

    let spec = demo_workflow(&cli.goal, mode);
    println!("Running workflow '{}' ({} sub-tasks, {} mode)", cli.goal, spec.sub_tasks.len(), mode);
    let report = orchestrator.run(spec).await;

    println!();
    println!("Workflow {} finished: {}", report.workflow_id, report.status);
    for sub in &report.sub_tasks {
        println!(
            "  {:<28} {:?}  agent={}  {}",
            sub.sub_task_id,
            sub.outcome,
            sub.agent_id.as_deref().unwrap_or("-"),
            sub.detail,
        );
    }

    let metrics = tracker.metrics().await;
    println!();
    println!(
        "Decisions: {} total, avg confidence {:.2}",
        metrics.total, metrics.avg_confidence
    );
    for (status, count) in &metrics.by_status {
        println!("  {:<12} {}", status, count);
    }

    let budget_state = budget.snapshot().await.map_err(|e| anyhow::anyhow!(e))?;
    println!(
        "Budget: spent {:.4} of {:.4} (remaining {:.4})",
        budget_state.spent,
        budget_state.daily_limit,
        budget_state.remaining()
    );

    let pending = tracker.pending_count().await + feedback.pending_count().await;
    if pending > 0 {
        println!("Pending store writes: {} (flushing)", pending);
        tracker.flush_pending().await.ok();
        feedback.flush_pending().await.ok();
    }

    sweeper.stop().await;
    if let Some(handle) = event_log {
        handle.stop().await;
    }
    Ok(())
}

/// Three-capability demo workflow built from the CLI goal.
fn demo_workflow(goal: &str, mode: OperatingMode) -> WorkflowSpec {
    let pricing = SubTaskSpec::new(
        Capability::Pricing,
        DecisionContext::new("pricing", "choose reprice strategy for stale listings")
            .with_tags(["electronics".to_string()]),
        vec![
            DecisionOption::new("reprice_down_5pct", 72.0, 0.05),
            DecisionOption::new("hold_price", 55.0, 0.0),
            DecisionOption::new("reprice_up_3pct", 60.0, 0.05),
        ],
    )
    .with_constraints(Constraints::default().with_max_cost(0.1));

    let listing = SubTaskSpec::new(
        Capability::Listing,
        DecisionContext::new("listing", "refresh listing content for visibility"),
        vec![
            DecisionOption::new("refresh_title", 80.0, 0.02),
            DecisionOption::new("rewrite_description", 75.0, 0.08),
        ],
    );

    let analytics = SubTaskSpec::new(
        Capability::Analytics,
        DecisionContext::new("analytics", "summarize weekly sales movement"),
        vec![DecisionOption::new("weekly_report", 70.0, 0.03)],
    );

    WorkflowSpec::new(goal, vec![pricing, listing, analytics]).with_mode(mode)
}

//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open the configured blob store, run the load/migrate/heal pass and
//!   print a one-screen summary.
//! - Keep output deterministic for quick local sanity checks.

use std::process::ExitCode;
use ticklog_core::{
    core_version, init_logging, EntityStore, ProjectSort, SqliteAdapter, StoreConfig,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let config = StoreConfig::from_env();

    if let Some(log_dir) = &config.log_dir {
        if let Err(err) = init_logging(&config.log_level, log_dir) {
            eprintln!("ticklog: logging disabled: {err}");
        }
    }

    match run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_run module=cli status=error error={err}");
            eprintln!("ticklog: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &StoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    let adapter = match &config.db_path {
        Some(path) => SqliteAdapter::open(path)?,
        None => SqliteAdapter::open_in_memory()?,
    };
    let mut store = EntityStore::new(adapter);
    store.init().await?;

    println!("ticklog_core version={}", core_version());
    println!(
        "store={}",
        config
            .db_path
            .as_ref()
            .map_or_else(|| "memory".to_string(), |path| path.display().to_string())
    );
    println!(
        "projects={} records={} running={}",
        store.get_projects().len(),
        store.get_records(None).len(),
        store.get_timer_state().running_count()
    );

    for project in store.get_sorted_projects(ProjectSort::Manual) {
        let stats = store.get_project_stats_with_children(&project.id);
        println!(
            "  {} records={} hours={:.2} cost={:.2}{}",
            project.name,
            stats.record_count,
            stats.total_duration as f64 / 3_600_000.0,
            stats.total_cost,
            if store.is_timer_running(&project.id) {
                " [running]"
            } else {
                ""
            }
        );
    }
    Ok(())
}

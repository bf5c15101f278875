// src/ingest/scheduler.rs
use anyhow::Result;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::pipeline::{Pipeline, Trigger};

/// tokio-cron-scheduler wants a seconds field; classic 5-field crontab lines get `0` prepended.
pub fn normalize_cron(expr: &str) -> String {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() == 5 {
        format!("0 {}", fields.join(" "))
    } else {
        fields.join(" ")
    }
}

/// Start the out-of-band trigger. Runs are independent of HTTP requests and
/// never fatal: failures are logged and the next tick proceeds.
pub async fn start_scheduler(pipeline: Arc<Pipeline>, cron_expr: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;
    let schedule = normalize_cron(cron_expr);

    let job = Job::new_async(schedule.as_str(), move |_uuid, _lock| {
        let pipeline = pipeline.clone();
        Box::pin(async move {
            match pipeline.run(Trigger::Schedule).await {
                Ok(report) => tracing::info!(
                    target: "pipeline",
                    run_id = report.summary.run_id,
                    formatted = report.summary.formatted,
                    failures = report.summary.failures.len(),
                    "scheduled run finished"
                ),
                Err(e) => tracing::error!(target: "pipeline", error = %e, "scheduled run failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    tracing::info!(target: "pipeline", schedule = %schedule, "cron trigger started");
    Ok(scheduler)
}

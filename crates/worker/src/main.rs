//! MedRoute Background Worker
//!
//! Handles scheduled jobs:
//! - Nightly billing invariant audit (3:30 UTC) - the standing replacement
//!   for ad-hoc data verification scripts
//! - Health check heartbeat (every 5 minutes)

use std::time::Duration;

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use medroute_billing::{InvariantCheckSummary, InvariantChecker, ViolationSeverity};
use medroute_shared::create_pool;

/// Log the outcome of an invariant audit, one line per violation
fn log_audit_summary(summary: &InvariantCheckSummary) {
    if summary.healthy {
        info!(
            checks_run = summary.checks_run,
            "Invariant audit passed - billing data consistent"
        );
        return;
    }

    warn!(
        checks_run = summary.checks_run,
        checks_failed = summary.checks_failed,
        violations = summary.violations.len(),
        "Invariant audit found violations"
    );

    for violation in &summary.violations {
        match violation.severity {
            ViolationSeverity::Critical => error!(
                invariant = %violation.invariant,
                severity = %violation.severity,
                "{}",
                violation.description
            ),
            _ => warn!(
                invariant = %violation.invariant,
                severity = %violation.severity,
                "{}",
                violation.description
            ),
        }
    }
}

async fn run_audit(checker: &InvariantChecker) {
    match checker.run_all_checks().await {
        Ok(summary) => log_audit_summary(&summary),
        Err(e) => error!(error = %e, "Invariant audit failed to run"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    info!("Starting MedRoute Worker");

    // Create database pool
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let pool = create_pool(&database_url).await?;

    let checker = InvariantChecker::new(pool);

    // Run an audit immediately on startup so a fresh deploy surfaces any
    // existing drift without waiting for the nightly run
    run_audit(&checker).await;

    // Create scheduler
    let scheduler = JobScheduler::new().await?;

    // Job 1: Nightly invariant audit at 3:30 UTC
    let audit_checker = checker.clone();
    scheduler
        .add(Job::new_async("0 30 3 * * *", move |_uuid, _l| {
            let checker = audit_checker.clone();
            Box::pin(async move {
                info!("Running nightly billing invariant audit");
                run_audit(&checker).await;
            })
        })?)
        .await?;
    info!("Scheduled: Nightly invariant audit (3:30 UTC)");

    // Job 2: Health check heartbeat (every 5 minutes)
    scheduler
        .add(Job::new_async("0 */5 * * * *", |_uuid, _l| {
            Box::pin(async move {
                info!("Worker heartbeat - all systems operational");
            })
        })?)
        .await?;
    info!("Scheduled: Health check heartbeat (every 5 minutes)");

    // Start the scheduler
    info!("Starting job scheduler");
    scheduler.start().await?;

    info!("MedRoute Worker started successfully with 2 scheduled jobs");

    // Keep the main task running
    // The scheduler runs jobs in background tasks
    loop {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
}

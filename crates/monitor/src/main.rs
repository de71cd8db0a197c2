//! `exphub-monitor` -- terminal view of live training progress.
//!
//! Loads all experiments and jobs from the ExperimentHub API, subscribes
//! to the job-status push channel, and logs each job's progress as
//! updates arrive. Stops on Ctrl-C.
//!
//! # Environment variables
//!
//! | Variable                      | Required | Default                  | Description                         |
//! |-------------------------------|----------|--------------------------|-------------------------------------|
//! | `EXPHUB_API_URL`              | no       | `http://localhost:8000`  | REST API base URL                   |
//! | `EXPHUB_WS_URL`               | no       | `ws://localhost:8000/ws` | Status push channel                 |
//! | `EXPHUB_REQUEST_TIMEOUT_SECS` | no       | `30`                     | Per-request timeout                 |
//! | `EXPHUB_RECONNECT_INITIAL_MS` | no       | `1000`                   | First reconnect delay               |
//! | `EXPHUB_RECONNECT_MAX_SECS`   | no       | `30`                     | Reconnect delay cap                 |
//! | `EXPHUB_EXPERIMENT_ID`        | no       | --                       | Only show jobs of this experiment   |

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exphub_client::api::HttpApi;
use exphub_client::channel::PushChannel;
use exphub_client::config::ClientConfig;
use exphub_client::dashboard::Dashboard;
use exphub_client::sync::StatusFeed;
use exphub_core::progress::JobSummary;
use exphub_core::store::Store;
use exphub_core::types::DbId;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "exphub_monitor=info,exphub_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::from_env()?;
    let experiment_filter: Option<DbId> = std::env::var("EXPHUB_EXPERIMENT_ID")
        .ok()
        .map(|v| v.parse())
        .transpose()
        .context("EXPHUB_EXPERIMENT_ID must be a valid integer")?;

    tracing::info!(
        api_url = %config.api_url,
        ws_url = %config.ws_url,
        experiment_id = ?experiment_filter,
        "Starting exphub-monitor",
    );

    let api = HttpApi::from_config(&config)?;
    let mut dashboard = Dashboard::new(api.clone(), api);
    dashboard
        .refresh()
        .await
        .context("Initial load of experiments and jobs failed")?;

    for experiment in dashboard.store().experiments() {
        if experiment_filter.is_some_and(|id| id != experiment.id) {
            continue;
        }
        tracing::info!(
            experiment_id = experiment.id,
            name = %experiment.name,
            description = experiment.description_or_default(),
            "Experiment",
        );
        for summary in dashboard.store().summaries_for_experiment(experiment.id) {
            log_summary(&summary);
        }
    }

    let channel = PushChannel::from_config(&config);
    let mut feed = StatusFeed::subscribe(&channel);
    channel.connect();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                break;
            }
            next = feed.next_into(dashboard.store_mut()) => match next {
                Some(job_id) => report(dashboard.store(), &job_id, experiment_filter),
                None => {
                    tracing::warn!("Status feed closed");
                    break;
                }
            },
        }
    }

    channel.disconnect().await;
    tracing::info!("exphub-monitor stopped");
    Ok(())
}

fn report(store: &Store, job_id: &str, experiment_filter: Option<DbId>) {
    let Some(job) = store.job(job_id) else {
        tracing::debug!(job_id, "Update for a job not in the loaded list");
        return;
    };
    if experiment_filter.is_some_and(|id| id != job.experiment_id) {
        return;
    }
    if let Some(summary) = store.summary(job_id) {
        log_summary(&summary);
    }
}

fn log_summary(summary: &JobSummary) {
    tracing::info!(
        job_id = %summary.job_id,
        name = %summary.name,
        status = summary.status.label(),
        progress = %summary.progress.label(),
        percent = format_args!("{:.0}%", summary.progress.percent()),
        best_accuracy = %summary.accuracy_label(),
        running_time = %summary.running_time_label(),
        "Job",
    );
}

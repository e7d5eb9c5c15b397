use crate::config::MetricsConfig;
use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Initialize the metrics system based on the provided configuration.
pub fn init_metrics(config: &MetricsConfig, exp_name: &str) -> Result<()> {
    match config {
        MetricsConfig::Prometheus => {
            PrometheusBuilder::new()
                .add_global_label("exp_name", exp_name)
                .install()?;

            metrics::counter!("episodes_started_total").absolute(0);
            metrics::counter!("episodes_finished_total").absolute(0);
            metrics::counter!("env_steps_total").absolute(0);
            metrics::counter!("collisions_total").absolute(0);
            metrics::counter!("scenarios_scored_total").absolute(0);
            metrics::counter!("trajectory_rows_published_total").absolute(0);
        }
        MetricsConfig::None => {
            // No-op: metrics are disabled
        }
    }
    Ok(())
}

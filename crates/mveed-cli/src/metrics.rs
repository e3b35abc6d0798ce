//! Prometheus recorder for one CLI run.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the recorder; the handle renders everything counted so far.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}

use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tracing::info;

/// Installs the global Prometheus recorder and serves it on `[::]:{port}/metrics`.
///
/// Must be called from within a tokio runtime since the listener runs as a background task.
/// Every metric carries an `app` label with `app_name`. Until this is called, emitted
/// metrics are discarded.
pub fn init_metrics(port: u16, app_name: &str) -> Result<(), BuildError> {
    let address = SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port);

    PrometheusBuilder::new()
        .with_http_listener(address)
        .add_global_label("app", app_name)
        .install()?;

    info!(%address, "prometheus metrics listener started");

    Ok(())
}

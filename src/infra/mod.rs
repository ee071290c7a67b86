pub mod fixture;
pub mod orion;

use anyhow::Context;
use std::sync::Arc;
use tracing::info;

use crate::config::{Config, DataSourceKind};
use crate::fetch::{BasicClient, FiwareTenant};
use crate::services::RatingSource;
use fixture::FixtureSource;
use orion::OrionClient;

/// Builds the configured [`RatingSource`].
pub fn connect(config: &Config) -> anyhow::Result<Arc<dyn RatingSource>> {
    match config.data_source {
        DataSourceKind::Orion => {
            let http = BasicClient::new(config.timeout, config.connect_timeout)
                .context("Failed to build HTTP client")?;
            let tenant = FiwareTenant::new(
                http,
                config.fiware_service.as_deref(),
                &config.fiware_service_path,
            )?;
            let client = OrionClient::new(tenant, &config.orion_uri)?;
            info!(uri = %config.orion_uri, "Using Orion context broker");
            Ok(Arc::new(client))
        }
        DataSourceKind::Fixture => {
            let path = config
                .fixture_path
                .as_ref()
                .context("FIXTURE_PATH must be set when DATA_SOURCE=fixture")?;
            Ok(Arc::new(FixtureSource::load(path)?))
        }
    }
}

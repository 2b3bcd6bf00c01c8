//! Home Assistant REST publisher.
//!
//! Thin collaborator glue: the pipeline hands over finished payloads and this
//! module only moves them across the wire. Kept behind the [`StatePublisher`]
//! trait so tests can observe what would have been published.

use crate::config::HassConfig;
use crate::error::PublishError;
use crate::reconcile::{SensorUpdate, StatisticPoint};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde_json::json;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Publishing seam between the pipeline and the home-automation platform.
#[async_trait]
pub trait StatePublisher: Send + Sync {
    /// Updates (or creates) the sensor state plus attributes.
    async fn publish_state(&self, update: &SensorUpdate) -> Result<(), PublishError>;

    /// Imports the combined reading series as long-term statistics.
    async fn import_statistics(
        &self,
        update: &SensorUpdate,
        series: &[StatisticPoint],
    ) -> Result<(), PublishError>;
}

pub struct Client {
    http_client: HttpClient,
    config: HassConfig,
}

impl Client {
    pub fn new(config: HassConfig) -> Result<Self, PublishError> {
        let http_client = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    async fn post(
        &self,
        path: &str,
        entity_id: &str,
        body: serde_json::Value,
    ) -> Result<(), PublishError> {
        let url = format!("{}{}", self.config.url, path);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(PublishError::rejected(
                entity_id,
                status,
                response.text().await.unwrap_or_default(),
            ))
        }
    }
}

#[async_trait]
impl StatePublisher for Client {
    async fn publish_state(&self, update: &SensorUpdate) -> Result<(), PublishError> {
        // Home Assistant expects the state as a string.
        let body = json!({
            "state": update.state.to_string(),
            "attributes": update.attributes,
        });
        self.post(
            &format!("/states/{}", update.entity_id),
            &update.entity_id,
            body,
        )
        .await?;
        tracing::info!("Updated sensor {}: {}", update.entity_id, update.state);
        Ok(())
    }

    async fn import_statistics(
        &self,
        update: &SensorUpdate,
        series: &[StatisticPoint],
    ) -> Result<(), PublishError> {
        if series.is_empty() {
            return Ok(());
        }
        let stats: Vec<serde_json::Value> = series
            .iter()
            .map(|point| {
                json!({
                    "start": point.start.to_rfc3339(),
                    "state": point.cumulative,
                    "sum": point.cumulative,
                })
            })
            .collect();
        let body = json!({
            "statistic_id": update.entity_id,
            "source": "recorder",
            "name": update.attributes["friendly_name"],
            "unit_of_measurement": "m³",
            "has_mean": false,
            "has_sum": true,
            "stats": stats,
        });
        self.post(
            "/services/recorder/import_statistics",
            &update.entity_id,
            body,
        )
        .await?;
        tracing::info!(
            "Imported {} statistics point(s) for {}",
            series.len(),
            update.entity_id
        );
        Ok(())
    }
}

//! One fetch cycle: login → fetch page → parse → reconcile → publish.
//!
//! The pipeline owns no global state; everything it needs is injected at
//! construction. Overlapping triggers (the scheduler and the web API) are
//! serialized on an internal mutex so at most one run is in flight.

use crate::config::MeterConfig;
use crate::hass::StatePublisher;
use crate::ledger::HistoricalLedger;
use crate::model::MeterRole;
use crate::portal::{parse_readings, PortalSession};
use crate::reconcile;
use crate::reconcile::{SensorUpdate, StatisticPoint};
use chrono::{DateTime, Local};
use futures::future::join_all;
use std::sync::Arc;

pub struct FetchPipeline {
    session: PortalSession,
    publisher: Arc<dyn StatePublisher>,
    ledger: Arc<HistoricalLedger>,
    meters: MeterConfig,
    run_guard: tokio::sync::Mutex<()>,
    last_fetch: std::sync::Mutex<Option<DateTime<Local>>>,
}

impl FetchPipeline {
    pub fn new(
        session: PortalSession,
        publisher: Arc<dyn StatePublisher>,
        ledger: Arc<HistoricalLedger>,
        meters: MeterConfig,
    ) -> Self {
        Self {
            session,
            publisher,
            ledger,
            meters,
            run_guard: tokio::sync::Mutex::new(()),
            last_fetch: std::sync::Mutex::new(None),
        }
    }

    /// When the last successful run finished.
    pub fn last_fetch(&self) -> Option<DateTime<Local>> {
        *self.last_fetch.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Runs one full fetch cycle and returns whether readings were fetched
    /// and published. A failed run leaves previously published sensor state
    /// untouched. Publish failures for individual meters are logged without
    /// failing the run.
    pub async fn run(&self) -> bool {
        let _guard = self.run_guard.lock().await;

        if !self.session.login().await {
            return false;
        }

        let page = match self.session.fetch_readings_page().await {
            Ok(page) => page,
            Err(e) => {
                tracing::error!("Error fetching readings: {}", e);
                return false;
            }
        };

        let meters = parse_readings(&page);
        if meters.is_empty() {
            tracing::warn!("No meter readings found");
            return false;
        }

        let mut found_main = false;
        let mut found_garden = false;
        let publishes: Vec<_> = meters
            .iter()
            .filter_map(|meter| {
                match reconcile::classify(&meter.meter_number, &self.meters) {
                    MeterRole::Main => found_main = true,
                    MeterRole::Garden => found_garden = true,
                    MeterRole::Unknown => {}
                }
                let historical = self.ledger.get(&meter.meter_number);
                let update = reconcile::reconcile(meter, &historical, &self.meters)?;
                let series = reconcile::statistics_series(meter, &historical);
                Some(self.publish(update, series))
            })
            .collect();
        join_all(publishes).await;

        let main_number = self.meters.main_meter_number.trim();
        if !main_number.is_empty() && !found_main {
            tracing::warn!(
                "Configured main meter '{}' not found in portal readings",
                main_number
            );
        }
        let garden_number = self.meters.garden_meter_number.trim();
        if !garden_number.is_empty() && !found_garden {
            tracing::warn!(
                "Configured garden meter '{}' not found in portal readings",
                garden_number
            );
        }

        *self.last_fetch.lock().unwrap_or_else(|e| e.into_inner()) = Some(Local::now());
        true
    }

    async fn publish(&self, update: SensorUpdate, series: Vec<StatisticPoint>) {
        tracing::info!(
            "Updating {} with state={}",
            update.entity_id,
            update.state
        );
        if let Err(e) = self.publisher.publish_state(&update).await {
            tracing::error!("Error updating sensor {}: {}", update.entity_id, e);
            return;
        }
        if let Err(e) = self.publisher.import_statistics(&update, &series).await {
            tracing::error!(
                "Error importing statistics for {}: {}",
                update.entity_id,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PortalConfig;
    use crate::test_utils::config::test_meter_config;
    use crate::test_utils::html::{readings_page, readings_row};
    use crate::test_utils::mocks::MockStatePublisher;
    use tempfile::TempDir;

    fn portal_config(url: String) -> PortalConfig {
        PortalConfig {
            base_url: url,
            username: "kunde".to_string(),
            password: "geheim".to_string(),
        }
    }

    fn login_page() -> &'static str {
        r#"<html><body><form action="/login"><input type="hidden" name="t" value="1"/></form></body></html>"#
    }

    async fn mock_portal(
        server: &mut mockito::Server,
        readings_html: &str,
    ) -> Vec<mockito::Mock> {
        vec![
            server
                .mock("GET", "/")
                .with_status(200)
                .with_body(login_page())
                .create_async()
                .await,
            server
                .mock("POST", "/login")
                .with_status(200)
                .with_body("ok")
                .create_async()
                .await,
            server
                .mock("GET", "/ablesungen")
                .with_status(200)
                .with_body(readings_html.to_string())
                .create_async()
                .await,
        ]
    }

    fn pipeline_with(
        server_url: String,
        publisher: Arc<MockStatePublisher>,
    ) -> (TempDir, FetchPipeline) {
        let dir = TempDir::new().unwrap();
        let ledger = Arc::new(HistoricalLedger::load(dir.path().join("ledger.json")));
        let session = PortalSession::new(portal_config(server_url)).unwrap();
        let pipeline = FetchPipeline::new(session, publisher, ledger, test_meter_config());
        (dir, pipeline)
    }

    mod succeeds {
        use super::*;

        #[tokio::test]
        async fn test_run_publishes_configured_meters() {
            let mut server = mockito::Server::new_async().await;
            let page = readings_page(&[
                readings_row("15093668", "01.01.2023", "", "100,0 m³", "10,0 m³", "Ablesung"),
                readings_row("15093668", "01.02.2023", "", "110,0 m³", "10,0 m³", "Ablesung"),
            ]);
            let _mocks = mock_portal(&mut server, &page).await;

            let publisher = Arc::new(MockStatePublisher::new_success());
            let (_dir, pipeline) = pipeline_with(server.url(), Arc::clone(&publisher));

            assert!(pipeline.run().await);
            assert!(pipeline.last_fetch().is_some());

            let states = publisher.states.lock().unwrap();
            assert_eq!(states.len(), 1);
            assert_eq!(states[0].entity_id, "sensor.waterportal_water_main");
            assert_eq!(states[0].state, 110);

            let statistics = publisher.statistics.lock().unwrap();
            assert_eq!(statistics.len(), 1);
            assert_eq!(statistics[0].1.len(), 2);
        }

        #[tokio::test]
        async fn test_run_includes_ledger_entries() {
            let mut server = mockito::Server::new_async().await;
            let page = readings_page(&[readings_row(
                "15093668",
                "01.02.2023",
                "",
                "110,0 m³",
                "10,0 m³",
                "Ablesung",
            )]);
            let _mocks = mock_portal(&mut server, &page).await;

            let publisher = Arc::new(MockStatePublisher::new_success());
            let (_dir, pipeline) = pipeline_with(server.url(), Arc::clone(&publisher));
            pipeline
                .ledger
                .add("15093668", "2020-12-31", 50.0, Some(140.0), "Manual Entry");

            assert!(pipeline.run().await);

            let states = publisher.states.lock().unwrap();
            assert_eq!(states[0].attributes["historical_count"], 1);

            // ledger point plus portal point
            let statistics = publisher.statistics.lock().unwrap();
            assert_eq!(statistics[0].1.len(), 2);
        }

        #[tokio::test]
        async fn test_run_skips_unconfigured_meters() {
            let mut server = mockito::Server::new_async().await;
            let page = readings_page(&[readings_row(
                "999",
                "01.02.2023",
                "",
                "110,0 m³",
                "10,0 m³",
                "Ablesung",
            )]);
            let _mocks = mock_portal(&mut server, &page).await;

            let publisher = Arc::new(MockStatePublisher::new_success());
            let (_dir, pipeline) = pipeline_with(server.url(), Arc::clone(&publisher));

            // The fetch itself succeeded; there was just nothing to publish.
            assert!(pipeline.run().await);
            assert!(publisher.states.lock().unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_publish_failure_does_not_fail_the_run() {
            let mut server = mockito::Server::new_async().await;
            let page = readings_page(&[readings_row(
                "15093668",
                "01.02.2023",
                "",
                "110,0 m³",
                "10,0 m³",
                "Ablesung",
            )]);
            let _mocks = mock_portal(&mut server, &page).await;

            let publisher = Arc::new(MockStatePublisher::new_failure());
            let (_dir, pipeline) = pipeline_with(server.url(), Arc::clone(&publisher));

            assert!(pipeline.run().await);
        }
    }

    mod fails {
        use super::*;

        #[tokio::test]
        async fn test_run_aborts_on_login_failure() {
            let publisher = Arc::new(MockStatePublisher::new_success());
            let (_dir, pipeline) =
                pipeline_with("http://127.0.0.1:1".to_string(), Arc::clone(&publisher));

            assert!(!pipeline.run().await);
            assert!(pipeline.last_fetch().is_none());
            assert!(publisher.states.lock().unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_run_aborts_when_table_is_missing() {
            let mut server = mockito::Server::new_async().await;
            let _mocks = mock_portal(
                &mut server,
                "<html><body><h1>Ablesungen</h1><p>keine Tabelle</p></body></html>",
            )
            .await;

            let publisher = Arc::new(MockStatePublisher::new_success());
            let (_dir, pipeline) = pipeline_with(server.url(), Arc::clone(&publisher));

            assert!(!pipeline.run().await);
            assert!(publisher.states.lock().unwrap().is_empty());
        }
    }
}

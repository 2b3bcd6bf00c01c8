//! Mock implementations of the publishing seam.

use crate::error::PublishError;
use crate::hass::StatePublisher;
use crate::reconcile::{SensorUpdate, StatisticPoint};
use async_trait::async_trait;
use std::sync::Mutex;

/// Records everything published so tests can assert on it; optionally fails
/// every call instead.
pub struct MockStatePublisher {
    fail: bool,
    pub states: Mutex<Vec<SensorUpdate>>,
    pub statistics: Mutex<Vec<(String, Vec<StatisticPoint>)>>,
}

impl MockStatePublisher {
    pub fn new_success() -> Self {
        Self {
            fail: false,
            states: Mutex::new(Vec::new()),
            statistics: Mutex::new(Vec::new()),
        }
    }

    pub fn new_failure() -> Self {
        Self {
            fail: true,
            states: Mutex::new(Vec::new()),
            statistics: Mutex::new(Vec::new()),
        }
    }

    fn rejection(&self, entity_id: &str) -> PublishError {
        PublishError::Rejected {
            entity_id: entity_id.to_string(),
            status: 500,
            message: "mock failure".to_string(),
        }
    }
}

#[async_trait]
impl StatePublisher for MockStatePublisher {
    async fn publish_state(&self, update: &SensorUpdate) -> Result<(), PublishError> {
        if self.fail {
            return Err(self.rejection(&update.entity_id));
        }
        self.states.lock().unwrap().push(update.clone());
        Ok(())
    }

    async fn import_statistics(
        &self,
        update: &SensorUpdate,
        series: &[StatisticPoint],
    ) -> Result<(), PublishError> {
        if self.fail {
            return Err(self.rejection(&update.entity_id));
        }
        self.statistics
            .lock()
            .unwrap()
            .push((update.entity_id.clone(), series.to_vec()));
        Ok(())
    }
}

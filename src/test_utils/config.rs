//! Configuration fixtures for tests.

use crate::config::MeterConfig;

/// A meter mapping with both roles configured.
pub fn test_meter_config() -> MeterConfig {
    MeterConfig {
        main_meter_number: "15093668".to_string(),
        main_meter_name: "Main".to_string(),
        garden_meter_number: "2181453194".to_string(),
        garden_meter_name: "Garden".to_string(),
    }
}

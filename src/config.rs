use anyhow::{anyhow, Result};
use serde_derive::Deserialize;
use std::str::FromStr;

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl AppConfig {
    pub fn log_level(&self) -> tracing::Level {
        tracing::Level::from_str(self.log_level.as_str()).unwrap_or(tracing::Level::INFO)
    }
}

pub(crate) fn load_app_config() -> Result<AppConfig> {
    match envy::from_env::<AppConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load AppConfig: {}", err)),
    }
}

fn default_portal_base_url() -> String {
    "https://kundenportal.waz-nieplitz.de".to_string()
}

#[derive(Deserialize, Debug, Clone)]
pub struct PortalConfig {
    #[serde(default = "default_portal_base_url")]
    pub base_url: String,
    pub username: String,
    pub password: String,
}

pub(crate) fn load_portal_config() -> Result<PortalConfig> {
    match envy::prefixed("PORTAL_").from_env::<PortalConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load PortalConfig: {}", err)),
    }
}

fn default_main_meter_name() -> String {
    "Main".to_string()
}

fn default_garden_meter_name() -> String {
    "Garden".to_string()
}

/// Maps raw portal meter numbers to their published roles. An empty meter
/// number leaves that role unconfigured.
#[derive(Deserialize, Debug, Clone)]
pub struct MeterConfig {
    #[serde(default)]
    pub main_meter_number: String,
    #[serde(default = "default_main_meter_name")]
    pub main_meter_name: String,
    #[serde(default)]
    pub garden_meter_number: String,
    #[serde(default = "default_garden_meter_name")]
    pub garden_meter_name: String,
}

pub fn load_meter_config() -> Result<MeterConfig> {
    match envy::prefixed("METER_").from_env::<MeterConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load MeterConfig: {}", err)),
    }
}

fn default_hass_url() -> String {
    "http://supervisor/core/api".to_string()
}

#[derive(Deserialize, Debug)]
pub struct HassConfig {
    #[serde(default = "default_hass_url")]
    pub url: String,
    pub token: String,
}

pub(crate) fn load_hass_config() -> Result<HassConfig> {
    match envy::prefixed("HASS_").from_env::<HassConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load HassConfig: {}", err)),
    }
}

// 30 days between scheduled fetches; the portal only gains a row or two a year.
fn default_update_interval_sec() -> u64 {
    2_592_000
}

fn default_retry_delay_sec() -> u64 {
    300
}

#[derive(Deserialize, Debug)]
pub struct SchedulerConfig {
    #[serde(default = "default_update_interval_sec")]
    pub update_interval_sec: u64,
    #[serde(default = "default_retry_delay_sec")]
    pub retry_delay_sec: u64,
}

pub fn load_scheduler_config() -> Result<SchedulerConfig> {
    match envy::prefixed("SCHEDULER_").from_env::<SchedulerConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load SchedulerConfig: {}", err)),
    }
}

fn default_web_port() -> u16 {
    8099
}

#[derive(Deserialize, Debug)]
pub struct WebConfig {
    #[serde(default = "default_web_port")]
    pub port: u16,
}

pub fn load_web_config() -> Result<WebConfig> {
    match envy::prefixed("WEB_").from_env::<WebConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load WebConfig: {}", err)),
    }
}

fn default_ledger_path() -> String {
    "/data/historical_readings.json".to_string()
}

#[derive(Deserialize, Debug)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: String,
}

pub fn load_ledger_config() -> Result<LedgerConfig> {
    match envy::prefixed("LEDGER_").from_env::<LedgerConfig>() {
        Ok(config) => Ok(config),
        Err(err) => Err(anyhow!("Failed to load LedgerConfig: {}", err)),
    }
}

//! Authenticated session against the portal.
//!
//! The portal uses a plain session cookie issued after a form login. There is
//! no session persistence across process restarts; login is repeated at the
//! start of every fetch cycle.

use crate::config::PortalConfig;
use crate::error::PortalError;
use crate::portal::helper::html_selector;
use reqwest::Client as HttpClient;
use scraper::Html;
use std::time::Duration;

const READINGS_PATH: &str = "/ablesungen";
const READINGS_MARKER: &str = "Ablesungen";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct PortalSession {
    http_client: HttpClient,
    config: PortalConfig,
}

impl PortalSession {
    pub fn new(config: PortalConfig) -> Result<Self, PortalError> {
        let http_client = HttpClient::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    /// Logs into the portal. Returns false on any failure with the reason
    /// logged; bad credentials and transient transport failures are not
    /// distinguished.
    pub async fn login(&self) -> bool {
        match self.try_login().await {
            Ok(()) => {
                tracing::info!("Login successful");
                true
            }
            Err(e) => {
                tracing::error!("Login failed: {}", e);
                false
            }
        }
    }

    async fn try_login(&self) -> Result<(), PortalError> {
        tracing::info!("Attempting to log in to the portal...");

        let response = self.http_client.get(&self.config.base_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PortalError::server_error(
                status,
                response.text().await.unwrap_or_default(),
            ));
        }
        let body = response.text().await?;
        let (action, payload) = self.build_login_submission(&body)?;

        tracing::debug!("Posting login to: {}", action);
        let response = self
            .http_client
            .post(&action)
            .form(&payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PortalError::server_error(
                status,
                response.text().await.unwrap_or_default(),
            ));
        }

        // The portal answers the login POST with 200 either way. Verify by
        // requesting the readings page and checking for its marker.
        let response = self.http_client.get(self.readings_url()).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let marker_found = body.contains(READINGS_MARKER);
        if status == reqwest::StatusCode::OK && marker_found {
            Ok(())
        } else {
            Err(PortalError::LoginRejected {
                status: status.as_u16(),
                marker_found,
            })
        }
    }

    /// Builds the login form action URL and submission payload from the
    /// portal root page.
    fn build_login_submission(
        &self,
        body: &str,
    ) -> Result<(String, Vec<(String, String)>), PortalError> {
        let document = Html::parse_document(body);

        let form_selector = html_selector("form")?;
        let form = document
            .select(&form_selector)
            .next()
            .ok_or(PortalError::LoginFormMissing)?;

        let mut payload: Vec<(String, String)> = vec![
            (
                "fieldLoginBenutzername".to_string(),
                self.config.username.clone(),
            ),
            (
                "fieldLoginPasswort".to_string(),
                self.config.password.clone(),
            ),
            ("fieldFormSent".to_string(), "formLogin".to_string()),
            ("fieldSFileReferer".to_string(), String::new()),
        ];

        // Anti-forgery tokens are opaque; echo every hidden input back
        // verbatim unless the field is already set.
        let hidden_selector = html_selector(r#"input[type="hidden"]"#)?;
        for input in document.select(&hidden_selector) {
            if let Some(name) = input.value().attr("name") {
                if !payload.iter().any(|(existing, _)| existing == name) {
                    let value = input.value().attr("value").unwrap_or("");
                    payload.push((name.to_string(), value.to_string()));
                }
            }
        }

        let action = match form.value().attr("action") {
            Some(action) if action.starts_with("http") => action.to_string(),
            Some(action) => format!("{}{}", self.config.base_url, action),
            None => self.config.base_url.clone(),
        };

        Ok((action, payload))
    }

    /// Fetches the readings page. Requires a prior successful login on this
    /// session; continuity is cookie based.
    pub async fn fetch_readings_page(&self) -> Result<String, PortalError> {
        tracing::info!("Fetching meter readings page...");
        let response = self.http_client.get(self.readings_url()).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response.text().await?)
        } else {
            Err(PortalError::server_error(
                status,
                response.text().await.unwrap_or_default(),
            ))
        }
    }

    fn readings_url(&self) -> String {
        format!("{}{}", self.config.base_url, READINGS_PATH)
    }
}

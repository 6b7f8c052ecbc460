use crate::common::config::ServerConfig;
use crate::common::{CaptureError, Result};
use crate::service::protocol::{LoginRequest, ServerResponse, SignupRequest, CSRF_HEADER};
use crate::storage::ImageStore;
use serde::Serialize;
use std::time::Duration;

/// Posts a JSON body and decodes the server's JSON reply.
pub trait Transport {
    fn post_json(&self, url: &str, csrf_token: &str, body: &serde_json::Value) -> Result<ServerResponse>;
}

pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn post_json(&self, url: &str, csrf_token: &str, body: &serde_json::Value) -> Result<ServerResponse> {
        tracing::debug!("POST {}", url);
        let response = self.client
            .post(url)
            .header(CSRF_HEADER, csrf_token)
            .json(body)
            .send()?;

        let status = response.status();
        let text = response.text()?;
        serde_json::from_str(&text).map_err(|e| {
            CaptureError::Submission(format!("Unexpected reply from server ({}): {}", status, e))
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub success: bool,
    /// Text to show the user.
    pub message: String,
    pub redirect: Option<String>,
    pub username: Option<String>,
}

/// Sends the stored capture to the login and signup endpoints.
pub struct SubmissionClient<T = HttpTransport> {
    transport: T,
    config: ServerConfig,
}

impl SubmissionClient<HttpTransport> {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new()?, config))
    }
}

impl<T: Transport> SubmissionClient<T> {
    pub fn with_transport(transport: T, config: &ServerConfig) -> Self {
        Self { transport, config: config.clone() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<ServerResponse> {
        let csrf_token = self.config.csrf_token.as_deref().unwrap_or("");
        if csrf_token.is_empty() {
            tracing::warn!("No CSRF token configured");
        }
        let body = serde_json::to_value(body)?;
        self.transport.post_json(&self.url(path), csrf_token, &body)
    }

    pub fn login<S: ImageStore + ?Sized>(&self, store: &mut S, key: &str) -> Result<SubmissionOutcome> {
        let image_data = store.get(key)?
            .ok_or_else(|| CaptureError::Submission("Please take a photo first!".into()))?;

        let response = self.post(&self.config.login_path, &LoginRequest { image_data })?;
        tracing::debug!("Server response: {:?}", response);

        if response.is_success() {
            if let Err(e) = store.remove(key) {
                tracing::warn!("Login succeeded but the stored image could not be cleared: {}", e);
            }
            let username = response.username.clone().unwrap_or_default();
            tracing::info!("Login succeeded for {}", username);
            Ok(SubmissionOutcome {
                success: true,
                message: format!("Login Successful! Welcome {}", username),
                redirect: Some(response.redirect.unwrap_or_else(|| "/".to_string())),
                username: response.username,
            })
        } else {
            Ok(SubmissionOutcome {
                success: false,
                message: format!("Login Failed: {}", response.message.as_deref().unwrap_or("unknown error")),
                redirect: None,
                username: None,
            })
        }
    }

    pub fn signup<S: ImageStore + ?Sized>(&self, store: &mut S, key: &str, username: &str) -> Result<SubmissionOutcome> {
        if username.trim().is_empty() {
            return Err(CaptureError::Submission("Please enter a username!".into()));
        }
        let image_data = store.get(key)?.ok_or_else(|| {
            CaptureError::Submission(
                "Please take a photo first! Click the camera button to capture your face.".into(),
            )
        })?;

        let request = SignupRequest { image_data, username: username.to_string() };
        let response = self.post(&self.config.signup_path, &request)?;
        tracing::debug!("Server response: {:?}", response);

        if response.is_success() && response.redirect.is_some() {
            if let Err(e) = store.remove(key) {
                tracing::warn!("Signup succeeded but the stored image could not be cleared: {}", e);
            }
            tracing::info!("Signup succeeded for {}", username);
            Ok(SubmissionOutcome {
                success: true,
                message: response.message.unwrap_or_else(|| format!("Welcome {}", username)),
                redirect: response.redirect,
                username: Some(response.username.unwrap_or_else(|| username.to_string())),
            })
        } else {
            let detail = match &response.message {
                Some(message) => message.clone(),
                None => serde_json::to_string(&response)?,
            };
            Ok(SubmissionOutcome {
                success: false,
                message: format!("Response: {}", detail),
                redirect: None,
                username: None,
            })
        }
    }
}

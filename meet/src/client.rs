//! Meeting provider API client implementation

use chrono::{DateTime, Utc};
use mentorlink_core::RemoteServiceError;
use mentorlink_core::ports::{MeetingProvisioner, MeetingRequest, ProvisionedMeeting, RemoteFuture};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::MeetError;

/// Connection settings for the meeting provider.
#[derive(Clone)]
pub struct MeetClientConfig {
    /// API root, without a trailing slash
    pub base_url: String,
    /// Bearer token
    pub api_token: String,
    /// Per-request deadline enforced by the HTTP client
    pub request_timeout: Duration,
}

impl std::fmt::Debug for MeetClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeetClientConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"***")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[derive(Serialize)]
struct CreateMeetingBody<'a> {
    title: &'a str,
    start_time: DateTime<Utc>,
    duration_minutes: u32,
    attendees: &'a [String],
}

#[derive(Deserialize)]
struct CreateMeetingResponse {
    join_url: String,
    #[serde(default)]
    id: Option<String>,
}

/// Meeting provider API client
#[derive(Clone, Debug)]
pub struct MeetClient {
    client: Client,
    config: MeetClientConfig,
}

impl MeetClient {
    /// Create a new client with explicit settings
    ///
    /// # Errors
    ///
    /// Returns `MeetError::ClientSetup` if the HTTP client cannot be built
    pub fn new(mut config: MeetClientConfig) -> Result<Self, MeetError> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| MeetError::ClientSetup(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Create one meeting
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, API errors, or parsing failures
    pub async fn create(&self, request: &MeetingRequest) -> Result<ProvisionedMeeting, MeetError> {
        let body = CreateMeetingBody {
            title: &request.title,
            start_time: request.start,
            duration_minutes: request.duration_minutes,
            attendees: &request.attendees,
        };

        let response = self
            .client
            .post(format!("{}/meetings", self.config.base_url))
            .bearer_auth(&self.config.api_token)
            .json(&body)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                let text = response.text().await?;
                let parsed: CreateMeetingResponse =
                    serde_json::from_str(&text).map_err(|e| MeetError::ResponseParseFailed(e.to_string()))?;
                if parsed.join_url.trim().is_empty() {
                    return Err(MeetError::ResponseParseFailed("empty join_url".to_string()));
                }
                tracing::debug!(meeting_id = ?parsed.id, "Meeting created");
                Ok(ProvisionedMeeting {
                    join_url: parsed.join_url,
                    meeting_id: parsed.id,
                })
            }
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(MeetError::ApiError {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

impl MeetingProvisioner for MeetClient {
    fn create_meeting(&self, request: MeetingRequest) -> RemoteFuture<'_, ProvisionedMeeting> {
        Box::pin(async move { self.create(&request).await.map_err(RemoteServiceError::from) })
    }
}

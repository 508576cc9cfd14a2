//! `reqwest` client for the `/v1/responses` completion endpoint.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use copilot_shared::{
    ApiConfig, ApiKey, ClientMeta, CopilotError, GatewayResponse, Message, Result,
};

use crate::{CompletionRequest, Gateway};

/// Path appended to the configured base URL.
pub const RESPONSES_PATH: &str = "/v1/responses";

/// User-Agent string for gateway requests.
const USER_AGENT: &str = concat!("support-copilot/", env!("CARGO_PKG_VERSION"));

/// Request body accepted by the responses endpoint.
#[derive(Debug, Serialize)]
struct ResponsesBody<'a> {
    model: &'a str,
    input: &'a [Message],
    temperature: f64,
    top_p: f64,
    max_output_tokens: u32,
    stream: bool,
}

/// Gateway backed by an HTTP completion service.
pub struct ResponsesClient {
    http: Client,
    endpoint: String,
    api_key: ApiKey,
    timeout: Duration,
}

impl ResponsesClient {
    /// Build a client for `<api.base_url>/v1/responses` with the configured timeout.
    pub fn new(api: &ApiConfig, api_key: ApiKey) -> Result<Self> {
        let timeout = Duration::from_secs(api.timeout_secs);
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| CopilotError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: endpoint_url(&api.base_url),
            api_key,
            timeout,
        })
    }

    /// Full URL requests are POSTed to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, err: reqwest::Error) -> CopilotError {
        if err.is_timeout() {
            CopilotError::Transport(format!(
                "{}: request timed out after {}s",
                self.endpoint,
                self.timeout.as_secs()
            ))
        } else {
            CopilotError::Transport(format!("{}: {err}", self.endpoint))
        }
    }
}

#[async_trait]
impl Gateway for ResponsesClient {
    #[instrument(skip_all, fields(model = %request.model, messages = request.input.len()))]
    async fn complete(&self, request: &CompletionRequest) -> Result<GatewayResponse> {
        request.params.validate()?;

        let body = ResponsesBody {
            model: &request.model,
            input: &request.input,
            temperature: request.params.temperature,
            top_p: request.params.top_p,
            max_output_tokens: request.params.max_output_tokens,
            stream: false,
        };

        debug!(endpoint = %self.endpoint, "sending completion request");

        let started = Instant::now();
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if status.as_u16() >= 400 {
            let text = String::from_utf8_lossy(&bytes);
            warn!(status = status.as_u16(), latency_ms, "completion service returned an error");
            return Err(CopilotError::gateway(status.as_u16(), &text));
        }

        // Only the status decides failure; a non-JSON body is recorded as absent.
        let payload = match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, bytes = bytes.len(), "response body is not JSON, treating as absent");
                serde_json::Value::Null
            }
        };

        debug!(status = status.as_u16(), latency_ms, "completion response received");

        Ok(GatewayResponse {
            payload,
            client_meta: ClientMeta {
                latency_ms,
                model: request.model.clone(),
            },
        })
    }
}

fn endpoint_url(base_url: &str) -> String {
    format!("{}{RESPONSES_PATH}", base_url.trim_end_matches('/'))
}

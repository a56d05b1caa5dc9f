//! reqwest-backed client for the check-in service.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde_json::json;
use url::Url;

use super::{ApiResponse, CheckinApi};
use crate::error::ApiError;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ACCEPT: &str = "application/json, text/plain, */*";
const ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8";

/// Per-call time bounds.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub login: Duration,
    pub request: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            login: Duration::from_secs(30),
            request: Duration::from_secs(10),
        }
    }
}

pub struct HttpCheckinClient {
    client: Client,
    base: Url,
    timeouts: Timeouts,
}

impl HttpCheckinClient {
    /// Build a client for the service rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or the HTTP client cannot
    /// be constructed.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let origin = base.origin().ascii_serialization();
        let client = Client::builder()
            .default_headers(browser_headers(&origin)?)
            .build()
            .map_err(|e| transport("client", e))?;

        Ok(Self {
            client,
            base,
            timeouts: Timeouts::default(),
        })
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path)?)
    }

    fn execute(&self, endpoint: &'static str, request: RequestBuilder) -> Result<ApiResponse, ApiError> {
        let response = request.send().map_err(|e| transport(endpoint, e))?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| transport(endpoint, e))?;
        tracing::debug!(endpoint, status, "service responded");
        Ok(ApiResponse { status, body })
    }
}

impl CheckinApi for HttpCheckinClient {
    fn fetch_user(&self, token: &str) -> Result<ApiResponse, ApiError> {
        let request = self
            .client
            .get(self.endpoint("api/auth/user")?)
            .bearer_auth(token)
            .timeout(self.timeouts.request);
        self.execute("user", request)
    }

    fn login(&self, email: &str, password: &str) -> Result<ApiResponse, ApiError> {
        let request = self
            .client
            .post(self.endpoint("api/auth/login")?)
            .json(&json!({ "email": email, "password": password }))
            .timeout(self.timeouts.login);
        self.execute("login", request)
    }

    fn checkin(&self, token: &str) -> Result<ApiResponse, ApiError> {
        let request = self
            .client
            .post(self.endpoint("api/checkin")?)
            .bearer_auth(token)
            .json(&json!({}))
            .timeout(self.timeouts.request);
        self.execute("checkin", request)
    }

    fn balance(&self, token: &str) -> Result<ApiResponse, ApiError> {
        let request = self
            .client
            .get(self.endpoint("api/credits/balance")?)
            .bearer_auth(token)
            .timeout(self.timeouts.request);
        self.execute("balance", request)
    }
}

fn browser_headers(origin: &str) -> Result<HeaderMap, ApiError> {
    let value = |v: &str| {
        HeaderValue::from_str(v).map_err(|e| ApiError::Transport {
            endpoint: "client",
            message: format!("invalid header value '{v}': {e}"),
        })
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT));
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE));
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(header::ORIGIN, value(origin)?);
    headers.insert(header::REFERER, value(format!("{origin}/").as_str())?);
    Ok(headers)
}

fn transport(endpoint: &'static str, err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout { endpoint }
    } else {
        ApiError::Transport {
            endpoint,
            message: err.to_string(),
        }
    }
}

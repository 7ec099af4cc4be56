use std::env;
use std::error;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use escort::messaging::MessagingTransport;
use serde::Serialize;

#[derive(Debug, Clone)]
pub enum MessagingError {
    RequestError(Arc<reqwest::Error>),
    InvalidResponse {
        status_code: reqwest::StatusCode,
        url: String,
        response: Option<String>,
    },
}

impl error::Error for MessagingError {}

impl fmt::Display for MessagingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MessagingError::RequestError(e) => write!(f, "HTTP request error: {}", e),
            MessagingError::InvalidResponse {
                status_code,
                url,
                response,
            } => match response {
                Some(text) => {
                    write!(f, "Invalid Response ({}) {}: {}", status_code, text, url)
                }
                None => write!(f, "Invalid Response ({}) {}", status_code, url),
            },
        }
    }
}

impl From<reqwest::Error> for MessagingError {
    fn from(e: reqwest::Error) -> Self {
        MessagingError::RequestError(Arc::new(e))
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SmsRequest<'a> {
    phone_number: &'a str,
    message: &'a str,
}

/// Client for an HTTP SMS gateway. One request per recipient.
pub struct HttpSmsGateway {
    url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpSmsGateway {
    pub fn new(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            url: url.into(),
            token,
            client: reqwest::Client::new(),
        }
    }

    /// Reads `SMS_GATEWAY_URL` and the optional `SMS_GATEWAY_TOKEN`.
    pub fn from_env() -> Option<Self> {
        let url = env::var("SMS_GATEWAY_URL").ok()?;
        let token = env::var("SMS_GATEWAY_TOKEN").ok();
        Some(Self::new(url, token))
    }

    async fn post_message(&self, phone_number: &str, message: &str) -> Result<(), MessagingError> {
        let request = SmsRequest {
            phone_number,
            message,
        };
        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        let response = builder.send().await?;
        match response.status() {
            reqwest::StatusCode::OK => Ok(()),
            other => match response.text().await {
                Ok(text) => Err(MessagingError::InvalidResponse {
                    status_code: other,
                    url: self.url.clone(),
                    response: Some(text),
                }),
                Err(_) => Err(MessagingError::InvalidResponse {
                    status_code: other,
                    url: self.url.clone(),
                    response: None,
                }),
            },
        }
    }
}

#[async_trait]
impl MessagingTransport for HttpSmsGateway {
    async fn send(
        &self,
        phone_number: &str,
        message: &str,
    ) -> Result<(), Box<dyn error::Error + Send>> {
        match self.post_message(phone_number, message).await {
            Ok(()) => Ok(()),
            Err(why) => Err(Box::new(why)),
        }
    }
}

/// Transport that only writes the message to the log. Stands in for the
/// gateway during development.
pub struct LogTransport;

#[async_trait]
impl MessagingTransport for LogTransport {
    async fn send(
        &self,
        phone_number: &str,
        message: &str,
    ) -> Result<(), Box<dyn error::Error + Send>> {
        log::info!("sms to {}: {}", phone_number, message);
        Ok(())
    }
}

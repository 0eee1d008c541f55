use std::time::Duration;

use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use stormview_common::TransportError;

use crate::transport::{CounterAction, Transport};

#[derive(Serialize)]
struct CliRequest<'a> {
    cmd: &'a str,
}

#[derive(Deserialize)]
struct CliResponse {
    resp: String,
}

#[derive(Serialize)]
struct SetRequest<'a> {
    key: &'a str,
    value: &'a str,
}

#[derive(Deserialize)]
struct SetResponse {
    success: bool,
}

#[derive(Deserialize)]
struct GetResponse {
    value: Option<String>,
}

#[derive(Serialize)]
struct CounterRequest<'a> {
    key: &'a str,
    action: &'a str,
}

#[derive(Deserialize)]
struct CounterResponse {
    value: i64,
}

/// Corpo de erro do gateway: `{"detail": ...}`.
#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

/// Transporte HTTP até o gateway JSON do store.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let base = Url::parse(base_url)
            .map_err(|e| TransportError::Network(format!("URL inválida '{base_url}': {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(network)?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::Network(format!("URL base sem path: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl Transport for HttpTransport {
    async fn command(&self, line: &str) -> Result<String, TransportError> {
        let url = self.endpoint(&["cli"])?;
        debug!("POST {url} cmd={line:?}");
        let response = self
            .client
            .post(url)
            .json(&CliRequest { cmd: line })
            .send()
            .await
            .map_err(network)?;
        let body: CliResponse = decode(response).await?;
        Ok(body.resp)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, TransportError> {
        let url = self.endpoint(&["get", key])?;
        debug!("GET {url}");
        let response = self.client.get(url).send().await.map_err(network)?;
        let body: GetResponse = decode(response).await?;
        Ok(body.value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), TransportError> {
        let url = self.endpoint(&["set"])?;
        debug!("POST {url} key={key}");
        let response = self
            .client
            .post(url)
            .json(&SetRequest { key, value })
            .send()
            .await
            .map_err(network)?;
        let status = response.status().as_u16();
        let body: SetResponse = decode(response).await?;
        if !body.success {
            return Err(TransportError::Status {
                status,
                detail: None,
            });
        }
        Ok(())
    }

    async fn counter(&self, key: &str, action: CounterAction) -> Result<i64, TransportError> {
        let url = self.endpoint(&["counter"])?;
        debug!("POST {url} key={key} action={action}");
        let response = self
            .client
            .post(url)
            .json(&CounterRequest {
                key,
                action: action.as_str(),
            })
            .send()
            .await
            .map_err(network)?;
        let body: CounterResponse = decode(response).await?;
        Ok(body.value)
    }
}

fn network(e: reqwest::Error) -> TransportError {
    TransportError::Network(e.to_string())
}

/// Decodifica o corpo JSON ou converte respostas não-2xx em `Status`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let status = response.status();
    if !status.is_success() {
        let detail = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.detail)
            .map(|detail| match detail {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            });
        return Err(TransportError::Status {
            status: status.as_u16(),
            detail,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| TransportError::Decode(e.to_string()))
}

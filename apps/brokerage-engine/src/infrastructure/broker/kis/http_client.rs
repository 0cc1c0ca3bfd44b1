//! HTTP client wrapper with pacing and result-code classification.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use super::api_types::{
    KisApprovalRequest, KisApprovalResponse, KisErrorBody, KisHashkeyResponse, KisResultHeader,
};
use super::config::KisConfig;
use super::error::KisError;
use crate::application::ports::{AppCredentials, AuthorizedAccount};

/// Successful mutating call: body plus the brokerage's message.
#[derive(Debug)]
pub struct KisReply<T> {
    /// Operation-specific fields.
    pub body: T,
    /// `msg1`.
    pub message: String,
}

/// HTTP client for the KIS REST API.
#[derive(Debug, Clone)]
pub struct KisHttpClient {
    client: Client,
    base_url: String,
    customer_type: String,
    get_pacing: Duration,
    post_pacing: Duration,
}

impl KisHttpClient {
    /// Create a new HTTP client from config.
    pub fn new(config: &KisConfig) -> Result<Self, KisError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| KisError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            customer_type: config.customer_type.clone(),
            get_pacing: config.get_pacing,
            post_pacing: config.post_pacing,
        })
    }

    /// REST base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Signed GET selecting operation `tr_id`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        tr_id: &str,
        auth: &AuthorizedAccount,
        params: &[(&str, &str)],
    ) -> Result<T, KisError> {
        tokio::time::sleep(self.get_pacing).await;

        let request = self
            .signed(self.client.get(self.url(path)), tr_id, auth)
            .query(params);
        let response = send(request).await?;
        Ok(parse_envelope(response).await?.body)
    }

    /// Signed POST selecting operation `tr_id`; the body is hashkey-signed
    /// first.
    pub async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        tr_id: &str,
        auth: &AuthorizedAccount,
        body: &B,
    ) -> Result<KisReply<T>, KisError> {
        tokio::time::sleep(self.post_pacing).await;

        let hashkey = self.hashkey(&auth.credentials, body).await?;
        let request = self
            .signed(self.client.post(self.url(path)), tr_id, auth)
            .header("hashkey", hashkey)
            .json(body);
        let response = send(request).await?;
        parse_envelope(response).await
    }

    /// Obtain the signature of a POST body.
    pub async fn hashkey<B: Serialize + Sync>(
        &self,
        credentials: &AppCredentials,
        body: &B,
    ) -> Result<String, KisError> {
        let request = self
            .client
            .post(self.url("/uapi/hashkey"))
            .header("content-type", "application/json")
            .header("appkey", &credentials.app_key)
            .header("appsecret", &credentials.app_secret)
            .json(body);
        let response = send(request).await?;
        let parsed: KisHashkeyResponse = parse_plain(response).await?;
        Ok(parsed.hash)
    }

    /// Obtain a streaming handshake key.
    pub async fn approval_key(&self, credentials: &AppCredentials) -> Result<String, KisError> {
        let body = KisApprovalRequest {
            grant_type: "client_credentials",
            appkey: &credentials.app_key,
            secretkey: &credentials.app_secret,
        };
        let request = self
            .client
            .post(self.url("/oauth2/Approval"))
            .header("content-type", "application/json")
            .json(&body);
        let response = send(request).await?;
        let parsed: KisApprovalResponse = parse_plain(response).await?;
        Ok(parsed.approval_key)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn signed(&self, request: RequestBuilder, tr_id: &str, auth: &AuthorizedAccount) -> RequestBuilder {
        request
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", auth.bearer))
            .header("appkey", &auth.credentials.app_key)
            .header("appsecret", &auth.credentials.app_secret)
            .header("tr_id", tr_id)
            .header("custtype", &self.customer_type)
    }
}

async fn send(request: RequestBuilder) -> Result<Response, KisError> {
    request
        .send()
        .await
        .map_err(|e| KisError::Network(e.to_string()))
}

/// Parse an `rt_cd` envelope, rejecting non-success codes before the body
/// is decoded.
async fn parse_envelope<T: DeserializeOwned>(response: Response) -> Result<KisReply<T>, KisError> {
    let value: serde_json::Value = parse_plain(response).await?;
    let header =
        KisResultHeader::deserialize(&value).map_err(|e| KisError::JsonParse(e.to_string()))?;
    if header.rt_cd.as_deref() != Some("0") {
        return Err(KisError::Api {
            code: header.msg_cd.unwrap_or_default(),
            message: header
                .msg1
                .unwrap_or_else(|| "missing result code".to_string()),
        });
    }
    let body = T::deserialize(value).map_err(|e| KisError::JsonParse(e.to_string()))?;
    Ok(KisReply {
        body,
        message: header.msg1.unwrap_or_default(),
    })
}

/// Parse a success body, or classify a failure response.
async fn parse_plain<T: DeserializeOwned>(response: Response) -> Result<T, KisError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| KisError::Network(e.to_string()))?;

    if status.is_success() {
        return serde_json::from_str(&text).map_err(|e| KisError::JsonParse(e.to_string()));
    }

    let body = serde_json::from_str::<KisErrorBody>(&text).unwrap_or_default();
    let reason = status.canonical_reason().unwrap_or("Unknown");
    let message = body.message().unwrap_or_else(|| reason.to_string());

    Err(KisError::Http {
        status: status.as_u16(),
        code: body.code().unwrap_or_else(|| status.as_u16().to_string()),
        message,
    })
}

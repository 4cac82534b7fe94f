//! HTTP client for the ClouDNS API.

use super::{ApiStatus, CloudnsApi, DnsRecord, UpdateResult};
use crate::config::{Config, Credentials, Target};
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::net::IpAddr;

const GET_MY_IP_PATH: &str = "/ip/get-my-ip.json";
const RECORDS_PATH: &str = "/dns/records.json";
const MOD_RECORD_PATH: &str = "/dns/mod-record.json";
const LOGIN_PATH: &str = "/dns/login.json";

/// ClouDNS API client bound to one set of credentials and one record.
pub struct CloudnsClient {
    client: reqwest::Client,
    credentials: Credentials,
    target: Target,
    base_url: String,
    ttl: u32,
}

impl CloudnsClient {
    /// Create a client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.api.timeout())
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            credentials: config.credentials.clone(),
            target: config.target.clone(),
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            ttl: config.api.ttl,
        })
    }

    fn auth_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("auth-id", self.credentials.auth_id.clone()),
            ("auth-password", self.credentials.auth_password.clone()),
        ]
    }

    fn target_params(&self) -> Vec<(&'static str, String)> {
        let mut params = self.auth_params();
        params.push(("domain-name", self.target.domain_name.clone()));
        params.push(("host", self.target.host.clone()));
        params
    }

    /// Send a request and return the response if its status is a success.
    async fn send(
        &self,
        method: Method,
        path: &str,
        params: &[(&'static str, String)],
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("{} {}", method, url);

        let response = self.client.request(method, &url).query(params).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn get_json(&self, path: &str, params: &[(&'static str, String)]) -> Result<Value> {
        let value: Value = self.send(Method::GET, path, params).await?.json().await?;
        check_failed(&value)?;
        Ok(value)
    }
}

/// Turn a `{"status": "Failed", ...}` payload into an error.
fn check_failed(value: &Value) -> Result<()> {
    if read_status(value) == Some(ApiStatus::Failed) {
        let message = value
            .get("statusDescription")
            .and_then(Value::as_str)
            .unwrap_or("request failed")
            .to_string();
        return Err(SyncError::Provider(message));
    }
    Ok(())
}

fn read_status(value: &Value) -> Option<ApiStatus> {
    match value.get("status").and_then(Value::as_str)? {
        "Success" => Some(ApiStatus::Success),
        "Failed" => Some(ApiStatus::Failed),
        _ => None,
    }
}

/// Pick the record out of a `records.json` listing.
fn parse_record_listing(value: Value, target: &Target) -> Result<DnsRecord> {
    let not_found = || SyncError::RecordNotFound {
        host: target.host.clone(),
        domain: target.domain_name.clone(),
    };

    let map = match value {
        Value::Object(map) => map,
        // ClouDNS answers with `[]` when nothing matches.
        Value::Array(items) if items.is_empty() => return Err(not_found()),
        other => {
            return Err(SyncError::UnexpectedResponse(format!(
                "expected a JSON object of records, got {}",
                other
            )))
        }
    };

    if map.len() > 1 {
        tracing::warn!(
            "{} records match {}, using the first one",
            map.len(),
            target.fqdn()
        );
    }

    let (id, data) = map.into_iter().next().ok_or_else(not_found)?;
    let record = data
        .get("record")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            SyncError::UnexpectedResponse(format!("record {} has no 'record' field", id))
        })?
        .to_string();

    Ok(DnsRecord { id, record })
}

#[async_trait]
impl CloudnsApi for CloudnsClient {
    async fn get_my_ip(&self) -> Result<IpAddr> {
        let value = self.get_json(GET_MY_IP_PATH, &self.auth_params()).await?;

        let ip = value
            .get("ip")
            .and_then(Value::as_str)
            .ok_or_else(|| SyncError::UnexpectedResponse("missing 'ip' field".to_string()))?;

        ip.trim()
            .parse()
            .map_err(|_| SyncError::UnexpectedResponse(format!("Invalid IP response: {}", ip)))
    }

    async fn get_record(&self) -> Result<DnsRecord> {
        let value = self.get_json(RECORDS_PATH, &self.target_params()).await?;
        let record = parse_record_listing(value, &self.target)?;
        tracing::debug!("Record {} of {} holds {}", record.id, self.target.fqdn(), record.record);
        Ok(record)
    }

    async fn update_record(&self, record_id: &str, ip: &str) -> Result<UpdateResult> {
        let mut params = self.target_params();
        params.push(("record-id", record_id.to_string()));
        params.push(("record", ip.to_string()));
        params.push(("ttl", self.ttl.to_string()));

        let raw = self
            .send(Method::POST, MOD_RECORD_PATH, &params)
            .await?
            .text()
            .await?;
        let status = serde_json::from_str::<Value>(&raw)
            .ok()
            .as_ref()
            .and_then(read_status);

        tracing::info!(
            "Updated record {} of {} to {} (status: {:?})",
            record_id,
            self.target.fqdn(),
            ip,
            status
        );

        Ok(UpdateResult { raw, status })
    }

    async fn login(&self) -> Result<()> {
        let value = self.get_json(LOGIN_PATH, &self.auth_params()).await?;
        match read_status(&value) {
            Some(ApiStatus::Success) => Ok(()),
            _ => Err(SyncError::UnexpectedResponse(format!(
                "login returned {}",
                value
            ))),
        }
    }
}

//! ClouDNS API access.

mod client;

pub use client::CloudnsClient;

use crate::error::Result;
use async_trait::async_trait;
use std::net::IpAddr;

/// The provider's current view of the managed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Provider-assigned record identifier.
    pub id: String,
    /// Value currently stored in the record.
    pub record: String,
}

/// Outcome reported by ClouDNS in its `status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStatus {
    Success,
    Failed,
}

/// Result of a record update.
#[derive(Debug, Clone)]
pub struct UpdateResult {
    /// Response body exactly as returned by the provider.
    pub raw: String,
    /// Best-effort reading of the `status` field, if the body had one.
    pub status: Option<ApiStatus>,
}

impl UpdateResult {
    /// Whether the provider explicitly reported a failure.
    pub fn is_failure(&self) -> bool {
        self.status == Some(ApiStatus::Failed)
    }
}

/// Operations the reconciliation pass needs from the DNS provider.
#[async_trait]
pub trait CloudnsApi: Send + Sync {
    /// Externally visible IP address of this machine, as seen by ClouDNS.
    async fn get_my_ip(&self) -> Result<IpAddr>;

    /// The managed record.
    ///
    /// Assumes the listing for the domain and host holds a single record;
    /// when several come back the first one in response order is used.
    async fn get_record(&self) -> Result<DnsRecord>;

    /// Point `record_id` at `ip` with the configured TTL.
    async fn update_record(&self, record_id: &str, ip: &str) -> Result<UpdateResult>;

    /// Check the credentials.
    async fn login(&self) -> Result<()>;
}

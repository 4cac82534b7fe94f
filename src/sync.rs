//! Single-pass reconciliation of the managed record against the current IP.

use crate::cloudns::{CloudnsApi, DnsRecord, UpdateResult};
use crate::error::{Result, SyncError};
use std::fmt;
use std::net::IpAddr;

/// Knobs for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Report what would happen without calling the updater.
    pub dry_run: bool,
    /// Update even when the record already holds the current IP.
    pub force: bool,
}

/// What the pass did about the record.
#[derive(Debug)]
pub enum SyncAction {
    /// Record already up to date.
    Unchanged,
    /// An update was due but skipped because of `dry_run`.
    WouldUpdate,
    /// The updater was called.
    Updated(UpdateResult),
    /// The updater was called and the request itself failed.
    UpdateFailed(SyncError),
}

/// Result of a reconciliation pass.
#[derive(Debug)]
pub struct SyncOutcome {
    pub current_ip: IpAddr,
    pub record: DnsRecord,
    /// Whether the stored value differed from the current IP.
    pub changed: bool,
    pub action: SyncAction,
}

impl SyncOutcome {
    /// Process exit status for this pass; non-zero only when an update failed.
    pub fn exit_code(&self) -> u8 {
        match &self.action {
            SyncAction::Updated(result) if result.is_failure() => 1,
            SyncAction::UpdateFailed(e) => e.exit_code(),
            _ => 0,
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Current IP: {}", self.current_ip)?;
        writeln!(f, "IP found in DNS: {}", self.record.record)?;

        match (&self.action, self.changed) {
            (SyncAction::Unchanged, _) => write!(f, "-> Same IP, nothing to change."),
            (SyncAction::WouldUpdate, true) => write!(f, "-> IP changed, would update DNS (dry run)."),
            (SyncAction::WouldUpdate, false) => {
                write!(f, "-> Same IP, would update DNS anyway (dry run).")
            }
            (SyncAction::Updated(result), changed) => {
                write_update_header(f, changed)?;
                write!(f, "-> ClouDNS response data: {}", result.raw)
            }
            (SyncAction::UpdateFailed(e), changed) => {
                write_update_header(f, changed)?;
                write!(f, "Error: {}", e)
            }
        }
    }
}

fn write_update_header(f: &mut fmt::Formatter<'_>, changed: bool) -> fmt::Result {
    if changed {
        writeln!(f, "-> Updating IP in DNS.")
    } else {
        writeln!(f, "-> Same IP, updating DNS anyway.")
    }
}

/// Whether the value stored in DNS already points at `current`.
///
/// Values that parse as IP addresses are compared as addresses so that
/// different spellings of the same IPv6 address match; anything else falls
/// back to exact string comparison.
pub fn ip_matches(stored: &str, current: IpAddr) -> bool {
    let stored = stored.trim();
    match stored.parse::<IpAddr>() {
        Ok(stored) => stored == current,
        Err(_) => stored == current.to_string(),
    }
}

/// Run one reconciliation pass.
///
/// Both lookups must succeed before the updater is considered, so a failed
/// IP or record lookup never turns into an update. A failed update is kept
/// in the outcome alongside the values that were already resolved.
pub async fn reconcile<A>(api: &A, options: SyncOptions) -> Result<SyncOutcome>
where
    A: CloudnsApi + ?Sized,
{
    let current_ip = api.get_my_ip().await?;
    let record = api.get_record().await?;

    let changed = !ip_matches(&record.record, current_ip);
    tracing::debug!(
        "current={} stored={} record_id={} changed={}",
        current_ip,
        record.record,
        record.id,
        changed
    );

    let action = if !changed && !options.force {
        SyncAction::Unchanged
    } else if options.dry_run {
        SyncAction::WouldUpdate
    } else {
        match api
            .update_record(&record.id, &current_ip.to_string())
            .await
        {
            Ok(result) => {
                if result.is_failure() {
                    tracing::warn!("ClouDNS reported a failed update: {}", result.raw);
                }
                SyncAction::Updated(result)
            }
            Err(e) => {
                tracing::warn!("Update of record {} failed: {}", record.id, e);
                SyncAction::UpdateFailed(e)
            }
        }
    };

    Ok(SyncOutcome {
        current_ip,
        record,
        changed,
        action,
    })
}

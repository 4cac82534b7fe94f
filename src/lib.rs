//! # cloudns-sync
//!
//! Keeps a single ClouDNS host record pointed at this machine's public IP.
//!
//! Each run asks ClouDNS for the caller's IP, reads the managed record and
//! updates it only when the two differ. Recurring runs are left to an
//! external scheduler (cron, systemd timers).
//!
//! ## Usage
//!
//! ```bash
//! # Reconcile once
//! cloudns-sync
//!
//! # Show current IP and record without touching anything
//! cloudns-sync status
//!
//! # Check configuration and credentials
//! cloudns-sync validate
//! ```

pub mod cloudns;
pub mod config;
pub mod error;
pub mod sync;

pub use cloudns::{CloudnsApi, CloudnsClient};
pub use config::Config;
pub use error::{Result, SyncError};
pub use sync::{reconcile, SyncOptions, SyncOutcome};

//! DNS record cleanup on server removal.
//!
//! Record creation belongs to the provisioning workflow; this crate only
//! hands the stored ids to a [`DnsCleanup`] when a server is removed.

use crate::error::Result;
use crate::state::DnsRecords;
use crate::workspace::ServerId;
use async_trait::async_trait;
use tracing::{debug, info};

#[async_trait]
pub trait DnsCleanup: Send + Sync {
    /// Delete the given records. An error aborts the removal before the
    /// server record is deleted, so the ids are not lost.
    async fn remove_records(&self, id: &ServerId, records: &DnsRecords) -> Result<()>;
}

/// Cleanup for deployments without managed DNS: logs and succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDnsCleanup;

#[async_trait]
impl DnsCleanup for NoopDnsCleanup {
    async fn remove_records(&self, id: &ServerId, records: &DnsRecords) -> Result<()> {
        if records.cname_record_id.is_none() && records.srv_record_id.is_none() {
            debug!(server = %id, "No DNS records to remove");
        } else {
            info!(
                server = %id,
                cname = ?records.cname_record_id,
                srv = ?records.srv_record_id,
                "DNS cleanup not configured, leaving records in place"
            );
        }
        Ok(())
    }
}

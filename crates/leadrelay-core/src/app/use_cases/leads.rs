//! Lead use cases that publish to the lead queue.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use crate::app::notifier::LeadNotifier;
use crate::domain::{
    ClinicId, ClinicSource, LeadAction, LeadDto, LeadId, LeadStatus, NotFoundError, UseCaseError,
};
use crate::ports::LeadRepository;

#[derive(Debug, Clone)]
pub struct ChangeLeadStatusArgs {
    pub source: ClinicSource,
    pub clinic_id: ClinicId,
    pub lead_id: LeadId,
    pub status: LeadStatus,
}

/// Publish `status_changed`, then persist the new status.
///
/// The dedup key carries the lead's next `status_revision` instead of a time bucket,
/// so every transition gets its own key. Nothing is written until the queue has
/// accepted the message; after a failure the caller re-runs the use case and the
/// same revision (and key) is derived again.
pub struct ChangeLeadStatus {
    leads: Arc<dyn LeadRepository>,
    notifier: Arc<LeadNotifier>,
}

impl ChangeLeadStatus {
    pub fn new(leads: Arc<dyn LeadRepository>, notifier: Arc<LeadNotifier>) -> Self {
        Self { leads, notifier }
    }

    pub async fn execute(&self, args: ChangeLeadStatusArgs) -> Result<LeadDto, UseCaseError> {
        let Some(mut lead) = self.leads.find_by_id(args.source, &args.lead_id).await? else {
            return Err(NotFoundError::Lead(args.lead_id).into());
        };
        if lead.clinic_id != args.clinic_id {
            return Err(NotFoundError::Lead(args.lead_id).into());
        }
        if lead.status == args.status {
            debug!(lead_id = %lead.id, status = %lead.status, "status unchanged, nothing to publish");
            return Ok(lead);
        }

        let revision = lead.status_revision + 1;
        let event = self
            .notifier
            .event(lead.clinic_id.clone(), lead.id.clone(), LeadAction::StatusChanged)
            .with_payload(json!({
                "from": lead.status,
                "to": args.status,
                "source": args.source,
                "revision": revision,
            }))
            .with_event_key(format!("r{revision}"));
        self.notifier.notify(event).await?;

        self.leads
            .update_status(args.source, &args.lead_id, args.status, revision)
            .await?;
        lead.status = args.status;
        lead.status_revision = revision;
        Ok(lead)
    }
}

//! Maintenance lifecycle derived from time windows.

use chrono::{DateTime, Utc};

use crate::types::{Maintenance, MaintenanceStatus};

/// Derive the status of `maintenance` at `now`.
///
/// Only the first timeslot is inspected. Its window is half-open:
/// `[start, end)` is under maintenance, before it is scheduled and from
/// `end` on it has ended. Without timeslots the upstream status is kept.
pub fn resolve_status(maintenance: &Maintenance, now: DateTime<Utc>) -> MaintenanceStatus {
    let Some(slot) = maintenance.timeslot_list.first() else {
        return maintenance.status.clone();
    };

    if now < slot.start_date {
        MaintenanceStatus::Scheduled
    } else if now < slot.end_date {
        MaintenanceStatus::UnderMaintenance
    } else {
        MaintenanceStatus::Ended
    }
}

/// Apply [`resolve_status`] to every entry.
pub fn process_maintenance_list(
    list: Vec<Maintenance>,
    now: DateTime<Utc>,
) -> Vec<Maintenance> {
    list.into_iter()
        .map(|mut m| {
            let status = resolve_status(&m, now);
            if status != m.status {
                tracing::debug!(
                    "maintenance {} status {} -> {}",
                    m.id,
                    m.status.as_str(),
                    status.as_str()
                );
            }
            m.status = status;
            m
        })
        .collect()
}

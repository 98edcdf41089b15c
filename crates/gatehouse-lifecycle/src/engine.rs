use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use gatehouse_db::models::{DeviceRow, HistoryRow, RemovalKind, RemovalRow};
use gatehouse_db::{Connection, Database, queries};
use gatehouse_types::models::{
    ActiveDevice, DeviceStatus, DisabledDevice, HistoryAction, HistoryEntry, RejectedDevice,
    SweepOutcome, SweepStatus,
};

use crate::clock::Clock;
use crate::error::LifecycleError;
use crate::policy::{LifecyclePolicy, describe_window};

type Result<T> = std::result::Result<T, LifecycleError>;

/// Actor recorded for transitions nobody asked for.
pub const SYSTEM_ACTOR: &str = "system";

pub const EXPIRED_REASON: &str = "Automatically disabled due to expiration";

/// Result of an approval check on an active device.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalCheck {
    pub approved: bool,
    /// The device as it was read, before any lazy expiration.
    pub device: ActiveDevice,
}

pub struct Lifecycle {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
    policy: LifecyclePolicy,
}

impl Lifecycle {
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>, policy: LifecyclePolicy) -> Self {
        Self { db, clock, policy }
    }

    // -- Transitions --

    pub fn register(
        &self,
        email: &str,
        android_id: &str,
        notes: Option<&str>,
    ) -> Result<ActiveDevice> {
        let now = self.clock.now();

        let device = self.db.with_tx(|tx| -> Result<DeviceRow> {
            if let Some(existing) = queries::find_device(tx, android_id)? {
                return Err(match existing.status {
                    DeviceStatus::Pending | DeviceStatus::Approved => LifecycleError::AlreadyActive,
                    DeviceStatus::Disabled => LifecycleError::PreviouslyDisabled,
                    DeviceStatus::Rejected => LifecycleError::PreviouslyRejected,
                });
            }

            let row = DeviceRow {
                id: new_id(),
                android_id: android_id.to_string(),
                email: email.to_string(),
                status: DeviceStatus::Pending,
                approved_at: None,
                expires_at: None,
                created_at: now,
                updated_at: now,
                notes: notes.map(str::to_owned),
            };
            queries::insert_device(tx, &row)?;

            record(
                tx,
                &row,
                HistoryAction::Registered,
                (false, false),
                SYSTEM_ACTOR,
                now,
                notes.unwrap_or("Device registered and pending approval"),
            )?;

            reload(tx, android_id)
        })?;

        info!("Device {} registered for {}", android_id, email);
        Ok(device.into_active())
    }

    /// Starts a fresh approval window. Approving an approved device moves
    /// both `approved_at` and `expires_at` forward.
    pub fn approve(
        &self,
        android_id: &str,
        action_by: &str,
        notes: Option<&str>,
    ) -> Result<ActiveDevice> {
        let now = self.clock.now();
        let window = self.policy.approval_window;
        let expires_at = deadline(now, window)?;

        let device = self.db.with_tx(|tx| -> Result<DeviceRow> {
            let device = find_active(tx, android_id)?;
            let kept_notes = notes.map(str::to_owned).or_else(|| device.notes.clone());

            queries::set_approval(tx, android_id, now, expires_at, kept_notes.as_deref())?;

            let default_note = format!("Device approved for {}", describe_window(window));
            record(
                tx,
                &device,
                HistoryAction::Approved,
                (device.status == DeviceStatus::Approved, true),
                action_by,
                now,
                notes.unwrap_or(&default_note),
            )?;

            reload(tx, android_id)
        })?;

        info!("Device {} approved by {} until {}", android_id, action_by, expires_at);
        Ok(device.into_active())
    }

    /// Pushes the deadline of an approved device out by whole days, counted
    /// from the current deadline.
    pub fn extend(
        &self,
        android_id: &str,
        additional_days: u32,
        action_by: &str,
        notes: Option<&str>,
    ) -> Result<ActiveDevice> {
        let now = self.clock.now();

        let device = self.db.with_tx(|tx| -> Result<DeviceRow> {
            let device = find_active(tx, android_id)?;
            if device.status != DeviceStatus::Approved {
                return Err(LifecycleError::NotApproved);
            }

            let base = device.expires_at.unwrap_or(now);
            let expires_at = deadline(base, Duration::days(i64::from(additional_days)))?;
            let kept_notes = notes.map(str::to_owned).or_else(|| device.notes.clone());

            queries::set_expiry(tx, android_id, expires_at, now, kept_notes.as_deref())?;

            let default_note = format!("Approval extended by {} days", additional_days);
            record(
                tx,
                &device,
                HistoryAction::Extended,
                (true, true),
                action_by,
                now,
                notes.unwrap_or(&default_note),
            )?;

            reload(tx, android_id)
        })?;

        info!(
            "Device {} extended by {} days by {}",
            android_id, additional_days, action_by
        );
        Ok(device.into_active())
    }

    /// Removes a pending or approved device from the active set. Used both
    /// by admins and by expiry handling.
    pub fn disable(
        &self,
        android_id: &str,
        action_by: &str,
        notes: Option<&str>,
    ) -> Result<DisabledDevice> {
        let now = self.clock.now();

        let disabled = self.db.with_tx(|tx| -> Result<DisabledDevice> {
            let device = find_active(tx, android_id)?;
            disable_row(tx, device, action_by, notes, now)
        })?;

        info!("Device {} disabled by {}", android_id, action_by);
        Ok(disabled)
    }

    /// Refuses a pending registration. Approved devices have to be disabled.
    pub fn reject(
        &self,
        android_id: &str,
        action_by: &str,
        notes: Option<&str>,
    ) -> Result<RejectedDevice> {
        let now = self.clock.now();

        let rejected = self.db.with_tx(|tx| -> Result<RejectedDevice> {
            let device = find_active(tx, android_id)?;
            if device.status == DeviceStatus::Approved {
                return Err(LifecycleError::CannotRejectApproved);
            }

            let reason = notes.unwrap_or("Device registration rejected");
            let removal = RemovalRow {
                id: new_id(),
                android_id: android_id.to_string(),
                kind: RemovalKind::Rejected,
                was_approved: false,
                approved_at: None,
                expires_at: None,
                removed_at: now,
                removed_by: action_by.to_string(),
                reason: Some(reason.to_string()),
                original_notes: device.notes.clone(),
            };
            queries::insert_removal(tx, &removal)?;
            record(
                tx,
                &device,
                HistoryAction::Rejected,
                (false, false),
                action_by,
                now,
                reason,
            )?;
            queries::mark_removed(tx, android_id, RemovalKind::Rejected, now)?;

            Ok(removal.into_rejected(&device))
        })?;

        info!("Device {} rejected by {}", android_id, action_by);
        Ok(rejected)
    }

    /// Admin override that lifts a disable: the device comes back approved
    /// under a new row id, keeping its original registration time.
    pub fn reapprove_from_disabled(
        &self,
        android_id: &str,
        action_by: &str,
        notes: Option<&str>,
    ) -> Result<ActiveDevice> {
        let now = self.clock.now();
        let expires_at = deadline(now, self.policy.reapproval_window)?;

        let device = self.db.with_tx(|tx| -> Result<DeviceRow> {
            match queries::find_device(tx, android_id)? {
                Some(device) if device.status.is_active() => {
                    return Err(LifecycleError::AlreadyActive);
                }
                Some(device) if device.status == DeviceStatus::Disabled => {}
                _ => return Err(LifecycleError::DisabledDeviceNotFound),
            }

            let removal = queries::find_removal(tx, android_id)?
                .filter(|r| r.kind == RemovalKind::Disabled)
                .ok_or(LifecycleError::DisabledDeviceNotFound)?;

            let new_notes = notes
                .map(str::to_owned)
                .or(removal.original_notes)
                .unwrap_or_else(|| "Re-approved from disabled devices".to_string());
            let new_id = new_id();

            queries::delete_removal(tx, android_id)?;
            queries::reactivate(tx, android_id, &new_id, now, expires_at, Some(&new_notes))?;

            let device = reload(tx, android_id)?;
            record(
                tx,
                &device,
                HistoryAction::Reapproved,
                (false, true),
                action_by,
                now,
                notes.unwrap_or("Device re-approved from disabled devices"),
            )?;

            Ok(device)
        })?;

        info!("Disabled device {} re-approved by {}", android_id, action_by);
        Ok(device.into_active())
    }

    // -- Approval checks --

    /// Whether the device may be used right now. A device found past its
    /// deadline is disabled on the spot and reported as not approved.
    pub fn is_approved(&self, android_id: &str) -> Result<bool> {
        Ok(self
            .check_approval(android_id)?
            .is_some_and(|check| check.approved))
    }

    /// Approval check that also returns the device. `None` means no active
    /// device carries this Android ID.
    pub fn check_approval(&self, android_id: &str) -> Result<Option<ApprovalCheck>> {
        let now = self.clock.now();

        let outcome = self.db.with_tx(|tx| -> Result<Option<(ApprovalCheck, bool)>> {
            let Some(row) = queries::find_device(tx, android_id)?.filter(|d| d.status.is_active())
            else {
                return Ok(None);
            };

            let device = row.clone().into_active();
            if !device.is_approved {
                return Ok(Some((ApprovalCheck { approved: false, device }, false)));
            }

            if device.is_expired_at(now) {
                disable_row(tx, row, SYSTEM_ACTOR, Some(EXPIRED_REASON), now)?;
                return Ok(Some((ApprovalCheck { approved: false, device }, true)));
            }

            Ok(Some((ApprovalCheck { approved: true, device }, false)))
        })?;

        if let Some((_, true)) = &outcome {
            info!("Device {} found past its deadline and disabled", android_id);
        }
        Ok(outcome.map(|(check, _)| check))
    }

    /// Disables every approved device whose deadline has passed. Each device
    /// is handled in its own transaction; one failure does not stop the rest.
    pub fn process_expired_devices(&self) -> Result<Vec<SweepOutcome>> {
        let expired = self.db.get_expired_android_ids(self.clock.now())?;

        let mut outcomes = Vec::with_capacity(expired.len());
        for android_id in expired {
            match self.expire(&android_id) {
                Ok(_) => outcomes.push(SweepOutcome {
                    android_id,
                    status: SweepStatus::Disabled,
                    error: None,
                }),
                Err(e) => {
                    warn!("Failed to disable expired device {}: {}", android_id, e);
                    outcomes.push(SweepOutcome {
                        android_id,
                        status: SweepStatus::Error,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        Ok(outcomes)
    }

    /// Disables one device found by the sweep, provided it is still approved
    /// and past its deadline when the transaction reads it.
    fn expire(&self, android_id: &str) -> Result<DisabledDevice> {
        let now = self.clock.now();

        let disabled = self.db.with_tx(|tx| -> Result<DisabledDevice> {
            let device = find_active(tx, android_id)?;
            let still_expired = device.status == DeviceStatus::Approved
                && device.expires_at.is_some_and(|expires_at| now > expires_at);
            if !still_expired {
                return Err(LifecycleError::NotExpired);
            }
            disable_row(tx, device, SYSTEM_ACTOR, Some(EXPIRED_REASON), now)
        })?;

        info!("Device {} expired and disabled", android_id);
        Ok(disabled)
    }

    // -- Queries --

    /// Active device by Android ID, as stored (no expiry side effects).
    pub fn device(&self, android_id: &str) -> Result<Option<ActiveDevice>> {
        Ok(self
            .db
            .get_device(android_id)?
            .filter(|d| d.status.is_active())
            .map(DeviceRow::into_active))
    }

    pub fn devices(&self) -> Result<Vec<ActiveDevice>> {
        Ok(self
            .db
            .list_active_devices()?
            .into_iter()
            .map(DeviceRow::into_active)
            .collect())
    }

    pub fn disabled_devices(&self) -> Result<Vec<DisabledDevice>> {
        Ok(self
            .db
            .list_removed_devices(RemovalKind::Disabled)?
            .into_iter()
            .map(|(device, removal)| removal.into_disabled(&device))
            .collect())
    }

    pub fn rejected_devices(&self) -> Result<Vec<RejectedDevice>> {
        Ok(self
            .db
            .list_removed_devices(RemovalKind::Rejected)?
            .into_iter()
            .map(|(device, removal)| removal.into_rejected(&device))
            .collect())
    }

    /// Full audit trail of a device, whatever state it is in now.
    pub fn history(&self, android_id: &str) -> Result<Vec<HistoryEntry>> {
        if self.db.get_device(android_id)?.is_none() {
            return Err(LifecycleError::DeviceNotFound);
        }

        Ok(self
            .db
            .get_history(android_id)?
            .into_iter()
            .map(HistoryEntry::from)
            .collect())
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn find_active(conn: &Connection, android_id: &str) -> Result<DeviceRow> {
    queries::find_device(conn, android_id)?
        .filter(|d| d.status.is_active())
        .ok_or(LifecycleError::DeviceNotFound)
}

fn reload(conn: &Connection, android_id: &str) -> Result<DeviceRow> {
    queries::find_device(conn, android_id)?.ok_or_else(|| {
        LifecycleError::Store(anyhow::anyhow!(
            "device {} vanished mid-transaction",
            android_id
        ))
    })
}

/// `from + window`, refusing deadlines chrono cannot represent.
fn deadline(from: DateTime<Utc>, window: Duration) -> Result<DateTime<Utc>> {
    from.checked_add_signed(window).ok_or(LifecycleError::DeadlineOutOfRange)
}

/// Snapshot, audit, then flip the row to disabled. Runs inside the
/// caller's transaction.
fn disable_row(
    conn: &Connection,
    device: DeviceRow,
    action_by: &str,
    notes: Option<&str>,
    now: DateTime<Utc>,
) -> Result<DisabledDevice> {
    let was_approved = device.status == DeviceStatus::Approved;
    let reason = notes.unwrap_or("Device disabled");

    let removal = RemovalRow {
        id: new_id(),
        android_id: device.android_id.clone(),
        kind: RemovalKind::Disabled,
        was_approved,
        approved_at: device.approved_at,
        expires_at: device.expires_at,
        removed_at: now,
        removed_by: action_by.to_string(),
        reason: Some(reason.to_string()),
        original_notes: device.notes.clone(),
    };
    queries::insert_removal(conn, &removal)?;
    record(
        conn,
        &device,
        HistoryAction::Disabled,
        (was_approved, false),
        action_by,
        now,
        reason,
    )?;
    queries::mark_removed(conn, &device.android_id, RemovalKind::Disabled, now)?;

    Ok(removal.into_disabled(&device))
}

/// Appends one audit entry for `device`, keyed to its current row id.
fn record(
    conn: &Connection,
    device: &DeviceRow,
    action: HistoryAction,
    (previous_status, new_status): (bool, bool),
    action_by: &str,
    at: DateTime<Utc>,
    notes: &str,
) -> Result<()> {
    queries::insert_history(
        conn,
        &HistoryRow {
            id: new_id(),
            device_id: device.id.clone(),
            android_id: device.android_id.clone(),
            action,
            previous_status: Some(previous_status),
            new_status: Some(new_status),
            action_by: action_by.to_string(),
            created_at: at,
            notes: Some(notes.to_string()),
        },
    )?;
    Ok(())
}

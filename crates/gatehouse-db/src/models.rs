//! Database row types. These map directly to SQLite rows and stay distinct
//! from the gatehouse-types API models; the `into_*` conversions project
//! them back into the three-table boundary shape.

use chrono::{DateTime, SecondsFormat, Utc};
use gatehouse_types::models::{
    ActiveDevice, DeviceStatus, DisabledDevice, HistoryAction, HistoryEntry, RejectedDevice,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalKind {
    Disabled,
    Rejected,
}

impl RemovalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Rejected => "rejected",
        }
    }

    pub fn status(&self) -> DeviceStatus {
        match self {
            Self::Disabled => DeviceStatus::Disabled,
            Self::Rejected => DeviceStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeviceRow {
    pub id: String,
    pub android_id: String,
    pub email: String,
    pub status: DeviceStatus,
    pub approved_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl DeviceRow {
    /// Boundary view of a pending or approved row.
    pub fn into_active(self) -> ActiveDevice {
        ActiveDevice {
            id: self.id,
            email: self.email,
            android_id: self.android_id,
            is_approved: self.status == DeviceStatus::Approved,
            approved_at: self.approved_at,
            expires_at: self.expires_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            notes: self.notes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RemovalRow {
    pub id: String,
    pub android_id: String,
    pub kind: RemovalKind,
    pub was_approved: bool,
    pub approved_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub removed_at: DateTime<Utc>,
    pub removed_by: String,
    pub reason: Option<String>,
    pub original_notes: Option<String>,
}

impl RemovalRow {
    pub fn into_disabled(self, device: &DeviceRow) -> DisabledDevice {
        DisabledDevice {
            id: self.id,
            email: device.email.clone(),
            android_id: self.android_id,
            original_created_at: device.created_at,
            was_approved: self.was_approved,
            approved_at: self.approved_at,
            expires_at: self.expires_at,
            disabled_at: self.removed_at,
            disabled_by: self.removed_by,
            disable_reason: self.reason,
            original_notes: self.original_notes,
        }
    }

    pub fn into_rejected(self, device: &DeviceRow) -> RejectedDevice {
        RejectedDevice {
            id: self.id,
            email: device.email.clone(),
            android_id: self.android_id,
            original_created_at: device.created_at,
            rejected_at: self.removed_at,
            rejected_by: self.removed_by,
            rejection_reason: self.reason,
            original_notes: self.original_notes,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryRow {
    pub id: String,
    pub device_id: String,
    pub android_id: String,
    pub action: HistoryAction,
    pub previous_status: Option<bool>,
    pub new_status: Option<bool>,
    pub action_by: String,
    pub created_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        HistoryEntry {
            id: row.id,
            device_id: row.device_id,
            android_id: row.android_id,
            action: row.action,
            previous_status: row.previous_status,
            new_status: row.new_status,
            action_by: row.action_by,
            created_at: row.created_at,
            notes: row.notes,
        }
    }
}

/// Fixed-width RFC 3339 so that SQL string comparison is chronological.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_ts(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}

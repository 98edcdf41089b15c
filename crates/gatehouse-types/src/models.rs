use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a device sits in its lifecycle. `Pending` and `Approved` are the
/// active states; `Disabled` and `Rejected` mean the device was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Pending,
    Approved,
    Disabled,
    Rejected,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Disabled => "disabled",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "disabled" => Ok(Self::Disabled),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown device status '{}'", other)),
        }
    }
}

/// Audit log action names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryAction {
    Registered,
    Approved,
    Extended,
    Disabled,
    Rejected,
    Reapproved,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Approved => "approved",
            Self::Extended => "extended",
            Self::Disabled => "disabled",
            Self::Rejected => "rejected",
            Self::Reapproved => "reapproved",
        }
    }
}

impl fmt::Display for HistoryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "registered" => Ok(Self::Registered),
            "approved" => Ok(Self::Approved),
            "extended" => Ok(Self::Extended),
            "disabled" => Ok(Self::Disabled),
            "rejected" => Ok(Self::Rejected),
            "reapproved" => Ok(Self::Reapproved),
            other => Err(format!("unknown history action '{}'", other)),
        }
    }
}

/// A registered device that has not been disabled or rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveDevice {
    pub id: String,
    pub email: String,
    pub android_id: String,
    pub is_approved: bool,
    pub approved_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub notes: Option<String>,
}

impl ActiveDevice {
    /// True once `now` has passed the approval deadline, whatever
    /// `is_approved` still says in storage.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }
}

/// Snapshot of a device taken when it was disabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisabledDevice {
    pub id: String,
    pub email: String,
    pub android_id: String,
    pub original_created_at: DateTime<Utc>,
    pub was_approved: bool,
    pub approved_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub disabled_at: DateTime<Utc>,
    pub disabled_by: String,
    pub disable_reason: Option<String>,
    pub original_notes: Option<String>,
}

/// Snapshot of a pending device taken when its registration was rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedDevice {
    pub id: String,
    pub email: String,
    pub android_id: String,
    pub original_created_at: DateTime<Utc>,
    pub rejected_at: DateTime<Utc>,
    pub rejected_by: String,
    pub rejection_reason: Option<String>,
    pub original_notes: Option<String>,
}

/// One row of the append-only device audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    /// Row id of the active device at the time of the action.
    pub device_id: String,
    pub android_id: String,
    pub action: HistoryAction,
    pub previous_status: Option<bool>,
    pub new_status: Option<bool>,
    pub action_by: String,
    pub created_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepStatus {
    Disabled,
    Error,
}

/// Per-device result of an expiration sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepOutcome {
    pub android_id: String,
    pub status: SweepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn device(expires_at: Option<DateTime<Utc>>) -> ActiveDevice {
        let created = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        ActiveDevice {
            id: "d1".into(),
            email: "a@x.com".into(),
            android_id: "AID1234567890".into(),
            is_approved: expires_at.is_some(),
            approved_at: expires_at.map(|_| created),
            expires_at,
            created_at: created,
            updated_at: created,
            notes: None,
        }
    }

    #[test]
    fn expiry_starts_strictly_after_deadline() {
        let deadline = Utc.with_ymd_and_hms(2026, 1, 4, 0, 0, 0).unwrap();
        let d = device(Some(deadline));

        assert!(!d.is_expired_at(deadline));
        assert!(d.is_expired_at(deadline + chrono::Duration::seconds(1)));
    }

    #[test]
    fn pending_device_never_expires() {
        let d = device(None);
        let far = Utc.with_ymd_and_hms(2099, 1, 1, 0, 0, 0).unwrap();
        assert!(!d.is_expired_at(far));
    }

    #[test]
    fn status_strings_parse_back() {
        for status in [
            DeviceStatus::Pending,
            DeviceStatus::Approved,
            DeviceStatus::Disabled,
            DeviceStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<DeviceStatus>(), Ok(status));
        }
        assert!("expired".parse::<DeviceStatus>().is_err());
    }

    #[test]
    fn device_serializes_camel_case() {
        let json = serde_json::to_value(device(None)).unwrap();
        assert_eq!(json["androidId"], "AID1234567890");
        assert_eq!(json["isApproved"], false);
        assert!(json["expiresAt"].is_null());
    }
}

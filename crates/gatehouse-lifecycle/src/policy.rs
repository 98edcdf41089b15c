use chrono::Duration;

/// Three days, the window the service has always granted.
pub const DEFAULT_WINDOW_SECS: i64 = 3 * 24 * 60 * 60;

/// How long approvals last. Both windows come from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecyclePolicy {
    /// Granted by Approve, counted from the approval instant.
    pub approval_window: Duration,
    /// Granted when a disabled device is brought back.
    pub reapproval_window: Duration,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            approval_window: Duration::seconds(DEFAULT_WINDOW_SECS),
            reapproval_window: Duration::seconds(DEFAULT_WINDOW_SECS),
        }
    }
}

/// Human form of a window for audit notes, e.g. "3 days" or "90 seconds".
pub fn describe_window(window: Duration) -> String {
    let secs = window.num_seconds();
    let (n, unit) = if secs != 0 && secs % 86_400 == 0 {
        (secs / 86_400, "day")
    } else if secs != 0 && secs % 3_600 == 0 {
        (secs / 3_600, "hour")
    } else if secs != 0 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };

    if n == 1 {
        format!("1 {}", unit)
    } else {
        format!("{} {}s", n, unit)
    }
}

use thiserror::Error;

/// Failures of a lifecycle operation. All but `Store` are precondition
/// rejections: nothing was written and retrying will not help.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("device with this Android ID already exists and is active")]
    AlreadyActive,

    #[error("device with this Android ID was previously disabled and cannot be re-registered")]
    PreviouslyDisabled,

    #[error("device with this Android ID was previously rejected and cannot be re-registered")]
    PreviouslyRejected,

    #[error("device not found")]
    DeviceNotFound,

    #[error("disabled device not found")]
    DisabledDeviceNotFound,

    #[error("cannot extend approval for non-approved device")]
    NotApproved,

    #[error("cannot reject an already approved device, disable it instead")]
    CannotRejectApproved,

    #[error("device is no longer expired")]
    NotExpired,

    #[error("approval deadline is out of range")]
    DeadlineOutOfRange,

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Store,
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DeviceNotFound | Self::DisabledDeviceNotFound => ErrorKind::NotFound,
            Self::AlreadyActive
            | Self::PreviouslyDisabled
            | Self::PreviouslyRejected
            | Self::NotApproved
            | Self::CannotRejectApproved
            | Self::NotExpired
            | Self::DeadlineOutOfRange => ErrorKind::Conflict,
            Self::Store(_) => ErrorKind::Store,
        }
    }
}

//! Visit scheduling: the booking form state machine and the phone OTP
//! check it detours through for visitors without a session.

pub mod draft;
pub mod otp;
pub mod visit;

pub use draft::{normalize_phone, normalize_time_slot, BookingDraft};
pub use otp::{OtpCells, OtpFlow, OtpState, OTP_LENGTH};
pub use visit::{SubmitOutcome, VisitBookingFlow, VisitState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Dismissible notification handed to the view layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            message: message.into(),
        }
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::BookingStatus;

/// How the visitor wants to see the property
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VisitMode {
    Physical,
    Virtual,
}

impl std::str::FromStr for VisitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "physical" | "in-person" => Ok(Self::Physical),
            "virtual" | "video" => Ok(Self::Virtual),
            other => Err(format!("unknown visit mode: {other}")),
        }
    }
}

/// Body of `POST /home/visit-booking`, already normalized
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VisitBookingRequest {
    pub date: String,
    pub time_slot: String,
    pub mode: VisitMode,
    pub description: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    pub phone: String,
}

/// Generic `{message}` acknowledgement most write endpoints return
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Acknowledgement {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OtpSendRequest {
    pub phone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OtpVerifyRequest {
    pub phone: String,
    pub otp: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OtpVerifyResponse {
    #[serde(default, alias = "accessToken")]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `POST /bookings` and `PUT /bookings/:id`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomBookingRequest {
    pub property_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub check_in: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_out: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharing_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingStatusPatch {
    pub status: BookingStatus,
}

/// Contact form submission
#[derive(Debug, Clone, Serialize, Validate)]
pub struct ContactMessage {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(equal = 10, message = "Phone number must have 10 digits"))]
    pub phone: Option<String>,
    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,
}

/// Error body shape used to pull a human-readable message out of non-2xx
/// responses
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ServerMessage {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

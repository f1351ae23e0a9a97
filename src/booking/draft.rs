use chrono::{NaiveDate, NaiveTime};

use crate::api::types::{VisitBookingRequest, VisitMode};
use crate::error::ValidationError;

pub const COUNTRY_PREFIX: &str = "+91";

const TIME_FORMATS: [&str; 5] = ["%I:%M %p", "%I:%M%p", "%H:%M", "%H:%M:%S", "%I.%M %p"];

/// Visit-scheduling form as the user fills it in
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingDraft {
    pub date: Option<NaiveDate>,
    pub time_slot: String,
    pub mode: Option<VisitMode>,
    pub description: String,
    pub name: String,
    pub phone: String,
    /// Property the form was opened from; context, not user input
    pub property_id: Option<String>,
}

impl BookingDraft {
    pub fn for_property(property_id: impl Into<String>) -> Self {
        Self {
            property_id: Some(property_id.into()),
            ..Self::default()
        }
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.date.is_none() {
            missing.push("date");
        }
        if self.time_slot.trim().is_empty() {
            missing.push("time");
        }
        if self.mode.is_none() {
            missing.push("visit mode");
        }
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.phone.trim().is_empty() {
            missing.push("phone");
        }
        missing
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing));
        }
        if !is_valid_phone(&self.phone) {
            return Err(ValidationError::InvalidPhone);
        }
        normalize_time_slot(&self.time_slot)?;
        Ok(())
    }

    /// Wire payload with date, time and phone normalized
    pub fn to_request(&self) -> Result<VisitBookingRequest, ValidationError> {
        self.validate()?;
        let (Some(date), Some(mode)) = (self.date, self.mode) else {
            return Err(ValidationError::MissingFields(self.missing_fields()));
        };

        Ok(VisitBookingRequest {
            date: format_date(date),
            time_slot: normalize_time_slot(&self.time_slot)?,
            mode,
            description: self.description.trim().to_string(),
            name: self.name.trim().to_string(),
            property_id: self.property_id.clone(),
            phone: normalize_phone(&self.phone),
        })
    }

    /// Reset every user-entered field; the property context stays
    pub fn clear(&mut self) {
        *self = Self {
            property_id: self.property_id.take(),
            ..Self::default()
        };
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn compact_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
        .collect()
}

/// Ten digits, optionally preceded by the `+91` country prefix
pub fn is_valid_phone(raw: &str) -> bool {
    let compact = compact_phone(raw);
    let local = compact.strip_prefix(COUNTRY_PREFIX).unwrap_or(&compact);
    local.len() == 10 && local.chars().all(|c| c.is_ascii_digit())
}

/// Prefix `+91` unless the number already carries a country code
pub fn normalize_phone(raw: &str) -> String {
    let compact = compact_phone(raw);
    if compact.starts_with('+') {
        compact
    } else {
        format!("{COUNTRY_PREFIX}{compact}")
    }
}

/// Accept 12- or 24-hour input and render it as `h:mm AM/PM`
pub fn normalize_time_slot(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
        .map(|time| time.format("%-I:%M %p").to_string())
        .ok_or_else(|| ValidationError::InvalidTimeSlot(trimmed.to_string()))
}

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::OtpApi;
use crate::booking::draft::{is_valid_phone, normalize_phone};
use crate::error::{ApiError, ApiResult, ValidationError};
use crate::session::SessionStore;

pub const OTP_LENGTH: usize = 6;

/// Six single-digit input cells with a focus cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtpCells {
    digits: [Option<char>; OTP_LENGTH],
    focus: usize,
}

impl OtpCells {
    /// Put a digit into cell `index` and move focus to the next cell.
    /// Anything that is not an ASCII digit is ignored.
    pub fn input(&mut self, index: usize, ch: char) {
        if index >= OTP_LENGTH || !ch.is_ascii_digit() {
            return;
        }
        self.digits[index] = Some(ch);
        self.focus = (index + 1).min(OTP_LENGTH - 1);
    }

    /// Backspace in cell `index`: clears a filled cell, or steps back from an
    /// empty one
    pub fn backspace(&mut self, index: usize) {
        if index >= OTP_LENGTH {
            return;
        }
        if self.digits[index].is_some() {
            self.digits[index] = None;
            self.focus = index;
        } else if index > 0 {
            self.focus = index - 1;
        }
    }

    /// Type each character of `code` at the focused cell. Once every cell
    /// is filled the rest is ignored.
    pub fn enter(&mut self, code: &str) {
        for ch in code.chars() {
            if self.is_complete() {
                break;
            }
            self.input(self.focus, ch);
        }
    }

    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn digit(&self, index: usize) -> Option<char> {
        self.digits.get(index).copied().flatten()
    }

    pub fn code(&self) -> String {
        self.digits.iter().flatten().collect()
    }

    pub fn is_complete(&self) -> bool {
        self.digits.iter().all(Option::is_some)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpState {
    EnterPhone,
    Sending,
    AwaitingCode,
    Verifying,
    Verified,
    InvalidCode,
}

/// Phone ownership check: send a code, collect six digits, verify, and
/// store the resulting session token.
pub struct OtpFlow {
    api: Arc<dyn OtpApi>,
    session: SessionStore,
    phone: String,
    cells: OtpCells,
    state: OtpState,
    error: Option<String>,
    message: Option<String>,
}

impl OtpFlow {
    pub fn new(api: Arc<dyn OtpApi>, session: SessionStore) -> Self {
        Self {
            api,
            session,
            phone: String::new(),
            cells: OtpCells::default(),
            state: OtpState::EnterPhone,
            error: None,
            message: None,
        }
    }

    pub fn state(&self) -> OtpState {
        self.state
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn cells(&self) -> &OtpCells {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut OtpCells {
        &mut self.cells
    }

    /// Last failure, for inline display
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Last server acknowledgement ("OTP sent", ...)
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_verified(&self) -> bool {
        self.state == OtpState::Verified
    }

    fn transition(&mut self, next: OtpState) {
        debug!(from = ?self.state, to = ?next, "OTP state change");
        self.state = next;
    }

    /// Set (or change) the number to verify. Changing it after a code was
    /// sent starts over.
    pub fn set_phone(&mut self, phone: impl Into<String>) {
        self.phone = phone.into();
        self.error = None;
        self.message = None;
        if matches!(self.state, OtpState::AwaitingCode | OtpState::InvalidCode) {
            self.cells.clear();
            self.transition(OtpState::EnterPhone);
        }
    }

    /// Request a code. Also serves as "resend" once a code is outstanding;
    /// typed digits are left alone.
    pub async fn send(&mut self) -> ApiResult<()> {
        match self.state {
            OtpState::EnterPhone | OtpState::AwaitingCode | OtpState::InvalidCode => {}
            OtpState::Sending | OtpState::Verifying => {
                return Err(ApiError::InvalidState("a request is already in flight"))
            }
            OtpState::Verified => return Err(ApiError::InvalidState("phone already verified")),
        }

        if !is_valid_phone(&self.phone) {
            self.error = Some(ValidationError::InvalidPhone.to_string());
            return Err(ValidationError::InvalidPhone.into());
        }

        self.error = None;
        self.message = None;
        self.transition(OtpState::Sending);

        match self.api.send_otp(&normalize_phone(&self.phone)).await {
            Ok(ack) => {
                info!("OTP sent");
                self.message = Some(ack.message.unwrap_or_else(|| "OTP sent".to_string()));
                self.transition(OtpState::AwaitingCode);
                Ok(())
            }
            Err(e) => {
                warn!("OTP send failed: {}", e);
                self.error = Some(e.user_message());
                self.transition(OtpState::EnterPhone);
                Err(e)
            }
        }
    }

    /// Check the six typed digits. A malformed code fails here without a
    /// network call. On success the token is stored in the session and
    /// returned.
    pub async fn verify(&mut self) -> ApiResult<String> {
        match self.state {
            OtpState::AwaitingCode | OtpState::InvalidCode => {}
            OtpState::Verified => return Err(ApiError::InvalidState("phone already verified")),
            OtpState::Sending | OtpState::Verifying => {
                return Err(ApiError::InvalidState("a request is already in flight"))
            }
            OtpState::EnterPhone => return Err(ApiError::InvalidState("no code has been sent")),
        }

        let code = self.cells.code();
        if code.len() != OTP_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
            self.error = Some(ValidationError::InvalidOtp.to_string());
            return Err(ValidationError::InvalidOtp.into());
        }

        self.error = None;
        self.transition(OtpState::Verifying);

        let phone = normalize_phone(&self.phone);
        let outcome = match self.api.verify_otp(&phone, &code).await {
            Ok(response) => match response.token.filter(|t| !t.trim().is_empty()) {
                Some(token) => Ok(token),
                None => Err(ApiError::VerificationFailed(
                    response.message.unwrap_or_else(|| "Invalid OTP".to_string()),
                )),
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(token) => {
                self.session.sign_in(token.clone(), Some(phone)).await;
                self.message = Some("Phone number verified".to_string());
                self.transition(OtpState::Verified);
                Ok(token)
            }
            Err(e) => {
                warn!("OTP verification failed: {}", e);
                self.error = Some(e.user_message());
                self.transition(OtpState::InvalidCode);
                Err(e)
            }
        }
    }

    /// Modal close: typed digits are discarded
    pub fn close(&mut self) {
        self.cells.clear();
        self.error = None;
        self.message = None;
        if self.state != OtpState::Verified {
            self.transition(OtpState::EnterPhone);
        }
    }
}

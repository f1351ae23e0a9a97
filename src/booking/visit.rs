use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::api::{OtpApi, VisitBookingApi, VisitMode};
use crate::booking::draft::{normalize_phone, BookingDraft};
use crate::booking::otp::OtpFlow;
use crate::booking::Notice;
use crate::error::{ApiError, ApiResult, ValidationError};
use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    Idle,
    Validating,
    NeedsVerification,
    Submitting,
    Success,
    Failed,
}

/// How a submit attempt ended
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The booking was accepted and the draft cleared
    Booked,
    /// Rejected locally; nothing was sent
    Invalid(ValidationError),
    /// The phone must be verified first; the OTP sub-flow is open
    VerificationRequired,
    /// The booking call failed; the draft is untouched
    Failed(ApiError),
}

/// Visit-scheduling form. At most one booking request per validated
/// submission, never while verification is pending, and no retries.
pub struct VisitBookingFlow {
    bookings: Arc<dyn VisitBookingApi>,
    otp_api: Arc<dyn OtpApi>,
    session: SessionStore,
    draft: BookingDraft,
    state: VisitState,
    is_phone_verified: bool,
    is_submitting: bool,
    otp: Option<OtpFlow>,
    notice: Option<Notice>,
}

impl VisitBookingFlow {
    pub fn new(
        bookings: Arc<dyn VisitBookingApi>,
        otp_api: Arc<dyn OtpApi>,
        session: SessionStore,
    ) -> Self {
        Self {
            bookings,
            otp_api,
            session,
            draft: BookingDraft::default(),
            state: VisitState::Idle,
            is_phone_verified: false,
            is_submitting: false,
            otp: None,
            notice: None,
        }
    }

    pub fn for_property(mut self, property_id: impl Into<String>) -> Self {
        self.draft.property_id = Some(property_id.into());
        self
    }

    pub fn state(&self) -> VisitState {
        self.state
    }

    pub fn draft(&self) -> &BookingDraft {
        &self.draft
    }

    pub fn is_phone_verified(&self) -> bool {
        self.is_phone_verified
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn otp(&self) -> Option<&OtpFlow> {
        self.otp.as_ref()
    }

    pub fn otp_mut(&mut self) -> Option<&mut OtpFlow> {
        self.otp.as_mut()
    }

    pub fn set_date(&mut self, date: Option<NaiveDate>) {
        self.draft.date = date;
    }

    pub fn set_time_slot(&mut self, time_slot: impl Into<String>) {
        self.draft.time_slot = time_slot.into();
    }

    pub fn set_mode(&mut self, mode: Option<VisitMode>) {
        self.draft.mode = mode;
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.draft.description = description.into();
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.draft.name = name.into();
    }

    /// A different number needs its own verification. A pending OTP
    /// sub-flow follows the new number and starts over.
    pub fn set_phone(&mut self, phone: impl Into<String>) {
        let phone = phone.into();
        if phone != self.draft.phone {
            self.is_phone_verified = false;
            if let Some(otp) = self.otp.as_mut() {
                otp.set_phone(phone.clone());
            }
        }
        self.draft.phone = phone;
    }

    fn transition(&mut self, next: VisitState) {
        debug!(from = ?self.state, to = ?next, "Visit booking state change");
        self.state = next;
    }

    fn needs_verification(&self) -> bool {
        !self.session.is_authenticated() && !self.is_phone_verified
    }

    pub async fn submit(&mut self) -> SubmitOutcome {
        if self.state == VisitState::NeedsVerification {
            return SubmitOutcome::VerificationRequired;
        }

        self.transition(VisitState::Validating);
        if let Err(e) = self.draft.validate() {
            self.notice = Some(Notice::error("Missing information", e.to_string()));
            self.transition(VisitState::Idle);
            return SubmitOutcome::Invalid(e);
        }

        if self.needs_verification() {
            let mut otp = OtpFlow::new(self.otp_api.clone(), self.session.clone());
            otp.set_phone(self.draft.phone.clone());
            self.otp = Some(otp);
            self.transition(VisitState::NeedsVerification);
            info!("Phone verification required before booking");
            return SubmitOutcome::VerificationRequired;
        }

        self.perform_submit().await
    }

    /// Send the code for the pending verification
    pub async fn send_otp(&mut self) -> ApiResult<()> {
        let otp = self
            .otp
            .as_mut()
            .ok_or(ApiError::InvalidState("no verification in progress"))?;
        otp.send().await
    }

    /// Verify the typed code and, on success, carry on with the booking
    /// that was waiting for it
    pub async fn verify_otp(&mut self) -> ApiResult<SubmitOutcome> {
        let otp = self
            .otp
            .as_mut()
            .ok_or(ApiError::InvalidState("no verification in progress"))?;
        if normalize_phone(otp.phone()) != normalize_phone(&self.draft.phone) {
            return Err(ApiError::InvalidState("verification is for a different number"));
        }
        otp.verify().await?;

        self.is_phone_verified = true;
        if let Some(mut otp) = self.otp.take() {
            otp.close();
        }
        Ok(self.perform_submit().await)
    }

    /// Abandon verification; the draft is kept as entered
    pub fn cancel_verification(&mut self) {
        if let Some(mut otp) = self.otp.take() {
            otp.close();
        }
        self.transition(VisitState::Idle);
    }

    async fn perform_submit(&mut self) -> SubmitOutcome {
        let request = match self.draft.to_request() {
            Ok(request) => request,
            Err(e) => {
                self.notice = Some(Notice::error("Missing information", e.to_string()));
                self.transition(VisitState::Idle);
                return SubmitOutcome::Invalid(e);
            }
        };

        self.transition(VisitState::Submitting);
        self.is_submitting = true;
        let result = self.bookings.submit_visit(&request).await;
        self.is_submitting = false;

        let outcome = match result {
            Ok(ack) => {
                self.transition(VisitState::Success);
                info!("Visit booked for {}", request.date);
                self.draft.clear();
                self.notice = Some(Notice::success(
                    "Visit Scheduled",
                    ack.message
                        .unwrap_or_else(|| "Your visit has been scheduled".to_string()),
                ));
                SubmitOutcome::Booked
            }
            Err(e) => {
                self.transition(VisitState::Failed);
                warn!("Visit booking failed: {}", e);
                self.notice = Some(Notice::error("Booking Failed", e.user_message()));
                SubmitOutcome::Failed(e)
            }
        };

        self.transition(VisitState::Idle);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::testing::{FakeOtpApi, FakeVisitApi, GOOD_CODE};
    use crate::booking::{NoticeLevel, OtpState};

    struct Harness {
        flow: VisitBookingFlow,
        visits: Arc<FakeVisitApi>,
        otp: Arc<FakeOtpApi>,
        session: SessionStore,
    }

    fn harness(visits: FakeVisitApi) -> Harness {
        let visits = Arc::new(visits);
        let otp = Arc::new(FakeOtpApi::default());
        let session = SessionStore::in_memory();
        let mut flow = VisitBookingFlow::new(visits.clone(), otp.clone(), session.clone())
            .for_property("prop-42");
        flow.set_date(NaiveDate::from_ymd_opt(2026, 10, 24));
        flow.set_time_slot("11:00");
        flow.set_mode(Some(VisitMode::Physical));
        flow.set_name("Kabir");
        flow.set_phone("9812345678");
        flow.set_description("Need parking");
        Harness {
            flow,
            visits,
            otp,
            session,
        }
    }

    #[tokio::test]
    async fn unverified_submit_opens_otp_without_booking() {
        let mut h = harness(FakeVisitApi::default());

        assert!(matches!(h.flow.submit().await, SubmitOutcome::VerificationRequired));
        assert_eq!(h.flow.state(), VisitState::NeedsVerification);
        assert_eq!(h.flow.otp().map(|o| o.phone()), Some("9812345678"));
        assert_eq!(h.visits.calls(), 0);

        // a second submit while waiting still sends nothing
        assert!(matches!(h.flow.submit().await, SubmitOutcome::VerificationRequired));
        assert_eq!(h.visits.calls(), 0);
    }

    #[tokio::test]
    async fn verification_continues_into_submission() {
        let mut h = harness(FakeVisitApi::default());
        h.flow.submit().await;

        h.flow.send_otp().await.unwrap();
        assert_eq!(h.flow.otp().unwrap().state(), OtpState::AwaitingCode);
        h.flow.otp_mut().unwrap().cells_mut().enter(GOOD_CODE);

        let outcome = h.flow.verify_otp().await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Booked));
        assert!(h.flow.is_phone_verified());
        assert_eq!(h.session.token().as_deref(), Some("session-token"));
        assert_eq!(h.visits.calls(), 1);

        let sent = h.visits.requests.lock().unwrap()[0].clone();
        assert_eq!(sent.date, "2026-10-24");
        assert_eq!(sent.time_slot, "11:00 AM");
        assert_eq!(sent.phone, "+919812345678");
        assert_eq!(sent.property_id.as_deref(), Some("prop-42"));

        assert_eq!(h.flow.state(), VisitState::Idle);
        assert_eq!(h.flow.draft(), &BookingDraft::for_property("prop-42"));
        assert_eq!(h.flow.notice().unwrap().level, NoticeLevel::Success);
        assert!(h.otp.sent_to.lock().unwrap().len() == 1);
    }

    #[tokio::test]
    async fn signed_in_users_skip_verification() {
        let mut h = harness(FakeVisitApi::default());
        h.session.sign_in("existing".into(), None).await;

        assert!(matches!(h.flow.submit().await, SubmitOutcome::Booked));
        assert_eq!(h.visits.calls(), 1);
        assert!(h.otp.sent_to.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn server_failure_keeps_the_draft() {
        let mut h = harness(FakeVisitApi {
            fail_with: Some(ApiError::Server {
                status: 500,
                message: "Internal Server Error".into(),
            }),
            ..FakeVisitApi::default()
        });
        h.session.sign_in("existing".into(), None).await;
        let before = h.flow.draft().clone();

        let outcome = h.flow.submit().await;
        assert!(matches!(outcome, SubmitOutcome::Failed(ApiError::Server { status: 500, .. })));
        assert_eq!(h.flow.draft(), &before);
        assert_eq!(h.flow.state(), VisitState::Idle);
        assert!(!h.flow.is_submitting());

        let notice = h.flow.notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.title, "Booking Failed");
        assert_eq!(notice.message, "Internal Server Error");

        // manual resubmit is a fresh single attempt
        h.flow.submit().await;
        assert_eq!(h.visits.calls(), 2);
    }

    #[tokio::test]
    async fn missing_fields_never_reach_the_network() {
        let mut h = harness(FakeVisitApi::default());
        h.flow.set_name("  ");
        h.flow.set_mode(None);

        match h.flow.submit().await {
            SubmitOutcome::Invalid(ValidationError::MissingFields(fields)) => {
                assert_eq!(fields, vec!["visit mode", "name"]);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(h.flow.state(), VisitState::Idle);
        assert!(h.flow.otp().is_none());
        assert_eq!(h.visits.calls(), 0);
    }

    #[tokio::test]
    async fn cancel_returns_to_idle_with_draft_intact() {
        let mut h = harness(FakeVisitApi::default());
        let before = h.flow.draft().clone();
        h.flow.submit().await;

        h.flow.cancel_verification();
        assert_eq!(h.flow.state(), VisitState::Idle);
        assert!(h.flow.otp().is_none());
        assert_eq!(h.flow.draft(), &before);
        assert_eq!(h.visits.calls(), 0);
    }

    #[tokio::test]
    async fn changing_phone_drops_verification() {
        let mut h = harness(FakeVisitApi::default());
        h.flow.submit().await;
        h.flow.send_otp().await.unwrap();
        h.flow.otp_mut().unwrap().cells_mut().enter(GOOD_CODE);
        h.flow.verify_otp().await.unwrap();
        assert!(h.flow.is_phone_verified());

        h.flow.set_phone("9000000001");
        assert!(!h.flow.is_phone_verified());
    }

    #[tokio::test]
    async fn new_number_during_verification_needs_its_own_code() {
        let mut h = harness(FakeVisitApi::default());
        h.flow.submit().await;
        h.flow.send_otp().await.unwrap();

        h.flow.set_phone("9000000001");
        let otp = h.flow.otp().unwrap();
        assert_eq!(otp.phone(), "9000000001");
        assert_eq!(otp.state(), OtpState::EnterPhone);

        // the code sent to the old number can no longer be used
        h.flow.otp_mut().unwrap().cells_mut().enter(GOOD_CODE);
        assert!(matches!(h.flow.verify_otp().await, Err(ApiError::InvalidState(_))));
        assert_eq!(h.visits.calls(), 0);

        h.flow.send_otp().await.unwrap();
        h.flow.otp_mut().unwrap().cells_mut().enter(GOOD_CODE);
        let outcome = h.flow.verify_otp().await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Booked));

        assert_eq!(
            *h.otp.sent_to.lock().unwrap(),
            vec!["+919812345678".to_string(), "+919000000001".to_string()]
        );
        let sent = h.visits.requests.lock().unwrap()[0].clone();
        assert_eq!(sent.phone, "+919000000001");
    }

    #[tokio::test]
    async fn otp_calls_without_pending_verification_are_rejected() {
        let mut h = harness(FakeVisitApi::default());
        assert!(matches!(h.flow.send_otp().await, Err(ApiError::InvalidState(_))));
        assert!(matches!(h.flow.verify_otp().await, Err(ApiError::InvalidState(_))));
    }
}

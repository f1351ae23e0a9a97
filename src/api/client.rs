use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use validator::Validate;

use crate::api::traits::{
    ContactApi, ContentRepository, ListingRepository, OtpApi, RoomBookingRepository,
    VisitBookingApi,
};
use crate::api::types::{
    Acknowledgement, BookingStatusPatch, ContactMessage, OtpSendRequest, OtpVerifyRequest,
    OtpVerifyResponse, RoomBookingRequest, ServerMessage, VisitBookingRequest,
};
use crate::config::Config;
use crate::error::{ApiError, ApiResult, ValidationError};
use crate::models::{
    normalize_listings, Banner, BookingStatus, City, Faq, Listing, RawListingCollection,
    RoomBooking, Testimonial,
};
use crate::session::SessionStore;

/// Collections arrive either bare or wrapped in `{data: [...]}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListEnvelope<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> ListEnvelope<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) => items,
            Self::Wrapped { data } => data,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ItemEnvelope<T> {
    Bare(T),
    Wrapped {
        #[serde(alias = "booking")]
        data: T,
    },
}

impl<T> ItemEnvelope<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Bare(item) => item,
            Self::Wrapped { data } => data,
        }
    }
}

/// reqwest-backed implementation of every repository trait
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("pg-scout/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session: SessionStore::in_memory(),
        })
    }

    /// Attach the session whose token authenticates booking and contact calls
    pub fn with_session(mut self, session: SessionStore) -> Self {
        self.session = session;
        self
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder, what: &str) -> ApiResult<T> {
        let response = builder.send().await.map_err(|e| {
            warn!("{} request got no response: {}", what, e);
            ApiError::Network(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = server_message(&body).unwrap_or_else(|| {
                format!("{} failed with status {}", what, status.as_u16())
            });
            warn!("{} returned status {}: {}", what, status, message);
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        debug!("{} returned {} bytes", what, body.len());

        let body = if body.trim().is_empty() { "{}" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| {
            warn!("{} returned an unexpected body: {}", what, e);
            ApiError::Decode(e.to_string())
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> ApiResult<T> {
        self.send(self.client.get(self.url(path)), what).await
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str, what: &str) -> ApiResult<Vec<T>> {
        let envelope: ListEnvelope<T> = self.get_json(path, what).await?;
        Ok(envelope.into_vec())
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, what: &str) -> ApiResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        self.send(self.client.post(self.url(path)).json(body), what)
            .await
    }
}

/// Pull `message` (or `error`) out of an error body, if it has one
fn server_message(body: &str) -> Option<String> {
    let parsed: ServerMessage = serde_json::from_str(body).ok()?;
    parsed
        .message
        .or(parsed.error)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
}

fn booking_not_found(id: &str) -> impl FnOnce(ApiError) -> ApiError + '_ {
    move |err| match err {
        ApiError::Server { status: 404, .. } => ApiError::NotFound {
            entity: "Booking",
            id: id.to_string(),
        },
        other => other,
    }
}

#[async_trait]
impl ListingRepository for ApiClient {
    async fn fetch_listings(&self) -> ApiResult<Vec<Listing>> {
        info!("Fetching accommodation catalog");
        let collection: RawListingCollection = self
            .get_json("home/bulk-accommodation", "Accommodation fetch")
            .await?;
        let listings = normalize_listings(collection);
        info!("Fetched {} listings", listings.len());
        Ok(listings)
    }
}

#[async_trait]
impl ContentRepository for ApiClient {
    async fn banners(&self) -> ApiResult<Vec<Banner>> {
        self.get_list("banners", "Banner fetch").await
    }

    async fn faqs(&self) -> ApiResult<Vec<Faq>> {
        self.get_list("faqs", "FAQ fetch").await
    }

    async fn testimonials(&self) -> ApiResult<Vec<Testimonial>> {
        self.get_list("testimonials", "Testimonial fetch").await
    }

    async fn cities(&self) -> ApiResult<Vec<City>> {
        self.get_list("cities", "City fetch").await
    }
}

#[async_trait]
impl VisitBookingApi for ApiClient {
    async fn submit_visit(&self, request: &VisitBookingRequest) -> ApiResult<Acknowledgement> {
        info!(date = %request.date, time = %request.time_slot, "Submitting visit booking");
        self.post_json("home/visit-booking", request, "Visit booking")
            .await
    }
}

#[async_trait]
impl RoomBookingRepository for ApiClient {
    async fn create_booking(&self, request: &RoomBookingRequest) -> ApiResult<RoomBooking> {
        info!(property = %request.property_id, "Creating room booking");
        let builder = self.authorize(self.client.post(self.url("bookings")).json(request));
        let envelope: ItemEnvelope<RoomBooking> = self.send(builder, "Booking create").await?;
        Ok(envelope.into_inner())
    }

    async fn booking(&self, id: &str) -> ApiResult<RoomBooking> {
        let builder = self.authorize(self.client.get(self.url(&format!("bookings/{id}"))));
        let envelope: ItemEnvelope<RoomBooking> = self
            .send(builder, "Booking fetch")
            .await
            .map_err(booking_not_found(id))?;
        Ok(envelope.into_inner())
    }

    async fn replace_booking(
        &self,
        id: &str,
        request: &RoomBookingRequest,
    ) -> ApiResult<RoomBooking> {
        let builder = self.authorize(
            self.client
                .put(self.url(&format!("bookings/{id}")))
                .json(request),
        );
        let envelope: ItemEnvelope<RoomBooking> = self
            .send(builder, "Booking update")
            .await
            .map_err(booking_not_found(id))?;
        Ok(envelope.into_inner())
    }

    async fn update_booking_status(
        &self,
        id: &str,
        status: BookingStatus,
    ) -> ApiResult<RoomBooking> {
        let builder = self.authorize(
            self.client
                .patch(self.url(&format!("bookings/{id}")))
                .json(&BookingStatusPatch { status }),
        );
        let envelope: ItemEnvelope<RoomBooking> = self
            .send(builder, "Booking status update")
            .await
            .map_err(booking_not_found(id))?;
        Ok(envelope.into_inner())
    }

    async fn user_bookings(&self, user_id: &str) -> ApiResult<Vec<RoomBooking>> {
        let builder = self.authorize(
            self.client
                .get(self.url(&format!("users/{user_id}/bookings"))),
        );
        let envelope: ListEnvelope<RoomBooking> = self.send(builder, "User bookings fetch").await?;
        Ok(envelope.into_vec())
    }
}

#[async_trait]
impl OtpApi for ApiClient {
    async fn send_otp(&self, phone: &str) -> ApiResult<Acknowledgement> {
        info!("Requesting OTP");
        self.post_json(
            "otp/send",
            &OtpSendRequest {
                phone: phone.to_string(),
            },
            "OTP send",
        )
        .await
    }

    async fn verify_otp(&self, phone: &str, code: &str) -> ApiResult<OtpVerifyResponse> {
        self.post_json(
            "otp/verify",
            &OtpVerifyRequest {
                phone: phone.to_string(),
                otp: code.to_string(),
            },
            "OTP verify",
        )
        .await
    }
}

#[async_trait]
impl ContactApi for ApiClient {
    async fn send_message(&self, message: &ContactMessage) -> ApiResult<Acknowledgement> {
        message
            .validate()
            .map_err(|e| ApiError::Validation(ValidationError::Form(e.to_string())))?;

        let builder = self.authorize(self.client.post(self.url("contact/message")).json(message));
        self.send(builder, "Contact message").await
    }
}

use async_trait::async_trait;

use crate::api::types::{
    Acknowledgement, ContactMessage, OtpVerifyResponse, RoomBookingRequest, VisitBookingRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::models::{Banner, BookingStatus, City, Faq, Listing, RoomBooking, Testimonial};

/// Source of the listing catalog.
/// Flows depend on this rather than on the HTTP client so tests can hand in fakes.
#[async_trait]
pub trait ListingRepository: Send + Sync {
    /// Fetch the full catalog, already normalized
    async fn fetch_listings(&self) -> ApiResult<Vec<Listing>>;

    /// Detail lookup. The API has no single-listing endpoint, so this
    /// searches the bulk collection.
    async fn fetch_listing(&self, id: &str) -> ApiResult<Listing> {
        self.fetch_listings()
            .await?
            .into_iter()
            .find(|listing| listing.id == id)
            .ok_or_else(|| ApiError::NotFound {
                entity: "Listing",
                id: id.to_string(),
            })
    }
}

/// Marketing content shown around the catalog
#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn banners(&self) -> ApiResult<Vec<Banner>>;
    async fn faqs(&self) -> ApiResult<Vec<Faq>>;
    async fn testimonials(&self) -> ApiResult<Vec<Testimonial>>;
    async fn cities(&self) -> ApiResult<Vec<City>>;
}

#[async_trait]
pub trait VisitBookingApi: Send + Sync {
    async fn submit_visit(&self, request: &VisitBookingRequest) -> ApiResult<Acknowledgement>;
}

#[async_trait]
pub trait RoomBookingRepository: Send + Sync {
    async fn create_booking(&self, request: &RoomBookingRequest) -> ApiResult<RoomBooking>;
    async fn booking(&self, id: &str) -> ApiResult<RoomBooking>;
    async fn replace_booking(&self, id: &str, request: &RoomBookingRequest)
        -> ApiResult<RoomBooking>;
    async fn update_booking_status(&self, id: &str, status: BookingStatus)
        -> ApiResult<RoomBooking>;
    async fn user_bookings(&self, user_id: &str) -> ApiResult<Vec<RoomBooking>>;
}

/// Phone-keyed one-time-password challenge
#[async_trait]
pub trait OtpApi: Send + Sync {
    async fn send_otp(&self, phone: &str) -> ApiResult<Acknowledgement>;
    async fn verify_otp(&self, phone: &str, code: &str) -> ApiResult<OtpVerifyResponse>;
}

#[async_trait]
pub trait ContactApi: Send + Sync {
    async fn send_message(&self, message: &ContactMessage) -> ApiResult<Acknowledgement>;
}

pub mod client;
pub mod traits;
pub mod types;

pub use client::ApiClient;
pub use traits::{
    ContactApi, ContentRepository, ListingRepository, OtpApi, RoomBookingRepository,
    VisitBookingApi,
};
pub use types::{ContactMessage, RoomBookingRequest, VisitBookingRequest, VisitMode};

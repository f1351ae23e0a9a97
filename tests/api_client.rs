//! `ApiClient` against a throwaway local server: response normalization,
//! error mapping, bearer auth, and the visit flow end to end.

use std::sync::{Arc, Mutex};

use axum::extract::Path;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde_json::{json, Value};

use pg_scout::api::{
    ApiClient, ContactApi, ContactMessage, ContentRepository, ListingRepository,
    RoomBookingRepository, RoomBookingRequest, VisitBookingApi, VisitBookingRequest, VisitMode,
};
use pg_scout::booking::{SubmitOutcome, VisitBookingFlow};
use pg_scout::config::Config;
use pg_scout::models::BookingStatus;
use pg_scout::session::SessionStore;
use pg_scout::{ApiError, ValidationError};

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

fn client(base_url: &str) -> ApiClient {
    ApiClient::new(&Config::new(base_url)).expect("client")
}

fn catalog_router() -> Router {
    Router::new().route(
        "/home/bulk-accommodation",
        get(|| async {
            Json(json!({
                "data": [
                    {
                        "_id": "p1",
                        "name": "Sunrise PG",
                        "location": { "address": "Sector 62", "city": "Noida" },
                        "gender": "female",
                        "price": 7200,
                        "amenities": [{ "name": "WiFi", "available": true }, "Laundry"],
                        "rating": { "average": 4.4, "count": 31 }
                    },
                    { "_id": "p2", "title": "Lotus Hostel", "rating": 3.8, "isAvailable": false }
                ]
            }))
        }),
    )
}

#[tokio::test]
async fn listings_are_normalized_after_fetch() {
    let base = spawn(catalog_router()).await;
    let listings = client(&base).fetch_listings().await.expect("fetch");

    assert_eq!(listings.len(), 2);
    assert_eq!(listings[0].title, "Sunrise PG");
    assert_eq!(listings[0].amenities, vec!["WiFi", "Laundry"]);
    assert_eq!(listings[0].rating.map(|r| r.count), Some(31));
    assert_eq!(listings[1].rating.map(|r| r.average), Some(3.8));
    assert!(!listings[1].available);
}

#[tokio::test]
async fn unknown_listing_is_not_found() {
    let base = spawn(catalog_router()).await;
    let err = client(&base).fetch_listing("missing").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound { entity: "Listing", .. }));
}

#[tokio::test]
async fn server_errors_carry_the_body_message() {
    let app = Router::new().route(
        "/home/visit-booking",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "Could not save booking" })),
            )
        }),
    );
    let base = spawn(app).await;

    let request = VisitBookingRequest {
        date: "2026-10-25".into(),
        time_slot: "10:00 AM".into(),
        mode: VisitMode::Physical,
        description: String::new(),
        name: "Tara".into(),
        property_id: None,
        phone: "+919876543210".into(),
    };
    let err = client(&base).submit_visit(&request).await.unwrap_err();
    match err {
        ApiError::Server { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Could not save booking");
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}"))
        .fetch_listings()
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}

#[tokio::test]
async fn booking_calls_send_the_session_token() {
    let app = Router::new()
        .route(
            "/bookings/:id",
            get(|headers: HeaderMap, Path(id): Path<String>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if auth != "Bearer tok-1" {
                    return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Login required" })));
                }
                if id != "b1" {
                    return (StatusCode::NOT_FOUND, Json(json!({ "message": "No booking" })));
                }
                (
                    StatusCode::OK,
                    Json(json!({
                        "booking": {
                            "_id": "b1",
                            "propertyId": "p1",
                            "checkIn": "2026-11-01",
                            "status": "confirmed"
                        }
                    })),
                )
            }),
        )
        .route(
            "/users/:id/bookings",
            get(|| async { Json(json!({ "data": [] })) }),
        );
    let base = spawn(app).await;

    let anonymous = client(&base);
    match anonymous.booking("b1").await.unwrap_err() {
        ApiError::Server { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Login required");
        }
        other => panic!("expected 401, got {other:?}"),
    }

    let session = SessionStore::in_memory();
    session.sign_in("tok-1".into(), None).await;
    let authed = client(&base).with_session(session);

    let booking = authed.booking("b1").await.expect("booking");
    assert_eq!(booking.property_id, "p1");
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.check_in, NaiveDate::from_ymd_opt(2026, 11, 1).unwrap());

    assert!(matches!(
        authed.booking("b2").await,
        Err(ApiError::NotFound { entity: "Booking", .. })
    ));
    assert!(authed.user_bookings("u1").await.expect("list").is_empty());
}

#[tokio::test]
async fn content_lists_accept_bare_and_wrapped_bodies() {
    let app = Router::new()
        .route(
            "/banners",
            get(|| async {
                Json(json!([{ "_id": "b1", "title": "Move in this week", "image": "/b1.png" }]))
            }),
        )
        .route(
            "/faqs",
            get(|| async {
                Json(json!({ "data": [{ "question": "Deposit?", "answer": "One month" }] }))
            }),
        )
        .route(
            "/testimonials",
            get(|| async { Json(json!([{ "name": "Asha", "text": "Clean rooms", "rating": 5 }])) }),
        )
        .route(
            "/cities",
            get(|| async {
                Json(json!({ "data": [{ "name": "Pune", "count": 14 }, { "name": "Noida" }] }))
            }),
        );
    let base = spawn(app).await;
    let api = client(&base);

    let banners = api.banners().await.expect("banners");
    assert_eq!(banners[0].id, "b1");
    assert_eq!(banners[0].image_url, "/b1.png");

    let faqs = api.faqs().await.expect("faqs");
    assert_eq!(faqs.len(), 1);
    assert_eq!(faqs[0].answer, "One month");

    let testimonials = api.testimonials().await.expect("testimonials");
    assert_eq!(testimonials[0].message, "Clean rooms");
    assert_eq!(testimonials[0].rating, Some(5.0));

    let cities = api.cities().await.expect("cities");
    let names: Vec<&str> = cities.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Pune", "Noida"]);
    assert_eq!(cities[0].property_count, Some(14));
    assert_eq!(cities[1].property_count, None);
}

fn stored_booking(id: &str, status: &str) -> Value {
    json!({
        "_id": id,
        "propertyId": "p9",
        "checkIn": "2026-12-01",
        "checkOut": "2026-12-31",
        "sharingType": "double",
        "status": status
    })
}

#[tokio::test]
async fn room_booking_writes_send_the_expected_bodies() {
    let calls = Arc::new(Mutex::new(Vec::<(Method, String, Value)>::new()));
    let seen_post = calls.clone();
    let seen_item = calls.clone();

    let app = Router::new()
        .route(
            "/bookings",
            post(move |Json(body): Json<Value>| {
                let seen = seen_post.clone();
                async move {
                    seen.lock().unwrap().push((Method::POST, "/bookings".into(), body));
                    let created = stored_booking("b7", "pending");
                    (StatusCode::CREATED, Json(json!({ "booking": created })))
                }
            }),
        )
        .route(
            "/bookings/:id",
            put({
                let seen = seen_item.clone();
                move |Path(id): Path<String>, Json(body): Json<Value>| {
                    let seen = seen.clone();
                    async move {
                        seen.lock().unwrap().push((Method::PUT, format!("/bookings/{id}"), body));
                        Json(json!({ "data": stored_booking(&id, "pending") }))
                    }
                }
            })
            .patch(move |Path(id): Path<String>, Json(body): Json<Value>| {
                let seen = seen_item.clone();
                async move {
                    let status = body["status"].as_str().unwrap_or_default().to_string();
                    seen.lock().unwrap().push((Method::PATCH, format!("/bookings/{id}"), body));
                    Json(stored_booking(&id, &status))
                }
            }),
        );
    let base = spawn(app).await;
    let api = client(&base);

    let request = RoomBookingRequest {
        property_id: "p9".into(),
        user_id: None,
        check_in: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
        check_out: NaiveDate::from_ymd_opt(2026, 12, 31),
        sharing_type: Some("double".into()),
    };

    let created = api.create_booking(&request).await.expect("create");
    assert_eq!(created.id, "b7");
    assert_eq!(created.status, BookingStatus::Pending);

    let replaced = api.replace_booking("b7", &request).await.expect("replace");
    assert_eq!(replaced.check_out, NaiveDate::from_ymd_opt(2026, 12, 31));
    assert_eq!(replaced.sharing_type.as_deref(), Some("double"));

    let cancelled = api
        .update_booking_status("b7", BookingStatus::Cancelled)
        .await
        .expect("status");
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let calls = calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 3);

    let (method, path, body) = &calls[0];
    assert_eq!((method, path.as_str()), (&Method::POST, "/bookings"));
    assert_eq!(body["propertyId"], "p9");
    assert_eq!(body["checkIn"], "2026-12-01");
    assert_eq!(body["checkOut"], "2026-12-31");
    assert_eq!(body["sharingType"], "double");
    assert!(body.get("userId").is_none());

    let (method, path, body) = &calls[1];
    assert_eq!((method, path.as_str()), (&Method::PUT, "/bookings/b7"));
    assert_eq!(body["checkIn"], "2026-12-01");

    let (method, path, body) = &calls[2];
    assert_eq!((method, path.as_str()), (&Method::PATCH, "/bookings/b7"));
    assert_eq!(body, &json!({ "status": "cancelled" }));
}

#[tokio::test]
async fn invalid_contact_message_never_leaves_the_process() {
    // nothing listens here; a network attempt would fail with Network
    let err = client("http://127.0.0.1:9")
        .send_message(&ContactMessage {
            name: "Ira".into(),
            email: "nope".into(),
            phone: None,
            message: "Hello".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Validation(ValidationError::Form(_))));
}

#[tokio::test]
async fn visit_flow_over_http_verifies_then_books() {
    let bookings = Arc::new(Mutex::new(Vec::<Value>::new()));
    let seen = bookings.clone();

    let app = Router::new()
        .route(
            "/otp/send",
            post(|| async { Json(json!({ "message": "OTP sent" })) }),
        )
        .route(
            "/otp/verify",
            post(|Json(body): Json<Value>| async move {
                if body["otp"] == "123456" && body["phone"] == "+919876543210" {
                    (StatusCode::OK, Json(json!({ "token": "verified-token" })))
                } else {
                    (StatusCode::BAD_REQUEST, Json(json!({ "message": "Invalid OTP" })))
                }
            }),
        )
        .route(
            "/home/visit-booking",
            post(move |Json(body): Json<Value>| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(body);
                    Json(json!({ "message": "Visit scheduled" }))
                }
            }),
        );
    let base = spawn(app).await;

    let session = SessionStore::in_memory();
    let api = Arc::new(client(&base).with_session(session.clone()));
    let mut flow = VisitBookingFlow::new(api.clone(), api, session.clone()).for_property("p1");
    flow.set_date(NaiveDate::from_ymd_opt(2026, 10, 30));
    flow.set_time_slot("4:00 pm");
    flow.set_mode(Some(VisitMode::Virtual));
    flow.set_name("Neel");
    flow.set_phone("9876543210");

    assert!(matches!(flow.submit().await, SubmitOutcome::VerificationRequired));
    flow.send_otp().await.expect("send");
    assert_eq!(flow.otp().and_then(|o| o.message()), Some("OTP sent"));

    flow.otp_mut().unwrap().cells_mut().enter("654321");
    assert!(flow.verify_otp().await.is_err());
    assert!(bookings.lock().unwrap().is_empty());

    let cells = flow.otp_mut().unwrap().cells_mut();
    cells.clear();
    cells.enter("123456");
    let outcome = flow.verify_otp().await.expect("verify");
    assert!(matches!(outcome, SubmitOutcome::Booked));
    assert_eq!(session.token().as_deref(), Some("verified-token"));

    let sent = bookings.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["date"], "2026-10-30");
    assert_eq!(sent[0]["timeSlot"], "4:00 PM");
    assert_eq!(sent[0]["mode"], "virtual");
    assert_eq!(sent[0]["propertyId"], "p1");
    assert_eq!(sent[0]["phone"], "+919876543210");
}

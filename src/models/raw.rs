//! Raw accommodation payloads and the adapter that collapses them into
//! [`Listing`].
//!
//! The accommodation service is inconsistent about field shapes: amenities
//! arrive as plain strings or `{name, available}` objects, ratings as a bare
//! number or an `{average, count}` object, locations nested or flattened.
//! Everything is accepted here and nothing past [`normalize_listing`] ever
//! sees more than one shape.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{Coordinates, Listing, Location, Rating};

/// Top-level body of `GET /home/bulk-accommodation`. Records stay as plain
/// JSON until [`normalize_listings`] so one odd record cannot sink the rest.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawListingCollection {
    List(Vec<Value>),
    Wrapped(WrappedListings),
}

#[derive(Debug, Clone, Deserialize)]
pub struct WrappedListings {
    #[serde(alias = "accommodations", alias = "properties")]
    pub data: Vec<Value>,
}

impl RawListingCollection {
    pub fn into_records(self) -> Vec<Value> {
        match self {
            Self::List(items) => items,
            Self::Wrapped(wrapped) => wrapped.data,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Number(i64),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Number(_) => None,
            Self::Text(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        }
    }

    fn as_count(&self) -> u32 {
        self.as_f64().map(|n| n.max(0.0) as u32).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawAmenity {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        available: Option<bool>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawFlag {
    Bool(bool),
    Text(String),
}

impl RawFlag {
    fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawRating {
    Score(RawNumber),
    Summary {
        #[serde(alias = "avg", alias = "value")]
        average: Option<RawNumber>,
        #[serde(default)]
        count: Option<RawNumber>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCoordinates {
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "lon", alias = "longitude")]
    pub lng: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawLocation {
    Text(String),
    Detailed(RawLocationDetail),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLocationDetail {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub coordinates: Option<RawCoordinates>,
    #[serde(default, alias = "latitude")]
    pub lat: Option<f64>,
    #[serde(default, alias = "lon", alias = "longitude")]
    pub lng: Option<f64>,
}

/// Accommodation record exactly as the API sends it
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawListing {
    #[serde(default, alias = "_id")]
    pub id: Option<RawId>,
    #[serde(default, alias = "name")]
    pub title: Option<String>,
    #[serde(default)]
    pub location: Option<RawLocation>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default, alias = "type")]
    pub property_type: Option<String>,
    #[serde(default, alias = "genderCategory")]
    pub gender: Option<String>,
    #[serde(default, alias = "sharingTypes")]
    pub sharing_type: Option<OneOrMany>,
    #[serde(default)]
    pub price: Option<RawNumber>,
    #[serde(default)]
    pub bedrooms: Option<RawNumber>,
    #[serde(default)]
    pub bathrooms: Option<RawNumber>,
    #[serde(default)]
    pub amenities: Option<Vec<RawAmenity>>,
    #[serde(default)]
    pub rating: Option<RawRating>,
    #[serde(default, alias = "isAvailable")]
    pub available: Option<RawFlag>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
}

fn clean(value: Option<String>) -> String {
    value.map(|s| s.trim().to_string()).unwrap_or_default()
}

fn normalize_location(raw: &RawListing) -> Location {
    let mut location = match &raw.location {
        Some(RawLocation::Text(address)) => Location {
            address: address.trim().to_string(),
            ..Location::default()
        },
        Some(RawLocation::Detailed(detail)) => {
            let coordinates = match (&detail.coordinates, detail.lat, detail.lng) {
                (Some(c), _, _) => Some(Coordinates { lat: c.lat, lng: c.lng }),
                (None, Some(lat), Some(lng)) => Some(Coordinates { lat, lng }),
                _ => None,
            };
            Location {
                address: clean(detail.address.clone()),
                city: clean(detail.city.clone()),
                coordinates,
            }
        }
        None => Location::default(),
    };

    // Flat fields fill whatever the nested object left empty
    if location.address.is_empty() {
        location.address = clean(raw.address.clone());
    }
    if location.city.is_empty() {
        location.city = clean(raw.city.clone());
    }
    location
}

/// Map one raw record into the canonical shape. Records without an
/// identifier cannot be addressed by detail pages and are dropped.
pub fn normalize_listing(raw: RawListing) -> Option<Listing> {
    let id = match &raw.id {
        Some(RawId::Text(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(RawId::Number(n)) => n.to_string(),
        _ => return None,
    };

    let location = normalize_location(&raw);

    let sharing_types = match raw.sharing_type {
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
        None => Vec::new(),
    }
    .into_iter()
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty())
    .collect();

    let amenities = raw
        .amenities
        .unwrap_or_default()
        .into_iter()
        .filter_map(|amenity| match amenity {
            RawAmenity::Name(name) => Some(name),
            RawAmenity::Detailed { name, available } => {
                if available == Some(false) {
                    None
                } else {
                    Some(name)
                }
            }
        })
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    let rating = match &raw.rating {
        Some(RawRating::Score(score)) => {
            score.as_f64().map(|average| Rating { average, count: 0 })
        }
        Some(RawRating::Summary { average, count }) => average
            .as_ref()
            .and_then(RawNumber::as_f64)
            .map(|average| Rating {
                average,
                count: count.as_ref().map(RawNumber::as_count).unwrap_or(0),
            }),
        None => None,
    };

    Some(Listing {
        id,
        title: clean(raw.title),
        location,
        property_type: clean(raw.property_type),
        gender: clean(raw.gender),
        sharing_types,
        price: raw.price.as_ref().and_then(RawNumber::as_f64),
        bedrooms: raw.bedrooms.as_ref().map(RawNumber::as_count).unwrap_or(0),
        bathrooms: raw.bathrooms.as_ref().map(RawNumber::as_count).unwrap_or(0),
        amenities,
        rating,
        available: raw.available.as_ref().and_then(RawFlag::as_bool).unwrap_or(true),
        images: raw.images.unwrap_or_default(),
    })
}

/// Decode and normalize every record, skipping the ones that cannot be
/// read or have no identifier.
pub fn normalize_listings(collection: RawListingCollection) -> Vec<Listing> {
    let records = collection.into_records();
    let total = records.len();
    let mut malformed = 0;

    let listings: Vec<Listing> = records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<RawListing>(record) {
            Ok(raw) => normalize_listing(raw),
            Err(e) => {
                malformed += 1;
                warn!("Skipping malformed accommodation record: {}", e);
                None
            }
        })
        .collect();

    let without_id = total - listings.len() - malformed;
    if without_id > 0 {
        warn!("Dropped {} accommodation records without an identifier", without_id);
    }
    debug!("Normalized {} of {} listings", listings.len(), total);
    listings
}

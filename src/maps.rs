//! Map surface for listing locations. Tiles and widgets belong to the
//! provider; this only decides whether a map can be shown and which
//! markers go on it.

use serde::Serialize;

use crate::models::{Coordinates, Listing};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapSurface {
    Provider { api_key: String },
    /// No key configured: show an explanation instead of a broken widget
    Placeholder { reason: String },
}

impl MapSurface {
    pub fn from_key(api_key: Option<&str>) -> Self {
        match api_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Self::Provider {
                api_key: key.to_string(),
            },
            None => Self::Placeholder {
                reason: "Map unavailable: no maps API key configured".to_string(),
            },
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Provider { .. })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MapMarker {
    pub listing_id: String,
    pub title: String,
    pub position: Coordinates,
    pub price: Option<f64>,
}

/// One marker per listing that has coordinates
pub fn markers<'a>(listings: impl IntoIterator<Item = &'a Listing>) -> Vec<MapMarker> {
    listings
        .into_iter()
        .filter_map(|listing| {
            listing.location.coordinates.map(|position| MapMarker {
                listing_id: listing.id.clone(),
                title: listing.title.clone(),
                position,
                price: listing.price,
            })
        })
        .collect()
}

/// Mean position of the markers, used to center the map
pub fn center(markers: &[MapMarker]) -> Option<Coordinates> {
    if markers.is_empty() {
        return None;
    }
    let n = markers.len() as f64;
    let (lat, lng) = markers.iter().fold((0.0, 0.0), |(lat, lng), m| {
        (lat + m.position.lat, lng + m.position.lng)
    });
    Some(Coordinates {
        lat: lat / n,
        lng: lng / n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Location;

    fn at(id: &str, coordinates: Option<Coordinates>) -> Listing {
        Listing {
            id: id.into(),
            title: format!("PG {id}"),
            location: Location {
                address: String::new(),
                city: "Noida".into(),
                coordinates,
            },
            property_type: "PG".into(),
            gender: "unisex".into(),
            sharing_types: vec![],
            price: None,
            bedrooms: 0,
            bathrooms: 0,
            amenities: vec![],
            rating: None,
            available: true,
            images: vec![],
        }
    }

    #[test]
    fn missing_key_degrades_to_placeholder() {
        assert!(!MapSurface::from_key(None).is_available());
        assert!(!MapSurface::from_key(Some("  ")).is_available());
        assert!(MapSurface::from_key(Some("abc")).is_available());
    }

    #[test]
    fn markers_skip_listings_without_coordinates() {
        let listings = vec![
            at("1", Some(Coordinates { lat: 28.0, lng: 77.0 })),
            at("2", None),
            at("3", Some(Coordinates { lat: 29.0, lng: 78.0 })),
        ];
        let found = markers(&listings);
        assert_eq!(found.len(), 2);
        assert_eq!(center(&found), Some(Coordinates { lat: 28.5, lng: 77.5 }));
        assert_eq!(center(&[]), None);
    }
}

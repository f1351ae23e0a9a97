use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::models::Listing;

/// Facet value meaning "no constraint"
pub const ALL: &str = "all";

/// A filterable dimension of the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Facet {
    Location,
    PropertyType,
    SharingType,
    Gender,
}

impl Facet {
    pub const EVERY: [Facet; 4] = [
        Facet::Location,
        Facet::PropertyType,
        Facet::SharingType,
        Facet::Gender,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::Location => "location",
            Facet::PropertyType => "propertyType",
            Facet::SharingType => "sharingType",
            Facet::Gender => "gender",
        }
    }

    /// Values this listing carries for the facet. Sharing type is the only
    /// multi-valued one.
    pub fn values_of<'a>(&self, listing: &'a Listing) -> Vec<&'a str> {
        match self {
            Facet::Location => vec![listing.location.city.as_str()],
            Facet::PropertyType => vec![listing.property_type.as_str()],
            Facet::SharingType => listing.sharing_types.iter().map(String::as_str).collect(),
            Facet::Gender => vec![listing.gender.as_str()],
        }
    }

    /// Equality for scalar facets, membership for sharing type
    pub fn matches(&self, listing: &Listing, value: &str) -> bool {
        self.values_of(listing)
            .iter()
            .any(|candidate| candidate.trim().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Facet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "location" | "city" => Ok(Facet::Location),
            "propertytype" | "type" => Ok(Facet::PropertyType),
            "sharingtype" | "sharing" => Ok(Facet::SharingType),
            "gender" => Ok(Facet::Gender),
            other => Err(format!("unknown facet: {other}")),
        }
    }
}

/// Selected facet values. A facet that is absent is unconstrained, and
/// selecting [`ALL`] removes the key so the two are never distinguishable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    selected: BTreeMap<Facet, String>,
}

impl FilterState {
    pub fn set(&mut self, facet: Facet, value: impl Into<String>) {
        let value = value.into();
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case(ALL) {
            self.selected.remove(&facet);
        } else {
            self.selected.insert(facet, value.to_string());
        }
    }

    pub fn get(&self, facet: Facet) -> &str {
        self.selected.get(&facet).map(String::as_str).unwrap_or(ALL)
    }

    pub fn is_active(&self) -> bool {
        !self.selected.is_empty()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn active(&self) -> impl Iterator<Item = (Facet, &str)> {
        self.selected.iter().map(|(facet, value)| (*facet, value.as_str()))
    }

    pub fn matches(&self, listing: &Listing) -> bool {
        self.active().all(|(facet, value)| facet.matches(listing, value))
    }
}

/// Everything that decides membership in the filtered set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    pub query: String,
    pub url_city: String,
    pub url_gender: String,
    pub filters: FilterState,
}

fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

impl Criteria {
    pub fn is_active(&self) -> bool {
        !self.query.trim().is_empty()
            || !self.url_city.trim().is_empty()
            || !self.url_gender.trim().is_empty()
            || self.filters.is_active()
    }

    /// Conjunction of search, URL constraints and facet filters.
    /// City matches by substring and gender by equality.
    pub fn matches(&self, listing: &Listing) -> bool {
        let query = self.query.trim().to_lowercase();
        if !query.is_empty()
            && !contains_ignore_case(&listing.title, &query)
            && !contains_ignore_case(&listing.location.address, &query)
        {
            return false;
        }

        let city = self.url_city.trim().to_lowercase();
        if !city.is_empty() && !contains_ignore_case(&listing.location.city, &city) {
            return false;
        }

        let gender = self.url_gender.trim();
        if !gender.is_empty() && !listing.gender.trim().eq_ignore_ascii_case(gender) {
            return false;
        }

        self.filters.matches(listing)
    }
}

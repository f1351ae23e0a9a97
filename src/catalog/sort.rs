use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::models::Listing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Availability,
    Price,
    Rating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn reversed(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

impl SortKey {
    /// Price starts low-to-high, rating high-to-low
    fn default_order(self) -> SortOrder {
        match self {
            SortKey::Availability | SortKey::Price => SortOrder::Ascending,
            SortKey::Rating => SortOrder::Descending,
        }
    }
}

/// The single active sort mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    key: SortKey,
    order: SortOrder,
}

impl Default for SortState {
    fn default() -> Self {
        Self::new(SortKey::Availability)
    }
}

impl SortState {
    pub fn new(key: SortKey) -> Self {
        Self {
            key,
            order: key.default_order(),
        }
    }

    pub fn key(&self) -> SortKey {
        self.key
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// Switch to `key`, or flip its direction if it is already active.
    /// Availability has no direction.
    pub fn select(&mut self, key: SortKey) {
        if self.key != key {
            *self = Self::new(key);
        } else if key != SortKey::Availability {
            self.order = self.order.reversed();
        }
    }

    pub fn compare(&self, a: &Listing, b: &Listing) -> Ordering {
        match self.key {
            SortKey::Availability => b.available.cmp(&a.available),
            SortKey::Price => {
                let comparison = a.price_or_zero().total_cmp(&b.price_or_zero());
                match self.order {
                    SortOrder::Ascending => comparison,
                    SortOrder::Descending => comparison.reverse(),
                }
            }
            SortKey::Rating => {
                // high-to-low baseline, negated when ascending
                let comparison = b.rating_or_zero().total_cmp(&a.rating_or_zero());
                match self.order {
                    SortOrder::Ascending => comparison.reverse(),
                    SortOrder::Descending => comparison,
                }
            }
        }
    }

    /// Stable: listings with equal keys keep their incoming order
    pub fn apply(&self, listings: &mut [&Listing]) {
        listings.sort_by(|a, b| self.compare(a, b));
    }

    pub fn as_str(&self) -> &'static str {
        match (self.key, self.order) {
            (SortKey::Availability, _) => "availability",
            (SortKey::Price, SortOrder::Ascending) => "price-asc",
            (SortKey::Price, SortOrder::Descending) => "price-desc",
            (SortKey::Rating, SortOrder::Descending) => "rating-desc",
            (SortKey::Rating, SortOrder::Ascending) => "rating-asc",
        }
    }
}

impl fmt::Display for SortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let state = match s.trim().to_ascii_lowercase().as_str() {
            "availability" => SortState::new(SortKey::Availability),
            "price" | "price-asc" => SortState::new(SortKey::Price),
            "price-desc" => SortState {
                key: SortKey::Price,
                order: SortOrder::Descending,
            },
            "rating" | "rating-desc" => SortState::new(SortKey::Rating),
            "rating-asc" => SortState {
                key: SortKey::Rating,
                order: SortOrder::Ascending,
            },
            other => return Err(format!("unknown sort mode: {other}")),
        };
        Ok(state)
    }
}

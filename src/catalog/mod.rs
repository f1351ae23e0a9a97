//! Client-side catalog: one fetched listing set, narrowed by search, URL
//! constraints and facet filters, sorted, and cut into pages of
//! [`PAGE_SIZE`].
//!
//! Derivation is pure. [`CatalogEngine::view`] borrows the engine and never
//! touches the network or the held listings.

pub mod filter;
pub mod sort;

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::api::ListingRepository;
use crate::error::{ApiError, ApiResult};
use crate::models::Listing;

pub use filter::{Criteria, Facet, FilterState, ALL};
pub use sort::{SortKey, SortOrder, SortState};

pub const PAGE_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("page {requested} is outside 1..={last}")]
    PageOutOfRange { requested: usize, last: usize },
}

/// What the view layer should render around the current page
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogStatus {
    /// The fetch failed; offer a retry
    Error(String),
    /// The service returned no listings at all
    Empty,
    /// Listings exist but search/filters removed every one; offer "clear filters"
    NoMatches,
    Results,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogView<'a> {
    pub items: Vec<&'a Listing>,
    pub page: usize,
    pub total_pages: usize,
    pub filtered_count: usize,
    pub status: CatalogStatus,
}

impl CatalogView<'_> {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Distinct facet value with the number of listings carrying it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetOption {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone)]
pub struct CatalogEngine {
    listings: Vec<Listing>,
    load_error: Option<String>,
    criteria: Criteria,
    sort: SortState,
    page: usize,
}

impl CatalogEngine {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            listings,
            load_error: None,
            criteria: Criteria::default(),
            sort: SortState::default(),
            page: 1,
        }
    }

    /// Engine for a catalog whose fetch failed
    pub fn failed(message: impl Into<String>) -> Self {
        let mut engine = Self::new(Vec::new());
        engine.load_error = Some(message.into());
        engine
    }

    /// Fetch once from `repository`; a failure becomes [`CatalogStatus::Error`]
    pub async fn load(repository: &dyn ListingRepository) -> Self {
        match repository.fetch_listings().await {
            Ok(listings) => Self::new(listings),
            Err(e) => {
                warn!("Catalog fetch failed: {}", e);
                Self::failed(e.user_message())
            }
        }
    }

    pub fn replace_listings(&mut self, listings: Vec<Listing>) {
        self.listings = listings;
        self.load_error = None;
        self.page = 1;
    }

    pub fn listings(&self) -> &[Listing] {
        &self.listings
    }

    pub fn criteria(&self) -> &Criteria {
        &self.criteria
    }

    pub fn filters(&self) -> &FilterState {
        &self.criteria.filters
    }

    pub fn sort(&self) -> SortState {
        self.sort
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.criteria.query = query.into();
        self.page = 1;
    }

    /// City/gender constraints carried in from the route
    pub fn set_url_constraints(&mut self, city: impl Into<String>, gender: impl Into<String>) {
        self.criteria.url_city = city.into();
        self.criteria.url_gender = gender.into();
        self.page = 1;
    }

    pub fn set_filter(&mut self, facet: Facet, value: impl Into<String>) {
        self.criteria.filters.set(facet, value);
        self.page = 1;
    }

    /// "Clear all": drop search, facet selections and URL constraints
    pub fn clear_filters(&mut self) {
        self.criteria = Criteria::default();
        self.page = 1;
    }

    pub fn select_sort(&mut self, key: SortKey) {
        self.sort.select(key);
        debug!(sort = %self.sort, "Sort changed");
    }

    pub fn set_sort(&mut self, sort: SortState) {
        self.sort = sort;
    }

    fn filtered(&self) -> Vec<&Listing> {
        let mut matches: Vec<&Listing> = self
            .listings
            .iter()
            .filter(|listing| self.criteria.matches(listing))
            .collect();
        self.sort.apply(&mut matches);
        matches
    }

    pub fn filtered_count(&self) -> usize {
        self.listings
            .iter()
            .filter(|listing| self.criteria.matches(listing))
            .count()
    }

    pub fn total_pages(&self) -> usize {
        self.filtered_count().div_ceil(PAGE_SIZE)
    }

    pub fn set_page(&mut self, page: usize) -> Result<(), CatalogError> {
        let last = self.total_pages().max(1);
        if page == 0 || page > last {
            return Err(CatalogError::PageOutOfRange {
                requested: page,
                last,
            });
        }
        self.page = page;
        Ok(())
    }

    pub fn next_page(&mut self) -> Result<(), CatalogError> {
        self.set_page(self.page + 1)
    }

    pub fn previous_page(&mut self) -> Result<(), CatalogError> {
        self.set_page(self.page.saturating_sub(1))
    }

    pub fn view(&self) -> CatalogView<'_> {
        let filtered = self.filtered();
        let filtered_count = filtered.len();
        let total_pages = filtered_count.div_ceil(PAGE_SIZE);

        let status = if let Some(message) = &self.load_error {
            CatalogStatus::Error(message.clone())
        } else if self.listings.is_empty() {
            CatalogStatus::Empty
        } else if filtered_count == 0 {
            CatalogStatus::NoMatches
        } else {
            CatalogStatus::Results
        };

        let start = (self.page - 1) * PAGE_SIZE;
        let items = filtered.into_iter().skip(start).take(PAGE_SIZE).collect();

        CatalogView {
            items,
            page: self.page,
            total_pages,
            filtered_count,
            status,
        }
    }

    pub fn find(&self, id: &str) -> ApiResult<&Listing> {
        self.listings
            .iter()
            .find(|listing| listing.id == id)
            .ok_or_else(|| ApiError::NotFound {
                entity: "Listing",
                id: id.to_string(),
            })
    }

    /// Choices for a facet dropdown, counted over the whole catalog
    pub fn facet_options(&self, facet: Facet) -> Vec<FacetOption> {
        let mut counts = BTreeMap::<String, usize>::new();
        for listing in &self.listings {
            for value in facet.values_of(listing) {
                let value = value.trim();
                if !value.is_empty() {
                    *counts.entry(value.to_string()).or_default() += 1;
                }
            }
        }
        counts
            .into_iter()
            .map(|(value, count)| FacetOption { value, count })
            .collect()
    }
}

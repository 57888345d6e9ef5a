//! Filter options applied while folding edges into a graph.
//!
//! Options are fixed for the whole aggregation pass. Build them through
//! [`FilterOptionsBuilder`] so a blank country filter is rejected up front.

use crate::{Result, error::GeoflowError};

/// Immutable configuration for one aggregation pass.
///
/// # Examples
/// ```
/// use geoflow_core::FilterOptions;
///
/// let options = FilterOptions::default();
/// assert!(!options.include_unsampled());
/// assert!(options.include_community_transmission());
/// assert!(!options.allow_multiple_sources());
/// assert_eq!(options.country_filter(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOptions {
    include_unsampled: bool,
    include_community_transmission: bool,
    allow_multiple_sources: bool,
    country_filter: Option<String>,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            include_unsampled: false,
            include_community_transmission: true,
            allow_multiple_sources: false,
            country_filter: None,
        }
    }
}

impl FilterOptions {
    /// Starts a builder populated with the default options.
    #[must_use]
    pub fn builder() -> FilterOptionsBuilder {
        FilterOptionsBuilder::new()
    }

    /// Whether edges touching unsampled nodes are kept.
    #[must_use]
    pub fn include_unsampled(&self) -> bool {
        self.include_unsampled
    }

    /// Whether same-country links are kept.
    #[must_use]
    pub fn include_community_transmission(&self) -> bool {
        self.include_community_transmission
    }

    /// Whether a source node backed by several records is accepted.
    #[must_use]
    pub fn allow_multiple_sources(&self) -> bool {
        self.allow_multiple_sources
    }

    /// Country restricting cross-lineage aggregation, if any.
    #[must_use]
    pub fn country_filter(&self) -> Option<&str> {
        self.country_filter.as_deref()
    }
}

/// Configures and validates [`FilterOptions`].
///
/// # Examples
/// ```
/// use geoflow_core::FilterOptions;
///
/// let options = FilterOptions::builder()
///     .with_include_unsampled(true)
///     .with_community_transmission(false)
///     .with_country_filter("Mexico")
///     .build()
///     .expect("options are valid");
/// assert!(options.include_unsampled());
/// assert!(!options.include_community_transmission());
/// assert_eq!(options.country_filter(), Some("Mexico"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FilterOptionsBuilder {
    options: FilterOptions,
}

impl FilterOptionsBuilder {
    /// Creates a builder populated with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps or drops edges touching unsampled nodes.
    #[must_use]
    pub fn with_include_unsampled(mut self, include: bool) -> Self {
        self.options.include_unsampled = include;
        self
    }

    /// Keeps or drops links whose source and target share a country.
    #[must_use]
    pub fn with_community_transmission(mut self, include: bool) -> Self {
        self.options.include_community_transmission = include;
        self
    }

    /// Accepts or rejects source nodes backed by more than one record.
    #[must_use]
    pub fn with_multiple_sources(mut self, allow: bool) -> Self {
        self.options.allow_multiple_sources = allow;
        self
    }

    /// Restricts cross-lineage aggregation to links touching `country`.
    #[must_use]
    pub fn with_country_filter(mut self, country: impl Into<String>) -> Self {
        self.options.country_filter = Some(country.into());
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns [`GeoflowError::EmptyCountryFilter`] when the country filter
    /// is blank.
    ///
    /// # Examples
    /// ```
    /// use geoflow_core::{FilterOptions, GeoflowError};
    ///
    /// let err = FilterOptions::builder()
    ///     .with_country_filter("  ")
    ///     .build()
    ///     .expect_err("blank filter is rejected");
    /// assert_eq!(err, GeoflowError::EmptyCountryFilter);
    /// ```
    pub fn build(self) -> Result<FilterOptions> {
        if self
            .options
            .country_filter
            .as_deref()
            .is_some_and(|country| country.trim().is_empty())
        {
            return Err(GeoflowError::EmptyCountryFilter);
        }
        Ok(self.options)
    }
}

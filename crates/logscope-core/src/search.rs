//! Search layer: [`LogSearch`], the per-request query builder.
//!
//! A `LogSearch` is created for one search, configured through any sequence of
//! the `filter_by_*` / `aggregate_by_*` / option calls, then sent with
//! [`LogSearch::execute`]. Each call only adds to the request (or, for the
//! scope group, extends the one group that exists), so call order does not
//! change what the cluster matches.
//!
//! ```no_run
//! # use logscope_core::{LogSearch, SearchSettings};
//! # fn demo() -> logscope_core::Result<()> {
//! let settings = SearchSettings::new("production", "api-logs", chrono_tz::UTC);
//! let mut search = LogSearch::new(settings, "2024-01-01", "2024-01-31")?;
//! search
//!     .search("status:500")
//!     .filter_by_date_range()
//!     .aggregate_by_interval("day")
//!     .aggregate_by_region("US-CA")
//!     .aggregate_by_users(10);
//! # Ok(())
//! # }
//! ```

use crate::aggregation::{AggregationSpec, DateHistogram, ExtendedBounds, MetricKind, TermsAggregation, TermsOptions};
use crate::client::{RawResponse, SearchClient};
use crate::config::SearchSettings;
use crate::error::{Result, TransportError};
use crate::inflect::pluralize;
use crate::region::RegionSelector;
use crate::request::{FilterClause, QueryOptions, RequestDocument, SearchMode, SortSpec, REQUEST_AT_FIELD};
use crate::time_window::{TimeInput, TimeWindow};
use chrono::DateTime;
use chrono_tz::Tz;
use serde_json::Value;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Field and aggregation names
// ---------------------------------------------------------------------------

pub const API_KEY_FIELD: &str = "api_key";
pub const REQUEST_IP_FIELD: &str = "request_ip";
pub const REQUEST_PATH_FIELD: &str = "request_path";
pub const RESPONSE_TIME_FIELD: &str = "response_time";
pub const USER_EMAIL_FIELD: &str = "user_email";
pub const USER_ID_FIELD: &str = "user_id";

pub const HITS_OVER_TIME: &str = "hits_over_time";
pub const REGIONS: &str = "regions";
pub const MISSING_REGIONS: &str = "missing_regions";
pub const USER_STATS: &str = "user_stats";
pub const LAST_REQUEST_AT: &str = "last_request_at";
pub const RESPONSE_TIME_AVERAGE: &str = "response_time_average";

const REGION_BUCKET_SIZE: u32 = 500;
/// Per-shard over-fetch for top-N terms.
const SHARD_SIZE_FACTOR: u32 = 4;
const CARDINALITY_PRECISION_THRESHOLD: u32 = 100;

// ---------------------------------------------------------------------------
// LogSearch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LogSearch {
    settings: SearchSettings,
    window: TimeWindow,
    request: RequestDocument,
    options: QueryOptions,
    interval: Option<String>,
    region: Option<RegionSelector>,
    country: Option<String>,
    state: Option<String>,
    indexes: OnceLock<Vec<String>>,
}

impl LogSearch {
    /// Resolve `start`/`end` in the configured zone and start an empty
    /// match-all request sorted newest first.
    pub fn new(settings: SearchSettings, start: impl Into<TimeInput>, end: impl Into<TimeInput>) -> Result<Self> {
        let window = TimeWindow::new(start, end, settings.time_zone)?;
        Ok(Self::with_window(settings, window))
    }

    /// Start from an already-resolved window.
    ///
    /// The window's zone wins: it already decided how the inputs were read,
    /// so `settings.time_zone` is replaced with it and every later zone use
    /// (histogram alignment, [`time_zone`](Self::time_zone), [`settings`](Self::settings))
    /// agrees.
    pub fn with_window(mut settings: SearchSettings, window: TimeWindow) -> Self {
        if settings.time_zone != window.time_zone() {
            tracing::warn!(
                settings = %settings.time_zone,
                window = %window.time_zone(),
                "log search: settings zone differs from window zone, using window zone"
            );
            settings.time_zone = window.time_zone();
        }
        tracing::debug!(
            start = %window.start(),
            end = %window.end(),
            environment = %settings.environment,
            "log search: created"
        );
        Self {
            settings,
            window,
            request: RequestDocument::default(),
            options: QueryOptions::default(),
            interval: None,
            region: None,
            country: None,
            state: None,
            indexes: OnceLock::new(),
        }
    }

    // -- context for result interpretation ----------------------------------

    pub fn start(&self) -> DateTime<Tz> {
        self.window.start()
    }

    pub fn end(&self) -> DateTime<Tz> {
        self.window.end()
    }

    pub fn time_zone(&self) -> Tz {
        self.window.time_zone()
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Histogram interval, once [`aggregate_by_interval`](Self::aggregate_by_interval) ran.
    pub fn interval(&self) -> Option<&str> {
        self.interval.as_deref()
    }

    pub fn region(&self) -> Option<&RegionSelector> {
        self.region.as_ref()
    }

    /// Country the drill-down narrowed to. `None` for `world` or before any
    /// drill-down.
    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    /// US state the drill-down narrowed to.
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn request(&self) -> &RequestDocument {
        &self.request
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Monthly partitions the window touches, oldest first. Computed once.
    pub fn indexes(&self) -> &[String] {
        self.indexes.get_or_init(|| {
            self.window
                .partitions(&self.settings.index_prefix, &self.settings.environment)
        })
    }

    pub fn index_pattern(&self) -> String {
        self.indexes().join(",")
    }

    // -- query and options --------------------------------------------------

    /// Replace match-all with a query-string query. Blank input keeps
    /// match-all.
    pub fn search(&mut self, query: &str) -> &mut Self {
        if query.trim().is_empty() {
            tracing::debug!("log search: blank query, keeping match_all");
        } else {
            tracing::debug!(query, "log search: free-text query");
            self.request.text_query = Some(query.to_string());
        }
        self
    }

    /// OR the given permission fragments into the request's single scope
    /// group. Every call extends the same group; the group as a whole is ANDed
    /// with all other filters.
    ///
    /// An empty call still creates the group, and an empty `should` matches
    /// every document on the cluster: callers with no granted scopes must not
    /// execute the search at all.
    pub fn permission_scope(&mut self, scopes: impl IntoIterator<Item = Value>) -> &mut Self {
        let before = self.request.scope_group().map_or(0, <[Value]>::len);
        self.request.extend_scope_group(scopes);
        let after = self.request.scope_group().map_or(0, <[Value]>::len);
        tracing::debug!(added = after - before, total = after, "log search: permission scope");
        self
    }

    pub fn search_type(&mut self, mode: SearchMode) -> &mut Self {
        self.options.search_type = Some(mode);
        self
    }

    pub fn offset(&mut self, from: u32) -> &mut Self {
        self.options.from = Some(from);
        self
    }

    pub fn limit(&mut self, size: u32) -> &mut Self {
        self.options.size = size;
        self
    }

    /// Replace the sort list (default: `request_at` descending).
    pub fn sort(&mut self, sort: Vec<SortSpec>) -> &mut Self {
        self.request.sort = sort;
        self
    }

    // -- filters ------------------------------------------------------------

    /// Restrict hits to the resolved window.
    pub fn filter_by_date_range(&mut self) -> &mut Self {
        self.push_filter(FilterClause::Range {
            field: REQUEST_AT_FIELD.to_string(),
            from: self.window.start_iso8601(),
            to: self.window.end_iso8601(),
        })
    }

    pub fn filter_by_term(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.push_filter(FilterClause::term(field, value))
    }

    /// Match any of `values`. An empty list adds nothing.
    pub fn filter_by_terms<V: Into<Value>>(&mut self, field: &str, values: impl IntoIterator<Item = V>) -> &mut Self {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            tracing::debug!(field, "log search: empty terms filter skipped");
            return self;
        }
        self.push_filter(FilterClause::Terms {
            field: field.to_string(),
            values,
        })
    }

    pub fn filter_by_request_path(&mut self, request_path: &str) -> &mut Self {
        self.filter_by_term(REQUEST_PATH_FIELD, request_path)
    }

    pub fn filter_by_api_key(&mut self, api_key: &str) -> &mut Self {
        self.filter_by_term(API_KEY_FIELD, api_key)
    }

    pub fn filter_by_user(&mut self, user_email: &str) -> &mut Self {
        self.filter_by_term(USER_EMAIL_FIELD, user_email)
    }

    pub fn filter_by_user_ids<V: Into<Value>>(&mut self, user_ids: impl IntoIterator<Item = V>) -> &mut Self {
        self.filter_by_terms(USER_ID_FIELD, user_ids)
    }

    fn push_filter(&mut self, clause: FilterClause) -> &mut Self {
        tracing::debug!(?clause, "log search: filter added");
        self.request.filters.push(clause);
        self
    }

    // -- aggregations -------------------------------------------------------

    /// `hits_over_time`: zone-aligned buckets across the whole window, empty
    /// buckets included.
    pub fn aggregate_by_interval(&mut self, interval: &str) -> &mut Self {
        self.interval = Some(interval.to_string());
        self.insert_aggregation(
            HITS_OVER_TIME,
            AggregationSpec::DateHistogram(DateHistogram {
                field: REQUEST_AT_FIELD.to_string(),
                interval: interval.to_string(),
                time_zone: self.window.time_zone().name().to_string(),
                min_doc_count: 0,
                extended_bounds: Some(ExtendedBounds {
                    min: self.window.start_iso8601(),
                    max: self.window.end_iso8601(),
                }),
                pre_zone_adjust_large_interval: true,
            }),
        )
    }

    /// Geographic drill-down. See [`crate::region`] for the selector table.
    pub fn aggregate_by_region(&mut self, selector: &str) -> &mut Self {
        self.aggregate_by_region_selector(RegionSelector::parse(selector))
    }

    pub fn aggregate_by_region_selector(&mut self, selector: RegionSelector) -> &mut Self {
        let plan = selector.plan();
        tracing::debug!(%selector, field = plan.field, "log search: region drill-down");

        for clause in plan.filters {
            self.push_filter(clause);
        }
        self.country = plan.country;
        self.state = plan.state;
        self.region = Some(selector);

        self.insert_aggregation(REGIONS, AggregationSpec::terms(plan.field, REGION_BUCKET_SIZE))
            .insert_aggregation(MISSING_REGIONS, AggregationSpec::missing(plan.field))
    }

    /// `top_<fields>`, `value_count_<fields>` and `missing_<fields>` for one
    /// field.
    pub fn aggregate_by_term(&mut self, field: &str, size: u32) -> &mut Self {
        let plural = pluralize(field);
        let top = AggregationSpec::Terms(TermsAggregation {
            field: field.to_string(),
            size,
            shard_size: Some(size.saturating_mul(SHARD_SIZE_FACTOR)),
        });

        self.insert_aggregation(&format!("top_{plural}"), top)
            .insert_aggregation(&format!("value_count_{plural}"), AggregationSpec::value_count(field))
            .insert_aggregation(&format!("missing_{plural}"), AggregationSpec::missing(field))
    }

    /// `unique_<fields>` distinct-count estimate.
    pub fn aggregate_by_cardinality(&mut self, field: &str) -> &mut Self {
        self.insert_aggregation(
            &format!("unique_{}", pluralize(field)),
            AggregationSpec::Cardinality {
                field: field.to_string(),
                precision_threshold: CARDINALITY_PRECISION_THRESHOLD,
            },
        )
    }

    pub fn aggregate_by_users(&mut self, size: u32) -> &mut Self {
        self.aggregate_by_term(USER_EMAIL_FIELD, size)
            .aggregate_by_cardinality(USER_EMAIL_FIELD)
    }

    pub fn aggregate_by_request_ip(&mut self, size: u32) -> &mut Self {
        self.aggregate_by_term(REQUEST_IP_FIELD, size)
            .aggregate_by_cardinality(REQUEST_IP_FIELD)
    }

    /// `user_stats`: every user id (unless `options` bounds it) with its most
    /// recent request time.
    pub fn aggregate_by_user_stats(&mut self, options: TermsOptions) -> &mut Self {
        let mut terms = TermsAggregation {
            field: USER_ID_FIELD.to_string(),
            size: 0,
            shard_size: None,
        };
        options.apply_to(&mut terms);

        self.insert_aggregation(
            USER_STATS,
            AggregationSpec::nested(
                AggregationSpec::Terms(terms),
                [(
                    LAST_REQUEST_AT.to_string(),
                    AggregationSpec::metric(MetricKind::Max, REQUEST_AT_FIELD),
                )]
                .into(),
            ),
        )
    }

    pub fn aggregate_by_response_time_average(&mut self) -> &mut Self {
        self.insert_aggregation(
            RESPONSE_TIME_AVERAGE,
            AggregationSpec::metric(MetricKind::Avg, RESPONSE_TIME_FIELD),
        )
    }

    fn insert_aggregation(&mut self, name: &str, spec: AggregationSpec) -> &mut Self {
        tracing::debug!(name, field = spec.field(), "log search: aggregation installed");
        self.request.aggregations.insert(name.to_string(), spec);
        self
    }

    // -- execution ----------------------------------------------------------

    /// Send the accumulated request. Transport errors come back untouched;
    /// calling this again resends the same request.
    pub async fn execute(&self, client: &dyn SearchClient) -> Result<RawResponse, TransportError> {
        let index = self.index_pattern();
        tracing::info!(
            index = %index,
            filters = self.request.filters().len(),
            aggregations = self.request.aggregations.len(),
            "log search: executing"
        );
        let response = client.execute(&index, &self.request, &self.options).await;
        if let Err(err) = &response {
            tracing::warn!(index = %index, error = %err, "log search: transport failed");
        }
        response
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn search() -> LogSearch {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let window = TimeWindow::resolve("2024-01-01", "2024-01-31", chrono_tz::UTC, now).unwrap();
        LogSearch::with_window(SearchSettings::new("test", "api-logs", chrono_tz::UTC), window)
    }

    #[test]
    fn new_search_is_empty_match_all() {
        let search = search();
        assert_eq!(search.request(), &RequestDocument::default());
        assert_eq!(search.options(), &QueryOptions::default());
        assert_eq!(search.country(), None);
        assert_eq!(search.interval(), None);
    }

    #[test]
    fn date_range_filter_uses_window_bounds() {
        let mut search = search();
        search.filter_by_date_range();
        assert_eq!(
            search.request().filters(),
            vec![FilterClause::Range {
                field: "request_at".to_string(),
                from: "2024-01-01T00:00:00Z".to_string(),
                to: "2024-01-31T23:59:59Z".to_string(),
            }]
        );
    }

    #[test]
    fn empty_terms_filter_is_a_no_op() {
        let mut search = search();
        search.filter_by_terms("user_id", Vec::<String>::new());
        search.filter_by_user_ids(Vec::<&str>::new());
        assert!(search.request().filters().is_empty());
    }

    #[test]
    fn user_ids_filter_renders_terms() {
        let mut search = search();
        search.filter_by_user_ids(["u1", "u2"]);
        assert_eq!(
            search.request().filters(),
            vec![FilterClause::Terms {
                field: "user_id".to_string(),
                values: vec![json!("u1"), json!("u2")],
            }]
        );
    }

    #[test]
    fn options_setters() {
        let mut search = search();
        search.limit(50).offset(100).search_type(SearchMode::Count);
        assert_eq!(search.options().size, 50);
        assert_eq!(search.options().from, Some(100));
        assert_eq!(search.options().search_type, Some(SearchMode::Count));
        assert!(search.options().ignore_unavailable);
        assert!(search.options().allow_no_indices);
    }

    #[test]
    fn user_stats_size_is_overridable() {
        let mut search = search();
        search.aggregate_by_user_stats(TermsOptions::default().size(100));
        let wire = serde_json::to_value(&search.request().aggregations[USER_STATS]).unwrap();
        assert_eq!(wire["terms"], json!({ "field": "user_id", "size": 100 }));
    }

    #[test]
    fn window_zone_overrides_settings_zone() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let tokyo = chrono_tz::Asia::Tokyo;
        let window = TimeWindow::resolve("2024-01-01", "2024-01-31", tokyo, now).unwrap();
        let search = LogSearch::with_window(SearchSettings::new("test", "api-logs", chrono_tz::UTC), window);
        assert_eq!(search.settings().time_zone, tokyo);
        assert_eq!(search.time_zone(), tokyo);
    }

    #[test]
    fn histogram_records_interval() {
        let mut search = search();
        search.aggregate_by_interval("week");
        assert_eq!(search.interval(), Some("week"));
        assert!(search.request().aggregations.contains_key(HITS_OVER_TIME));
    }
}

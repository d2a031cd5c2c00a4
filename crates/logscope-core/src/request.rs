//! The search request document and its wire format.
//!
//! [`RequestDocument`] is the typed form the builder mutates. It serializes to
//! the filtered-query body the log cluster expects:
//!
//! ```json
//! {
//!   "query": {
//!     "filtered": {
//!       "query": { "match_all": {} },
//!       "filter": { "bool": { "must": [ ... ] } }
//!     }
//!   },
//!   "sort": [ { "request_at": "desc" } ],
//!   "aggregations": { ... }
//! }
//! ```
//!
//! Deserializing the same body gives back an identical document, which is how
//! the tests check the model covers everything the wire format carries.

use crate::aggregation::AggregationSpec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Timestamp field every log document carries.
pub const REQUEST_AT_FIELD: &str = "request_at";

// ---------------------------------------------------------------------------
// RequestDocument
// ---------------------------------------------------------------------------

/// Accumulated search body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireRequest", try_from = "WireRequest")]
pub struct RequestDocument {
    /// Free-text query. `None` means match everything.
    pub text_query: Option<String>,
    /// Conjunction of filters, in insertion order. Holds at most one
    /// [`FilterClause::ScopeGroup`]; only the crate appends to it.
    pub(crate) filters: Vec<FilterClause>,
    pub sort: Vec<SortSpec>,
    pub aggregations: BTreeMap<String, AggregationSpec>,
}

impl Default for RequestDocument {
    fn default() -> Self {
        Self {
            text_query: None,
            filters: Vec::new(),
            sort: vec![SortSpec::desc(REQUEST_AT_FIELD)],
            aggregations: BTreeMap::new(),
        }
    }
}

impl RequestDocument {
    /// The `must` conjunction, in insertion order.
    pub fn filters(&self) -> &[FilterClause] {
        &self.filters
    }

    /// The single scope group, if one has been created.
    pub fn scope_group(&self) -> Option<&[Value]> {
        self.filters.iter().find_map(|clause| match clause {
            FilterClause::ScopeGroup(fragments) => Some(fragments.as_slice()),
            _ => None,
        })
    }

    /// Append scope fragments to the scope group, creating it on first use.
    pub(crate) fn extend_scope_group(&mut self, fragments: impl IntoIterator<Item = Value>) {
        let existing = self.filters.iter_mut().find_map(|clause| match clause {
            FilterClause::ScopeGroup(group) => Some(group),
            _ => None,
        });
        match existing {
            Some(group) => group.extend(fragments),
            None => self
                .filters
                .push(FilterClause::ScopeGroup(fragments.into_iter().collect())),
        }
    }

    /// Render to the wire format.
    pub fn to_json(&self) -> Value {
        // Every field serializes to plain JSON; there is no failure path.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// FilterClause
// ---------------------------------------------------------------------------

/// One entry of the `must` conjunction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireFilter", try_from = "WireFilter")]
pub enum FilterClause {
    Term { field: String, value: Value },
    Terms { field: String, values: Vec<Value> },
    Range { field: String, from: String, to: String },
    /// Disjunction of opaque permission fragments.
    ScopeGroup(Vec<Value>),
}

impl FilterClause {
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterClause::Term {
            field: field.into(),
            value: value.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// `{ "<field>": "asc" | "desc" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    into = "BTreeMap<String, SortOrder>",
    try_from = "BTreeMap<String, SortOrder>"
)]
pub struct SortSpec {
    pub field: String,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }
}

impl From<SortSpec> for BTreeMap<String, SortOrder> {
    fn from(spec: SortSpec) -> Self {
        BTreeMap::from([(spec.field, spec.order)])
    }
}

impl TryFrom<BTreeMap<String, SortOrder>> for SortSpec {
    type Error = String;

    fn try_from(map: BTreeMap<String, SortOrder>) -> Result<Self, Self::Error> {
        let (field, order) = single_entry(map, "sort")?;
        Ok(SortSpec { field, order })
    }
}

// ---------------------------------------------------------------------------
// Query options
// ---------------------------------------------------------------------------

/// Cluster-side execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    QueryThenFetch,
    DfsQueryThenFetch,
    Count,
    Scan,
}

/// Options sent beside the body. Aggregation-only searches are the common
/// case, so no raw hits are returned unless [`size`](Self::size) is raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    pub size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_type: Option<SearchMode>,
    pub ignore_unavailable: bool,
    pub allow_no_indices: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            size: 0,
            from: None,
            search_type: None,
            ignore_unavailable: true,
            allow_no_indices: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire representation
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct WireRequest {
    query: WireQuery,
    #[serde(default)]
    sort: Vec<SortSpec>,
    #[serde(default)]
    aggregations: BTreeMap<String, AggregationSpec>,
}

#[derive(Serialize, Deserialize)]
struct WireQuery {
    filtered: WireFiltered,
}

#[derive(Serialize, Deserialize)]
struct WireFiltered {
    query: WireTextQuery,
    filter: WireBoolFilter,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum WireTextQuery {
    MatchAll(Empty),
    QueryString { query: String },
}

#[derive(Serialize, Deserialize)]
struct Empty {}

#[derive(Serialize, Deserialize)]
struct WireBoolFilter {
    bool: WireMust,
}

#[derive(Serialize, Deserialize)]
struct WireMust {
    #[serde(default)]
    must: Vec<FilterClause>,
}

impl From<RequestDocument> for WireRequest {
    fn from(doc: RequestDocument) -> Self {
        let query = match doc.text_query {
            Some(query) => WireTextQuery::QueryString { query },
            None => WireTextQuery::MatchAll(Empty {}),
        };
        WireRequest {
            query: WireQuery {
                filtered: WireFiltered {
                    query,
                    filter: WireBoolFilter {
                        bool: WireMust { must: doc.filters },
                    },
                },
            },
            sort: doc.sort,
            aggregations: doc.aggregations,
        }
    }
}

impl TryFrom<WireRequest> for RequestDocument {
    type Error = String;

    fn try_from(wire: WireRequest) -> Result<Self, Self::Error> {
        let filtered = wire.query.filtered;
        let text_query = match filtered.query {
            WireTextQuery::MatchAll(_) => None,
            WireTextQuery::QueryString { query } => Some(query),
        };
        let filters = filtered.filter.bool.must;
        let groups = filters
            .iter()
            .filter(|clause| matches!(clause, FilterClause::ScopeGroup(_)))
            .count();
        if groups > 1 {
            return Err(format!("expected at most one scope group, found {groups}"));
        }
        Ok(RequestDocument {
            text_query,
            filters,
            sort: wire.sort,
            aggregations: wire.aggregations,
        })
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum WireFilter {
    Term(BTreeMap<String, Value>),
    Terms(BTreeMap<String, Vec<Value>>),
    Range(BTreeMap<String, WireRange>),
    Bool(WireShould),
}

#[derive(Clone, Serialize, Deserialize)]
struct WireRange {
    from: String,
    to: String,
}

#[derive(Clone, Serialize, Deserialize)]
struct WireShould {
    should: Vec<Value>,
}

impl From<FilterClause> for WireFilter {
    fn from(clause: FilterClause) -> Self {
        match clause {
            FilterClause::Term { field, value } => WireFilter::Term(BTreeMap::from([(field, value)])),
            FilterClause::Terms { field, values } => {
                WireFilter::Terms(BTreeMap::from([(field, values)]))
            }
            FilterClause::Range { field, from, to } => {
                WireFilter::Range(BTreeMap::from([(field, WireRange { from, to })]))
            }
            FilterClause::ScopeGroup(should) => WireFilter::Bool(WireShould { should }),
        }
    }
}

impl TryFrom<WireFilter> for FilterClause {
    type Error = String;

    fn try_from(wire: WireFilter) -> Result<Self, Self::Error> {
        Ok(match wire {
            WireFilter::Term(map) => {
                let (field, value) = single_entry(map, "term")?;
                FilterClause::Term { field, value }
            }
            WireFilter::Terms(map) => {
                let (field, values) = single_entry(map, "terms")?;
                FilterClause::Terms { field, values }
            }
            WireFilter::Range(map) => {
                let (field, WireRange { from, to }) = single_entry(map, "range")?;
                FilterClause::Range { field, from, to }
            }
            WireFilter::Bool(WireShould { should }) => FilterClause::ScopeGroup(should),
        })
    }
}

/// Unwrap a `{ "<field>": ... }` object that must hold exactly one entry.
pub(crate) fn single_entry<V>(map: BTreeMap<String, V>, kind: &str) -> Result<(String, V), String> {
    let len = map.len();
    let mut entries = map.into_iter();
    match (entries.next(), len) {
        (Some(entry), 1) => Ok(entry),
        _ => Err(format!("`{kind}` expects exactly one field, found {len}")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

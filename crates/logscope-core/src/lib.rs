//! logscope-core: log search request construction.
//!
//! Turns high-level search intents (time range, free text, permission
//! scopes, geographic drill-down, term aggregations) into one request document
//! for a date-partitioned log cluster, and hands it to a [`SearchClient`].
//!
//! # Architecture
//!
//! ```text
//! TimeWindow ──► filters ──► region drill-down ──┐
//!                                                ├──► LogSearch::execute ──► SearchClient
//!                  aggregations ─────────────────┘
//! ```
//!
//! The transport is not part of this crate; callers bring their own
//! [`SearchClient`] and interpret the [`RawResponse`] themselves, using the
//! context [`LogSearch`] exposes (window, interval, resolved country/state).

pub mod aggregation;
pub mod client;
pub mod config;
pub mod error;
pub mod inflect;
pub mod region;
pub mod request;
pub mod search;
pub mod time_window;

pub use aggregation::{AggregationSpec, MetricKind, TermsOptions};
pub use client::{RawResponse, SearchClient};
pub use config::{Config, SearchSettings};
pub use error::{Error, Result, TransportError};
pub use region::RegionSelector;
pub use request::{FilterClause, QueryOptions, RequestDocument, SearchMode, SortOrder, SortSpec};
pub use search::LogSearch;
pub use time_window::{TimeInput, TimeWindow};

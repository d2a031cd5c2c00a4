//! Aggregation specifications.
//!
//! Each [`AggregationSpec`] renders to one named entry of the request's
//! `aggregations` object. Sub-aggregations hang off a [`AggregationSpec::Nested`]
//! wrapper and render as an `aggregations` key beside the outer body:
//!
//! ```json
//! "user_stats": {
//!   "terms": { "field": "user_id", "size": 0 },
//!   "aggregations": { "last_request_at": { "max": { "field": "request_at" } } }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireAggregation", from = "WireAggregation")]
pub enum AggregationSpec {
    DateHistogram(DateHistogram),
    Terms(TermsAggregation),
    Cardinality { field: String, precision_threshold: u32 },
    Missing { field: String },
    ValueCount { field: String },
    Metric { kind: MetricKind, field: String },
    /// An outer aggregation with sub-aggregations. The wire form has no marker
    /// for an empty sub-aggregation map, so a `Nested` with none renders as
    /// its bare outer aggregation and parses back as that. Build through
    /// [`AggregationSpec::nested`] to get the collapsed form up front.
    Nested {
        outer: Box<AggregationSpec>,
        aggregations: BTreeMap<String, AggregationSpec>,
    },
}

impl AggregationSpec {
    pub fn terms(field: impl Into<String>, size: u32) -> Self {
        AggregationSpec::Terms(TermsAggregation {
            field: field.into(),
            size,
            shard_size: None,
        })
    }

    pub fn missing(field: impl Into<String>) -> Self {
        AggregationSpec::Missing {
            field: field.into(),
        }
    }

    pub fn value_count(field: impl Into<String>) -> Self {
        AggregationSpec::ValueCount {
            field: field.into(),
        }
    }

    /// Wrap `outer` with sub-aggregations. An empty map yields `outer` itself.
    pub fn nested(outer: AggregationSpec, aggregations: BTreeMap<String, AggregationSpec>) -> Self {
        if aggregations.is_empty() {
            return outer;
        }
        AggregationSpec::Nested {
            outer: Box::new(outer),
            aggregations,
        }
    }

    pub fn metric(kind: MetricKind, field: impl Into<String>) -> Self {
        AggregationSpec::Metric {
            kind,
            field: field.into(),
        }
    }

    /// Field the outermost aggregation reads.
    pub fn field(&self) -> &str {
        match self {
            AggregationSpec::DateHistogram(histogram) => &histogram.field,
            AggregationSpec::Terms(terms) => &terms.field,
            AggregationSpec::Cardinality { field, .. }
            | AggregationSpec::Missing { field }
            | AggregationSpec::ValueCount { field }
            | AggregationSpec::Metric { field, .. } => field,
            AggregationSpec::Nested { outer, .. } => outer.field(),
        }
    }
}

/// Time-bucketed hit counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateHistogram {
    pub field: String,
    pub interval: String,
    /// IANA zone name buckets are aligned to.
    pub time_zone: String,
    pub min_doc_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_bounds: Option<ExtendedBounds>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub pre_zone_adjust_large_interval: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedBounds {
    pub min: String,
    pub max: String,
}

/// Top-N terms. A `size` of 0 asks the cluster for every term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsAggregation {
    pub field: String,
    pub size: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard_size: Option<u32>,
}

/// Caller overrides for a terms aggregation the builder installs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermsOptions {
    pub size: Option<u32>,
    pub shard_size: Option<u32>,
}

impl TermsOptions {
    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn shard_size(mut self, shard_size: u32) -> Self {
        self.shard_size = Some(shard_size);
        self
    }

    pub(crate) fn apply_to(&self, terms: &mut TermsAggregation) {
        if let Some(size) = self.size {
            terms.size = size;
        }
        if let Some(shard_size) = self.shard_size {
            terms.shard_size = Some(shard_size);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Avg,
    Max,
}

fn is_false(value: &bool) -> bool {
    !*value
}

// ---------------------------------------------------------------------------
// Wire representation
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct WireAggregation {
    #[serde(flatten)]
    body: WireBody,
    #[serde(default, alias = "aggs", skip_serializing_if = "BTreeMap::is_empty")]
    aggregations: BTreeMap<String, AggregationSpec>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum WireBody {
    DateHistogram(DateHistogram),
    Terms(TermsAggregation),
    Cardinality(WireCardinality),
    Missing(WireField),
    ValueCount(WireField),
    Avg(WireField),
    Max(WireField),
}

#[derive(Serialize, Deserialize)]
struct WireField {
    field: String,
}

#[derive(Serialize, Deserialize)]
struct WireCardinality {
    field: String,
    precision_threshold: u32,
}

impl From<AggregationSpec> for WireAggregation {
    fn from(spec: AggregationSpec) -> Self {
        let body = match spec {
            AggregationSpec::Nested {
                outer,
                aggregations,
            } => {
                let mut wire = WireAggregation::from(*outer);
                wire.aggregations.extend(aggregations);
                return wire;
            }
            AggregationSpec::DateHistogram(histogram) => WireBody::DateHistogram(histogram),
            AggregationSpec::Terms(terms) => WireBody::Terms(terms),
            AggregationSpec::Cardinality {
                field,
                precision_threshold,
            } => WireBody::Cardinality(WireCardinality {
                field,
                precision_threshold,
            }),
            AggregationSpec::Missing { field } => WireBody::Missing(WireField { field }),
            AggregationSpec::ValueCount { field } => WireBody::ValueCount(WireField { field }),
            AggregationSpec::Metric {
                kind: MetricKind::Avg,
                field,
            } => WireBody::Avg(WireField { field }),
            AggregationSpec::Metric {
                kind: MetricKind::Max,
                field,
            } => WireBody::Max(WireField { field }),
        };
        WireAggregation {
            body,
            aggregations: BTreeMap::new(),
        }
    }
}

impl From<WireAggregation> for AggregationSpec {
    fn from(wire: WireAggregation) -> Self {
        let outer = match wire.body {
            WireBody::DateHistogram(histogram) => AggregationSpec::DateHistogram(histogram),
            WireBody::Terms(terms) => AggregationSpec::Terms(terms),
            WireBody::Cardinality(WireCardinality {
                field,
                precision_threshold,
            }) => AggregationSpec::Cardinality {
                field,
                precision_threshold,
            },
            WireBody::Missing(WireField { field }) => AggregationSpec::Missing { field },
            WireBody::ValueCount(WireField { field }) => AggregationSpec::ValueCount { field },
            WireBody::Avg(WireField { field }) => AggregationSpec::metric(MetricKind::Avg, field),
            WireBody::Max(WireField { field }) => AggregationSpec::metric(MetricKind::Max, field),
        };

        AggregationSpec::nested(outer, wire.aggregations)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn nested_renders_sub_aggregations_beside_body() {
        let spec = AggregationSpec::Nested {
            outer: Box::new(AggregationSpec::terms("user_id", 0)),
            aggregations: BTreeMap::from([(
                "last_request_at".to_string(),
                AggregationSpec::metric(MetricKind::Max, "request_at"),
            )]),
        };

        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({
                "terms": { "field": "user_id", "size": 0 },
                "aggregations": { "last_request_at": { "max": { "field": "request_at" } } }
            })
        );
        assert_eq!(spec.field(), "user_id");
    }

    #[test]
    fn histogram_omits_unset_flags() {
        let spec = AggregationSpec::DateHistogram(DateHistogram {
            field: "request_at".to_string(),
            interval: "day".to_string(),
            time_zone: "UTC".to_string(),
            min_doc_count: 0,
            extended_bounds: None,
            pre_zone_adjust_large_interval: false,
        });

        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            json!({
                "date_histogram": {
                    "field": "request_at",
                    "interval": "day",
                    "time_zone": "UTC",
                    "min_doc_count": 0
                }
            })
        );
    }

    #[test]
    fn parses_aggs_alias() {
        let spec: AggregationSpec = serde_json::from_value(json!({
            "terms": { "field": "request_ip", "size": 5, "shard_size": 20 },
            "aggs": { "avg_time": { "avg": { "field": "response_time" } } }
        }))
        .unwrap();

        match spec {
            AggregationSpec::Nested { outer, aggregations } => {
                assert_eq!(
                    *outer,
                    AggregationSpec::Terms(TermsAggregation {
                        field: "request_ip".to_string(),
                        size: 5,
                        shard_size: Some(20),
                    })
                );
                assert_eq!(
                    aggregations["avg_time"],
                    AggregationSpec::metric(MetricKind::Avg, "response_time")
                );
            }
            other => panic!("expected nested aggregation, got {other:?}"),
        }
    }

    #[test]
    fn nested_without_sub_aggregations_collapses() {
        let outer = AggregationSpec::terms("user_id", 0);
        assert_eq!(AggregationSpec::nested(outer.clone(), BTreeMap::new()), outer);

        // A hand-built empty `Nested` still renders and parses as its outer.
        let raw = AggregationSpec::Nested {
            outer: Box::new(outer.clone()),
            aggregations: BTreeMap::new(),
        };
        let parsed: AggregationSpec = serde_json::from_value(serde_json::to_value(&raw).unwrap()).unwrap();
        assert_eq!(parsed, outer);
    }

    #[test]
    fn unknown_aggregation_kind_is_rejected() {
        let result = serde_json::from_value::<AggregationSpec>(json!({ "geohash_grid": { "field": "loc" } }));
        assert!(result.is_err());
    }

    #[test]
    fn terms_options_override() {
        let mut terms = TermsAggregation {
            field: "user_id".to_string(),
            size: 0,
            shard_size: None,
        };
        TermsOptions::default().size(25).apply_to(&mut terms);
        assert_eq!(terms.size, 25);
        assert_eq!(terms.shard_size, None);
    }
}

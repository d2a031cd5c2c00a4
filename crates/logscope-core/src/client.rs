//! Seam to the search cluster.
//!
//! The transport itself lives outside this crate. Anything that can run a
//! search body against an index pattern implements [`SearchClient`].

use crate::error::TransportError;
use crate::request::{QueryOptions, RequestDocument};
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Run `body` against the comma-separated `index` pattern.
    async fn execute(
        &self,
        index: &str,
        body: &RequestDocument,
        options: &QueryOptions,
    ) -> Result<RawResponse, TransportError>;
}

/// Uninterpreted cluster response.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse(pub Value);

impl RawResponse {
    pub fn into_inner(self) -> Value {
        self.0
    }

    /// `aggregations.<name>`, if the cluster returned it.
    pub fn aggregation(&self, name: &str) -> Option<&Value> {
        self.0.get("aggregations")?.get(name)
    }

    /// Handles both `hits.total: N` and `hits.total: { "value": N }`.
    pub fn total_hits(&self) -> Option<u64> {
        let total = self.0.get("hits")?.get("total")?;
        total
            .as_u64()
            .or_else(|| total.get("value").and_then(Value::as_u64))
    }
}

impl From<Value> for RawResponse {
    fn from(value: Value) -> Self {
        RawResponse(value)
    }
}

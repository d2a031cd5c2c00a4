//! In-memory [`SearchClient`] that records every call.
//!
//! Script a response (or a failure) up front, run the search, then inspect
//! [`RecordingClient::calls`] to see exactly what the builder sent.
//!
//! ```rust,ignore
//! let client = RecordingClient::responding(json!({ "hits": { "total": 3 } }));
//! let response = search.execute(&client).await?;
//! assert_eq!(client.calls()[0].index, "api-logs-test-2024-01");
//! ```

use async_trait::async_trait;
use logscope_core::{QueryOptions, RawResponse, RequestDocument, SearchClient, TransportError};
use std::sync::Mutex;

/// One recorded `execute` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub index: String,
    pub body: RequestDocument,
    pub options: QueryOptions,
}

enum Script {
    Respond(serde_json::Value),
    FailWithStatus { status: u16, body: String },
    Timeout,
}

pub struct RecordingClient {
    script: Script,
    calls: Mutex<Vec<RecordedCall>>,
}

impl RecordingClient {
    pub fn responding(response: serde_json::Value) -> Self {
        Self::with_script(Script::Respond(response))
    }

    pub fn failing_with_status(status: u16, body: &str) -> Self {
        Self::with_script(Script::FailWithStatus {
            status,
            body: body.to_string(),
        })
    }

    pub fn timing_out() -> Self {
        Self::with_script(Script::Timeout)
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchClient for RecordingClient {
    async fn execute(
        &self,
        index: &str,
        body: &RequestDocument,
        options: &QueryOptions,
    ) -> Result<RawResponse, TransportError> {
        self.calls.lock().unwrap().push(RecordedCall {
            index: index.to_string(),
            body: body.clone(),
            options: options.clone(),
        });

        match &self.script {
            Script::Respond(response) => Ok(RawResponse(response.clone())),
            Script::FailWithStatus { status, body } => Err(TransportError::Status {
                status: *status,
                body: body.clone(),
            }),
            Script::Timeout => Err(TransportError::Timeout),
        }
    }
}

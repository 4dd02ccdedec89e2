use serde::{Deserialize, Serialize};

/// One accepted chat query, as handed to the document store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryLogEntry {
    pub requester: String,
    pub query_text: String,
}

impl QueryLogEntry {
    pub fn new(requester: impl Into<String>, query_text: impl Into<String>) -> Self {
        Self { requester: requester.into(), query_text: query_text.into() }
    }
}

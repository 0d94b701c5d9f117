//! Shape orchestrator outcomes into the `/articles` response.

use crate::models::{AggregateResult, SourceOutcome, WebsiteResult};

/// Map each outcome to a [`WebsiteResult`], preserving order.
pub fn build(outcomes: Vec<SourceOutcome>) -> AggregateResult {
    let results = outcomes
        .into_iter()
        .map(|outcome| WebsiteResult {
            website: outcome.id,
            // A failed source never reports partial articles.
            articles: if outcome.error.is_some() { Vec::new() } else { outcome.value },
            error: outcome.error,
        })
        .collect();
    AggregateResult { results }
}

//! Knowledge retrieval service boundary

use async_trait::async_trait;

use crate::retrieval::{RetrievalQuery, RetrievalResult};
use crate::Result;

/// External scheme-knowledge service
///
/// Implementations:
/// - `InMemorySchemeIndex` - keyword index over a YAML scheme corpus
/// - `HttpKnowledgeService` - remote search service over HTTP
///
/// Failures are reported as `Error::RetrievalUnavailable`; timeouts are
/// applied by the caller.
#[async_trait]
pub trait KnowledgeService: Send + Sync + 'static {
    /// Semantic/document search over the scheme corpus
    async fn search(&self, query: &RetrievalQuery) -> Result<RetrievalResult>;

    /// Freshness-oriented lookup, used only when escalation policy allows
    async fn fresh_search(&self, query: &RetrievalQuery) -> Result<RetrievalResult>;

    /// Service name for logging
    fn name(&self) -> &str;
}

use std::path::PathBuf;

use tracing::{info, warn};

use crate::fetch::strategy::{self, FetchRequest, FetchStrategy};
use crate::pdf;
use crate::session::PageSession;
use crate::snapshot;

/// Resilient retrieval of the document text behind a fact-sheet URL.
///
/// Strategies run strictly sequentially, each attempted exactly once,
/// stopping at the first accepted result. Every failure mode -- non-2xx
/// status, transport error, malformed document, total exhaustion -- is
/// absorbed and logged; the caller always gets a string back, possibly
/// empty. Whether an empty result fails the workflow is decided by the
/// downstream content check, not here.
pub struct DocumentFetcher {
    strategies: Vec<Box<dyn FetchStrategy>>,
    downloads_dir: PathBuf,
}

impl DocumentFetcher {
    pub fn new(downloads_dir: impl Into<PathBuf>) -> Self {
        Self {
            strategies: strategy::default_chain(),
            downloads_dir: downloads_dir.into(),
        }
    }

    pub async fn fetch_document_text(&self, session: &dyn PageSession) -> String {
        let request = FetchRequest {
            url: session.document_url(),
            headers: &strategy::BASELINE_HEADERS,
            session,
        };
        info!(target: "fetch", url = %request.url, "starting fact-sheet retrieval");

        for strategy in &self.strategies {
            info!(target: "fetch", strategy = strategy.name(), "attempting retrieval");
            match strategy.attempt(&request).await {
                Ok(outcome) => {
                    if let Some(bytes) = outcome.accepted_bytes() {
                        info!(
                            target: "fetch",
                            strategy = strategy.name(),
                            status = outcome.status,
                            size = bytes.len(),
                            "retrieval succeeded"
                        );
                        return self.extract(strategy.name(), bytes);
                    }
                    warn!(
                        target: "fetch",
                        strategy = strategy.name(),
                        status = outcome.status,
                        "strategy failed"
                    );
                }
                Err(e) => {
                    warn!(
                        target: "fetch",
                        strategy = strategy.name(),
                        error = %e,
                        "strategy threw"
                    );
                }
            }
        }

        warn!(target: "fetch", url = %request.url, "all retrieval strategies failed; returning empty text");
        String::new()
    }

    fn extract(&self, strategy: &str, bytes: &[u8]) -> String {
        match snapshot::save_snapshot(&self.downloads_dir, bytes) {
            Ok(path) => info!(target: "fetch", path = %path.display(), "saved local document copy"),
            Err(e) => warn!(target: "fetch", error = %e, "failed to save local document copy"),
        }

        match pdf::extract_text(bytes) {
            Ok(doc) => {
                info!(
                    target: "fetch",
                    strategy,
                    pages = doc.page_count,
                    chars = doc.text.len(),
                    "extracted document text"
                );
                doc.text
            }
            Err(e) => {
                warn!(
                    target: "fetch",
                    strategy,
                    error = %e,
                    "malformed document; returning empty text"
                );
                String::new()
            }
        }
    }

    #[cfg(test)]
    fn with_chain(
        strategies: Vec<Box<dyn FetchStrategy>>,
        downloads_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            strategies,
            downloads_dir: downloads_dir.into(),
        }
    }
}

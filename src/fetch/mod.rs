//! Resilient retrieval of fact-sheet documents: an ordered chain of
//! fetch strategies feeding the PDF text extractor.

pub mod pipeline;
pub mod strategy;

pub use pipeline::DocumentFetcher;

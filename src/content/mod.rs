//! Single-shot HTTP content retrieval.
//!
//! [`ContentFetcher`] performs one GET per call: feed documents and linked
//! article bodies both come through here. There is deliberately no retry at
//! this layer — retry policy belongs to the publish transport only, and a
//! failed article fetch is handled by the extractor substituting empty
//! content.

mod fetch;

pub use fetch::{ContentFetcher, FetchError};

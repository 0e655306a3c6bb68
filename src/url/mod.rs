//! URL handling module for Locus
//!
//! This module provides URL canonicalization, public-suffix-aware domain extraction,
//! and the host/pattern/file-type filter that decides which links belong to a crawl.

mod domain;
mod filter;
mod normalize;

// Re-export main functions
pub use domain::{registrable_domain, registrable_domain_str};
pub use filter::{is_document_url, HostFilter};
pub use normalize::{canonicalize, canonicalize_seed};

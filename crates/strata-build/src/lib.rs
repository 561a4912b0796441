//! Static output generation for strata sites.

mod builder;

pub use builder::{BuildConfig, BuildError, INDEX_OUTPUT_NAME, StaticSiteBuilder};

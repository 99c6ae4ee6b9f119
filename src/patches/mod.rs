//! Concrete patches.

pub mod trending_searches;

pub use trending_searches::HideTrendingSearchesPatch;

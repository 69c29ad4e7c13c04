//! Remote data access: HTTP retrieval, caching and payload shape checks.

pub mod cache;
pub mod fetch;
pub mod schema;

pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use fetch::{Fetcher, HttpTransport, Transport};
pub use schema::validate;

// Domain models: raw probe samples, aggregation windows, report documents.

mod sample;
mod summary;
mod window;

pub use sample::Sample;
pub use summary::Summary;
pub use window::{DEFAULT_PERIOD_SECS, Window};

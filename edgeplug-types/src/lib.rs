pub mod constants;
pub mod kinds;
pub mod metadata;
pub mod metric;
pub mod payload;
mod proto;
pub mod topic;
pub mod utils;
mod value;

pub use metadata::MetaData;
pub use metric::{Metric, MetricError};
pub use value::{DateTime, FromBytesError, FromValueError, MetricValue};

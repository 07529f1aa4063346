//! # DefiChart Pipeline
//!
//! Transforms heterogeneous time-series responses into dense, gap-filled,
//! axis-ready chart datasets.
//!
//! Stages, in the order [`ChartPipeline`] applies them:
//! input normalisation, optional daily alignment, denomination conversion,
//! gap filling, aggregation with an "Others" bucket, group-by reduction,
//! row post-processing and dataset building with stable colors.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod aggregator;
pub mod bucketing;
pub mod cache;
pub mod categorical;
pub mod colors;
pub mod dataset;
pub mod denomination;
pub mod gap_fill;
pub mod group_by;
pub mod input;
pub mod percent;
pub mod pipeline;
pub mod request;
pub mod transform;
pub mod types;

pub use aggregator::{AggregateOptions, SeriesAggregator};
pub use bucketing::{
    bucket_key, first_day_of_month, first_day_of_quarter, last_day_of_week, nearest_utc_day,
    trim_open_period, SeriesClassification,
};
pub use cache::{CacheKey, CacheMetrics, ChartCache};
pub use categorical::{top_slices, Slice};
pub use colors::assign_colors;
pub use dataset::DatasetBuilder;
pub use denomination::{convert, Conversion, PriceHistory};
pub use gap_fill::fill_gaps;
pub use group_by::GroupByReducer;
pub use input::{ChartInput, DateValue, DatedValue, EntitySeries, LongForm, MemberItem};
pub use percent::expand_to_100_percent;
pub use pipeline::{ChartPipeline, ChartRequest};
pub use request::{LatestResult, Ticket};
pub use transform::{derive_inflows, null_leading_zeros, sample_alternate};
pub use types::*;

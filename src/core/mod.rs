mod aggregate;
mod engine;
mod error;
mod growth;
mod normalize;
mod types;

pub use engine::run_schedule;
pub use error::{ValidationError, ValidationResult};
pub use growth::PayoutGrowth;
pub use normalize::{RawField, RawScheduleRequest, normalize};
pub use types::{
    DEFAULT_LTV_TOLERANCE_POINTS, DEFAULT_MAX_TENURE_MONTHS, GrowthPolicy, LoanParameters,
    ScheduleResult, SchedulerConfig, TenurePolicy, YearRecord,
};

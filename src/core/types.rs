use serde::{Deserialize, Serialize};

/// Ceiling applied to `TenurePolicy::MaxLtv`, in months.
pub const DEFAULT_MAX_TENURE_MONTHS: u32 = 240;

/// Distance from the target LTV, in percentage points, at which a schedule
/// is considered to have reached its ceiling.
pub const DEFAULT_LTV_TOLERANCE_POINTS: f64 = 1.5;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TenurePolicy {
    MaxLtv,
    Fixed { months: u32 },
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GrowthPolicy {
    AnnualIncrease {
        rate: f64,
    },
    #[serde(rename_all = "camelCase")]
    BlockPeriod { period_years: u32, increase_rate: f64 },
}

/// Validated inputs for one schedule. Rates are fractions, not percents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanParameters {
    pub property_value: f64,
    pub appreciation_rate: f64,
    pub monthly_payout_base: f64,
    pub interest_rate: f64,
    pub ltv_ratio: f64,
    pub tenure: TenurePolicy,
    pub growth: GrowthPolicy,
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub ltv_tolerance_points: f64,
    pub max_tenure_months: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            ltv_tolerance_points: DEFAULT_LTV_TOLERANCE_POINTS,
            max_tenure_months: DEFAULT_MAX_TENURE_MONTHS,
        }
    }
}

impl SchedulerConfig {
    pub fn tenure_ceiling(&self, tenure: TenurePolicy) -> u32 {
        match tenure {
            TenurePolicy::MaxLtv => self.max_tenure_months,
            TenurePolicy::Fixed { months } => months,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRecord {
    pub year: u32,
    pub monthly_amount: f64,
    pub months_in_year: u32,
    pub disbursed_this_year: f64,
    pub interest_accrued_this_year: f64,
    pub property_value_at_year_start: f64,
    pub appreciation_this_year: f64,
    pub ltv_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleResult {
    pub years: Vec<YearRecord>,
    pub total_loan_amount: f64,
    pub total_disbursed: f64,
    pub total_interest: f64,
    pub total_appreciation: f64,
    pub final_property_value: f64,
    pub max_loan_amount: f64,
    pub total_months_possible: u32,
}

//! Turns raw submission fields into validated [`LoanParameters`].
//!
//! Fields may arrive as JSON numbers or as form strings such as
//! `"1,50,00,000"` or `"9.5%"`. Percent fields are converted to fractions
//! here so the rest of the core only ever sees fractions.

use serde::{Deserialize, Serialize};

use super::error::{ValidationError, ValidationResult};
use super::types::{GrowthPolicy, LoanParameters, TenurePolicy};

const INTEREST_RATE_MIN_PERCENT: f64 = 8.0;
const INTEREST_RATE_MAX_PERCENT: f64 = 15.0;
const ANNUAL_INCREASE_MAX_PERCENT: f64 = 5.0;
const FIXED_TENURE_MIN_MONTHS: u32 = 12;
const FIXED_TENURE_MAX_MONTHS: u32 = 240;
const LTV_CHOICES_PERCENT: [f64; 6] = [50.0, 60.0, 70.0, 75.0, 80.0, 85.0];
const APPRECIATION_CHOICES_PERCENT: [f64; 5] = [1.0, 2.0, 3.0, 4.0, 5.0];
const BLOCK_PERIOD_CHOICES_YEARS: [u32; 4] = [3, 5, 7, 10];
const BLOCK_INCREASE_CHOICES_PERCENT: [f64; 4] = [5.0, 10.0, 15.0, 20.0];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawField {
    Number(f64),
    Text(String),
}

impl From<f64> for RawField {
    fn from(value: f64) -> Self {
        RawField::Number(value)
    }
}

impl From<&str> for RawField {
    fn from(value: &str) -> Self {
        RawField::Text(value.to_string())
    }
}

/// A schedule request exactly as the submitter sent it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawScheduleRequest {
    pub property_value: Option<RawField>,
    pub appreciation_rate: Option<RawField>,
    pub required_monthly_amount: Option<RawField>,
    pub payout_adjustment_type: Option<String>,
    pub annual_increase_rate: Option<RawField>,
    pub block_period: Option<RawField>,
    pub block_increase_rate: Option<RawField>,
    pub ltv_ratio: Option<RawField>,
    pub interest_rate: Option<RawField>,
    pub tenure_type: Option<String>,
    pub fixed_tenure_months: Option<RawField>,
}

pub fn normalize(raw: &RawScheduleRequest) -> ValidationResult<LoanParameters> {
    let property_value = positive("propertyValue", raw.property_value.as_ref())?;
    let monthly_payout_base =
        positive("requiredMonthlyAmount", raw.required_monthly_amount.as_ref())?;

    let appreciation_percent = number("appreciationRate", raw.appreciation_rate.as_ref())?;
    check_choice(
        "appreciationRate",
        appreciation_percent,
        &APPRECIATION_CHOICES_PERCENT,
        "1, 2, 3, 4, 5",
    )?;

    let ltv_percent = positive("ltvRatio", raw.ltv_ratio.as_ref())?;
    check_choice(
        "ltvRatio",
        ltv_percent,
        &LTV_CHOICES_PERCENT,
        "50, 60, 70, 75, 80, 85",
    )?;

    let interest_percent = positive("interestRate", raw.interest_rate.as_ref())?;
    check_range(
        "interestRate",
        interest_percent,
        INTEREST_RATE_MIN_PERCENT,
        INTEREST_RATE_MAX_PERCENT,
    )?;

    let growth = growth_policy(raw)?;
    let tenure = tenure_policy(raw)?;

    Ok(LoanParameters {
        property_value,
        appreciation_rate: appreciation_percent / 100.0,
        monthly_payout_base,
        interest_rate: interest_percent / 100.0,
        ltv_ratio: ltv_percent / 100.0,
        tenure,
        growth,
    })
}

fn growth_policy(raw: &RawScheduleRequest) -> ValidationResult<GrowthPolicy> {
    let kind = raw
        .payout_adjustment_type
        .as_deref()
        .map(str::trim)
        .ok_or(ValidationError::Missing {
            field: "payoutAdjustmentType",
        })?;

    match kind {
        "annual" | "annual_increase" | "annual-increase" | "annualIncrease" => {
            let rate = number("annualIncreaseRate", raw.annual_increase_rate.as_ref())?;
            check_range("annualIncreaseRate", rate, 0.0, ANNUAL_INCREASE_MAX_PERCENT)?;
            Ok(GrowthPolicy::AnnualIncrease { rate: rate / 100.0 })
        }
        "block" | "block_period" | "block-period" | "blockPeriod" => {
            let period = positive("blockPeriod", raw.block_period.as_ref())?;
            let period_years = BLOCK_PERIOD_CHOICES_YEARS
                .into_iter()
                .find(|&choice| f64::from(choice) == period)
                .ok_or_else(|| ValidationError::NotAllowed {
                    field: "blockPeriod",
                    allowed: "3, 5, 7, 10",
                    value: period.to_string(),
                })?;
            let rate = positive("blockIncreaseRate", raw.block_increase_rate.as_ref())?;
            check_choice(
                "blockIncreaseRate",
                rate,
                &BLOCK_INCREASE_CHOICES_PERCENT,
                "5, 10, 15, 20",
            )?;
            Ok(GrowthPolicy::BlockPeriod {
                period_years,
                increase_rate: rate / 100.0,
            })
        }
        other => Err(ValidationError::NotAllowed {
            field: "payoutAdjustmentType",
            allowed: "annual, block",
            value: other.to_string(),
        }),
    }
}

fn tenure_policy(raw: &RawScheduleRequest) -> ValidationResult<TenurePolicy> {
    let kind = raw
        .tenure_type
        .as_deref()
        .map(str::trim)
        .unwrap_or("maxLTV");

    match kind {
        "maxLTV" | "maxLtv" | "max-ltv" | "max_ltv" => Ok(TenurePolicy::MaxLtv),
        "fixed" => {
            let months = number("fixedTenureMonths", raw.fixed_tenure_months.as_ref())?;
            let whole = months.fract() == 0.0;
            let in_range = (f64::from(FIXED_TENURE_MIN_MONTHS)
                ..=f64::from(FIXED_TENURE_MAX_MONTHS))
                .contains(&months);
            if !whole || !in_range {
                return Err(ValidationError::TenureOutOfRange {
                    min: FIXED_TENURE_MIN_MONTHS,
                    max: FIXED_TENURE_MAX_MONTHS,
                    value: months,
                });
            }
            Ok(TenurePolicy::Fixed {
                months: months as u32,
            })
        }
        other => Err(ValidationError::NotAllowed {
            field: "tenureType",
            allowed: "maxLTV, fixed",
            value: other.to_string(),
        }),
    }
}

fn number(field: &'static str, raw: Option<&RawField>) -> ValidationResult<f64> {
    let raw = raw.ok_or(ValidationError::Missing { field })?;
    let value = match raw {
        RawField::Number(v) => *v,
        RawField::Text(text) => {
            let cleaned: String = text
                .trim()
                .trim_end_matches('%')
                .chars()
                .filter(|c| !matches!(c, ',' | '_') && !c.is_whitespace())
                .collect();
            if cleaned.is_empty() {
                return Err(ValidationError::Missing { field });
            }
            cleaned
                .parse::<f64>()
                .map_err(|_| ValidationError::NotNumeric {
                    field,
                    value: text.clone(),
                })?
        }
    };

    if !value.is_finite() {
        return Err(ValidationError::NotNumeric {
            field,
            value: value.to_string(),
        });
    }
    Ok(value)
}

fn positive(field: &'static str, raw: Option<&RawField>) -> ValidationResult<f64> {
    let value = number(field, raw)?;
    if value <= 0.0 {
        return Err(ValidationError::NotPositive { field });
    }
    Ok(value)
}

fn check_choice(
    field: &'static str,
    value: f64,
    choices: &[f64],
    allowed: &'static str,
) -> ValidationResult<()> {
    if !choices.contains(&value) {
        return Err(ValidationError::NotAllowed {
            field,
            allowed,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> ValidationResult<()> {
    if !(min..=max).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}

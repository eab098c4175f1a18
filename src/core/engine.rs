use super::aggregate::ScheduleAccumulator;
use super::growth::PayoutGrowth;
use super::types::{LoanParameters, ScheduleResult, SchedulerConfig, YearRecord};

/// Simulates the payout schedule year by year until the balance reaches the
/// LTV ceiling or the tenure runs out.
///
/// `final_property_value` is the value at loop exit. When the loop ends
/// because the tenure ran out or the balance crossed the appreciated cap, that
/// value already carries one more year of appreciation than the last record.
pub fn run_schedule(params: &LoanParameters, config: &SchedulerConfig) -> ScheduleResult {
    let tenure_ceiling = config.tenure_ceiling(params.tenure);
    let target_ltv_percent = params.ltv_ratio * 100.0;

    let mut growth = PayoutGrowth::new(params.growth, params.monthly_payout_base);
    let mut schedule = ScheduleAccumulator::with_capacity(tenure_ceiling.div_ceil(12) as usize);

    let mut property_value = params.property_value;
    let mut max_loan_amount = property_value * params.ltv_ratio;
    let mut balance = 0.0;
    let mut remaining_months = tenure_ceiling;
    let mut year = 1;

    while balance < max_loan_amount && remaining_months > 0 {
        let monthly_amount = growth.monthly_amount();
        let mut months = remaining_months.min(12);
        let mut disbursed = monthly_amount * f64::from(months);

        if balance + disbursed > max_loan_amount {
            let affordable = ((max_loan_amount - balance) / monthly_amount).floor();
            if affordable <= 0.0 {
                break;
            }
            months = (affordable as u32).min(months);
            disbursed = monthly_amount * f64::from(months);
        }

        let balance_before = balance;
        balance += disbursed;
        let average_balance = (balance_before + balance) / 2.0;
        let interest = average_balance * params.interest_rate * (f64::from(months) / 12.0);

        if balance + interest > max_loan_amount {
            // Only the headroom under the cap is charged and the property is
            // not appreciated; the schedule ends here.
            let headroom = (max_loan_amount - balance).max(0.0);
            balance += headroom;
            schedule.push(YearRecord {
                year,
                monthly_amount,
                months_in_year: months,
                disbursed_this_year: disbursed,
                interest_accrued_this_year: headroom,
                property_value_at_year_start: property_value,
                appreciation_this_year: 0.0,
                ltv_percentage: balance / property_value * 100.0,
            });
            break;
        }

        balance += interest;
        let appreciation = property_value * params.appreciation_rate;
        let ltv_percentage = balance / property_value * 100.0;
        schedule.push(YearRecord {
            year,
            monthly_amount,
            months_in_year: months,
            disbursed_this_year: disbursed,
            interest_accrued_this_year: interest,
            property_value_at_year_start: property_value,
            appreciation_this_year: appreciation,
            ltv_percentage,
        });

        if (ltv_percentage - target_ltv_percent).abs() <= config.ltv_tolerance_points {
            break;
        }

        property_value *= 1.0 + params.appreciation_rate;
        max_loan_amount = property_value * params.ltv_ratio;

        if balance < max_loan_amount && remaining_months > 0 {
            growth.advance(year + 1);
            remaining_months -= months;
            year += 1;
        }
    }

    schedule.into_result(balance, property_value, max_loan_amount)
}

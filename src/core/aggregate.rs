use super::types::{ScheduleResult, YearRecord};

/// Collects year records and running totals as the simulation emits them.
#[derive(Debug, Default)]
pub(crate) struct ScheduleAccumulator {
    years: Vec<YearRecord>,
    total_disbursed: f64,
    total_interest: f64,
    total_appreciation: f64,
}

impl ScheduleAccumulator {
    pub(crate) fn with_capacity(years: usize) -> Self {
        Self {
            years: Vec::with_capacity(years),
            ..Self::default()
        }
    }

    pub(crate) fn push(&mut self, record: YearRecord) {
        self.total_disbursed += record.disbursed_this_year;
        self.total_interest += record.interest_accrued_this_year;
        self.total_appreciation += record.appreciation_this_year;
        self.years.push(record);
    }

    pub(crate) fn into_result(
        self,
        final_balance: f64,
        final_property_value: f64,
        max_loan_amount: f64,
    ) -> ScheduleResult {
        let total_months_possible = self.years.iter().map(|y| y.months_in_year).sum();
        ScheduleResult {
            years: self.years,
            total_loan_amount: final_balance,
            total_disbursed: self.total_disbursed,
            total_interest: self.total_interest,
            total_appreciation: self.total_appreciation,
            final_property_value,
            max_loan_amount,
            total_months_possible,
        }
    }
}

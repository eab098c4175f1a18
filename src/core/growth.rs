use super::types::GrowthPolicy;

/// Tracks the monthly payout as the schedule moves from year to year.
#[derive(Debug, Clone, Copy)]
pub struct PayoutGrowth {
    policy: GrowthPolicy,
    monthly_amount: f64,
    block_start_year: u32,
}

impl PayoutGrowth {
    pub fn new(policy: GrowthPolicy, base_amount: f64) -> Self {
        Self {
            policy,
            monthly_amount: base_amount,
            block_start_year: 1,
        }
    }

    pub fn monthly_amount(&self) -> f64 {
        self.monthly_amount
    }

    /// Moves the payout to `next_year`. Years must be visited in order.
    pub fn advance(&mut self, next_year: u32) {
        match self.policy {
            GrowthPolicy::AnnualIncrease { rate } => {
                self.monthly_amount *= 1.0 + rate;
            }
            GrowthPolicy::BlockPeriod {
                period_years,
                increase_rate,
            } => {
                if next_year > 1
                    && period_years > 0
                    && (next_year - self.block_start_year) % period_years == 0
                {
                    self.monthly_amount *= 1.0 + increase_rate;
                    self.block_start_year = next_year;
                }
            }
        }
    }
}

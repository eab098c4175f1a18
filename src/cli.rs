use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::core::{
    DEFAULT_LTV_TOLERANCE_POINTS, DEFAULT_MAX_TENURE_MONTHS, RawField, RawScheduleRequest,
    SchedulerConfig,
};

#[derive(Parser, Debug)]
#[command(
    name = "payout",
    about = "Reverse-mortgage payout scheduler (LTV-capped disbursement, interest and appreciation)"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "info",
        help = "Log level (trace, debug, info, warn, error)"
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[command(flatten)]
        scheduler: SchedulerArgs,
    },
    /// Compute one schedule and print it as JSON
    Schedule {
        #[command(flatten)]
        scheduler: SchedulerArgs,
        #[command(flatten)]
        request: ScheduleArgs,
    },
}

#[derive(Args, Debug, Clone, Copy)]
pub struct SchedulerArgs {
    #[arg(
        long,
        default_value_t = DEFAULT_LTV_TOLERANCE_POINTS,
        help = "Stop once the LTV is within this many percentage points of the target"
    )]
    pub ltv_tolerance: f64,
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_TENURE_MONTHS,
        help = "Tenure ceiling in months when --tenure-type=max-ltv"
    )]
    pub max_tenure_months: u32,
}

impl SchedulerArgs {
    pub fn config(self) -> Result<SchedulerConfig, String> {
        if !self.ltv_tolerance.is_finite() || self.ltv_tolerance < 0.0 {
            return Err("--ltv-tolerance must be >= 0".to_string());
        }
        if self.max_tenure_months == 0 {
            return Err("--max-tenure-months must be > 0".to_string());
        }
        Ok(SchedulerConfig {
            ltv_tolerance_points: self.ltv_tolerance,
            max_tenure_months: self.max_tenure_months,
        })
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliPayoutAdjustment {
    Annual,
    Block,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliTenureType {
    MaxLtv,
    Fixed,
}

/// Raw form fields. Values are passed through as text so the normalizer sees
/// exactly what a form submission would send (e.g. `--property-value 1,50,00,000`).
#[derive(Args, Debug, Clone)]
pub struct ScheduleArgs {
    #[arg(long)]
    pub property_value: String,
    #[arg(long, default_value = "3", help = "Annual property appreciation in percent")]
    pub appreciation_rate: String,
    #[arg(long)]
    pub required_monthly_amount: String,
    #[arg(long, value_enum, default_value_t = CliPayoutAdjustment::Annual)]
    pub payout_adjustment_type: CliPayoutAdjustment,
    #[arg(long, default_value = "0", help = "Yearly payout increase in percent")]
    pub annual_increase_rate: String,
    #[arg(long, default_value = "5", help = "Years between payout increases")]
    pub block_period: String,
    #[arg(long, default_value = "5", help = "Payout increase per block in percent")]
    pub block_increase_rate: String,
    #[arg(long, default_value = "60", help = "Loan-to-value ceiling in percent")]
    pub ltv_ratio: String,
    #[arg(long, default_value = "9.5", help = "Annual interest rate in percent (8-15)")]
    pub interest_rate: String,
    #[arg(long, value_enum, default_value_t = CliTenureType::MaxLtv)]
    pub tenure_type: CliTenureType,
    #[arg(long, help = "Tenure in months (12-240); required when --tenure-type=fixed")]
    pub fixed_tenure_months: Option<String>,
}

impl From<ScheduleArgs> for RawScheduleRequest {
    fn from(args: ScheduleArgs) -> Self {
        let (payout_adjustment_type, annual_increase_rate, block_period, block_increase_rate) =
            match args.payout_adjustment_type {
                CliPayoutAdjustment::Annual => (
                    "annual",
                    Some(RawField::Text(args.annual_increase_rate)),
                    None,
                    None,
                ),
                CliPayoutAdjustment::Block => (
                    "block",
                    None,
                    Some(RawField::Text(args.block_period)),
                    Some(RawField::Text(args.block_increase_rate)),
                ),
            };
        let tenure_type = match args.tenure_type {
            CliTenureType::MaxLtv => "maxLTV",
            CliTenureType::Fixed => "fixed",
        };

        RawScheduleRequest {
            property_value: Some(RawField::Text(args.property_value)),
            appreciation_rate: Some(RawField::Text(args.appreciation_rate)),
            required_monthly_amount: Some(RawField::Text(args.required_monthly_amount)),
            payout_adjustment_type: Some(payout_adjustment_type.to_string()),
            annual_increase_rate,
            block_period,
            block_increase_rate,
            ltv_ratio: Some(RawField::Text(args.ltv_ratio)),
            interest_rate: Some(RawField::Text(args.interest_rate)),
            tenure_type: Some(tenure_type.to_string()),
            fixed_tenure_months: args.fixed_tenure_months.map(RawField::Text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GrowthPolicy, TenurePolicy, ValidationError, normalize};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("valid command line")
    }

    #[test]
    fn schedule_command_normalizes_form_style_values() {
        let cli = parse(&[
            "payout",
            "schedule",
            "--property-value",
            "1,50,00,000",
            "--required-monthly-amount",
            "45,000",
        ]);
        let Command::Schedule { scheduler, request } = cli.command else {
            panic!("expected schedule command");
        };
        let config = scheduler.config().expect("default config");
        assert_eq!(config.max_tenure_months, 240);
        assert_eq!(config.ltv_tolerance_points, 1.5);

        let params = normalize(&request.into()).expect("valid params");
        assert_eq!(params.property_value, 15_000_000.0);
        assert_eq!(params.tenure, TenurePolicy::MaxLtv);
        assert_eq!(params.growth, GrowthPolicy::AnnualIncrease { rate: 0.0 });
    }

    #[test]
    fn schedule_command_builds_block_policy_and_fixed_tenure() {
        let cli = parse(&[
            "payout",
            "schedule",
            "--property-value",
            "8000000",
            "--required-monthly-amount",
            "28000",
            "--payout-adjustment-type",
            "block",
            "--block-period",
            "3",
            "--block-increase-rate",
            "10",
            "--tenure-type",
            "fixed",
            "--fixed-tenure-months",
            "120",
        ]);
        let Command::Schedule { request, .. } = cli.command else {
            panic!("expected schedule command");
        };
        let raw: RawScheduleRequest = request.into();
        assert!(raw.annual_increase_rate.is_none());
        let params = normalize(&raw).expect("valid params");
        assert_eq!(params.tenure, TenurePolicy::Fixed { months: 120 });
        assert_eq!(
            params.growth,
            GrowthPolicy::BlockPeriod {
                period_years: 3,
                increase_rate: 0.10
            }
        );
    }

    #[test]
    fn fixed_tenure_without_months_fails_validation() {
        let cli = parse(&[
            "payout",
            "schedule",
            "--property-value",
            "8000000",
            "--required-monthly-amount",
            "28000",
            "--tenure-type",
            "fixed",
        ]);
        let Command::Schedule { request, .. } = cli.command else {
            panic!("expected schedule command");
        };
        let err = normalize(&request.into()).expect_err("months are required");
        assert_eq!(
            err,
            ValidationError::Missing {
                field: "fixedTenureMonths"
            }
        );
    }

    #[test]
    fn serve_command_reads_port_and_tolerance() {
        let cli = parse(&["payout", "serve", "--port", "9000", "--ltv-tolerance", "0.5"]);
        let Command::Serve { port, scheduler } = cli.command else {
            panic!("expected serve command");
        };
        assert_eq!(port, 9000);
        assert_eq!(scheduler.config().expect("valid").ltv_tolerance_points, 0.5);
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        let args = SchedulerArgs {
            ltv_tolerance: -1.0,
            max_tenure_months: 240,
        };
        let err = args.config().expect_err("negative tolerance");
        assert!(err.contains("--ltv-tolerance"));
    }
}

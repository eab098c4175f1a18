use clap::Parser;

use payout::api::{build_schedule_response, run_http_server};
use payout::cli::{Cli, Command};
use payout::core::{RawScheduleRequest, normalize, run_schedule};
use payout::logging::init_tracing;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Command::Serve { port, scheduler } => {
            let config = scheduler.config().unwrap_or_else(|e| exit_with(&e));
            if let Err(e) = run_http_server(port, config).await {
                exit_with(&format!("Server error: {e}"));
            }
        }
        Command::Schedule { scheduler, request } => {
            let config = scheduler.config().unwrap_or_else(|e| exit_with(&e));
            let raw = RawScheduleRequest::from(request);
            let params = normalize(&raw).unwrap_or_else(|e| exit_with(&e.to_string()));
            let result = run_schedule(&params, &config);
            let response = build_schedule_response(&params, &result, None);
            match serde_json::to_string_pretty(&response) {
                Ok(json) => println!("{json}"),
                Err(e) => exit_with(&format!("Failed to encode schedule: {e}")),
            }
        }
    }
}

fn exit_with(msg: &str) -> ! {
    eprintln!("{msg}");
    std::process::exit(1);
}

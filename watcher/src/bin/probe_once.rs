use clap::Parser;
use shared::DEFAULT_PORT;
use std::process::ExitCode;
use std::time::Duration;
use watcher::probe::probe;

/// Probe a game server once and print what it reports
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host
    #[arg(long, env = "SERVER_HOST")]
    host: String,

    /// Server port
    #[arg(short, long, env = "SERVER_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Connect and exchange timeout in seconds
    #[arg(short, long, default_value_t = 3)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();
    println!("Probing {}:{}", args.host, args.port);

    match probe(&args.host, args.port, Duration::from_secs(args.timeout_secs)).await {
        Ok(sample) => {
            match sample.reported_count {
                Some(count) => println!("Players online: {}", count),
                None => println!("Players online: (not reported)"),
            }
            if sample.sampled_names.is_empty() {
                println!("No player sample");
            }
            for name in &sample.sampled_names {
                println!("  {}", name);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Probe failed ({}): {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}

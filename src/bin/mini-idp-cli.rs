use clap::{Parser, Subcommand};
use mini_idp::config::Config;

#[derive(Parser)]
#[command(name = "mini-idp-cli", about = "Operator CLI for mini-idp")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the resolved version and platform.
    Version,
    /// Print the effective configuration loaded from env/files.
    Config,
    /// Kick off the device-authorization grant for a client and print the
    /// verification URL the operator should open in a browser.
    DeviceCode {
        #[arg(long)]
        client_id: String,
        #[arg(long, default_value = "openid offline_access")]
        scope: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Version => {
            println!("mini-idp-cli {} ({})", env!("CARGO_PKG_VERSION"), std::env::consts::OS);
        }
        Command::Config => {
            mini_idp::config::init();
            match Config::from_env() {
                Ok(cfg) => match serde_json::to_string_pretty(&cfg) {
                    Ok(json) => println!("{json}"),
                    Err(e) => eprintln!("failed to render configuration: {e}"),
                },
                Err(e) => eprintln!("failed to load configuration: {e}"),
            }
        }
        Command::DeviceCode { client_id, scope } => {
            mini_idp::config::init();
            let cfg = match Config::from_env() {
                Ok(cfg) => cfg,
                Err(e) => {
                    eprintln!("failed to load configuration: {e}");
                    std::process::exit(1);
                }
            };

            let base = cfg.self_ref_uri.trim_end_matches('/');
            println!("Requesting device code for client '{client_id}' (scope: {scope})");
            println!(
                "POST {base}/oauth/device with {{\"client_id\": \"{client_id}\", \"scope\": \"{scope}\"}}"
            );
            println!("Then open the returned verification_uri_complete in a browser to approve.");
        }
    }
}

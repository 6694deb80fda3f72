//! # CLI Interface
//!
//! Defines the command-line argument structure for `bank-token-node` using
//! `clap` derive. Supports two subcommands: `run` and `version`. Every `run`
//! flag also reads a `BANK_TOKEN_*` environment variable.

use bank_token::config::{DEFAULT_HOLDER_CAP, DEFAULT_NAME, DEFAULT_SYMBOL};
use bank_token::{TokenConfig, TransferPolicy};
use clap::{Parser, Subcommand};

use crate::logging::LogFormat;

/// Restricted bank token node.
///
/// Hosts one bank token instance in memory and serves it over REST,
/// JSON-RPC and WebSocket, with Prometheus metrics on a separate port.
#[derive(Parser, Debug)]
#[command(
    name = "bank-token-node",
    about = "Restricted bank token ledger node",
    version,
    propagate_version = true
)]
pub struct BankTokenCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy a token instance and start serving it.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Address of the issuing bank. The only identity allowed to deposit
    /// and to drive withdrawals.
    #[arg(long, env = "BANK_TOKEN_OWNER")]
    pub owner: String,

    #[arg(long, env = "BANK_TOKEN_SYMBOL", default_value = DEFAULT_SYMBOL)]
    pub symbol: String,

    #[arg(long, env = "BANK_TOKEN_NAME", default_value = DEFAULT_NAME)]
    pub name: String,

    /// Largest balance a single account may reach through deposits and
    /// transfers.
    #[arg(long, env = "BANK_TOKEN_HOLDER_CAP", default_value_t = DEFAULT_HOLDER_CAP)]
    pub holder_cap: u64,

    /// Transfer recipient policy: `open` or `holders-only`.
    #[arg(long, env = "BANK_TOKEN_TRANSFER_POLICY", default_value = "open")]
    pub transfer_policy: TransferPolicy,

    /// Port for the JSON-RPC and REST API.
    #[arg(long, env = "BANK_TOKEN_RPC_PORT", default_value_t = 9741)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "BANK_TOKEN_METRICS_PORT", default_value_t = 9742)]
    pub metrics_port: u16,

    /// Log output format.
    #[arg(long, env = "BANK_TOKEN_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl RunArgs {
    /// Builds the deployment configuration from the parsed flags.
    pub fn token_config(&self) -> TokenConfig {
        TokenConfig::new(self.owner.as_str())
            .with_symbol(self.symbol.as_str())
            .with_name(self.name.as_str())
            .with_holder_cap(self.holder_cap)
            .with_transfer_policy(self.transfer_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bank_token::Address;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        BankTokenCli::command().debug_assert();
    }

    #[test]
    fn run_args_build_token_config() {
        let cli = BankTokenCli::try_parse_from([
            "bank-token-node",
            "run",
            "--owner",
            "0xF55583FF8461DB9dfbBe90b5F3324f2A290c3356",
            "--holder-cap",
            "500",
            "--transfer-policy",
            "holders-only",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        let config = args.token_config();
        assert_eq!(config.owner.as_str(), "0xF55583FF8461DB9dfbBe90b5F3324f2A290c3356");
        assert_eq!(config.owner, Address::new("0xf55583ff8461db9dfbbe90b5f3324f2a290c3356"));
        assert_eq!(config.symbol, DEFAULT_SYMBOL);
        assert_eq!(config.holder_cap, 500);
        assert_eq!(config.transfer_policy, TransferPolicy::HoldersOnly);
        assert_eq!(args.log_format, LogFormat::Pretty);
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let parsed = BankTokenCli::try_parse_from([
            "bank-token-node",
            "run",
            "--owner",
            "0xowner",
            "--log-format",
            "xml",
        ]);
        assert!(parsed.is_err());

        let cli = BankTokenCli::try_parse_from([
            "bank-token-node",
            "run",
            "--owner",
            "0xowner",
            "--log-format",
            "json",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(args.log_format, LogFormat::Json);
    }
}

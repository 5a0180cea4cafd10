use std::path::Path;

use anyhow::{Context, Result};
use chanaudit::{
    config::{ConfigValidator, ValidatedConfig},
    AuditOutcome, AuditReport, Auditor, NodeClient,
};
use chanaudit_common::{
    config::{CVE_ID, VERSION},
    get_cli_styles,
    logger::{init_logger, LogLevel},
    utils::format_coin,
};
use clap::Parser;
use log::{error, info};

/// Channel auditor CLI configuration - wrapper for command line parsing
#[derive(Parser, Clone, Debug)]
#[command(name = "chanaudit", version = VERSION, styles = get_cli_styles())]
#[command(about = "Detect channels with a counterfeit funding output and the funds they cost")]
pub struct CliConfig {
    /// Set log level
    #[clap(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Disable the log file
    #[clap(long)]
    disable_file_logging: bool,

    /// Write a single log file instead of one per day
    #[clap(long)]
    disable_file_log_date_based: bool,

    /// Disable the usage of colors in log
    #[clap(long)]
    disable_log_color: bool,

    /// Log filename
    #[clap(long, default_value_t = String::from("chanaudit.log"))]
    filename_log: String,

    /// Logs directory
    #[clap(long, default_value_t = String::from("logs/"))]
    logs_path: String,

    /// host:port of the node REST interface
    #[clap(long, default_value_t = String::from("localhost:8080"))]
    host: String,

    /// Path to the node TLS certificate
    #[clap(long)]
    tls_cert_path: Option<String>,

    /// Path to the read only macaroon
    #[clap(long)]
    macaroon_path: Option<String>,

    /// Network the node runs on (mainnet, testnet, regtest, simnet)
    #[clap(long, default_value = "mainnet")]
    network: String,

    /// Advanced: Request timeout in seconds
    #[clap(long, default_value_t = 30)]
    request_timeout_secs: u64,

    /// Advanced: Connection timeout in seconds
    #[clap(long, default_value_t = 10)]
    connection_timeout_secs: u64,

    /// Advanced: Channel graph lookups in flight
    #[clap(long, default_value_t = 8)]
    lookup_concurrency: usize,

    /// Print the final report as JSON on stdout
    #[clap(long)]
    json: bool,

    /// Enable strict configuration validation
    #[clap(long)]
    strict_validation: bool,

    /// Disable auto-fix of configuration issues
    #[clap(long)]
    no_auto_fix: bool,

    /// JSON File to load the configuration from
    #[clap(long)]
    config_file: Option<String>,

    /// Generate the template at the `config_file` path
    #[clap(long)]
    generate_config_template: bool,
}

impl CliConfig {
    /// Convert CLI configuration to ValidatedConfig
    pub fn to_validated_config(self) -> ValidatedConfig {
        ValidatedConfig {
            log_level: self.log_level,
            disable_file_logging: self.disable_file_logging,
            disable_file_log_date_based: self.disable_file_log_date_based,
            disable_log_color: self.disable_log_color,
            filename_log: self.filename_log,
            logs_path: self.logs_path,
            host: self.host,
            network: self.network,
            tls_cert_path: self.tls_cert_path,
            macaroon_path: self.macaroon_path,
            request_timeout_secs: self.request_timeout_secs,
            connection_timeout_secs: self.connection_timeout_secs,
            lookup_concurrency: self.lookup_concurrency,
            json_output: self.json,
            auto_fix_config: !self.no_auto_fix,
            strict_validation: self.strict_validation,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_config = CliConfig::parse();

    // Handle config template generation
    if let Some(path) = cli_config.config_file.as_ref() {
        if cli_config.generate_config_template {
            if Path::new(path).exists() {
                eprintln!("Config file already exists at {path}");
                eprintln!("Use a different path or remove the existing file");
                return Ok(());
            }

            ValidatedConfig::generate_template(path)?;
            println!("Configuration template generated at {path}");
            println!("Edit the file and run the application with --config-file {path}");
            return Ok(());
        }
    }

    // Load and validate configuration
    let config = if let Some(config_path) = &cli_config.config_file {
        ValidatedConfig::from_file(
            config_path,
            cli_config.strict_validation,
            !cli_config.no_auto_fix,
        )?
    } else {
        let mut config = cli_config.to_validated_config();
        let validator = ConfigValidator::new(config.strict_validation, config.auto_fix_config);
        validator.validate(&mut config)?;
        config
    };

    init_logger(config.to_logger_config())?;

    if log::log_enabled!(log::Level::Info) {
        info!("Channel auditor v{} starting...", VERSION);
        info!("Node: {} ({})", config.host, config.get_network());
    }

    let client = NodeClient::with_config(&config.host, config.to_node_client_config())
        .with_context(|| format!("Unable to set up the connection to {}", config.host))?;

    let auditor = Auditor::new(Box::new(client), config.to_audit_config());
    let outcome = match auditor.run().await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Audit aborted: {}", e);
            return Err(e.into());
        }
    };

    if let AuditOutcome::Affected(report) = &outcome {
        log_report(report);
    }

    if config.json_output {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    Ok(())
}

fn log_report(report: &AuditReport) {
    info!(
        "{} of {} channel(s) could not be verified, your node was affected by {}",
        report.invalid_channels.len(),
        report.channels_audited,
        CVE_ID
    );

    for (channel, amount) in report.ledger.sorted_entries() {
        info!("FakeChannel({}) resulted in loss of: {}", channel, format_coin(amount));
    }

    info!("Amount lost: {}", format_coin(report.total_loss));
}

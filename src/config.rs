use clap::Parser;
use std::path::PathBuf;

/// Vitals Dashboard: records Core Web Vitals samples, evaluates alert
/// rules, and dispatches email digests.
#[derive(Parser, Debug, Clone)]
#[command(name = "vitals-dashboard")]
pub struct CliArgs {
    /// Directory holding dashboard.db (defaults to the platform data dir)
    #[arg(short = 'd', long = "data-dir")]
    pub data_dir: Option<PathBuf>,

    /// Dashboard HTTP port
    #[arg(long = "port", default_value_t = DEFAULT_DASHBOARD_PORT)]
    pub port: u16,

    /// Log file for dashboard output (stdout if omitted)
    #[arg(short = 'l', long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Mail gateway URL for digest delivery; digests are disabled if omitted
    #[arg(long = "mail-endpoint")]
    pub mail_endpoint: Option<String>,

    /// From address used on digest emails
    #[arg(long = "mail-from", default_value = "alerts@vitals-dashboard.local")]
    pub mail_from: String,

    /// Chat-completions base URL for LLM analysis; analysis is disabled if omitted
    #[arg(long = "llm-endpoint")]
    pub llm_endpoint: Option<String>,

    /// LLM model identifier
    #[arg(long = "llm-model", default_value = "gpt-4o-mini")]
    pub llm_model: String,

    /// API key for the LLM endpoint
    #[arg(long = "llm-api-key")]
    pub llm_api_key: Option<String>,

    /// Seconds between dispatcher ticks
    #[arg(long = "dispatch-interval", default_value_t = DISPATCH_TICK_INTERVAL_SECS)]
    pub dispatch_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub data_dir: PathBuf,
    pub port: u16,
    pub log_file: Option<PathBuf>,
    pub mail_endpoint: Option<String>,
    pub mail_from: String,
    pub llm_endpoint: Option<String>,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    pub dispatch_interval_secs: u64,
}

// Port constants
pub const DEFAULT_DASHBOARD_PORT: u16 = 9880;

// Dispatcher constants
pub const DISPATCH_TICK_INTERVAL_SECS: u64 = 300;
pub const MAIL_SEND_TIMEOUT_SECS: u64 = 15;
pub const WEEKLY_PERIOD_DAYS: i64 = 7;
pub const MONTHLY_PERIOD_DAYS: i64 = 30;

// LLM constants
pub const LLM_REQUEST_TIMEOUT_SECS: u64 = 60;

// Input limits
pub const MAX_WEBSITE_NAME_LEN: usize = 255;
pub const MAX_URL_LEN: usize = 512;
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
pub const DEFAULT_EVENT_LIMIT: i64 = 20;

impl DashboardConfig {
    pub fn from_args(args: CliArgs) -> Self {
        let data_dir = args.data_dir.unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("vitals-dashboard")
        });

        DashboardConfig {
            data_dir,
            port: args.port,
            log_file: args.log_file,
            mail_endpoint: args.mail_endpoint,
            mail_from: args.mail_from,
            llm_endpoint: args.llm_endpoint,
            llm_model: args.llm_model,
            llm_api_key: args.llm_api_key,
            dispatch_interval_secs: args.dispatch_interval_secs,
        }
    }

    /// Path to the SQLite database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("dashboard.db")
    }
}

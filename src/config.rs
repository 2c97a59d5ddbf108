use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PERSON_API_URL: &str = "https://person.api.uspeoplesearch.net/person/v3";
pub const DEFAULT_TCPA_API_URL: &str = "https://tcpa.api.uspeoplesearch.net/tcpa/v1";
pub const DEFAULT_INPUT_FILE: &str = "data.txt";
pub const DEFAULT_BACKUP_FILE: &str = "data_old.txt";

#[derive(Debug, Clone)]
pub struct Config {
    pub person_api_url: String,
    pub tcpa_api_url: String,
    /// Per-request timeout for both lookup APIs.
    pub http_timeout: Duration,
    /// Pause between two attempts of the same lookup.
    pub retry_delay: Duration,
    /// Courtesy pause after every phone number.
    pub request_delay: Duration,
    pub input_file: PathBuf,
    pub backup_file: PathBuf,
    pub output_dir: PathBuf,
    /// Overrides the mode's default number of Person attempts.
    pub person_max_attempts: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            person_api_url: DEFAULT_PERSON_API_URL.to_string(),
            tcpa_api_url: DEFAULT_TCPA_API_URL.to_string(),
            http_timeout: Duration::from_secs(10),
            retry_delay: Duration::from_secs(1),
            request_delay: Duration::from_secs(1),
            input_file: PathBuf::from(DEFAULT_INPUT_FILE),
            backup_file: PathBuf::from(DEFAULT_BACKUP_FILE),
            output_dir: PathBuf::from("."),
            person_max_attempts: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            person_api_url: api_url_var("PERSON_API_URL", DEFAULT_PERSON_API_URL)?,
            tcpa_api_url: api_url_var("TCPA_API_URL", DEFAULT_TCPA_API_URL)?,
            http_timeout: std::env::var("HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("HTTP_TIMEOUT_SECS must be a whole number of seconds"))
                .and_then(|secs| {
                    if secs == 0 {
                        anyhow::bail!("HTTP_TIMEOUT_SECS must be greater than zero");
                    }
                    Ok(Duration::from_secs(secs))
                })?,
            retry_delay: seconds_var("RETRY_DELAY_SECS", 1)?,
            request_delay: seconds_var("REQUEST_DELAY_SECS", 1)?,
            input_file: path_var("INPUT_FILE", DEFAULT_INPUT_FILE)?,
            backup_file: path_var("BACKUP_FILE", DEFAULT_BACKUP_FILE)?,
            output_dir: path_var("OUTPUT_DIR", ".")?,
            person_max_attempts: match std::env::var("PERSON_MAX_ATTEMPTS") {
                Ok(raw) if !raw.trim().is_empty() => {
                    let attempts: u32 = raw.trim().parse().map_err(|_| {
                        anyhow::anyhow!("PERSON_MAX_ATTEMPTS must be a positive integer")
                    })?;
                    if attempts == 0 {
                        anyhow::bail!("PERSON_MAX_ATTEMPTS must be at least 1");
                    }
                    Some(attempts)
                }
                _ => None,
            },
        };

        tracing::debug!("Person API URL: {}", config.person_api_url);
        tracing::debug!("TCPA API URL: {}", config.tcpa_api_url);
        tracing::debug!(
            "Timeout: {:?}, retry delay: {:?}, request delay: {:?}",
            config.http_timeout,
            config.retry_delay,
            config.request_delay
        );
        tracing::debug!(
            "Input: {}, backup: {}, output dir: {}",
            config.input_file.display(),
            config.backup_file.display(),
            config.output_dir.display()
        );

        Ok(config)
    }
}

fn api_url_var(name: &str, default: &str) -> anyhow::Result<String> {
    let url = std::env::var(name).unwrap_or_else(|_| default.to_string());
    if url.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(url)
}

fn seconds_var(name: &str, default: u64) -> anyhow::Result<Duration> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| anyhow::anyhow!("{} must be a whole number of seconds", name)),
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

fn path_var(name: &str, default: &str) -> anyhow::Result<PathBuf> {
    let value = std::env::var(name).unwrap_or_else(|_| default.to_string());
    if value.trim().is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    Ok(PathBuf::from(value))
}

use crate::config::Config;
use crate::models::PipelineMode;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rust-phone-enrich")]
#[command(about = "Batch-enrich a list of phone numbers with Person and TCPA lookups")]
#[command(version)]
pub struct Cli {
    /// Which lookups to run for every number
    #[arg(short, long, value_enum, default_value_t = PipelineMode::Combined)]
    pub mode: PipelineMode,

    /// Input list, one phone number per line (overrides INPUT_FILE)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Backup path for the input list (overrides BACKUP_FILE)
    #[arg(short, long)]
    pub backup: Option<PathBuf>,

    /// Directory for the timestamped report (overrides OUTPUT_DIR)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Verbose logging (use -v for DEBUG with raw API responses, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Applies path overrides given on the command line.
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(input) = &self.input {
            config.input_file = input.clone();
        }
        if let Some(backup) = &self.backup {
            config.backup_file = backup.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        config
    }

    /// Default `EnvFilter` directive for the chosen verbosity.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "rust_phone_enrich=info",
            1 => "rust_phone_enrich=debug",
            _ => "rust_phone_enrich=trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_combined_mode() {
        let cli = Cli::parse_from(["rust-phone-enrich"]);
        assert_eq!(cli.mode, PipelineMode::Combined);
        assert_eq!(cli.log_directive(), "rust_phone_enrich=info");
    }

    #[test]
    fn test_overrides_paths() {
        let cli = Cli::parse_from([
            "rust-phone-enrich",
            "--mode",
            "person",
            "--input",
            "numbers.txt",
            "-o",
            "out",
            "-vv",
        ]);
        let config = cli.apply(Config::default());

        assert_eq!(cli.mode, PipelineMode::Person);
        assert_eq!(config.input_file, PathBuf::from("numbers.txt"));
        assert_eq!(config.backup_file, PathBuf::from("data_old.txt"));
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(cli.log_directive(), "rust_phone_enrich=trace");
    }
}

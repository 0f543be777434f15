use anyhow::{anyhow, Context, Result};
use clap::Parser;
use sink_api::{validate_object_root, CodecSelection, DEFAULT_OBJECT_ROOT};
use sink_state::logging::validate_filter;
use sink_state::SinkOptions;
use tracing::info;

/// Codecs offered besides SBC when none are given
pub const DEFAULT_CODECS: &str = "mp3,aac,aptx,aptxhd,ldac";

/// A2DP null sink
///
/// Registers media endpoints for the selected codecs on one Bluetooth adapter,
/// makes the adapter discoverable and pairable, accepts A2DP connections and
/// discards the audio.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "a2dp-null-sink")]
#[command(about = "A2DP sink that registers codec endpoints with BlueZ and discards the audio")]
#[command(version)]
pub struct Args {
    /// Adapter to register the endpoints on
    #[arg(short, long, default_value = "hci0")]
    pub adapter: String,

    /// Comma separated codecs to offer besides SBC: mp3, aac, aptx, aptxhd, ldac or none
    #[arg(short, long, default_value = DEFAULT_CODECS)]
    pub codec: String,

    /// Object path prefix for the served endpoints and agents
    #[arg(long, default_value = DEFAULT_OBJECT_ROOT)]
    pub object_root: String,

    /// Log level (error, warn, info, debug, trace) or a filter such as `sink_state=trace`
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Validate command line arguments
    pub fn validate(&self) -> Result<()> {
        if self.adapter.is_empty() {
            return Err(anyhow!("Adapter name must not be empty"));
        }

        // The name becomes part of the served object paths
        if !self
            .adapter
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(anyhow!(
                "Invalid adapter name '{}': only [A-Za-z0-9_] allowed",
                self.adapter
            ));
        }

        validate_object_root(&self.object_root)?;

        validate_filter(&self.log_level).with_context(|| {
            "Valid levels: error, warn, info, debug, trace, or a filter such as sink_state=trace"
        })?;

        Ok(())
    }

    /// Replace arguments with `A2DP_SINK_*` environment values where set
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(adapter) = lookup("A2DP_SINK_ADAPTER") {
            self.adapter = adapter;
        }

        if let Some(codecs) = lookup("A2DP_SINK_CODECS") {
            self.codec = codecs;
        }

        if let Some(root) = lookup("A2DP_SINK_OBJECT_ROOT") {
            self.object_root = root;
        }

        if let Some(level) = lookup("A2DP_SINK_LOG_LEVEL") {
            self.log_level = level;
        }
    }
}

/// Configuration derived from command line arguments and environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub adapter: String,
    pub codecs: CodecSelection,
    pub object_root: String,
    pub log_level: String,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            adapter: args.adapter,
            codecs: CodecSelection::from_list(&args.codec),
            object_root: args.object_root,
            log_level: args.log_level.to_lowercase(),
        }
    }
}

impl Config {
    /// Create configuration from command line arguments and environment variables
    pub fn from_env() -> Result<Self> {
        let mut args = Args::parse();
        args.apply_env_overrides(|name| std::env::var(name).ok());
        args.validate().context("Invalid configuration")?;
        Ok(Config::from(args))
    }

    /// Options carried in the sink context
    pub fn sink_options(&self) -> Result<SinkOptions> {
        Ok(SinkOptions::new(self.object_root.as_str(), self.codecs.clone())?)
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        let codecs: Vec<&str> = self.codecs.codecs().iter().map(|codec| codec.name()).collect();

        info!("Configuration:");
        info!("  Adapter: {}", self.adapter);
        info!("  Codecs: {}", codecs.join(", "));
        info!("  Object root: {}", self.object_root);
        info!("  Log level: {}", self.log_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use sink_api::Codec;
    use std::collections::HashMap;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["a2dp-null-sink"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = args(&[]);
        assert_eq!(args.adapter, "hci0");
        assert_eq!(args.codec, DEFAULT_CODECS);
        assert_eq!(args.object_root, "/test");
        assert_eq!(args.log_level, "info");
        assert!(args.validate().is_ok());

        let config = Config::from(args);
        assert_eq!(config.codecs.codecs(), &Codec::ALL);
    }

    #[test]
    fn test_short_flags() {
        let config = Config::from(args(&["-a", "hci1", "-c", "mp3,aac"]));
        assert_eq!(config.adapter, "hci1");
        assert_eq!(config.codecs.codecs(), &[Codec::Sbc, Codec::Mp3, Codec::Aac]);
    }

    #[test]
    fn test_env_overrides_win() {
        let env = HashMap::from([
            ("A2DP_SINK_ADAPTER", "hci2"),
            ("A2DP_SINK_CODECS", "none"),
            ("A2DP_SINK_LOG_LEVEL", "debug"),
        ]);
        let mut args = args(&["--adapter", "hci1"]);
        args.apply_env_overrides(|name| env.get(name).map(|value| value.to_string()));

        assert_eq!(args.adapter, "hci2");
        assert_eq!(args.codec, "none");
        assert_eq!(args.object_root, "/test");
        assert_eq!(args.log_level, "debug");
    }

    #[test]
    fn test_env_log_filter_expression_is_valid() {
        let mut args = args(&[]);
        args.apply_env_overrides(|name| {
            (name == "A2DP_SINK_LOG_LEVEL").then(|| "sink_state=trace".to_string())
        });

        assert!(args.validate().is_ok());
        assert_eq!(Config::from(args).log_level, "sink_state=trace");
    }

    #[rstest]
    #[case(&["--adapter", ""])]
    #[case(&["--adapter", "hci0/dev"])]
    #[case(&["--object-root", "test"])]
    #[case(&["--log-level", "loud"])]
    #[case(&["--log-level", "sink_state=loud"])]
    fn test_invalid_arguments(#[case] extra: &[&str]) {
        assert!(args(extra).validate().is_err());
    }

    #[test]
    fn test_unknown_codecs_are_kept_for_reporting() {
        let config = Config::from(args(&["--codec", "aac,opus"]));
        assert_eq!(config.codecs.codecs(), &[Codec::Sbc, Codec::Aac]);
        assert_eq!(config.codecs.ignored(), &["opus".to_string()]);
    }

    #[test]
    fn test_sink_options() {
        let config = Config::from(args(&["--object-root", "/org/example/sink"]));
        let options = config.sink_options().unwrap();
        assert_eq!(options.object_root(), "/org/example/sink");
    }
}

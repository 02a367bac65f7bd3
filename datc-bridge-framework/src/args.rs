//! CLI argument parsing for bridges.

use std::path::PathBuf;

use clap::Parser;

/// Common CLI arguments.
#[derive(Parser, Debug, Clone)]
#[command(about = "DATC gripper bridge")]
pub struct BridgeArgs {
    /// Path to configuration file (JSON5).
    #[arg(short, long)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl BridgeArgs {
    /// Parse CLI arguments, falling back to `default_config` when `--config` is absent.
    pub fn parse_with_default(default_config: &'static str) -> Self {
        let command = <Self as clap::CommandFactory>::command()
            .mut_arg("config", |arg| arg.default_value(default_config));

        Self::parse_from_command(command, std::env::args_os())
    }

    fn parse_from_command<I, T>(command: clap::Command, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = command.get_matches_from(args);
        match <Self as clap::FromArgMatches>::from_arg_matches(&matches) {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command_with_default() -> clap::Command {
        <BridgeArgs as clap::CommandFactory>::command()
            .mut_arg("config", |arg| arg.default_value("datc.json5"))
    }

    #[test]
    fn test_default_config_path() {
        let args = BridgeArgs::parse_from_command(command_with_default(), ["zenoh-bridge-datc"]);
        assert_eq!(args.config, PathBuf::from("datc.json5"));
        assert_eq!(args.log_level, None);
    }

    #[test]
    fn test_explicit_arguments() {
        let args = BridgeArgs::parse_from_command(
            command_with_default(),
            [
                "zenoh-bridge-datc",
                "--config",
                "/etc/datc/left.json5",
                "--log-level",
                "debug",
            ],
        );
        assert_eq!(args.config, PathBuf::from("/etc/datc/left.json5"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }
}

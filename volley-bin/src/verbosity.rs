//! `-v`/`-q` flags shared by all volley invocations.
//!
//! By default only warnings and errors are reported.
//! - `-q` only shows errors, `-qq` silences output
//! - `-v` show info
//! - `-vv` show debug
//! - `-vvv` show trace

use std::fmt;

use log::LevelFilter;
use serde::Deserialize;

/// Log verbosity, relative to the default of `warn`
#[derive(clap::Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Verbosity {
    /// More output per occurrence
    ///
    /// Passing `-v` one time prints info messages, `-vv` enables debug
    /// logging, which shows every request sent, and `-vvv` trace.
    #[arg(
        long,
        short = 'v',
        action = clap::ArgAction::Count,
        global = true,
        conflicts_with = "quiet",
    )]
    verbose: u8,

    /// Less output per occurrence
    #[arg(
        long,
        short = 'q',
        action = clap::ArgAction::Count,
        global = true,
        conflicts_with = "verbose",
    )]
    quiet: u8,
}

impl Verbosity {
    /// Get the log level filter.
    pub(crate) const fn log_level_filter(self) -> LevelFilter {
        level_filter(self.verbosity())
    }

    #[allow(clippy::cast_possible_wrap)]
    const fn verbosity(self) -> i8 {
        level_value(LevelFilter::Warn) - (self.quiet as i8) + (self.verbose as i8)
    }
}

// Deserialized from a level name like "info", "Warning" or "off" in the
// configuration file
impl<'de> Deserialize<'de> for Verbosity {
    #[allow(clippy::cast_sign_loss)]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let level = match s.to_lowercase().as_str() {
            "off" => LevelFilter::Off,
            "error" => LevelFilter::Error,
            "warn" | "warning" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            level => {
                return Err(serde::de::Error::custom(format!(
                    "invalid log level `{level}`"
                )));
            }
        };

        let offset = level_value(level) - level_value(LevelFilter::Warn);
        Ok(if offset >= 0 {
            Verbosity {
                verbose: offset as u8,
                quiet: 0,
            }
        } else {
            Verbosity {
                verbose: 0,
                quiet: offset.unsigned_abs(),
            }
        })
    }
}

const fn level_value(level: LevelFilter) -> i8 {
    match level {
        LevelFilter::Off => 0,
        LevelFilter::Error => 1,
        LevelFilter::Warn => 2,
        LevelFilter::Info => 3,
        LevelFilter::Debug => 4,
        LevelFilter::Trace => 5,
    }
}

const fn level_filter(verbosity: i8) -> LevelFilter {
    match verbosity {
        i8::MIN..=0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.log_level_filter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Cli {
        #[clap(flatten)]
        verbose: Verbosity,
    }

    #[test]
    fn verify_app() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_log_level() {
        assert_eq!(
            Verbosity::default().log_level_filter(),
            LevelFilter::Warn
        );
    }

    #[test]
    fn test_flags() {
        let verbosity = Cli::parse_from(["volley", "-vv"]).verbose;
        assert_eq!(verbosity.log_level_filter(), LevelFilter::Debug);

        let verbosity = Cli::parse_from(["volley", "-qq"]).verbose;
        assert_eq!(verbosity.log_level_filter(), LevelFilter::Off);
    }

    #[test]
    fn test_deserialize_level_name() {
        #[derive(Deserialize)]
        struct Config {
            verbose: Verbosity,
        }

        let config: Config = toml::from_str(r#"verbose = "Debug""#).unwrap();
        assert_eq!(config.verbose.log_level_filter(), LevelFilter::Debug);

        let config: Config = toml::from_str(r#"verbose = "error""#).unwrap();
        assert_eq!(config.verbose.log_level_filter(), LevelFilter::Error);

        assert!(toml::from_str::<Config>(r#"verbose = "loud""#).is_err());
    }
}

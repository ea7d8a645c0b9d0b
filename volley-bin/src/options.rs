use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{fs, time::Duration};

use anyhow::{Context, Error, Result, anyhow};
use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::Parser;
use const_format::formatcp;
use http::{
    HeaderMap,
    header::{HeaderName, HeaderValue},
};
use serde::{Deserialize, Deserializer};
use strum::{Display, EnumString, VariantNames};
use volley_lib::{DEFAULT_NEXT_FIELD, DEFAULT_USER_AGENT, RateLimitConfig};

use crate::verbosity::Verbosity;

pub(crate) const VOLLEY_CONFIG_FILE: &str = "volley.toml";

const STDIN: &str = "-";

// We use a custom help message here because we want to show the default
// value of the config file, but also be able to check if the user has
// provided a custom value. If they didn't, we won't throw an error if
// the file doesn't exist.
const HELP_MSG_CONFIG_FILE: &str = formatcp!(
    "Configuration file to use\n\n[default: {}]",
    VOLLEY_CONFIG_FILE,
);
const HELP_MSG_PAGINATE: &str = formatcp!(
    "Follow \"next page\" links found in this field of every response body, e.g. `{}` or a JSON pointer like `/links/next`",
    DEFAULT_NEXT_FIELD,
);

/// How the decoded responses are written
#[derive(Debug, Deserialize, Default, Clone, Copy, Display, EnumString, VariantNames, PartialEq, Eq)]
#[non_exhaustive]
pub(crate) enum OutputFormat {
    /// A pretty-printed JSON array with one element per request.
    /// Paginated requests yield an array of their pages.
    #[serde(rename = "json")]
    #[strum(serialize = "json", ascii_case_insensitive)]
    #[default]
    Json,

    /// One compact JSON value per line and per request
    #[serde(rename = "json-lines")]
    #[strum(serialize = "json-lines", ascii_case_insensitive)]
    JsonLines,

    /// A single JSON array holding every response body, with the pages of
    /// paginated requests spliced in
    #[serde(rename = "flat")]
    #[strum(serialize = "flat", ascii_case_insensitive)]
    Flat,
}

// Macro for generating default functions to be used by serde
macro_rules! default_function {
    ( $( $name:ident : $T:ty = $e:expr; )* ) => {
        $(
            #[allow(clippy::missing_const_for_fn)]
            fn $name() -> $T {
                $e
            }
        )*
    };
}

// Generate the functions for serde defaults
default_function! {
    user_agent: String = DEFAULT_USER_AGENT.to_string();
    verbosity: Verbosity = Verbosity::default();
}

// Macro for merging configuration values
macro_rules! fold_in {
    ($cli:ident , $toml:ident ; $ty:ident { $(..$ignore:ident,)* $( $key:ident : $default:expr, )* } ) => {
        if (false) {
            #[allow(dead_code, unused, clippy::diverging_sub_expression)]
            let _check_fold_in_exhaustivity = $ty {
                $($key: unreachable!(), )*
                $($ignore: unreachable!(), )*
            };
        };
        $(
            if $cli.$key == $default && $toml.$key != $default {
                $cli.$key = $toml.$key;
            }
        )*
    };
}

/// Parse a single header into a [`HeaderName`] and [`HeaderValue`]
///
/// Headers are expected to be in format `Header-Name: Header-Value`.
/// The header name and value are trimmed of whitespace. Everything after the
/// first colon is the value.
fn parse_single_header(header: &str) -> Result<(HeaderName, HeaderValue)> {
    let Some((name, value)) = header.split_once(':') else {
        return Err(anyhow!(
            "Invalid header format. Expected colon-separated string in the format 'HeaderName: HeaderValue'"
        ));
    };

    let name = name.trim();
    let name = HeaderName::from_str(name)
        .map_err(|e| anyhow!("Unable to convert header name '{name}': {e}"))?;
    let value = HeaderValue::from_str(value.trim())
        .map_err(|e| anyhow!("Unable to read value of header with name '{name}': {e}"))?;
    Ok((name, value))
}

/// Parses a `-H` argument into a (name, value) pair
#[derive(Clone, Debug)]
struct HeaderParser;

impl TypedValueParser for HeaderParser {
    type Value = (String, String);

    fn parse_ref(
        &self,
        _cmd: &clap::Command,
        _arg: Option<&clap::Arg>,
        value: &std::ffi::OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let invalid = |message: String| {
            clap::Error::raw(clap::error::ErrorKind::InvalidValue, message)
        };

        let header = value
            .to_str()
            .ok_or_else(|| invalid("Header contains invalid UTF-8".to_string()))?;
        let (name, value) = parse_single_header(header).map_err(|e| invalid(e.to_string()))?;
        let value = value
            .to_str()
            .map_err(|_| invalid("Header value contains invalid UTF-8".to_string()))?;

        Ok((name.to_string(), value.to_string()))
    }
}

impl clap::builder::ValueParserFactory for HeaderParser {
    type Parser = HeaderParser;
    fn value_parser() -> Self::Parser {
        HeaderParser
    }
}

/// Extension trait for converting a Vec of header pairs to a `HeaderMap`
pub(crate) trait HeaderMapExt {
    /// Convert a collection of header key-value pairs to a `HeaderMap`
    fn from_header_pairs(headers: &[(String, String)]) -> Result<HeaderMap, Error>;
}

impl HeaderMapExt for HeaderMap {
    fn from_header_pairs(headers: &[(String, String)]) -> Result<HeaderMap, Error> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| anyhow!("Invalid header name '{name}': {e}"))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| anyhow!("Invalid header value '{value}': {e}"))?;
            header_map.insert(header_name, header_value);
        }
        Ok(header_map)
    }
}

/// volley sends a batch of HTTP requests concurrently, within a rate limit
/// and a connection cap, and prints the decoded JSON responses.
///
/// Requests are described as JSON objects with a `url` and optionally
/// `method`, `params`, `headers`, `json`, `data` and `timeout`.
#[derive(Parser, Debug)]
#[command(version, about, next_display_order = None)]
pub(crate) struct VolleyOptions {
    /// Request descriptors to send
    #[arg(
        name = "input",
        default_value = STDIN,
        long_help = "Request descriptors to send. Either a JSON array of descriptors or
JSON Lines with one descriptor per line, read from a file or from standard
input (`-`, the default).

Example descriptor:

    {\"method\": \"GET\", \"url\": \"https://example.com/items\", \"params\": {\"page\": \"1\"}}"
    )]
    pub(crate) input: String,

    /// Configuration file to use
    #[arg(short, long = "config")]
    #[arg(help = HELP_MSG_CONFIG_FILE)]
    pub(crate) config_file: Option<PathBuf>,

    #[clap(flatten)]
    pub(crate) config: Config,
}

impl VolleyOptions {
    /// The input file, or `None` for stdin
    pub(crate) fn input_path(&self) -> Option<&Path> {
        (self.input != STDIN).then(|| Path::new(&self.input))
    }
}

// Custom deserializer function for the header field
fn deserialize_headers<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = HashMap::<String, String>::deserialize(deserializer)?;
    Ok(map.into_iter().collect())
}

/// The main configuration for volley
#[derive(Parser, Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct Config {
    /// Verbose program output
    #[clap(flatten)]
    #[serde(default = "verbosity")]
    pub(crate) verbose: Verbosity,

    /// Maximum number of requests sent per `--period`
    ///
    /// Must be given together with `--period`. Without both, requests are
    /// not rate limited. The limit also covers every page fetched with
    /// `--paginate`.
    ///
    /// Example:
    ///   --requests-per-period 10 --period 1s
    #[arg(long, value_name = "N", verbatim_doc_comment)]
    #[serde(default)]
    pub(crate) requests_per_period: Option<u32>,

    /// Length of a rate limit period, e.g. `1s` or `500ms`
    #[arg(long, value_parser = humantime::parse_duration)]
    #[serde(default, with = "humantime_serde")]
    pub(crate) period: Option<Duration>,

    /// Maximum number of simultaneous connections per host.
    /// `0` means unbounded
    #[arg(long, value_name = "N")]
    #[serde(default)]
    pub(crate) max_connections: Option<usize>,

    #[arg(long, value_name = "FIELD", help = HELP_MSG_PAGINATE)]
    #[serde(default)]
    pub(crate) paginate: Option<String>,

    /// Maximum number of pages fetched per request with `--paginate`
    #[arg(long, value_name = "N", requires = "paginate")]
    #[serde(default)]
    pub(crate) max_pages: Option<usize>,

    /// Response timeout per request, e.g. `30s`
    ///
    /// A `timeout` set on a single descriptor takes precedence.
    #[arg(short, long, value_parser = humantime::parse_duration)]
    #[serde(default, with = "humantime_serde")]
    pub(crate) timeout: Option<Duration>,

    /// User agent
    #[arg(short, long, default_value = DEFAULT_USER_AGENT)]
    #[serde(default = "user_agent")]
    pub(crate) user_agent: String,

    /// Set custom header for requests
    #[arg(
        short = 'H',
        long = "header",
        value_parser = HeaderParser,
        value_name = "HEADER:VALUE",
        long_help = "Set custom header for every request. Headers given in a descriptor take
precedence.

Example:
    --header 'Authorization: Bearer <token>'

Can be repeated to set multiple headers."
    )]
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_headers")]
    pub(crate) header: Vec<(String, String)>,

    /// Output format
    #[arg(
        short,
        long,
        default_value = "json",
        value_parser = PossibleValuesParser::new(OutputFormat::VARIANTS)
            .map(|s| s.parse::<OutputFormat>().unwrap())
    )]
    #[serde(default)]
    pub(crate) format: OutputFormat,

    /// Output file for the responses, instead of stdout
    #[arg(short, long, value_parser)]
    #[serde(default)]
    pub(crate) output: Option<PathBuf>,
}

impl Config {
    /// Merge headers, with the ones from the command line taking precedence
    fn merge_headers(&mut self, file: &[(String, String)]) {
        let cli_map = self.header.iter().cloned().collect::<HashMap<_, _>>();
        let file_map = file.iter().cloned().collect::<HashMap<_, _>>();

        let merged_map: HashMap<_, _> = file_map.into_iter().chain(cli_map).collect();
        self.header = merged_map.into_iter().collect();
    }

    /// Load configuration from a file
    pub(crate) fn load_from_file(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents).with_context(|| "Failed to parse configuration file")
    }

    /// Merge the configuration from TOML into the CLI configuration
    pub(crate) fn merge(&mut self, toml: Config) {
        self.merge_headers(&toml.header);

        // NOTE: if you see an error within this macro call, check to make sure that
        // that the fields provided to fold_in! match all the fields of the Config struct.
        fold_in! {
            // Destination and source configs
            self, toml;

            Config {
                // Keys which are handled outside of fold_in
                ..header,

                // Keys with defaults to assign
                verbose: Verbosity::default(),
                requests_per_period: None,
                period: None,
                max_connections: None,
                paginate: None,
                max_pages: None,
                timeout: None,
                user_agent: DEFAULT_USER_AGENT,
                format: OutputFormat::default(),
                output: None,
            }
        }
    }

    /// The rate limit given by `--requests-per-period` and `--period`
    pub(crate) const fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig::from_options(self.requests_per_period, self.period)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_custom_headers() {
        assert_eq!(
            parse_single_header("accept:text/html").unwrap(),
            (
                HeaderName::from_static("accept"),
                HeaderValue::from_static("text/html")
            )
        );
    }

    #[test]
    fn test_parse_custom_header_with_colons_in_value() {
        let (name, value) = parse_single_header("Authorization: Bearer a:b:c").unwrap();
        assert_eq!(name, HeaderName::from_static("authorization"));
        assert_eq!(value, HeaderValue::from_static("Bearer a:b:c"));
    }

    #[test]
    fn test_parse_invalid_header() {
        assert!(parse_single_header("no-colon").is_err());
        assert!(parse_single_header("in valid: name").is_err());
    }

    #[test]
    fn test_header_map_from_pairs() {
        let pairs = vec![("X-Api-Key".to_string(), "secret".to_string())];
        let map = HeaderMap::from_header_pairs(&pairs).unwrap();
        assert_eq!(map.get("x-api-key").unwrap(), "secret");
    }

    #[test]
    fn test_cli_options() {
        let opts = VolleyOptions::parse_from([
            "volley",
            "--requests-per-period",
            "10",
            "--period",
            "1s",
            "--max-connections",
            "4",
            "--paginate",
            "next",
            "-H",
            "X-Api-Key: secret",
            "--format",
            "json-lines",
            "requests.json",
        ]);

        assert_eq!(opts.input_path(), Some(Path::new("requests.json")));
        assert_eq!(
            opts.config.rate_limit(),
            RateLimitConfig::from_options(Some(10), Some(Duration::from_secs(1)))
        );
        assert_eq!(opts.config.max_connections, Some(4));
        assert_eq!(opts.config.paginate.as_deref(), Some("next"));
        assert_eq!(
            opts.config.header,
            vec![("x-api-key".to_string(), "secret".to_string())]
        );
        assert_eq!(opts.config.format, OutputFormat::JsonLines);
    }

    #[test]
    fn test_stdin_is_default_input() {
        let opts = VolleyOptions::parse_from(["volley"]);
        assert_eq!(opts.input_path(), None);
        assert_eq!(opts.config.format, OutputFormat::Json);
        assert_eq!(opts.config.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_max_pages_requires_paginate() {
        assert!(VolleyOptions::try_parse_from(["volley", "--max-pages", "3"]).is_err());
    }

    #[test]
    fn test_merge_fills_defaults_only() {
        let mut cli = VolleyOptions::parse_from([
            "volley",
            "--max-connections",
            "2",
            "-H",
            "X-Api-Key: cli",
        ])
        .config;
        let file: Config = toml::from_str(
            r#"
            requests_per_period = 5
            period = "2s"
            max_connections = 8
            format = "flat"

            [header]
            x-api-key = "file"
            accept = "application/json"
            "#,
        )
        .unwrap();

        cli.merge(file);

        assert_eq!(cli.requests_per_period, Some(5));
        assert_eq!(cli.period, Some(Duration::from_secs(2)));
        assert_eq!(cli.max_connections, Some(2));
        assert_eq!(cli.format, OutputFormat::Flat);

        let headers = HeaderMap::from_header_pairs(&cli.header).unwrap();
        assert_eq!(headers.get("x-api-key").unwrap(), "cli");
        assert_eq!(headers.get("accept").unwrap(), "application/json");
    }

    #[test]
    fn test_unknown_config_key_is_rejected() {
        assert!(toml::from_str::<Config>("concurrency = 3").is_err());
    }
}

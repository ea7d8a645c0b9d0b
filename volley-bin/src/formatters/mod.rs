pub(crate) mod log;
pub(crate) mod output;

use self::output::OutputFormatter;
use crate::options::OutputFormat;

/// Create an output formatter based on the given format option
pub(crate) fn get_output_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(output::Json),
        OutputFormat::JsonLines => Box::new(output::JsonLines),
        OutputFormat::Flat => Box::new(output::Flat),
    }
}

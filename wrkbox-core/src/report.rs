use chrono::Utc;

use crate::output::BenchmarkOutput;
use crate::suite::SuiteReport;

/// Sink for a suite report and the outputs of its runs.
///
/// `write` is called once, before any run has completed; `write_output` once
/// per completed run. Implementations buffer as they like but must have
/// flushed everything once `finish` returns, and call `finish` from `Drop`
/// when the caller did not, so an early return still leaves a complete file.
pub trait ReportWriter {
    type Error: std::error::Error;

    fn file_name(&self) -> &str;

    fn write(&mut self, report: &SuiteReport) -> Result<(), Self::Error>;

    fn write_output(
        &mut self,
        report: &SuiteReport,
        output: &BenchmarkOutput,
    ) -> Result<(), Self::Error>;

    fn finish(&mut self) -> Result<(), Self::Error>;
}

/// `<prefix>-<utc timestamp>.<extension>`, for writers given no file name.
pub fn default_file_name(prefix: &str, extension: &str) -> String {
    format!(
        "{}-{}.{}",
        prefix,
        Utc::now().format("%Y%m%d-%H%M%S"),
        extension.trim_start_matches('.')
    )
}

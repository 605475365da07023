use std::path::Path;

use rust_xlsxwriter::{ColNum, RowNum, Workbook, Worksheet, XlsxError};
use tracing::{info, warn};
use wrkbox_core::{BenchmarkOutput, Metric, ReportWriter, SuiteReport, ThreadStats};

use crate::{Error, Result};

const RUN_COLUMNS: &[&str] = &[
    "Run",
    "URL",
    "Passed",
    "Start",
    "End",
    "Requests",
    "Duration (s)",
    "Bytes read",
    "Requests/sec",
    "Transfer/sec (bytes)",
    "Latency avg (ms)",
    "Latency stdev (ms)",
    "Latency max (ms)",
    "Latency +/- stdev (%)",
    "Req/Sec avg",
    "Req/Sec stdev",
    "Req/Sec max",
    "Req/Sec +/- stdev (%)",
    "Connect errors",
    "Read errors",
    "Write errors",
    "Timeouts",
    "Non-2xx/3xx",
    "Other errors",
];

const VERDICT_COLUMNS: &[&str] = &["Run", "URL", "Goal", "Passed", "Detail"];

const PERCENTILE_COLUMNS: &[&str] = &["Run", "URL", "Percentile", "Latency (ms)"];

struct Sheets {
    suite: Worksheet,
    runs: Worksheet,
    verdicts: Worksheet,
    percentiles: Worksheet,
    run_count: u32,
    verdict_row: RowNum,
    percentile_row: RowNum,
}

impl Sheets {
    fn new() -> std::result::Result<Self, XlsxError> {
        let mut suite = Worksheet::new();
        suite.set_name("Suite")?;
        let mut runs = Worksheet::new();
        runs.set_name("Runs")?;
        header_row(&mut runs, RUN_COLUMNS)?;
        let mut verdicts = Worksheet::new();
        verdicts.set_name("Verdicts")?;
        header_row(&mut verdicts, VERDICT_COLUMNS)?;
        let mut percentiles = Worksheet::new();
        percentiles.set_name("Percentiles")?;
        header_row(&mut percentiles, PERCENTILE_COLUMNS)?;
        Ok(Self {
            suite,
            runs,
            verdicts,
            percentiles,
            run_count: 0,
            verdict_row: 1,
            percentile_row: 1,
        })
    }

    fn write_suite(&mut self, report: &SuiteReport) -> std::result::Result<(), XlsxError> {
        let suite = &report.suite;
        let sheet = &mut self.suite;
        let optional = |value: Option<String>| value.unwrap_or_default();
        let fields = [
            ("Name", suite.name.clone()),
            ("Id", suite.id.to_string()),
            ("Location", optional(suite.location.clone())),
            ("Public IP", optional(suite.public_ip.clone())),
            (
                "Scripts dir",
                optional(suite.scripts_dir.as_ref().map(|p| p.display().to_string())),
            ),
            ("Start", optional(suite.start_time.map(|t| t.to_rfc3339()))),
            ("End", optional(suite.end_time.map(|t| t.to_rfc3339()))),
        ];
        let mut row: RowNum = 0;
        for (label, value) in fields {
            sheet.write_string(row, 0, label)?;
            sheet.write_string(row, 1, value)?;
            row += 1;
        }

        row += 1;
        header_row_at(
            sheet,
            row,
            &["URL", "Threads", "Connections", "Duration", "Rate", "Script"],
        )?;
        for config in &suite.configs {
            row += 1;
            sheet.write_string(row, 0, config.url.as_str())?;
            sheet.write_number(row, 1, config.threads)?;
            sheet.write_number(row, 2, config.connections)?;
            sheet.write_string(row, 3, config.duration.as_str())?;
            if let Some(rate) = config.rate {
                sheet.write_number(row, 4, rate)?;
            }
            if let Some(script) = &config.script {
                sheet.write_string(row, 5, script.as_str())?;
            }
        }

        row += 2;
        sheet.write_string(row, 0, "Goals")?;
        for goal in &suite.goals {
            row += 1;
            sheet.write_string(row, 0, goal.describe())?;
        }
        Ok(())
    }

    fn write_run(
        &mut self,
        report: &SuiteReport,
        output: &BenchmarkOutput,
    ) -> std::result::Result<(), XlsxError> {
        self.run_count += 1;
        let run = self.run_count;
        let row: RowNum = run;
        let url = output
            .header()
            .map(|h| h.url.clone())
            .or_else(|| {
                report
                    .suite
                    .configs
                    .get(run as usize - 1)
                    .map(|c| c.url.clone())
            })
            .unwrap_or_default();
        let verdicts = report.evaluate(output);
        let totals = output.totals();
        let errors = output.errors().copied().unwrap_or_default();

        let sheet = &mut self.runs;
        sheet.write_number(row, 0, run)?;
        sheet.write_string(row, 1, url.as_str())?;
        sheet.write_boolean(row, 2, verdicts.iter().all(|v| v.passed))?;
        sheet.write_string(row, 3, output.start_time().to_rfc3339())?;
        sheet.write_string(row, 4, output.end_time().to_rfc3339())?;
        sheet.write_number(row, 5, totals.request_count as f64)?;
        sheet.write_number(row, 6, totals.duration_seconds)?;
        sheet.write_number(row, 7, totals.bytes_read as f64)?;
        sheet.write_number(row, 8, totals.requests_per_second)?;
        sheet.write_number(row, 9, totals.transfer_bytes_per_second)?;
        thread_stats(sheet, row, 10, output.latency())?;
        thread_stats(sheet, row, 14, output.throughput())?;
        let counters = [
            errors.connect,
            errors.read,
            errors.write,
            errors.timeout,
            errors.non_2xx_3xx_count,
            errors.other,
        ];
        for (offset, count) in counters.into_iter().enumerate() {
            sheet.write_number(row, 18 + offset as ColNum, count as f64)?;
        }

        for verdict in &verdicts {
            let row = self.verdict_row;
            let sheet = &mut self.verdicts;
            sheet.write_number(row, 0, run)?;
            sheet.write_string(row, 1, url.as_str())?;
            sheet.write_string(row, 2, verdict.goal_description.as_str())?;
            sheet.write_boolean(row, 3, verdict.passed)?;
            sheet.write_string(row, 4, verdict.detail.as_str())?;
            self.verdict_row += 1;
        }

        for entry in output.percentiles() {
            let row = self.percentile_row;
            let sheet = &mut self.percentiles;
            sheet.write_number(row, 0, run)?;
            sheet.write_string(row, 1, url.as_str())?;
            sheet.write_number(row, 2, entry.percentile)?;
            sheet.write_number(row, 3, entry.latency_ms)?;
            self.percentile_row += 1;
        }
        Ok(())
    }

    fn save(self, file_name: &str) -> std::result::Result<(), XlsxError> {
        let mut workbook = Workbook::new();
        workbook.push_worksheet(self.suite);
        workbook.push_worksheet(self.runs);
        workbook.push_worksheet(self.verdicts);
        workbook.push_worksheet(self.percentiles);
        workbook.save(file_name)
    }
}

fn header_row(sheet: &mut Worksheet, columns: &[&str]) -> std::result::Result<(), XlsxError> {
    header_row_at(sheet, 0, columns)
}

fn header_row_at(
    sheet: &mut Worksheet,
    row: RowNum,
    columns: &[&str],
) -> std::result::Result<(), XlsxError> {
    for (col, title) in columns.iter().enumerate() {
        sheet.write_string(row, col as ColNum, *title)?;
    }
    Ok(())
}

// Undefined and infinite samples are written as the text wrk printed.
fn metric(
    sheet: &mut Worksheet,
    row: RowNum,
    col: ColNum,
    value: Metric,
) -> std::result::Result<(), XlsxError> {
    match value.value() {
        Some(number) => sheet.write_number(row, col, number)?,
        None => sheet.write_string(row, col, value.to_string())?,
    };
    Ok(())
}

fn thread_stats(
    sheet: &mut Worksheet,
    row: RowNum,
    col: ColNum,
    stats: &ThreadStats,
) -> std::result::Result<(), XlsxError> {
    metric(sheet, row, col, stats.average)?;
    metric(sheet, row, col + 1, stats.stdev)?;
    metric(sheet, row, col + 2, stats.max)?;
    metric(sheet, row, col + 3, stats.percent_above_stdev)
}

/// Writes a suite report as an Excel workbook with `Suite`, `Runs`,
/// `Verdicts` and `Percentiles` sheets. The workbook is kept in memory and
/// saved by `finish`.
pub struct XlsxReportWriter {
    file_name: String,
    sheets: Option<Sheets>,
}

impl XlsxReportWriter {
    pub const EXTENSION: &'static str = "xlsx";

    pub fn create(file_name: Option<String>) -> Result<Self> {
        let file_name = file_name
            .unwrap_or_else(|| wrkbox_core::default_file_name("wrk-report", Self::EXTENSION));
        Ok(Self {
            file_name,
            sheets: Some(Sheets::new()?),
        })
    }

    /// Like [`create`](Self::create), with the file placed under `dir`.
    pub fn create_in(dir: impl AsRef<Path>, file_name: Option<String>) -> Result<Self> {
        let file_name = file_name
            .unwrap_or_else(|| wrkbox_core::default_file_name("wrk-report", Self::EXTENSION));
        Self::create(Some(dir.as_ref().join(file_name).to_string_lossy().into_owned()))
    }

    fn sheets(&mut self) -> Result<&mut Sheets> {
        self.sheets
            .as_mut()
            .ok_or_else(|| Error::WriterFinished(self.file_name.clone()))
    }
}

impl ReportWriter for XlsxReportWriter {
    type Error = Error;

    fn file_name(&self) -> &str {
        &self.file_name
    }

    fn write(&mut self, report: &SuiteReport) -> Result<()> {
        self.sheets()?.write_suite(report)?;
        Ok(())
    }

    fn write_output(&mut self, report: &SuiteReport, output: &BenchmarkOutput) -> Result<()> {
        self.sheets()?.write_run(report, output)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(sheets) = self.sheets.take() {
            sheets.save(&self.file_name)?;
            info!("Report written to {}", self.file_name);
        }
        Ok(())
    }
}

impl Drop for XlsxReportWriter {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!("Failed to save report {}: {}", self.file_name, e);
        }
    }
}

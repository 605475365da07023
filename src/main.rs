mod cli;
mod error;

pub mod prelude {
    pub use crate::error::*;
    pub use tracing::{debug, error, info, warn};
}

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::Parser;
use console::style;
use dotenvy::dotenv;
use humanize_bytes::humanize_bytes_binary;
use prelude::*;
use uuid::Uuid;
use wrkbox_core::{BenchmarkOutput, ReportWriter, RunReport, SuiteReport};
use wrkbox_storage::{Config, XlsxReportWriter, YamlReportWriter};

fn main() -> Result<()> {
    dotenv().ok();
    let cli = cli::Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    info!(
        "{} v{}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION")
    );

    match cli.command {
        cli::Commands::Parse { file, start, end } => {
            let now = Utc::now();
            let output = parse_file(
                &file,
                start.unwrap_or(now),
                end.unwrap_or(now),
                Uuid::new_v4(),
            )?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        cli::Commands::Evaluate {
            suite,
            files,
            out,
            out_dir,
            format,
            strict,
            start,
            end,
        } => {
            let config = Config::load(&cli.config)?;
            let suite = config
                .get_suite(&suite)
                .cloned()
                .ok_or_else(|| Error::SuiteNotFound(suite.clone()))?;
            if files.len() != suite.configs.len() {
                return Err(Error::InputCount {
                    expected: suite.configs.len(),
                    actual: files.len(),
                });
            }

            let now = Utc::now();
            let start = start.or(suite.start_time).unwrap_or(now);
            let end = end.or(suite.end_time).unwrap_or(now);

            let mut report = SuiteReport::new(suite);
            let report_file = match format {
                cli::ReportFormat::Yaml => evaluate(
                    YamlReportWriter::create_in(&out_dir, out)?,
                    &mut report,
                    &files,
                    (start, end),
                )?,
                cli::ReportFormat::Xlsx => evaluate(
                    XlsxReportWriter::create_in(&out_dir, out)?,
                    &mut report,
                    &files,
                    (start, end),
                )?,
            };

            let failed = report.failed_verdicts();
            info!(
                "Suite {} evaluated, {} failed goal(s), report: {}",
                report.suite.name, failed, report_file
            );
            if strict && failed > 0 {
                return Err(Error::GoalsFailed(failed));
            }
        }
    }

    Ok(())
}

/// Parses each report in config order, records its verdicts and writes it
/// out. Returns the report file name.
fn evaluate<W>(
    mut writer: W,
    report: &mut SuiteReport,
    files: &[PathBuf],
    (start, end): (DateTime<Utc>, DateTime<Utc>),
) -> Result<String>
where
    W: ReportWriter<Error = wrkbox_storage::Error>,
{
    writer.write(report)?;
    for (index, file) in files.iter().enumerate() {
        let output = parse_file(file, start, end, report.suite.id)?;
        writer.write_output(report, &output)?;
        print_run(report.record(index, &output));
    }
    writer.finish()?;
    Ok(writer.file_name().to_string())
}

fn parse_file(
    path: &Path,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    suite_id: Uuid,
) -> Result<BenchmarkOutput> {
    debug!("Parsing {}", path.display());
    let raw = fs::read_to_string(path)?;
    let output = BenchmarkOutput::parse(&raw, start, end, suite_id)?;
    let totals = output.totals();
    info!(
        "{}: {} requests in {:.2}s, {} read, {:.2} req/sec",
        path.display(),
        totals.request_count,
        totals.duration_seconds,
        humanize_bytes_binary!(totals.bytes_read),
        totals.requests_per_second
    );
    Ok(output)
}

fn print_run(run: &RunReport) {
    let target = run.url.as_deref().unwrap_or("<unknown target>");
    println!("{}", style(target).bold());
    if run.verdicts.is_empty() {
        println!("  {}", style("no goals declared").dim());
    }
    for verdict in &run.verdicts {
        let mark = if verdict.passed {
            style("✔").green()
        } else {
            style("✘").red()
        };
        println!(
            "  {} {} {}",
            mark,
            verdict.goal_description,
            style(format!("({})", verdict.detail)).dim()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parse_file_reads_report() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(include_bytes!("../wrkbox-core/testdata/wrk2_with_errors.txt"))
            .unwrap();

        let now = Utc::now();
        let id = Uuid::new_v4();
        let output = parse_file(file.path(), now, now, id).unwrap();
        assert_eq!(output.suite_id(), id);
        assert_eq!(output.totals().request_count, 120);
    }

    #[test]
    fn parse_file_rejects_other_text() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"curl: (7) Failed to connect\n").unwrap();

        let now = Utc::now();
        let result = parse_file(file.path(), now, now, Uuid::nil());
        assert!(matches!(
            result,
            Err(Error::OutputError(wrkbox_core::Error::OutputParse(_)))
        ));
    }

    #[test]
    fn evaluate_writes_workbook_and_records_runs() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(include_bytes!("../wrkbox-core/testdata/wrk2_with_errors.txt"))
            .unwrap();

        let mut suite = wrkbox_core::BenchmarkSuite::new(
            "example",
            vec![wrkbox_core::BenchmarkConfig::new("http://localhost:44555")],
        );
        suite.goals = vec![wrkbox_core::Goal::NoErrors];
        let mut report = SuiteReport::new(suite);

        let now = Utc::now();
        let report_file = evaluate(
            XlsxReportWriter::create_in(dir.path(), None).unwrap(),
            &mut report,
            &[file.path().to_path_buf()],
            (now, now),
        )
        .unwrap();

        assert!(report_file.ends_with(".xlsx"));
        assert!(Path::new(&report_file).is_file());
        assert_eq!(report.runs.len(), 1);
        assert_eq!(report.failed_verdicts(), 1);
    }
}

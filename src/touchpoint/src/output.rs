//! Writers for attribution and ROI tables.

use std::io::Write;

use serde::Serialize;
use touchpoint_core::OutputFormat;
use touchpoint_reporting::{AttributionMatrix, AttributionOutput, RoiReport, UShapedPivot};

pub fn write_attribution<W: Write>(
    output: &AttributionOutput,
    format: OutputFormat,
    out: W,
) -> anyhow::Result<()> {
    match (format, output) {
        (OutputFormat::Json, _) => write_json(output, out),
        (OutputFormat::Csv, AttributionOutput::Matrix(matrix)) => write_matrix_csv(matrix, out),
        (OutputFormat::Csv, AttributionOutput::Pivot(pivot)) => write_pivot_csv(pivot, out),
    }
}

pub fn write_roi<W: Write>(report: &RoiReport, format: OutputFormat, out: W) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => write_json(report, out),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            writer.write_record(["channel", "gmv", "costs", "roi_percent"])?;
            for row in &report.rows {
                writer.write_record([
                    row.channel.clone(),
                    row.gmv.to_string(),
                    row.costs.to_string(),
                    row.roi_percent.to_string(),
                ])?;
            }
            writer.flush()?;
            Ok(())
        }
    }
}

fn write_matrix_csv<W: Write>(matrix: &AttributionMatrix, out: W) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec!["week".to_string(), "user_id".to_string()];
    header.extend(matrix.channels.iter().cloned());
    header.push("total_gmv".to_string());
    writer.write_record(&header)?;

    for row in &matrix.rows {
        let mut record = vec![row.week.to_string(), row.user_id.to_string()];
        record.extend(row.amounts.iter().map(f64::to_string));
        record.push(row.total_gmv.to_string());
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_pivot_csv<W: Write>(pivot: &UShapedPivot, out: W) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header = vec!["user_id".to_string()];
    header.extend(pivot.channels.iter().cloned());
    writer.write_record(&header)?;

    for row in &pivot.rows {
        let mut record = vec![row.user_id.to_string()];
        record.extend(row.values.iter().map(f64::to_string));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json<T: Serialize, W: Write>(value: &T, mut out: W) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

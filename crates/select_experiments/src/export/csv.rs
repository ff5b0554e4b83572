use crate::error::Result;
use crate::runner::SelectionReport;

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub(crate) fn export_to_csv_impl(reports: &[SelectionReport], file: std::fs::File) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(file);

    wtr.write_record([
        "experiment_id",
        "seed",
        "procedure",
        "termination",
        "guarantee",
        "waves",
        "replications_submitted",
        "scenario",
        "selected",
        "active",
        "replications",
        "mean",
        "std_dev",
    ])?;

    for report in reports {
        let outcome = &report.outcome;
        let termination = format!("{:?}", outcome.termination);
        let guarantee = format!("{:?}", outcome.guarantee);
        for row in &report.scenarios {
            let selected = report.selected_name.as_deref() == Some(row.name.as_str());
            wtr.write_record([
                report.experiment_id.as_str(),
                &report.seed.to_string(),
                report.procedure.as_str(),
                &termination,
                &guarantee,
                &outcome.waves.to_string(),
                &outcome.replications_submitted.to_string(),
                &row.name,
                &selected.to_string(),
                &row.active.to_string(),
                &row.replications.to_string(),
                &optional(row.mean),
                &optional(row.std_dev),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

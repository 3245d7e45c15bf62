use crate::domain::model::{ComplianceCreateInput, ComplianceStatus, FuelType};
use crate::utils::error::{LedgerError, Result};
use serde::Deserialize;
use std::io::Read;

/// One CSV row as written by the upstream ingestion job.
#[derive(Debug, Deserialize)]
struct RecordRow {
    ship_id: String,
    route_id: String,
    voyage_id: String,
    fuel_type: String,
    fuel_consumption: f64,
    energy_content: f64,
    ghg_intensity: f64,
    #[serde(default)]
    compliance_status: Option<String>,
    reporting_period: String,
}

impl RecordRow {
    fn into_input(self, line: usize) -> Result<ComplianceCreateInput> {
        let at_line = |e: LedgerError| match e {
            LedgerError::Validation {
                field,
                value,
                reason,
            } => LedgerError::Validation {
                field,
                value,
                reason: format!("{} (line {})", reason, line),
            },
            other => other,
        };

        let fuel_type: FuelType = self.fuel_type.parse().map_err(at_line)?;
        let compliance_status = match self.compliance_status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(status) => Some(status.parse::<ComplianceStatus>().map_err(at_line)?),
        };

        Ok(ComplianceCreateInput {
            ship_id: self.ship_id,
            route_id: self.route_id,
            voyage_id: self.voyage_id,
            fuel_type,
            fuel_consumption: self.fuel_consumption,
            energy_content: self.energy_content,
            ghg_intensity: self.ghg_intensity,
            compliance_status,
            reporting_period: self.reporting_period,
        })
    }
}

/// Reads headed CSV rows into create inputs. Fails on the first bad row.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<ComplianceCreateInput>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut inputs = Vec::new();
    for (index, row) in csv_reader.deserialize::<RecordRow>().enumerate() {
        // header is line 1
        inputs.push(row?.into_input(index + 2)?);
    }
    Ok(inputs)
}

pub fn read_records_from_path(path: &std::path::Path) -> Result<Vec<ComplianceCreateInput>> {
    let file = std::fs::File::open(path)?;
    read_records(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
ship_id,route_id,voyage_id,fuel_type,fuel_consumption,energy_content,ghg_intensity,compliance_status,reporting_period
V001,R001,VY1,HFO,5000,205000000,91.0,NON_COMPLIANT,2024
V002,R002,VY2,lng,4800,196800000,88.0,,2024
";

    #[test]
    fn test_reads_rows() {
        let inputs = read_records(SAMPLE.as_bytes()).unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[0].fuel_type, FuelType::Hfo);
        assert_eq!(inputs[0].compliance_status, Some(ComplianceStatus::NonCompliant));
        assert_eq!(inputs[1].fuel_type, FuelType::Lng);
        assert_eq!(inputs[1].compliance_status, None);
        assert_eq!(inputs[1].ghg_intensity, 88.0);
    }

    #[test]
    fn test_bad_fuel_reports_line() {
        let data = "\
ship_id,route_id,voyage_id,fuel_type,fuel_consumption,energy_content,ghg_intensity,compliance_status,reporting_period
V001,R001,VY1,COAL,1,1,1,,2024
";
        let err = read_records(data.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_non_numeric_is_csv_error() {
        let data = "\
ship_id,route_id,voyage_id,fuel_type,fuel_consumption,energy_content,ghg_intensity,compliance_status,reporting_period
V001,R001,VY1,HFO,lots,1,1,,2024
";
        assert!(matches!(
            read_records(data.as_bytes()),
            Err(LedgerError::CsvError(_))
        ));
    }
}

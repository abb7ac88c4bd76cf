//! Patient report generation.
//!
//! Posts the patient details to `/generate_pdf` and saves the returned
//! document. Progress goes through the same status reporter as dispatch.

use crate::client::HttpDispatchClient;
use crate::status::StatusReporter;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};

pub const DEFAULT_REPORT_FILE: &str = "patient_report.pdf";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRequest {
    pub patient_name: String,
    pub patient_condition: String,
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Please fill in all fields (missing {0})")]
    MissingField(&'static str),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Report service rejected request (HTTP {0})")]
    Rejected(u16),

    #[error("Could not save report: {0}")]
    Io(#[from] std::io::Error),
}

impl ReportRequest {
    /// Build a request from raw form input. Both fields must be non-blank.
    pub fn new(patient_name: &str, patient_condition: &str) -> Result<Self, ReportError> {
        let patient_name = patient_name.trim();
        let patient_condition = patient_condition.trim();
        if patient_name.is_empty() {
            return Err(ReportError::MissingField("patient name"));
        }
        if patient_condition.is_empty() {
            return Err(ReportError::MissingField("patient condition"));
        }
        Ok(Self {
            patient_name: patient_name.to_string(),
            patient_condition: patient_condition.to_string(),
        })
    }
}

/// POST the request and return the document bytes.
pub async fn fetch_report(
    client: &HttpDispatchClient,
    request: &ReportRequest,
) -> Result<Vec<u8>, ReportError> {
    let response = client
        .http()
        .post(client.url("/generate_pdf"))
        .json(request)
        .send()
        .await
        .map_err(|e| ReportError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ReportError::Rejected(status.as_u16()));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ReportError::Network(e.to_string()))?;
    Ok(bytes.to_vec())
}

/// Generate the report and write it to `out`, narrating the result.
pub async fn generate_report(
    client: &HttpDispatchClient,
    reporter: &dyn StatusReporter,
    request: &ReportRequest,
    out: &Path,
) -> Result<usize, ReportError> {
    reporter.set_busy(true);
    reporter.set_narrative(&format!("Generating report for {}...", request.patient_name));

    let result = async {
        let bytes = fetch_report(client, request).await?;
        tokio::fs::write(out, &bytes).await?;
        Ok::<_, ReportError>(bytes.len())
    }
    .await;

    reporter.set_busy(false);
    match &result {
        Ok(len) => {
            info!("Saved {} byte report to {}", len, out.display());
            reporter.set_narrative(&format!("Report saved to {}.", out.display()));
        }
        Err(e) => {
            error!("Error generating PDF: {}", e);
            reporter.set_narrative("Error generating PDF. Please try again.");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_fields_rejected() {
        assert!(matches!(
            ReportRequest::new("  ", "stable"),
            Err(ReportError::MissingField("patient name"))
        ));
        assert!(matches!(
            ReportRequest::new("Ram", "\t"),
            Err(ReportError::MissingField("patient condition"))
        ));
    }

    #[test]
    fn test_fields_are_trimmed() {
        let r = ReportRequest::new(" Ram Thapa ", "fracture ").unwrap();
        assert_eq!(r.patient_name, "Ram Thapa");
        assert_eq!(r.patient_condition, "fracture");
    }

    #[test]
    fn test_wire_field_names() {
        let r = ReportRequest::new("Ram", "stable").unwrap();
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["patient_name"], "Ram");
        assert_eq!(v["patient_condition"], "stable");
    }
}

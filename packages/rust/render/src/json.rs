//! JSON rendering: the report model, pretty-printed.

use epicreport_shared::{ReportError, ReportModel, Result};

pub fn render(model: &ReportModel) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(model)
        .map_err(|e| ReportError::Render(format!("failed to serialize report: {e}")))?;
    bytes.push(b'\n');
    Ok(bytes)
}

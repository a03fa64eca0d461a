//! Terraform output extraction

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::LauncherError;

/// Placeholder Terraform emits while an attribute is unknown
pub const SENTINEL: &str = "N/A";

pub const PUBLIC_IP_KEY: &str = "public_ip";
pub const VSCODE_SERVER_URL_KEY: &str = "vscode_server_url";

/// Outputs read from a successful apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedOutputs {
    pub public_ip: String,
    pub vscode_server_url: Option<String>,
}

/// Parse the document printed by `terraform output -json`
///
/// The document maps output names to objects carrying a `value`. Keys other
/// than `public_ip` and `vscode_server_url` are ignored.
pub fn extract(raw: &str) -> Result<ExtractedOutputs, LauncherError> {
    let document: Value =
        serde_json::from_str(raw).map_err(|e| LauncherError::MalformedOutput(e.to_string()))?;

    let outputs = document.as_object().ok_or_else(|| {
        LauncherError::MalformedOutput("expected a JSON object of outputs".to_string())
    })?;

    let public_ip = output_value(outputs, PUBLIC_IP_KEY)?
        .ok_or_else(|| LauncherError::NotReady(format!("{PUBLIC_IP_KEY} is not assigned yet")))?;
    let vscode_server_url = output_value(outputs, VSCODE_SERVER_URL_KEY)?;

    Ok(ExtractedOutputs {
        public_ip,
        vscode_server_url,
    })
}

/// Read `outputs[key].value` as a populated string
///
/// Missing keys, null, empty and sentinel values are all `None`.
fn output_value(outputs: &Map<String, Value>, key: &str) -> Result<Option<String>, LauncherError> {
    let Some(entry) = outputs.get(key) else {
        return Ok(None);
    };

    let entry = entry
        .as_object()
        .ok_or_else(|| LauncherError::MalformedOutput(format!("output {key} is not an object")))?;

    let value = match entry.get("value") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(_) => {
            return Err(LauncherError::MalformedOutput(format!(
                "output {key} does not hold a scalar value"
            )))
        }
    };

    if value.is_empty() || value == SENTINEL {
        Ok(None)
    } else {
        Ok(Some(value))
    }
}

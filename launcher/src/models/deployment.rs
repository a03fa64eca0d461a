//! Deployment models

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::LauncherError;
use crate::utils::redact;

/// Message returned when a required scalar field is missing
pub const MISSING_FIELDS_MESSAGE: &str = "AWS credentials, region, and AMI ID are required";

/// Deploy request body as submitted by the web form
///
/// Holds plaintext credentials, so it is converted into a
/// [`DeploymentRequest`] right away and never logged.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployForm {
    #[serde(default)]
    pub aws_access_key: Option<String>,

    #[serde(default)]
    pub aws_secret_key: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub ami_id: Option<String>,

    #[serde(default, deserialize_with = "deserialize_toggle")]
    pub install_docker: bool,

    #[serde(default, deserialize_with = "deserialize_toggle")]
    pub install_node: bool,

    #[serde(default, rename = "installVSCode", deserialize_with = "deserialize_toggle")]
    pub install_vscode: bool,

    #[serde(default, deserialize_with = "deserialize_toggle")]
    pub install_nginx: bool,
}

/// Toggles arrive either as JSON booleans or as the strings "true"/"false"
fn deserialize_toggle<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::String(s) => s == "true",
        _ => false,
    })
}

/// Software to install on the instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureToggles {
    pub install_docker: bool,
    pub install_node: bool,
    #[serde(rename = "installVSCode")]
    pub install_vscode: bool,
    pub install_nginx: bool,
}

impl FeatureToggles {
    /// Toggles as named Terraform variables
    pub fn variables(&self) -> [(&'static str, &'static str); 4] {
        let flag = |b: bool| if b { "true" } else { "false" };
        [
            ("install_docker", flag(self.install_docker)),
            ("install_node", flag(self.install_node)),
            ("install_vscode", flag(self.install_vscode)),
            ("install_nginx", flag(self.install_nginx)),
        ]
    }
}

/// A validated, immutable deployment request
#[derive(Debug)]
pub struct DeploymentRequest {
    access_key: SecretString,
    secret_key: SecretString,
    region: String,
    ami_id: String,
    toggles: FeatureToggles,
}

impl DeploymentRequest {
    /// Build a request, failing if any scalar field is empty
    pub fn new(
        access_key: SecretString,
        secret_key: SecretString,
        region: impl Into<String>,
        ami_id: impl Into<String>,
        toggles: FeatureToggles,
    ) -> Result<Self, LauncherError> {
        let region = region.into().trim().to_string();
        let ami_id = ami_id.into().trim().to_string();

        if access_key.expose_secret().trim().is_empty()
            || secret_key.expose_secret().trim().is_empty()
            || region.is_empty()
            || ami_id.is_empty()
        {
            return Err(LauncherError::ValidationError(
                MISSING_FIELDS_MESSAGE.to_string(),
            ));
        }

        Ok(Self {
            access_key,
            secret_key,
            region,
            ami_id,
            toggles,
        })
    }

    pub fn access_key(&self) -> &SecretString {
        &self.access_key
    }

    pub fn secret_key(&self) -> &SecretString {
        &self.secret_key
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn ami_id(&self) -> &str {
        &self.ami_id
    }

    pub fn toggles(&self) -> FeatureToggles {
        self.toggles
    }

    /// One-line description that is safe to log
    pub fn describe(&self) -> String {
        format!(
            "access_key={} secret_key={} region={} ami_id={} docker={} node={} vscode={} nginx={}",
            redact(self.access_key.expose_secret()),
            redact(self.secret_key.expose_secret()),
            self.region,
            self.ami_id,
            self.toggles.install_docker,
            self.toggles.install_node,
            self.toggles.install_vscode,
            self.toggles.install_nginx,
        )
    }
}

impl TryFrom<DeployForm> for DeploymentRequest {
    type Error = LauncherError;

    fn try_from(form: DeployForm) -> Result<Self, Self::Error> {
        let missing = || LauncherError::ValidationError(MISSING_FIELDS_MESSAGE.to_string());

        let toggles = FeatureToggles {
            install_docker: form.install_docker,
            install_node: form.install_node,
            install_vscode: form.install_vscode,
            install_nginx: form.install_nginx,
        };

        DeploymentRequest::new(
            SecretString::from(form.aws_access_key.ok_or_else(missing)?),
            SecretString::from(form.aws_secret_key.ok_or_else(missing)?),
            form.region.ok_or_else(missing)?,
            form.ami_id.ok_or_else(missing)?,
            toggles,
        )
    }
}

//! Provisioning backend driving the Terraform CLI

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::debug;

use crate::errors::LauncherError;
use crate::models::deployment::DeploymentRequest;
use crate::deploy::process::{Invocation, ProcessRunner, TokioProcessRunner};

/// The provisioning capabilities the deployment pipeline needs
#[async_trait]
pub trait ProvisioningBackend: Send + Sync {
    /// Prepare the working directory; takes no job parameters
    async fn initialize(&self) -> Result<(), LauncherError>;

    /// Create the instance described by `request`
    async fn apply(&self, request: &DeploymentRequest) -> Result<(), LauncherError>;

    /// Read the raw output document
    async fn fetch_outputs(&self) -> Result<String, LauncherError>;
}

/// Terraform backend options
#[derive(Debug, Clone)]
pub struct TerraformOptions {
    /// Terraform executable
    pub binary: String,

    /// Directory holding the Terraform configuration
    pub working_dir: PathBuf,

    /// Upper bound for a single Terraform command
    pub command_timeout: Duration,
}

impl Default for TerraformOptions {
    fn default() -> Self {
        Self {
            binary: "terraform".to_string(),
            working_dir: PathBuf::from("terraform"),
            command_timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// Backend that shells out to `terraform`
pub struct TerraformBackend {
    options: TerraformOptions,
    runner: Arc<dyn ProcessRunner>,
}

impl TerraformBackend {
    pub fn new(options: TerraformOptions) -> Self {
        let runner = Arc::new(TokioProcessRunner::new(options.command_timeout));
        Self::with_runner(options, runner)
    }

    pub fn with_runner(options: TerraformOptions, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { options, runner }
    }

    fn terraform(&self) -> Invocation {
        Invocation::new(&self.options.binary).current_dir(&self.options.working_dir)
    }

    /// `terraform init`
    pub fn init_invocation(&self) -> Invocation {
        self.terraform().args(["init", "-input=false", "-no-color"])
    }

    /// `terraform apply` with every request field as a named variable
    ///
    /// Variables travel as `TF_VAR_*` environment entries on the child so
    /// the credentials stay off the command line.
    pub fn apply_invocation(&self, request: &DeploymentRequest) -> Invocation {
        let access_key = request.access_key().expose_secret();
        let secret_key = request.secret_key().expose_secret();

        let mut invocation = self
            .terraform()
            .args(["apply", "-auto-approve", "-input=false", "-no-color"])
            .env("AWS_ACCESS_KEY_ID", access_key)
            .env("AWS_SECRET_ACCESS_KEY", secret_key)
            .env("AWS_DEFAULT_REGION", request.region())
            .env("TF_VAR_aws_access_key", access_key)
            .env("TF_VAR_aws_secret_key", secret_key)
            .env("TF_VAR_region", request.region())
            .env("TF_VAR_ami_id", request.ami_id());

        for (name, value) in request.toggles().variables() {
            invocation = invocation.env(format!("TF_VAR_{name}"), value);
        }

        invocation
    }

    /// `terraform output -json`
    pub fn output_invocation(&self) -> Invocation {
        self.terraform().args(["output", "-json", "-no-color"])
    }

    async fn run_checked(&self, invocation: Invocation) -> Result<String, LauncherError> {
        let output = self.runner.run(&invocation).await?;
        let output = output.into_success(&invocation.command_line())?;
        debug!("{} stdout:\n{}", invocation.command_line(), output.stdout);
        Ok(output.stdout)
    }
}

#[async_trait]
impl ProvisioningBackend for TerraformBackend {
    async fn initialize(&self) -> Result<(), LauncherError> {
        self.run_checked(self.init_invocation()).await.map(|_| ())
    }

    async fn apply(&self, request: &DeploymentRequest) -> Result<(), LauncherError> {
        self.run_checked(self.apply_invocation(request)).await.map(|_| ())
    }

    async fn fetch_outputs(&self) -> Result<String, LauncherError> {
        self.run_checked(self.output_invocation()).await
    }
}

//! The step definition.

use std::fmt;

use crate::error::Result;

use super::context::StepContext;

/// Action that performs a configuration change.
pub type ApplyFn = Box<dyn Fn(&mut StepContext<'_>) -> Result<()> + Send + Sync>;

/// Idempotent check; `Ok(true)` means the change is already in place.
pub type VerifyFn = Box<dyn Fn(&mut StepContext<'_>) -> Result<bool> + Send + Sync>;

/// A named, idempotent unit of provisioning work.
///
/// # Example
///
/// ```
/// use provisor::steps::Step;
///
/// let step = Step::new("firewall")
///     .requires(["system_packages"])
///     .critical(false)
///     .verify(|ctx| Ok(ctx.probe("ufw", &["status"])?.stdout.contains("active")))
///     .apply(|ctx| {
///         ctx.run("ufw", &["--force", "enable"])?;
///         Ok(())
///     });
///
/// assert_eq!(step.name(), "firewall");
/// assert_eq!(step.prerequisites(), ["system_packages".to_string()]);
/// assert!(!step.is_critical());
/// ```
pub struct Step {
    name: String,
    description: Option<String>,
    requires: Vec<String>,
    critical: bool,
    apply: ApplyFn,
    verify: Option<VerifyFn>,
}

impl Step {
    /// Create a critical step with no prerequisites and a no-op action.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            requires: Vec::new(),
            critical: true,
            apply: Box::new(|_| Ok(())),
            verify: None,
        }
    }

    /// Add prerequisite step names. Duplicates are ignored.
    pub fn requires<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !self.requires.contains(&name) {
                self.requires.push(name);
            }
        }
        self
    }

    /// Whether a failure aborts the whole run.
    pub fn critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    /// One-line description for plans and progress output.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the action that performs the change.
    pub fn apply<F>(mut self, apply: F) -> Self
    where
        F: Fn(&mut StepContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.apply = Box::new(apply);
        self
    }

    /// Set the idempotence check.
    pub fn verify<F>(mut self, verify: F) -> Self
    where
        F: Fn(&mut StepContext<'_>) -> Result<bool> + Send + Sync + 'static,
    {
        self.verify = Some(Box::new(verify));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn summary(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Prerequisite step names, in declaration order.
    pub fn prerequisites(&self) -> &[String] {
        &self.requires
    }

    pub fn is_critical(&self) -> bool {
        self.critical
    }

    pub fn has_verify(&self) -> bool {
        self.verify.is_some()
    }

    pub(crate) fn run_apply(&self, ctx: &mut StepContext<'_>) -> Result<()> {
        (self.apply)(ctx)
    }

    /// `None` when the step has no verify action.
    pub(crate) fn run_verify(&self, ctx: &mut StepContext<'_>) -> Option<Result<bool>> {
        self.verify.as_ref().map(|verify| verify(ctx))
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("requires", &self.requires)
            .field("critical", &self.critical)
            .field("has_verify", &self.verify.is_some())
            .finish()
    }
}

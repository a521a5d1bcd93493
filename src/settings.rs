//! Tool settings
//!
//! Loaded with the `config` crate from an optional `rvecase.toml` (or the file
//! passed with `--config`), with `RVECASE__*` environment variables layered on
//! top. Nested keys use `__`, e.g. `RVECASE__RUNNER__NPROC=8`.

use std::path::Path;

use json::JsonValue;
use serde::Deserialize;

use crate::error::RveError;

/// Default relative tolerance for the isotropic Hooke's law check
pub const DEFAULT_HOOKE_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fallback tracing filter when `RUST_LOG` is not set
    pub log_level: String,
    /// Allowed relative deviation of `G` from `E / (2 (1 + v))` for orthotropic
    /// materials with constant triplets
    pub hooke_tolerance: f64,
    /// Require the resolved mesh files to exist when building a plan
    pub check_mesh: bool,
    pub runner: RunnerDefaults,
}

/// Job runner options a case document may override through `runnerOptions`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunnerDefaults {
    #[serde(rename = "override")]
    pub override_existing: bool,
    /// Working directory of the solver job, relative to the case document
    pub run_location: String,
    pub jobname: String,
    pub nproc: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            log_level: "info".to_owned(),
            hooke_tolerance: DEFAULT_HOOKE_TOLERANCE,
            check_mesh: false,
            runner: RunnerDefaults::default(),
        }
    }
}

impl Default for RunnerDefaults {
    fn default() -> Self {
        RunnerDefaults {
            override_existing: true,
            run_location: "ansys_working".to_owned(),
            jobname: "rve_tester".to_owned(),
            nproc: 4,
        }
    }
}

impl RunnerDefaults {
    /// The defaults in `runnerOptions` form
    pub fn to_json(&self) -> JsonValue {
        let mut options = JsonValue::new_object();
        options["override"] = self.override_existing.into();
        options["run_location"] = self.run_location.as_str().into();
        options["jobname"] = self.jobname.as_str().into();
        options["nproc"] = self.nproc.into();
        options
    }
}

impl Settings {
    /// Loads settings from a file and the environment
    ///
    /// # Arguments
    /// * `path` - Explicit settings file. When `None`, `rvecase.toml` in the
    ///   working directory is used if it exists.
    ///
    /// # Returns
    /// The validated settings; defaults for every key not given
    pub fn load(path: Option<&Path>) -> Result<Settings, RveError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("rvecase").required(false),
        };

        let settings: Settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("RVECASE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), RveError> {
        if !self.hooke_tolerance.is_finite() || self.hooke_tolerance < 0.0 {
            return Err(RveError::Settings(format!(
                "hooke_tolerance must be a non-negative number, got {}",
                self.hooke_tolerance
            )));
        }
        if self.runner.nproc == 0 {
            return Err(RveError::Settings(
                "runner.nproc must be at least 1".to_owned(),
            ));
        }
        if self.runner.jobname.trim().is_empty() {
            return Err(RveError::Settings("runner.jobname must not be empty".to_owned()));
        }
        Ok(())
    }
}

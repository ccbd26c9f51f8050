//! Startup configuration: decides between the real and the fake world.

use std::collections::HashMap;
use std::path::Path;

use ::config::{Config, Environment};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Environment variable that disables real MPI.
pub const DISABLE_MPI_VAR: &str = "DISABLE_MPI";

/// Which communicator the process runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Real multi-process execution through MPI.
    Real,
    /// Single-process stand-in; MPI is never touched.
    Disabled,
}

impl Mode {
    /// Interpret the raw `DISABLE_MPI` value.
    ///
    /// Only `true` and `1`, compared case-insensitively, disable MPI. Any
    /// other value, including an absent one, keeps it enabled.
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some(value) if value.eq_ignore_ascii_case("true") || value == "1" => Mode::Disabled,
            _ => Mode::Real,
        }
    }

    pub fn is_disabled(self) -> bool {
        self == Mode::Disabled
    }
}

/// MPI bootstrap configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpiConfig {
    /// Raw value of the disable flag, kept as text so that only the exact
    /// spellings accepted by [`Mode::from_flag`] disable MPI.
    #[serde(default)]
    pub disable_mpi: Option<String>,
}

impl MpiConfig {
    /// Load configuration from the process environment.
    ///
    /// Only `DISABLE_MPI` is looked at. A value that is not valid UTF-8 is
    /// read lossily and therefore never disables MPI.
    pub fn load() -> Result<Self> {
        let flag = std::env::var_os(DISABLE_MPI_VAR).map(|value| value.to_string_lossy().into_owned());
        Self::from_flag_value(flag)
    }

    /// Load configuration from an explicit variable map instead of the
    /// process environment.
    ///
    /// Variable names are matched exactly; `disable_mpi` is not `DISABLE_MPI`.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        Self::from_flag_value(vars.get(DISABLE_MPI_VAR).cloned())
    }

    /// Load a TOML file, then let the environment override it.
    ///
    /// A missing file is treated as empty.
    pub fn load_with_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::read_file(path.as_ref())?.merge(Self::load()?))
    }

    /// Like [`load_with_file`](Self::load_with_file), with `vars` standing in
    /// for the process environment.
    pub fn from_file_and_vars<P: AsRef<Path>>(path: P, vars: HashMap<String, String>) -> Result<Self> {
        Ok(Self::read_file(path.as_ref())?.merge(Self::from_vars(vars)?))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Values set in `other` take precedence.
    pub fn merge(self, other: Self) -> Self {
        Self {
            disable_mpi: other.disable_mpi.or(self.disable_mpi),
        }
    }

    pub fn mode(&self) -> Mode {
        Mode::from_flag(self.disable_mpi.as_deref())
    }

    fn read_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml_str(&content)
        } else {
            tracing::debug!(path = %path.display(), "no configuration file, using environment only");
            Ok(Self::default())
        }
    }

    fn from_flag_value(flag: Option<String>) -> Result<Self> {
        // The source holds at most the one variable, so key folding inside
        // `Environment` cannot merge it with anything else.
        let vars: HashMap<String, String> = flag
            .into_iter()
            .map(|value| (DISABLE_MPI_VAR.to_string(), value))
            .collect();
        let config = Config::builder()
            .add_source(Environment::default().source(Some(vars)))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn disabling_values() {
        for value in ["true", "TRUE", "True", "tRuE", "1"] {
            assert_eq!(Mode::from_flag(Some(value)), Mode::Disabled, "value {:?}", value);
        }
    }

    #[test]
    fn enabling_values() {
        for value in ["0", "false", "FALSE", "yes", "", " true", "1 ", "01"] {
            assert_eq!(Mode::from_flag(Some(value)), Mode::Real, "value {:?}", value);
        }
        assert_eq!(Mode::from_flag(None), Mode::Real);
    }

    #[test]
    fn reads_flag_from_variables() {
        let config = MpiConfig::from_vars(vars(&[(DISABLE_MPI_VAR, "True"), ("HOME", "/root")])).unwrap();
        assert_eq!(config.disable_mpi.as_deref(), Some("True"));
        assert!(config.mode().is_disabled());
    }

    #[test]
    fn missing_flag_means_real() {
        let config = MpiConfig::from_vars(vars(&[("PATH", "/usr/bin")])).unwrap();
        assert_eq!(config.disable_mpi, None);
        assert_eq!(config.mode(), Mode::Real);
    }

    #[test]
    fn numeric_flag_stays_text() {
        let config = MpiConfig::from_vars(vars(&[(DISABLE_MPI_VAR, "1")])).unwrap();
        assert_eq!(config.disable_mpi.as_deref(), Some("1"));
        assert_eq!(config.mode(), Mode::Disabled);
    }

    #[test]
    fn parses_toml() {
        let config = MpiConfig::from_toml_str("disable_mpi = \"true\"\n").unwrap();
        assert!(config.mode().is_disabled());

        let empty = MpiConfig::from_toml_str("").unwrap();
        assert_eq!(empty, MpiConfig::default());
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            MpiConfig::from_toml_str("disable_mpi = "),
            Err(crate::Error::ConfigFile(_))
        ));
    }

    #[test]
    fn variable_name_is_case_sensitive() {
        for name in ["disable_mpi", "Disable_Mpi", "DISABLE_mpi"] {
            let config = MpiConfig::from_vars(vars(&[(name, "1")])).unwrap();
            assert_eq!(config.disable_mpi, None, "name {:?}", name);
            assert_eq!(config.mode(), Mode::Real, "name {:?}", name);
        }
    }

    #[test]
    fn exact_name_wins_over_folded_names() {
        for _ in 0..50 {
            let config = MpiConfig::from_vars(vars(&[
                (DISABLE_MPI_VAR, "0"),
                ("Disable_Mpi", "1"),
                ("disable_mpi", "true"),
            ]))
            .unwrap();
            assert_eq!(config.mode(), Mode::Real);
        }
    }

    #[test]
    fn environment_overrides_file() {
        let file = MpiConfig { disable_mpi: Some("1".to_string()) };
        let env = MpiConfig { disable_mpi: Some("0".to_string()) };
        assert_eq!(file.clone().merge(env).mode(), Mode::Real);
        assert_eq!(file.merge(MpiConfig::default()).mode(), Mode::Disabled);
    }
}

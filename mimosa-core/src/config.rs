//! Settings for dependency extraction and the warm-start search.
//!
//! All fields have defaults, so a TOML document only needs the values it changes:
//!
//! ```toml
//! [extraction]
//! representative_region = "USA"
//! region_sampling = "all"
//!
//! [warm_start]
//! upper_bound_start = 0.5
//! ```

use crate::errors::{SimError, SimResult};
use crate::index::Label;
use serde::{Deserialize, Serialize};

/// Which regions are sampled when extracting dependencies of regional equations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionSampling {
    /// Only the representative region; dependencies are assumed identical for all regions
    #[default]
    Representative,
    /// Every region, failing if any region differs from the representative one
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractionConfig {
    /// Timestep at which equations are traced. Must not be the initial timestep.
    pub timestep: usize,
    /// Region used for regional equations, the first region if unset
    pub representative_region: Option<Label>,
    pub region_sampling: RegionSampling,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            timestep: 1,
            representative_region: None,
            region_sampling: RegionSampling::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WarmStartConfig {
    /// Time × region variable set from the trajectory
    pub control_variable: String,
    /// Time-only variable whose final value is maximised
    pub objective_variable: String,
    pub lower_bound: f64,
    /// Upper bound at the first timestep
    pub upper_bound_start: f64,
    /// Increase of the upper bound from the first to the last timestep
    pub upper_bound_growth: f64,
    /// Start point as a weighting between the bounds: `p * lower + (1 - p) * upper`
    pub start_fraction: f64,
    pub max_iterations: usize,
    /// Finite difference step for the gradient
    pub gradient_step: f64,
    pub max_line_search_steps: usize,
}

impl Default for WarmStartConfig {
    fn default() -> Self {
        Self {
            control_variable: "relative_abatement".to_string(),
            objective_variable: "NPV".to_string(),
            lower_bound: 0.0,
            upper_bound_start: 0.75,
            upper_bound_growth: 1.5,
            start_fraction: 0.7,
            max_iterations: 1,
            gradient_step: 1e-6,
            max_line_search_steps: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub extraction: ExtractionConfig,
    pub warm_start: WarmStartConfig,
}

impl SimulationConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> SimResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| SimError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SimResult<()> {
        self.extraction.validate()?;
        self.warm_start.validate()
    }
}

impl ExtractionConfig {
    pub fn validate(&self) -> SimResult<()> {
        if self.timestep == 0 {
            return Err(SimError::InvalidConfig(
                "extraction.timestep must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl WarmStartConfig {
    pub fn validate(&self) -> SimResult<()> {
        let invalid = |msg: &str| Err(SimError::InvalidConfig(format!("warm_start.{}", msg)));

        if self.control_variable.is_empty() || self.objective_variable.is_empty() {
            return invalid("control_variable and objective_variable must be set");
        }
        if !(self.upper_bound_start >= self.lower_bound) {
            return invalid("upper_bound_start must not be below lower_bound");
        }
        if !(self.upper_bound_growth >= 0.0) {
            return invalid("upper_bound_growth must not be negative");
        }
        if !(0.0..=1.0).contains(&self.start_fraction) {
            return invalid("start_fraction must be between 0 and 1");
        }
        if !(self.gradient_step > 0.0) {
            return invalid("gradient_step must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = SimulationConfig::from_toml_str("").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.extraction.timestep, 1);
        assert_eq!(config.warm_start.objective_variable, "NPV");
    }

    #[test]
    fn partial_document() {
        let config = SimulationConfig::from_toml_str(
            r#"
            [extraction]
            representative_region = "USA"
            region_sampling = "all"

            [warm_start]
            upper_bound_start = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(
            config.extraction.representative_region,
            Some(Label::from("USA"))
        );
        assert_eq!(config.extraction.region_sampling, RegionSampling::All);
        assert_eq!(config.warm_start.upper_bound_start, 0.5);
        assert_eq!(config.warm_start.upper_bound_growth, 1.5);
    }

    #[test]
    fn toml_round_trip() {
        let mut config = SimulationConfig::default();
        config.extraction.representative_region = Some(Label::from("EU"));
        config.warm_start.max_iterations = 3;

        let serialised = toml::to_string(&config).unwrap();
        let restored = SimulationConfig::from_toml_str(&serialised).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let cases = [
            "[extraction]\ntimestep = 0",
            "[warm_start]\nstart_fraction = 1.5",
            "[warm_start]\ngradient_step = 0.0",
            "[warm_start]\nlower_bound = 1.0\nupper_bound_start = 0.5",
            "[extraction]\nunknown = 1",
            "[extraction]\nregion_sampling = \"some\"",
        ];
        for case in cases {
            let result = SimulationConfig::from_toml_str(case);
            assert!(
                matches!(result, Err(SimError::InvalidConfig(_))),
                "accepted {:?}",
                case
            );
        }
    }
}

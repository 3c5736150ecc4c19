//! An in-memory symbolic model and the assembly of the standard equation set.
//!
//! [`InMemoryModel`] stands in for the optimisation framework: it declares variables
//! and parameters, holds their data and receives initial values from a warm start.

use crate::equations::{
    DamageParameters, Damages, Economics, EconomicsParameters, Emissions, EmissionsParameters,
    Mitigation, MitigationParameters, Temperature, TemperatureParameters, Welfare,
    WelfareParameters,
};
use crate::standard_variables::{
    StandardVariable, SCALAR_DT, VAR_BASELINE_EMISSIONS, VAR_DAMAGE_COEFFICIENT,
    VAR_MAC_COEFFICIENT, VAR_POPULATION, VAR_RELATIVE_ABATEMENT, VAR_TFP,
};
use mimosa_core::equation::{Equation, EquationSet};
use mimosa_core::errors::{SimError, SimResult};
use mimosa_core::index::{Dimension, Label};
use mimosa_core::state::{SymbolicModel, VariableDeclaration};
use mimosa_core::variable::{FloatValue, VariableKind};
use ndarray::{Array1, Array2, ArrayD};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Declarations, data and solver initial values of a model
#[derive(Debug, Clone, Default)]
pub struct InMemoryModel {
    time_labels: Vec<Label>,
    region_labels: Vec<Label>,
    declarations: BTreeMap<String, VariableDeclaration>,
    scalars: BTreeMap<String, FloatValue>,
    initial_values: BTreeMap<String, BTreeMap<Vec<Label>, FloatValue>>,
}

impl InMemoryModel {
    pub fn new<T: Into<Label>, R: Into<Label>>(
        time_labels: impl IntoIterator<Item = T>,
        region_labels: impl IntoIterator<Item = R>,
    ) -> Self {
        Self {
            time_labels: time_labels.into_iter().map(Into::into).collect(),
            region_labels: region_labels.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn declare(&mut self, declaration: VariableDeclaration) -> &mut Self {
        self.declarations
            .insert(declaration.name.clone(), declaration);
        self
    }

    pub fn add_scalar(&mut self, name: &str, value: FloatValue) -> &mut Self {
        self.scalars.insert(name.to_string(), value);
        self
    }

    /// Declare the outputs of `set` and return its equations
    pub fn add_equation_set(&mut self, set: &dyn EquationSet) -> Vec<Equation> {
        for declaration in set.declarations() {
            self.declare(declaration);
        }
        set.equations()
    }

    pub fn declaration(&self, name: &str) -> Option<&VariableDeclaration> {
        self.declarations.get(name)
    }

    /// The initial value set for one element, if any
    pub fn initial_value(&self, name: &str, key: &[Label]) -> Option<FloatValue> {
        self.initial_values.get(name)?.get(key).copied()
    }

    /// Number of elements with an initial value
    pub fn n_initial_values(&self) -> usize {
        self.initial_values.values().map(BTreeMap::len).sum()
    }

    fn labels(&self, dimension: Dimension) -> &[Label] {
        match dimension {
            Dimension::Time => &self.time_labels,
            Dimension::Region => &self.region_labels,
        }
    }
}

impl SymbolicModel for InMemoryModel {
    fn time_labels(&self) -> Vec<Label> {
        self.time_labels.clone()
    }

    fn region_labels(&self) -> Vec<Label> {
        self.region_labels.clone()
    }

    fn declarations(&self) -> Vec<VariableDeclaration> {
        self.declarations.values().cloned().collect()
    }

    fn scalars(&self) -> Vec<(String, FloatValue)> {
        self.scalars
            .iter()
            .map(|(name, value)| (name.clone(), *value))
            .collect()
    }

    fn set_initial_value(&mut self, name: &str, key: &[Label], value: FloatValue) -> SimResult<()> {
        let declaration = self
            .declarations
            .get(name)
            .filter(|d| d.kind == VariableKind::Variable)
            .ok_or_else(|| SimError::UnknownVariable(name.to_string()))?;
        if key.len() != declaration.dims.len() {
            return Err(SimError::DimensionMismatch {
                variable: name.to_string(),
                expected: declaration.dims.len(),
                got: key.len(),
            });
        }
        for (label, dimension) in key.iter().zip(&declaration.dims) {
            if !self.labels(*dimension).contains(label) {
                return Err(SimError::UnknownLabel {
                    variable: name.to_string(),
                    dimension: dimension.to_string(),
                    label: label.to_string(),
                });
            }
        }

        self.initial_values
            .entry(name.to_string())
            .or_default()
            .insert(key.to_vec(), value);
        Ok(())
    }
}

/// Exogenous data of the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelData {
    pub years: Vec<i64>,
    pub regions: Vec<String>,
    /// unit: million people (time × region)
    pub population: Array2<FloatValue>,
    /// time × region
    pub total_factor_productivity: Array2<FloatValue>,
    /// unit: GtCO2 / yr (time × region)
    pub baseline_emissions: Array2<FloatValue>,
    /// unit: 1 / K^2 (region)
    pub damage_coefficient: Array1<FloatValue>,
    /// unit: USD / tCO2 (region)
    pub mac_coefficient: Array1<FloatValue>,
}

impl ModelData {
    /// Smoothly growing data for `regions`, starting at `start_year` every `step` years
    pub fn synthetic(regions: &[&str], start_year: i64, step: i64, n_timesteps: usize) -> Self {
        let shape = (n_timesteps, regions.len());
        let growth = |rate: FloatValue, t: usize| (1.0 + rate).powf((step * t as i64) as FloatValue);
        Self {
            years: (0..n_timesteps).map(|t| start_year + step * t as i64).collect(),
            regions: regions.iter().map(|r| r.to_string()).collect(),
            population: Array2::from_shape_fn(shape, |(t, r)| {
                (200.0 + 150.0 * r as FloatValue) * growth(0.005, t)
            }),
            total_factor_productivity: Array2::from_shape_fn(shape, |(t, r)| {
                0.08 * (1.0 + 0.1 * r as FloatValue) * growth(0.01, t)
            }),
            baseline_emissions: Array2::from_shape_fn(shape, |(t, r)| {
                (5.0 + 2.0 * r as FloatValue) * growth(0.01, t)
            }),
            damage_coefficient: Array1::from_shape_fn(regions.len(), |r| 0.004 + 0.001 * r as FloatValue),
            mac_coefficient: Array1::from_shape_fn(regions.len(), |r| 400.0 + 100.0 * r as FloatValue),
        }
    }

    /// Years between timesteps, one for a single timestep
    pub fn dt(&self) -> FloatValue {
        match self.years.as_slice() {
            [first, second, ..] => (second - first) as FloatValue,
            _ => 1.0,
        }
    }

    fn validate(&self) -> SimResult<()> {
        let time_region = [self.years.len(), self.regions.len()];
        for (name, shape) in [
            (VAR_POPULATION.name, self.population.shape()),
            (VAR_TFP.name, self.total_factor_productivity.shape()),
            (VAR_BASELINE_EMISSIONS.name, self.baseline_emissions.shape()),
        ] {
            if shape != time_region {
                return Err(SimError::ShapeMismatch {
                    variable: name.to_string(),
                    expected: time_region.to_vec(),
                    got: shape.to_vec(),
                });
            }
        }
        for (name, values) in [
            (VAR_DAMAGE_COEFFICIENT.name, &self.damage_coefficient),
            (VAR_MAC_COEFFICIENT.name, &self.mac_coefficient),
        ] {
            if values.len() != self.regions.len() {
                return Err(SimError::ShapeMismatch {
                    variable: name.to_string(),
                    expected: vec![self.regions.len()],
                    got: vec![values.len()],
                });
            }
        }
        Ok(())
    }
}

/// Parameters of every equation module
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParameters {
    pub emissions: EmissionsParameters,
    pub temperature: TemperatureParameters,
    pub damages: DamageParameters,
    pub mitigation: MitigationParameters,
    pub economics: EconomicsParameters,
    pub welfare: WelfareParameters,
}

fn parameter(variable: StandardVariable, dims: &[Dimension], values: ArrayD<FloatValue>) -> VariableDeclaration {
    VariableDeclaration::parameter(variable.name, dims, values).with_unit(variable.unit)
}

/// Declare the data and the relative abatement control, and collect the equations of
/// every module
pub fn build_model(
    data: &ModelData,
    parameters: &ModelParameters,
) -> SimResult<(InMemoryModel, Vec<Equation>)> {
    data.validate()?;
    let time_region = [Dimension::Time, Dimension::Region];
    let region = [Dimension::Region];

    let mut model = InMemoryModel::new(
        data.years.iter().copied(),
        data.regions.iter().map(String::as_str),
    );
    model
        .declare(parameter(VAR_POPULATION, &time_region, data.population.clone().into_dyn()))
        .declare(parameter(
            VAR_TFP,
            &time_region,
            data.total_factor_productivity.clone().into_dyn(),
        ))
        .declare(parameter(
            VAR_BASELINE_EMISSIONS,
            &time_region,
            data.baseline_emissions.clone().into_dyn(),
        ))
        .declare(parameter(
            VAR_DAMAGE_COEFFICIENT,
            &region,
            data.damage_coefficient.clone().into_dyn(),
        ))
        .declare(parameter(
            VAR_MAC_COEFFICIENT,
            &region,
            data.mac_coefficient.clone().into_dyn(),
        ))
        .declare(VAR_RELATIVE_ABATEMENT.variable(&time_region))
        .add_scalar(SCALAR_DT, data.dt());

    let modules: Vec<Box<dyn EquationSet>> = vec![
        Box::new(Emissions::from_parameters(parameters.emissions.clone())),
        Box::new(Temperature::from_parameters(parameters.temperature.clone())),
        Box::new(Damages::from_parameters(parameters.damages.clone())),
        Box::new(Mitigation::from_parameters(parameters.mitigation.clone())),
        Box::new(Economics::from_parameters(parameters.economics.clone())),
        Box::new(Welfare::from_parameters(parameters.welfare.clone())),
    ];
    let mut equations = vec![];
    for module in &modules {
        equations.extend(model.add_equation_set(module.as_ref()));
    }

    debug!(
        equations = equations.len(),
        timesteps = data.years.len(),
        regions = data.regions.len(),
        "built model"
    );
    Ok((model, equations))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_values_are_validated() {
        let (mut model, _) = build_model(
            &ModelData::synthetic(&["USA", "EU"], 2020, 10, 3),
            &ModelParameters::default(),
        )
        .unwrap();

        model
            .set_initial_value("temperature", &[Label::from(2030)], 1.4)
            .unwrap();
        assert_eq!(model.initial_value("temperature", &[Label::from(2030)]), Some(1.4));

        assert!(matches!(
            model.set_initial_value("population", &[Label::from(2030), Label::from("EU")], 1.0),
            Err(SimError::UnknownVariable(_))
        ));
        assert!(matches!(
            model.set_initial_value("temperature", &[Label::from(2035)], 1.0),
            Err(SimError::UnknownLabel { .. })
        ));
        assert!(matches!(
            model.set_initial_value("GDP_net", &[Label::from(2030)], 1.0),
            Err(SimError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_data_shapes_are_checked() {
        let mut data = ModelData::synthetic(&["USA", "EU"], 2020, 10, 3);
        data.mac_coefficient = Array1::zeros(3);
        assert!(matches!(
            build_model(&data, &ModelParameters::default()),
            Err(SimError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_parameters_from_toml() {
        let parameters: ModelParameters = toml::from_str(
            r#"
            [temperature]
            tcre = 0.5

            [welfare]
            elasmu = 1.0
            "#,
        )
        .unwrap();
        assert_eq!(parameters.temperature.tcre, 0.5);
        assert_eq!(parameters.temperature.temperature_initial, 1.2);
        assert_eq!(parameters.welfare.elasmu, 1.0);
        assert_eq!(parameters.economics, EconomicsParameters::default());
    }

    #[test]
    fn test_synthetic_data() {
        let data = ModelData::synthetic(&["USA", "EU", "CHN"], 2020, 5, 4);
        assert_eq!(data.years, vec![2020, 2025, 2030, 2035]);
        assert_eq!(data.dt(), 5.0);
        assert_eq!(data.population.shape(), &[4, 3]);
    }
}

pub mod equations;
pub mod model;
pub mod standard_variables;

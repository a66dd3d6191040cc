// Domain layer: chart models and the fetch port. No network or parsing code here.

pub mod model;
pub mod ports;

//! Property keys shared with network descriptions and user formulas.
//!
//! The strings match the attribute names used by existing ANIMO networks, so
//! `reactant.property` references written by older tools keep resolving.

pub const NUMBER_OF_LEVELS: &str = "levels";
pub const INITIAL_LEVEL: &str = "initialConcentration";
pub const INITIAL_QUANTITY: &str = "initialTotalConcentration";
pub const STEP_SIZE: &str = "Step size";
pub const MAXIMUM_QUANTITY_GROWTH: &str = "Maximum quantity growth";
pub const LEVELS_SCALE_FACTOR: &str = "levels scale factor";
pub const ALIAS: &str = "alias";
pub const ENABLED: &str = "enabled";
pub const PLOTTED: &str = "plotted";
pub const MOLECULE_TYPE: &str = "moleculeType";

pub const INCREMENT: &str = "increment";
pub const UNCERTAINTY: &str = "uncertainty";
pub const SCENARIO: &str = "scenario";

pub const SECONDS_PER_POINT: &str = "seconds per point";
pub const SECS_POINT_SCALE_FACTOR: &str = "time scale factor";

pub const ACTIVITY_LEVEL: &str = "Activity level";
pub const QUANTITY: &str = "Quantity";
pub const INACTIVITY_LEVEL: &str = "Inactive reactant";

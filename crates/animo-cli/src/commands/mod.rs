pub(crate) mod compile;
pub(crate) mod formulas;
pub(crate) mod helpers;
pub(crate) mod simulate;
pub(crate) mod smc;

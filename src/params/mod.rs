//! Parameters
//!
//! The host-visible parameter layout, the shared store the control surface
//! writes into, and the `ChainSettings` snapshot coefficient design reads.

mod layout;
mod settings;
mod store;

pub use layout::{ParamId, ParamKind, ParamRange, ParamSpec, SLOPE_CHOICES};
pub use settings::{ChainSettings, Slope, NUM_SLOPES};
pub use store::ParameterStore;

//! Shared parameter store
//!
//! Written by the control surface, host automation and preset loads; read by
//! the update publisher. The render thread never touches the store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;
use parking_lot::RwLock;

use super::layout::ParamId;
use super::settings::ChainSettings;
use crate::error::Result;

/// Thread-safe store of the raw parameter values
///
/// All values live behind one lock so a snapshot can never mix fields from
/// two different edits. Every write raises the `changed` flag, which the
/// publisher test-and-clears on its periodic tick.
#[derive(Debug)]
pub struct ParameterStore {
    values: RwLock<[f32; ParamId::COUNT]>,
    changed: AtomicBool,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterStore {
    /// Create a store holding every parameter's default
    pub fn new() -> Self {
        Self {
            values: RwLock::new(ChainSettings::default().to_raw()),
            changed: AtomicBool::new(true),
        }
    }

    /// Create a store initialised from `settings` (clamped into range)
    pub fn with_settings(settings: &ChainSettings) -> Self {
        Self {
            values: RwLock::new(settings.clamped().to_raw()),
            changed: AtomicBool::new(true),
        }
    }

    /// Current raw value of one parameter
    pub fn get(&self, id: ParamId) -> f32 {
        self.values.read()[id.index()]
    }

    /// Set one parameter, returning the value actually stored after snapping
    pub fn set(&self, id: ParamId, value: f32) -> f32 {
        let snapped = id.spec().range.snap(value);
        self.values.write()[id.index()] = snapped;
        self.mark_changed();
        snapped
    }

    /// Set one parameter by its host-visible name
    pub fn set_by_name(&self, name: &str, value: f32) -> Result<f32> {
        let id = ParamId::from_name(name)?;
        Ok(self.set(id, value))
    }

    /// Current value of one parameter on the normalised 0..1 scale
    pub fn get_normalised(&self, id: ParamId) -> f32 {
        id.spec().range.to_normalised(self.get(id))
    }

    /// Set one parameter from a normalised 0..1 position
    pub fn set_normalised(&self, id: ParamId, proportion: f32) -> f32 {
        let value = id.spec().range.from_normalised(proportion);
        self.set(id, value)
    }

    /// Replace every parameter in one step
    pub fn apply(&self, settings: &ChainSettings) {
        *self.values.write() = settings.clamped().to_raw();
        self.mark_changed();
    }

    /// Return every parameter to its default
    pub fn reset_all(&self) {
        debug!("Resetting all parameters to defaults");
        self.apply(&ChainSettings::default());
    }

    /// Capture a consistent snapshot of all parameters
    pub fn snapshot(&self) -> ChainSettings {
        let values = *self.values.read();
        ChainSettings::from_raw(&values)
    }

    /// Parameter values keyed by host-visible name
    pub fn values_by_name(&self) -> BTreeMap<String, f32> {
        let values = *self.values.read();
        ParamId::ALL
            .into_iter()
            .map(|id| (id.name().to_string(), values[id.index()]))
            .collect()
    }

    /// Text shown on the control for the current value of `id`
    pub fn display_string(&self, id: ParamId) -> String {
        id.spec().display_string(self.get(id))
    }

    /// Raise the changed flag without editing a value
    pub fn mark_changed(&self) {
        self.changed.store(true, Ordering::Release);
    }

    /// Test-and-clear the changed flag
    pub fn take_changed(&self) -> bool {
        self.changed.swap(false, Ordering::AcqRel)
    }

    /// Whether an edit is waiting to be published
    pub fn is_changed(&self) -> bool {
        self.changed.load(Ordering::Acquire)
    }
}

use bevy::prelude::*;

pub mod data_for_backends;
pub mod math;

/// Umbrella system set for [`GravisPipelineStages`].
///
/// The physics backends' plugins are responsible for preventing this entire system set from
/// running when the physics backend itself is paused.
#[derive(SystemSet, Clone, PartialEq, Eq, Debug, Hash)]
pub struct GravisSystemSet;

/// The various stages of the gravis pipeline.
#[derive(SystemSet, Clone, PartialEq, Eq, Debug, Hash)]
pub enum GravisPipelineStages {
    /// Data is read from the physics backend, and the gravity field is rebaked from the
    /// gravity source entities.
    Sensors,
    /// The locomotion controller classifies contacts and decides on a new velocity.
    Logic,
    /// The velocity write-out is applied in the physics backend.
    Motors,
}

/// The set user code should use to feed input to [`data_for_backends`] components.
///
/// Runs between [`GravisPipelineStages::Sensors`] and [`GravisPipelineStages::Logic`], so that
/// input sampled during the variable-rate phase gets consumed by the very next fixed step.
#[derive(SystemSet, Clone, PartialEq, Eq, Debug, Hash)]
pub struct GravisUserControlsSystemSet;

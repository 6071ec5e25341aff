//! # bevy-gravis - gravity fields and gravity-aware locomotion for [Bevy](https://bevyengine.org)
//!
//! bevy-gravis simulates locomotion for a rolling/walking character under a non-uniform,
//! pluggable gravity field. It is split into two cooperating pieces:
//!
//! * A **gravity field**: [`GravitySource`] components (planes, tori, points) registered into a
//!   [`GravisField`] resource that aggregates them into a local gravity vector and "up"
//!   direction at any point in space.
//! * A **locomotion controller**: [`GravisController`], a per-fixed-step state machine that
//!   consumes the aggregated gravity, classifies contact surfaces reported by the physics
//!   backend, performs acceleration-limited steering, ground snapping, and multi-stage
//!   jumping - all relative to a local up axis that changes with position.
//!
//! The physics engine itself is a backend concern. bevy-gravis talks to it exclusively through
//! the components of [`bevy_gravis_physics_integration_layer::data_for_backends`], re-exported
//! here: the backend fills [`GravisRigidBodyTracker`], [`GravisContactFeed`] and
//! [`GravisGroundProbe`] during [`GravisPipelineStages::Sensors`], and applies [`GravisMotor`]
//! during [`GravisPipelineStages::Motors`].
//!
//! ## Usage
//!
//! 1. Add [`GravisControllerPlugin`] to the app, in the schedule the physics backend steps in.
//! 2. Spawn gravity source entities: a `GlobalTransform` plus a [`GravitySource`].
//! 3. Spawn the character with [`GravisController`], [`GravisInput`], and the backend boundary
//!    components ([`GravisRigidBodyTracker`], [`GravisContactFeed`], [`GravisGroundProbe`],
//!    [`GravisMotor`]).
//! 4. Feed [`GravisInput`] from your input handling systems, in
//!    [`GravisUserControlsSystemSet`].
mod controller;
mod field;
mod orbit;
mod sources;
pub mod util;

pub use controller::{
    GravisController, GravisControllerPlugin, GravisInput, GravisStepContext,
};
pub use field::{GravisField, ZeroGravity};
pub use orbit::{GravisOrbitFraming, GravisOrbitPlugin};
pub use sources::{BakedGravitySource, GravityPlane, GravityPoint, GravitySource, GravityTorus};

pub use bevy_gravis_physics_integration_layer::data_for_backends::*;
pub use bevy_gravis_physics_integration_layer::{
    GravisPipelineStages, GravisSystemSet, GravisUserControlsSystemSet,
};

pub mod math {
    pub use bevy_gravis_physics_integration_layer::math::*;
}

pub mod prelude {
    pub use crate::math::{AdjustPrecision, AsF32, Float, Vector2, Vector3};
    pub use crate::{
        GravisContact, GravisContactFeed, GravisController, GravisControllerPlugin, GravisField,
        GravisGroundProbe, GravisInput, GravisMotor, GravisOrbitFraming, GravisOrbitPlugin,
        GravisRigidBodyTracker, GravisSurfaceKind, GravisToggle, GravisUserControlsSystemSet,
        GravityPlane, GravityPoint, GravitySource, GravityTorus,
    };
}

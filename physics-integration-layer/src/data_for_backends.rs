use bevy::prelude::*;

use crate::math::{Float, Vector3};

/// Allows disabling gravis for a specific entity.
///
/// This can be used to let some other system temporarily take control over a character.
///
/// This component is not mandatory - if omitted, gravis will just assume it is enabled for
/// that entity.
#[derive(Component, Default, Debug, PartialEq, Eq, Clone, Copy)]
pub enum GravisToggle {
    /// Do not update the sensors, and do not apply the motor.
    ///
    /// The controller system will also not run and won't update the state stored in the
    /// controller component. It will retain its last value from before `GravisToggle::Disabled`
    /// was set.
    Disabled,
    /// Update the sensors, but do not apply the motor.
    ///
    /// The controller system will still run and still update the motor component. Only the
    /// backend system that assigns the motor's velocity to the rigid body must be skipped.
    SenseOnly,
    #[default]
    /// The backend behaves normally - it updates the sensors and applies the motor.
    Enabled,
}

/// Newtonian state of the rigid body, as seen at the start of the simulation step.
///
/// The physics backend is responsible for updating this component from the physics engine
/// during [`GravisPipelineStages::Sensors`](crate::GravisPipelineStages::Sensors). The
/// controller reads the position once per step - for the gravity query - and never writes it;
/// position integration belongs to the backend.
#[derive(Component, Debug)]
pub struct GravisRigidBodyTracker {
    pub translation: Vector3,
    pub velocity: Vector3,
}

impl Default for GravisRigidBodyTracker {
    fn default() -> Self {
        Self {
            translation: Vector3::ZERO,
            velocity: Vector3::ZERO,
        }
    }
}

/// The surface tag a contact or probe hit carries.
///
/// This is the "layer" information the controller uses to pick between the regular ground
/// slope threshold and the (typically more permissive) stairs threshold.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy)]
pub enum GravisSurfaceKind {
    #[default]
    Regular,
    /// Surfaces flagged as stairs get classified with the stairs angle threshold, which is
    /// usually larger than the ground one so that stair edges still count as walkable.
    Stairs,
}

/// A single contact normal reported by the physics backend for the current step.
#[derive(Debug, Clone, Copy)]
pub struct GravisContact {
    /// The contact surface normal, pointing away from the other collider.
    pub normal: Vector3,
    pub surface: GravisSurfaceKind,
}

/// Accumulates the contacts the physics backend reports during a simulation step.
///
/// The backend pushes one [`GravisContact`] per reported contact point during
/// [`GravisPipelineStages::Sensors`](crate::GravisPipelineStages::Sensors). The controller
/// folds and then clears the feed every step, so stale contacts never leak into the next one.
#[derive(Component, Default, Debug)]
pub struct GravisContactFeed(pub Vec<GravisContact>);

impl GravisContactFeed {
    pub fn push(&mut self, contact: GravisContact) {
        self.0.push(contact);
    }

    pub fn iter(&self) -> impl Iterator<Item = &GravisContact> {
        self.0.iter()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

/// A downward ray query used for ground snapping.
///
/// The controller updates [`cast_direction`](Self::cast_direction) (the negated local up axis)
/// and [`cast_range`](Self::cast_range) every step. The physics backend is responsible for
/// casting the ray during [`GravisPipelineStages::Sensors`](crate::GravisPipelineStages::Sensors)
/// and filling [`output`](Self::output) - or clearing it when nothing was hit in range.
#[derive(Component, Debug)]
pub struct GravisGroundProbe {
    /// The cast origin in the entity's coord system.
    pub cast_origin: Vector3,
    /// The direction in world coord system (unmodified by the entity's transform).
    pub cast_direction: Dir3,
    /// The controller will update this field according to its need. The backend only needs to
    /// read it.
    pub cast_range: Float,
    pub output: Option<GravisProbeHit>,
}

impl Default for GravisGroundProbe {
    fn default() -> Self {
        Self {
            cast_origin: Vector3::ZERO,
            cast_direction: Dir3::NEG_Y,
            cast_range: 0.0,
            output: None,
        }
    }
}

/// Information from a [`GravisGroundProbe`] cast that hit a collider.
#[derive(Debug, Clone)]
pub struct GravisProbeHit {
    /// The distance to the hit from [`cast_origin`](GravisGroundProbe::cast_origin) along the
    /// [`cast_direction`](GravisGroundProbe::cast_direction).
    pub proximity: Float,
    /// The normal from the hit collider's surface where the ray hits.
    pub normal: Vector3,
    pub surface: GravisSurfaceKind,
}

/// The velocity write-out of the locomotion controller.
///
/// The physics backend is responsible for reading this component during
/// [`GravisPipelineStages::Motors`](crate::GravisPipelineStages::Motors) and assigning
/// [`velocity`](Self::velocity) to the rigid body's linear velocity. The controller already
/// integrated gravity into it, so the backend must not apply its own gravity to the body.
#[derive(Component, Debug)]
pub struct GravisMotor {
    /// The velocity the rigid body should carry for the rest of the step.
    pub velocity: Vector3,
}

impl Default for GravisMotor {
    fn default() -> Self {
        Self {
            velocity: Vector3::ZERO,
        }
    }
}

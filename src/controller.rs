use bevy::ecs::schedule::{InternedScheduleLabel, ScheduleLabel};
use bevy::prelude::*;

use crate::field::{sync_gravity_sources_system, GravisField};
use crate::math::{AdjustPrecision, Float, Quaternion, Vector2, Vector3};
use crate::util::{move_towards, project_direction_on_plane};
use crate::{
    GravisContact, GravisContactFeed, GravisGroundProbe, GravisMotor, GravisPipelineStages,
    GravisRigidBodyTracker, GravisSurfaceKind, GravisSystemSet, GravisToggle,
    GravisUserControlsSystemSet,
};

/// Contact normals with an up-dot below this are ceilings and get ignored; anything between
/// this and the ground threshold is a steep wall. A perfectly vertical wall has an up-dot of
/// exactly zero, so the cutoff sits slightly below it.
const STEEP_NORMAL_CUTOFF: Float = -0.01;

/// Add this plugin to use the gravis locomotion pipeline.
///
/// The plugin should be added in the schedule the physics backend steps in, and defaults to
/// [`FixedUpdate`]. It configures the [`GravisPipelineStages`] chain, owns the
/// [`GravisField`] resource, and runs the gravity source sync and the controller logic.
pub struct GravisControllerPlugin {
    schedule: InternedScheduleLabel,
}

impl GravisControllerPlugin {
    pub fn new(schedule: impl ScheduleLabel) -> Self {
        Self {
            schedule: schedule.intern(),
        }
    }
}

impl Default for GravisControllerPlugin {
    fn default() -> Self {
        Self::new(FixedUpdate)
    }
}

impl Plugin for GravisControllerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GravisField>();
        app.configure_sets(
            self.schedule,
            (
                GravisPipelineStages::Sensors,
                GravisUserControlsSystemSet,
                GravisPipelineStages::Logic,
                GravisPipelineStages::Motors,
            )
                .chain()
                .in_set(GravisSystemSet),
        );
        app.add_systems(
            self.schedule,
            sync_gravity_sources_system.in_set(GravisPipelineStages::Sensors),
        );
        app.add_systems(
            self.schedule,
            apply_controller_system.in_set(GravisPipelineStages::Logic),
        );
    }
}

/// Player intent for the next fixed step.
///
/// Write this from input handling systems in [`GravisUserControlsSystemSet`]. The jump
/// request is a latch: [`request_jump`](Self::request_jump) may be called during any number
/// of variable-rate frames, and the controller consumes it exactly once on the next fixed
/// step - a press between two fixed steps is never lost.
#[derive(Component, Default, Debug)]
pub struct GravisInput {
    /// Desired movement on the plane orthogonal to the local up axis. `x` is rightward, `y`
    /// is forward. Clamped to length 1 before use, so diagonal input is not faster.
    pub movement: Vector2,

    /// The frame [`movement`](Self::movement) is expressed in - typically the camera's
    /// rotation. Its right and forward axes get projected onto the plane orthogonal to the
    /// local up axis. `None` means the world frame.
    pub input_frame: Option<Quaternion>,

    jump_requested: bool,
}

impl GravisInput {
    /// Latch a jump request for the next fixed step.
    pub fn request_jump(&mut self) {
        self.jump_requested = true;
    }

    pub fn jump_requested(&self) -> bool {
        self.jump_requested
    }

    fn consume_jump_request(&mut self) -> bool {
        std::mem::take(&mut self.jump_requested)
    }
}

/// Everything the controller consumes during one fixed step.
///
/// [`apply_controller_system`] assembles this per entity, but it can just as well be built by
/// hand - the controller logic itself does not touch the ECS.
pub struct GravisStepContext<'a> {
    /// The duration of the current step, in seconds.
    pub frame_duration: Float,
    /// The aggregated gravity at the body's position.
    pub gravity: Vector3,
    /// The up axis derived from [`gravity`](Self::gravity) (or the field's fallback).
    pub up_axis: Dir3,
    pub tracker: &'a GravisRigidBodyTracker,
    pub probe: &'a GravisGroundProbe,
    /// The contacts the backend reported since the previous step.
    pub contacts: &'a [GravisContact],
}

/// Per-step bookkeeping of the contacts classified this step. Produced fresh every step and
/// folded from that step's reported contacts, so the reset-then-accumulate contract is
/// explicit.
#[derive(Default, Debug)]
struct ContactAccumulator {
    ground_count: u32,
    steep_count: u32,
    ground_normal: Vector3,
    steep_normal: Vector3,
}

impl ContactAccumulator {
    fn on_ground(&self) -> bool {
        self.ground_count > 0
    }
}

/// The grounded-locomotion state machine for one character.
///
/// Each fixed step the controller queries the [`GravisField`] at the body's position,
/// classifies the step's contacts against the local up axis, steers the velocity toward the
/// input direction under an acceleration cap, handles jumping, integrates gravity, and writes
/// the result to the [`GravisMotor`].
///
/// The public fields are designer tunables; the runtime state is private and readable through
/// the accessor methods.
#[derive(Component, Debug)]
pub struct GravisController {
    /// Top speed the input can steer toward, on the contact plane.
    pub max_speed: Float,

    /// Acceleration cap while on the ground. Each steering axis component moves toward its
    /// desired value by at most this times the step duration.
    pub max_acceleration: Float,

    /// Acceleration cap while airborne. Usually much smaller than
    /// [`max_acceleration`](Self::max_acceleration).
    pub max_air_acceleration: Float,

    /// Apex height of a jump, in the direction of the local up axis.
    ///
    /// The jump impulse is derived from the local gravity magnitude, so the same height is
    /// reached whether the character stands on a weak plane or a strong torus.
    pub jump_height: Float,

    /// How many jumps are allowed after losing ground contact, before touching ground again.
    pub air_jumps: u32,

    /// Steepest slope that still counts as ground, in degrees.
    pub max_ground_angle: Float,

    /// Steepest slope that still counts as ground on surfaces tagged
    /// [`GravisSurfaceKind::Stairs`], in degrees. Typically larger than
    /// [`max_ground_angle`](Self::max_ground_angle).
    pub max_stairs_angle: Float,

    /// Above this speed the controller no longer snaps to the ground - a launch off a ramp
    /// at high speed should stay a launch.
    pub max_snap_speed: Float,

    /// How far below the body the ground probe searches when snapping.
    pub probe_distance: Float,

    velocity: Vector3,
    contact_normal: Vector3,
    steep_normal: Vector3,
    jump_phase: u32,
    steps_since_grounded: u32,
    steps_since_jump: u32,
    grounded: bool,
    on_steep: bool,
}

impl Default for GravisController {
    fn default() -> Self {
        Self {
            max_speed: 10.0,
            max_acceleration: 10.0,
            max_air_acceleration: 1.0,
            jump_height: 2.0,
            air_jumps: 0,
            max_ground_angle: 25.0,
            max_stairs_angle: 50.0,
            max_snap_speed: 100.0,
            probe_distance: 1.0,
            velocity: Vector3::ZERO,
            contact_normal: Vector3::ZERO,
            steep_normal: Vector3::ZERO,
            jump_phase: 0,
            steps_since_grounded: 0,
            steps_since_jump: 0,
            grounded: false,
            on_steep: false,
        }
    }
}

impl GravisController {
    /// The velocity the controller decided on in the last step.
    pub fn velocity(&self) -> Vector3 {
        self.velocity
    }

    /// Whether the character stood on walkable ground in the last step - through a direct
    /// contact, a ground snap, or steep-corner promotion.
    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Whether the character touched a too-steep-to-stand-on surface in the last step.
    pub fn is_on_steep(&self) -> bool {
        self.on_steep
    }

    /// Jumps consumed since the character was last grounded.
    pub fn jump_phase(&self) -> u32 {
        self.jump_phase
    }

    /// Run one fixed simulation step.
    ///
    /// Consumes the jump latch from `input` and leaves the decided velocity both in the
    /// internal state and in `motor`.
    pub fn apply(
        &mut self,
        ctx: GravisStepContext,
        input: &mut GravisInput,
        motor: &mut GravisMotor,
    ) {
        let up = ctx.up_axis.adjust_precision();
        let mut accumulator = self.classify_contacts(ctx.contacts, up);
        self.update_state(&ctx, up, &mut accumulator);
        self.adjust_velocity(&ctx, input, up);
        if input.consume_jump_request() {
            self.jump(ctx.gravity, up);
        }
        self.velocity += ctx.gravity * ctx.frame_duration;
        motor.velocity = self.velocity;
    }

    fn min_dot(&self, surface: GravisSurfaceKind) -> Float {
        match surface {
            GravisSurfaceKind::Regular => self.max_ground_angle.to_radians().cos(),
            GravisSurfaceKind::Stairs => self.max_stairs_angle.to_radians().cos(),
        }
    }

    fn classify_contacts(&self, contacts: &[GravisContact], up: Vector3) -> ContactAccumulator {
        let mut accumulator = ContactAccumulator::default();
        for contact in contacts {
            let up_dot = up.dot(contact.normal);
            if up_dot >= self.min_dot(contact.surface) {
                accumulator.ground_count += 1;
                accumulator.ground_normal += contact.normal;
            } else if up_dot > STEEP_NORMAL_CUTOFF {
                // Too steep to stand on, but not a ceiling - remember it for corner
                // promotion and wall jumps.
                accumulator.steep_count += 1;
                accumulator.steep_normal += contact.normal;
            }
        }
        accumulator
    }

    fn update_state(
        &mut self,
        ctx: &GravisStepContext,
        up: Vector3,
        accumulator: &mut ContactAccumulator,
    ) {
        self.velocity = ctx.tracker.velocity;
        self.steps_since_grounded = self.steps_since_grounded.saturating_add(1);
        self.steps_since_jump = self.steps_since_jump.saturating_add(1);
        self.steep_normal = accumulator.steep_normal.normalize_or_zero();

        let grounded = accumulator.on_ground()
            || self.snap_to_ground(ctx, up, accumulator)
            || self.promote_steep_contacts(up, accumulator);
        if grounded {
            self.steps_since_grounded = 0;
            if self.steps_since_jump > 1 {
                // Don't reset on the very step a jump launched from, or the air-jump budget
                // would refresh before the character actually left the ground.
                self.jump_phase = 0;
            }
            self.contact_normal = accumulator.ground_normal.normalize_or_zero();
        } else {
            // Airborne steering still needs a reference plane.
            self.contact_normal = up;
        }
        self.grounded = grounded;
        self.on_steep = accumulator.steep_count > 0;
    }

    /// Steer the velocity toward the input direction, moving each steering axis component by
    /// at most the acceleration cap times the step duration. The steering axes are the input
    /// frame's right/forward projected onto the contact plane, so movement follows the slope.
    fn adjust_velocity(&mut self, ctx: &GravisStepContext, input: &GravisInput, up: Vector3) {
        let movement = input.movement.clamp_length_max(1.0);
        let frame = input.input_frame.unwrap_or(Quaternion::IDENTITY);
        let right_axis = project_direction_on_plane(frame * Vector3::X, up);
        let forward_axis = project_direction_on_plane(frame * Vector3::NEG_Z, up);
        let desired_x = movement.x * self.max_speed;
        let desired_z = movement.y * self.max_speed;

        let x_axis = project_direction_on_plane(right_axis, self.contact_normal);
        let z_axis = project_direction_on_plane(forward_axis, self.contact_normal);
        let current_x = self.velocity.dot(x_axis);
        let current_z = self.velocity.dot(z_axis);

        let acceleration = if self.grounded {
            self.max_acceleration
        } else {
            self.max_air_acceleration
        };
        let max_speed_change = acceleration * ctx.frame_duration;
        let new_x = move_towards(current_x, desired_x, max_speed_change);
        let new_z = move_towards(current_z, desired_z, max_speed_change);
        self.velocity += x_axis * (new_x - current_x) + z_axis * (new_z - current_z);
    }

    /// Attempt a jump off whatever surface is available: ground, a steep wall, or thin air
    /// while the air-jump budget lasts. With nothing to jump off this is a silent no-op.
    fn jump(&mut self, gravity: Vector3, up: Vector3) {
        let jump_direction = if self.grounded {
            self.contact_normal
        } else if self.on_steep {
            // A wall jump resets the phase, so it counts as the first air jump.
            self.jump_phase = 0;
            self.steep_normal
        } else if self.air_jumps > 0 && self.jump_phase <= self.air_jumps {
            if self.jump_phase == 0 {
                // Falling off a ledge without jumping consumes the first phase.
                self.jump_phase = 1;
            }
            self.contact_normal
        } else {
            return;
        };

        self.steps_since_jump = 0;
        self.jump_phase += 1;
        // The impulse needed to reach jump_height under the local gravity magnitude.
        let mut jump_speed = (2.0 * gravity.length() * self.jump_height).sqrt();
        // Blend the surface normal with absolute up, so jumps off slopes still gain height.
        let jump_direction = (jump_direction + up).normalize_or_zero();
        let aligned_speed = self.velocity.dot(jump_direction);
        if aligned_speed > 0.0 {
            // Velocity already carries the character along the jump direction; don't stack
            // impulses past the intended apex.
            jump_speed = (jump_speed - aligned_speed).max(0.0);
        }
        self.velocity += jump_direction * jump_speed;
    }

    /// Re-establish grounding when the character briefly left the ground without jumping -
    /// stair edges and slight crests - by probing straight down and gluing the velocity to
    /// the hit surface.
    fn snap_to_ground(
        &mut self,
        ctx: &GravisStepContext,
        up: Vector3,
        accumulator: &mut ContactAccumulator,
    ) -> bool {
        if self.steps_since_grounded > 1 || self.steps_since_jump <= 2 {
            return false;
        }
        let speed = self.velocity.length();
        if speed > self.max_snap_speed {
            return false;
        }
        let Some(hit) = &ctx.probe.output else {
            return false;
        };
        if hit.proximity > self.probe_distance {
            return false;
        }
        if up.dot(hit.normal) < self.min_dot(hit.surface) {
            return false;
        }

        // Still above walkable ground. Commit to it and remove the velocity component that
        // points away from the surface, preserving speed.
        accumulator.ground_count = 1;
        accumulator.ground_normal = hit.normal;
        let dot = self.velocity.dot(hit.normal);
        if dot > 0.0 {
            self.velocity = (self.velocity - hit.normal * dot).normalize_or_zero() * speed;
        }
        true
    }

    /// An inside corner formed by two steep walls can be walkable even though neither wall
    /// is: when the summed steep normals point sufficiently up, treat the corner as ground.
    fn promote_steep_contacts(
        &mut self,
        up: Vector3,
        accumulator: &mut ContactAccumulator,
    ) -> bool {
        if accumulator.steep_count > 1 {
            let steep_normal = accumulator.steep_normal.normalize_or_zero();
            if up.dot(steep_normal) >= self.min_dot(GravisSurfaceKind::Regular) {
                accumulator.ground_count = 1;
                accumulator.ground_normal = steep_normal;
                return true;
            }
        }
        false
    }
}

#[allow(clippy::type_complexity)]
fn apply_controller_system(
    time: Res<Time>,
    field: Res<GravisField>,
    mut query: Query<(
        &mut GravisController,
        &GravisRigidBodyTracker,
        &mut GravisGroundProbe,
        &mut GravisContactFeed,
        &mut GravisInput,
        &mut GravisMotor,
        Option<&GravisToggle>,
    )>,
) {
    let frame_duration = time.delta().as_secs_f64() as Float;
    if frame_duration == 0.0 {
        return;
    }
    for (mut controller, tracker, mut probe, mut contacts, mut input, mut motor, toggle) in
        query.iter_mut()
    {
        match toggle.copied().unwrap_or_default() {
            GravisToggle::Disabled => continue,
            GravisToggle::SenseOnly | GravisToggle::Enabled => {}
        }
        let (gravity, up_axis) = field.gravity_and_up_at(tracker.translation);
        controller.apply(
            GravisStepContext {
                frame_duration,
                gravity,
                up_axis,
                tracker,
                probe: probe.as_ref(),
                contacts: &contacts.0,
            },
            input.as_mut(),
            motor.as_mut(),
        );
        // Aim the probe for the next step's snap attempt, and hand the contact feed back to
        // the backend empty.
        probe.cast_direction = -up_axis;
        probe.cast_range = controller.probe_distance;
        contacts.clear();
    }
}

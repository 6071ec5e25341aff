use bevy::prelude::*;

use crate::field::GravisField;
use crate::math::{AdjustPrecision, AsF32, Float, Quaternion, Vector2, Vector3};

/// Add this plugin to let [`GravisOrbitFraming`] entities follow their focus.
///
/// Runs in [`PostUpdate`] - framing is a presentation concern and should see the results of
/// the simulation schedule, whichever one the controller runs in.
pub struct GravisOrbitPlugin;

impl Plugin for GravisOrbitPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<GravisField>();
        app.add_systems(PostUpdate, update_orbit_framing_system);
    }
}

/// Orients a viewpoint around a focus entity, keeping "up" aligned with the local gravity.
///
/// This is the framing core only: it smooths a focus point, realigns to the gravity field's
/// up axis at a bounded angular speed, and places the transform on the orbit. Rotating the
/// orbit angles from input, and obstruction handling, are left to the game - the former is
/// an input concern (write [`orbit_angles`](Self::orbit_angles)), the latter needs the
/// physics backend's shape casts.
#[derive(Component, Debug)]
pub struct GravisOrbitFraming {
    /// The entity being framed - typically the character.
    pub focus: Entity,

    /// Distance from the focus point to the viewpoint.
    pub distance: Float,

    /// The focus point only starts following the focus entity once it strays this far from
    /// it, which keeps micro-motion from shaking the frame.
    pub focus_radius: Float,

    /// How quickly the focus point re-centers on the focus entity, 0 (never) to 1
    /// (immediately).
    pub focus_centering: Float,

    /// Orbit pitch and yaw, in degrees. Pitch is positive looking down.
    pub orbit_angles: Vector2,

    /// Lower bound for the orbit pitch, in degrees.
    pub min_vertical_angle: Float,

    /// Upper bound for the orbit pitch, in degrees. Clamped to be at least
    /// [`min_vertical_angle`](Self::min_vertical_angle).
    pub max_vertical_angle: Float,

    /// Fastest the frame may roll to follow a changing up axis, in degrees per second.
    /// Walking around a torus flips "up" continuously; an instant snap would be jarring.
    pub up_alignment_speed: Float,

    focus_point: Vector3,
    gravity_alignment: Quaternion,
    initialized: bool,
}

impl GravisOrbitFraming {
    pub fn new(focus: Entity) -> Self {
        Self {
            focus,
            distance: 5.0,
            focus_radius: 1.0,
            focus_centering: 0.5,
            orbit_angles: Vector2::new(45.0, 0.0),
            min_vertical_angle: -30.0,
            max_vertical_angle: 60.0,
            up_alignment_speed: 360.0,
            focus_point: Vector3::ZERO,
            gravity_alignment: Quaternion::IDENTITY,
            initialized: false,
        }
    }

    /// The point the frame currently looks at. Lags behind the focus entity within
    /// [`focus_radius`](Self::focus_radius).
    pub fn focus_point(&self) -> Vector3 {
        self.focus_point
    }

    fn update_focus_point(&mut self, target: Vector3, frame_duration: Float) {
        if !self.initialized {
            self.focus_point = target;
            return;
        }
        if self.focus_radius <= 0.0 {
            self.focus_point = target;
            return;
        }
        let distance = target.distance(self.focus_point);
        let mut t: Float = 1.0;
        if distance > 0.01 && self.focus_centering > 0.0 {
            t = (1.0 - self.focus_centering).powf(frame_duration);
        }
        if distance > self.focus_radius {
            t = t.min(self.focus_radius / distance);
        }
        self.focus_point = target.lerp(self.focus_point, t);
    }

    fn update_gravity_alignment(&mut self, up: Dir3, frame_duration: Float) {
        let from_up = self.gravity_alignment * Vector3::Y;
        let to_up = up.adjust_precision();
        let dot = from_up.dot(to_up).clamp(-1.0, 1.0);
        let angle = dot.acos().to_degrees();
        let new_alignment = Quaternion::from_rotation_arc(from_up, to_up) * self.gravity_alignment;
        let max_angle = self.up_alignment_speed * frame_duration;
        if self.initialized && angle > max_angle {
            self.gravity_alignment = self
                .gravity_alignment
                .slerp(new_alignment, max_angle / angle);
        } else {
            self.gravity_alignment = new_alignment;
        }
    }

    fn constrain_angles(&mut self) {
        let max_vertical = self.max_vertical_angle.max(self.min_vertical_angle);
        self.orbit_angles.x = self.orbit_angles.x.clamp(self.min_vertical_angle, max_vertical);
        self.orbit_angles.y = self.orbit_angles.y.rem_euclid(360.0);
    }

    fn look_rotation(&self) -> Quaternion {
        let orbit = Quaternion::from_euler(
            EulerRot::YXZ,
            self.orbit_angles.y.to_radians(),
            -self.orbit_angles.x.to_radians(),
            0.0,
        );
        self.gravity_alignment * orbit
    }
}

fn update_orbit_framing_system(
    time: Res<Time>,
    field: Res<GravisField>,
    mut query: Query<(&mut GravisOrbitFraming, &mut Transform)>,
    focus_query: Query<&GlobalTransform, Without<GravisOrbitFraming>>,
) {
    let frame_duration = time.delta().as_secs_f64() as Float;
    for (mut framing, mut transform) in query.iter_mut() {
        let Ok(focus_transform) = focus_query.get(framing.focus) else {
            error!(
                "Gravis cannot frame {:?} - the focus entity has no GlobalTransform",
                framing.focus
            );
            continue;
        };
        let framing = framing.as_mut();
        framing.update_focus_point(
            focus_transform.translation().adjust_precision(),
            frame_duration,
        );
        framing.update_gravity_alignment(field.up_axis_at(framing.focus_point), frame_duration);
        framing.constrain_angles();
        framing.initialized = true;

        let look_rotation = framing.look_rotation();
        let forward = look_rotation * Vector3::NEG_Z;
        let look_position = framing.focus_point - forward * framing.distance;
        transform.translation = look_position.f32();
        transform.rotation = look_rotation.f32();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_point_stays_within_focus_radius() {
        let mut framing = GravisOrbitFraming::new(Entity::from_raw(0));
        framing.focus_centering = 0.0;
        framing.update_focus_point(Vector3::ZERO, 1.0 / 60.0);
        framing.initialized = true;
        framing.update_focus_point(Vector3::X * 10.0, 1.0 / 60.0);
        let distance = (framing.focus_point() - Vector3::X * 10.0).length();
        assert!((distance - framing.focus_radius).abs() < 1e-4);
    }

    #[test]
    fn gravity_alignment_speed_is_bounded() {
        let mut framing = GravisOrbitFraming::new(Entity::from_raw(0));
        framing.up_alignment_speed = 90.0;
        framing.update_gravity_alignment(Dir3::Y, 1.0 / 60.0);
        framing.initialized = true;
        // Up flips to +X (a 90 degree change); in one 1/60s step only 1.5 degrees may pass.
        framing.update_gravity_alignment(Dir3::X, 1.0 / 60.0);
        let aligned_up = framing.gravity_alignment * Vector3::Y;
        let angle_from_start = aligned_up.dot(Vector3::Y).clamp(-1.0, 1.0).acos().to_degrees();
        assert!(angle_from_start < 2.0);
        assert!(angle_from_start > 1.0);
    }

    #[test]
    fn vertical_angle_is_clamped() {
        let mut framing = GravisOrbitFraming::new(Entity::from_raw(0));
        framing.orbit_angles = Vector2::new(80.0, -10.0);
        framing.constrain_angles();
        assert_eq!(framing.orbit_angles.x, framing.max_vertical_angle);
        assert_eq!(framing.orbit_angles.y, 350.0);
    }
}

//! Small math helpers used by the locomotion controller.
use crate::math::{Float, Vector3};

/// Move `current` toward `target` by at most `max_delta`, never overshooting.
///
/// This is the scalar building block of the controller's acceleration limiting - each steering
/// axis component is moved toward its desired value by at most `acceleration * frame_duration`.
pub fn move_towards(current: Float, target: Float, max_delta: Float) -> Float {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + delta.signum() * max_delta
    }
}

/// Project `direction` onto the plane orthogonal to `normal` and normalize the result.
///
/// Used to express input axes and steering axes relative to the slope the character stands on.
/// Returns zero when `direction` is parallel to `normal`.
pub fn project_direction_on_plane(direction: Vector3, normal: Vector3) -> Vector3 {
    (direction - normal * direction.dot(normal)).normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_towards_clamps_the_step() {
        assert_eq!(move_towards(0.0, 10.0, 1.0), 1.0);
        assert_eq!(move_towards(0.0, -10.0, 1.0), -1.0);
        assert_eq!(move_towards(0.0, 0.5, 1.0), 0.5);
        assert_eq!(move_towards(2.0, 2.0, 1.0), 2.0);
    }

    #[test]
    fn projected_direction_is_tangent_and_unit_length() {
        let projected = project_direction_on_plane(Vector3::new(1.0, 1.0, 0.0), Vector3::Y);
        assert!((projected - Vector3::X).length() < 1e-6);
        assert_eq!(
            project_direction_on_plane(Vector3::Y, Vector3::Y),
            Vector3::ZERO
        );
    }
}

use bevy::prelude::*;

use crate::math::{AdjustPrecision, Float, Vector3};

/// Distances get clamped to this before any division, so a query at the exact attracting
/// point yields a finite pull instead of a NaN.
const DISTANCE_EPSILON: Float = 1e-4;

/// A shape that contributes a directional, position-dependent gravity vector to the field.
///
/// Spawn this component together with a `GlobalTransform` and the source participates in the
/// [`GravisField`](crate::GravisField) aggregation from the next step on; removing the
/// component (or despawning the entity) unregisters it. Shape parameters are plain tunables -
/// changing them takes effect on the next bake, without any re-registration.
///
/// The set of shapes is closed on purpose: the field stores baked copies by value, and the
/// dispatch in [`BakedGravitySource::gravity_at`] stays a simple `match`.
#[derive(Component, Debug, Clone)]
pub enum GravitySource {
    /// An infinite plane with finite-range, linear-falloff gravity. See [`GravityPlane`].
    Plane(GravityPlane),
    /// A ring-shaped attractor. See [`GravityTorus`].
    Torus(GravityTorus),
    /// Constant-magnitude attraction toward a center point. See [`GravityPoint`].
    Point(GravityPoint),
}

/// The world-space frame a source was baked with - its origin and its transform's up axis.
#[derive(Debug, Clone, Copy)]
pub struct GravitySourceFrame {
    pub position: Vector3,
    /// The transform's local Y axis in world space. Always unit length.
    pub up: Vector3,
}

/// A [`GravitySource`] snapshot taken from a source entity's `GlobalTransform`, stored inside
/// the field. Bake again after moving the source or changing its parameters.
#[derive(Debug, Clone)]
pub struct BakedGravitySource {
    frame: GravitySourceFrame,
    source: GravitySource,
}

impl GravitySource {
    pub fn bake(&self, transform: &GlobalTransform) -> BakedGravitySource {
        let (_, rotation, translation) = transform.to_scale_rotation_translation();
        BakedGravitySource {
            frame: GravitySourceFrame {
                position: translation.adjust_precision(),
                up: (rotation * Vec3::Y).adjust_precision(),
            },
            source: self.clone(),
        }
    }
}

impl BakedGravitySource {
    /// The gravity this source contributes at `position`, in world space.
    pub fn gravity_at(&self, position: Vector3) -> Vector3 {
        match &self.source {
            GravitySource::Plane(plane) => plane.gravity_at(&self.frame, position),
            GravitySource::Torus(torus) => torus.gravity_at(&self.frame, position),
            GravitySource::Point(point) => point.gravity_at(&self.frame, position),
        }
    }
}

/// Gravity that pulls toward an infinite plane, along the plane's own up axis.
///
/// The pull is exactly `-gravity * up` on or below the plane, scales linearly to zero as the
/// distance above the surface approaches [`min_range`](Self::min_range), and is strictly zero
/// beyond it - with no discontinuity at the boundary.
#[derive(Debug, Clone)]
pub struct GravityPlane {
    /// The acceleration magnitude on the plane's surface.
    pub gravity: Float,

    /// Distance above the plane beyond which this source contributes nothing.
    pub min_range: Float,
}

impl Default for GravityPlane {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            min_range: 1.0,
        }
    }
}

impl GravityPlane {
    pub fn gravity_at(&self, frame: &GravitySourceFrame, position: Vector3) -> Vector3 {
        let distance = frame.up.dot(position - frame.position);
        if distance > self.min_range {
            return Vector3::ZERO;
        }
        let mut g = -self.gravity;
        if distance > 0.0 {
            g *= 1.0 - distance / self.min_range;
        }
        g * frame.up
    }
}

/// Gravity that pulls toward a ring lying in the source's equatorial plane.
///
/// The attracting ring's radius is the average of [`inner_radius`](Self::inner_radius) and
/// [`outer_radius`](Self::outer_radius). Within `outer_radius` of the ring the pull has the
/// full `gravity` magnitude; beyond it the pull attenuates linearly, reaching zero at
/// [`outer_falloff_radius`](Self::outer_falloff_radius).
///
/// Radius ordering is enforced by clamping rather than rejection - a misconfigured torus
/// still produces a usable shape.
#[derive(Debug, Clone)]
pub struct GravityTorus {
    /// The acceleration magnitude near the attracting ring.
    pub gravity: Float,

    /// Inner radius of the torus tube. Clamped to be non-negative.
    pub inner_radius: Float,

    /// Outer radius of the torus tube. Clamped to be at least `inner_radius`.
    pub outer_radius: Float,

    /// Distance from the ring at which the pull has attenuated to zero. Clamped to be at
    /// least `outer_radius`; when equal to it, gravity cuts to zero right past the tube.
    pub outer_falloff_radius: Float,
}

impl Default for GravityTorus {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            inner_radius: 25.0,
            outer_radius: 50.0,
            outer_falloff_radius: 100.0,
        }
    }
}

impl GravityTorus {
    /// The clamped `(gravity_radius, outer_radius, outer_falloff_radius)` triple actually used
    /// by the math.
    fn effective_radii(&self) -> (Float, Float, Float) {
        let inner = self.inner_radius.max(0.0);
        let outer = self.outer_radius.max(inner);
        let falloff = self.outer_falloff_radius.max(outer);
        (0.5 * (inner + outer), outer, falloff)
    }

    pub fn gravity_at(&self, frame: &GravitySourceFrame, position: Vector3) -> Vector3 {
        let (gravity_radius, outer_radius, falloff_radius) = self.effective_radii();

        let plane_distance = frame.up.dot(position - frame.position);
        let nearest_on_plane = position - frame.up * plane_distance;
        // A query on the torus axis has no radial component; the ring point then collapses to
        // the torus center and the pull aims straight at it.
        let radial = (nearest_on_plane - frame.position).normalize_or_zero();
        let ring_point = frame.position + radial * gravity_radius;

        let vector = ring_point - position;
        let distance = vector.length().max(DISTANCE_EPSILON);

        let mut g = self.gravity / distance;
        if distance > outer_radius {
            let falloff_span = falloff_radius - outer_radius;
            if falloff_span <= 0.0 {
                return Vector3::ZERO;
            }
            let falloff = 1.0 - (distance - outer_radius) / falloff_span;
            if falloff <= 0.0 {
                return Vector3::ZERO;
            }
            g *= falloff;
        }
        g * vector
    }
}

/// Constant-magnitude attraction toward a center point.
///
/// The simplest source - mostly useful as a baseline for testing aggregation, or for small
/// point attractors where an inverse-square profile is not worth tuning.
#[derive(Debug, Clone)]
pub struct GravityPoint {
    /// The acceleration magnitude, applied at every distance.
    pub gravity: Float,
}

impl Default for GravityPoint {
    fn default() -> Self {
        Self { gravity: 9.81 }
    }
}

impl GravityPoint {
    pub fn gravity_at(&self, frame: &GravitySourceFrame, position: Vector3) -> Vector3 {
        let vector = frame.position - position;
        let distance = vector.length();
        if distance < DISTANCE_EPSILON {
            return Vector3::ZERO;
        }
        self.gravity * vector / distance
    }
}

use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::math::{AsF32, Vector3};
use crate::sources::{BakedGravitySource, GravitySource};

/// Gravity could not be normalized into an up axis because the aggregated vector is zero.
///
/// This happens at points where no source is in range, or where overlapping sources cancel
/// out exactly. It is a policy decision of the caller what "up" means there -
/// [`GravisField::up_axis_at`] falls back to [`GravisField::fallback_up`], while
/// [`GravisField::try_up_axis_at`] surfaces this error instead.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("aggregated gravity at the queried position is zero")]
pub struct ZeroGravity;

/// The aggregated gravity field - the set of all currently registered gravity sources.
///
/// This is an explicitly owned resource rather than ambient global state: it is created by
/// [`GravisControllerPlugin`](crate::GravisControllerPlugin) at app setup (or by hand in
/// tests) and passed by reference into every query site.
///
/// Source entities are registered automatically: every entity carrying a [`GravitySource`]
/// and a `GlobalTransform` is rebaked into the field at the start of each step, and entities
/// whose `GravitySource` was removed are unregistered. The map is keyed by the source entity,
/// which gives set semantics (re-registering overwrites, unregistering a non-member is a
/// no-op) and a stable accumulation order, so aggregation does not depend on spawn order.
#[derive(Resource, Debug)]
pub struct GravisField {
    sources: BTreeMap<Entity, BakedGravitySource>,
    /// The up axis reported where the aggregated gravity is exactly zero.
    pub fallback_up: Dir3,
}

impl Default for GravisField {
    fn default() -> Self {
        Self {
            sources: BTreeMap::new(),
            fallback_up: Dir3::Y,
        }
    }
}

impl GravisField {
    /// Add a baked source under the given id, replacing any previous bake for that id.
    pub fn register(&mut self, id: Entity, source: BakedGravitySource) {
        self.sources.insert(id, source);
    }

    /// Remove the source registered under the given id. No-op if there is none.
    pub fn unregister(&mut self, id: Entity) {
        self.sources.remove(&id);
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// The vector sum of every registered source's contribution at `position`.
    ///
    /// Iteration order over the sources is stable (sorted by entity id), so the floating
    /// point accumulation is reproducible between queries.
    pub fn gravity_at(&self, position: Vector3) -> Vector3 {
        self.sources
            .values()
            .fold(Vector3::ZERO, |sum, source| sum + source.gravity_at(position))
    }

    /// The unit vector opposite the aggregated gravity, or [`ZeroGravity`] when there is no
    /// gravity to derive it from.
    pub fn try_up_axis_at(&self, position: Vector3) -> Result<Dir3, ZeroGravity> {
        Dir3::new(-self.gravity_at(position).f32()).map_err(|_| ZeroGravity)
    }

    /// The unit vector opposite the aggregated gravity, falling back to
    /// [`fallback_up`](Self::fallback_up) when the aggregated gravity is zero.
    ///
    /// The fallback guarantees a usable axis - NaN never leaks into the velocity pipeline.
    pub fn up_axis_at(&self, position: Vector3) -> Dir3 {
        self.try_up_axis_at(position)
            .unwrap_or(self.fallback_up)
    }

    /// The gravity vector and derived up axis in one query - what the locomotion controller
    /// fetches once per step at the body's position.
    pub fn gravity_and_up_at(&self, position: Vector3) -> (Vector3, Dir3) {
        let gravity = self.gravity_at(position);
        let up = Dir3::new(-gravity.f32()).unwrap_or(self.fallback_up);
        (gravity, up)
    }
}

/// Rebakes every gravity source entity into the [`GravisField`] and drops sources whose
/// [`GravitySource`] component went away.
///
/// Runs in [`GravisPipelineStages::Sensors`](crate::GravisPipelineStages::Sensors), so moved
/// sources and changed parameters take effect in the same step's gravity queries.
pub(crate) fn sync_gravity_sources_system(
    mut field: ResMut<GravisField>,
    mut removed: RemovedComponents<GravitySource>,
    query: Query<(Entity, &GlobalTransform, &GravitySource)>,
) {
    for entity in removed.read() {
        field.unregister(entity);
    }
    for (entity, transform, source) in query.iter() {
        field.register(entity, source.bake(transform));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Float;
    use crate::sources::{GravityPlane, GravityPoint};

    fn point_source(position: Vector3, gravity: Float) -> BakedGravitySource {
        GravitySource::Point(GravityPoint { gravity })
            .bake(&GlobalTransform::from(Transform::from_translation(
                position.f32(),
            )))
    }

    #[test]
    fn aggregation_is_order_independent() {
        let sources = [
            point_source(Vector3::X * 10.0, 3.0),
            point_source(Vector3::Y * 10.0, 5.0),
            point_source(Vector3::new(-4.0, 7.0, 2.0), 9.81),
        ];
        let query_point = Vector3::new(1.0, 2.0, 3.0);

        let mut forward = GravisField::default();
        let mut backward = GravisField::default();
        for (index, source) in sources.iter().enumerate() {
            forward.register(Entity::from_raw(index as u32), source.clone());
        }
        for (index, source) in sources.iter().enumerate().rev() {
            backward.register(Entity::from_raw(index as u32), source.clone());
        }

        let difference = forward.gravity_at(query_point) - backward.gravity_at(query_point);
        assert!(difference.length() < 1e-6);
    }

    #[test]
    fn register_is_idempotent_and_unregister_tolerates_non_members() {
        let mut field = GravisField::default();
        let id = Entity::from_raw(1);
        field.register(id, point_source(Vector3::X * 5.0, 9.81));
        field.register(id, point_source(Vector3::X * 5.0, 9.81));
        // A doubly-registered source must still contribute only once.
        let gravity = field.gravity_at(Vector3::ZERO);
        assert!((gravity.length() - 9.81).abs() < 1e-5);

        field.unregister(Entity::from_raw(77));
        field.unregister(id);
        field.unregister(id);
        assert!(field.is_empty());
        assert_eq!(field.gravity_at(Vector3::ZERO), Vector3::ZERO);
    }

    #[test]
    fn up_axis_opposes_the_aggregated_gravity() {
        let mut field = GravisField::default();
        field.register(Entity::from_raw(0), point_source(Vector3::X * -10.0, 9.81));
        let up = field.up_axis_at(Vector3::ZERO);
        // Gravity pulls toward -X, so up is +X.
        assert!((up.as_vec3() - bevy::math::Vec3::X).length() < 1e-5);
        assert!(field.try_up_axis_at(Vector3::ZERO).is_ok());
    }

    #[test]
    fn zero_gravity_falls_back_instead_of_propagating_nan() {
        let mut field = GravisField::default();
        field.fallback_up = Dir3::Z;
        assert_eq!(field.try_up_axis_at(Vector3::ZERO), Err(ZeroGravity));
        assert_eq!(field.up_axis_at(Vector3::ZERO), Dir3::Z);

        // Two opposing point sources cancel exactly halfway between them.
        field.register(Entity::from_raw(0), point_source(Vector3::X * 10.0, 9.81));
        field.register(Entity::from_raw(1), point_source(Vector3::X * -10.0, 9.81));
        assert!(field.gravity_at(Vector3::ZERO).length() < 1e-6);
        assert_eq!(field.up_axis_at(Vector3::ZERO), Dir3::Z);
    }

    #[test]
    fn plane_source_only_pulls_within_range() {
        let mut field = GravisField::default();
        field.register(
            Entity::from_raw(0),
            GravitySource::Plane(GravityPlane {
                gravity: 9.81,
                min_range: 2.0,
            })
            .bake(&GlobalTransform::IDENTITY),
        );
        assert_eq!(field.gravity_at(Vector3::Y * 3.0), Vector3::ZERO);
        let (gravity, up) = field.gravity_and_up_at(Vector3::Y * 0.5);
        assert!(gravity.y < 0.0);
        assert_eq!(up, Dir3::Y);
    }
}

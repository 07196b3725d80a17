use std::collections::HashMap;

use glam::{IVec2, Vec2};
use rapier2d::parry::bounding_volume::{Aabb, BoundingVolume};
use rapier2d::prelude::*;
use serde::Deserialize;

use crate::api::error::{PhysicsError, Result};
use crate::api::types::InstanceId;
use crate::components::body::{BodyKind, BodyShape};
use crate::components::instance::Instance;
use crate::core::collection::{CollectionEvent, InstanceCollection};

// ---------------------------------------------------------------------------
// Conversion helpers (private): glam ↔ nalgebra
// ---------------------------------------------------------------------------

fn vec2_to_na(v: Vec2) -> nalgebra::Vector2<f32> {
    nalgebra::Vector2::new(v.x, v.y)
}

fn na_to_vec2(v: &nalgebra::Vector2<f32>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

fn na_iso_to_pos_rot(iso: &nalgebra::Isometry2<f32>) -> (Vec2, f32) {
    let pos = Vec2::new(iso.translation.x, iso.translation.y);
    let rot = iso.rotation.angle();
    (pos, rot)
}

impl BodyKind {
    fn to_rapier(self) -> RigidBodyType {
        match self {
            BodyKind::Dynamic => RigidBodyType::Dynamic,
            BodyKind::Static => RigidBodyType::Fixed,
            BodyKind::Kinematic => RigidBodyType::KinematicVelocityBased,
        }
    }
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Unit conversion between the display and the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Display units per simulation unit.
    pub units_per_meter: f32,
    /// Simulation time per millisecond of logic interval.
    pub time_scale: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            units_per_meter: 10.0,
            time_scale: 0.01,
        }
    }
}

/// Rapier handles paired with one instance.
#[derive(Debug, Clone, Copy)]
pub struct PhysicsBody {
    pub body_handle: RigidBodyHandle,
    pub collider_handle: ColliderHandle,
}

/// Body outline in display units, for debug drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyOutline {
    pub id: InstanceId,
    pub center: Vec2,
    /// Radians.
    pub rotation: f32,
    pub shape: BodyShape,
}

// ---------------------------------------------------------------------------
// PhysicsWorld
// ---------------------------------------------------------------------------

/// Rapier world plus the instance ↔ body pairing of one scene instance.
///
/// Bodies are added and released from the collection's add/remove events;
/// `update_cycle` pushes instance kinematics, steps, and pulls the result back.
pub struct PhysicsWorld {
    config: PhysicsConfig,
    gravity: nalgebra::Vector2<f32>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    pub(crate) bodies: RigidBodySet,
    pub(crate) colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    pairs: HashMap<InstanceId, PhysicsBody>,
}

impl std::fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("config", &self.config)
            .field("gravity", &na_to_vec2(&self.gravity))
            .field("bodies", &self.pairs.len())
            .finish_non_exhaustive()
    }
}

impl PhysicsWorld {
    /// Gravity is in simulation units; positive Y points down the screen.
    pub fn new(gravity: Vec2, config: PhysicsConfig) -> Self {
        Self {
            config,
            gravity: vec2_to_na(gravity),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            pairs: HashMap::new(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn gravity(&self) -> Vec2 {
        na_to_vec2(&self.gravity)
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = vec2_to_na(gravity);
    }

    fn to_sim(&self, v: Vec2) -> nalgebra::Vector2<f32> {
        vec2_to_na(v / self.config.units_per_meter)
    }

    fn to_display(&self, v: &nalgebra::Vector2<f32>) -> Vec2 {
        na_to_vec2(v) * self.config.units_per_meter
    }

    /// Create the body for `instance` at its current position and angle.
    ///
    /// The instance id is stored in the body's `user_data` for collision lookups.
    pub fn add_body(&mut self, instance: &Instance) -> Result<PhysicsBody, PhysicsError> {
        let id = instance.id();
        if self.pairs.contains_key(&id) {
            return Err(PhysicsError::DuplicateBody(id));
        }
        let attrs = &instance.physics_attributes;
        attrs.shape.validate()?;

        let upm = self.config.units_per_meter;
        let rb = RigidBodyBuilder::new(attrs.kind.to_rapier())
            .translation(self.to_sim(instance.position.as_vec2()))
            .rotation(instance.image_angle.to_radians())
            .linvel(self.to_sim(instance.physics.velocity))
            .linear_damping(attrs.linear_damping)
            .locked_axes(if attrs.fixed_rotation {
                LockedAxes::ROTATION_LOCKED
            } else {
                LockedAxes::empty()
            })
            .user_data(id.as_u128())
            .build();
        let body_handle = self.bodies.insert(rb);

        let builder = match attrs.shape {
            BodyShape::Box { width, height } => {
                ColliderBuilder::cuboid(width / upm / 2.0, height / upm / 2.0)
            }
            BodyShape::Circle { radius } => ColliderBuilder::ball(radius / upm),
        };
        let collider = builder
            .density(attrs.density)
            .friction(attrs.friction)
            .restitution(attrs.restitution)
            .build();
        let collider_handle =
            self.colliders
                .insert_with_parent(collider, body_handle, &mut self.bodies);

        let body = PhysicsBody {
            body_handle,
            collider_handle,
        };
        self.pairs.insert(id, body);
        log::trace!("physics body added for {} ({id})", instance.name());
        Ok(body)
    }

    /// Remove the body paired with `id`, with all its colliders.
    pub fn remove_body(&mut self, id: InstanceId) -> Result<(), PhysicsError> {
        let body = self
            .pairs
            .remove(&id)
            .ok_or(PhysicsError::UnknownBody(id))?;
        self.bodies.remove(
            body.body_handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        Ok(())
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.pairs.contains_key(&id)
    }

    pub fn body(&self, id: InstanceId) -> Option<PhysicsBody> {
        self.pairs.get(&id).copied()
    }

    /// Number of rigid bodies in the simulation.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Register and release bodies from drained collection events.
    ///
    /// Added instances without physics enabled are skipped; removed
    /// instances without a body are ignored.
    pub fn apply_events(
        &mut self,
        events: &[CollectionEvent],
        instances: &InstanceCollection,
    ) -> Result<(), PhysicsError> {
        for event in events {
            match *event {
                CollectionEvent::Added(id) => {
                    if let Some(inst) = instances.get(id) {
                        if inst.physics_attributes.enabled {
                            self.add_body(inst)?;
                        }
                    }
                }
                CollectionEvent::Removed(id) => {
                    if self.contains(id) {
                        self.remove_body(id)?;
                    }
                }
                CollectionEvent::Accessed(_) => {}
            }
        }
        Ok(())
    }

    /// Teleport the body of `id`. The only path that pushes position into the simulation.
    pub fn set_object_position(&mut self, id: InstanceId, position: IVec2) -> Result<(), PhysicsError> {
        let body = *self.pairs.get(&id).ok_or(PhysicsError::UnknownBody(id))?;
        let translation = self.to_sim(position.as_vec2());
        if let Some(rb) = self.bodies.get_mut(body.body_handle) {
            rb.set_translation(translation, true);
        }
        self.bodies
            .propagate_modified_body_positions_to_colliders(&mut self.colliders);
        Ok(())
    }

    /// Push instance kinematics, step by `interval_ms`, pull the result back.
    pub fn update_cycle(&mut self, instances: &mut InstanceCollection, interval_ms: f64) {
        // push
        for inst in instances.iter_mut_keep_order() {
            let Some(body) = self.pairs.get(&inst.id()).copied() else {
                continue;
            };
            let linvel = self.to_sim(inst.physics.velocity);
            if let Some(rb) = self.bodies.get_mut(body.body_handle) {
                rb.set_linvel(linvel, true);
                rb.set_rotation(
                    nalgebra::UnitComplex::new(inst.image_angle.to_radians()),
                    true,
                );
                rb.set_linear_damping(inst.physics_attributes.linear_damping);
            }
            if let Some(collider) = self.colliders.get_mut(body.collider_handle) {
                collider.set_friction(inst.physics_attributes.friction);
            }
        }

        self.step(interval_ms);

        // pull
        for inst in instances.iter_mut_keep_order() {
            let Some(body) = self.pairs.get(&inst.id()).copied() else {
                continue;
            };
            let Some(rb) = self.bodies.get(body.body_handle) else {
                continue;
            };
            let (pos, rot) = na_iso_to_pos_rot(rb.position());
            let pos = pos * self.config.units_per_meter;
            let velocity = self.to_display(rb.linvel());
            inst.position = IVec2::new(pos.x.round() as i32, pos.y.round() as i32);
            inst.image_angle = rot.to_degrees();
            inst.normalize_angle();
            inst.physics.set_velocity(velocity);
        }
    }

    /// Advance the simulation by `interval_ms` of logic time.
    pub fn step(&mut self, interval_ms: f64) {
        let dt = (interval_ms as f32) * self.config.time_scale;
        if dt <= 0.0 {
            return;
        }
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Instances whose bodies overlap the body of `id` shifted by `offset`
    /// display units. Deduplicated, excluding `id` itself and untagged bodies.
    pub fn check_collision(&mut self, id: InstanceId, offset: IVec2) -> Result<Vec<InstanceId>, PhysicsError> {
        let body = *self.pairs.get(&id).ok_or(PhysicsError::UnknownBody(id))?;
        let Some(rb) = self.bodies.get(body.body_handle) else {
            return Ok(Vec::new());
        };

        let mut bounds: Option<Aabb> = None;
        for handle in rb.colliders() {
            if let Some(collider) = self.colliders.get(*handle) {
                let aabb = collider.compute_aabb();
                bounds = Some(match bounds {
                    Some(acc) => acc.merged(&aabb),
                    None => aabb,
                });
            }
        }
        let Some(bounds) = bounds else {
            return Ok(Vec::new());
        };
        let shift = self.to_sim(offset.as_vec2());
        let query = Aabb::new(bounds.mins + shift, bounds.maxs + shift);

        self.query_pipeline.update(&self.colliders);
        let mut found = Vec::new();
        self.query_pipeline
            .colliders_with_aabb_intersecting_aabb(&query, |handle| {
                if let Some(other) = self.collider_to_instance(*handle) {
                    if other != id && !found.contains(&other) {
                        found.push(other);
                    }
                }
                true
            });
        Ok(found)
    }

    /// Outlines of every paired body, in display units.
    pub fn outlines(&self) -> Vec<BodyOutline> {
        let upm = self.config.units_per_meter;
        let mut out = Vec::with_capacity(self.pairs.len());
        for (id, body) in &self.pairs {
            let (Some(rb), Some(collider)) = (
                self.bodies.get(body.body_handle),
                self.colliders.get(body.collider_handle),
            ) else {
                continue;
            };
            let shape = collider.shape();
            let shape = if let Some(ball) = shape.as_ball() {
                BodyShape::Circle {
                    radius: ball.radius * upm,
                }
            } else if let Some(cuboid) = shape.as_cuboid() {
                BodyShape::Box {
                    width: cuboid.half_extents.x * 2.0 * upm,
                    height: cuboid.half_extents.y * 2.0 * upm,
                }
            } else {
                continue;
            };
            let (pos, rotation) = na_iso_to_pos_rot(rb.position());
            out.push(BodyOutline {
                id: *id,
                center: pos * upm,
                rotation,
                shape,
            });
        }
        out
    }

    // -- private helpers --

    fn collider_to_instance(&self, collider_handle: ColliderHandle) -> Option<InstanceId> {
        let collider = self.colliders.get(collider_handle)?;
        let body_handle = collider.parent()?;
        let body = self.bodies.get(body_handle)?;
        // 0 marks a body created outside the instance pairing
        (body.user_data != 0).then(|| InstanceId::from_u128(body.user_data))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

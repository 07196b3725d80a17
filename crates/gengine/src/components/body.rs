use glam::Vec2;

use crate::api::error::PhysicsError;

/// Collision shape of a physics body, in display units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyShape {
    Box { width: f32, height: f32 },
    Circle { radius: f32 },
}

impl BodyShape {
    pub fn validate(&self) -> Result<(), PhysicsError> {
        match *self {
            BodyShape::Box { width, height } if width > 0.0 && height > 0.0 => Ok(()),
            BodyShape::Box { width, height } => Err(PhysicsError::InvalidShape(format!(
                "box must have positive size, got {width}x{height}"
            ))),
            BodyShape::Circle { radius } if radius > 0.0 => Ok(()),
            BodyShape::Circle { radius } => Err(PhysicsError::InvalidShape(format!(
                "circle must have a positive radius, got {radius}"
            ))),
        }
    }
}

/// How the simulation moves a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyKind {
    #[default]
    Dynamic,
    Static,
    Kinematic,
}

/// Per-instance body description. Copied from the template when the instance is created.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsAttributes {
    /// Instances without `enabled` never get a body.
    pub enabled: bool,
    pub kind: BodyKind,
    pub shape: BodyShape,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    pub linear_damping: f32,
    pub fixed_rotation: bool,
}

impl Default for PhysicsAttributes {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: BodyKind::Dynamic,
            shape: BodyShape::Box {
                width: 1.0,
                height: 1.0,
            },
            density: 1.0,
            friction: 0.3,
            restitution: 0.0,
            linear_damping: 0.0,
            fixed_rotation: false,
        }
    }
}

impl PhysicsAttributes {
    pub fn boxed(width: f32, height: f32) -> Self {
        Self {
            enabled: true,
            shape: BodyShape::Box { width, height },
            ..Default::default()
        }
    }

    pub fn circle(radius: f32) -> Self {
        Self {
            enabled: true,
            shape: BodyShape::Circle { radius },
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: BodyKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_linear_damping(mut self, damping: f32) -> Self {
        self.linear_damping = damping;
        self
    }

    pub fn with_fixed_rotation(mut self, fixed: bool) -> Self {
        self.fixed_rotation = fixed;
        self
    }
}

/// Kinematic state exchanged with the physics world every logic step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhysicsVariables {
    /// Display units per simulation second.
    pub velocity: Vec2,
    /// Heading of `velocity` in degrees, `[0, 360)`.
    pub direction: f32,
}

impl PhysicsVariables {
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Set velocity and recompute the heading.
    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
        if velocity != Vec2::ZERO {
            self.direction = velocity.y.atan2(velocity.x).to_degrees().rem_euclid(360.0);
        }
    }
}

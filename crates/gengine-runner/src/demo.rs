//! Headless demo: balls dropping onto a floor, a spinning coin, and a spawner.

use std::sync::Arc;

use glam::{IVec2, Vec2};
use gengine::{
    BodyKind, EngineContext, Game, GameObject, Instance, ObjectBehavior, PhysicsAttributes,
    ResourceManager, Result, Scene, SceneContext, TextureManifest,
};

const MANIFEST: &str = r#"{
  "textures": [
    { "name": "ball", "path": "ball.png", "frame_width": 16, "frame_height": 16 },
    { "name": "coin", "path": "coin.png", "frames": 4, "frame_width": 12, "frame_height": 12 },
    { "name": "floor", "path": "floor.png", "frame_width": 640, "frame_height": 20 }
  ]
}"#;

/// Balls spawned before the spawner goes quiet.
const MAX_BALLS: i64 = 8;
/// Logic steps between spawns.
const SPAWN_EVERY: i64 = 32;

struct Spinner;

impl ObjectBehavior for Spinner {
    fn step(&self, instance: &mut Instance, _ctx: &mut SceneContext<'_>) -> Result<()> {
        instance.image_angle += 6.0;
        instance.normalize_angle();
        Ok(())
    }
}

struct Spawner {
    ball: Arc<GameObject>,
}

impl ObjectBehavior for Spawner {
    fn step(&self, instance: &mut Instance, ctx: &mut SceneContext<'_>) -> Result<()> {
        let ticks = instance.variable("ticks").and_then(|v| v.as_i64()).unwrap_or(0) + 1;
        let spawned = instance.variable("spawned").and_then(|v| v.as_i64()).unwrap_or(0);
        instance.set_variable("ticks", ticks);
        if ticks % SPAWN_EVERY == 0 && spawned < MAX_BALLS {
            let x = instance.position.x + (spawned as i32 - MAX_BALLS as i32 / 2) * 40;
            ctx.spawn(&self.ball, IVec2::new(x, instance.position.y));
            instance.set_variable("spawned", spawned + 1);
        }
        Ok(())
    }
}

/// Removes balls that left the world.
struct Ball;

impl ObjectBehavior for Ball {
    fn step(&self, instance: &mut Instance, ctx: &mut SceneContext<'_>) -> Result<()> {
        if instance.position.y > 600 {
            ctx.destroy(instance.id());
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct DemoGame;

impl Game for DemoGame {
    fn init(&mut self, ctx: &mut EngineContext) -> Result<()> {
        let manifest = TextureManifest::from_json(MANIFEST)?;
        manifest.register_into(&mut ctx.textures);

        let ball = ctx.objects.add(
            GameObject::new("ball")
                .with_sprite(ctx.textures.texture("ball")?)
                .with_physics(PhysicsAttributes::circle(8.0).with_friction(0.4))
                .with_offset(IVec2::new(-8, -8))
                .with_depth(1)
                .with_behavior(Ball),
        )?;
        let floor = ctx.objects.add(
            GameObject::new("floor")
                .with_sprite(ctx.textures.texture("floor")?)
                .with_physics(PhysicsAttributes::boxed(640.0, 20.0).with_kind(BodyKind::Static))
                .with_offset(IVec2::new(-320, -10)),
        )?;
        let coin = ctx.objects.add(
            GameObject::new("coin")
                .with_sprite(ctx.textures.texture("coin")?)
                .with_image_speed(3)
                .with_depth(2)
                .with_optimized(true)
                .with_behavior(Spinner),
        )?;
        let spawner = ctx.objects.add(
            GameObject::new("spawner").with_behavior(Spawner {
                ball: Arc::clone(&ball),
            }),
        )?;

        ctx.scenes.add_scene(
            Scene::new("playground")
                .with_physics(Vec2::new(0.0, 9.81))
                .place(&floor, IVec2::new(320, 470))
                .place(&ball, IVec2::new(300, 100))
                .place(&coin, IVec2::new(600, 40))
                .place(&spawner, IVec2::new(320, 20)),
        )?;
        ctx.load_scene("playground")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gengine::{CommandBuffer, GameLoop, InputQueue, ManualClock, EngineProperties};

    #[test]
    fn demo_runs_headless_and_spawns_balls() {
        let clock = ManualClock::new();
        let mut gl = GameLoop::with_clock(EngineProperties::default(), clock.clone());
        let mut ctx = EngineContext::new();
        let mut game = DemoGame;
        game.init(&mut ctx).unwrap();
        let mut input = InputQueue::new();
        let mut buf = CommandBuffer::new();
        for _ in 0..200 {
            clock.advance(16.0);
            gl.tick(&mut ctx, &mut game, &mut input, &mut buf).unwrap();
        }

        let scene = ctx.active_scene().unwrap();
        let balls = scene
            .instances()
            .iter()
            .filter(|i| i.name() == "ball")
            .count();
        assert!(balls > 1, "spawner should have added balls");
        assert!(buf.presents > 0);
        let floor = scene.instances().find_by_name("floor").unwrap();
        assert_eq!(floor.position, IVec2::new(320, 470));
    }
}

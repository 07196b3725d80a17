use glam::IVec2;

use crate::api::error::Result;
use crate::api::types::ColorRGBA;
use crate::components::instance::Instance;
use crate::core::scene::SceneInstance;
use crate::core::scheduler::LoopStats;
use crate::renderer::traits::{Renderer, SpriteDraw};

/// Default draw hook: the instance's current sprite frame with its transform.
/// Instances without a sprite draw nothing.
pub fn draw_instance_sprite(
    instance: &Instance,
    renderer: &mut dyn Renderer,
    view_offset: IVec2,
) -> Result<()> {
    let Some(sprite) = instance.sprite() else {
        return Ok(());
    };
    renderer.draw_sprite(&SpriteDraw {
        sprite,
        position: instance.position,
        angle: instance.image_angle,
        scale: instance.scale,
        frame: instance.image_index(),
        offset: instance.offset,
        view_offset,
        flip_x: instance.flip_x,
        flip_y: instance.flip_y,
    })
}

/// Draw every activated instance in collection order through its object's draw hook.
/// With `draw_bounds`, physics body outlines are drawn on top.
pub fn draw_scene(scene: &SceneInstance, renderer: &mut dyn Renderer, draw_bounds: bool) -> Result<()> {
    let view_offset = scene.view().top_left();
    for inst in scene.instances().iter() {
        if !inst.activated {
            continue;
        }
        inst.object().behavior().draw(inst, renderer, view_offset)?;
    }

    #[cfg(feature = "physics")]
    if draw_bounds {
        if let Some(physics) = scene.physics() {
            crate::systems::debug::draw_body_outlines(physics, renderer, view_offset)?;
        }
    }
    #[cfg(not(feature = "physics"))]
    let _ = draw_bounds;
    Ok(())
}

/// FPS/TPS readout in the top-left corner.
pub fn draw_overlay(stats: &LoopStats, renderer: &mut dyn Renderer) -> Result<()> {
    let previous = renderer.draw_color();
    renderer.set_draw_color(if stats.poor_framerate || stats.poor_logicrate {
        ColorRGBA::RED
    } else {
        ColorRGBA::WHITE
    });
    renderer.draw_text(&format!("FPS: {:.1}", stats.fps), IVec2::new(4, 4))?;
    renderer.draw_text(&format!("TPS: {:.1}", stats.tps), IVec2::new(4, 16))?;
    renderer.set_draw_color(previous);
    Ok(())
}

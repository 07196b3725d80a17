//! Debug rendering: opt-in physics body outlines.

use glam::{IVec2, Vec2};

use crate::api::error::Result;
use crate::api::types::ColorRGBA;
use crate::components::body::BodyShape;
use crate::core::physics::PhysicsWorld;
use crate::renderer::traits::Renderer;

/// Draw a wireframe outline for every physics body.
///
/// Boxes are drawn as rotated rectangles, circles through the renderer's
/// circle primitive.
pub fn draw_body_outlines(
    physics: &PhysicsWorld,
    renderer: &mut dyn Renderer,
    view_offset: IVec2,
) -> Result<()> {
    let previous = renderer.draw_color();
    renderer.set_draw_color(ColorRGBA::GREEN);
    for outline in physics.outlines() {
        let center = outline.center - view_offset.as_vec2();
        match outline.shape {
            BodyShape::Circle { radius } => {
                renderer.draw_circle(to_screen(center), radius.round() as i32, false)?;
            }
            BodyShape::Box { width, height } => {
                let points = box_outline(center, outline.rotation, width / 2.0, height / 2.0);
                for pair in points.windows(2) {
                    renderer.draw_line(to_screen(pair[0]), to_screen(pair[1]))?;
                }
            }
        }
    }
    renderer.set_draw_color(previous);
    Ok(())
}

fn to_screen(p: Vec2) -> IVec2 {
    IVec2::new(p.x.round() as i32, p.y.round() as i32)
}

/// Rotated rectangle corners, with the first corner repeated to close the loop.
fn box_outline(center: Vec2, rot: f32, half_width: f32, half_height: f32) -> [Vec2; 5] {
    let cos_r = rot.cos();
    let sin_r = rot.sin();
    let corners = [
        Vec2::new(-half_width, -half_height),
        Vec2::new(half_width, -half_height),
        Vec2::new(half_width, half_height),
        Vec2::new(-half_width, half_height),
    ];
    let mut points = [Vec2::ZERO; 5];
    for (i, c) in corners.iter().enumerate() {
        points[i] = Vec2::new(
            center.x + c.x * cos_r - c.y * sin_r,
            center.y + c.x * sin_r + c.y * cos_r,
        );
    }
    // Close the loop
    points[4] = points[0];
    points
}

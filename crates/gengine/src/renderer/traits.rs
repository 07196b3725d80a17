//! Renderer collaborator contract.
//!
//! The engine never rasterizes anything itself. A backend (SDL, wgpu, a
//! software canvas, or the recording [`CommandBuffer`](super::commands::CommandBuffer))
//! implements this trait and is only ever touched from the thread that
//! created it.

use glam::{IVec2, Vec2};

use crate::api::error::Result;
use crate::api::types::{ColorRGBA, Size};
use crate::components::sprite::SpriteHandle;

/// Everything needed to draw one sprite frame.
#[derive(Debug, Clone, Copy)]
pub struct SpriteDraw<'a> {
    pub sprite: &'a SpriteHandle,
    /// Position in scene space.
    pub position: IVec2,
    /// Rotation in degrees.
    pub angle: f32,
    pub scale: Vec2,
    pub frame: u32,
    /// Sprite origin offset.
    pub offset: IVec2,
    /// View top-left in scene space; subtract to get screen space.
    pub view_offset: IVec2,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl SpriteDraw<'_> {
    /// Top-left corner on screen.
    pub fn screen_position(&self) -> IVec2 {
        self.position - self.offset - self.view_offset
    }
}

/// Drawing backend used by the draw step.
pub trait Renderer {
    /// Backend identifier (e.g. "sdl2", "wgpu", "recording").
    fn backend(&self) -> &'static str;

    fn clear(&mut self) -> Result<()>;

    fn present(&mut self) -> Result<()>;

    fn draw_color(&self) -> ColorRGBA;

    fn set_draw_color(&mut self, color: ColorRGBA);

    fn draw_sprite(&mut self, sprite: &SpriteDraw<'_>) -> Result<()>;

    fn draw_rect(&mut self, position: IVec2, size: Size, filled: bool) -> Result<()>;

    fn draw_circle(&mut self, center: IVec2, radius: i32, filled: bool) -> Result<()>;

    fn draw_line(&mut self, from: IVec2, to: IVec2) -> Result<()>;

    fn draw_point(&mut self, point: IVec2) -> Result<()>;

    fn draw_text(&mut self, text: &str, position: IVec2) -> Result<()>;

    /// Recreate GPU textures after a device reset or on the periodic schedule.
    fn rebuild_textures(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release native resources (window, surface, renderer). Called on the
    /// owning thread when the loop exits.
    fn release(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::sprite::TextureId;

    #[test]
    fn screen_position_subtracts_offset_and_view() {
        let sprite = SpriteHandle::new(TextureId(0), "hero", 1, Size::new(32, 32));
        let draw = SpriteDraw {
            sprite: &sprite,
            position: IVec2::new(100, 50),
            angle: 0.0,
            scale: Vec2::ONE,
            frame: 0,
            offset: IVec2::new(16, 16),
            view_offset: IVec2::new(40, 10),
            flip_x: false,
            flip_y: false,
        };
        assert_eq!(draw.screen_position(), IVec2::new(44, 24));
    }
}

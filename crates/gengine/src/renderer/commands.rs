use glam::{IVec2, Vec2};

use crate::api::error::Result;
use crate::api::types::{ColorRGBA, Size};
use crate::components::sprite::TextureId;
use crate::renderer::traits::{Renderer, SpriteDraw};

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Sprite {
        texture: TextureId,
        frame: u32,
        /// Screen-space top-left.
        screen: IVec2,
        angle: f32,
        scale: Vec2,
        flip_x: bool,
        flip_y: bool,
    },
    Rect { position: IVec2, size: Size, filled: bool, color: ColorRGBA },
    Circle { center: IVec2, radius: i32, filled: bool, color: ColorRGBA },
    Line { from: IVec2, to: IVec2, color: ColorRGBA },
    Point { at: IVec2, color: ColorRGBA },
    Text { text: String, position: IVec2, color: ColorRGBA },
}

/// Renderer that records the commands of the current frame instead of drawing.
/// Used for headless runs and tests.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    /// Commands issued since the last `clear`.
    pub commands: Vec<DrawCommand>,
    /// Commands of the last presented frame.
    pub presented: Vec<DrawCommand>,
    color: ColorRGBA,
    pub clears: u64,
    pub presents: u64,
    pub texture_rebuilds: u64,
    pub released: bool,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sprite commands of the last presented frame, in draw order.
    pub fn presented_sprites(&self) -> impl Iterator<Item = &DrawCommand> {
        self.presented
            .iter()
            .filter(|c| matches!(c, DrawCommand::Sprite { .. }))
    }
}

impl Renderer for CommandBuffer {
    fn backend(&self) -> &'static str {
        "recording"
    }

    fn clear(&mut self) -> Result<()> {
        self.commands.clear();
        self.clears += 1;
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        self.presented = std::mem::take(&mut self.commands);
        self.presents += 1;
        Ok(())
    }

    fn draw_color(&self) -> ColorRGBA {
        self.color
    }

    fn set_draw_color(&mut self, color: ColorRGBA) {
        self.color = color;
    }

    fn draw_sprite(&mut self, sprite: &SpriteDraw<'_>) -> Result<()> {
        self.commands.push(DrawCommand::Sprite {
            texture: sprite.sprite.texture,
            frame: sprite.frame,
            screen: sprite.screen_position(),
            angle: sprite.angle,
            scale: sprite.scale,
            flip_x: sprite.flip_x,
            flip_y: sprite.flip_y,
        });
        Ok(())
    }

    fn draw_rect(&mut self, position: IVec2, size: Size, filled: bool) -> Result<()> {
        self.commands.push(DrawCommand::Rect {
            position,
            size,
            filled,
            color: self.color,
        });
        Ok(())
    }

    fn draw_circle(&mut self, center: IVec2, radius: i32, filled: bool) -> Result<()> {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            filled,
            color: self.color,
        });
        Ok(())
    }

    fn draw_line(&mut self, from: IVec2, to: IVec2) -> Result<()> {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            color: self.color,
        });
        Ok(())
    }

    fn draw_point(&mut self, at: IVec2) -> Result<()> {
        self.commands.push(DrawCommand::Point {
            at,
            color: self.color,
        });
        Ok(())
    }

    fn draw_text(&mut self, text: &str, position: IVec2) -> Result<()> {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            position,
            color: self.color,
        });
        Ok(())
    }

    fn rebuild_textures(&mut self) -> Result<()> {
        self.texture_rebuilds += 1;
        Ok(())
    }

    fn release(&mut self) {
        self.released = true;
    }
}

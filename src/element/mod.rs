use egui::{Color32, Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod common;
mod image;
mod text;

pub use common::MIN_SCALE;
pub use image::{ImageShape, fit_scale};
pub use text::{DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, DEFAULT_TEXT, LINE_HEIGHT, TextShape};

pub(crate) use common::{calculate_bounds, distance_to_line_segment, rotate};

use crate::raster::AssetId;

/// Stable identity of a scene object, independent of its position in the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(Uuid);

impl ObjectId {
    /// Placeholder for "no identity yet"; the scene assigns a fresh id on insertion
    pub const NIL: Self = Self(Uuid::nil());

    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::NIL
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "obj-{}", &self.0.simple().to_string()[..8])
    }
}

/// Where an object sits on the canvas.
///
/// `position` is the top-left corner of the unrotated, scaled box. Rotation is
/// applied around the centre of that box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub position: Pos2,
    pub scale: Vec2,
    /// Clockwise rotation in degrees
    pub angle: f32,
}

impl Default for Placement {
    fn default() -> Self {
        Self::at(Pos2::ZERO)
    }
}

impl Placement {
    pub fn at(position: Pos2) -> Self {
        Self {
            position,
            scale: Vec2::splat(1.0),
            angle: 0.0,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vec2::splat(scale);
        self
    }

    pub fn is_degenerate(&self) -> bool {
        self.scale.x.abs() < MIN_SCALE || self.scale.y.abs() < MIN_SCALE
    }

    fn half_extent(&self, size: Vec2) -> Vec2 {
        size * self.scale / 2.0
    }

    /// Map a point in the object's local box (`0..size`) to canvas coordinates
    pub fn to_world(&self, local: Pos2, size: Vec2) -> Pos2 {
        let c = self.half_extent(size);
        let offset = local.to_vec2() * self.scale - c;
        self.position + c + rotate(offset, self.angle.to_radians())
    }

    /// Map a canvas point into the object's local box. `None` for degenerate scales.
    pub fn to_local(&self, world: Pos2, size: Vec2) -> Option<Pos2> {
        if self.is_degenerate() {
            return None;
        }
        let c = self.half_extent(size);
        let unrotated = rotate(world - self.position - c, -self.angle.to_radians()) + c;
        Some(Pos2::new(unrotated.x / self.scale.x, unrotated.y / self.scale.y))
    }

    pub fn world_corners(&self, size: Vec2) -> [Pos2; 4] {
        [
            self.to_world(Pos2::ZERO, size),
            self.to_world(Pos2::new(size.x, 0.0), size),
            self.to_world(Pos2::new(size.x, size.y), size),
            self.to_world(Pos2::new(0.0, size.y), size),
        ]
    }

    /// Axis-aligned bounds of the transformed box
    pub fn world_bounds(&self, size: Vec2) -> Rect {
        calculate_bounds(&self.world_corners(size), 0.0)
    }
}

/// The closed set of drawable variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Rectangle {
        width: f32,
        height: f32,
        corner_radius: f32,
    },
    Circle {
        radius: f32,
    },
    Text(TextShape),
    Image(ImageShape),
}

/// A drawable object in the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    pub id: ObjectId,
    pub placement: Placement,
    pub fill: Color32,
    pub shape: Shape,
}

impl SceneObject {
    /// A new object without identity; it receives one when added to a scene
    pub fn new(shape: Shape, placement: Placement, fill: Color32) -> Self {
        Self {
            id: ObjectId::NIL,
            placement,
            fill,
            shape,
        }
    }

    pub fn kind(&self) -> &'static str {
        match &self.shape {
            Shape::Rectangle { .. } => "rectangle",
            Shape::Circle { .. } => "circle",
            Shape::Text(_) => "text",
            Shape::Image(_) => "image",
        }
    }

    /// Size of the untransformed local box
    pub fn local_size(&self) -> Vec2 {
        match &self.shape {
            Shape::Rectangle { width, height, .. } => Vec2::new(*width, *height),
            Shape::Circle { radius } => Vec2::splat(radius * 2.0),
            Shape::Text(text) => text.approx_size(),
            Shape::Image(image) => image.size(),
        }
    }

    /// Axis-aligned bounding box on the canvas
    pub fn rect(&self) -> Rect {
        self.placement.world_bounds(self.local_size())
    }

    pub fn hit_test(&self, pos: Pos2) -> bool {
        let size = self.local_size();
        let Some(local) = self.placement.to_local(pos, size) else {
            return false;
        };
        match &self.shape {
            Shape::Rectangle { corner_radius, .. } => {
                common::rounded_rect_contains(local, size, *corner_radius)
            }
            Shape::Circle { .. } => common::ellipse_contains(local, size),
            Shape::Text(_) | Shape::Image(_) => common::rounded_rect_contains(local, size, 0.0),
        }
    }

    pub fn translate(&mut self, delta: Vec2) {
        self.placement.position += delta;
    }

    pub fn asset(&self) -> Option<AssetId> {
        match &self.shape {
            Shape::Image(image) => Some(image.asset),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageShape> {
        match &self.shape {
            Shape::Image(image) => Some(image),
            _ => None,
        }
    }
}

/// Factory functions for creating elements with their default geometry
pub mod factory {
    use super::*;

    /// Where tool-created objects appear
    pub const DEFAULT_POSITION: Pos2 = Pos2::new(100.0, 100.0);
    pub const DEFAULT_RECT_SIZE: Vec2 = Vec2::new(120.0, 80.0);
    pub const DEFAULT_CORNER_RADIUS: f32 = 8.0;
    pub const DEFAULT_CIRCLE_RADIUS: f32 = 50.0;

    pub fn create_rectangle(position: Pos2, size: Vec2, corner_radius: f32, fill: Color32) -> SceneObject {
        SceneObject::new(
            Shape::Rectangle {
                width: size.x,
                height: size.y,
                corner_radius,
            },
            Placement::at(position),
            fill,
        )
    }

    pub fn create_circle(position: Pos2, radius: f32, fill: Color32) -> SceneObject {
        SceneObject::new(Shape::Circle { radius }, Placement::at(position), fill)
    }

    pub fn create_text(position: Pos2, content: &str, font_size: f32, fill: Color32) -> SceneObject {
        SceneObject::new(
            Shape::Text(TextShape {
                content: content.to_owned(),
                font_size,
                ..TextShape::default()
            }),
            Placement::at(position),
            fill,
        )
    }

    pub fn create_image(placement: Placement, image: ImageShape) -> SceneObject {
        // Bitmaps carry their own colors; the fill is only a tint placeholder
        SceneObject::new(Shape::Image(image), placement, Color32::WHITE)
    }

    pub fn default_rectangle(fill: Color32) -> SceneObject {
        create_rectangle(DEFAULT_POSITION, DEFAULT_RECT_SIZE, DEFAULT_CORNER_RADIUS, fill)
    }

    pub fn default_circle(fill: Color32) -> SceneObject {
        create_circle(DEFAULT_POSITION, DEFAULT_CIRCLE_RADIUS, fill)
    }

    pub fn default_text(fill: Color32) -> SceneObject {
        create_text(DEFAULT_POSITION, DEFAULT_TEXT, DEFAULT_FONT_SIZE, fill)
    }
}

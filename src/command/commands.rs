use std::sync::Arc;

use egui::{Color32, Vec2};

use super::{CommandError, CommandResult};
use crate::element::{ImageShape, ObjectId, Placement, SceneObject, Shape, factory};
use crate::raster::RasterImage;
use crate::scene::SceneStore;

/// Mutations of the scene. Each executed command is committed to history exactly once.
#[derive(Debug, Clone)]
pub enum Command {
    /// Append an object on top
    AddObject(SceneObject),

    /// Store a bitmap and append an image object showing it
    AddImage {
        image: Arc<RasterImage>,
        placement: Placement,
    },

    RemoveObject(ObjectId),

    /// Swap an image's pixels, keeping its current placement and z-order
    ReplaceImage {
        target: ObjectId,
        image: Arc<RasterImage>,
    },

    MoveObject {
        id: ObjectId,
        delta: Vec2,
    },

    SetBackground(Color32),

    Clear,
}

impl Command {
    /// Short human-readable name, shown in the history panel
    pub fn label(&self) -> &'static str {
        match self {
            Command::AddObject(object) => match object.shape {
                Shape::Rectangle { .. } => "Add Rectangle",
                Shape::Circle { .. } => "Add Circle",
                Shape::Text(_) => "Add Text",
                Shape::Image(_) => "Add Image",
            },
            Command::AddImage { .. } => "Add Image",
            Command::RemoveObject(_) => "Delete",
            Command::ReplaceImage { .. } => "Remove Background",
            Command::MoveObject { .. } => "Move",
            Command::SetBackground(_) => "Background",
            Command::Clear => "Clear",
        }
    }

    /// Execute the command against the store
    pub fn execute(self, store: &mut SceneStore) -> CommandResult {
        match self {
            Command::AddObject(object) => Ok(Some(store.add_object(object))),

            Command::AddImage { image, placement } => {
                let asset = store.insert_asset(Arc::clone(&image));
                let object = factory::create_image(placement, ImageShape::for_raster(asset, &image));
                Ok(Some(store.add_object(object)))
            }

            Command::RemoveObject(id) => {
                if store.remove_object(id) {
                    Ok(None)
                } else {
                    Err(CommandError::InvalidReference(id))
                }
            }

            Command::ReplaceImage { target, image } => {
                let original = store
                    .get(target)
                    .ok_or(CommandError::InvalidReference(target))?;
                if original.as_image().is_none() {
                    return Err(CommandError::NotAnImage(target));
                }
                // Pixels come from the processor; placement stays with the scene
                let placement = original.placement;
                let fill = original.fill;
                let asset = store.insert_asset(Arc::clone(&image));
                let mut replacement =
                    factory::create_image(placement, ImageShape::for_raster(asset, &image));
                replacement.fill = fill;
                replacement.id = ObjectId::new();
                let new_id = replacement.id;
                if store.replace_object(target, replacement) {
                    Ok(Some(new_id))
                } else {
                    Err(CommandError::InvalidReference(target))
                }
            }

            Command::MoveObject { id, delta } => {
                let mut moved = store
                    .get(id)
                    .cloned()
                    .ok_or(CommandError::InvalidReference(id))?;
                moved.translate(delta);
                store.replace_object(id, moved);
                Ok(Some(id))
            }

            Command::SetBackground(color) => {
                store.set_background(color);
                Ok(None)
            }

            Command::Clear => {
                store.clear();
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    #[test]
    fn test_add_labels_follow_shape() {
        let label = |object| Command::AddObject(object).label();
        assert_eq!(label(factory::default_rectangle(Color32::RED)), "Add Rectangle");
        assert_eq!(label(factory::default_circle(Color32::RED)), "Add Circle");
        assert_eq!(label(factory::default_text(Color32::RED)), "Add Text");

        let mut store = SceneStore::default();
        let id = Command::AddImage {
            image: Arc::new(RasterImage::filled(2, 2, Color32::RED)),
            placement: Placement::at(pos2(0.0, 0.0)),
        }
        .execute(&mut store)
        .unwrap()
        .unwrap();
        let image = store.get(id).cloned().unwrap();
        assert_eq!(label(image), "Add Image");
    }
}

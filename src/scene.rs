use std::collections::HashSet;
use std::sync::Arc;

use egui::{Color32, Pos2};
use serde::{Deserialize, Serialize};

use crate::element::{ObjectId, SceneObject};
use crate::error::SceneError;
use crate::id_generator;
use crate::raster::{AssetId, AssetStore, RasterImage};
use crate::util::time;

/// Canvas content at one instant: objects in paint order plus a background.
///
/// Later objects paint over earlier ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub objects: Vec<SceneObject>,
    pub background: Color32,
}

impl Scene {
    pub fn empty(background: Color32) -> Self {
        Self {
            objects: Vec::new(),
            background,
        }
    }

    pub fn assets(&self) -> impl Iterator<Item = AssetId> + '_ {
        self.objects.iter().filter_map(SceneObject::asset)
    }
}

/// An immutable, fully serialized copy of a [`Scene`]
#[derive(Clone)]
pub struct HistorySnapshot {
    sequence: u64,
    timestamp: f64,
    json: Arc<str>,
    assets: Arc<[AssetId]>,
}

impl std::fmt::Debug for HistorySnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistorySnapshot")
            .field("sequence", &self.sequence)
            .field("timestamp", &self.timestamp)
            .field("json_len", &self.json.len())
            .field("assets", &self.assets.len())
            .finish()
    }
}

impl HistorySnapshot {
    /// Monotonically increasing across all snapshots in the process
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Seconds since the UNIX epoch (native) or page load (web)
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn json(&self) -> &str {
        &self.json
    }

    /// Pixel buffers the snapshot refers to
    pub fn assets(&self) -> &[AssetId] {
        &self.assets
    }

    /// Decode a fresh [`Scene`] from the snapshot
    pub fn scene(&self) -> Result<Scene, SceneError> {
        serde_json::from_str(&self.json).map_err(|source| SceneError::Decode {
            sequence: self.sequence,
            source,
        })
    }
}

/// Owns the live scene and the pixel buffers its images reference
#[derive(Debug)]
pub struct SceneStore {
    scene: Scene,
    default_background: Color32,
    assets: AssetStore,
    version: u64,
}

impl Default for SceneStore {
    fn default() -> Self {
        Self::new(Color32::WHITE)
    }
}

impl SceneStore {
    pub fn new(default_background: Color32) -> Self {
        Self {
            scene: Scene::empty(default_background),
            default_background,
            assets: AssetStore::new(),
            version: 0,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.scene.objects
    }

    pub fn background(&self) -> Color32 {
        self.scene.background
    }

    pub fn len(&self) -> usize {
        self.scene.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scene.objects.is_empty()
    }

    /// Bumped on every mutation; lets renderers skip redundant work
    pub fn version(&self) -> u64 {
        self.version
    }

    fn mark_modified(&mut self) {
        self.version += 1;
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.scene.objects.iter().find(|object| object.id == id)
    }

    pub fn index_of(&self, id: ObjectId) -> Option<usize> {
        self.scene.objects.iter().position(|object| object.id == id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.index_of(id).is_some()
    }

    /// Topmost object under `pos`
    pub fn hit_test(&self, pos: Pos2) -> Option<&SceneObject> {
        self.scene.objects.iter().rev().find(|object| object.hit_test(pos))
    }

    // A nil id, or one already used by another object, gets replaced
    fn claim_id(&self, requested: ObjectId, replacing: Option<ObjectId>) -> ObjectId {
        let collides = self
            .scene
            .objects
            .iter()
            .any(|object| object.id == requested && Some(object.id) != replacing);
        if requested.is_nil() || collides {
            ObjectId::new()
        } else {
            requested
        }
    }

    /// Append an object on top of the paint order, returning its identity
    pub fn add_object(&mut self, mut object: SceneObject) -> ObjectId {
        object.id = self.claim_id(object.id, None);
        let id = object.id;
        log::debug!("Adding {} {} at z={}", object.kind(), id, self.scene.objects.len());
        self.scene.objects.push(object);
        self.mark_modified();
        id
    }

    /// Remove an object by identity. Returns `false` if no such object exists.
    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        let Some(index) = self.index_of(id) else {
            log::debug!("remove_object: unknown id {id}");
            return false;
        };
        self.scene.objects.remove(index);
        self.mark_modified();
        true
    }

    /// Swap the object `old_id` for `new_object` at the same index, keeping its z-order.
    ///
    /// The new object keeps its id unless that id is nil or belongs to another object.
    pub fn replace_object(&mut self, old_id: ObjectId, mut new_object: SceneObject) -> bool {
        let Some(index) = self.index_of(old_id) else {
            log::debug!("replace_object: unknown id {old_id}");
            return false;
        };
        new_object.id = self.claim_id(new_object.id, Some(old_id));
        self.scene.objects[index] = new_object;
        self.mark_modified();
        true
    }

    pub fn set_background(&mut self, color: Color32) {
        self.scene.background = color;
        self.mark_modified();
    }

    /// Remove every object and reset the background to the default
    pub fn clear(&mut self) {
        self.scene.objects.clear();
        self.scene.background = self.default_background;
        self.mark_modified();
    }

    /// Serialize the current scene
    pub fn snapshot(&self) -> Result<HistorySnapshot, SceneError> {
        let json = serde_json::to_string(&self.scene).map_err(SceneError::Encode)?;
        let assets: Vec<AssetId> = self.scene.assets().collect();
        Ok(HistorySnapshot {
            sequence: id_generator::next_snapshot_sequence(),
            timestamp: time::current_time_secs(),
            json: json.into(),
            assets: assets.into(),
        })
    }

    /// Replace the live scene with the snapshot's contents.
    ///
    /// A snapshot that fails to decode leaves the store untouched.
    pub fn restore(&mut self, snapshot: &HistorySnapshot) -> Result<(), SceneError> {
        let scene = snapshot.scene()?;
        for missing in scene.assets().filter(|id| !self.assets.contains(*id)) {
            log::warn!("Snapshot #{} refers to missing asset {missing}", snapshot.sequence());
        }
        self.scene = scene;
        self.mark_modified();
        Ok(())
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    pub fn asset(&self, id: AssetId) -> Option<&Arc<RasterImage>> {
        self.assets.get(id)
    }

    pub fn insert_asset(&mut self, image: Arc<RasterImage>) -> AssetId {
        self.assets.insert(image)
    }

    /// Drop pixel buffers referenced neither by the live scene nor by `retained`
    pub fn prune_assets<'a>(&mut self, retained: impl IntoIterator<Item = &'a AssetId>) -> usize {
        let mut live: HashSet<AssetId> = self.scene.assets().collect();
        live.extend(retained.into_iter().copied());
        let removed = self.assets.retain_live(&live);
        if removed > 0 {
            log::debug!("Pruned {removed} unreferenced assets");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::factory;

    #[test]
    fn test_add_assigns_identity() {
        let mut store = SceneStore::default();
        let a = store.add_object(factory::default_rectangle(Color32::RED));
        let b = store.add_object(factory::default_rectangle(Color32::RED));
        assert!(!a.is_nil());
        assert_ne!(a, b);
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn test_add_keeps_explicit_identity() {
        let mut store = SceneStore::default();
        let mut object = factory::default_circle(Color32::RED);
        let id = ObjectId::new();
        object.id = id;
        assert_eq!(store.add_object(object.clone()), id);
        // Same id again collides and is reassigned
        assert_ne!(store.add_object(object), id);
    }

    #[test]
    fn test_unknown_ids_are_noops() {
        let mut store = SceneStore::default();
        store.add_object(factory::default_circle(Color32::RED));
        let version = store.version();
        assert!(!store.remove_object(ObjectId::new()));
        assert!(!store.replace_object(ObjectId::new(), factory::default_text(Color32::RED)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.version(), version);
    }

    #[test]
    fn test_clear_resets_background() {
        let mut store = SceneStore::new(Color32::WHITE);
        store.add_object(factory::default_circle(Color32::RED));
        store.set_background(Color32::BLACK);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.background(), Color32::WHITE);
    }

    #[test]
    fn test_snapshot_sequence_is_monotonic() {
        let store = SceneStore::default();
        let first = store.snapshot().unwrap();
        let second = store.snapshot().unwrap();
        assert!(second.sequence() > first.sequence());
    }

    #[test]
    fn test_restore_rejects_corrupt_snapshot() {
        let mut store = SceneStore::default();
        store.add_object(factory::default_circle(Color32::RED));
        let corrupt = HistorySnapshot {
            sequence: 0,
            timestamp: 0.0,
            json: "{".into(),
            assets: Vec::new().into(),
        };
        assert!(matches!(store.restore(&corrupt), Err(SceneError::Decode { .. })));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_prune_keeps_live_and_retained() {
        let mut store = SceneStore::default();
        let live = store.insert_asset(Arc::new(RasterImage::filled(1, 1, Color32::RED)));
        let retained = store.insert_asset(Arc::new(RasterImage::filled(1, 1, Color32::RED)));
        let orphan = store.insert_asset(Arc::new(RasterImage::filled(1, 1, Color32::RED)));
        store.add_object(factory::create_image(
            crate::element::Placement::default(),
            crate::element::ImageShape {
                asset: live,
                source_width: 1,
                source_height: 1,
            },
        ));

        assert_eq!(store.prune_assets(&[retained]), 1);
        assert!(store.asset(live).is_some());
        assert!(store.asset(retained).is_some());
        assert!(store.asset(orphan).is_none());
    }
}

use canvas_studio::element::factory;
use canvas_studio::export::{ExportFormat, ExportOptions, ExportService};
use canvas_studio::{Editor, EditorConfig, ExportError, RasterImage, SceneStore, ToolId};
use egui::{Color32, pos2, vec2};

fn create_test_scene() -> SceneStore {
    let mut store = SceneStore::new(Color32::WHITE);
    store.add_object(factory::create_rectangle(
        pos2(100.0, 100.0),
        vec2(120.0, 80.0),
        8.0,
        Color32::from_rgb(0x8B, 0x5C, 0xF6),
    ));
    store.add_object(factory::create_circle(pos2(150.0, 120.0), 30.0, Color32::RED));
    store.add_object(factory::create_text(pos2(20.0, 20.0), "Hello", 24.0, Color32::BLACK));
    store
}

#[test]
fn test_export_is_deterministic() {
    let store = create_test_scene();
    let service = ExportService::new(800, 600, 8192);

    let first = service.export_raster(&store, ExportOptions::default()).unwrap();
    let second = service.export_raster(&store, ExportOptions::default()).unwrap();
    assert_eq!(first, second);
    assert_eq!(&first[..4], b"\x89PNG");
}

#[test]
fn test_export_paints_in_z_order() {
    let store = create_test_scene();
    let surface = ExportService::new(800, 600, 8192).render(&store).unwrap();

    // Circle centre sits on top of the rectangle
    assert_eq!(surface.pixel(180, 150), Some(Color32::RED));
    assert_eq!(surface.pixel(110, 170), Some(Color32::from_rgb(0x8B, 0x5C, 0xF6)));
    assert_eq!(surface.pixel(700, 500), Some(Color32::WHITE));
}

#[test]
fn test_exported_png_decodes_to_canvas_size() {
    let store = create_test_scene();
    let bytes = ExportService::new(320, 240, 8192)
        .export_raster(&store, ExportOptions::default())
        .unwrap();

    let decoded = RasterImage::decode(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (320, 240));
    assert_eq!(decoded.pixel(300, 230), Some([255, 255, 255, 255]));
}

#[test]
fn test_jpeg_export() {
    let store = create_test_scene();
    let options = ExportOptions {
        format: ExportFormat::Jpeg,
        quality: 0.8,
    };
    let bytes = ExportService::new(200, 150, 8192).export_raster(&store, options).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
}

#[test]
fn test_jpeg_flattens_transparency_onto_white() {
    let mut store = SceneStore::new(Color32::TRANSPARENT);
    store.add_object(factory::create_rectangle(
        pos2(0.0, 0.0),
        vec2(16.0, 32.0),
        0.0,
        Color32::BLACK,
    ));
    let options = ExportOptions {
        format: ExportFormat::Jpeg,
        quality: 1.0,
    };
    let bytes = ExportService::new(32, 32, 1024).export_raster(&store, options).unwrap();
    let decoded = RasterImage::decode(&bytes).unwrap();

    let [r, g, b, a] = decoded.pixel(28, 16).unwrap();
    assert!(r > 240 && g > 240 && b > 240, "transparent area came out as {r},{g},{b}");
    assert_eq!(a, 255);
    let [r, _, _, _] = decoded.pixel(4, 16).unwrap();
    assert!(r < 20);
}

#[test]
fn test_oversized_surface_is_refused() {
    let store = create_test_scene();
    let result = ExportService::new(4096, 100, 1024).export_raster(&store, ExportOptions::default());
    assert!(matches!(result, Err(ExportError::RenderSurfaceUnavailable(_))));

    let result = ExportService::new(0, 100, 1024).render(&store);
    assert!(matches!(result, Err(ExportError::RenderSurfaceUnavailable(_))));
}

#[test]
fn test_export_leaves_editor_untouched() {
    let mut editor = Editor::create(EditorConfig::default()).unwrap();
    editor.activate_tool(ToolId::Rectangle).unwrap();
    let scene = editor.store().scene().clone();
    let history = editor.history().len();

    editor.export(ExportOptions::default()).unwrap();
    assert_eq!(editor.store().scene(), &scene);
    assert_eq!(editor.history().len(), history);
}

#[test]
fn test_export_to_file_uses_format_extension() {
    let dir = std::env::temp_dir().join(format!("canvas_studio_export_{}", uuid::Uuid::new_v4()));
    let config = EditorConfig {
        canvas_width: 64,
        canvas_height: 48,
        export_dir: dir.clone(),
        ..EditorConfig::default()
    };
    let editor = Editor::create(config).unwrap();
    let options = ExportOptions {
        format: ExportFormat::Jpeg,
        quality: 0.5,
    };

    let default = editor.default_export_path(options.format);
    assert_eq!(default, dir.join("design.jpg"));
    let path = editor.export_to_file(options, &default).unwrap();
    assert_eq!(path, default);
    assert!(std::fs::metadata(&path).unwrap().len() > 0);

    // A name picked in the save dialog keeps its stem but gets the format's extension
    let picked = editor.export_to_file(options, &dir.join("poster.png")).unwrap();
    assert_eq!(picked, dir.join("poster.jpg"));
    assert!(picked.exists());

    std::fs::remove_dir_all(dir).unwrap();
}

#[test]
fn test_format_from_path() {
    assert_eq!(ExportFormat::from_path("out/design.PNG").unwrap(), ExportFormat::Png);
    assert_eq!(ExportFormat::from_path("design.jpeg").unwrap(), ExportFormat::Jpeg);
    assert!(matches!(
        ExportFormat::from_path("design.gif"),
        Err(ExportError::UnsupportedFormat(_))
    ));
}

//! End-to-end pipeline workflows
//!
//! Each test drives `PostProcessPipeline` the way a vision tool does: build a
//! configuration, hand over the tool's image with its detected regions, and
//! inspect what the agent would receive.

use image::{DynamicImage, GenericImageView, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use serde_json::{json, Value};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;
use vsp_postprocess::{
    error::Result, PostProcessConfig, PostProcessPipeline, PostProcessor, ProcessingContext,
    ProcessorRegistry, Region, ToolImage, LOCAL_BACKEND,
};

/// White 400x300 scene with a red square at (50..=150, 50..=150)
fn detection_scene() -> DynamicImage {
    let mut canvas = RgbImage::from_pixel(400, 300, Rgb([255, 255, 255]));
    for y in 50..=150 {
        for x in 50..=150 {
            canvas.put_pixel(x, y, Rgb([255, 0, 0]));
        }
    }
    DynamicImage::ImageRgb8(canvas)
}

fn local_pipeline(method: &str, working_dir: Option<&TempDir>) -> Result<PostProcessPipeline> {
    let mut builder = PostProcessConfig::builder()
        .enabled(true)
        .backend(LOCAL_BACKEND)
        .backend_option(LOCAL_BACKEND, "method", method);
    builder = match working_dir {
        Some(dir) => builder.save_before_image(true).working_dir(dir.path()),
        None => builder.save_before_image(false),
    };
    Ok(PostProcessPipeline::with_config(builder.build()?))
}

#[test]
fn test_detection_masking_with_snapshot() -> Result<()> {
    let dir = TempDir::new()?;
    let pipeline = local_pipeline("visual_mask", Some(&dir))?;
    let scene = detection_scene();

    let result = pipeline.apply_postprocess(
        ToolImage::from(scene.clone()),
        &[Region::new(0.125, 0.25, 0.25, 0.25)],
        "detection",
    );

    // default padding of 20 around (50, 75, 100, 75)
    let masked = result.displayed();
    assert_eq!(masked.get_pixel(30, 55), Rgba([0, 0, 0, 255]));
    assert_eq!(masked.get_pixel(170, 170), Rgba([0, 0, 0, 255]));
    assert_eq!(masked.get_pixel(29, 55), scene.get_pixel(29, 55));
    assert_eq!(masked.get_pixel(171, 170), scene.get_pixel(171, 170));

    let snapshots: Vec<_> = std::fs::read_dir(dir.path())?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(snapshots.len(), 1);
    assert!(snapshots[0].starts_with("before_postproc_detection_"));
    assert!(snapshots[0].ends_with(".png"));

    let saved = image::open(dir.path().join(&snapshots[0]))?;
    assert_eq!(saved.to_rgb8(), scene.to_rgb8());
    Ok(())
}

#[test]
fn test_snapshot_uses_annotated_view() -> Result<()> {
    let dir = TempDir::new()?;
    let pipeline = local_pipeline("zoom_in", Some(&dir))?;
    let original = DynamicImage::new_rgb8(400, 300);
    let annotated = detection_scene();

    let _ = pipeline.apply_postprocess(
        ToolImage::annotated(original, annotated.clone()),
        &[Region::new(0.25, 0.25, 0.25, 0.25)],
        "som",
    );

    let entry = std::fs::read_dir(dir.path())?.next().expect("snapshot written")?;
    let saved = image::open(entry.path())?;
    assert_eq!(saved.to_rgb8(), annotated.to_rgb8());
    Ok(())
}

#[test]
fn test_som_removal_keeps_original() -> Result<()> {
    let pipeline = local_pipeline("visual_edit", None)?;
    let original = detection_scene();
    let annotated = detection_scene();

    let result = pipeline.apply_postprocess(
        ToolImage::annotated(original.clone(), annotated.clone()),
        &[Region::new(0.0625, 0.125, 0.375, 0.5)],
        "som",
    );

    let ToolImage::Annotated { original: kept, annotated: edited } = result else {
        panic!("annotated input must stay annotated");
    };
    assert_eq!(kept, original);
    assert_eq!(edited.get_pixel(100, 100), Rgba([255, 255, 255, 255]));
    assert_eq!(edited.get_pixel(300, 250), annotated.get_pixel(300, 250));
    Ok(())
}

#[test]
fn test_zoom_on_square_image() -> Result<()> {
    let pipeline = local_pipeline("zoom_in", None)?;
    let image = DynamicImage::new_rgb8(1000, 1000);

    let result = pipeline.apply_postprocess(image.into(), &[Region::new(0.5, 0.5, 0.1, 0.1)], "detection");
    assert_eq!(result.dimensions(), (200, 200));
    Ok(())
}

#[test]
fn test_colour_type_preserved() -> Result<()> {
    let luma16 = DynamicImage::ImageLuma16(image::ImageBuffer::from_pixel(60, 40, Luma([40_000u16])));
    let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(60, 40, Rgba([10, 20, 30, 200])));
    let region = [Region::new(0.25, 0.25, 0.5, 0.5)];

    for method in ["visual_mask", "visual_edit"] {
        let pipeline = local_pipeline(method, None)?;
        for image in [&luma16, &rgba] {
            let result = pipeline.apply_postprocess(image.clone().into(), &region, "depth");
            assert_eq!(result.displayed().color(), image.color(), "{}", method);
            assert_eq!(result.dimensions(), image.dimensions(), "{}", method);
        }
    }
    Ok(())
}

struct Inverter;

impl PostProcessor for Inverter {
    fn process(&self, image: &DynamicImage, _regions: &[Region], _context: &ProcessingContext) -> Result<DynamicImage> {
        let mut output = image.clone();
        output.invert();
        Ok(output)
    }

    fn name(&self) -> &str {
        "inverter"
    }
}

#[test]
fn test_custom_backend_through_pipeline() -> Result<()> {
    let registry = ProcessorRegistry::with_defaults();
    registry.register("inverter", |_: &Value| Box::new(Inverter) as Box<dyn PostProcessor>);
    assert!(registry.list().contains(&"inverter".to_string()));

    let config = PostProcessConfig::builder()
        .enabled(true)
        .backend("inverter")
        .save_before_image(false)
        .build()?;
    let pipeline = PostProcessPipeline::new(Arc::new(config), Arc::new(registry));

    let result = pipeline.apply_postprocess(DynamicImage::new_rgb8(4, 4).into(), &[], "detection");
    assert_eq!(result.displayed().get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    Ok(())
}

#[test]
fn test_json_configuration_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("postproc.json");
    let content = json!({
        "enabled": true,
        "save_before_image": false,
        "backends": {
            "local-manipulation": {"method": "visual_mask", "mask_padding": 0, "mask_color": [0, 0, 255]}
        }
    });
    std::fs::write(&path, content.to_string())?;

    let mut config = PostProcessConfig::from_json_file(&path)?;
    config.apply_env_overrides_from(|key| (key == "VSP_POSTPROC_MASK_PADDING").then(|| "1".to_string()));
    let pipeline = PostProcessPipeline::with_config(config);

    let result = pipeline.apply_postprocess(
        detection_scene().into(),
        &[Region::new(0.5, 0.5, 0.25, 0.25)],
        "detection",
    );
    // box (200, 150, 100, 75) padded by 1
    assert_eq!(result.displayed().get_pixel(199, 149), Rgba([0, 0, 255, 255]));
    assert_eq!(result.displayed().get_pixel(198, 149), Rgba([255, 255, 255, 255]));
    Ok(())
}

#[test]
fn test_shared_pipeline_across_threads() -> Result<()> {
    let pipeline = local_pipeline("zoom_in", None)?;

    let handles: Vec<_> = (1..=4u32)
        .map(|i| {
            let pipeline = pipeline.clone();
            thread::spawn(move || {
                let image = DynamicImage::new_rgb8(100 * i, 100);
                pipeline
                    .apply_postprocess(image.into(), &[Region::new(0.0, 0.0, 0.5, 1.0)], "detection")
                    .dimensions()
            })
        })
        .collect();

    for (i, handle) in (1..=4u32).zip(handles) {
        let (width, height) = handle.join().expect("worker panicked");
        // 0.5 + 2 * 0.05 of the width, full height
        assert_eq!(width, 60 * i);
        assert_eq!(height, 100);
    }
    Ok(())
}

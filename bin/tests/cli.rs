use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use std::process::Command;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::{ImageFormat, Rgba, RgbaImage};
use serde_json::{json, Value};

fn encode_bitmap(image: &RgbaImage) -> String {
    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png).unwrap();
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&png).unwrap();
    STANDARD.encode(encoder.finish().unwrap())
}

fn filled(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]))
}

fn write_annotation(dir: &Path, name: &str, objects: Value) {
    let annotation = json!({
        "size": {"height": 100, "width": 100},
        "objects": objects,
    });
    fs::write(dir.join(name), serde_json::to_string(&annotation).unwrap()).unwrap();
}

#[test]
fn converts_a_directory_into_one_coco_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("masks");
    fs::create_dir(&input).unwrap();

    write_annotation(&input, "a_mask.jpg.json", json!([
        {"classTitle": "living", "bitmap": {"data": encode_bitmap(&filled(20, 20)), "origin": [40, 40]}},
        {"classTitle": "dead", "bitmap": {"data": encode_bitmap(&filled(10, 5)), "origin": [5, 80]}},
    ]));
    write_annotation(&input, "b_mask.jpg.json", json!([
        {"classTitle": "living", "bitmap": {"data": encode_bitmap(&filled(30, 30)), "origin": [90, 90]}},
        {"classTitle": "living", "bitmap": {"data": encode_bitmap(&filled(6, 6)), "origin": [2, 2]}},
    ]));
    fs::write(input.join("broken_mask.jpg.json"), "{ not json").unwrap();

    let output = dir.path().join("out").join("coco.json");
    let status = Command::new(env!("CARGO_BIN_EXE_maskpoly"))
        .arg("--input").arg(&input)
        .arg("--output").arg(&output)
        .args(["--watershed", "false", "--workers", "2"])
        .status()
        .unwrap();
    assert!(status.success());

    let text = fs::read_to_string(&output).unwrap();
    assert!(text.starts_with("{\n    \"images\""));
    let coco: Value = serde_json::from_str(&text).unwrap();

    // "b" fails to place its first stamp but keeps its second object.
    let images = coco["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0]["file_name"], "a.jpg");
    assert_eq!(images[0]["id"], 1);
    assert_eq!(images[1]["file_name"], "b.jpg");
    assert_eq!(images[1]["id"], 2);

    let annotations = coco["annotations"].as_array().unwrap();
    assert_eq!(annotations.len(), 3);
    let ids: Vec<u64> = annotations.iter().map(|a| a["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(annotations[0]["bbox"], json!([40, 40, 20, 20]));
    assert_eq!(annotations[0]["category_id"], 1);
    assert_eq!(annotations[0]["area"], 361.0);
    assert_eq!(annotations[1]["category_id"], 2);
    assert_eq!(annotations[2]["image_id"], 2);

    let categories = coco["categories"].as_array().unwrap();
    assert_eq!(categories[0], json!({"id": 1, "name": "alive", "supercategory": "none"}));
    assert_eq!(categories[1]["name"], "dead");
}

#[test]
fn strict_mode_stops_on_a_broken_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("broken.json"), "[]").unwrap();
    let status = Command::new(env!("CARGO_BIN_EXE_maskpoly"))
        .arg("--input").arg(dir.path())
        .arg("--output").arg(dir.path().join("coco.json"))
        .args(["--continue-on-error", "false"])
        .status()
        .unwrap();
    assert!(!status.success());
}

#[test]
fn generates_a_loadable_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("maskpoly.toml");
    let status = Command::new(env!("CARGO_BIN_EXE_maskpoly"))
        .arg("--generate-config")
        .arg("--config").arg(&config)
        .status()
        .unwrap();
    assert!(status.success());
    let text = fs::read_to_string(&config).unwrap();
    assert!(text.contains("minimum_distance = 100"));
    assert!(text.contains("use_watershed = true"));
}

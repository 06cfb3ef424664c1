#![allow(dead_code)]

use std::fs;
use std::path::Path;

use cococurate::ir::io_coco_json::{images_dir, instances_path, write_coco_json};
use cococurate::ir::{Annotation, Category, Dataset, DatasetMeta, Image};
use serde_json::json;

pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

pub fn write_bmp(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write bmp file");
}

/// Writes `dataset` as a CVAT-style export: the instances document plus one
/// small BMP per image.
pub fn write_dataset_dir(root: &Path, dataset: &Dataset) {
    write_coco_json(&instances_path(root), dataset).expect("write instances");
    for image in dataset.images() {
        write_bmp(&images_dir(root).join(&image.file_name), 4, 4);
    }
}

pub fn categories() -> Vec<Category> {
    vec![
        Category::new(1u64, "led").with_supercategory(""),
        Category::new(2u64, "ethernet_port").with_supercategory(""),
        Category::new(3u64, "usb_port").with_supercategory(""),
    ]
}

/// `n` images named `<prefix>_<id>.bmp`.
///
/// Image `i` carries `i % 3 + 1` annotations of category 2 and one of
/// category 1; image 1 additionally carries 31 annotations of category 2,
/// which makes it an outlier at the default threshold.
pub fn sample_dataset(prefix: &str, n: u64) -> Dataset {
    let images: Vec<Image> = (1..=n)
        .map(|id| {
            Image::new(id, format!("{prefix}_{id}.bmp"), 4, 4)
                .with_extra("license", json!(0))
                .with_extra("date_captured", json!(0))
        })
        .collect();

    let mut annotations = Vec::new();
    let mut next = 1u64;
    let mut push = |image_id: u64, category_id: u64| {
        annotations.push(
            Annotation::new(next, image_id, category_id, [0.0, 0.0, 2.0, 2.0])
                .with_extra("iscrowd", json!(0))
                .with_extra("area", json!(4.0)),
        );
        next += 1;
    };
    for id in 1..=n {
        for _ in 0..(id % 3 + 1) {
            push(id, 2);
        }
        push(id, 1);
    }
    if n > 0 {
        for _ in 0..31 {
            push(1, 2);
        }
    }

    Dataset::new(
        DatasetMeta {
            info: json!({"description": prefix, "version": "1.0"}),
            licenses: vec![json!({"id": 0, "name": "", "url": ""})],
            categories: categories(),
        },
        images,
        annotations,
    )
}

//! Image persistence

use anyhow::{Context, Result};
use image::DynamicImage;
use pixstyle_core::Config;
use std::fs;
use std::path::PathBuf;

/// Write each image to its own sequentially numbered file and return the
/// paths in output order.
///
/// If any image fails to save, the files already written are removed.
pub fn save_images(images: &[DynamicImage], config: &Config) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(&config.output.dir)
        .with_context(|| format!("Failed to create output directory {:?}", config.output.dir))?;

    let mut output_paths = Vec::with_capacity(images.len());
    for (i, image) in images.iter().enumerate() {
        let output_path = config.output_path(i);
        if let Err(e) = image.save(&output_path) {
            remove_partial(&output_paths);
            return Err(e).with_context(|| format!("Failed to save image to {:?}", output_path));
        }
        tracing::info!("Saved {}", output_path.display());
        output_paths.push(output_path);
    }
    Ok(output_paths)
}

fn remove_partial(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            tracing::warn!("Failed to remove partial output {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn writes_numbered_pngs() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.output.dir = dir.path().join("nested");

        let images = vec![
            DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, image::Rgb([255, 0, 0]))),
            DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, image::Rgb([0, 0, 255]))),
        ];
        let paths = save_images(&images, &config).unwrap();

        assert_eq!(paths, vec![config.output_path(0), config.output_path(1)]);
        let first = image::open(&paths[0]).unwrap().to_rgb8();
        assert_eq!(first.get_pixel(0, 0), &image::Rgb([255, 0, 0]));
        let second = image::open(&paths[1]).unwrap().to_rgb8();
        assert_eq!(second.get_pixel(3, 3), &image::Rgb([0, 0, 255]));
    }

    #[test]
    fn failed_save_removes_earlier_images() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.output.dir = dir.path().to_path_buf();
        // A directory in the way of the second image makes its save fail.
        fs::create_dir(config.output_path(1)).unwrap();

        let images = vec![
            DynamicImage::ImageRgb8(RgbImage::new(4, 4)),
            DynamicImage::ImageRgb8(RgbImage::new(4, 4)),
        ];
        let err = save_images(&images, &config).unwrap_err();

        assert!(err.to_string().contains("out-1.png"));
        assert!(!config.output_path(0).exists());
    }

    #[test]
    fn nothing_to_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.output.dir = dir.path().to_path_buf();
        assert!(save_images(&[], &config).unwrap().is_empty());
    }
}

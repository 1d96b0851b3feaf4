//! Synthetic image and upload builders for testing.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage, Rgba, RgbaImage};

/// Builder for synthetic test images.
pub struct SyntheticImageBuilder;

impl SyntheticImageBuilder {
    /// A crude face: skin-toned ellipse with two dark eyes on a grey background.
    #[must_use]
    pub fn face(width: u32, height: u32) -> DynamicImage {
        Self::face_with_eye_opening(width, height, 0.06)
    }

    /// A face whose eye height (fraction of image height) can be varied,
    /// so that "open" and "closed" eyes produce visibly different images.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn face_with_eye_opening(width: u32, height: u32, eye_height: f32) -> DynamicImage {
        let (w, h) = (width as f32, height as f32);
        let (cx, cy) = (w / 2.0, h / 2.0);

        let img = RgbImage::from_fn(width, height, |x, y| {
            let (fx, fy) = (x as f32, y as f32);
            let face = ((fx - cx) / (w * 0.35)).powi(2) + ((fy - cy) / (h * 0.45)).powi(2) <= 1.0;
            let in_eye = |ex: f32| {
                ((fx - ex) / (w * 0.08)).powi(2) + ((fy - h * 0.4) / (h * eye_height.max(0.005))).powi(2)
                    <= 1.0
            };

            if face && (in_eye(w * 0.35) || in_eye(w * 0.65)) {
                Rgb([30, 20, 20])
            } else if face {
                Rgb([224, 172, 140])
            } else {
                Rgb([120, 120, 120])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    /// Uniform RGB image.
    #[must_use]
    pub fn rgb_uniform(width: u32, height: u32, r: u8, g: u8, b: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([r, g, b])))
    }

    /// Uniform grayscale image.
    #[must_use]
    pub fn gray_uniform(width: u32, height: u32, value: u8) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(width, height, Luma([value])))
    }

    /// Semi-transparent RGBA image.
    #[must_use]
    pub fn rgba_uniform(width: u32, height: u32, value: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(value)))
    }

    /// Encodes an image in the given format.
    ///
    /// # Panics
    ///
    /// Panics if the encoder rejects the image.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).expect("encode image");
        buf.into_inner()
    }

    /// JPEG bytes of an RGB rendition of `image`.
    #[must_use]
    pub fn jpeg_bytes(image: &DynamicImage) -> Vec<u8> {
        Self::encode(&DynamicImage::ImageRgb8(image.to_rgb8()), ImageFormat::Jpeg)
    }

    /// PNG bytes of `image`.
    #[must_use]
    pub fn png_bytes(image: &DynamicImage) -> Vec<u8> {
        Self::encode(image, ImageFormat::Png)
    }

    /// Writes `count` faces into `dir`, creating it.
    ///
    /// # Panics
    ///
    /// Panics if the directory or files cannot be written.
    #[allow(clippy::expect_used, clippy::cast_precision_loss)]
    pub fn write_faces(dir: &Path, count: usize, eye_height: f32) {
        std::fs::create_dir_all(dir).expect("create image dir");
        for i in 0..count {
            let img = Self::face_with_eye_opening(48, 48, eye_height + i as f32 * 0.005);
            img.save(dir.join(format!("face_{i}.png")))
                .expect("save face");
        }
    }
}

/// A `multipart/form-data` body with a single file field.
#[derive(Debug, Clone)]
pub struct MultipartUpload {
    /// Value for the `Content-Type` header, including the boundary.
    pub content_type: String,
    /// Encoded body.
    pub body: Vec<u8>,
}

const BOUNDARY: &str = "fatigue-test-boundary-7MA4YWxkTrZu0gW";

impl MultipartUpload {
    /// Builds a body with one file part.
    #[must_use]
    pub fn file(field: &str, filename: &str, mime: &str, bytes: &[u8]) -> Self {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {mime}\r\n\r\n").as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Self {
            content_type: format!("multipart/form-data; boundary={BOUNDARY}"),
            body,
        }
    }

    /// A JPEG upload in the `file` field.
    #[must_use]
    pub fn jpeg(bytes: &[u8]) -> Self {
        Self::file("file", "test.jpg", "image/jpeg", bytes)
    }
}

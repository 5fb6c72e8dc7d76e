// src/services/image_processor.rs
use crate::errors::StudioError;
use crate::models::UploadFile;
use bytes::Bytes;
use image::ImageFormat as ImgFormat;
use std::io::Cursor;
use std::path::Path;

/// Client-side checks run before any bytes leave the machine.
pub struct ImageProcessor {
    max_dimension: u32,
}

impl ImageProcessor {
    pub fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }

    /// Accepts JPEG and PNG only and returns the detected MIME type and
    /// dimensions.
    pub fn validate_image(&self, data: &[u8]) -> Result<(&'static str, (u32, u32)), StudioError> {
        let format = image::guess_format(data).map_err(|e| {
            StudioError::UnsupportedImage(format!("Unrecognised image data: {}", e))
        })?;

        let content_type = match format {
            ImgFormat::Jpeg => "image/jpeg",
            ImgFormat::Png => "image/png",
            other => {
                return Err(StudioError::UnsupportedImage(format!(
                    "{:?} is not supported, use JPG, JPEG or PNG",
                    other
                )));
            }
        };

        let (width, height) = image::io::Reader::with_format(Cursor::new(data), format)
            .into_dimensions()
            .map_err(|e| StudioError::UnsupportedImage(format!("Invalid image: {}", e)))?;

        if width > self.max_dimension || height > self.max_dimension {
            return Err(StudioError::UnsupportedImage(format!(
                "Image dimensions {}x{} exceed {}x{}",
                width, height, self.max_dimension, self.max_dimension
            )));
        }

        Ok((content_type, (width, height)))
    }

    pub fn prepare_upload(
        &self,
        filename: &str,
        data: Bytes,
        local_preview: String,
    ) -> Result<UploadFile, StudioError> {
        let (content_type, _) = self.validate_image(&data)?;

        Ok(UploadFile {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            data,
            local_preview,
        })
    }

    pub async fn load_upload(&self, path: &Path) -> Result<UploadFile, StudioError> {
        let data = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        self.prepare_upload(&filename, Bytes::from(data), path.display().to_string())
    }
}

#[cfg(test)]
pub(crate) fn encode_test_image(format: ImgFormat, width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::new_rgb8(width, height);
    let mut output = Vec::new();
    img.write_to(&mut Cursor::new(&mut output), format)
        .expect("encode test image");
    output
}

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use image::DynamicImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("not an image data URL")]
    InvalidDataUrl,
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}

/// A single encoded still image grabbed from the camera.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// MIME type of `bytes`, e.g. `image/jpeg`.
    pub mime: String,
    /// Encoded image payload.
    pub bytes: Vec<u8>,
    /// When the frame was captured.
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    /// Wrap encoded image bytes captured now.
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime: mime.into(),
            bytes,
            captured_at: Utc::now(),
        }
    }

    /// Parse a browser-style screenshot such as `data:image/jpeg;base64,...`.
    ///
    /// ```
    /// use sensor::Frame;
    /// let frame = Frame::from_data_url("data:image/png;base64,AAEC").unwrap();
    /// assert_eq!(frame.mime, "image/png");
    /// assert_eq!(frame.bytes, vec![0, 1, 2]);
    /// ```
    pub fn from_data_url(url: &str) -> crate::Result<Self> {
        let rest = url.strip_prefix("data:").ok_or(FrameError::InvalidDataUrl)?;
        let (header, payload) = rest.split_once(',').ok_or(FrameError::InvalidDataUrl)?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or(FrameError::InvalidDataUrl)?;
        if !mime.starts_with("image/") {
            return Err(FrameError::InvalidDataUrl);
        }
        let bytes = STANDARD.decode(payload.trim())?;
        Ok(Self::new(mime, bytes))
    }

    /// Encode the frame back into a `data:` URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    /// Decode the payload into pixels.
    pub fn decode(&self) -> crate::Result<DynamicImage> {
        Ok(image::load_from_memory(&self.bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_image_urls() {
        assert!(matches!(
            Frame::from_data_url("data:text/plain;base64,AAEC"),
            Err(FrameError::InvalidDataUrl)
        ));
        assert!(matches!(
            Frame::from_data_url("image/png;base64,AAEC"),
            Err(FrameError::InvalidDataUrl)
        ));
        assert!(matches!(
            Frame::from_data_url("data:image/png,AAEC"),
            Err(FrameError::InvalidDataUrl)
        ));
    }

    #[test]
    fn data_url_survives_reencoding() {
        let frame = Frame::new("image/jpeg", vec![9, 8, 7, 6]);
        let again = Frame::from_data_url(&frame.to_data_url()).unwrap();
        assert_eq!(again.mime, frame.mime);
        assert_eq!(again.bytes, frame.bytes);
    }

    #[test]
    fn garbage_does_not_decode() {
        let frame = Frame::new("image/png", vec![1, 2, 3]);
        assert!(frame.decode().is_err());
    }
}

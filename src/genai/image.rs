//! Base64 image payloads exchanged with the generative API.
//!
//! Camera frames and generated images both travel as base64 text. The UI
//! and browser-style data URLs carry a `data:<mime>;base64,`
//! prefix which must be stripped before the payload goes on the wire.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use thiserror::Error;

/// Errors raised while converting image payloads.
#[derive(Debug, Error, PartialEq)]
pub enum ImageDataError {
    #[error("not a base64 data URL")]
    NotDataUrl,

    #[error("image payload is empty")]
    Empty,

    #[error("invalid base64 image payload: {0}")]
    Base64(String),
}

/// An image as MIME type + base64 payload (no transport prefix).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: String,
    /// Standard base64, no `data:` header.
    pub data: String,
}

impl EncodedImage {
    /// Encode raw bytes.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: BASE64.encode(bytes),
        }
    }

    /// Parse a `data:<mime>;base64,<payload>` URL, stripping the header.
    ///
    /// ```
    /// use kisan_mitra::genai::EncodedImage;
    ///
    /// let img = EncodedImage::from_data_url("data:image/jpeg;base64,/9j/4AAQ").unwrap();
    /// assert_eq!(img.mime_type, "image/jpeg");
    /// assert_eq!(img.data, "/9j/4AAQ");
    /// ```
    pub fn from_data_url(url: &str) -> Result<Self, ImageDataError> {
        let rest = url
            .trim()
            .strip_prefix("data:")
            .ok_or(ImageDataError::NotDataUrl)?;
        let (header, payload) = rest.split_once(',').ok_or(ImageDataError::NotDataUrl)?;
        let mime_type = header
            .strip_suffix(";base64")
            .ok_or(ImageDataError::NotDataUrl)?;
        if payload.is_empty() {
            return Err(ImageDataError::Empty);
        }
        Ok(Self {
            mime_type: if mime_type.is_empty() {
                "image/jpeg".to_string()
            } else {
                mime_type.to_string()
            },
            data: payload.to_string(),
        })
    }

    /// Render as a displayable `data:` URL.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Decode the payload back to raw bytes.
    pub fn decode_bytes(&self) -> Result<Vec<u8>, ImageDataError> {
        if self.data.is_empty() {
            return Err(ImageDataError::Empty);
        }
        BASE64
            .decode(self.data.as_bytes())
            .map_err(|e| ImageDataError::Base64(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_survive_data_url() {
        let original = EncodedImage::from_bytes("image/png", &[0x89, b'P', b'N', b'G']);
        let url = original.to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));

        let parsed = EncodedImage::from_data_url(&url).unwrap();
        assert_eq!(parsed, original);
        assert_eq!(parsed.decode_bytes().unwrap(), vec![0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn rejects_plain_urls() {
        assert_eq!(
            EncodedImage::from_data_url("https://example.com/a.jpg"),
            Err(ImageDataError::NotDataUrl)
        );
        assert_eq!(
            EncodedImage::from_data_url("data:image/jpeg,rawbytes"),
            Err(ImageDataError::NotDataUrl)
        );
    }

    #[test]
    fn rejects_empty_payload() {
        assert_eq!(
            EncodedImage::from_data_url("data:image/jpeg;base64,"),
            Err(ImageDataError::Empty)
        );
    }

    #[test]
    fn invalid_base64_is_reported() {
        let img = EncodedImage {
            mime_type: "image/jpeg".into(),
            data: "not base64!!".into(),
        };
        assert!(matches!(img.decode_bytes(), Err(ImageDataError::Base64(_))));
    }
}

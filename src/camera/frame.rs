//! MJPEG stream splitting and preview decoding.

use crate::camera::CameraError;

/// Start-of-image marker.
const SOI: [u8; 2] = [0xFF, 0xD8];
/// End-of-image marker.
const EOI: [u8; 2] = [0xFF, 0xD9];
/// A partial frame larger than this is garbage; start over.
const MAX_PENDING_BYTES: usize = 16 * 1024 * 1024;

fn find(haystack: &[u8], needle: &[u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|w| w == needle)
}

/// Cuts a concatenated stream of JPEG images into whole frames.
///
/// ```rust
/// use kisan_mitra::camera::JpegSplitter;
///
/// let mut splitter = JpegSplitter::default();
/// assert!(splitter.push(&[0xFF, 0xD8, 1, 2]).is_empty());
/// let frames = splitter.push(&[3, 0xFF, 0xD9, 0xFF]);
/// assert_eq!(frames, vec![vec![0xFF, 0xD8, 1, 2, 3, 0xFF, 0xD9]]);
/// ```
#[derive(Debug, Default)]
pub struct JpegSplitter {
    pending: Vec<u8>,
}

impl JpegSplitter {
    /// Append bytes and return every frame completed by them, oldest first.
    pub fn push(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        self.pending.extend_from_slice(data);
        let mut frames = Vec::new();

        loop {
            let Some(start) = find(&self.pending, &SOI) else {
                // Keep a trailing 0xFF: it may be the first half of SOI.
                let keep_last = self.pending.last() == Some(&0xFF);
                let cut = self.pending.len() - usize::from(keep_last);
                self.pending.drain(..cut);
                break;
            };
            self.pending.drain(..start);

            match find(&self.pending[SOI.len()..], &EOI) {
                Some(rel) => {
                    let end = SOI.len() + rel + EOI.len();
                    frames.push(self.pending.drain(..end).collect());
                }
                None => break,
            }
        }

        if self.pending.len() > MAX_PENDING_BYTES {
            log::warn!("camera: discarding {} bytes without a frame end", self.pending.len());
            self.pending.clear();
        }
        frames
    }
}

/// A decoded frame ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewImage {
    pub width: u32,
    pub height: u32,
    /// Row-major RGBA8.
    pub rgba: Vec<u8>,
}

/// Decode JPEG (or PNG) bytes into RGBA for the preview.
pub fn decode_preview(bytes: &[u8]) -> Result<PreviewImage, CameraError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| CameraError::Encode(e.to_string()))?;
    let rgba = decoded.to_rgba8();
    Ok(PreviewImage {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(body: &[u8]) -> Vec<u8> {
        let mut f = SOI.to_vec();
        f.extend_from_slice(body);
        f.extend_from_slice(&EOI);
        f
    }

    #[test]
    fn splits_back_to_back_frames() {
        let mut stream = frame(&[1, 2]);
        stream.extend(frame(&[3]));
        let frames = JpegSplitter::default().push(&stream);
        assert_eq!(frames, vec![frame(&[1, 2]), frame(&[3])]);
    }

    #[test]
    fn leading_garbage_is_skipped() {
        let mut stream = vec![0x00, 0x42];
        stream.extend(frame(&[7]));
        assert_eq!(JpegSplitter::default().push(&stream), vec![frame(&[7])]);
    }

    #[test]
    fn marker_split_across_reads() {
        let f = frame(&[9, 9, 9]);
        let mut splitter = JpegSplitter::default();
        assert!(splitter.push(&f[..1]).is_empty()); // lone 0xFF
        assert!(splitter.push(&f[1..f.len() - 1]).is_empty());
        assert_eq!(splitter.push(&f[f.len() - 1..]), vec![f]);
    }

    #[test]
    fn decodes_encoded_png_preview() {
        let mut png = Vec::new();
        image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();

        let preview = decode_preview(&png).unwrap();
        assert_eq!((preview.width, preview.height), (3, 2));
        assert_eq!(&preview.rgba[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn corrupt_bytes_fail_to_decode() {
        assert!(matches!(decode_preview(&frame(&[1, 2, 3])), Err(CameraError::Encode(_))));
    }
}

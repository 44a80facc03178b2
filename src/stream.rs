//! Multipart stream encoding.
//!
//! Annotated frames are delivered as a `multipart/x-mixed-replace` body, the
//! motion-JPEG-over-HTTP convention: every frame becomes one self-delimited
//! part consisting of the boundary marker, a content-type header, and the
//! JPEG payload. Browsers replace the displayed image with every part they
//! receive, resulting in a continuous video feed.

use crate::image::Image;

/// Boundary token separating successive frames in the multipart stream.
pub const BOUNDARY: &str = "frame";

/// JPEG quality of streamed frames.
const JPEG_QUALITY: u8 = 90;

/// One self-delimited part of the multipart image stream.
#[derive(Debug, Clone)]
pub struct StreamChunk {
    bytes: Vec<u8>,
    image_len: usize,
}

impl StreamChunk {
    /// Returns the raw bytes to put on the wire.
    ///
    /// Chunks are written back to back; the framing keeps them
    /// distinguishable on the client side.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the length of the embedded JPEG payload in bytes.
    pub fn image_len(&self) -> usize {
        self.image_len
    }
}

/// Encodes `image` into a stream chunk.
///
/// The exact wire format is
/// `--frame\r\nContent-Type: image/jpeg\r\n\r\n<jpeg bytes>\r\n`.
pub fn encode(image: &Image) -> anyhow::Result<StreamChunk> {
    let jpeg = image.encode_jpeg(JPEG_QUALITY)?;

    let header = format!("--{BOUNDARY}\r\nContent-Type: image/jpeg\r\n\r\n");
    let mut bytes = Vec::with_capacity(header.len() + jpeg.len() + 2);
    bytes.extend_from_slice(header.as_bytes());
    bytes.extend_from_slice(&jpeg);
    bytes.extend_from_slice(b"\r\n");

    Ok(StreamChunk {
        bytes,
        image_len: jpeg.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing() {
        let chunk = encode(&Image::new(32, 32)).unwrap();
        let bytes = chunk.as_bytes();

        let prefix = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
        assert!(bytes.starts_with(prefix));
        assert!(bytes.ends_with(b"\r\n"));

        // Exactly one header block and one payload per chunk.
        let payload = &bytes[prefix.len()..bytes.len() - 2];
        assert_eq!(payload.len(), chunk.image_len());
        assert_eq!(
            bytes
                .windows(prefix.len())
                .filter(|w| w.starts_with(b"--frame"))
                .count(),
            1,
        );

        // The payload is a decodable JPEG of the input size.
        let decoded = Image::decode_jpeg(payload).unwrap();
        assert_eq!(decoded.width(), 32);
        assert_eq!(decoded.height(), 32);
    }
}

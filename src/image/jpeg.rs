use image::codecs::jpeg::JpegEncoder;
use image::Rgb;

use super::Image;

pub(super) fn decode_jpeg(data: &[u8]) -> anyhow::Result<Image> {
    let buf = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)?.to_rgba8();
    Ok(Image { buf })
}

pub(super) fn encode_jpeg(image: &Image, quality: u8) -> anyhow::Result<Vec<u8>> {
    // JPEG has no alpha channel, so the image is flattened to RGB first.
    let rgb = image::RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let px = image.buf[(x, y)];
        Rgb([px[0], px[1], px[2]])
    });

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), image::ColorType::Rgb8)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use crate::image::Color;
    use crate::resolution::Resolution;

    use super::*;

    #[test]
    fn round_trip_resolution() {
        let mut image = Image::new(16, 8);
        image.set(3, 4, Color::WHITE);
        let jpeg = encode_jpeg(&image, 90).unwrap();
        let decoded = decode_jpeg(&jpeg).unwrap();
        assert_eq!(decoded.resolution(), Resolution::new(16, 8));
    }
}

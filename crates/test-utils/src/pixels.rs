//! PNG decoding and pixel inspection for rendered tiles.

use image::RgbaImage;

/// Decode PNG bytes into an RGBA image, panicking with context on failure.
pub fn decode_png(bytes: &[u8]) -> RgbaImage {
    let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .unwrap_or_else(|e| panic!("output is not a decodable PNG: {e}"));
    img.to_rgba8()
}

/// RGBA value at a pixel.
pub fn pixel(img: &RgbaImage, x: u32, y: u32) -> [u8; 4] {
    img.get_pixel(x, y).0
}

/// Number of pixels with non-zero alpha.
pub fn painted_pixels(img: &RgbaImage) -> usize {
    img.pixels().filter(|p| p.0[3] > 0).count()
}

/// Whether any pixel inside the rectangle has non-zero alpha.
pub fn any_painted_in(img: &RgbaImage, x0: u32, y0: u32, x1: u32, y1: u32) -> bool {
    (y0..y1.min(img.height()))
        .flat_map(|y| (x0..x1.min(img.width())).map(move |x| (x, y)))
        .any(|(x, y)| img.get_pixel(x, y).0[3] > 0)
}

// ============================================================================
// TRANSFORM OPERATIONS — mirror, rotate, resize and composite tile stamps
// ============================================================================

use image::{RgbaImage, Rgba, imageops};

use crate::grid::Rotation;

/// Interpolation method for resize operations.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum Interpolation {
    /// Pixel-art safe; used for every tile stamp and the on-screen background.
    #[default]
    Nearest,
    /// Smooth scaling for full-resolution background export.
    Lanczos3,
}

impl Interpolation {
    pub fn to_filter(&self) -> imageops::FilterType {
        match self {
            Interpolation::Nearest  => imageops::FilterType::Nearest,
            Interpolation::Lanczos3 => imageops::FilterType::Lanczos3,
        }
    }
}

/// Fully transparent square.
pub fn transparent_tile(size: u32) -> RgbaImage {
    RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 0]))
}

/// Render a tile stamp: mirror first, then rotate clockwise, then
/// nearest-neighbour resize to `target_size × target_size`.
///
/// `base == None` (empty cell or missing asset) yields a transparent square.
/// Pure function, shared by the interactive renderer, the selector preview
/// and full-resolution export.
pub fn transform_tile(
    base: Option<&RgbaImage>,
    rotation: Rotation,
    mirror: bool,
    target_size: u32,
) -> RgbaImage {
    let Some(base) = base else {
        return transparent_tile(target_size);
    };

    let mirrored;
    let src = if mirror {
        mirrored = imageops::flip_horizontal(base);
        &mirrored
    } else {
        base
    };

    let rotated = match rotation {
        Rotation::R0   => src.clone(),
        Rotation::R90  => imageops::rotate90(src),
        Rotation::R180 => imageops::rotate180(src),
        Rotation::R270 => imageops::rotate270(src),
    };

    if rotated.width() == target_size && rotated.height() == target_size {
        return rotated;
    }
    resize(&rotated, target_size, target_size, Interpolation::Nearest)
}

pub fn resize(img: &RgbaImage, new_w: u32, new_h: u32, interp: Interpolation) -> RgbaImage {
    imageops::resize(img, new_w, new_h, interp.to_filter())
}

/// Alpha-over `top` onto `bottom` with its top-left corner at `(x, y)`.
pub fn composite_over(bottom: &mut RgbaImage, top: &RgbaImage, x: i64, y: i64) {
    imageops::overlay(bottom, top, x, y);
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Rgba<u8> = Rgba([0, 255, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    /// 2×2 image: R G / B W
    fn quad() -> RgbaImage {
        let mut img = RgbaImage::new(2, 2);
        img.put_pixel(0, 0, RED);
        img.put_pixel(1, 0, GREEN);
        img.put_pixel(0, 1, BLUE);
        img.put_pixel(1, 1, WHITE);
        img
    }

    #[test]
    fn test_missing_asset_is_transparent() {
        let out = transform_tile(None, Rotation::R90, true, 8);
        assert_eq!(out.dimensions(), (8, 8));
        assert!(out.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_rotation_is_clockwise() {
        // R G / B W rotated 90° clockwise becomes B R / W G
        let out = transform_tile(Some(&quad()), Rotation::R90, false, 2);
        assert_eq!(*out.get_pixel(0, 0), BLUE);
        assert_eq!(*out.get_pixel(1, 0), RED);
        assert_eq!(*out.get_pixel(0, 1), WHITE);
        assert_eq!(*out.get_pixel(1, 1), GREEN);
    }

    #[test]
    fn test_mirror_applies_before_rotation() {
        // mirror: G R / W B, then 90° cw: W G / B R
        let out = transform_tile(Some(&quad()), Rotation::R90, true, 2);
        assert_eq!(*out.get_pixel(0, 0), WHITE);
        assert_eq!(*out.get_pixel(1, 0), GREEN);
        assert_eq!(*out.get_pixel(0, 1), BLUE);
        assert_eq!(*out.get_pixel(1, 1), RED);
    }

    #[test]
    fn test_nearest_resize_keeps_hard_edges() {
        let out = transform_tile(Some(&quad()), Rotation::R0, false, 4);
        assert_eq!(out.dimensions(), (4, 4));
        assert_eq!(*out.get_pixel(0, 0), RED);
        assert_eq!(*out.get_pixel(1, 1), RED);
        assert_eq!(*out.get_pixel(3, 0), GREEN);
        assert_eq!(*out.get_pixel(0, 3), BLUE);
        assert_eq!(*out.get_pixel(3, 3), WHITE);
    }

    #[test]
    fn test_composite_over_respects_alpha() {
        let mut bottom = RgbaImage::from_pixel(2, 1, BLUE);
        let mut top = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 0]));
        top.put_pixel(1, 0, RED);
        composite_over(&mut bottom, &top, 0, 0);
        assert_eq!(*bottom.get_pixel(0, 0), BLUE);
        assert_eq!(*bottom.get_pixel(1, 0), RED);
    }
}

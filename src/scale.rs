//! Fitting canvases into the terminal's character grid

use crate::error::{CatResult, Error};
use crate::minipool;
use crate::Settings;
use imgref::ImgVec;
use rgb::RGBA8;

/// Pixel columns per terminal column
pub const RESIZE_FACTOR_X: usize = 1;
/// Pixel rows per terminal row (the half-block glyph packs two)
pub const RESIZE_FACTOR_Y: usize = 2;

/// Size of the output device in character cells
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Geometry {
    pub cols: u16,
    pub rows: u16,
}

impl Geometry {
    /// Used when stdout is not a terminal
    pub const FALLBACK: Self = Self { cols: 80, rows: 24 };

    /// Largest image, in pixels, that fits on screen under the reserved rows.
    pub fn target_box(self, settings: &Settings) -> CatResult<(usize, usize)> {
        let width = usize::from(self.cols) * RESIZE_FACTOR_X;
        let height = usize::from(self.rows.saturating_sub(settings.reserved_rows)) * RESIZE_FACTOR_Y;
        if width == 0 || height == 0 {
            return Err(Error::WrongSize(format!("the terminal is too small ({}×{}) to show anything", self.cols, self.rows)));
        }
        Ok((width, height))
    }
}

/// Resizes every frame (in parallel) to fit the terminal, keeping the aspect ratio.
///
/// Images that already fit are left alone; nothing is ever enlarged.
pub fn scale(frames: Vec<ImgVec<RGBA8>>, geometry: Geometry, settings: &Settings) -> CatResult<Vec<ImgVec<RGBA8>>> {
    let (max_width, max_height) = geometry.target_box(settings)?;
    minipool::map_ordered("scale", frames, move |frame| fit(frame, max_width, max_height))
}

pub fn fit(image: ImgVec<RGBA8>, max_width: usize, max_height: usize) -> CatResult<ImgVec<RGBA8>> {
    let (src_width, src_height) = (image.width(), image.height());
    if src_width <= max_width && src_height <= max_height {
        return Ok(image);
    }
    let (dst_width, dst_height) = fit_size(src_width, src_height, max_width, max_height);

    let (buf, _, _) = image.into_contiguous_buf();
    let mut r = resize::new(src_width, src_height, dst_width, dst_height, resize::Pixel::RGBA8, resize::Type::Lanczos3)?;
    let mut dst = vec![RGBA8::new(0, 0, 0, 0); dst_width * dst_height];
    r.resize(&buf, &mut dst)?;
    Ok(ImgVec::new(dst, dst_width, dst_height))
}

/// Picks the side that limits the size, and scales the other one proportionally.
fn fit_size(width: usize, height: usize, max_width: usize, max_height: usize) -> (usize, usize) {
    let src_aspect = width as f64 / height as f64;
    let max_aspect = max_width as f64 / max_height as f64;
    if src_aspect > max_aspect {
        let h = (height as f64 * max_width as f64 / width as f64).round() as usize;
        (max_width, h.clamp(1, max_height))
    } else {
        let w = (width as f64 * max_height as f64 / height as f64).round() as usize;
        (w.clamp(1, max_width), max_height)
    }
}

#[test]
fn fallback_box() {
    assert_eq!(Geometry::FALLBACK.target_box(&Settings::default()).unwrap(), (80, 32));
    let tiny = Geometry { cols: 40, rows: 8 };
    assert!(matches!(tiny.target_box(&Settings::default()), Err(Error::WrongSize(_))));
}

#[test]
fn keeps_aspect() {
    assert_eq!(fit_size(400, 100, 80, 32), (80, 20));
    assert_eq!(fit_size(100, 400, 80, 32), (8, 32));
    assert_eq!(fit_size(1000, 1, 80, 32), (80, 1));
    assert_eq!(fit_size(160, 64, 80, 32), (80, 32));
}

#[test]
fn small_images_are_not_enlarged() {
    let px = RGBA8::new(10, 20, 30, 255);
    let out = fit(ImgVec::new(vec![px; 4], 2, 2), 80, 32).unwrap();
    assert_eq!((out.width(), out.height()), (2, 2));
    assert_eq!(out.buf(), &[px; 4][..]);
}

#[test]
fn never_exceeds_the_box() {
    let px = RGBA8::new(200, 100, 50, 255);
    let frames = vec![
        ImgVec::new(vec![px; 300 * 200], 300, 200),
        ImgVec::new(vec![px; 50 * 90], 50, 90),
        ImgVec::new(vec![px; 81 * 2], 81, 2),
    ];
    let geometry = Geometry { cols: 100, rows: 30 };
    let out = scale(frames, geometry, &Settings::default()).unwrap();
    assert_eq!(out.len(), 3);
    for f in &out {
        assert!(f.width() <= 100 && f.height() <= 44, "{}×{}", f.width(), f.height());
    }
    assert_eq!((out[0].width(), out[0].height()), (66, 44));
    assert_eq!((out[1].width(), out[1].height()), (24, 44));
    assert_eq!((out[2].width(), out[2].height()), (81, 2));
}

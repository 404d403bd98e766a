//! Turns decoded frames into equally-sized, fully composited canvases

use crate::error::{CatResult, Error};
use crate::source::{Decoded, SubFrame};
use imgref::{ImgRef, ImgRefMut, ImgVec};
use rgb::RGBA8;

/// Each terminal cell shows two pixel rows, so anything smaller has nothing to show.
const MIN_SIZE: usize = 2;

pub fn normalize(decoded: Decoded) -> CatResult<Vec<ImgVec<RGBA8>>> {
    match decoded {
        Decoded::Still(image) => {
            check_size(image.width(), image.height())?;
            Ok(vec![image])
        },
        Decoded::Animation(frames) => composite(&frames),
    }
}

/// Frame `k` of the output is every sub-frame `0..=k` painted over each other.
///
/// Disposal methods are not applied; every sub-frame stays on the canvas.
pub fn composite(frames: &[SubFrame]) -> CatResult<Vec<ImgVec<RGBA8>>> {
    let first = frames.first().ok_or(Error::NoFrames)?;
    let (left, top, right, bottom) = frames.iter().fold(
        (first.left, first.top, first.left + first.image.width(), first.top + first.image.height()),
        |(l, t, r, b), f| (
            l.min(f.left),
            t.min(f.top),
            r.max(f.left + f.image.width()),
            b.max(f.top + f.image.height()),
        ));
    let (width, height) = (right - left, bottom - top);
    check_size(width, height)?;

    let mut screen = ImgVec::new(vec![RGBA8::new(0, 0, 0, 0); width * height], width, height);
    blit(screen.as_mut(), first.left - left, first.top - top, first.image.as_ref(), |_, src| src);

    let mut out = Vec::with_capacity(frames.len());
    for f in frames {
        blit(screen.as_mut(), f.left - left, f.top - top, f.image.as_ref(), over);
        out.push(screen.clone());
    }
    Ok(out)
}

fn check_size(width: usize, height: usize) -> CatResult<()> {
    if width < MIN_SIZE || height < MIN_SIZE {
        return Err(Error::TooSmall(width, height));
    }
    Ok(())
}

fn blit(mut dst: ImgRefMut<'_, RGBA8>, left: usize, top: usize, src: ImgRef<'_, RGBA8>, op: impl Fn(RGBA8, RGBA8) -> RGBA8) {
    let mut dst = dst.sub_image_mut(left, top, src.width(), src.height());
    for (dst_row, src_row) in dst.rows_mut().zip(src.rows()) {
        for (d, &s) in dst_row.iter_mut().zip(src_row) {
            *d = op(*d, s);
        }
    }
}

/// Porter-Duff "over" with straight (non-premultiplied) alpha
#[inline]
fn over(dst: RGBA8, src: RGBA8) -> RGBA8 {
    match src.a {
        255 => src,
        0 => dst,
        a => {
            let sa = u32::from(a);
            let da = u32::from(dst.a) * (255 - sa) / 255;
            let out_a = sa + da;
            let mix = |s: u8, d: u8| ((u32::from(s) * sa + u32::from(d) * da + out_a / 2) / out_a) as u8;
            RGBA8::new(mix(src.r, dst.r), mix(src.g, dst.g), mix(src.b, dst.b), out_a as u8)
        },
    }
}

#[cfg(test)]
fn solid(left: usize, top: usize, width: usize, height: usize, px: RGBA8) -> SubFrame {
    SubFrame { left, top, image: ImgVec::new(vec![px; width * height], width, height) }
}

#[test]
fn still_passes_through() {
    let red = RGBA8::new(255, 0, 0, 255);
    let frames = normalize(Decoded::Still(ImgVec::new(vec![red; 6], 3, 2))).unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!((frames[0].width(), frames[0].height()), (3, 2));
}

#[test]
fn tiny_still_is_rejected() {
    let px = RGBA8::new(1, 2, 3, 255);
    assert!(matches!(normalize(Decoded::Still(ImgVec::new(vec![px], 1, 1))), Err(Error::TooSmall(1, 1))));
    assert!(matches!(normalize(Decoded::Still(ImgVec::new(vec![px; 4], 4, 1))), Err(Error::TooSmall(4, 1))));
}

#[test]
fn accumulates_sub_frames() {
    let red = RGBA8::new(255, 0, 0, 255);
    let blue = RGBA8::new(0, 0, 255, 255);
    let clear = RGBA8::new(0, 0, 0, 0);
    let frames = composite(&[
        solid(0, 0, 2, 2, red),
        solid(2, 1, 2, 3, blue),
        solid(1, 1, 1, 1, clear),
    ]).unwrap();
    assert_eq!(frames.len(), 3);
    for f in &frames {
        assert_eq!((f.width(), f.height()), (4, 4));
    }
    assert_eq!(frames[0][(0usize, 0usize)], red);
    assert_eq!(frames[0][(3usize, 3usize)], clear);
    assert_eq!(frames[1][(0usize, 0usize)], red);
    assert_eq!(frames[1][(3usize, 3usize)], blue);
    // a transparent sub-frame leaves what's underneath
    assert_eq!(frames[2][(1usize, 1usize)], red);
    assert_eq!(frames[2][(2usize, 2usize)], blue);
}

#[test]
fn union_starts_at_smallest_offset() {
    let green = RGBA8::new(0, 255, 0, 255);
    let frames = composite(&[solid(5, 3, 2, 2, green), solid(6, 4, 2, 2, green)]).unwrap();
    assert_eq!((frames[0].width(), frames[0].height()), (3, 3));
    assert_eq!(frames[0][(0usize, 0usize)], green);
    assert_eq!(frames[0][(2usize, 2usize)].a, 0);
    assert_eq!(frames[1][(2usize, 2usize)], green);

    // no blank margin for the unused top-left of the logical screen
    let frames = composite(&[solid(2, 2, 2, 2, green), solid(2, 2, 2, 2, green)]).unwrap();
    assert_eq!((frames[1].width(), frames[1].height()), (2, 2));
}

#[test]
fn half_transparent_blends() {
    let white = RGBA8::new(255, 255, 255, 255);
    let dim = RGBA8::new(0, 0, 0, 128);
    let px = over(white, dim);
    assert_eq!(px.a, 255);
    assert_eq!(px.r, 127);
    assert_eq!(over(white, RGBA8::new(9, 9, 9, 0)), white);
}

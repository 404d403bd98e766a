//! Reading input bytes and turning them into RGBA pixels

use crate::error::{CatResult, Error};
use imgref::ImgVec;
use rgb::{FromSlice, RGBA8};
use std::io::Read;
use std::path::Path;

/// Image formats that can be shown
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FileType {
    GIF, PNG, JPEG, BMP, ICO,
}

impl FileType {
    /// Detects the format from the leading signature bytes
    pub fn sniff(buf: &[u8]) -> Option<Self> {
        if buf.starts_with(b"GIF87a") || buf.starts_with(b"GIF89a") {
            return Some(Self::GIF);
        }
        if buf.starts_with(b"\x89PNG\r\n\x1a\n") {
            return Some(Self::PNG);
        }
        if buf.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::JPEG);
        }
        if buf.starts_with(b"BM") {
            return Some(Self::BMP);
        }
        if buf.starts_with(&[0, 0, 1, 0]) {
            return Some(Self::ICO);
        }
        None
    }
}

/// One decoded GIF frame, placed at `left`,`top` on the logical screen
#[derive(Clone)]
pub struct SubFrame {
    pub left: usize,
    pub top: usize,
    pub image: ImgVec<RGBA8>,
}

/// Output of the decoders, before any compositing
pub enum Decoded {
    Still(ImgVec<RGBA8>),
    Animation(Vec<SubFrame>),
}

/// Reads the whole file, or stdin when there's no path (or the path is `-`).
pub fn load(path: Option<&Path>) -> CatResult<Vec<u8>> {
    match path {
        Some(path) if path != Path::new("-") => {
            std::fs::read(path).map_err(|e| Error::Load(path.display().to_string(), e))
        },
        _ => {
            let mut buf = Vec::new();
            std::io::stdin().lock().read_to_end(&mut buf)
                .map_err(|e| Error::Load("stdin".into(), e))?;
            Ok(buf)
        },
    }
}

pub fn decode(buf: &[u8]) -> CatResult<Decoded> {
    match FileType::sniff(buf).ok_or(Error::InvalidType)? {
        FileType::GIF => decode_gif(buf).map(Decoded::Animation),
        FileType::PNG => {
            let image = lodepng::decode32(buf)?;
            Ok(Decoded::Still(ImgVec::new(image.buffer, image.width, image.height)))
        },
        other => {
            let format = match other {
                FileType::JPEG => image::ImageFormat::Jpeg,
                FileType::BMP => image::ImageFormat::Bmp,
                _ => image::ImageFormat::Ico,
            };
            let image = image::load_from_memory_with_format(buf, format)?.to_rgba8();
            let (width, height) = (image.width() as usize, image.height() as usize);
            let pixels = image.into_raw().as_rgba().to_vec();
            Ok(Decoded::Still(ImgVec::new(pixels, width, height)))
        },
    }
}

fn decode_gif(mut buf: &[u8]) -> CatResult<Vec<SubFrame>> {
    let mut gif_opts = gif::DecodeOptions::new();
    gif_opts.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = gif_opts.read_info(&mut buf)?;

    let mut frames = Vec::new();
    while let Some(frame) = decoder.read_next_frame()? {
        let (width, height) = (usize::from(frame.width), usize::from(frame.height));
        let pixels = frame.buffer.as_rgba();
        if pixels.len() != width * height {
            return Err(Error::Decode(format!("GIF frame {} has {} pixels, expected {width}×{height}", frames.len(), pixels.len())));
        }
        frames.push(SubFrame {
            left: frame.left.into(),
            top: frame.top.into(),
            image: ImgVec::new(pixels.to_vec(), width, height),
        });
    }
    if frames.is_empty() {
        return Err(Error::NoFrames);
    }
    Ok(frames)
}

#[test]
fn sniffs_signatures() {
    assert_eq!(FileType::sniff(b"GIF89a\x01\x00"), Some(FileType::GIF));
    assert_eq!(FileType::sniff(b"\x89PNG\r\n\x1a\n...."), Some(FileType::PNG));
    assert_eq!(FileType::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(FileType::JPEG));
    assert_eq!(FileType::sniff(b"BM\x00\x00"), Some(FileType::BMP));
    assert_eq!(FileType::sniff(&[0, 0, 1, 0, 1, 0]), Some(FileType::ICO));
    assert_eq!(FileType::sniff(b"hello world"), None);
    assert_eq!(FileType::sniff(b""), None);
}

#[test]
fn rejects_unknown_bytes() {
    assert!(matches!(decode(b"definitely not an image"), Err(Error::InvalidType)));
}

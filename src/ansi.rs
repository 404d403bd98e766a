//! Half-block truecolor encoding
//!
//! Every character cell carries two pixels: the top one as the background
//! color, the bottom one as the foreground color of a `▄` glyph.

use crate::error::CatResult;
use crate::minipool;
use imgref::ImgRef;
use rgb::RGBA8;
use std::fmt::Write as _;
use std::io::Write;

pub const CURSOR_HIDE: &str = "\x1b[?25l";
pub const CURSOR_SHOW: &str = "\x1b[?25h";
pub const BG_TRANSPARENT: &str = "\x1b[0;39;49m";
pub const FG_TRANSPARENT: &str = "\x1b[0m ";
pub const RESET: &str = "\x1b[0m";
pub const LOWER_HALF_BLOCK: char = '▄';

/// Pixels with alpha below this are not drawn
const ALPHA_THRESHOLD: u8 = 128;

/// Moves the cursor `lines` rows up
pub fn cursor_up(lines: usize) -> String {
    format!("\x1b[{lines}A")
}

/// One image as terminal lines, each ending with a reset and a newline.
///
/// Encoded once and replayed as many times as needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    lines: Vec<String>,
}

impl EncodedFrame {
    #[inline]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    #[inline]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        self.lines.iter().try_for_each(|line| out.write_all(line.as_bytes()))
    }
}

/// Encodes rows `0&1`, `2&3`, … in parallel. A trailing odd row is dropped.
pub fn encode(frame: ImgRef<'_, RGBA8>) -> CatResult<EncodedFrame> {
    let pairs = frame.height() / 2;
    let lines = minipool::map_ordered("encode", (0..pairs).collect(), move |pair| Ok(encode_row_pair(frame, pair * 2)))?;
    Ok(EncodedFrame { lines })
}

fn encode_row_pair(frame: ImgRef<'_, RGBA8>, y: usize) -> String {
    let mut rows = frame.rows().skip(y);
    let (Some(top), Some(bottom)) = (rows.next(), rows.next()) else {
        return String::new();
    };
    // longest case is both colors with 3-digit channels
    let mut line = String::with_capacity(top.len() * 40 + RESET.len() + 1);
    for (&t, &b) in top.iter().zip(bottom) {
        push_background(&mut line, t);
        push_foreground(&mut line, b);
    }
    line.push_str(RESET);
    line.push('\n');
    line
}

#[inline]
fn push_background(line: &mut String, px: RGBA8) {
    if px.a < ALPHA_THRESHOLD {
        line.push_str(BG_TRANSPARENT);
    } else {
        let [r, g, b] = premultiplied(px);
        write!(line, "\x1b[48;2;{r};{g};{b}m").ok();
    }
}

#[inline]
fn push_foreground(line: &mut String, px: RGBA8) {
    if px.a < ALPHA_THRESHOLD {
        line.push_str(FG_TRANSPARENT);
    } else {
        let [r, g, b] = premultiplied(px);
        write!(line, "\x1b[38;2;{r};{g};{b}m{LOWER_HALF_BLOCK}").ok();
    }
}

/// Color channels scaled by alpha, widened to 16 bits and truncated back,
/// so a half-transparent edge comes out darker rather than at full brightness.
#[inline]
fn premultiplied(px: RGBA8) -> [u8; 3] {
    let a = u32::from(px.a);
    [px.r, px.g, px.b].map(|c| ((u32::from(c) * 257 * a / 255) >> 8) as u8)
}

#[cfg(test)]
use imgref::ImgVec;

#[test]
fn red_square() {
    let red = RGBA8::new(255, 0, 0, 255);
    let img = ImgVec::new(vec![red; 4], 2, 2);
    let enc = encode(img.as_ref()).unwrap();
    let cell = "\x1b[48;2;255;0;0m\x1b[38;2;255;0;0m▄";
    assert_eq!(enc.lines(), [format!("{cell}{cell}\x1b[0m\n")]);
}

#[test]
fn transparency_ignores_color() {
    let ghost = RGBA8::new(12, 34, 56, 127);
    let solid = RGBA8::new(1, 2, 3, 128);
    let img = ImgVec::new(vec![ghost, solid, solid, ghost], 2, 2);
    let enc = encode(img.as_ref()).unwrap();
    assert_eq!(enc.lines()[0], format!(
        "{BG_TRANSPARENT}\x1b[38;2;0;1;1m▄\x1b[48;2;0;1;1m{FG_TRANSPARENT}{RESET}\n"));
}

#[test]
fn half_transparent_is_premultiplied() {
    let img = ImgVec::new(vec![RGBA8::new(255, 0, 0, 200); 2], 1, 2);
    let enc = encode(img.as_ref()).unwrap();
    assert_eq!(enc.lines(), ["\x1b[48;2;200;0;0m\x1b[38;2;200;0;0m▄\x1b[0m\n"]);

    assert_eq!(premultiplied(RGBA8::new(255, 128, 7, 255)), [255, 128, 7]);
    assert_eq!(premultiplied(RGBA8::new(255, 255, 255, 128)), [128, 128, 128]);
}

#[test]
fn odd_row_is_dropped() {
    let px = RGBA8::new(9, 9, 9, 255);
    for (height, lines) in [(2, 1), (3, 1), (4, 2), (7, 3)] {
        let img = ImgVec::new(vec![px; 3 * height], 3, height);
        assert_eq!(encode(img.as_ref()).unwrap().line_count(), lines);
    }
}

#[test]
fn parallel_matches_sequential() {
    let (w, h) = (37, 91);
    let pixels = (0..w * h).map(|i| RGBA8::new(i as u8, (i * 7) as u8, (i * 13) as u8, (i * 31) as u8)).collect();
    let img = ImgVec::new(pixels, w, h);
    let sequential: Vec<_> = (0..h / 2).map(|p| encode_row_pair(img.as_ref(), p * 2)).collect();
    let first = encode(img.as_ref()).unwrap();
    assert_eq!(first.lines(), &sequential[..]);
    assert_eq!(first, encode(img.as_ref()).unwrap());

    let mut out = Vec::new();
    first.write_to(&mut out).unwrap();
    assert_eq!(out, sequential.concat().into_bytes());
}

use console_image::ansi::{self, BG_TRANSPARENT, FG_TRANSPARENT, RESET};
use console_image::playback::FOOTER;
use console_image::progress::{NoProgress, ProgressReporter};
use console_image::*;
use imgref::ImgVec;
use rgb::RGBA8;
use std::borrow::Cow;
use std::time::Duration;

const RED: RGBA8 = RGBA8 { r: 255, g: 0, b: 0, a: 255 };
const BLUE: RGBA8 = RGBA8 { r: 0, g: 0, b: 255, a: 255 };
const GREEN: RGBA8 = RGBA8 { r: 0, g: 255, b: 0, a: 255 };

/// Palette indices: 0 red, 1 blue, 2 green, 3 transparent
const PALETTE: [u8; 12] = [255, 0, 0, 0, 0, 255, 0, 255, 0, 0, 0, 0];

#[test]
fn red_square() {
    let png = lodepng::encode32(&[RED; 4], 2, 2).unwrap();
    let frames = prepare(&png, Geometry::FALLBACK, &Settings::default(), &mut NoProgress {}).unwrap();
    assert_eq!(frames.len(), 1);

    let cell = "\x1b[48;2;255;0;0m\x1b[38;2;255;0;0m▄";
    let line = format!("{cell}{cell}{RESET}\n");
    assert_eq!(frames[0].lines(), [line.clone()]);

    let (_keep, cancel) = crossbeam_channel::unbounded();
    let mut out = Vec::new();
    Player::new(&Settings::default()).play(&frames, &mut out, &cancel).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), format!("{}\n{line}{}", ansi::CURSOR_HIDE, ansi::CURSOR_SHOW));
}

#[test]
fn too_small() {
    let png = lodepng::encode32(&[RED], 1, 1).unwrap();
    let res = prepare(&png, Geometry::FALLBACK, &Settings::default(), &mut NoProgress {});
    assert!(matches!(res, Err(Error::TooSmall(1, 1))));
    assert!(res.unwrap_err().to_string().starts_with("load:"));
}

#[test]
fn invalid_type() {
    for junk in [&b""[..], b"%PDF-1.7", b"GIF8"] {
        let res = prepare(junk, Geometry::FALLBACK, &Settings::default(), &mut NoProgress {});
        assert!(matches!(res, Err(Error::InvalidType)));
    }
}

#[test]
fn broken_png() {
    let mut png = lodepng::encode32(&[RED; 16], 4, 4).unwrap();
    png.truncate(20);
    let res = prepare(&png, Geometry::FALLBACK, &Settings::default(), &mut NoProgress {});
    assert!(res.unwrap_err().to_string().starts_with("decode:"));
}

#[test]
fn gif_frames_accumulate() {
    let gif = gif_data(4, 4, &[
        (0, 0, 4, 4, 0),
        (1, 1, 2, 2, 1),
        (0, 0, 1, 1, 2),
    ]);
    let frames = normalize(decode(&gif).unwrap()).unwrap();
    assert_eq!(frames.len(), 3);
    for f in &frames {
        assert_eq!((f.width(), f.height()), (4, 4));
    }
    assert_eq!(px(&frames[0], 1, 1), RED);
    assert_eq!(px(&frames[1], 0, 0), RED);
    assert_eq!(px(&frames[1], 2, 2), BLUE);
    assert_eq!(px(&frames[2], 0, 0), GREEN);
    assert_eq!(px(&frames[2], 1, 1), BLUE);
    assert_eq!(px(&frames[2], 3, 3), RED);
}

#[test]
fn transparent_gif() {
    let gif = gif_data(2, 2, &[(0, 0, 2, 2, 3)]);
    let frames = prepare(&gif, Geometry::FALLBACK, &Settings::default(), &mut NoProgress {}).unwrap();
    assert_eq!(frames[0].lines(), [format!("{BG_TRANSPARENT}{FG_TRANSPARENT}{BG_TRANSPARENT}{FG_TRANSPARENT}{RESET}\n")]);
}

#[test]
fn animation_loops_until_cancelled() {
    let gif = gif_data(4, 4, &[
        (0, 0, 4, 4, 0),
        (0, 0, 4, 2, 1),
        (0, 2, 4, 2, 2),
    ]);
    let frames = prepare(&gif, Geometry::FALLBACK, &Settings::default(), &mut NoProgress {}).unwrap();
    assert_eq!(frames.len(), 3);
    assert!(frames.iter().all(|f| f.line_count() == 2));

    let (tx, cancel) = crossbeam_channel::unbounded();
    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(300));
        tx.send(()).unwrap();
    });
    let mut out = Vec::new();
    let settings = Settings { fps: 60, ..Settings::default() };
    Player::new(&settings).play(&frames, &mut out, &cancel).unwrap();
    stopper.join().unwrap();
    let out = String::from_utf8(out).unwrap();

    let body = |f: &EncodedFrame| f.lines().concat();
    let up = ansi::cursor_up(4);
    let expected = format!("{}\n{}{FOOTER}{up}{}{FOOTER}{up}{}{FOOTER}{up}{}{FOOTER}",
        ansi::CURSOR_HIDE, body(&frames[0]), body(&frames[1]), body(&frames[2]), body(&frames[0]));
    assert!(out.starts_with(&expected), "{out:?}");
    assert!(out.ends_with(ansi::CURSOR_SHOW));
    assert_eq!(out.matches(ansi::CURSOR_SHOW).count(), 1);
}

#[test]
fn progress_can_abort() {
    struct StopAfterOne(u32);
    impl ProgressReporter for StopAfterOne {
        fn increase(&mut self) -> bool {
            self.0 += 1;
            self.0 < 2
        }
    }

    let gif = gif_data(4, 4, &[(0, 0, 4, 4, 0), (0, 0, 2, 2, 1), (2, 2, 2, 2, 2)]);
    let mut reporter = StopAfterOne(0);
    let res = prepare(&gif, Geometry::FALLBACK, &Settings::default(), &mut reporter);
    assert_eq!(reporter.0, 2);
    let err = res.unwrap_err();
    assert!(matches!(err, Error::Aborted));
    assert_eq!(err.to_string(), "encode: aborted");
}

#[test]
fn big_image_is_fitted() {
    let png = lodepng::encode32(&vec![BLUE; 400 * 100], 400, 100).unwrap();
    let geometry = Geometry { cols: 100, rows: 40 };
    let frames = prepare(&png, geometry, &Settings::default(), &mut NoProgress {}).unwrap();
    // 400×100 into 100×64 pixels is 100×25, and the odd last row is dropped
    assert_eq!(frames[0].line_count(), 12);
    let cells = frames[0].lines()[0].matches('▄').count();
    assert_eq!(cells, 100);
}

fn px(img: &ImgVec<RGBA8>, x: usize, y: usize) -> RGBA8 {
    img.buf()[y * img.stride() + x]
}

/// Each frame is `(left, top, width, height, palette index)`
fn gif_data(width: u16, height: u16, frames: &[(u16, u16, u16, u16, u8)]) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut enc = gif::Encoder::new(&mut out, width, height, &[]).unwrap();
        for &(left, top, width, height, index) in frames {
            let frame = gif::Frame {
                left,
                top,
                width,
                height,
                transparent: Some(3),
                palette: Some(PALETTE.to_vec()),
                buffer: Cow::Owned(vec![index; usize::from(width) * usize::from(height)]),
                ..gif::Frame::default()
            };
            enc.write_frame(&frame).unwrap();
        }
    }
    out
}

//! Writing encoded frames to the terminal, once or in a loop

use crate::ansi::{self, EncodedFrame};
use crate::error::{CatResult, Error};
use crate::Settings;
use crossbeam_channel::{select, Receiver};
use std::io::Write;
use std::time::Duration;

/// Printed under every animation frame. Its two newlines are part of the cursor-up distance.
pub const FOOTER: &str = "\npress `ctrl c` to exit\n";
const FOOTER_LINES: usize = 2;

/// Plays a still image once, or an animation until cancelled
pub struct Player {
    fps: u8,
}

impl Player {
    pub fn new(settings: &Settings) -> Self {
        Self { fps: settings.fps.max(1) }
    }

    /// The cursor is hidden while frames are written, and shown again on every exit path.
    ///
    /// A message on `cancel` (or all of its senders going away) stops an animation
    /// after the frame currently being written. Stills ignore `cancel`.
    pub fn play<W: Write>(&self, frames: &[EncodedFrame], out: &mut W, cancel: &Receiver<()>) -> CatResult<()> {
        if frames.is_empty() {
            return Err(Error::NoFrames);
        }
        let res = self.play_hidden(frames, out, cancel);
        let restored = out.write_all(ansi::CURSOR_SHOW.as_bytes()).and_then(|()| out.flush());
        res?;
        restored?;
        Ok(())
    }

    fn play_hidden<W: Write>(&self, frames: &[EncodedFrame], out: &mut W, cancel: &Receiver<()>) -> CatResult<()> {
        out.write_all(ansi::CURSOR_HIDE.as_bytes())?;
        out.write_all(b"\n")?;

        if let [still] = frames {
            still.write_to(out)?;
            return Ok(());
        }

        let ticker = crossbeam_channel::tick(Duration::from_secs(1) / u32::from(self.fps));
        let height = frames[0].line_count() + FOOTER_LINES;
        for (i, frame) in frames.iter().cycle().enumerate() {
            if i != 0 {
                out.write_all(ansi::cursor_up(height).as_bytes())?;
            }
            frame.write_to(out)?;
            out.write_all(FOOTER.as_bytes())?;
            out.flush()?;

            select! {
                recv(cancel) -> _ => break,
                recv(ticker) -> _ => {},
            }
        }
        Ok(())
    }
}

#[cfg(test)]
fn frame(text: &str) -> EncodedFrame {
    use imgref::ImgVec;
    use rgb::RGBA8;
    let v = text.as_bytes()[0];
    ansi::encode(ImgVec::new(vec![RGBA8::new(v, v, v, 255); 4], 1, 4).as_ref()).unwrap()
}

#[cfg(test)]
fn to_string(frame: &EncodedFrame) -> String {
    frame.lines().concat()
}

#[test]
fn still_is_written_once() {
    let still = frame("a");
    let (_keep, cancel) = crossbeam_channel::unbounded();
    let mut out = Vec::new();
    Player::new(&Settings::default()).play(std::slice::from_ref(&still), &mut out, &cancel).unwrap();
    let expected = format!("{}\n{}{}", ansi::CURSOR_HIDE, to_string(&still), ansi::CURSOR_SHOW);
    assert_eq!(String::from_utf8(out).unwrap(), expected);
}

#[test]
fn stops_after_the_first_frame_when_already_cancelled() {
    let frames = [frame("a"), frame("b"), frame("c")];
    let (tx, cancel) = crossbeam_channel::unbounded();
    tx.send(()).unwrap();
    let mut out = Vec::new();
    Player::new(&Settings::default()).play(&frames, &mut out, &cancel).unwrap();
    let expected = format!("{}\n{}{FOOTER}{}", ansi::CURSOR_HIDE, to_string(&frames[0]), ansi::CURSOR_SHOW);
    assert_eq!(String::from_utf8(out).unwrap(), expected);
}

#[test]
fn loops_in_place_until_cancelled() {
    let frames = [frame("a"), frame("b"), frame("c")];
    let (tx, cancel) = crossbeam_channel::unbounded();
    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(150));
        tx.send(()).unwrap();
    });
    let mut out = Vec::new();
    let settings = Settings { fps: 100, ..Settings::default() };
    Player::new(&settings).play(&frames, &mut out, &cancel).unwrap();
    stopper.join().unwrap();

    let out = String::from_utf8(out).unwrap();
    let up = ansi::cursor_up(2 + 2);
    let mut expected = format!("{}\n", ansi::CURSOR_HIDE);
    for (i, f) in frames.iter().chain(&frames).take(4).enumerate() {
        if i != 0 {
            expected += &up;
        }
        expected += &to_string(f);
        expected += FOOTER;
    }
    assert!(out.starts_with(&expected), "{out:?}");
    assert!(out.ends_with(&format!("{FOOTER}{}", ansi::CURSOR_SHOW)));
}

#[test]
fn write_errors_still_show_the_cursor() {
    struct FailOnFooter(Vec<u8>);
    impl Write for FailOnFooter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if buf.starts_with(FOOTER.as_bytes()) {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"));
            }
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> { Ok(()) }
    }

    let frames = [frame("a"), frame("b")];
    let (_keep, cancel) = crossbeam_channel::unbounded();
    let mut out = FailOnFooter(Vec::new());
    let res = Player::new(&Settings::default()).play(&frames, &mut out, &cancel);
    assert!(matches!(res, Err(Error::Io(_))));
    assert!(out.0.ends_with(ansi::CURSOR_SHOW.as_bytes()));
}

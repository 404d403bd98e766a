/*
 console-image: still images and animated GIFs as truecolor terminal art

 This program is free software: you can redistribute it and/or modify
 it under the terms of the GNU Affero General Public License as
 published by the Free Software Foundation, either version 3 of the
 License, or (at your option) any later version.

 This program is distributed in the hope that it will be useful,
 but WITHOUT ANY WARRANTY; without even the implied warranty of
 MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 GNU Affero General Public License for more details.

 You should have received a copy of the GNU Affero General Public License
 along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/
//! Decodes an image, fits it to the terminal, and paints it with
//! background/foreground truecolor escapes, two pixels per character cell.
//!
//! The pipeline is [`decode`] → [`normalize`] → [`scale`] → [`encode_all`] → [`display`],
//! or all of it at once with [`show_image`].

use imgref::ImgVec;
use rgb::RGBA8;

mod error;
pub use crate::error::*;
mod minipool;
mod ordqueue;
pub mod ansi;
pub mod playback;
pub mod progress;
pub mod terminal;
mod normalize;
mod scale;
mod source;

pub use crate::ansi::EncodedFrame;
pub use crate::normalize::{composite, normalize};
pub use crate::playback::Player;
pub use crate::scale::{fit, scale, Geometry, RESIZE_FACTOR_X, RESIZE_FACTOR_Y};
pub use crate::source::{decode, load, Decoded, FileType, SubFrame};

use crate::progress::{NoProgress, ProgressReporter};
use crate::terminal::EchoGuard;
use crossbeam_channel::Receiver;
use std::io::{self, BufWriter};
use std::path::Path;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Animation speed; every frame is shown for `1/fps` seconds
    pub fps: u8,
    /// Terminal rows kept free below the image
    pub reserved_rows: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self { fps: 15, reserved_rows: 8 }
    }
}

/// Encodes each frame in turn (rows of a frame in parallel).
///
/// `ProgressReporter.increase()` is called after every frame, and may abort.
pub fn encode_all(frames: &[ImgVec<RGBA8>], reporter: &mut dyn ProgressReporter) -> CatResult<Vec<EncodedFrame>> {
    let mut encoded = Vec::with_capacity(frames.len());
    for frame in frames {
        encoded.push(ansi::encode(frame.as_ref())?);
        if !reporter.increase() {
            return Err(Error::Aborted);
        }
    }
    Ok(encoded)
}

/// Everything before output: decode, composite, fit into `geometry`, and encode.
pub fn prepare(buf: &[u8], geometry: Geometry, settings: &Settings, reporter: &mut dyn ProgressReporter) -> CatResult<Vec<EncodedFrame>> {
    let frames = normalize(decode(buf)?)?;
    let frames = scale(frames, geometry, settings)?;
    encode_all(&frames, reporter)
}

/// Plays the frames on stdout. Echo is off for the duration when stdout is a terminal.
///
/// Failing to turn echo off is not fatal; keypresses will just show up on screen.
pub fn display(frames: &[EncodedFrame], settings: &Settings, cancel: &Receiver<()>) -> CatResult<()> {
    let _echo = if terminal::is_tty() { EchoGuard::disable().ok() } else { None };
    let mut out = BufWriter::new(io::stdout().lock());
    Player::new(settings).play(frames, &mut out, cancel)
}

/// Shows the image at `path` (or stdin) on this terminal. Animations loop until Ctrl-C.
pub fn show_image(path: Option<&Path>, settings: &Settings) -> CatResult<()> {
    let buf = load(path)?;
    let frames = prepare(&buf, terminal::geometry()?, settings, &mut NoProgress {})?;
    let cancel = if frames.len() > 1 { terminal::interrupt_channel()? } else { crossbeam_channel::never() };
    display(&frames, settings, &cancel)
}

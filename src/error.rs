use std::io;
use std::num::TryFromIntError;
use quick_error::quick_error;

quick_error! {
    #[derive(Debug)]
    pub enum Error {
        /// A worker or channel went away mid-job. The pool reports it as [`Error::Worker`].
        ThreadSend {
            display("internal error; a worker thread stopped unexpectedly")
        }
        Worker(stage: &'static str) {
            display("{}: internal error; a worker thread stopped unexpectedly", stage)
        }
        Aborted {
            display("encode: aborted")
        }
        Load(path: String, err: io::Error) {
            display("load: can't read {}: {}", path, err)
        }
        InvalidType {
            display("load: invalid type; only GIF, PNG, JPEG, BMP and ICO images are supported")
        }
        TooSmall(width: usize, height: usize) {
            display("load: the input image is too small ({}×{}); it needs at least 2×2 pixels", width, height)
        }
        NoFrames {
            display("decode: found no frames to show")
        }
        Gif(err: gif::DecodingError) {
            from()
            display("decode: GIF error: {}", err)
        }
        Decode(msg: String) {
            display("decode: {}", msg)
        }
        Image(err: image::ImageError) {
            from()
            display("decode: {}", err)
        }
        WrongSize(msg: String) {
            display("scale: {}", msg)
            from(e: TryFromIntError) -> (e.to_string())
            from(e: resize::Error) -> (e.to_string())
        }
        Terminal(err: io::Error) {
            display("terminal: {}", err)
        }
        Io(err: io::Error) {
            from()
            display("display: I/O: {}", err)
        }
    }
}

pub type CatResult<T, E = Error> = Result<T, E>;

impl From<lodepng::Error> for Error {
    #[cold]
    fn from(err: lodepng::Error) -> Self {
        Self::Decode(format!("PNG error: {err}"))
    }
}

impl<T> From<crossbeam_channel::SendError<T>> for Error {
    #[cold]
    fn from(_: crossbeam_channel::SendError<T>) -> Self {
        Self::ThreadSend
    }
}

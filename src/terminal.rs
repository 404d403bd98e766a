//! The bits of the terminal device that playback touches: its size, echo, and Ctrl-C
//!
//! # Safety
//!
//! The `unsafe` blocks here are plain libc calls on file descriptors this module owns
//! (stdin, stdout, and the SIGINT pipe). Every pointer passed is to a live local
//! (`winsize`, `termios`, `sigaction`, a one-byte buffer) that outlives the call.
//! Zeroed `winsize`, `termios` and `sigaction` are valid plain-old-data values.
//! The signal handler only loads an atomic and calls `write(2)`, both async-signal-safe.

use crate::error::{CatResult, Error};
use crate::scale::Geometry;
use crossbeam_channel::Receiver;

use std::io::{self, IsTerminal};

/// Whether stdout is an interactive terminal
pub fn is_tty() -> bool {
    io::stdout().is_terminal()
}

/// Terminal size in cells, or [`Geometry::FALLBACK`] when stdout isn't a terminal.
///
/// Measured once; resizing the window during playback has no effect.
#[cfg(unix)]
pub fn geometry() -> CatResult<Geometry> {
    if !is_tty() {
        return Ok(Geometry::FALLBACK);
    }
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    if unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) } != 0 {
        return Err(Error::Terminal(io::Error::last_os_error()));
    }
    Ok(Geometry { cols: ws.ws_col, rows: ws.ws_row })
}

#[cfg(not(unix))]
pub fn geometry() -> CatResult<Geometry> {
    Ok(Geometry::FALLBACK)
}

/// Turns off echo and line buffering of stdin until dropped,
/// so stray keypresses don't scribble over the animation.
pub struct EchoGuard {
    #[cfg(unix)]
    original: libc::termios,
}

impl EchoGuard {
    #[cfg(unix)]
    pub fn disable() -> CatResult<Self> {
        let mut termios: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(libc::STDIN_FILENO, &mut termios) } != 0 {
            return Err(Error::Terminal(io::Error::last_os_error()));
        }
        // from here on, dropping the guard puts the original state back
        let guard = Self { original: termios };
        termios.c_lflag &= !(libc::ECHO | libc::ICANON);
        if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &termios) } != 0 {
            return Err(Error::Terminal(io::Error::last_os_error()));
        }
        Ok(guard)
    }

    #[cfg(not(unix))]
    pub fn disable() -> CatResult<Self> {
        Ok(Self {})
    }
}

impl Drop for EchoGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        unsafe {
            let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &self.original);
        }
    }
}

/// Delivers one message per Ctrl-C (SIGINT) instead of killing the process.
///
/// The signal handler only writes a byte to a pipe; a helper thread turns that into a channel message.
#[cfg(unix)]
pub fn interrupt_channel() -> CatResult<Receiver<()>> {
    use std::sync::atomic::Ordering;

    let mut fds = [0 as libc::c_int; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(Error::Terminal(io::Error::last_os_error()));
    }
    let [read_fd, write_fd] = fds;
    let previous = sigint::PIPE.swap(write_fd, Ordering::SeqCst);
    if previous >= 0 {
        unsafe { libc::close(previous) };
    }

    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = sigint::handler as extern "C" fn(libc::c_int) as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut sa.sa_mask);
        if libc::sigaction(libc::SIGINT, &sa, std::ptr::null_mut()) != 0 {
            return Err(Error::Terminal(io::Error::last_os_error()));
        }
    }

    let (sender, receiver) = crossbeam_channel::unbounded();
    std::thread::Builder::new().name("sigint".into()).spawn(move || {
        let mut byte = 0u8;
        loop {
            let n = unsafe { libc::read(read_fd, (&mut byte as *mut u8).cast(), 1) };
            if n < 0 && io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
                continue;
            }
            if n <= 0 || sender.send(()).is_err() {
                break;
            }
        }
        unsafe { libc::close(read_fd) };
    }).map_err(Error::Terminal)?;
    Ok(receiver)
}

#[cfg(not(unix))]
pub fn interrupt_channel() -> CatResult<Receiver<()>> {
    Ok(crossbeam_channel::never())
}

#[cfg(unix)]
mod sigint {
    use std::sync::atomic::{AtomicI32, Ordering};

    /// Write end of the self-pipe, -1 until installed
    pub(super) static PIPE: AtomicI32 = AtomicI32::new(-1);

    /// Only async-signal-safe calls in here
    pub(super) extern "C" fn handler(_sig: libc::c_int) {
        let fd = PIPE.load(Ordering::Relaxed);
        if fd >= 0 {
            let byte = 1u8;
            unsafe { libc::write(fd, (&byte as *const u8).cast(), 1) };
        }
    }
}

#[cfg(all(test, unix))]
#[test]
fn sigint_is_delivered_as_a_message() {
    use std::time::Duration;

    let interrupts = interrupt_channel().unwrap();
    for _ in 0..2 {
        assert_eq!(unsafe { libc::raise(libc::SIGINT) }, 0);
        assert_eq!(interrupts.recv_timeout(Duration::from_secs(1)), Ok(()));
    }
    assert!(interrupts.try_recv().is_err());
}

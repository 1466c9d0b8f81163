// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transparent PTY relay.
//!
//! All I/O passes through unchanged: keystrokes from the user's terminal
//! go to the child, child output goes verbatim to the user's stdout and,
//! as a copy, to the observer channel. The child behaves exactly as if it
//! were running directly in the terminal.

use std::io::Write;
use std::os::fd::{AsRawFd, BorrowedFd};
use std::time::Duration;

use bytes::Bytes;
use nix::libc;
use nix::sys::termios;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::nbio::{read_chunk, read_now, write_all};
use super::spawn::ChildPty;
use super::READ_CHUNK;

/// Exit code reported when the watcher is interrupted.
pub const INTERRUPT_EXIT_CODE: i32 = 130;

/// RAII guard that restores the original terminal attributes on drop.
///
/// Stores a raw fd (stdin) and the original termios state. The fd is
/// valid for the lifetime of the process (stdin never closes).
struct RawModeGuard {
    fd: i32,
    original: termios::Termios,
}

impl RawModeGuard {
    fn enter() -> anyhow::Result<Self> {
        let fd = std::io::stdin().as_raw_fd();
        let borrowed = borrow_fd(fd);
        let original = termios::tcgetattr(borrowed)?;
        let mut raw = original.clone();
        termios::cfmakeraw(&mut raw);
        termios::tcsetattr(borrowed, termios::SetArg::TCSAFLUSH, &raw)?;
        Ok(Self { fd, original })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let borrowed = borrow_fd(self.fd);
        let _ = termios::tcsetattr(borrowed, termios::SetArg::TCSAFLUSH, &self.original);
    }
}

/// Create a `BorrowedFd` from a raw fd that we know is valid.
fn borrow_fd(fd: i32) -> BorrowedFd<'static> {
    // SAFETY: stdin fd 0 is valid for the lifetime of the process.
    #[allow(unsafe_code)]
    unsafe {
        BorrowedFd::borrow_raw(fd)
    }
}

/// Current terminal size as `(cols, rows)`, or `None` when stdout is not
/// a tty.
pub fn terminal_size() -> Option<(u16, u16)> {
    let fd = std::io::stdout().as_raw_fd();
    let mut ws = libc::winsize { ws_row: 0, ws_col: 0, ws_xpixel: 0, ws_ypixel: 0 };
    // SAFETY: TIOCGWINSZ ioctl reads terminal size into a winsize struct.
    // The fd is stdout which is valid, and ws is a properly-initialized
    // stack variable with the correct layout for this ioctl.
    #[allow(unsafe_code)]
    let ret = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ, &mut ws) };
    if ret == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Some((ws.ws_col, ws.ws_row))
    } else {
        None
    }
}

/// Transparent relay between the user's terminal and a spawned child.
pub struct PtyProxy {
    pty: ChildPty,
}

impl PtyProxy {
    pub fn new(pty: ChildPty) -> Self {
        Self { pty }
    }

    /// Relay until the child exits or `shutdown` fires.
    ///
    /// Every chunk read from the master is written to stdout and handed to
    /// `observer`; chunks carry no line alignment. Returns the child's
    /// exit code, or 130 when stopped via `shutdown` (the child gets
    /// SIGTERM first). The terminal is restored on every exit path.
    pub async fn run(
        self,
        observer: mpsc::Sender<Bytes>,
        shutdown: CancellationToken,
    ) -> anyhow::Result<i32> {
        let stdin_is_tty = std::io::IsTerminal::is_terminal(&std::io::stdin());

        // Raw mode so keystrokes pass through immediately. Skipped when
        // stdin is not a tty (piped input still relays).
        let raw_guard = if stdin_is_tty { RawModeGuard::enter().ok() } else { None };

        // Blocking thread feeding user input into the select loop.
        let (stdin_tx, mut stdin_rx) = mpsc::channel::<Vec<u8>>(64);
        std::thread::spawn(move || {
            use std::io::Read;
            let stdin = std::io::stdin();
            let mut handle = stdin.lock();
            let mut buf = [0u8; READ_CHUNK];
            loop {
                match handle.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if stdin_tx.blocking_send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        });

        // Terminal resize propagation.
        let mut sigwinch =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::window_change()).ok();

        let mut stdout = std::io::stdout();
        let mut buf = vec![0u8; READ_CHUNK];
        let mut reap = tokio::time::interval(Duration::from_secs(1));
        let mut exit_code: Option<i32> = None;
        let mut interrupted = false;

        loop {
            tokio::select! {
                // Child output -> user's stdout + observer.
                result = read_chunk(self.pty.master(), &mut buf) => {
                    match result {
                        Ok(0) => break,
                        Ok(n) => {
                            let _ = stdout.write_all(&buf[..n]);
                            let _ = stdout.flush();
                            let _ = observer.send(Bytes::copy_from_slice(&buf[..n])).await;
                        }
                        // EIO means the child closed its side of the PTY.
                        Err(e) if e.raw_os_error() == Some(libc::EIO) => break,
                        Err(_) => break,
                    }
                }

                // User input -> child.
                data = stdin_rx.recv() => {
                    match data {
                        Some(bytes) => {
                            if write_all(self.pty.master(), &bytes).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }

                // Terminal resize.
                _ = async {
                    match sigwinch.as_mut() {
                        Some(s) => { s.recv().await; }
                        None => std::future::pending::<()>().await,
                    }
                } => {
                    if let Some((cols, rows)) = terminal_size() {
                        let _ = self.pty.resize(cols, rows);
                    }
                }

                // Periodic non-blocking reap.
                _ = reap.tick() => {
                    if let Some(code) = self.pty.try_wait() {
                        exit_code = Some(code);
                        break;
                    }
                }

                _ = shutdown.cancelled() => {
                    let _ = self.pty.terminate();
                    interrupted = true;
                    break;
                }
            }
        }

        // Drain whatever the child left buffered so its final screen is
        // preserved.
        loop {
            match read_now(self.pty.master(), &mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let _ = stdout.write_all(&buf[..n]);
                    let _ = stdout.flush();
                    let _ = observer.send(Bytes::copy_from_slice(&buf[..n])).await;
                }
                Err(_) => break,
            }
        }

        let code = if interrupted {
            // Reap the terminated child but report the interrupt.
            let _ = self.pty.wait().await;
            INTERRUPT_EXIT_CODE
        } else if let Some(code) = exit_code {
            code
        } else {
            self.pty.wait().await?
        };

        drop(raw_guard);
        Ok(code)
    }
}

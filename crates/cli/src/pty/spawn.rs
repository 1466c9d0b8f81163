// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::ffi::CString;
use std::os::fd::AsRawFd;

use anyhow::{bail, Context};
use nix::libc;
use nix::pty::{forkpty, ForkptyResult, Winsize};
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{execvp, Pid};
use tokio::io::unix::AsyncFd;

use super::nbio::{set_nonblocking, PtyFd};

/// A child process spawned on its own PTY via `forkpty`.
///
/// `forkpty` gives the child a new session with the slave as its
/// controlling terminal and the slave duplicated onto stdin/stdout/stderr;
/// the parent keeps the master.
pub struct ChildPty {
    master: AsyncFd<PtyFd>,
    child_pid: Pid,
}

impl ChildPty {
    /// Spawn `command` on a new PTY sized `cols` x `rows`.
    ///
    /// `command` must have at least one element (the program to run). If
    /// the exec fails the child exits 127, which the parent observes
    /// through the normal wait path.
    // forkpty requires unsafe: the post-fork child is partially initialized
    #[allow(unsafe_code)]
    pub fn spawn(command: &[String], cols: u16, rows: u16) -> anyhow::Result<Self> {
        if command.is_empty() {
            bail!("cannot spawn an empty command");
        }

        let winsize = Winsize { ws_col: cols, ws_row: rows, ws_xpixel: 0, ws_ypixel: 0 };

        // SAFETY: forkpty is unsafe because the child is in a
        // partially-initialized state after fork. The child branch below
        // only builds argv and execs; it never returns into the caller.
        let result = unsafe { forkpty(&winsize, None) }.context("forkpty failed")?;

        match result {
            ForkptyResult::Child => {
                let c_args: Vec<CString> = match command
                    .iter()
                    .map(|s| CString::new(s.as_bytes()))
                    .collect::<Result<_, _>>()
                {
                    Ok(args) => args,
                    Err(_) => std::process::exit(127),
                };

                let _ = execvp(&c_args[0], &c_args);
                std::process::exit(127);
            }
            ForkptyResult::Parent { child, master } => {
                set_nonblocking(&master)?;
                let master = AsyncFd::new(PtyFd(master)).context("AsyncFd::new failed")?;
                Ok(Self { master, child_pid: child })
            }
        }
    }

    /// The master side of the PTY pair.
    pub fn master(&self) -> &AsyncFd<PtyFd> {
        &self.master
    }

    pub fn child_pid(&self) -> u32 {
        self.child_pid.as_raw() as u32
    }

    /// Propagate a new window size to the PTY.
    // TIOCSWINSZ requires unsafe for the libc::ioctl call
    #[allow(unsafe_code)]
    pub fn resize(&self, cols: u16, rows: u16) -> anyhow::Result<()> {
        let ws = Winsize { ws_col: cols, ws_row: rows, ws_xpixel: 0, ws_ypixel: 0 };

        // SAFETY: TIOCSWINSZ is a well-defined ioctl that sets the window
        // size on the PTY master fd. The Winsize struct is properly
        // initialized.
        let ret = unsafe { libc::ioctl(self.master.as_raw_fd(), libc::TIOCSWINSZ, &ws) };
        if ret < 0 {
            bail!("TIOCSWINSZ ioctl failed: {}", std::io::Error::last_os_error());
        }
        Ok(())
    }

    /// Non-blocking reap. Returns the exit code once the child has
    /// terminated: `WEXITSTATUS` for a normal exit, -1 for a signal.
    pub fn try_wait(&self) -> Option<i32> {
        match waitpid(self.child_pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(_, code)) => Some(code),
            Ok(WaitStatus::Signaled(..)) => Some(-1),
            Ok(_) => None,
            Err(nix::errno::Errno::EINTR) => None,
            Err(_) => Some(-1),
        }
    }

    /// Ask the child to terminate.
    pub fn terminate(&self) -> anyhow::Result<()> {
        kill(self.child_pid, Signal::SIGTERM).context("SIGTERM failed")?;
        Ok(())
    }

    /// Block until the child exits, off the async runtime.
    pub async fn wait(&self) -> anyhow::Result<i32> {
        let pid = self.child_pid;
        tokio::task::spawn_blocking(move || wait_for_exit(pid))
            .await
            .context("join wait thread")?
    }
}

/// Block until the child exits and map the status to an exit code.
fn wait_for_exit(pid: Pid) -> anyhow::Result<i32> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(code),
            Ok(WaitStatus::Signaled(..)) => return Ok(-1),
            Ok(_) => continue,
            Err(nix::errno::Errno::EINTR) => continue,
            Err(e) => bail!("waitpid failed: {e}"),
        }
    }
}

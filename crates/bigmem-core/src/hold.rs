//! The hold phase between fill and release.
//!
//! Every strategy blocks here exactly once so an external observer gets a
//! window to inspect the process's memory footprint. A foreground run ends
//! on operator input; a background run ends on SIGINT, SIGTERM, or SIGHUP.
//! The signal only ends the hold; the strategy still walks its release
//! path afterwards, which is what keeps System-V segments and backing
//! files from leaking on Ctrl+C or `kill`.

use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use log::debug;

/// Set once a termination signal has been delivered. Signals are consumed
/// as a one-shot event: redelivery before the hold observes the flag has
/// no additional effect.
static SIGNALED: AtomicBool = AtomicBool::new(false);

const TERM_SIGNALS: [libc::c_int; 3] = [libc::SIGINT, libc::SIGTERM, libc::SIGHUP];

extern "C" fn on_term_signal(_sig: libc::c_int) {
    SIGNALED.store(true, Ordering::Release);
}

fn install_handlers() {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        let handler: extern "C" fn(libc::c_int) = on_term_signal;
        sa.sa_sigaction = handler as usize;
        libc::sigemptyset(&mut sa.sa_mask);
        sa.sa_flags = 0;
        for sig in TERM_SIGNALS {
            libc::sigaction(sig, &sa, ptr::null_mut());
        }
    }
}

/// Blocks until a termination signal has been delivered.
///
/// The flag check and the wait are made atomic by blocking the signals
/// first and re-opening them only inside `sigsuspend`; a signal that
/// arrived before the hold (for example during a long acquisition) makes
/// this return immediately.
fn wait_for_signal() {
    let mut held: libc::sigset_t = unsafe { std::mem::zeroed() };
    let mut prev: libc::sigset_t = unsafe { std::mem::zeroed() };
    unsafe {
        libc::sigemptyset(&mut held);
        for sig in TERM_SIGNALS {
            libc::sigaddset(&mut held, sig);
        }
        libc::sigprocmask(libc::SIG_BLOCK, &held, &mut prev);
        while !SIGNALED.load(Ordering::Acquire) {
            libc::sigsuspend(&prev);
        }
        libc::sigprocmask(libc::SIG_SETMASK, &prev, ptr::null_mut());
    }
    debug!("termination signal received, leaving the hold");
}

/// Blocks until one line of operator input, EOF, or a termination signal.
///
/// The read goes through raw `libc::read` so a delivered signal interrupts
/// it with EINTR; the cancellation flag then decides whether to keep
/// reading or to end the hold. A signal that arrived before the hold ends
/// it immediately, without touching stdin.
fn wait_for_enter() {
    println!("Press <Enter> to exit");
    let mut byte = 0u8;
    loop {
        if SIGNALED.load(Ordering::Acquire) {
            debug!("termination signal received, leaving the hold");
            return;
        }
        let n = unsafe {
            libc::read(
                libc::STDIN_FILENO,
                &mut byte as *mut u8 as *mut libc::c_void,
                1,
            )
        };
        match n {
            // EOF ends the hold like a consumed line
            0 => return,
            1 if byte == b'\n' => return,
            1 => continue,
            _ => {
                let interrupted = std::io::Error::last_os_error().kind()
                    == std::io::ErrorKind::Interrupted;
                if interrupted && !SIGNALED.load(Ordering::Acquire) {
                    continue;
                }
                return;
            }
        }
    }
}

/// Blocks the process between "memory filled" and "memory released".
///
/// The foreground flag is resolved once at construction and threaded into
/// the controller instead of living in process-global state.
pub struct HoldController {
    foreground: bool,
}

impl HoldController {
    /// Creates a controller with an explicit foreground flag.
    ///
    /// The termination signal handlers must already be installed; prefer
    /// [`HoldController::install`] outside of tests.
    pub fn new(foreground: bool) -> Self {
        HoldController { foreground }
    }

    /// Installs the termination signal handlers and detects whether the
    /// process runs in the foreground process group of its terminal.
    ///
    /// The handlers turn SIGINT, SIGTERM, and SIGHUP into a one-shot
    /// cancellation flag, so none of them can terminate the process before
    /// the release phase has run.
    pub fn install() -> Self {
        install_handlers();
        let foreground =
            unsafe { libc::getpgrp() == libc::tcgetpgrp(libc::STDOUT_FILENO) };
        debug!("running in the {}", if foreground { "foreground" } else { "background" });
        HoldController::new(foreground)
    }

    /// Blocks until the hold is over.
    ///
    /// In the foreground this waits for one line on stdin or for the
    /// cancellation flag, whichever comes first. In the background it
    /// waits for the cancellation flag alone. Returns exactly once per
    /// delivered signal burst, however often the signal is repeated.
    pub fn hold(&self) {
        if self.foreground {
            wait_for_enter();
        } else {
            wait_for_signal();
        }
    }
}

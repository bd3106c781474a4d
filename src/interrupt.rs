//! Ctrl-C ends gauthy normally: from a prompt or from the live display the
//! process prints a farewell and exits with status 0. Unix only; elsewhere
//! the platform default applies.

#[cfg(unix)]
mod imp {
    use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

    // reset colours, then say goodbye on a fresh line
    const GOODBYE: &[u8] = b"\x1B[0m\nGoodbye...\n";

    extern "C" fn on_interrupt(_signal: libc::c_int) {
        // only async-signal-safe calls in here
        unsafe {
            libc::write(
                libc::STDOUT_FILENO,
                GOODBYE.as_ptr().cast(),
                GOODBYE.len(),
            );
            libc::_exit(0);
        }
    }

    pub fn install() -> anyhow::Result<()> {
        let action = SigAction::new(
            SigHandler::Handler(on_interrupt),
            SaFlags::empty(),
            SigSet::empty(),
        );
        unsafe { sigaction(Signal::SIGINT, &action) }?;
        Ok(())
    }

}

#[cfg(not(unix))]
mod imp {
    // Ctrl-C keeps the platform default here
    pub fn install() -> anyhow::Result<()> {
        Ok(())
    }
}

pub use imp::install;

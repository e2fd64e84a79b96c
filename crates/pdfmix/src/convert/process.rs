//! Running external converters under a time allowance.

use std::io::Read;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{PdfMixError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run `command` to completion, killing it once `timeout` elapses.
///
/// Stdout and stderr are drained on helper threads while waiting so a
/// chatty child cannot block on a full pipe. On unix the child leads its
/// own process group, and whatever is left of that group is killed when
/// the child exits or times out, so helpers it started cannot outlive it.
///
/// # Errors
///
/// - [`PdfMixError::ProcessTimeout`] if the child outlives `timeout`
/// - [`PdfMixError::ProcessFailed`] if it exits unsuccessfully
/// - [`PdfMixError::Io`] if it cannot be spawned or waited on
pub fn run_with_timeout(command: &mut Command, timeout: Duration) -> Result<Output> {
    let program = command.get_program().to_string_lossy().into_owned();
    debug!(program = %program, args = ?command.get_args().collect::<Vec<_>>(), ?timeout, "spawning");

    #[cfg(unix)]
    command.process_group(0);

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let stdout_thread = drain(child.stdout.take());
    let stderr_thread = drain(child.stderr.take());

    let status = match wait_with_timeout(&mut child, timeout)? {
        Some(status) => status,
        None => {
            warn!(program = %program, ?timeout, "process timed out, killing");
            kill_tree(&mut child);
            let _ = child.wait();
            // Readers see EOF once the group is gone; they are not joined
            // in case something escaped the group and still holds a pipe.
            return Err(PdfMixError::ProcessTimeout { program, timeout });
        }
    };

    // Leftover group members would keep the pipes open.
    kill_group(&child);

    let stdout = collect(stdout_thread);
    let stderr = collect(stderr_thread);

    if !status.success() {
        return Err(PdfMixError::ProcessFailed {
            program,
            status: status.to_string(),
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        });
    }

    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() > timeout {
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Kill what is left of the child's process group.
#[cfg(unix)]
fn kill_group(child: &Child) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    if let Ok(pgid) = i32::try_from(child.id()) {
        match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => debug!(pgid, error = %e, "failed to kill process group"),
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

/// Kill a running child together with everything it started.
fn kill_tree(child: &mut Child) {
    kill_group(child);

    #[cfg(windows)]
    {
        let status = Command::new("taskkill")
            .args(["/T", "/F", "/PID", &child.id().to_string()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Err(e) = status {
            debug!(pid = child.id(), error = %e, "taskkill failed");
        }
    }

    let _ = child.kill();
}

fn drain<R: Read + Send + 'static>(reader: Option<R>) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut reader) = reader {
            let _ = reader.read_to_end(&mut buf);
        }
        buf
    })
}

fn collect(handle: JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}

// Copyright 2021 - 2025 Unleash Mutants Contributors

//! Manage a subprocess, with polling, timeouts, termination, and so on.
//!
//! This module is above the external `subprocess` crate, but has no
//! knowledge of whether it's running Cargo or potentially something else.
//!
//! On Unix, the subprocess runs as its own process group, so that any
//! grandchild processses are also signalled if it's interrupted.

use std::ffi::OsString;
use std::io::Read;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use camino::Utf8Path;
use subprocess::{Popen, PopenConfig, Redirection};
#[allow(unused_imports)]
use tracing::{debug, debug_span, error, info, span, trace, warn, Level};

use crate::interrupt::check_interrupted;
use crate::log_file::LogFile;
use crate::Result;

/// How long to wait for metadata-only Cargo commands.
const METADATA_TIMEOUT: Duration = Duration::from_secs(20);

pub struct Process {
    child: Popen,
    start: Instant,
    timeout: Duration,
}

impl Process {
    pub fn start(
        argv: &[String],
        env: &[(&str, &str)],
        cwd: &Utf8Path,
        timeout: Duration,
        log_file: &mut LogFile,
    ) -> Result<Process> {
        let start = Instant::now();
        log_file.message(&format!("run {}", argv.join(" ")));
        debug!("start {argv:?}");
        let mut os_env = PopenConfig::current_env();
        os_env.extend(
            env.iter()
                .map(|&(k, v)| (OsString::from(k), OsString::from(v))),
        );
        let child = Popen::create(
            argv,
            PopenConfig {
                stdin: Redirection::None,
                stdout: Redirection::File(log_file.open_append()?),
                stderr: Redirection::Merge,
                cwd: Some(cwd.as_os_str().to_owned()),
                env: Some(os_env),
                ..setpgid_on_unix()
            },
        )
        .with_context(|| format!("failed to spawn {}", argv.join(" ")))?;
        Ok(Process {
            child,
            start,
            timeout,
        })
    }

    pub fn poll(&mut self) -> Result<Option<ProcessStatus>> {
        let elapsed = self.start.elapsed();
        if elapsed > self.timeout {
            info!(
                "timeout after {:.1}s, terminating child process...",
                elapsed.as_secs_f32()
            );
            self.terminate()?;
            Ok(Some(ProcessStatus::Timeout))
        } else if let Err(e) = check_interrupted() {
            debug!("interrupted, terminating child process...");
            self.terminate()?;
            Err(e)
        } else if let Some(status) = self.child.poll() {
            Ok(Some(ProcessStatus::Exited(exit_code(&status))))
        } else {
            Ok(None)
        }
    }

    /// Terminate the subprocess, initially gently and then harshly.
    ///
    /// Blocks until the subprocess is terminated and then returns the exit status.
    ///
    /// The status might not be Timeout if this raced with a normal exit.
    fn terminate(&mut self) -> Result<()> {
        let _span = span!(Level::DEBUG, "terminate_child", pid = self.child.pid()).entered();
        debug!("terminating child process");
        terminate_child_impl(&mut self.child)?;
        trace!("wait for child after termination");
        if let Some(exit_status) = self
            .child
            .wait_timeout(Duration::from_secs(10))
            .context("wait for child after terminating pgroup")?
        {
            debug!("terminated child exit status {exit_status:?}");
        } else {
            warn!("child did not exit after termination");
            let kill_result = self.child.kill();
            warn!("force kill child: {:?}", kill_result);
            if kill_result.is_ok() {
                if let Ok(Some(exit_status)) = self
                    .child
                    .wait_timeout(Duration::from_secs(10))
                    .context("wait for child after force kill")
                {
                    debug!("force kill child exit status {exit_status:?}");
                } else {
                    warn!("child did not exit after force kill");
                }
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn terminate_child_impl(child: &mut Popen) -> Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};

    let pid = nix::unistd::Pid::from_raw(child.pid().expect("child has a pid").try_into().unwrap());
    if let Err(errno) = killpg(pid, Signal::SIGTERM) {
        // It might have already exited, in which case we can proceed to wait for it.
        if errno != Errno::ESRCH {
            let message = format!("failed to terminate child: {}", errno);
            warn!("{}", message);
            return Err(anyhow!(message));
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn terminate_child_impl(child: &mut Popen) -> Result<()> {
    if let Err(e) = child.terminate() {
        // most likely we raced and it's already gone
        let message = format!("failed to terminate child: {}", e);
        warn!("{}", message);
        return Err(anyhow!(message));
    }
    Ok(())
}

/// The result of running a single child process.
#[derive(Debug, PartialEq, Eq)]
pub enum ProcessStatus {
    /// The child ran to completion; carries its exit code (§4.5
    /// classification: `0` success, `1` test failure, `2` build failure,
    /// anything else an unexpected exit).
    Exited(i32),
    Timeout,
}

/// Reduce a [`subprocess::ExitStatus`] to a single integer exit code, the
/// same shape `cargo test` itself reports (§4.5).
fn exit_code(status: &subprocess::ExitStatus) -> i32 {
    use subprocess::ExitStatus::*;
    match *status {
        Exited(code) => code as i32,
        Signaled(signal) => -(signal as i32),
        Other(code) => code,
        Undetermined => -1,
    }
}

#[cfg(unix)]
fn setpgid_on_unix() -> PopenConfig {
    PopenConfig {
        setpgid: true,
        ..Default::default()
    }
}

#[cfg(not(unix))]
fn setpgid_on_unix() -> PopenConfig {
    Default::default()
}

#[cfg(all(test, unix))]
mod test {
    use super::*;
    use crate::log_file::LogFile;
    use std::thread::sleep as std_sleep;

    /// After a timeout kills the process group, the grandchild it spawned
    /// should be gone too — the process-tree invariant behind terminating
    /// with `killpg` rather than just the immediate child (§8 invariant 6).
    #[test]
    fn terminating_on_timeout_also_kills_the_grandchild() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let pidfile = root.join("grandchild.pid");
        let mut log_file = LogFile::create_in(root, "terminate-test").unwrap();

        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            format!("sleep 30 & echo $! > {pidfile}; wait"),
        ];
        let mut process = Process::start(&argv, &[], root, Duration::from_millis(200), &mut log_file).unwrap();

        let status = loop {
            if let Some(status) = process.poll().unwrap() {
                break status;
            }
            std_sleep(Duration::from_millis(20));
        };
        assert_eq!(status, ProcessStatus::Timeout);

        let grandchild_pid: i32 = std::fs::read_to_string(&pidfile).unwrap().trim().parse().unwrap();
        let still_alive = nix::sys::signal::kill(nix::unistd::Pid::from_raw(grandchild_pid), None).is_ok();
        assert!(!still_alive, "grandchild process should have been killed with the group");
    }

    #[test]
    fn exit_status_carries_the_exact_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();

        for code in [0, 1, 2, 7] {
            let mut log_file = LogFile::create_in(root, &format!("exit-{code}")).unwrap();
            let argv = vec!["sh".to_string(), "-c".to_string(), format!("exit {code}")];
            let mut process = Process::start(&argv, &[], root, Duration::from_secs(5), &mut log_file).unwrap();
            let status = loop {
                if let Some(status) = process.poll().unwrap() {
                    break status;
                }
                std_sleep(Duration::from_millis(10));
            };
            assert_eq!(status, ProcessStatus::Exited(code));
        }
    }
}

/// Run a command and return its stdout output as a string.
///
/// If the command exits non-zero, the error includes any messages it wrote to stderr.
///
/// The runtime is capped by [METADATA_TIMEOUT].
pub fn get_command_output(argv: &[&str], cwd: &Utf8Path) -> Result<String> {
    // TODO: Perhaps redirect to files so this doesn't jam if there's a lot of output.
    // For the commands we use this for today, which only produce small output, it's OK.
    let _span = debug_span!("get_command_output", argv = ?argv).entered();
    let mut child = Popen::create(
        argv,
        PopenConfig {
            stdin: Redirection::None,
            stdout: Redirection::Pipe,
            stderr: Redirection::Pipe,
            cwd: Some(cwd.as_os_str().to_owned()),
            ..Default::default()
        },
    )
    .with_context(|| format!("failed to spawn {argv:?}"))?;
    match child.wait_timeout(METADATA_TIMEOUT) {
        Err(e) => {
            let message = format!("failed to wait for {argv:?}: {e}");
            return Err(anyhow!(message));
        }
        Ok(None) => {
            let message = format!("{argv:?} timed out",);
            return Err(anyhow!(message));
        }
        Ok(Some(status)) if status.success() => {}
        Ok(Some(status)) => {
            let mut stderr = String::new();
            let _ = child
                .stderr
                .take()
                .expect("child has stderr")
                .read_to_string(&mut stderr);
            error!("child failed with status {status:?}: {stderr}");
            let message = format!("{argv:?} failed with status {status:?}: {stderr}");
            return Err(anyhow!(message));
        }
    }
    let mut stdout = String::new();
    child
        .stdout
        .take()
        .expect("child has stdout")
        .read_to_string(&mut stdout)
        .context("failed to read child stdout")?;
    debug!("output: {}", stdout.trim());
    Ok(stdout)
}

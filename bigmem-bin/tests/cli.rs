//! End-to-end tests driving the built `bigmem` binary.
//!
//! The binary's stdio is piped, so every run here detects itself as a
//! background instance and holds until a signal. Each test waits for the
//! completion banner before signaling, which guarantees the handlers are
//! installed and the hold is reachable.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};

fn bigmem() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_bigmem"));
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

/// Reads the child's stdout until `pattern` shows up (or EOF).
fn read_until(out: &mut impl Read, pattern: &str) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 256];
    loop {
        if String::from_utf8_lossy(&buf).contains(pattern) {
            break;
        }
        let n = out.read(&mut chunk).expect("read from child stdout");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn terminate(child: &Child) {
    unsafe { libc::kill(child.id() as libc::pid_t, libc::SIGTERM) };
}

/// True if the kernel IPC namespace still holds a segment created by `pid`.
fn sysv_segment_created_by(pid: u32) -> anyhow::Result<bool> {
    let shm = fs::read_to_string("/proc/sysvipc/shm")?;
    // columns: key shmid perms size cpid lpid ...
    Ok(shm.lines().skip(1).any(|line| {
        line.split_whitespace()
            .nth(4)
            .is_some_and(|cpid| cpid == pid.to_string())
    }))
}

#[test]
fn default_strategy_holds_and_releases_on_sigterm() -> anyhow::Result<()> {
    let mut child = bigmem().arg("8M").spawn()?;
    let mut stdout = child.stdout.take().expect("stdout piped");

    let head = read_until(&mut stdout, "Done");
    assert!(head.contains("Process PID:"));
    assert!(head.contains("Allocating 8 MiB of resident memory (in 1 MiB chunks)..."));

    // redelivery must not matter: the hold returns exactly once
    terminate(&child);
    terminate(&child);
    let status = child.wait()?;
    assert_eq!(status.code(), Some(0));
    Ok(())
}

#[test]
fn virtual_strategy_reports_virtual_memory() -> anyhow::Result<()> {
    let mut child = bigmem().args(["--virtual", "8M"]).spawn()?;
    let mut stdout = child.stdout.take().expect("stdout piped");

    let head = read_until(&mut stdout, "Done");
    assert!(head.contains("Allocating 8 MiB of virtual memory (in 1 MiB chunks)..."));

    terminate(&child);
    assert_eq!(child.wait()?.code(), Some(0));
    Ok(())
}

#[test]
fn block_strategy_releases_after_hold() -> anyhow::Result<()> {
    let mut child = bigmem().args(["-b", "2M"]).spawn()?;
    let mut stdout = child.stdout.take().expect("stdout piped");

    let head = read_until(&mut stdout, "Done");
    assert!(head.contains("Allocating 2 MiB of resident memory..."));

    terminate(&child);
    assert_eq!(child.wait()?.code(), Some(0));
    Ok(())
}

#[test]
fn shared_strategy_leaves_no_segments_behind() -> anyhow::Result<()> {
    let mut child = bigmem().args(["--shared", "4M"]).spawn()?;
    let pid = child.id();
    let mut stdout = child.stdout.take().expect("stdout piped");

    let head = read_until(&mut stdout, "Done");
    assert!(head.contains("Allocating 4 MiB of shared memory in 2 MiB segments..."));
    assert!(sysv_segment_created_by(pid)?, "segments missing during hold");

    terminate(&child);
    assert_eq!(child.wait()?.code(), Some(0));
    assert!(
        !sysv_segment_created_by(pid)?,
        "segments leaked past process exit"
    );
    Ok(())
}

#[test]
fn mmap_strategy_removes_backing_file() -> anyhow::Result<()> {
    let mount = std::env::temp_dir().join("bigmem-cli-mmap");
    fs::create_dir_all(&mount)?;
    let backing = mount.join("hugepagetest");

    let mut child = bigmem()
        .arg("--mmap")
        .arg(&mount)
        .arg("2M")
        .spawn()?;
    let mut stdout = child.stdout.take().expect("stdout piped");

    let head = read_until(&mut stdout, "Done");
    assert!(head.contains("by mapping the"));
    assert!(backing.exists(), "backing file missing during hold");

    terminate(&child);
    assert_eq!(child.wait()?.code(), Some(0));
    assert!(!backing.exists(), "backing file left behind");
    let _ = fs::remove_dir(&mount);
    Ok(())
}

#[test]
fn mmap_with_missing_mount_fails_without_leftovers() -> anyhow::Result<()> {
    let output = bigmem().args(["--mmap", "/no/such/dir", "1M"]).output()?;
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("/no/such/dir/hugepagetest"));
    assert!(!Path::new("/no/such/dir/hugepagetest").exists());
    Ok(())
}

#[test]
fn invalid_sizes_are_argument_errors() -> anyhow::Result<()> {
    for size in ["0", "-5", "10x"] {
        let output = bigmem().args(["--", size]).output()?;
        assert_eq!(output.status.code(), Some(1), "size {size:?}");
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(
            stderr.contains("Wrong allocation size provided"),
            "size {size:?}: {stderr}"
        );
    }
    Ok(())
}

#[test]
fn missing_size_prints_usage_and_fails() -> anyhow::Result<()> {
    let output = bigmem().output()?;
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Usage"));
    Ok(())
}

#[test]
fn unknown_option_fails() -> anyhow::Result<()> {
    let output = bigmem().args(["--frobnicate", "1M"]).output()?;
    assert_eq!(output.status.code(), Some(1));
    Ok(())
}

#[test]
fn help_and_version_exit_cleanly() -> anyhow::Result<()> {
    let help = bigmem().arg("--help").output()?;
    assert_eq!(help.status.code(), Some(0));
    let text = String::from_utf8_lossy(&help.stdout);
    assert!(text.contains("--hugepages"));
    assert!(text.contains("--transparent"));

    let version = bigmem().arg("-V").output()?;
    assert_eq!(version.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&version.stdout).contains("bigmem"));
    Ok(())
}

use std::collections::BTreeSet;
use std::io;
use std::process::Command;

use tracing::debug;

/// Check if a process is alive via `tasklist`.
pub fn process_alive(pid: u32) -> bool {
    let output = Command::new("tasklist")
        .arg("/FI")
        .arg(format!("PID eq {pid}"))
        .arg("/NH")
        .output();
    match output {
        Ok(out) => String::from_utf8_lossy(&out.stdout).contains(&pid.to_string()),
        Err(_) => false,
    }
}

/// Forcefully terminate a process and its tree via `taskkill`.
///
/// A missing target counts as success; the point of the kill is a free port.
pub fn kill_process(pid: u32) -> io::Result<()> {
    let output = Command::new("taskkill")
        .arg("/PID")
        .arg(pid.to_string())
        .arg("/T")
        .arg("/F")
        .output()?;

    if output.status.success() {
        debug!("pid={} terminated via taskkill", pid);
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.contains("not found") {
        return Ok(());
    }
    Err(io::Error::other(format!(
        "taskkill /PID {pid} failed: {}",
        stderr.trim()
    )))
}

/// No pre-exec setup is needed on Windows; `taskkill /T` handles the tree.
pub fn prepare_command(_cmd: &mut tokio::process::Command) {}

/// List the PIDs currently LISTENING on a TCP port, from `netstat -ano`.
pub fn list_port_pids(port: u16) -> io::Result<Vec<u32>> {
    let output = Command::new("netstat").arg("-ano").output()?;

    let needle = format!(":{port}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut pids = BTreeSet::new();
    for line in stdout.lines() {
        if !line.contains("LISTENING") {
            continue;
        }
        let mut cols = line.split_whitespace();
        // Proto, Local Address, Foreign Address, State, PID
        let local = match cols.nth(1) {
            Some(addr) => addr,
            None => continue,
        };
        if !local.ends_with(&needle) {
            continue;
        }
        if let Some(pid) = cols.last().and_then(|col| col.parse().ok()) {
            pids.insert(pid);
        }
    }
    Ok(pids.into_iter().collect())
}

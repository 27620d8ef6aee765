//! Flutter daemon process management

use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot};

use crate::framer::LineFramer;
use fbridge_core::events::DaemonEvent;
use fbridge_core::prelude::*;
use fbridge_core::DAEMON_OUTPUT_TARGET;

/// Size of a single stdout read
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Capacity of the stdin command channel
const STDIN_CHANNEL_CAPACITY: usize = 32;

/// Owns one `flutter daemon` child process.
///
/// The `Child` handle is moved into a dedicated `wait_for_exit` task so the
/// real exit code is captured and emitted as `DaemonEvent::Exited`. The
/// process keeps a kill channel for force-kill, an atomic flag for
/// synchronous `has_exited()` checks, and the stdin sender used to write
/// encoded protocol lines.
pub struct DaemonProcess {
    /// Sender for encoded protocol lines (each already ends in `\n`)
    stdin_tx: mpsc::Sender<String>,
    pid: Option<u32>,
    /// Kill request for the wait task; taken by `kill()` or `Drop`
    kill_tx: Option<oneshot::Sender<()>>,
    /// Flipped once the child is reaped, or when we kill it
    exited: Arc<AtomicBool>,
}

impl DaemonProcess {
    /// Spawn `<command> daemon [extra_args...]` in `working_dir`
    ///
    /// Stdout lines, stderr lines and the final exit are delivered on `event_tx`
    /// in the order they happen.
    pub fn spawn(
        command: &Path,
        extra_args: &[String],
        working_dir: &Path,
        event_tx: mpsc::Sender<DaemonEvent>,
    ) -> Result<Self> {
        if !working_dir.is_dir() {
            return Err(Error::WorkspaceNotFound);
        }

        let mut args = vec!["daemon".to_string()];
        args.extend(extra_args.iter().cloned());

        info!(
            "Spawning daemon: {} {} (cwd: {})",
            command.display(),
            args.join(" "),
            working_dir.display()
        );

        let mut child = Command::new(command)
            .args(&args)
            .current_dir(working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::FlutterNotFound
                } else {
                    Error::spawn(e.to_string())
                }
            })?;

        let pid = child.id();
        info!("Daemon process started with PID: {:?}", pid);

        let (stdin, stdout, stderr) = match (child.stdin.take(), child.stdout.take(), child.stderr.take()) {
            (Some(stdin), Some(stdout), Some(stderr)) => (stdin, stdout, stderr),
            _ => return Err(Error::spawn("daemon stdio pipes were not captured")),
        };

        Ok(Self::wire(child, stdin, stdout, stderr, pid, event_tx))
    }

    /// Start the reader/writer/wait tasks around an already spawned child
    fn wire(
        child: Child,
        stdin: ChildStdin,
        stdout: ChildStdout,
        stderr: ChildStderr,
        pid: Option<u32>,
        event_tx: mpsc::Sender<DaemonEvent>,
    ) -> Self {
        let (stdin_tx, stdin_rx) = mpsc::channel::<String>(STDIN_CHANNEL_CAPACITY);
        tokio::spawn(Self::stdin_writer(stdin, stdin_rx));

        // Both readers must finish before the exit event goes out, otherwise
        // trailing output could arrive after `Exited`.
        let stdout_task = tokio::spawn(Self::stdout_reader(stdout, event_tx.clone()));
        let stderr_task = tokio::spawn(Self::stderr_reader(stderr, event_tx.clone()));

        let exited = Arc::new(AtomicBool::new(false));
        let (kill_tx, kill_rx) = oneshot::channel::<()>();

        let exited_flag = Arc::clone(&exited);
        tokio::spawn(async move {
            let code = Self::wait_for_exit(child, kill_rx).await;
            exited_flag.store(true, Ordering::Release);
            let _ = stdout_task.await;
            let _ = stderr_task.await;
            debug!("Sending DaemonEvent::Exited {{ code: {:?} }}", code);
            let _ = event_tx.send(DaemonEvent::Exited { code }).await;
        });

        Self {
            stdin_tx,
            pid,
            kill_tx: Some(kill_tx),
            exited,
        }
    }

    /// Background task: owns `child`, waits for it to exit.
    ///
    /// Reap the child, killing it first if `kill_rx` fires
    ///
    /// `None` when the exit status has no code (signal) or could not be read.
    async fn wait_for_exit(mut child: Child, kill_rx: oneshot::Receiver<()>) -> Option<i32> {
        tokio::select! {
            result = child.wait() => {
                match result {
                    Ok(status) => {
                        info!("Daemon process exited with status: {:?}", status);
                        status.code()
                    }
                    Err(e) => {
                        error!("Error waiting for daemon process: {}", e);
                        None
                    }
                }
            }
            _ = kill_rx => {
                info!("Kill signal received, killing daemon process");
                if let Err(e) = child.kill().await {
                    error!("Failed to kill daemon process: {}", e);
                }
                match child.wait().await {
                    Ok(status) => {
                        info!("Daemon process killed, exit status: {:?}", status);
                        status.code()
                    }
                    Err(e) => {
                        error!("Error waiting after kill: {}", e);
                        None
                    }
                }
            }
        }
    }

    /// Read raw stdout chunks, frame them into lines and forward each line.
    async fn stdout_reader(mut stdout: ChildStdout, tx: mpsc::Sender<DaemonEvent>) {
        let mut framer = LineFramer::new();
        let mut buf = vec![0u8; READ_CHUNK_SIZE];

        loop {
            let n = match stdout.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    warn!("Failed to read daemon stdout: {}", e);
                    break;
                }
            };

            for line in framer.push(&buf[..n]) {
                trace!("stdout: {}", line);
                if tx.send(DaemonEvent::Stdout(line)).await.is_err() {
                    debug!("stdout channel closed");
                    return;
                }
            }
        }

        if let Some(rest) = framer.finish() {
            let _ = tx.send(DaemonEvent::Stdout(rest)).await;
        }
        debug!("stdout reader finished");
    }

    /// Read lines from stderr and forward them
    async fn stderr_reader(stderr: ChildStderr, tx: mpsc::Sender<DaemonEvent>) {
        let mut reader = BufReader::new(stderr).lines();

        while let Ok(Some(line)) = reader.next_line().await {
            trace!(target: DAEMON_OUTPUT_TARGET, "stderr: {}", line);

            if tx.send(DaemonEvent::Stderr(line)).await.is_err() {
                debug!("stderr channel closed");
                break;
            }
        }

        debug!("stderr reader finished");
    }

    /// Write encoded lines to stdin
    async fn stdin_writer(mut stdin: ChildStdin, mut rx: mpsc::Receiver<String>) {
        while let Some(line) = rx.recv().await {
            debug!("Sending to daemon: {}", line.trim_end());

            if let Err(e) = stdin.write_all(line.as_bytes()).await {
                error!("Failed to write to stdin: {}", e);
                break;
            }
            if let Err(e) = stdin.flush().await {
                error!("Failed to flush stdin: {}", e);
                break;
            }
        }

        debug!("stdin writer finished");
    }

    /// Queue an encoded protocol line for the daemon's stdin
    pub async fn write(&self, line: String) -> Result<()> {
        self.stdin_tx
            .send(line)
            .await
            .map_err(|_| Error::channel_send("daemon stdin closed"))
    }

    /// Get a sender for the stdin channel
    pub fn stdin_sender(&self) -> mpsc::Sender<String> {
        self.stdin_tx.clone()
    }

    /// Whether stdin still accepts writes
    pub fn is_writable(&self) -> bool {
        !self.has_exited() && !self.stdin_tx.is_closed()
    }

    /// Ask the wait task to kill the process.
    ///
    /// Safe to call more than once; only the first call sends the signal.
    pub fn kill(&mut self) {
        match self.kill_tx.take() {
            Some(tx) => {
                info!("Killing daemon process {:?}", self.pid);
                // The wait task may have already exited naturally.
                let _ = tx.send(());
            }
            None => debug!("Daemon process {:?} already signalled", self.pid),
        }
        self.exited.store(true, Ordering::Release);
    }

    /// Check if the process has already exited (or was killed)
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    /// Check if the process is still running
    pub fn is_running(&self) -> bool {
        !self.has_exited()
    }

    /// Get the process ID
    pub fn id(&self) -> Option<u32> {
        self.pid
    }

    /// A process with no child behind it, writing into `stdin_tx`
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn detached(stdin_tx: mpsc::Sender<String>) -> Self {
        Self {
            stdin_tx,
            pid: None,
            kill_tx: None,
            exited: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Drop for DaemonProcess {
    fn drop(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            warn!("DaemonProcess dropped while process may still be running");
            let _ = tx.send(());
        }
        // kill_on_drop(true) on the Child is the final safety net.
        debug!("DaemonProcess dropped");
    }
}

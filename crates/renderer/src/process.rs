//! Supervision of a locally spawned renderer process.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Renderer command is empty")]
    EmptyCommand,

    #[error("Failed to spawn renderer: {0}")]
    Spawn(std::io::Error),

    #[error("Renderer exited during startup with {0}")]
    Exited(ExitStatus),

    #[error("Renderer did not create {} within {timeout:?}", socket.display())]
    StartupTimeout { socket: PathBuf, timeout: Duration },

    #[error("Renderer I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ProcessConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; a `fonts` directory is created inside it.
    pub working_dir: PathBuf,
    pub socket_path: PathBuf,
    pub startup_timeout: Duration,
}

impl ProcessConfig {
    /// Split a whitespace-separated command line such as `node build/index.js`.
    pub fn from_command_line(
        command: &str,
        working_dir: impl Into<PathBuf>,
        socket_path: impl Into<PathBuf>,
        startup_timeout: Duration,
    ) -> Result<Self, ProcessError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(ProcessError::EmptyCommand)?;
        Ok(Self {
            program,
            args: parts.collect(),
            working_dir: working_dir.into(),
            socket_path: socket_path.into(),
            startup_timeout,
        })
    }
}

/// A running renderer. Dropping it kills the child.
#[derive(Debug)]
pub struct RendererProcess {
    child: Child,
    socket_path: PathBuf,
    log_tasks: Vec<JoinHandle<()>>,
}

impl RendererProcess {
    /// Spawn the renderer and wait until its socket appears.
    pub async fn spawn(config: &ProcessConfig) -> Result<Self, ProcessError> {
        remove_socket(&config.socket_path).await?;
        tokio::fs::create_dir_all(config.working_dir.join("fonts")).await?;

        let mut child = Command::new(&config.program)
            .args(&config.args)
            .current_dir(&config.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ProcessError::Spawn)?;

        let mut log_tasks = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            log_tasks.push(tokio::spawn(forward_output(stdout, OutputStream::Stdout)));
        }
        if let Some(stderr) = child.stderr.take() {
            log_tasks.push(tokio::spawn(forward_output(stderr, OutputStream::Stderr)));
        }

        let mut process = Self {
            child,
            socket_path: config.socket_path.clone(),
            log_tasks,
        };
        process.wait_ready(config.startup_timeout).await?;

        tracing::info!(
            pid = process.id(),
            program = %config.program,
            socket = %config.socket_path.display(),
            "Renderer started",
        );
        Ok(process)
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// `Some` once the renderer has exited.
    pub fn try_status(&mut self) -> Result<Option<ExitStatus>, ProcessError> {
        Ok(self.child.try_wait()?)
    }

    /// Kill the renderer, reap it and remove its socket.
    pub async fn shutdown(mut self) -> Result<(), ProcessError> {
        if self.child.try_wait()?.is_none() {
            self.child.start_kill()?;
        }
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.child.wait()).await {
            Ok(status) => {
                let status = status?;
                tracing::info!(%status, "Renderer stopped");
            }
            Err(_) => {
                tracing::warn!(timeout = ?SHUTDOWN_TIMEOUT, "Renderer did not exit after kill");
            }
        }

        for task in self.log_tasks.drain(..) {
            task.abort();
        }
        remove_socket(&self.socket_path).await
    }

    async fn wait_ready(&mut self, timeout: Duration) -> Result<(), ProcessError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Err(ProcessError::Exited(status));
            }
            if tokio::fs::try_exists(&self.socket_path).await.unwrap_or(false) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ProcessError::StartupTimeout {
                    socket: self.socket_path.clone(),
                    timeout,
                });
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }
}

async fn remove_socket(path: &Path) -> Result<(), ProcessError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Clone, Copy)]
enum OutputStream {
    Stdout,
    Stderr,
}

async fn forward_output<R>(reader: R, stream: OutputStream)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match stream {
            OutputStream::Stdout => tracing::info!(target: "layerhub::renderer", "{line}"),
            OutputStream::Stderr => tracing::error!(target: "layerhub::renderer", "{line}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn shell(script: &str, dir: &Path, socket: &Path, timeout: Duration) -> ProcessConfig {
        ProcessConfig {
            program: "sh".into(),
            args: vec![
                "-c".into(),
                script.into(),
                socket.to_string_lossy().into_owned(),
            ],
            working_dir: dir.to_path_buf(),
            socket_path: socket.to_path_buf(),
            startup_timeout: timeout,
        }
    }

    #[test]
    fn command_line_is_split_on_whitespace() {
        let config = ProcessConfig::from_command_line(
            "node  build/index.js --quiet",
            "./renderer",
            "/tmp/rendererSocket",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(config.program, "node");
        assert_eq!(config.args, vec!["build/index.js", "--quiet"]);
        assert_eq!(config.working_dir, PathBuf::from("./renderer"));
    }

    #[test]
    fn blank_command_line_is_rejected() {
        let result = ProcessConfig::from_command_line(
            "   ",
            ".",
            "/tmp/rendererSocket",
            Duration::from_secs(5),
        );
        assert_matches!(result, Err(ProcessError::EmptyCommand));
    }

    #[tokio::test]
    async fn spawn_waits_for_socket_and_shutdown_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("renderer.sock");
        // Left over from a previous run; must not count as ready.
        std::fs::write(&socket, b"stale").unwrap();

        let config = shell(
            r#"sleep 0.3; echo listening; touch "$0"; sleep 30"#,
            dir.path(),
            &socket,
            Duration::from_secs(5),
        );
        let mut process = RendererProcess::spawn(&config).await.unwrap();

        assert!(process.id().is_some());
        assert!(process.try_status().unwrap().is_none());
        assert!(dir.path().join("fonts").is_dir());
        assert!(std::fs::read(&socket).unwrap().is_empty());

        process.shutdown().await.unwrap();
        assert!(!socket.exists());
    }

    #[tokio::test]
    async fn exit_during_startup_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("renderer.sock");
        let config = shell("echo boom >&2; exit 3", dir.path(), &socket, Duration::from_secs(5));

        let result = RendererProcess::spawn(&config).await;
        assert_matches!(result, Err(ProcessError::Exited(status)) if status.code() == Some(3));
    }

    #[tokio::test]
    async fn missing_socket_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("renderer.sock");
        let config = shell("sleep 30", dir.path(), &socket, Duration::from_millis(300));

        let result = RendererProcess::spawn(&config).await;
        assert_matches!(result, Err(ProcessError::StartupTimeout { .. }));
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProcessConfig {
            program: "/nonexistent/layerhub-renderer".into(),
            args: Vec::new(),
            working_dir: dir.path().to_path_buf(),
            socket_path: dir.path().join("renderer.sock"),
            startup_timeout: Duration::from_secs(1),
        };

        let result = RendererProcess::spawn(&config).await;
        assert_matches!(result, Err(ProcessError::Spawn(_)));
    }
}

//! Parent-side handle for a single-use render worker.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, Command};

use crate::error::RenderError;
use crate::protocol::{self, RenderRequest, WorkerMessage};

/// Subcommand of the `strata` binary that runs the worker side of the protocol.
pub const WORKER_SUBCOMMAND: &str = "render-worker";

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique worker identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorkerId(u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a worker. A worker never leaves `Done` or `Errored`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    /// Started, ready message not yet seen.
    Spawned,
    /// Waiting for its single request.
    Ready,
    /// Request sent, waiting for the reply.
    Rendering,
    /// Result received.
    Done,
    /// Exited, disconnected, or reported an error.
    Errored,
}

type BoxReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// One render worker, seen from the parent.
///
/// Dropping a worker kills its process (if any).
pub struct Worker {
    id: WorkerId,
    state: WorkerState,
    reader: Lines<BufReader<BoxReader>>,
    writer: BoxWriter,
    child: Option<Child>,
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Worker {
    /// Wrap the two ends of a worker connection.
    ///
    /// `reader` carries worker messages, `writer` carries the request.
    pub fn new(
        reader: impl AsyncRead + Send + Unpin + 'static,
        writer: impl AsyncWrite + Send + Unpin + 'static,
    ) -> Self {
        let reader: BoxReader = Box::new(reader);
        Self {
            id: WorkerId(NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed)),
            state: WorkerState::Spawned,
            reader: BufReader::new(reader).lines(),
            writer: Box::new(writer),
            child: None,
        }
    }

    /// Attach the child process backing this worker.
    #[must_use]
    pub fn with_child(mut self, child: Child) -> Self {
        self.child = Some(child);
        self
    }

    /// Worker identity.
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Wait until the worker announces it is ready.
    ///
    /// Returns immediately if the handshake already happened.
    ///
    /// # Errors
    ///
    /// Fails if the worker exits, disconnects, or reports an error first.
    pub async fn wait_ready(&mut self) -> Result<(), RenderError> {
        match self.state {
            WorkerState::Ready => return Ok(()),
            WorkerState::Spawned => {}
            state => return Err(self.protocol_error(format!("cannot wait for ready in {state:?}"))),
        }

        match self.next_message().await {
            Ok(WorkerMessage::Ready) => {
                self.state = WorkerState::Ready;
                Ok(())
            }
            Ok(WorkerMessage::Error { error }) => self.fail(RenderError::Failed(error)),
            Ok(WorkerMessage::Result { .. }) => {
                let err = self.protocol_error("result received before any request".to_owned());
                self.fail(err)
            }
            Err(err) => self.fail(err),
        }
    }

    /// Send the worker its one request and wait for the reply.
    ///
    /// # Errors
    ///
    /// Fails if the worker is not ready, reports an error, or goes away
    /// before replying.
    pub async fn render(&mut self, request: &RenderRequest) -> Result<String, RenderError> {
        if self.state != WorkerState::Ready {
            return Err(self.protocol_error(format!("cannot render in {:?}", self.state)));
        }

        let line = protocol::encode(request)
            .map_err(|e| self.protocol_error(format!("cannot encode request: {e}")))?;
        self.state = WorkerState::Rendering;
        if let Err(err) = self.send(&line).await {
            return self.fail(err);
        }

        match self.next_message().await {
            Ok(WorkerMessage::Result { result }) => {
                self.state = WorkerState::Done;
                Ok(result)
            }
            Ok(WorkerMessage::Error { error }) => self.fail(RenderError::Failed(error)),
            Ok(WorkerMessage::Ready) => {
                let err = self.protocol_error("duplicate ready message".to_owned());
                self.fail(err)
            }
            Err(err) => self.fail(err),
        }
    }

    async fn send(&mut self, line: &str) -> Result<(), RenderError> {
        let sent = async {
            self.writer.write_all(line.as_bytes()).await?;
            self.writer.flush().await
        }
        .await;

        match sent {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                Err(RenderError::WorkerExited { id: self.id })
            }
            Err(e) => Err(RenderError::Io(e)),
        }
    }

    async fn next_message(&mut self) -> Result<WorkerMessage, RenderError> {
        loop {
            let Some(line) = self.reader.next_line().await? else {
                return Err(RenderError::WorkerExited { id: self.id });
            };
            if line.trim().is_empty() {
                continue;
            }
            return protocol::decode(&line)
                .map_err(|e| self.protocol_error(format!("malformed message: {e}")));
        }
    }

    fn protocol_error(&self, message: String) -> RenderError {
        RenderError::Protocol {
            id: self.id,
            message,
        }
    }

    fn fail<T>(&mut self, err: RenderError) -> Result<T, RenderError> {
        self.state = WorkerState::Errored;
        if let Some(status) = self.child.as_mut().and_then(|c| c.try_wait().ok().flatten()) {
            tracing::debug!(worker = %self.id, %status, "render worker exited");
        }
        Err(err)
    }
}

/// Starts fresh workers for a [`RenderPool`](crate::RenderPool).
pub trait Launch: Send + Sync {
    /// Start one worker. The worker has not necessarily finished starting.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Spawn`] if the worker cannot be started.
    fn launch(&self) -> Result<Worker, RenderError>;
}

/// Launches workers as child processes speaking the protocol over stdio.
#[derive(Clone, Debug)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ProcessLauncher {
    /// Launch `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Launch `program render-worker`, the worker mode of the strata binary.
    #[must_use]
    pub fn strata(program: impl Into<PathBuf>) -> Self {
        Self::new(program).arg(WORKER_SUBCOMMAND)
    }

    /// Launch the running executable in worker mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the current executable path is unavailable.
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::strata(std::env::current_exe()?))
    }
}

impl Launch for ProcessLauncher {
    fn launch(&self) -> Result<Worker, RenderError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(RenderError::Spawn)?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(RenderError::Spawn(std::io::Error::other(
                "worker stdio was not captured",
            )));
        };

        let worker = Worker::new(stdout, stdin).with_child(child);
        tracing::debug!(worker = %worker.id(), program = %self.program.display(), "launched render worker");
        Ok(worker)
    }
}

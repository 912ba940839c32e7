//! Stream session orchestration.
//!
//! A [`StreamSession`] owns one streaming HTTP exchange end-to-end: the
//! byte source, the incremental decoder state and the line buffer. The
//! read loop is the only writer of that state. Sessions run fully
//! independently of each other; cancelling one never touches another.
//!
//! Lifecycle: `Idle → Streaming → {Completed, Failed, Cancelled}`. A
//! non-success HTTP status fails the session before the loop ever starts;
//! end-of-stream without a terminal event is a benign close.

use std::future::Future;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::client::ClientError;
use crate::decode::{LineBuffer, Utf8Decoder};
use crate::dispatch::{Dispatch, Flow};
use crate::sse::Frame;

/// Byte-chunk source backing a stream session.
///
/// The session owns its source exclusively and releases it on every
/// terminal transition. Implemented for chunked HTTP bodies; tests script
/// their own sources.
#[async_trait]
pub trait ByteSource: Send {
    /// Read the next chunk, `None` at end-of-stream.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, ClientError>;
}

/// Chunked HTTP response body as a [`ByteSource`].
pub struct HttpSource {
    inner: BoxStream<'static, reqwest::Result<Bytes>>,
}

impl HttpSource {
    pub fn new(response: reqwest::Response) -> Self {
        Self {
            inner: response.bytes_stream().boxed(),
        }
    }
}

#[async_trait]
impl ByteSource for HttpSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, ClientError> {
        match self.inner.next().await {
            Some(Ok(bytes)) => Ok(Some(bytes)),
            Some(Err(err)) => Err(ClientError::Http(err)),
            None => Ok(None),
        }
    }
}

/// Terminal state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Completed,
    Failed,
    Cancelled,
}

enum Step {
    Chunk(Bytes),
    Eos,
    Cancelled,
    Failed(ClientError),
}

/// One in-flight streaming exchange and its decode state.
struct StreamSession<S> {
    source: S,
    decoder: Utf8Decoder,
    lines: LineBuffer,
}

impl<S: ByteSource> StreamSession<S> {
    fn new(source: S) -> Self {
        Self {
            source,
            decoder: Utf8Decoder::new(),
            lines: LineBuffer::new(),
        }
    }

    /// Drive the read loop to a terminal state.
    ///
    /// Every complete line is drained and dispatched before the next chunk
    /// is requested. Cancellation is checked first at each suspension
    /// point, so no callback fires for chunks arriving after `cancel()`.
    async fn run<D: Dispatch>(
        mut self,
        dispatcher: &mut D,
        cancel: &mut Option<oneshot::Receiver<()>>,
    ) -> SessionEnd {
        loop {
            match self.step(cancel).await {
                Step::Chunk(chunk) => {
                    let text = self.decoder.decode(&chunk);
                    if self.feed(dispatcher, &text) == Flow::Finished {
                        return SessionEnd::Completed;
                    }
                }
                Step::Eos => {
                    let text = self.decoder.finish();
                    if self.feed(dispatcher, &text) == Flow::Continue {
                        // The server may close without terminating the
                        // final line.
                        if let Some(rest) = self.lines.take_rest() {
                            dispatch_line(dispatcher, &rest);
                        }
                    }
                    return SessionEnd::Completed;
                }
                Step::Cancelled => return SessionEnd::Cancelled,
                Step::Failed(err) => {
                    dispatcher.fail(err);
                    return SessionEnd::Failed;
                }
            }
        }
    }

    async fn step(&mut self, cancel: &mut Option<oneshot::Receiver<()>>) -> Step {
        loop {
            let Some(rx) = cancel.as_mut() else {
                return step_of(self.source.next_chunk().await);
            };

            tokio::select! {
                biased;
                res = rx => {
                    if res.is_ok() {
                        return Step::Cancelled;
                    }
                    // Handle dropped without cancelling; the session
                    // keeps streaming.
                    *cancel = None;
                }
                next = self.source.next_chunk() => return step_of(next),
            }
        }
    }

    fn feed<D: Dispatch>(&mut self, dispatcher: &mut D, text: &str) -> Flow {
        for line in self.lines.push(text) {
            if dispatch_line(dispatcher, &line) == Flow::Finished {
                // Lines already drained behind a terminal event are
                // dropped, not re-delivered.
                return Flow::Finished;
            }
        }
        Flow::Continue
    }
}

fn step_of(next: Result<Option<Bytes>, ClientError>) -> Step {
    match next {
        Ok(Some(chunk)) => Step::Chunk(chunk),
        Ok(None) => Step::Eos,
        Err(err) => Step::Failed(err),
    }
}

fn dispatch_line<D: Dispatch>(dispatcher: &mut D, line: &str) -> Flow {
    match Frame::parse(line) {
        Some(frame) => dispatcher.dispatch(frame.payload),
        None => Flow::Continue,
    }
}

/// Connect, stream and settle one session.
///
/// A connect failure (request error or non-success status) fails the
/// session without ever entering the read loop.
pub(crate) async fn drive<S, D>(
    connect: impl Future<Output = Result<S, ClientError>>,
    mut dispatcher: D,
    mut cancel: Option<oneshot::Receiver<()>>,
) -> Result<Option<Value>, ClientError>
where
    S: ByteSource,
    D: Dispatch,
{
    let source = match connect.await {
        Ok(source) => source,
        Err(err) => {
            dispatcher.fail(err);
            return dispatcher.finish();
        }
    };

    let session = StreamSession::new(source);
    let end = session.run(&mut dispatcher, &mut cancel).await;
    debug!(?end, "stream session ended");

    match end {
        SessionEnd::Cancelled => Err(ClientError::StreamCancelled),
        SessionEnd::Completed | SessionEnd::Failed => dispatcher.finish(),
    }
}

/// Spawn a session as a background task and hand back its cancellation
/// handle.
pub(crate) fn spawn_session<S, D>(
    connect: impl Future<Output = Result<S, ClientError>> + Send + 'static,
    dispatcher: D,
) -> SessionHandle
where
    S: ByteSource + 'static,
    D: Dispatch + 'static,
{
    let (cancel_tx, cancel_rx) = oneshot::channel();
    let task = tokio::spawn(async move {
        let _ = drive(connect, dispatcher, Some(cancel_rx)).await;
    });

    SessionHandle {
        cancel: Some(cancel_tx),
        task,
    }
}

/// Handle to a long-running multi-callback stream session.
///
/// Dropping the handle leaves the session running to completion;
/// [`SessionHandle::cancel`] is the sole cancellation primitive.
pub struct SessionHandle {
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Tear the session down. Safe to call at any time from outside the
    /// read loop; no callback fires afterwards.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
    }

    /// Whether the session has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session task to end.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

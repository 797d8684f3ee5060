// ── Row streams ──
//
// Long-running commands (`listen`, `print follow`, `monitor`) deliver rows
// until stopped. Packets are normalized exactly like `print` replies.
// Stopping is always explicit through the handle.

mod handle;

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tikly_api::{PacketStream, RawRow};
use tracing::debug;

pub use handle::StreamHandle;

use crate::convert::CaseConvention;
use crate::error::CoreError;
use crate::model::{MenuPath, Row};
use crate::normalize::normalize;
use crate::query::Query;

/// Normalized rows from a streamed command.
///
/// Implements [`Stream`]. Pausing through the handle holds back
/// [`next_row`](Self::next_row) and callbacks; a caller polling the
/// `Stream` directly decides its own pace.
pub struct RowStream {
    packets: PacketStream,
    menu: MenuPath,
    case: CaseConvention,
    handle: StreamHandle,
}

impl RowStream {
    fn new(packets: PacketStream, menu: MenuPath, case: CaseConvention) -> Self {
        let handle = StreamHandle::new(packets.cancel_token());
        Self {
            packets,
            menu,
            case,
            handle,
        }
    }

    /// Next row, waiting while paused. `None` once stopped or finished.
    pub async fn next_row(&mut self) -> Option<Result<Row, CoreError>> {
        if !self.handle.wait_resumed().await {
            return None;
        }
        let packet = self.packets.next_packet().await?;
        Some(self.convert(packet))
    }

    /// Handle for pausing or stopping from elsewhere.
    pub fn handle(&self) -> StreamHandle {
        self.handle.clone()
    }

    pub fn stop(&mut self) {
        self.handle.stop();
        self.packets.stop();
    }

    fn convert(&self, packet: Result<RawRow, tikly_api::Error>) -> Result<Row, CoreError> {
        match packet {
            Ok(raw) => Ok(normalize(std::slice::from_ref(&raw), &self.menu, self.case)
                .into_iter()
                .next()
                .unwrap_or_else(|| Row::new(self.menu.clone()))),
            Err(err) => {
                debug!(menu = %self.menu, error = %err, "stream error");
                Err(err.into())
            }
        }
    }
}

impl Stream for RowStream {
    type Item = Result<Row, CoreError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.packets.poll_packet(cx) {
            Poll::Ready(Some(packet)) => Poll::Ready(Some(self.convert(packet))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Query {
    /// Start `action` as a stream, e.g. `"listen"` or `"print"` with a
    /// `follow` option.
    pub fn stream(mut self, action: &str) -> Result<RowStream, CoreError> {
        self.check()?;
        let sentence = self.pending.full_query(self.menu.path(), action);
        debug!(menu = %self.menu.path(), action, "starting stream");
        let packets = self.menu.transport().stream(sentence)?;
        Ok(RowStream::new(packets, self.menu.path().clone(), self.menu.case()))
    }

    /// Start `action` and feed every row to `callback` on a spawned task.
    ///
    /// An error is delivered once and ends the stream. Must be called from
    /// within a Tokio runtime.
    pub fn stream_with<F>(self, action: &str, mut callback: F) -> Result<StreamHandle, CoreError>
    where
        F: FnMut(Result<Row, CoreError>, &StreamHandle) + Send + 'static,
    {
        let mut rows = self.stream(action)?;
        let handle = rows.handle();
        let task_handle = handle.clone();
        tokio::spawn(async move {
            while let Some(item) = rows.next_row().await {
                let failed = item.is_err();
                callback(item, &task_handle);
                if failed {
                    rows.stop();
                    break;
                }
            }
            debug!(menu = %rows.menu, "stream ended");
        });
        Ok(handle)
    }
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::Utc;

use crate::attendance_fetch::{AttendanceSource, FetchError};
use crate::model::Snapshot;
use crate::normalize::normalize;
use crate::state::{Delta, ProviderCommand};

/// Runs refresh commands off the UI thread.
///
/// Each refresh gets its own worker so a hung request never blocks a newer
/// one. A worker whose request has been superseded by the time it finishes
/// drops its result instead of reporting it. The thread exits once the
/// command sender is dropped.
pub fn spawn_provider(
    source: Arc<dyn AttendanceSource>,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let latest = Arc::new(AtomicU64::new(0));

        for cmd in cmd_rx {
            match cmd {
                ProviderCommand::Refresh { request_id } => {
                    latest.fetch_max(request_id, Ordering::SeqCst);

                    let source = source.clone();
                    let tx = tx.clone();
                    let latest = latest.clone();
                    thread::spawn(move || {
                        let result = fetch_snapshot(source.as_ref());
                        if latest.load(Ordering::SeqCst) != request_id {
                            tracing::debug!(request_id, "dropping superseded attendance result");
                            let _ = tx.send(Delta::Log(format!(
                                "[INFO] Discarded superseded response #{request_id}"
                            )));
                            return;
                        }
                        let _ = tx.send(Delta::FetchFinished { request_id, result });
                    });
                }
            }
        }
    })
}

/// Remote fetch followed by normalization, stamped with the capture time.
pub fn fetch_snapshot(source: &dyn AttendanceSource) -> Result<Snapshot, FetchError> {
    let raw = source.fetch()?;
    let dataset = normalize(&raw)?;
    Ok(Snapshot {
        dataset,
        captured_at: Utc::now(),
    })
}

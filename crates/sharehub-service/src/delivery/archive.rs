//! Streaming ZIP assembly.
//!
//! A producer task reads each blob chunk by chunk into a `ZipWriter` whose
//! sink is a shared buffer. After every chunk the buffer is drained into a
//! bounded channel, and the receiving half becomes the response body. The
//! whole archive is never held in memory, and a closed channel (client
//! went away) stops the producer before its next blob read.

use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use sharehub_core::traits::storage::{ByteStream, StorageProvider};
use sharehub_entity::file::File;

type Chunk = Result<Bytes, io::Error>;

/// One file to be placed in an archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Path inside the archive, `/`-separated.
    pub name: String,
    /// The file whose blob is copied.
    pub file: File,
}

/// Start producing an archive of `entries` and return its byte stream.
pub fn spawn_archive(
    storage: Arc<dyn StorageProvider>,
    entries: Vec<ArchiveEntry>,
    channel_capacity: usize,
) -> ByteStream {
    let (tx, rx) = mpsc::channel::<Chunk>(channel_capacity.max(1));
    tokio::spawn(produce(storage, entries, tx));

    Box::pin(futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    }))
}

/// What a producer run put into its archive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ArchiveSummary {
    /// Entries copied in full.
    pub written: usize,
    /// Entries cut short by a read error partway through.
    pub truncated: usize,
    /// Entries left out because their blob could not be opened.
    pub skipped: usize,
}

pub(crate) async fn produce(
    storage: Arc<dyn StorageProvider>,
    entries: Vec<ArchiveEntry>,
    tx: mpsc::Sender<Chunk>,
) -> ArchiveSummary {
    let sink = SharedBuffer::default();
    let mut writer = ZipWriter::new_stream(sink.clone());
    let mut names = EntryNames::default();
    let mut summary = ArchiveSummary::default();

    for entry in entries {
        if tx.is_closed() {
            debug!("Archive consumer disconnected");
            return summary;
        }

        let mut blob = match storage.read(&entry.file.storage_key).await {
            Ok(blob) => blob,
            Err(e) => {
                warn!(file_id = %entry.file.id, error = %e, "Skipping unreadable archive entry");
                summary.skipped += 1;
                continue;
            }
        };

        let name = names.claim(&entry.name);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(entry.file.size_bytes >= i64::from(u32::MAX));
        if let Err(e) = writer.start_file(name.clone(), options) {
            fail(&tx, io::Error::other(e)).await;
            return summary;
        }

        let mut complete = true;
        while let Some(chunk) = blob.next().await {
            match chunk {
                Ok(bytes) => {
                    if let Err(e) = writer.write_all(&bytes) {
                        fail(&tx, e).await;
                        return summary;
                    }
                }
                Err(e) => {
                    warn!(file_id = %entry.file.id, entry = %name, error = %e, "Archive entry truncated by read error");
                    complete = false;
                    break;
                }
            }
            if !drain(&sink, &tx).await {
                debug!("Archive consumer disconnected mid-entry");
                return summary;
            }
        }
        if complete {
            summary.written += 1;
        } else {
            summary.truncated += 1;
        }
    }

    if let Err(e) = writer.finish() {
        fail(&tx, io::Error::other(e)).await;
        return summary;
    }
    drain(&sink, &tx).await;
    debug!(
        written = summary.written,
        truncated = summary.truncated,
        skipped = summary.skipped,
        "Archive complete"
    );
    summary
}

/// Forward buffered archive bytes. `false` when the receiver is gone.
async fn drain(sink: &SharedBuffer, tx: &mpsc::Sender<Chunk>) -> bool {
    let chunk = sink.take();
    if chunk.is_empty() {
        return !tx.is_closed();
    }
    tx.send(Ok(chunk)).await.is_ok()
}

async fn fail(tx: &mpsc::Sender<Chunk>, e: io::Error) {
    error!(error = %e, "Archive assembly failed");
    let _ = tx.send(Err(e)).await;
}

/// `Write` sink shared between the zip writer and the producer loop.
#[derive(Debug, Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn take(&self) -> Bytes {
        match self.0.lock() {
            Ok(mut buf) => Bytes::from(std::mem::take(&mut *buf)),
            Err(_) => Bytes::new(),
        }
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("archive buffer poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Hands out unique entry names: `a.txt`, `a (1).txt`, `a (2).txt`, ...
#[derive(Debug, Default)]
pub(crate) struct EntryNames {
    used: HashSet<String>,
}

impl EntryNames {
    pub(crate) fn claim(&mut self, name: &str) -> String {
        if self.used.insert(name.to_string()) {
            return name.to_string();
        }
        let (stem, ext) = split_extension(name);
        let mut n = 1u32;
        loop {
            let candidate = format!("{stem} ({n}){ext}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Split `dir/name.ext` into `("dir/name", ".ext")`. Dotfiles have no extension.
fn split_extension(name: &str) -> (&str, &str) {
    let base_start = name.rfind('/').map_or(0, |i| i + 1);
    match name[base_start..].rfind('.') {
        Some(dot) if dot > 0 => name.split_at(base_start + dot),
        _ => (name, ""),
    }
}

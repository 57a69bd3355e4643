//! Durable request store backed by an append-only log file.
//!
//! On-disk format, one frame per record:
//! ```text
//! [4 bytes: payload length (little-endian u32)]
//! [4 bytes: CRC32 of payload (little-endian u32)]
//! [N bytes: payload (bincode-serialized SwapRequest)]
//! ```
//!
//! The whole log is replayed into a [`RecordIndex`] when the store is opened.
//! Frames that fail the CRC check are skipped. A frame cut short by a crash
//! ends recovery; its bytes are copied to a `<log>.torn-<offset>` sidecar and
//! then truncated away so later appends start on a clean boundary. A header
//! that no writer could have produced (an oversized or zero length followed
//! by data) fails the open and leaves the file untouched.
//!
//! An open store holds an exclusive advisory lock on the log, so a second
//! handle on the same path (another process, or the CLI while the server is
//! running) is refused with [`StoreError::Unavailable`].

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use swap_types::{NewSwapRequest, RequestId, SwapRequest};
use tracing::{debug, error, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::index::RecordIndex;
use crate::traits::RequestStore;

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Largest payload a frame may carry. Anything bigger in a header is damage.
const MAX_FRAME_LEN: u32 = 4 * 1024 * 1024;

/// Flush/sync strategy for appends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` after every record (safest, highest latency).
    EveryWrite,
    /// Rely on OS page-cache buffering (fastest, least durable).
    #[default]
    OsDefault,
}

struct LogWriter {
    file: File,
    /// Current end of the log.
    offset: u64,
}

struct LogState {
    index: RecordIndex,
    /// `None` once the store has been closed.
    writer: Option<LogWriter>,
}

/// Append-only, crash-recoverable request store.
pub struct FileRequestStore {
    path: PathBuf,
    sync_mode: SyncMode,
    state: RwLock<LogState>,
}

impl FileRequestStore {
    /// Open (or create) the log at `path` and replay it.
    pub fn open(path: &Path, sync_mode: SyncMode) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;
        lock_log(&file, path)?;
        let file_len = file.metadata()?.len();

        let recovery = recover(path, file_len)?;
        let valid_len = recovery.valid_len;
        match recovery.tail {
            Tail::Clean => {}
            Tail::Torn => {
                let sidecar = preserve_tail(path, valid_len)?;
                warn!(
                    valid_len,
                    file_len,
                    sidecar = %sidecar.display(),
                    "truncating torn tail of request log"
                );
                file.set_len(valid_len)?;
            }
            Tail::Corrupt { offset, reason } => {
                error!(path = %path.display(), offset, %reason, "request log is corrupt");
                return Err(StoreError::Corrupt { offset, reason });
            }
        }

        let mut index = RecordIndex::new();
        for record in recovery.records {
            index.push(record);
        }
        info!(path = %path.display(), records = index.len(), "request log opened");

        Ok(Self {
            path: path.to_path_buf(),
            sync_mode,
            state: RwLock::new(LogState {
                index,
                writer: Some(LogWriter {
                    file,
                    offset: valid_len,
                }),
            }),
        })
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Configured sync strategy.
    pub fn sync_mode(&self) -> SyncMode {
        self.sync_mode
    }

    /// Current end offset of the log, in bytes.
    pub fn offset(&self) -> StoreResult<u64> {
        let state = self.read()?;
        Ok(state.writer.as_ref().map(|w| w.offset).unwrap_or(0))
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, LogState>> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))?;
        if state.writer.is_none() {
            return Err(StoreError::Unavailable("store is closed".into()));
        }
        Ok(state)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, LogState>> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))
    }
}

impl LogWriter {
    /// Append one framed record. Returns the byte offset of the frame.
    ///
    /// On a failed write the file is cut back to the previous end so that a
    /// partial frame never precedes later records.
    fn append(&mut self, record: &SwapRequest, sync_mode: SyncMode) -> StoreResult<u64> {
        let frame = encode_frame(record)?;
        let entry_offset = self.offset;

        if let Err(e) = self.write_frame(&frame, sync_mode) {
            if let Err(rollback) = self.file.set_len(entry_offset) {
                warn!(offset = entry_offset, error = %rollback, "failed to roll back partial append");
            }
            return Err(e.into());
        }

        self.offset += frame.len() as u64;
        debug!(offset = entry_offset, len = frame.len(), "request log append");
        Ok(entry_offset)
    }

    fn write_frame(&mut self, frame: &[u8], sync_mode: SyncMode) -> io::Result<()> {
        self.file.write_all(frame)?;
        self.file.flush()?;
        if sync_mode == SyncMode::EveryWrite {
            self.file.sync_data()?;
        }
        Ok(())
    }
}

fn encode_frame(record: &SwapRequest) -> StoreResult<Vec<u8>> {
    let payload =
        bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_LEN)
        .ok_or_else(|| StoreError::Serialization("record exceeds frame size".into()))?;
    let crc = crc32fast::hash(&payload);

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Take the exclusive advisory lock that marks the log as in use.
fn lock_log(file: &File, path: &Path) -> StoreResult<()> {
    match file.try_lock_exclusive() {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
            Err(StoreError::Unavailable(format!(
                "{} is already open by another store handle",
                path.display()
            )))
        }
        Err(e) => Err(e.into()),
    }
}

/// How replay ended.
#[derive(Debug, PartialEq, Eq)]
enum Tail {
    /// Every byte belongs to a complete frame.
    Clean,
    /// The last frame was cut short.
    Torn,
    /// A header no writer could have produced.
    Corrupt { offset: u64, reason: String },
}

struct Recovery {
    records: Vec<SwapRequest>,
    /// Offset just past the last complete frame.
    valid_len: u64,
    tail: Tail,
}

/// Replay every valid frame in the log.
fn recover(path: &Path, file_len: u64) -> StoreResult<Recovery> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();
    let mut offset: u64 = 0;

    let tail = loop {
        let remaining = file_len - offset;
        if remaining == 0 {
            break Tail::Clean;
        }
        if remaining < HEADER_SIZE as u64 {
            warn!(offset, remaining, "partial request log header");
            break Tail::Torn;
        }

        let mut header = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header)?;

        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if length > MAX_FRAME_LEN {
            break Tail::Corrupt {
                offset,
                reason: format!("frame length {length} exceeds {MAX_FRAME_LEN}"),
            };
        }
        if length == 0 {
            // Some filesystems leave zero-filled blocks after a crash.
            if header == [0u8; HEADER_SIZE] && rest_is_zeroed(&mut reader)? {
                warn!(offset, "zero-filled request log tail");
                break Tail::Torn;
            }
            break Tail::Corrupt {
                offset,
                reason: "zero-length frame followed by data".into(),
            };
        }

        let frame_end = offset + HEADER_SIZE as u64 + length as u64;
        if frame_end > file_len {
            warn!(offset, length, file_len, "incomplete request log frame; stopping recovery");
            break Tail::Torn;
        }

        let mut payload = vec![0u8; length as usize];
        reader.read_exact(&mut payload)?;

        let actual_crc = crc32fast::hash(&payload);
        if actual_crc != expected_crc {
            warn!(
                offset,
                expected = expected_crc,
                actual = actual_crc,
                "CRC mismatch; skipping request log frame"
            );
            offset = frame_end;
            continue;
        }

        match bincode::deserialize::<SwapRequest>(&payload) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(offset, error = %e, "undecodable request log frame; skipping");
            }
        }
        offset = frame_end;
    };

    debug!(recovered = records.len(), ?tail, "request log recovery complete");
    Ok(Recovery {
        records,
        valid_len: offset,
        tail,
    })
}

fn rest_is_zeroed(reader: &mut impl Read) -> io::Result<bool> {
    let mut rest = Vec::new();
    reader.read_to_end(&mut rest)?;
    Ok(rest.iter().all(|b| *b == 0))
}

/// Copy everything past `valid_len` to a sidecar next to the log.
fn preserve_tail(path: &Path, valid_len: u64) -> StoreResult<PathBuf> {
    let mut reader = File::open(path)?;
    reader.seek(SeekFrom::Start(valid_len))?;
    let mut tail = Vec::new();
    reader.read_to_end(&mut tail)?;

    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".torn-{valid_len}"));
    let sidecar = path.with_file_name(name);
    fs::write(&sidecar, &tail)?;
    Ok(sidecar)
}

impl RequestStore for FileRequestStore {
    fn insert(&self, request: NewSwapRequest) -> StoreResult<SwapRequest> {
        let mut state = self.write()?;
        let LogState { index, writer } = &mut *state;
        let writer = writer
            .as_mut()
            .ok_or_else(|| StoreError::Unavailable("store is closed".into()))?;

        let created_at = index.next_timestamp(Utc::now());
        let record = request.into_record(RequestId::new(), created_at)?;
        writer.append(&record, self.sync_mode)?;
        index.push(record.clone());
        debug!(
            id = %record.id,
            current = %record.current_section,
            desired = %record.desired_section,
            "swap request stored"
        );
        Ok(record)
    }

    fn list_all(&self) -> StoreResult<Vec<SwapRequest>> {
        Ok(self.read()?.index.newest_first())
    }

    fn find_by(&self, current: &str, desired: &str) -> StoreResult<Vec<SwapRequest>> {
        Ok(self.read()?.index.find_by(current, desired))
    }

    fn find_one_by(&self, current: &str, desired: &str) -> StoreResult<Option<SwapRequest>> {
        Ok(self.read()?.index.find_one_by(current, desired))
    }

    fn find_by_desired(&self, desired: &str) -> StoreResult<Vec<SwapRequest>> {
        Ok(self.read()?.index.find_by_desired(desired))
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.index.len())
    }

    fn close(&self) -> StoreResult<()> {
        let mut state = self.write()?;
        if let Some(writer) = state.writer.take() {
            writer.file.sync_all()?;
            info!(path = %self.path.display(), offset = writer.offset, "request log closed");
        }
        Ok(())
    }
}

impl std::fmt::Debug for FileRequestStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (count, open) = self
            .state
            .read()
            .map(|s| (s.index.len(), s.writer.is_some()))
            .unwrap_or((0, false));
        f.debug_struct("FileRequestStore")
            .field("path", &self.path)
            .field("record_count", &count)
            .field("open", &open)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(path: &Path) -> FileRequestStore {
        FileRequestStore::open(path, SyncMode::default()).unwrap()
    }

    fn submit(store: &FileRequestStore, current: &str, desired: &str) -> SwapRequest {
        store
            .insert(NewSwapRequest::new(current, desired, "+1-000"))
            .unwrap()
    }

    #[test]
    fn open_creates_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("requests.log");
        let store = open(&path);
        assert!(path.exists());
        assert!(store.is_empty().unwrap());
        assert_eq!(store.offset().unwrap(), 0);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.log");

        let (a, b, c) = {
            let store = open(&path);
            let a = submit(&store, "CS101-A", "CS101-B");
            let b = submit(&store, "CS101-B", "CS101-A");
            let c = submit(&store, "MA201-X", "CS101-A");
            store.close().unwrap();
            (a, b, c)
        };

        let store = open(&path);
        assert_eq!(store.len().unwrap(), 3);
        assert_eq!(store.list_all().unwrap(), vec![c.clone(), b.clone(), a.clone()]);
        assert_eq!(store.find_by("CS101-B", "CS101-A").unwrap(), vec![b]);
        assert_eq!(store.find_by_desired("CS101-A").unwrap().len(), 2);
        assert_eq!(store.find_one_by("CS101-A", "CS101-B").unwrap(), Some(a));
    }

    #[test]
    fn appends_after_reopen_extend_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.log");
        {
            let store = open(&path);
            submit(&store, "A", "B");
        }
        {
            let store = open(&path);
            submit(&store, "C", "D");
        }
        let store = open(&path);
        let pairs: Vec<(String, String)> = store
            .list_all()
            .unwrap()
            .into_iter()
            .map(|r| (r.current_section, r.desired_section))
            .collect();
        assert_eq!(
            pairs,
            vec![("C".into(), "D".into()), ("A".into(), "B".into())]
        );
    }

    #[test]
    fn invalid_insert_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.log");
        let store = open(&path);
        let before = store.offset().unwrap();

        let err = store.insert(NewSwapRequest::new("", "B", "c")).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(store.offset().unwrap(), before);
        assert_eq!(fs::metadata(&path).unwrap().len(), before);
    }

    #[test]
    fn crc_mismatch_skips_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.log");
        let second = {
            let store = open(&path);
            submit(&store, "A", "B");
            submit(&store, "C", "D")
        };

        {
            let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
            file.seek(SeekFrom::Start(HEADER_SIZE as u64)).unwrap();
            let mut buf = [0u8; 1];
            file.read_exact(&mut buf).unwrap();
            buf[0] ^= 0xFF;
            file.seek(SeekFrom::Start(HEADER_SIZE as u64)).unwrap();
            file.write_all(&buf).unwrap();
            file.sync_all().unwrap();
        }

        let store = open(&path);
        assert_eq!(store.list_all().unwrap(), vec![second]);
    }

    #[test]
    fn torn_tail_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.log");
        let (first, total_len) = {
            let store = open(&path);
            let first = submit(&store, "A", "B");
            submit(&store, "C", "D");
            (first, store.offset().unwrap())
        };

        {
            let file = OpenOptions::new().write(true).open(&path).unwrap();
            file.set_len(total_len - 4).unwrap();
        }

        let store = open(&path);
        assert_eq!(store.list_all().unwrap(), vec![first.clone()]);
        let clean_len = store.offset().unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), clean_len);

        let sidecar = dir.path().join(format!("requests.log.torn-{clean_len}"));
        assert_eq!(fs::metadata(&sidecar).unwrap().len(), total_len - 4 - clean_len);

        let third = submit(&store, "E", "F");
        drop(store);

        let store = open(&path);
        assert_eq!(store.list_all().unwrap(), vec![third, first]);
    }

    #[test]
    fn damaged_length_fails_open_and_keeps_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.log");
        {
            let store = open(&path);
            for i in 0..5 {
                submit(&store, &format!("S{i}"), "T");
            }
            store.close().unwrap();
        }

        let mut bytes = fs::read(&path).unwrap();
        bytes[3] = 0x7f;
        fs::write(&path, &bytes).unwrap();

        let err = FileRequestStore::open(&path, SyncMode::default()).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { offset: 0, .. }));
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn zero_length_header_before_data_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.log");
        {
            let store = open(&path);
            submit(&store, "A", "B");
            submit(&store, "C", "D");
        }

        let mut bytes = fs::read(&path).unwrap();
        bytes[..4].copy_from_slice(&0u32.to_le_bytes());
        fs::write(&path, &bytes).unwrap();

        let err = FileRequestStore::open(&path, SyncMode::default()).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { offset: 0, .. }));
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn zero_filled_tail_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.log");
        let (first, clean_len) = {
            let store = open(&path);
            let first = submit(&store, "A", "B");
            (first, store.offset().unwrap())
        };

        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&[0u8; 32]).unwrap();
        }

        let store = open(&path);
        assert_eq!(store.list_all().unwrap(), vec![first]);
        assert_eq!(fs::metadata(&path).unwrap().len(), clean_len);
    }

    #[test]
    fn second_handle_on_same_log_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.log");
        let first = open(&path);
        submit(&first, "B", "A");

        let err = FileRequestStore::open(&path, SyncMode::default()).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        first.close().unwrap();
        let second = open(&path);
        assert_eq!(second.len().unwrap(), 1);
    }

    #[test]
    fn closed_store_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(&dir.path().join("requests.log"));
        submit(&store, "A", "B");
        store.close().unwrap();
        store.close().unwrap();

        assert!(matches!(store.len(), Err(StoreError::Unavailable(_))));
        assert!(matches!(store.find_by_desired("B"), Err(StoreError::Unavailable(_))));
        assert!(matches!(
            store.insert(NewSwapRequest::new("A", "B", "c")),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn sync_every_write_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.log");
        let store = FileRequestStore::open(&path, SyncMode::EveryWrite).unwrap();
        assert_eq!(store.sync_mode(), SyncMode::EveryWrite);

        let rec = submit(&store, "A", "B");
        drop(store);
        assert_eq!(open(&path).list_all().unwrap(), vec![rec]);
    }

    #[test]
    fn frame_layout() {
        let rec = NewSwapRequest::new("A", "B", "c")
            .into_record(RequestId::new(), Utc::now())
            .unwrap();
        let frame = encode_frame(&rec).unwrap();
        let length = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        let crc = u32::from_le_bytes([frame[4], frame[5], frame[6], frame[7]]);
        assert_eq!(frame.len(), HEADER_SIZE + length);
        assert_eq!(crc, crc32fast::hash(&frame[HEADER_SIZE..]));
    }

    #[test]
    fn oversized_record_is_rejected() {
        let rec = NewSwapRequest::new("A", "B", "x".repeat(MAX_FRAME_LEN as usize))
            .into_record(RequestId::new(), Utc::now())
            .unwrap();
        assert!(matches!(encode_frame(&rec), Err(StoreError::Serialization(_))));
    }
}

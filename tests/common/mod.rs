//! Common test utilities
//!
//! An in-memory remote tree standing in for an SFTP server, with counters
//! for every operation the bridge performs against it.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use sftp_bridge::bridge::{Bridge, PathResolver};
use sftp_bridge::error::SftpError;
use sftp_bridge::sftp::{RemoteFile, RemoteSession, SessionFactory, StatInfo};

pub const ROOT: &str = "/home/ftpubuntu";

/// Operation counts, shared between the factory and every session it opens
#[derive(Debug, Default)]
pub struct Counters {
    pub sessions_opened: AtomicUsize,
    pub sessions_closed: AtomicUsize,
    pub stats: AtomicUsize,
    pub opens: AtomicUsize,
    pub reads: AtomicUsize,
    pub reads_past_end: AtomicUsize,
    pub files_closed: AtomicUsize,
    pub read_dirs: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Wait for a close spawned from a drop to run
    pub async fn wait_for_closes(&self, expected: usize) {
        let _ = tokio::time::timeout(Duration::from_secs(2), async {
            while Self::get(&self.sessions_closed) < expected {
                tokio::task::yield_now().await;
            }
        })
        .await;
    }
}

#[derive(Debug, Clone)]
pub enum FakeNode {
    Dir(Vec<String>),
    File {
        data: Vec<u8>,
        /// Size reported by the open handle, when it differs from `data`
        reported_size: Option<u64>,
        /// Reads fail once this many bytes have been served
        fail_after: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum SessionFailure {
    Refused,
    Timeout,
}

/// Remote tree plus read behaviour
#[derive(Debug, Clone, Default)]
pub struct FakeRemote {
    nodes: HashMap<String, FakeNode>,
    /// Sizes returned by successive reads, cycled; empty means fill the buffer
    partition: Vec<usize>,
    open_errors: HashMap<String, String>,
    list_errors: HashMap<String, String>,
    stat_timeouts: HashSet<String>,
    open_timeouts: HashSet<String>,
    size_errors: HashSet<String>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(mut self, path: &str, entries: &[&str]) -> Self {
        let entries = entries.iter().map(|e| e.to_string()).collect();
        self.nodes.insert(path.to_string(), FakeNode::Dir(entries));
        self
    }

    pub fn file(mut self, path: &str, data: Vec<u8>) -> Self {
        self.nodes.insert(
            path.to_string(),
            FakeNode::File {
                data,
                reported_size: None,
                fail_after: None,
            },
        );
        self
    }

    pub fn short_file(mut self, path: &str, data: Vec<u8>, reported_size: u64) -> Self {
        self.nodes.insert(
            path.to_string(),
            FakeNode::File {
                data,
                reported_size: Some(reported_size),
                fail_after: None,
            },
        );
        self
    }

    pub fn failing_file(mut self, path: &str, data: Vec<u8>, fail_after: usize) -> Self {
        self.nodes.insert(
            path.to_string(),
            FakeNode::File {
                data,
                reported_size: None,
                fail_after: Some(fail_after),
            },
        );
        self
    }

    pub fn partition(mut self, sizes: &[usize]) -> Self {
        self.partition = sizes.to_vec();
        self
    }

    pub fn open_error(mut self, path: &str, message: &str) -> Self {
        self.open_errors.insert(path.to_string(), message.to_string());
        self
    }

    pub fn list_error(mut self, path: &str, message: &str) -> Self {
        self.list_errors.insert(path.to_string(), message.to_string());
        self
    }

    pub fn stat_timeout(mut self, path: &str) -> Self {
        self.stat_timeouts.insert(path.to_string());
        self
    }

    pub fn open_timeout(mut self, path: &str) -> Self {
        self.open_timeouts.insert(path.to_string());
        self
    }

    /// fstat on the open handle fails
    pub fn size_error(mut self, path: &str) -> Self {
        self.size_errors.insert(path.to_string());
        self
    }
}

pub struct FakeFactory {
    remote: Arc<FakeRemote>,
    counters: Arc<Counters>,
    failure: Option<SessionFailure>,
}

impl FakeFactory {
    pub fn new(remote: FakeRemote) -> Self {
        Self {
            remote: Arc::new(remote),
            counters: Arc::new(Counters::default()),
            failure: None,
        }
    }

    pub fn failing(failure: SessionFailure) -> Self {
        Self {
            remote: Arc::new(FakeRemote::new()),
            counters: Arc::new(Counters::default()),
            failure: Some(failure),
        }
    }

    pub fn counters(&self) -> Arc<Counters> {
        self.counters.clone()
    }
}

impl SessionFactory for FakeFactory {
    type Session = FakeSession;

    async fn open_session(&self) -> Result<FakeSession, SftpError> {
        match self.failure {
            Some(SessionFailure::Refused) => {
                return Err(SftpError::ConnectionFailed(
                    "Failed to connect to depot.kde.org:22: connection refused".into(),
                ));
            }
            Some(SessionFailure::Timeout) => {
                return Err(SftpError::Timeout("connecting to depot.kde.org:22".into()));
            }
            None => {}
        }
        Counters::bump(&self.counters.sessions_opened);
        Ok(FakeSession {
            remote: self.remote.clone(),
            counters: self.counters.clone(),
        })
    }
}

pub struct FakeSession {
    remote: Arc<FakeRemote>,
    counters: Arc<Counters>,
}

impl RemoteSession for FakeSession {
    type File = FakeFile;

    async fn stat(&self, path: &str) -> Result<StatInfo, SftpError> {
        Counters::bump(&self.counters.stats);
        if self.remote.stat_timeouts.contains(path) {
            return Err(SftpError::Timeout("SFTP request".into()));
        }
        match self.remote.nodes.get(path) {
            Some(FakeNode::Dir(_)) => Ok(StatInfo {
                is_dir: true,
                size: 4096,
            }),
            Some(FakeNode::File { data, .. }) => Ok(StatInfo {
                is_dir: false,
                size: data.len() as u64,
            }),
            None => Err(SftpError::NotFound("No such file".into())),
        }
    }

    async fn open(&self, path: &str) -> Result<FakeFile, SftpError> {
        Counters::bump(&self.counters.opens);
        if let Some(message) = self.remote.open_errors.get(path) {
            return Err(SftpError::FileOperation(message.clone()));
        }
        if self.remote.open_timeouts.contains(path) {
            return Err(SftpError::Timeout("SFTP request".into()));
        }
        match self.remote.nodes.get(path) {
            Some(FakeNode::File {
                data,
                reported_size,
                fail_after,
            }) => Ok(FakeFile {
                data: data.clone(),
                size: reported_size.unwrap_or(data.len() as u64),
                size_error: self.remote.size_errors.contains(path),
                fail_after: *fail_after,
                pos: 0,
                partition: self.remote.partition.clone(),
                next_read: 0,
                counters: self.counters.clone(),
            }),
            Some(FakeNode::Dir(_)) => Err(SftpError::FileOperation("Failure".into())),
            None => Err(SftpError::NotFound("No such file".into())),
        }
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<String>, SftpError> {
        Counters::bump(&self.counters.read_dirs);
        if let Some(message) = self.remote.list_errors.get(path) {
            return Err(SftpError::FileOperation(message.clone()));
        }
        match self.remote.nodes.get(path) {
            Some(FakeNode::Dir(entries)) => Ok(entries.clone()),
            _ => Err(SftpError::NotFound("No such file".into())),
        }
    }

    async fn close(&mut self) {
        Counters::bump(&self.counters.sessions_closed);
    }
}

pub struct FakeFile {
    data: Vec<u8>,
    size: u64,
    size_error: bool,
    fail_after: Option<usize>,
    pos: usize,
    partition: Vec<usize>,
    next_read: usize,
    counters: Arc<Counters>,
}

impl RemoteFile for FakeFile {
    async fn size(&mut self) -> Result<u64, SftpError> {
        if self.size_error {
            return Err(SftpError::FileOperation("Failure: handle closed".into()));
        }
        Ok(self.size)
    }

    /// Never reports EOF on its own; reads at or past the end are counted
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Counters::bump(&self.counters.reads);
        if let Some(limit) = self.fail_after {
            if self.pos >= limit {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "channel closed"));
            }
        }
        if self.pos >= self.data.len() {
            Counters::bump(&self.counters.reads_past_end);
            return Ok(0);
        }

        let mut n = buf.len().min(self.data.len() - self.pos);
        if !self.partition.is_empty() {
            let step = self.partition[self.next_read % self.partition.len()].max(1);
            self.next_read += 1;
            n = n.min(step);
        }
        if let Some(limit) = self.fail_after {
            n = n.min(limit - self.pos);
        }

        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    async fn close(self) {
        Counters::bump(&self.counters.files_closed);
    }
}

/// Deterministic, non-repeating test content
pub fn pattern(len: usize) -> Vec<u8> {
    let mut state: u32 = 0x2545_f491;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

pub fn bridge(factory: FakeFactory, chunk_size: usize) -> Arc<Bridge<FakeFactory>> {
    Arc::new(Bridge::new(PathResolver::new(ROOT), factory, chunk_size))
}

pub fn remote(path: &str) -> String {
    format!("{}{}", ROOT, path)
}

/// Isolated directory for config and key fixtures
pub struct TestEnvironment {
    pub config_dir: tempfile::TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let config_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        Self { config_dir }
    }

    pub fn write(&self, name: &str, content: &str) -> std::path::PathBuf {
        let path = self.config_dir.path().join(name);
        std::fs::write(&path, content).expect("Failed to write fixture");
        path
    }
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_MAX_ATTEMPTS;
use crate::domain::FileDescriptor;
use crate::error::MafError;
use crate::fs_util;
use crate::gdc::{DownloadOutcome, GdcClient};

const DEFAULT_BASE_DELAY_MS: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Backoff {
    None,
    Linear { base_ms: u64 },
}

impl Backoff {
    pub fn delay(&self, failed_attempts: usize) -> Duration {
        match self {
            Backoff::None => Duration::ZERO,
            Backoff::Linear { base_ms } => {
                Duration::from_millis(base_ms.saturating_mul(failed_attempts as u64))
            }
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Linear {
            base_ms: DEFAULT_BASE_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchDir {
    path: Utf8PathBuf,
}

impl ScratchDir {
    pub fn for_date(root: &Utf8Path, date: NaiveDate) -> Self {
        Self {
            path: root.join(format!("tmpMAF_{}", date.format("%Y-%m-%d"))),
        }
    }

    pub fn for_today(root: &Utf8Path) -> Self {
        Self::for_date(root, chrono::Local::now().date_naive())
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn ensure(&self) -> Result<(), MafError> {
        fs_util::ensure_dir(self.path.as_std_path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchedFile {
    pub descriptor: FileDescriptor,
    pub path: PathBuf,
    pub attempts: usize,
}

pub struct TransferManager<'a, C: GdcClient> {
    client: &'a C,
    policy: RetryPolicy,
    workers: usize,
}

impl<'a, C: GdcClient> TransferManager<'a, C> {
    pub fn new(client: &'a C, policy: RetryPolicy, workers: usize) -> Self {
        Self {
            client,
            policy,
            workers: workers.max(1),
        }
    }

    pub fn fetch(
        &self,
        descriptor: &FileDescriptor,
        scratch: &Path,
    ) -> Result<FetchedFile, MafError> {
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            tracing::info!(file_id = %descriptor.file_id, attempt, "downloading file");
            let failure = match self.client.download(&descriptor.file_id, scratch) {
                Ok(DownloadOutcome::Saved(path)) => {
                    verify_checksum(&path, descriptor)?;
                    if path.file_name().and_then(|name| name.to_str())
                        != Some(descriptor.file_name.as_str())
                    {
                        tracing::warn!(
                            file_id = %descriptor.file_id,
                            expected = %descriptor.file_name,
                            saved = %path.display(),
                            "server file name differs from index"
                        );
                    }
                    return Ok(FetchedFile {
                        descriptor: descriptor.clone(),
                        path,
                        attempts: attempt,
                    });
                }
                Ok(DownloadOutcome::Status(status)) => format!("status {status}"),
                Err(MafError::TransferError(message)) => message,
                Err(err) => return Err(err),
            };

            if attempt >= self.policy.max_attempts {
                return Err(MafError::MaxRetriesExceeded {
                    file_id: descriptor.file_id.clone(),
                    attempts: attempt,
                });
            }
            tracing::warn!(file_id = %descriptor.file_id, attempt, %failure, "retrying download");
            let delay = self.policy.backoff.delay(attempt);
            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }
    }

    pub fn fetch_all(
        &self,
        descriptors: &[FileDescriptor],
        scratch: &Path,
    ) -> Result<Vec<FetchedFile>, MafError> {
        if self.workers == 1 || descriptors.len() <= 1 {
            return descriptors
                .iter()
                .map(|descriptor| self.fetch(descriptor, scratch))
                .collect();
        }

        let next = AtomicUsize::new(0);
        let abort = AtomicBool::new(false);
        let slots = descriptors
            .iter()
            .map(|_| Mutex::new(None))
            .collect::<Vec<Mutex<Option<Result<FetchedFile, MafError>>>>>();

        thread::scope(|scope| {
            for _ in 0..self.workers.min(descriptors.len()) {
                scope.spawn(|| {
                    while !abort.load(Ordering::SeqCst) {
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        let Some(descriptor) = descriptors.get(index) else {
                            break;
                        };
                        let result = self.fetch(descriptor, scratch);
                        if result.is_err() {
                            abort.store(true, Ordering::SeqCst);
                        }
                        let mut slot = slots[index]
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner());
                        *slot = Some(result);
                    }
                });
            }
        });

        let mut fetched = Vec::with_capacity(descriptors.len());
        for (descriptor, slot) in descriptors.iter().zip(slots) {
            match slot.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()) {
                Some(Ok(file)) => fetched.push(file),
                Some(Err(err)) => return Err(err),
                None => {
                    return Err(MafError::TransferError(format!(
                        "download of {} was not attempted",
                        descriptor.file_id
                    )));
                }
            }
        }
        Ok(fetched)
    }
}

pub fn verify_checksum(path: &Path, descriptor: &FileDescriptor) -> Result<(), MafError> {
    let actual = fs_util::md5_hex(path)?;
    if !actual.eq_ignore_ascii_case(descriptor.md5sum.trim()) {
        return Err(MafError::ChecksumMismatch {
            file_name: descriptor.file_name.clone(),
            expected: descriptor.md5sum.clone(),
            actual,
        });
    }
    tracing::debug!(file = %descriptor.file_name, md5 = %actual, "checksum verified");
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::resolver::FileQuery;

    enum Step {
        Status(u16),
        Transport,
        NoDisposition,
    }

    struct ScriptedClient {
        steps: Mutex<Vec<Step>>,
        body: Vec<u8>,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(statuses: Vec<u16>, body: &[u8]) -> Self {
            Self::scripted(statuses.into_iter().map(Step::Status).collect(), body)
        }

        fn scripted(steps: Vec<Step>, body: &[u8]) -> Self {
            Self {
                steps: Mutex::new(steps),
                body: body.to_vec(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl GdcClient for ScriptedClient {
        fn search_files(&self, _query: &FileQuery) -> Result<Vec<FileDescriptor>, MafError> {
            Ok(Vec::new())
        }

        fn download(&self, file_id: &str, scratch_dir: &Path) -> Result<DownloadOutcome, MafError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut steps = self.steps.lock().unwrap();
            let step = if steps.is_empty() {
                Step::Status(200)
            } else {
                steps.remove(0)
            };
            match step {
                Step::Status(200) => {}
                Step::Status(status) => return Ok(DownloadOutcome::Status(status)),
                Step::Transport => {
                    return Err(MafError::TransferError("connection reset".to_string()));
                }
                Step::NoDisposition => {
                    return Err(MafError::MissingContentDisposition(file_id.to_string()));
                }
            }
            let path = scratch_dir.join(format!("{file_id}.maf.gz"));
            std::fs::write(&path, &self.body).unwrap();
            Ok(DownloadOutcome::Saved(path))
        }
    }

    fn descriptor(file_id: &str, body: &[u8]) -> FileDescriptor {
        FileDescriptor {
            file_id: file_id.to_string(),
            md5sum: format!("{:x}", <md5::Md5 as md5::Digest>::digest(body)),
            file_name: format!("{file_id}.maf.gz"),
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            backoff: Backoff::None,
        }
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let temp = tempfile::tempdir().unwrap();
        let client = ScriptedClient::new(vec![500, 503], b"payload");
        let manager = TransferManager::new(&client, policy(), 1);
        let fetched = manager
            .fetch(&descriptor("a", b"payload"), temp.path())
            .unwrap();
        assert_eq!(fetched.attempts, 3);
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn gives_up_after_three_attempts() {
        let temp = tempfile::tempdir().unwrap();
        let client = ScriptedClient::new(vec![500, 500, 500, 500], b"payload");
        let manager = TransferManager::new(&client, policy(), 1);
        let err = manager
            .fetch(&descriptor("a", b"payload"), temp.path())
            .unwrap_err();
        assert_matches!(err, MafError::MaxRetriesExceeded { attempts: 3, .. });
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn transport_errors_count_as_attempts() {
        let temp = tempfile::tempdir().unwrap();
        let client = ScriptedClient::scripted(
            vec![Step::Transport, Step::Status(502)],
            b"payload",
        );
        let manager = TransferManager::new(&client, policy(), 1);
        let fetched = manager
            .fetch(&descriptor("a", b"payload"), temp.path())
            .unwrap();
        assert_eq!(fetched.attempts, 3);

        let client = ScriptedClient::scripted(
            vec![Step::Transport, Step::Transport, Step::Transport, Step::Transport],
            b"payload",
        );
        let manager = TransferManager::new(&client, policy(), 1);
        let err = manager
            .fetch(&descriptor("a", b"payload"), temp.path())
            .unwrap_err();
        assert_matches!(err, MafError::MaxRetriesExceeded { attempts: 3, .. });
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn missing_disposition_is_not_retried() {
        let temp = tempfile::tempdir().unwrap();
        let client = ScriptedClient::scripted(vec![Step::NoDisposition], b"payload");
        let manager = TransferManager::new(&client, policy(), 1);
        let err = manager
            .fetch(&descriptor("a", b"payload"), temp.path())
            .unwrap_err();
        assert_matches!(err, MafError::MissingContentDisposition(id) if id == "a");
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn single_byte_change_fails_checksum() {
        let temp = tempfile::tempdir().unwrap();
        let client = ScriptedClient::new(Vec::new(), b"payloaD");
        let manager = TransferManager::new(&client, policy(), 1);
        let err = manager
            .fetch(&descriptor("a", b"payload"), temp.path())
            .unwrap_err();
        assert_matches!(err, MafError::ChecksumMismatch { .. });
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pool_preserves_descriptor_order() {
        let temp = tempfile::tempdir().unwrap();
        let client = ScriptedClient::new(Vec::new(), b"payload");
        let manager = TransferManager::new(&client, policy(), 3);
        let descriptors = (0..7)
            .map(|i| descriptor(&format!("f{i}"), b"payload"))
            .collect::<Vec<_>>();
        let fetched = manager.fetch_all(&descriptors, temp.path()).unwrap();
        let ids = fetched
            .iter()
            .map(|file| file.descriptor.file_id.clone())
            .collect::<Vec<_>>();
        let expected = descriptors
            .iter()
            .map(|d| d.file_id.clone())
            .collect::<Vec<_>>();
        assert_eq!(ids, expected);
    }

    #[test]
    fn pool_fails_fast_on_bad_checksum() {
        let temp = tempfile::tempdir().unwrap();
        let client = ScriptedClient::new(Vec::new(), b"payload");
        let manager = TransferManager::new(&client, policy(), 2);
        let mut descriptors = (0..4)
            .map(|i| descriptor(&format!("f{i}"), b"payload"))
            .collect::<Vec<_>>();
        descriptors[1].md5sum = "0".repeat(32);
        let err = manager.fetch_all(&descriptors, temp.path()).unwrap_err();
        assert_matches!(err, MafError::ChecksumMismatch { .. });
    }

    #[test]
    fn linear_backoff_grows_with_attempts() {
        let backoff = Backoff::Linear { base_ms: 100 };
        assert_eq!(backoff.delay(1), Duration::from_millis(100));
        assert_eq!(backoff.delay(2), Duration::from_millis(200));
        assert_eq!(Backoff::None.delay(5), Duration::ZERO);
        let huge = Backoff::Linear { base_ms: u64::MAX };
        assert_eq!(huge.delay(3), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn scratch_dir_named_by_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let scratch = ScratchDir::for_date(Utf8Path::new("/tmp/run"), date);
        assert_eq!(scratch.path(), Utf8Path::new("/tmp/run/tmpMAF_2024-03-09"));
    }
}

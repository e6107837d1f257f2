use crate::error::{AuditError, AuditResultExt};
use chrono::{DateTime, Utc};
use qpay_domain::config::AuditConfig;
use qpay_domain::payments::{PaymentActivity, Provider};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::path::Path;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Digest the first record of a trail is chained to.
pub const GENESIS_DIGEST: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// One entry of the trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub event: String,
    pub provider: Provider,
    pub email: Option<String>,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
    pub reference: Option<String>,
    /// `hex(sha256(previous digest || canonical body))`.
    pub digest: String,
}

/// The hashed part of a record: every field except the digest, in a fixed order.
#[derive(Serialize)]
struct RecordBody<'a> {
    sequence: u64,
    timestamp: &'a DateTime<Utc>,
    event: &'a str,
    provider: Provider,
    email: Option<&'a str>,
    amount_cents: Option<i64>,
    currency: Option<&'a str>,
    reference: Option<&'a str>,
}

impl AuditRecord {
    fn body(&self) -> RecordBody<'_> {
        RecordBody {
            sequence: self.sequence,
            timestamp: &self.timestamp,
            event: &self.event,
            provider: self.provider,
            email: self.email.as_deref(),
            amount_cents: self.amount_cents,
            currency: self.currency.as_deref(),
            reference: self.reference.as_deref(),
        }
    }

    fn chained_digest(&self, previous: &str) -> Result<String, serde_json::Error> {
        let body = serde_json::to_vec(&self.body())?;
        let mut hasher = Sha256::new();
        hasher.update(previous.as_bytes());
        hasher.update(&body);
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Checks that every record hashes to its digest given its predecessor.
///
/// A slice starting at sequence 0 is anchored to [`GENESIS_DIGEST`]. A slice
/// taken from the middle of a trail trusts its first record and checks the rest.
#[must_use]
pub fn verify_chain(records: &[AuditRecord]) -> bool {
    let Some(first) = records.first() else {
        return true;
    };

    if first.sequence == 0 && first.chained_digest(GENESIS_DIGEST).ok().as_ref() != Some(&first.digest)
    {
        return false;
    }

    records.windows(2).all(|pair| {
        let (previous, current) = (&pair[0], &pair[1]);
        current.sequence == previous.sequence + 1
            && current.chained_digest(&previous.digest).ok().as_ref() == Some(&current.digest)
    })
}

#[derive(Debug)]
struct ChainState {
    next_sequence: u64,
    last_digest: String,
    window: VecDeque<AuditRecord>,
    file: Option<File>,
    /// Set when a failed append left the file in an unknown state.
    disabled: bool,
}

/// Append-only, hash-chained record of payment activity.
#[derive(Debug)]
pub struct AuditTrail {
    state: Mutex<ChainState>,
    capacity: usize,
}

impl AuditTrail {
    /// In-memory trail keeping the newest `capacity` records.
    #[must_use]
    pub fn in_memory(capacity: usize) -> Self {
        Self::with_state(capacity, None, 0, GENESIS_DIGEST.to_owned(), VecDeque::new())
    }

    /// Opens the trail described by `config`.
    ///
    /// With a path, existing records are verified and the chain continues from
    /// the last one. New records are appended as JSON lines.
    ///
    /// # Errors
    /// Fails when the file cannot be read or opened, holds an undecodable line,
    /// or its chain does not verify.
    pub async fn open(config: &AuditConfig) -> Result<Self, AuditError> {
        let capacity = config.capacity.max(1);
        let Some(path) = config.path.as_deref() else {
            return Ok(Self::in_memory(capacity));
        };

        let existing = read_records(path).await?;
        if !verify_chain(&existing) {
            return Err(AuditError::Tampered {
                message: "stored digests do not match their records".into(),
                context: Some(path.display().to_string().into()),
            });
        }

        let (next_sequence, last_digest) = existing
            .last()
            .map_or((0, GENESIS_DIGEST.to_owned()), |r| (r.sequence + 1, r.digest.clone()));
        let window: VecDeque<_> =
            existing.into_iter().rev().take(capacity).rev().collect();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .context(format!("Failed to open {}", path.display()))?;

        info!(path = %path.display(), next_sequence, "Audit trail opened");

        Ok(Self::with_state(capacity, Some(file), next_sequence, last_digest, window))
    }

    fn with_state(
        capacity: usize,
        file: Option<File>,
        next_sequence: u64,
        last_digest: String,
        window: VecDeque<AuditRecord>,
    ) -> Self {
        Self {
            state: Mutex::new(ChainState { next_sequence, last_digest, window, file, disabled: false }),
            capacity: capacity.max(1),
        }
    }

    /// Appends `activity` to the chain.
    ///
    /// The chain only advances once the record is durable. A failed file write
    /// is truncated away so the file and the chain stay in step; if even that
    /// fails, the trail refuses further records.
    ///
    /// # Errors
    /// Fails when the record cannot be encoded or appended to the file, and
    /// with [`AuditError::Disabled`] after a rollback failed.
    pub async fn record(&self, activity: &PaymentActivity) -> Result<AuditRecord, AuditError> {
        let mut state = self.state.lock().await;
        if state.disabled {
            return Err(AuditError::Disabled {
                message: "an earlier append could not be rolled back".into(),
                context: None,
            });
        }

        let mut record = AuditRecord {
            sequence: state.next_sequence,
            timestamp: Utc::now(),
            event: activity.kind.clone(),
            provider: activity.provider,
            email: activity.email.clone(),
            amount_cents: activity.amount_cents,
            currency: activity.currency.clone(),
            reference: activity.reference.clone(),
            digest: String::new(),
        };
        record.digest = record.chained_digest(&state.last_digest).context("Failed to hash record")?;

        if let Some(file) = state.file.as_mut() {
            let mut line = serde_json::to_vec(&record).context("Failed to encode record")?;
            line.push(b'\n');
            let start = file.metadata().await.context("Failed to inspect audit file")?.len();

            if let Err(source) = append_line(file, &line).await {
                if let Err(e) = truncate(file, start).await {
                    error!(error = %e, sequence = record.sequence, "Audit rollback failed, trail disabled");
                    state.disabled = true;
                }
                return Err(AuditError::Io {
                    source,
                    context: Some(format!("Failed to append record {}", record.sequence).into()),
                });
            }
        }

        state.next_sequence += 1;
        state.last_digest.clone_from(&record.digest);
        state.window.push_back(record.clone());
        while state.window.len() > self.capacity {
            state.window.pop_front();
        }

        debug!(
            sequence = record.sequence,
            event = %record.event,
            provider = %record.provider,
            "Audit record appended"
        );
        Ok(record)
    }

    /// Up to `n` of the newest records, oldest first.
    pub async fn recent(&self, n: usize) -> Vec<AuditRecord> {
        let state = self.state.lock().await;
        let skip = state.window.len().saturating_sub(n);
        state.window.iter().skip(skip).cloned().collect()
    }

    /// Number of records written since the trail started, including earlier runs.
    pub async fn len(&self) -> u64 {
        self.state.lock().await.next_sequence
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

async fn append_line(file: &mut File, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line).await?;
    file.flush().await
}

async fn truncate(file: &mut File, len: u64) -> std::io::Result<()> {
    file.set_len(len).await?;
    file.flush().await
}

async fn read_records(path: &Path) -> Result<Vec<AuditRecord>, AuditError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .context(format!("Failed to create {}", parent.display()))?;
    }

    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(AuditError::Io {
                source,
                context: Some(format!("Failed to read {}", path.display()).into()),
            });
        },
    };

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .enumerate()
        .map(|(n, line)| {
            serde_json::from_str(line).context(format!("Invalid record on line {}", n + 1))
        })
        .collect()
}

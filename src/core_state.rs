//! Shared server state.
//!
//! `CoreState` is wrapped in `Arc` at startup and handed to every
//! handler through `ApiContext`. Handlers open their own SQLite
//! connection per request; the only in-process mutable state is the
//! audit buffer (and the rate limiter, which lives with the API types).

use std::path::PathBuf;
use std::sync::Mutex;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::config::{self, BootstrapAdmin, ServerConfig};
use crate::crypto::{self, PasswordError};
use crate::db::{self, AuditEntry, SeededTenant};

/// Maximum audit buffer size before flush.
const AUDIT_BUFFER_CAPACITY: usize = 100;

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    /// SQLite file every request connection opens.
    pub db_path: PathBuf,
    /// SHA-256 of the configured API key; the key itself is not kept.
    api_key_hash: [u8; 32],
    /// Lifetime of a bearer session.
    pub session_ttl: chrono::Duration,
    audit: AuditLogger,
}

impl CoreState {
    pub fn new(db_path: PathBuf, api_key: &str, session_ttl_hours: i64) -> Self {
        Self {
            db_path,
            api_key_hash: Sha256::digest(api_key.as_bytes()).into(),
            session_ttl: chrono::Duration::hours(session_ttl_hours),
            audit: AuditLogger::new(),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.db_path.clone(), &config.api_key, config.session_ttl_hours)
    }

    /// Open a connection to the clinic database (migrations run on open).
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_database(&self.db_path).map_err(CoreError::Database)
    }

    /// Constant-time check of a presented API key.
    pub fn api_key_matches(&self, presented: &str) -> bool {
        let presented: [u8; 32] = Sha256::digest(presented.as_bytes()).into();
        bool::from(presented.ct_eq(&self.api_key_hash))
    }

    /// Seed the first tenant and its admin when the database has no users.
    pub fn bootstrap(&self, admin: &BootstrapAdmin) -> Result<Option<SeededTenant>, CoreError> {
        let conn = self.open_db()?;
        if db::count_users(&conn)? > 0 {
            return Ok(None);
        }
        let hash = crypto::hash_password(&admin.password)?;
        let seeded = db::bootstrap_admin(&conn, &admin.email, &hash)?;
        if let Some(seeded) = &seeded {
            tracing::info!(clinic_id = %seeded.clinic_id, user_id = %seeded.admin_id, "Bootstrap admin created");
        }
        Ok(seeded)
    }

    // ── Audit logging ───────────────────────────────────────

    /// Log an access event. Auto-flushes to DB when buffer is full.
    pub fn log_access(&self, entry: AuditEntry) {
        let needs_flush = self.audit.log(entry);
        if needs_flush {
            if let Err(e) = self.flush_and_prune_audit() {
                tracing::warn!("Auto-flush audit failed: {e}");
            }
        }
    }

    /// Get the current audit buffer contents.
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.entries()
    }

    /// Flush audit buffer to DB and prune entries past the retention window.
    pub fn flush_and_prune_audit(&self) -> Result<usize, CoreError> {
        let conn = self.open_db()?;
        let flushed = self.audit.flush_to_db(&conn)?;
        if let Err(e) = db::prune_audit_log(&conn, config::AUDIT_RETENTION_DAYS) {
            tracing::warn!("Failed to prune audit log: {e}");
        }
        Ok(flushed)
    }
}

// ═══════════════════════════════════════════════════════════
// Error types
// ═══════════════════════════════════════════════════════════

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Password error: {0}")]
    Password(#[from] PasswordError),
}

// ═══════════════════════════════════════════════════════════
// Audit logger
// ═══════════════════════════════════════════════════════════

/// In-memory audit log buffer. Entries are flushed to SQLite
/// when the buffer reaches capacity or on explicit flush.
pub struct AuditLogger {
    buffer: Mutex<Vec<AuditEntry>>,
}

impl AuditLogger {
    pub fn new() -> Self {
        Self {
            buffer: Mutex::new(Vec::with_capacity(AUDIT_BUFFER_CAPACITY)),
        }
    }

    /// Log an access event to the in-memory buffer.
    /// Returns `true` if the buffer has reached flush threshold.
    pub fn log(&self, entry: AuditEntry) -> bool {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.push(entry);
            buf.len() >= AUDIT_BUFFER_CAPACITY
        } else {
            false
        }
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.buffer
            .lock()
            .map(|buf| buf.clone())
            .unwrap_or_default()
    }

    /// Drain all buffered entries (for flush to SQLite).
    pub fn drain(&self) -> Vec<AuditEntry> {
        self.buffer
            .lock()
            .map(|mut buf| buf.drain(..).collect())
            .unwrap_or_default()
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.lock().map(|buf| buf.len()).unwrap_or(0)
    }

    /// Write buffered entries to SQLite. A failed insert puts them back.
    pub fn flush_to_db(&self, conn: &rusqlite::Connection) -> Result<usize, CoreError> {
        let entries = self.drain();
        if entries.is_empty() {
            return Ok(0);
        }

        if let Err(e) = db::insert_audit_entries(conn, &entries) {
            if let Ok(mut buf) = self.buffer.lock() {
                let newer = std::mem::take(&mut *buf);
                *buf = entries;
                buf.extend(newer);
            }
            return Err(e.into());
        }

        let count = entries.len();
        tracing::debug!(count, "Flushed audit entries to database");
        Ok(count)
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

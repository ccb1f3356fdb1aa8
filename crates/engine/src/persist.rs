//! Session-scoped output persistence.
//!
//! Each session writes into `output_root/{session_id}`. Saving goes through a
//! `.part` sibling and a rename; a locked or unwritable target gets one retry
//! at a timestamp-suffixed name before the failure is reported with every
//! attempted path.

use chrono::{Local, NaiveDateTime};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tcfd_core::{Error, Result};
use tcfd_pptx::{Deck, PptxWriter};
use uuid::Uuid;

/// Name of the deck inside a session directory.
pub const STANDARD_FILENAME: &str = "TCFD_table.pptx";

/// Default root for session directories.
pub const DEFAULT_OUTPUT_ROOT: &str = "output";

/// Sessions idle for longer than this are eligible for cleanup.
pub const SESSION_MAX_AGE: Duration = Duration::from_secs(2 * 60 * 60);

/// Files smaller than this are suspicious but still returned.
const MIN_EXPECTED_BYTES: u64 = 1024;

/// Directory under the system temp dir used when the output root is unusable.
const TEMP_SUBDIR: &str = "tcfd-report";

/// Identity of one user workflow and where its output lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    session_id: String,
    output_root: PathBuf,
    filename: String,
}

impl SessionContext {
    /// Start a new session with a fresh random id.
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            output_root: output_root.into(),
            filename: STANDARD_FILENAME.to_string(),
        }
    }

    /// Resume a session from an id the caller kept.
    pub fn resume(session_id: impl Into<String>, output_root: impl Into<PathBuf>) -> Result<Self> {
        let session_id = session_id.into();
        validate_component(&session_id, "session id")?;
        Ok(Self {
            session_id,
            output_root: output_root.into(),
            filename: STANDARD_FILENAME.to_string(),
        })
    }

    /// Use a different standard filename.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Result<Self> {
        let filename = filename.into();
        validate_component(&filename, "filename")?;
        self.filename = filename;
        Ok(self)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Create (if needed) and return the session directory.
    ///
    /// Falls back to a directory under the system temp dir when the output
    /// root cannot be used. Calling this repeatedly returns the same path.
    pub fn resolve_dir(&self) -> Result<PathBuf> {
        let primary = self.primary_dir();
        let primary_err = match fs::create_dir_all(&primary) {
            Ok(()) => return Ok(primary),
            Err(e) => e,
        };
        log::warn!(
            "Cannot create session directory {}: {}",
            primary.display(),
            primary_err
        );

        let fallback = self.fallback_dir();
        match fs::create_dir_all(&fallback) {
            Ok(()) => {
                log::info!("Using fallback session directory {}", fallback.display());
                Ok(fallback)
            }
            Err(e) => Err(Error::Persistence {
                attempted: vec![primary, fallback],
                message: format!("cannot create session directory: {}; {}", primary_err, e),
            }),
        }
    }

    /// Resolve where this session's deck should be written.
    pub fn resolve_path(&self) -> Result<OutputDescriptor> {
        Ok(OutputDescriptor {
            session_id: self.session_id.clone(),
            directory: self.resolve_dir()?,
            filename: self.filename.clone(),
        })
    }

    /// Mark the session as active so cleanup leaves it alone.
    ///
    /// Refreshes whichever directory `resolve_dir` settled on.
    pub fn touch_activity(&self) {
        let primary = self.primary_dir();
        if primary.is_dir() {
            touch_dir(&primary);
        } else {
            touch_dir(&self.fallback_dir());
        }
    }

    fn primary_dir(&self) -> PathBuf {
        self.output_root.join(&self.session_id)
    }

    fn fallback_dir(&self) -> PathBuf {
        std::env::temp_dir().join(TEMP_SUBDIR).join(&self.session_id)
    }
}

/// Refresh a session directory's modification time.
pub fn touch_dir(dir: &Path) {
    if let Err(e) = File::open(dir).and_then(|f| f.set_modified(SystemTime::now())) {
        log::debug!("Could not refresh activity on {}: {}", dir.display(), e);
    }
}

/// Where a deck will be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDescriptor {
    pub session_id: String,
    pub directory: PathBuf,
    pub filename: String,
}

impl OutputDescriptor {
    /// The standard target path.
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.filename)
    }

    /// The alternate path used when the standard one is locked.
    pub fn alternate_path(&self, at: &NaiveDateTime) -> PathBuf {
        self.directory.join(timestamped_name(&self.filename, at))
    }
}

/// Serialise and save a deck, returning the path actually written.
pub fn save(deck: &Deck, descriptor: &OutputDescriptor) -> Result<PathBuf> {
    let bytes = PptxWriter::new().to_bytes(deck)?;
    save_bytes(&bytes, descriptor)
}

/// Save an already serialised deck with one retry at an alternate name.
pub fn save_bytes(bytes: &[u8], descriptor: &OutputDescriptor) -> Result<PathBuf> {
    let primary = descriptor.path();
    let primary_err = match write_via_part(&primary, bytes) {
        Ok(()) => return verify(primary),
        Err(e) => e,
    };
    log::warn!(
        "Cannot write {} ({}); retrying under a timestamped name",
        primary.display(),
        primary_err
    );

    let alternate = first_unused(descriptor.alternate_path(&Local::now().naive_local()));
    match write_via_part(&alternate, bytes) {
        Ok(()) => verify(alternate),
        Err(e) => Err(Error::Persistence {
            attempted: vec![primary, alternate],
            message: format!("cannot write deck: {}; {}", primary_err, e),
        }),
    }
}

/// Remove session directories under `output_root` idle for longer than `max_age`.
///
/// Returns how many were removed. Failures are logged and skipped.
pub fn cleanup_expired_sessions(output_root: &Path, max_age: Duration) -> usize {
    let entries = match fs::read_dir(output_root) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Nothing to clean under {}: {}", output_root.display(), e);
            return 0;
        }
    };

    let now = SystemTime::now();
    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let modified = match entry.metadata().and_then(|m| {
            if m.is_dir() {
                m.modified()
            } else {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "not a directory"))
            }
        }) {
            Ok(modified) => modified,
            Err(_) => continue,
        };

        let idle = now.duration_since(modified).unwrap_or_default();
        if idle <= max_age {
            continue;
        }
        match fs::remove_dir_all(&path) {
            Ok(()) => {
                log::info!("Removed expired session {}", path.display());
                removed += 1;
            }
            Err(e) => log::warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
    removed
}

fn write_via_part(target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut part = target.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);

    let result = File::create(&part)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&part, target));
    if result.is_err() {
        let _ = fs::remove_file(&part);
    }
    result
}

fn verify(path: PathBuf) -> Result<PathBuf> {
    let size = fs::metadata(&path)
        .map_err(|e| Error::Persistence {
            attempted: vec![path.clone()],
            message: format!("written file cannot be read back: {}", e),
        })?
        .len();
    if size < MIN_EXPECTED_BYTES {
        log::warn!(
            "{} is only {} bytes; the deck may be incomplete",
            path.display(),
            size
        );
    } else {
        log::debug!("Saved {} ({} bytes)", path.display(), size);
    }
    Ok(path)
}

/// `{stem}_{YYYYmmdd_HHMMSS}{ext}`.
fn timestamped_name(filename: &str, at: &NaiveDateTime) -> String {
    suffixed_name(filename, &at.format("%Y%m%d_%H%M%S").to_string())
}

/// `{stem}_{suffix}{ext}`.
fn suffixed_name(filename: &str, suffix: &str) -> String {
    match filename.rfind('.') {
        Some(dot) if dot > 0 => format!("{}_{}{}", &filename[..dot], suffix, &filename[dot..]),
        _ => format!("{}_{}", filename, suffix),
    }
}

/// `path`, or `path` with a counter suffix when something already sits there.
///
/// Alternate names only have second resolution; the counter keeps a second
/// locked-file save within the same second from replacing the first.
fn first_unused(path: PathBuf) -> PathBuf {
    if !path.exists() {
        return path;
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut n = 1u32;
    loop {
        let candidate = path.with_file_name(suffixed_name(&name, &n.to_string()));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

fn validate_component(value: &str, what: &str) -> Result<()> {
    let bad = value.trim().is_empty()
        || value == "."
        || value.contains("..")
        || value.contains('/')
        || value.contains('\\')
        || value.contains('\0');
    if bad {
        return Err(Error::Configuration(format!(
            "invalid {} '{}': must be a single path component",
            what, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    #[test]
    fn test_timestamped_name() {
        assert_eq!(
            timestamped_name("TCFD_table.pptx", &at()),
            "TCFD_table_20240309_140507.pptx"
        );
        assert_eq!(timestamped_name("deck", &at()), "deck_20240309_140507");
    }

    #[test]
    fn test_first_unused_adds_counter() {
        let dir = tempfile::tempdir().unwrap();
        let taken = dir.path().join("TCFD_table_20240309_140507.pptx");
        assert_eq!(first_unused(taken.clone()), taken);

        fs::write(&taken, b"x").unwrap();
        fs::write(dir.path().join("TCFD_table_20240309_140507_1.pptx"), b"x").unwrap();
        assert_eq!(
            first_unused(taken),
            dir.path().join("TCFD_table_20240309_140507_2.pptx")
        );
    }

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionContext::new("out");
        let b = SessionContext::new("out");
        assert_ne!(a.session_id(), b.session_id());
    }

    #[test]
    fn test_resume_rejects_path_components() {
        for bad in ["", "../x", "a/b", "a\\b", ".", ".."] {
            assert!(SessionContext::resume(bad, "out").is_err(), "{bad:?}");
        }
        assert!(SessionContext::resume("3f2a-session", "out").is_ok());
    }

    #[test]
    fn test_with_filename_validated() {
        let session = SessionContext::new("out");
        assert!(session.clone().with_filename("../evil.pptx").is_err());
        assert!(session.with_filename("report.pptx").is_ok());
    }

    #[test]
    fn test_alternate_path() {
        let descriptor = OutputDescriptor {
            session_id: "s".into(),
            directory: PathBuf::from("out/s"),
            filename: STANDARD_FILENAME.into(),
        };
        assert_eq!(descriptor.path(), PathBuf::from("out/s/TCFD_table.pptx"));
        assert_eq!(
            descriptor.alternate_path(&at()),
            PathBuf::from("out/s/TCFD_table_20240309_140507.pptx")
        );
    }
}

//! Startup endpoint announcement
//!
//! On TCP startup the server publishes one line telling launch tooling where
//! it ended up listening (the port is only known after binding when port 0
//! was requested). The line format is parsed by existing launcher scripts
//! and must stay bit-for-bit stable.

use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use tracing::info;

use super::ServerError;

/// Leading token of the announcement line; legacy launcher compatibility
pub const ANNOUNCEMENT_TAG: &str = "PLEARN_SERVER_TCP";

/// The published `(hostname, port, pid)` triple
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub hostname: String,
    pub port: u16,
    pub pid: u32,
}

impl Announcement {
    /// Announcement for this process listening on `port`
    pub fn local(port: u16) -> Result<Self, ServerError> {
        let hostname = hostname::get()
            .map_err(|e| ServerError::Announce {
                target: "hostname".to_string(),
                source: e,
            })?
            .to_string_lossy()
            .into_owned();

        Ok(Self {
            hostname,
            port,
            pid: std::process::id(),
        })
    }

    /// Parse a line previously produced by [`fmt::Display`]
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.trim_end_matches('\n').split(' ');
        if fields.next()? != ANNOUNCEMENT_TAG {
            return None;
        }
        let hostname = fields.next()?.to_string();
        let port = fields.next()?.parse().ok()?;
        let pid = fields.next()?.parse().ok()?;
        if fields.next().is_some() {
            return None;
        }
        Some(Self {
            hostname,
            port,
            pid,
        })
    }

    /// Atomically publish the announcement to `path`
    ///
    /// The line is written to `<path>.tmp` and renamed over `<path>`, so a
    /// reader never observes a partially written file.
    pub async fn write_to_file(&self, path: &Path) -> Result<(), ServerError> {
        let announce_error = |source| ServerError::Announce {
            target: path.display().to_string(),
            source,
        };

        let mut tmp_name: OsString = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = Path::new(&tmp_name);

        tokio::fs::write(tmp_path, format!("{self}\n"))
            .await
            .map_err(announce_error)?;
        tokio::fs::rename(tmp_path, path)
            .await
            .map_err(announce_error)?;

        info!(path = %path.display(), announcement = %self, "Published announcement file");
        Ok(())
    }

    /// Publish the announcement on standard output
    pub fn write_to_stdout(&self) {
        println!("{self}");
    }
}

impl fmt::Display for Announcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{ANNOUNCEMENT_TAG} {} {} {}",
            self.hostname, self.port, self.pid
        )
    }
}

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::Error;

const HEARTBEAT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f%z";

/// Parses the timestamp written by the cluster monitor into its heartbeat file,
/// e.g. `2020-07-30 19:34:02.613338+0000`. RFC 3339 timestamps are accepted as well.
pub fn parse_heartbeat(content: &str) -> crate::Result<DateTime<Utc>> {
    let content = content.trim();
    DateTime::parse_from_str(content, HEARTBEAT_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(content))
        .map(|time| time.with_timezone(&Utc))
        .map_err(|e| Error::HeartbeatError(format!("cannot parse heartbeat `{content}`: {e}")))
}

pub fn read_heartbeat(path: &Path) -> crate::Result<DateTime<Utc>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::HeartbeatError(format!("cannot read heartbeat file {}: {e}", path.display()))
    })?;
    parse_heartbeat(&content)
}

/// Checks that the cluster monitor heartbeat at `path` is not older than `timeout`.
pub fn is_heartbeat_valid(now: DateTime<Utc>, timeout: Duration, path: &Path) -> crate::Result<bool> {
    let heartbeat = read_heartbeat(path)?;
    let timeout = chrono::Duration::from_std(timeout)
        .map_err(|e| Error::HeartbeatError(format!("invalid timeout: {e}")))?;
    let valid = now - heartbeat <= timeout;
    if !valid {
        log::info!("Latest heartbeat from clustermgtd: {heartbeat}");
    }
    Ok(valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    fn heartbeat_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    #[test]
    fn test_parse_heartbeat_clustermgtd_format() {
        let time = parse_heartbeat("2020-07-30 19:34:02.613338+0000\n").unwrap();
        assert_eq!(
            time,
            Utc.with_ymd_and_hms(2020, 7, 30, 19, 34, 2).unwrap()
                + chrono::Duration::microseconds(613338)
        );
    }

    #[test]
    fn test_parse_heartbeat_rfc3339() {
        let time = parse_heartbeat("2020-07-30T19:34:02+00:00").unwrap();
        assert_eq!(time, Utc.with_ymd_and_hms(2020, 7, 30, 19, 34, 2).unwrap());
    }

    #[test]
    fn test_parse_heartbeat_invalid() {
        assert!(parse_heartbeat("not a time").is_err());
    }

    #[test]
    fn test_heartbeat_valid() {
        let file = heartbeat_file("2020-07-30 19:34:02.000000+0000");
        let now = Utc.with_ymd_and_hms(2020, 7, 30, 19, 36, 2).unwrap();
        assert!(is_heartbeat_valid(now, Duration::from_secs(300), file.path()).unwrap());
    }

    #[test]
    fn test_heartbeat_stale() {
        let file = heartbeat_file("2020-07-30 19:34:02.000000+0000");
        let now = Utc.with_ymd_and_hms(2020, 7, 30, 19, 44, 2).unwrap();
        assert!(!is_heartbeat_valid(now, Duration::from_secs(300), file.path()).unwrap());
    }

    #[test]
    fn test_heartbeat_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc.with_ymd_and_hms(2020, 7, 30, 19, 44, 2).unwrap();
        assert!(is_heartbeat_valid(now, Duration::from_secs(300), &dir.path().join("x")).is_err());
    }
}

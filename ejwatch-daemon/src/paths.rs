//! File naming conventions shared with downstream consumers.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

/// `strftime` pattern for archive timestamps.
pub const DUMP_TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";
pub const DUMP_PREFIX: &str = "EJ_dump_";
pub const LOG_EXTENSION: &str = "log";

/// Suffix appended to in-flight copies before they are renamed into place.
pub const PARTIAL_SUFFIX: &str = "ejwatch.tmp";

/// `<dump_directory>/EJ_dump_<YYYY_MM_DD_HH_MM_SS>.log`, or with `_<n>`
/// before the extension when `attempt > 0`.
pub fn dump_path(dump_directory: &Path, at: NaiveDateTime, attempt: u32) -> PathBuf {
    let stamp = at.format(DUMP_TIMESTAMP_FORMAT);
    let name = if attempt == 0 {
        format!("{DUMP_PREFIX}{stamp}.{LOG_EXTENSION}")
    } else {
        format!("{DUMP_PREFIX}{stamp}_{attempt}.{LOG_EXTENSION}")
    };
    dump_directory.join(name)
}

/// `<path>.ejwatch.tmp` next to `path`.
pub fn partial_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{name}.{PARTIAL_SUFFIX}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 2)
            .unwrap()
            .and_hms_opt(0, 0, 7)
            .unwrap()
    }

    #[test]
    fn dump_name_matches_convention() {
        assert_eq!(
            dump_path(Path::new("/dump"), at(), 0),
            PathBuf::from("/dump/EJ_dump_2024_05_02_00_00_07.log")
        );
        assert_eq!(
            dump_path(Path::new("/dump"), at(), 2),
            PathBuf::from("/dump/EJ_dump_2024_05_02_00_00_07_2.log")
        );
    }

    #[test]
    fn partial_path_is_sibling() {
        assert_eq!(
            partial_path(Path::new("/dest/2024_05_01_T42.log")),
            PathBuf::from("/dest/2024_05_01_T42.log.ejwatch.tmp")
        );
    }
}

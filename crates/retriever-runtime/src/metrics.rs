//! Append-only run log.
//!
//! One line per finished mission holding the elapsed wall-clock time in
//! seconds, so successive runs can be compared with nothing more than `cat`.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use tracing::debug;

/// Append `elapsed` (seconds) as a single line to `path`, creating the file
/// if it does not exist yet.
///
/// # Errors
///
/// Any I/O error from opening or writing the file.
pub fn append_elapsed(path: &Path, elapsed: Duration) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", elapsed.as_secs_f64())?;
    debug!(path = %path.display(), elapsed_s = elapsed.as_secs_f64(), "run time appended");
    Ok(())
}

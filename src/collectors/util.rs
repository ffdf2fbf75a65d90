//! Shared collector utilities: the connected server's version, detected once
//! at startup and used by the orchestrator to decide which collectors can run
//! against this server.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Server version number (e.g. `80_036` for MySQL 8.0.36), set once at
/// startup after the first successful connection.
static SERVER_VERSION: OnceCell<i32> = OnceCell::new();

/// Set the server version. Call this once during startup after connecting.
pub fn set_server_version(version: i32) {
    let _ = SERVER_VERSION.set(version);
}

/// Get the server version number. Returns 0 when the version has not been
/// detected.
#[inline]
pub fn get_server_version() -> i32 {
    SERVER_VERSION.get().copied().unwrap_or(0)
}

/// Check if the server version is at least the specified minimum.
#[inline]
#[must_use]
pub fn is_server_version_at_least(min_version: i32) -> bool {
    get_server_version() >= min_version
}

/// Parse a server version string into an integer
/// (e.g. "8.0.36-debug" -> 80036). Returns 0 if parsing fails.
#[must_use]
pub fn parse_server_version(version_string: &str) -> i32 {
    let (_, num) = normalize_server_version(version_string);
    #[allow(clippy::cast_possible_truncation)]
    let res = num as i32;
    res
}

/// Parse and normalize a server version string.
/// Returns a tuple of (`normalized_string`, `version_number`).
/// e.g. "8.0.36-debug" -> ("8.0.36", 80036)
///      "8.4" -> ("8.4.0", 80400)
///
/// # Panics
///
/// Panics if the regex cannot be compiled (should never happen).
#[must_use]
pub fn normalize_server_version(version_string: &str) -> (String, i64) {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"^(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("valid version pattern")
    });

    if let Some(caps) = re.captures(version_string) {
        let major = caps
            .get(1)
            .map_or(0, |m| m.as_str().parse::<i64>().unwrap_or(0));
        let minor = caps
            .get(2)
            .map_or(0, |m| m.as_str().parse::<i64>().unwrap_or(0));
        let patch = caps
            .get(3)
            .map_or(0, |m| m.as_str().parse::<i64>().unwrap_or(0));

        let normalized = format!("{major}.{minor}.{patch}");
        let num = major * 10000 + minor * 100 + patch;

        (normalized, num)
    } else {
        ("0.0.0".to_string(), 0)
    }
}

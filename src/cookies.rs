//! Cookie seeding for the page fetcher.
//!
//! Some source sites sit behind anti-bot checks that are easiest to pass in a
//! real browser. Cookies exported from that browser as Netscape cookie files
//! are loaded into the fetcher's jar so later requests continue the session.

use reqwest::Url;
use reqwest::cookie::Jar;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// One line of a Netscape cookie file.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NetscapeCookie {
    domain: String,
    include_subdomains: bool,
    path: String,
    secure: bool,
    /// `None` for session cookies (expiry `0` in the file).
    expires_unix: Option<u64>,
    name: String,
    value: String,
    http_only: bool,
}

impl NetscapeCookie {
    fn is_live(&self, now_unix: u64) -> bool {
        self.expires_unix.is_none_or(|ts| ts > now_unix)
    }

    /// Renders the cookie as a `Set-Cookie` value and the URL it belongs to.
    fn to_set_cookie(&self) -> Result<(String, Url), CookieError> {
        let host = self.domain.trim_start_matches('.');
        if host.is_empty() {
            return Err(CookieError::InvalidDomain(self.domain.clone()));
        }
        let url = Url::parse(&format!("https://{}/", host))
            .map_err(|_| CookieError::InvalidDomain(self.domain.clone()))?;

        let mut attrs = vec![format!("{}={}", self.name, self.value), format!("Path={}", self.path)];
        if self.include_subdomains {
            attrs.push(format!("Domain={}", self.domain));
        }
        if self.secure {
            attrs.push("Secure".to_string());
        }
        if self.http_only {
            attrs.push("HttpOnly".to_string());
        }
        Ok((attrs.join("; "), url))
    }
}

impl FromStr for NetscapeCookie {
    type Err = CookieError;

    /// Parses one non-comment line. `#HttpOnly_` prefixed lines are cookies,
    /// not comments.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (http_only, line) = match line.strip_prefix("#HttpOnly_") {
            Some(rest) => (true, rest),
            None => (false, line),
        };

        let fields: Vec<&str> = line.splitn(7, '\t').collect();
        let [domain, subdomains, path, secure, expires, name, value] = fields[..] else {
            return Err(CookieError::InvalidLine(line.to_string()));
        };
        let flag = |s: &str| s.eq_ignore_ascii_case("true");

        Ok(Self {
            domain: domain.to_string(),
            include_subdomains: flag(subdomains),
            path: path.to_string(),
            secure: flag(secure),
            expires_unix: expires.parse::<u64>().ok().filter(|ts| *ts != 0),
            name: name.to_string(),
            value: value.to_string(),
            http_only,
        })
    }
}

/// Errors that can occur while loading cookies.
#[derive(Error, Debug)]
pub enum CookieError {
    /// Failed to read or walk the filesystem.
    #[error("Failed to read cookie file: {0}")]
    Io(#[from] std::io::Error),

    /// Cookie file contains an invalid line.
    #[error("Invalid Netscape cookie line: {0}")]
    InvalidLine(String),

    /// Cookie domain could not be converted into a URL.
    #[error("Invalid cookie domain: {0}")]
    InvalidDomain(String),
}

/// Loads every `*.txt` cookie file under `dir` into `jar`.
///
/// Expired cookies are skipped. Returns the files that were loaded, sorted
/// by path so the load order is stable.
pub fn seed_jar_from_dir(jar: &Jar, dir: &Path, now_unix: u64) -> Result<Vec<PathBuf>, CookieError> {
    let mut files = Vec::new();
    collect_cookie_files(dir, &mut files)?;
    files.sort();

    for path in &files {
        let content = std::fs::read_to_string(path)?;
        for cookie in parse_netscape_cookies(&content)? {
            if cookie.is_live(now_unix) {
                let (set_cookie, url) = cookie.to_set_cookie()?;
                jar.add_cookie_str(&set_cookie, &url);
            }
        }
    }

    Ok(files)
}

fn collect_cookie_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), std::io::Error> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_cookie_files(&path, files)?;
            continue;
        }

        let is_txt = path
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
        if is_txt {
            files.push(path);
        }
    }

    Ok(())
}

fn parse_netscape_cookies(content: &str) -> Result<Vec<NetscapeCookie>, CookieError> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| line.starts_with("#HttpOnly_") || !line.starts_with('#'))
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::cookie::CookieStore;
    use tempfile::TempDir;

    #[test]
    fn test_parse_netscape_cookies() {
        let content = "# Netscape HTTP Cookie File\n\
.69shuba.com\tTRUE\t/\tTRUE\t2145916800\tcf_clearance\tabc123\n\
\n\
#HttpOnly_www.69shuba.com\tFALSE\t/\tFALSE\t0\tsession\tidvalue\n";

        let cookies = parse_netscape_cookies(content).unwrap();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].domain, ".69shuba.com");
        assert!(cookies[0].include_subdomains);
        assert!(cookies[0].secure);
        assert_eq!(cookies[0].name, "cf_clearance");
        assert_eq!(cookies[0].expires_unix, Some(2145916800));
        assert!(!cookies[0].http_only);

        assert!(!cookies[1].include_subdomains);
        assert_eq!(cookies[1].value, "idvalue");
        assert!(cookies[1].http_only);
        assert!(cookies[1].is_live(u64::MAX));
    }

    #[test]
    fn test_set_cookie_rendering() {
        let cookie: NetscapeCookie = ".twkan.com\tTRUE\t/\tTRUE\t0\tcf\tx".parse().unwrap();
        let (set_cookie, url) = cookie.to_set_cookie().unwrap();
        assert_eq!(set_cookie, "cf=x; Path=/; Domain=.twkan.com; Secure");
        assert_eq!(url.as_str(), "https://twkan.com/");
    }

    #[test]
    fn test_parse_invalid_line() {
        let err = parse_netscape_cookies("invalid-line").unwrap_err();
        assert!(err.to_string().contains("Invalid Netscape cookie line"));
    }

    #[test]
    fn test_seed_jar_skips_expired_and_non_txt() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("twkan");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(
            nested.join("cookies.txt"),
            "twkan.com\tFALSE\t/\tFALSE\t0\tlive\t1\n\
twkan.com\tFALSE\t/\tFALSE\t100\texpired\t1\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.md"), "not cookies").unwrap();

        let jar = Jar::default();
        let loaded = seed_jar_from_dir(&jar, dir.path(), 1_000).unwrap();
        assert_eq!(loaded, vec![nested.join("cookies.txt")]);

        let url = Url::parse("https://twkan.com/").unwrap();
        let header = jar.cookies(&url).unwrap();
        let header = header.to_str().unwrap();
        assert!(header.contains("live=1"));
        assert!(!header.contains("expired"));
    }
}

use crate::errors::{AppError, AppResult};

pub const PUBLIC_PATHS: [&str; 4] = ["/", "/login", "/signup", "/auth/callback"];

/// Percent-encodings that URL parsers downstream decode into path syntax.
const ENCODED_PATH_SYNTAX: [&str; 3] = ["%2e", "%2f", "%5c"];

/// True when `path` is already in the form every downstream URL parser will
/// keep: no `.`/`..` segments, no empty segments, no backslashes and no
/// encoded dots or separators. Prefix checks are only sound on such paths.
pub fn is_canonical_path(path: &str) -> bool {
    if !path.starts_with('/') || path.contains('\\') {
        return false;
    }

    let lowered = path.to_ascii_lowercase();
    if ENCODED_PATH_SYNTAX.iter().any(|encoded| lowered.contains(encoded)) {
        return false;
    }

    // a trailing slash is the only empty segment allowed
    let segments: Vec<&str> = path[1..].split('/').collect();
    let last = segments.len() - 1;
    segments.iter().enumerate().all(|(i, segment)| match *segment {
        "." | ".." => false,
        "" => i == last,
        _ => true,
    })
}

/// Decides which paths the authorization middleware evaluates at all.
#[derive(Debug, Clone)]
pub struct RouteMatcher {
    protected: Vec<String>,
    public: Vec<String>,
}

impl RouteMatcher {
    pub fn new<I, S>(protected: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut prefixes = Vec::new();
        for prefix in protected {
            let prefix: String = prefix.into();
            if !prefix.starts_with('/') {
                return Err(AppError::configuration(format!(
                    "protected prefix {prefix:?} must start with '/'"
                )));
            }
            prefixes.push(prefix.trim_end_matches('/').to_string());
        }

        Ok(Self {
            protected: prefixes,
            public: PUBLIC_PATHS.iter().map(|p| p.to_string()).collect(),
        })
    }

    pub fn is_public(&self, path: &str) -> bool {
        let path = trim_trailing_slash(path);
        self.public.iter().any(|public| public == path)
    }

    /// `/dashboard` covers `/dashboard` and everything under `/dashboard/`,
    /// but not `/dashboards`.
    pub fn is_protected(&self, path: &str) -> bool {
        self.protected.iter().any(|prefix| {
            prefix.is_empty()
                || path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    pub fn should_evaluate(&self, path: &str) -> bool {
        !self.is_public(path) && self.is_protected(path)
    }
}

fn trim_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

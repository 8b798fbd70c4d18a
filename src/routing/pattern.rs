//! Path pattern matching.
//!
//! # Responsibilities
//! - Exact path patterns (`/foo.html`)
//! - Wildcard patterns: `*` matches within one segment, `**` spans segments
//! - Mount prefixes for proxies (`/api/`)
//!
//! # Design Decisions
//! - Matching is case-sensitive
//! - A `/**` segment also matches zero segments: `/route/**` matches `/route`
//! - Trailing slashes are significant
//! - Wildcards are compiled to an anchored regex once, at load time

use regex::Regex;

/// A compiled path pattern.
#[derive(Debug, Clone)]
pub enum PathPattern {
    /// Matches one literal path.
    Exact(String),
    /// Matches any path the glob accepts.
    Wildcard { source: String, regex: Regex },
    /// Matches every path starting with the prefix.
    Mount(String),
}

impl PathPattern {
    /// Compile a rule pattern. Patterns without `*` are exact.
    pub fn compile(source: &str) -> Result<Self, regex::Error> {
        if !source.contains('*') {
            return Ok(PathPattern::Exact(source.to_string()));
        }
        let regex = Regex::new(&glob_to_regex(source))?;
        Ok(PathPattern::Wildcard {
            source: source.to_string(),
            regex,
        })
    }

    /// A proxy mount point.
    pub fn mount(prefix: impl Into<String>) -> Self {
        PathPattern::Mount(prefix.into())
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(p) => path == p,
            PathPattern::Wildcard { regex, .. } => regex.is_match(path),
            PathPattern::Mount(prefix) => path.starts_with(prefix.as_str()),
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, PathPattern::Exact(_))
    }

    /// The pattern as configured.
    pub fn as_str(&self) -> &str {
        match self {
            PathPattern::Exact(p) | PathPattern::Mount(p) => p,
            PathPattern::Wildcard { source, .. } => source,
        }
    }
}

fn glob_to_regex(glob: &str) -> String {
    let mut re = String::with_capacity(glob.len() * 2 + 2);
    re.push('^');

    let chars: Vec<char> = glob.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '*' && chars.get(i + 1) == Some(&'*') {
            let at_segment_start = i > 0 && chars[i - 1] == '/';
            let at_segment_end = matches!(chars.get(i + 2), None | Some('/'));
            if at_segment_start && at_segment_end {
                // "/**" covers the slash before it so that zero segments match.
                re.pop();
                re.push_str("(?:/.*)?");
            } else {
                re.push_str(".*");
            }
            i += 2;
            continue;
        }
        if c == '*' {
            re.push_str("[^/]*");
        } else {
            re.push_str(&regex::escape(&c.to_string()));
        }
        i += 1;
    }

    re.push('$');
    re
}

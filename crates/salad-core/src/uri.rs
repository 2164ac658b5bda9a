//! URI parsing, joining and quoting helpers
//!
//! [`UrlSplit`] decomposes a URI reference into the five generic components
//! (scheme, authority, path, query, fragment) without requiring it to be
//! absolute, which is what identifier scoping needs. Resolution of relative
//! references is delegated to the `url` crate.
//!
//! Copyright (c) 2025 Salad Runtime Team
//! Licensed under the Apache-2.0 license

use crate::error::ValidationError;
use std::path::Path;
use url::Url;

/// Schemes whose URIs always carry an authority section (`scheme://...`)
const USES_NETLOC: &[&str] = &[
    "file", "ftp", "http", "https", "ws", "wss", "git", "svn", "sftp", "nfs", "s3",
];

/// Five-part decomposition of a URI reference
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlSplit {
    pub scheme: String,
    pub netloc: String,
    pub path: String,
    pub query: String,
    pub fragment: String,
}

impl UrlSplit {
    /// Split a URI reference into its components.
    ///
    /// Never fails: anything that does not look like a scheme or authority is
    /// treated as path.
    pub fn parse(url: &str) -> Self {
        let mut rest = url;
        let mut scheme = String::new();

        if let Some(colon) = rest.find(':') {
            let candidate = &rest[..colon];
            let mut chars = candidate.chars();
            let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
            if valid {
                scheme = candidate.to_ascii_lowercase();
                rest = &rest[colon + 1..];
            }
        }

        let mut netloc = String::new();
        if let Some(after) = rest.strip_prefix("//") {
            let end = after.find(['/', '?', '#']).unwrap_or(after.len());
            netloc = after[..end].to_string();
            rest = &after[end..];
        }

        let (rest, fragment) = match rest.split_once('#') {
            Some((head, frag)) => (head, frag.to_string()),
            None => (rest, String::new()),
        };
        let (path, query) = match rest.split_once('?') {
            Some((head, query)) => (head.to_string(), query.to_string()),
            None => (rest.to_string(), String::new()),
        };

        Self {
            scheme,
            netloc,
            path,
            query,
            fragment,
        }
    }

    /// Reassemble the components into a URI string
    pub fn unsplit(&self) -> String {
        let mut url = self.path.clone();
        let wants_netloc = !self.netloc.is_empty()
            || (!self.scheme.is_empty()
                && USES_NETLOC.contains(&self.scheme.as_str())
                && !url.starts_with("//"));
        if wants_netloc {
            if !url.is_empty() && !url.starts_with('/') {
                url.insert(0, '/');
            }
            url = format!("//{}{}", self.netloc, url);
        }
        if !self.scheme.is_empty() {
            url = format!("{}:{}", self.scheme, url);
        }
        if !self.query.is_empty() {
            url.push('?');
            url.push_str(&self.query);
        }
        if !self.fragment.is_empty() {
            url.push('#');
            url.push_str(&self.fragment);
        }
        url
    }

    /// Check whether a non-empty fragment is present
    pub fn has_fragment(&self) -> bool {
        !self.fragment.is_empty()
    }
}

/// Split a URI reference into its components
pub fn split(url: &str) -> UrlSplit {
    UrlSplit::parse(url)
}

/// Reassemble URI components
pub fn unsplit(parts: &UrlSplit) -> String {
    parts.unsplit()
}

/// Split off the fragment, returning `(url_without_fragment, fragment)`
pub fn defrag(url: &str) -> (&str, &str) {
    url.split_once('#').unwrap_or((url, ""))
}

/// Resolve `url` against `base_url`.
///
/// Blank node identifiers (`_:...`) are returned unchanged. A `file:` reference
/// is refused when the base has any other scheme, so remote documents can
/// never pull in local files.
pub fn join_url(base_url: &str, url: &str) -> Result<String, ValidationError> {
    if url.starts_with("_:") {
        return Ok(url.to_string());
    }

    let base_scheme = split(base_url).scheme;
    let guarded = !base_scheme.is_empty() && base_scheme != "file";
    let refuse = || {
        ValidationError::new(format!(
            "Not resolving potential remote exploit {url} from base {base_url}"
        ))
    };
    if guarded && split(url).scheme == "file" {
        return Err(refuse());
    }

    let resolved = match Url::parse(base_url) {
        Ok(base) => base.join(url).ok(),
        Err(_) => Url::parse(url).ok(),
    };
    match resolved {
        // the url crate drops leading whitespace and embedded tabs or
        // newlines, so the scheme is checked again after resolution
        Some(resolved) if guarded && resolved.scheme() == "file" => Err(refuse()),
        Some(resolved) => Ok(resolved.into()),
        None => Ok(url.to_string()),
    }
}

/// Percent-encode everything except unreserved characters and `/`
pub fn quote(text: &str) -> String {
    text.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Decode percent escapes, replacing invalid UTF-8 sequences
pub fn unquote(text: &str) -> String {
    let bytes = urlencoding::decode_binary(text.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Convert a filesystem path into a `file://` URI.
///
/// With `split_frag`, anything after the first `#` is quoted separately and
/// kept as the fragment. Inputs that already are file URIs are returned as-is.
pub fn file_uri(path: &str, split_frag: bool) -> String {
    if path.starts_with("file://") {
        return path.to_string();
    }
    let (urlpath, frag) = match (split_frag, path.split_once('#')) {
        (true, Some((head, frag))) => (quote(head), format!("#{}", quote(frag))),
        _ => (quote(path), String::new()),
    };
    if urlpath.starts_with("//") {
        format!("file:{urlpath}{frag}")
    } else {
        format!("file://{urlpath}{frag}")
    }
}

/// File URI for a directory, with the trailing slash relative references need
pub fn directory_uri(dir: &Path) -> String {
    let mut uri = file_uri(&dir.to_string_lossy(), false);
    if !uri.ends_with('/') {
        uri.push('/');
    }
    uri
}

/// The last path segment of the fragment, or of the path if there is none
pub fn shortname(id: &str) -> String {
    let parts = split(id);
    let source = if parts.has_fragment() {
        &parts.fragment
    } else {
        &parts.path
    };
    source.rsplit('/').next().unwrap_or_default().to_string()
}

/// Contract `url` to `prefix:rest` using the first namespace it starts with
pub fn prefix_url<'a, I>(url: &str, namespaces: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    for (prefix, namespace) in namespaces {
        if let Some(rest) = url.strip_prefix(namespace.as_str()) {
            return format!("{prefix}:{rest}");
        }
    }
    url.to_string()
}

/// Convert an absolute URI back to the shortest form that re-expands to it
/// under the same scoping rules.
///
/// With a `ref_scope`, the fragment prefix that is stripped is the base
/// fragment minus its first `ref_scope` segments, matching how scoped
/// references are expanded.
pub fn save_relative_uri(
    uri: &str,
    base_url: &str,
    ref_scope: Option<usize>,
    relative_uris: bool,
) -> String {
    if !relative_uris || uri == base_url {
        return uri.to_string();
    }
    let uri_parts = split(uri);
    let base_parts = split(base_url);
    if uri_parts.scheme != base_parts.scheme || uri_parts.netloc != base_parts.netloc {
        return uri.to_string();
    }

    if uri_parts.path != base_parts.path {
        let mut relative = relpath(&uri_parts.path, dirname(&base_parts.path));
        if uri_parts.has_fragment() {
            relative.push('#');
            relative.push_str(&uri_parts.fragment);
        }
        return relative;
    }

    let base_frag = match ref_scope.filter(|scope| *scope > 0) {
        Some(scope) => {
            let kept: Vec<&str> = fragment_segments(&base_parts.fragment)
                .into_iter()
                .skip(scope)
                .collect();
            if kept.is_empty() {
                String::new()
            } else {
                format!("{}/", kept.join("/"))
            }
        }
        None => format!("{}/", base_parts.fragment),
    };

    match uri_parts.fragment.strip_prefix(base_frag.as_str()) {
        Some(rest) => rest.to_string(),
        None => uri_parts.fragment,
    }
}

/// Segments of a fragment path; an empty fragment has none
pub(crate) fn fragment_segments(fragment: &str) -> Vec<&str> {
    if fragment.is_empty() {
        Vec::new()
    } else {
        fragment.split('/').collect()
    }
}

fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Relative path from directory `start` to `path`, both `/`-separated
fn relpath(path: &str, start: &str) -> String {
    let target: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let origin: Vec<&str> = start.split('/').filter(|s| !s.is_empty()).collect();

    let common = target
        .iter()
        .zip(origin.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = std::iter::repeat("..").take(origin.len() - common).collect();
    parts.extend(&target[common..]);

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

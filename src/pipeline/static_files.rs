//! Static resolver.
//!
//! Lookup order for a request path:
//! 1. with `clean_urls`, an existing `*.html` file is redirected (301) to its
//!    extensionless alias
//! 2. the literal file
//! 3. with `clean_urls` and no extension, `path + ".html"`
//! 4. a directory holding `index.html`; without a trailing slash the client
//!    is first redirected to the slash-terminated path
//!
//! Nothing outside the canonical root is ever served.

use axum::http::StatusCode;
use percent_encoding::percent_decode_str;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::SiteError;
use crate::http::request::SiteRequest;
use crate::http::response::{absolute_location, Outcome, SiteResponse};
use crate::routing::router::RoutingTable;

const INDEX: &str = "index.html";
const HTML_EXT: &str = ".html";

/// Stage: Static.
pub fn resolve(table: &RoutingTable, request: &SiteRequest) -> Result<Option<Outcome>, SiteError> {
    let Some(relative) = decode_path(&request.path) else {
        return Ok(None);
    };
    let root = table.root();

    if table.clean_urls() {
        if let Some(stripped) = request.path.strip_suffix(HTML_EXT) {
            if !stripped.is_empty() && !stripped.ends_with('/') && find_file(root, &relative)?.is_some() {
                let target = with_query(stripped, request);
                return Ok(Some(redirect(request, &target)));
            }
        }
    }

    if let Some(file) = find_file(root, &relative)? {
        return serve_file(&file).map(|r| Some(Outcome::Reply(r)));
    }

    if table.clean_urls() && !relative.is_empty() && !relative.ends_with('/') && !has_extension(&relative) {
        if let Some(file) = find_file(root, &format!("{relative}{HTML_EXT}"))? {
            return serve_file(&file).map(|r| Some(Outcome::Reply(r)));
        }
    }

    if let Some(dir) = find_dir(root, &relative)? {
        let index = dir.join(INDEX);
        if !index.is_file() {
            return Ok(None);
        }
        if !request.path.ends_with('/') {
            let target = with_query(&format!("{}/", request.path), request);
            return Ok(Some(redirect(request, &target)));
        }
        return serve_file(&index).map(|r| Some(Outcome::Reply(r)));
    }

    Ok(None)
}

/// Serve `file`, relative to the root, as a route target would.
pub fn serve_relative(root: &Path, file: &str) -> Result<SiteResponse, SiteError> {
    let relative = file.trim_start_matches('/');
    match find_file(root, relative)? {
        Some(path) => serve_file(&path),
        None => Err(SiteError::FileSystem {
            path: root.join(relative),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file under root"),
        }),
    }
}

/// Read `path` into a 200 response with its content type.
pub fn serve_file(path: &Path) -> Result<SiteResponse, SiteError> {
    let body = std::fs::read(path).map_err(|source| SiteError::FileSystem {
        path: path.to_path_buf(),
        source,
    })?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    Ok(SiteResponse::content(StatusCode::OK, body, mime.as_ref()))
}

fn redirect(request: &SiteRequest, target: &str) -> Outcome {
    let location = absolute_location(request, target);
    Outcome::Reply(SiteResponse::redirect(StatusCode::MOVED_PERMANENTLY, &location))
}

fn with_query(path: &str, request: &SiteRequest) -> String {
    match &request.query {
        Some(q) => format!("{path}?{q}"),
        None => path.to_string(),
    }
}

/// Percent-decode the request path into a root-relative path.
///
/// Paths that could climb out of the root, or that are not valid UTF-8, are
/// rejected up front.
fn decode_path(path: &str) -> Option<String> {
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    if decoded.contains('\0') || decoded.contains('\\') {
        return None;
    }
    let relative = decoded.trim_start_matches('/').to_string();
    let safe = Path::new(&relative)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    safe.then_some(relative)
}

fn has_extension(relative: &str) -> bool {
    let last = relative.rsplit('/').next().unwrap_or(relative);
    last.contains('.')
}

fn find_file(root: &Path, relative: &str) -> Result<Option<PathBuf>, SiteError> {
    Ok(contained(root, relative)?.filter(|p| p.is_file()))
}

fn find_dir(root: &Path, relative: &str) -> Result<Option<PathBuf>, SiteError> {
    Ok(contained(root, relative)?.filter(|p| p.is_dir()))
}

/// Canonical path of `root/relative` if it exists inside the root.
fn contained(root: &Path, relative: &str) -> Result<Option<PathBuf>, SiteError> {
    let candidate = root.join(relative);
    match candidate.canonicalize() {
        Ok(path) if path.starts_with(root) => Ok(Some(path)),
        Ok(path) => {
            tracing::warn!(path = %path.display(), "Refusing to serve path outside root");
            Ok(None)
        }
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => Ok(None),
        Err(source) => Err(SiteError::FileSystem {
            path: candidate,
            source,
        }),
    }
}

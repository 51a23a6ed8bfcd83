/* src/server/core/rust/src/naming.rs */

// Entry naming, request path normalization and content hashing.

use sha2::{Digest, Sha256};

/// Longest slug kept in front of the hash suffix.
const MAX_SLUG_LEN: usize = 48;

/// Canonical form of a component path: forward slashes, no leading `./` or `/`.
pub fn normalize_component_path(path: &str) -> String {
  let unified = path.replace('\\', "/");
  let mut rest = unified.as_str();
  loop {
    if let Some(stripped) = rest.strip_prefix("./") {
      rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('/') {
      rest = stripped;
    } else {
      break;
    }
  }
  rest.to_string()
}

/// Derive the build entry name for a component path.
///
/// `src/pages/Blog Post.tsx` becomes `src_pages_blog_post_<8 hex>`. The slug
/// keeps names readable in the output tree; the hash of the full normalized
/// path (extension included) keeps `Post.tsx` and `Post.jsx` apart.
pub fn entry_name_for_path(component_path: &str) -> String {
  let normalized = normalize_component_path(component_path);
  let stem = match normalized.rfind('.') {
    Some(dot) if dot > normalized.rfind('/').map_or(0, |s| s + 1) => &normalized[..dot],
    _ => normalized.as_str(),
  };

  let mut slug = String::with_capacity(stem.len());
  for ch in stem.chars() {
    if ch.is_ascii_alphanumeric() {
      slug.push(ch.to_ascii_lowercase());
    } else if !slug.ends_with('_') {
      slug.push('_');
    }
  }
  let slug = slug.trim_matches('_');
  let slug = if slug.len() > MAX_SLUG_LEN { &slug[..MAX_SLUG_LEN] } else { slug };
  let slug = if slug.is_empty() { "page" } else { slug.trim_end_matches('_') };

  let digest = Sha256::digest(normalized.as_bytes());
  format!("{slug}_{}", &hex::encode(digest)[..8])
}

/// Normalize a request or static path: leading slash, no empty segments,
/// no trailing slash except for the root.
pub fn normalize_path(path: &str) -> String {
  let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
  if segments.is_empty() {
    return "/".to_string();
  }
  format!("/{}", segments.join("/"))
}

/// Reject paths a data loader must never produce.
pub fn validate_static_path(path: &str) -> Result<(), String> {
  if path.contains("..") {
    return Err("must not contain \"..\"".to_string());
  }
  for ch in ['*', '?', '#'] {
    if path.contains(ch) {
      return Err(format!("must not contain '{ch}'"));
    }
  }
  if path.chars().any(char::is_control) {
    return Err("must not contain control characters".to_string());
  }
  Ok(())
}

/// 64-bit content hash as 16 hex chars (first 8 bytes of SHA-256).
pub fn content_hash(bytes: &[u8]) -> String {
  let digest = Sha256::digest(bytes);
  hex::encode(&digest[..8])
}

/* src/cli/core/src/build/discover.rs */

// Page discovery: static scan of host sources, or the describe side channel.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use regex::Regex;
use tessera_server::PageMode;
use tessera_server::export::{DESCRIBE_ENV, DOCUMENT_VERSION, DescribeDocument, parse_document};
use tessera_server::naming::normalize_component_path;

use super::types::DiscoveredPage;
use crate::shell::capture_host_output;

#[derive(Debug, Default)]
pub(crate) struct Discovered {
  pub pages: Vec<DiscoveredPage>,
  pub warnings: Vec<String>,
  seen: HashSet<String>,
}

impl Discovered {
  /// Record a page; the first registration of a component wins.
  fn push(&mut self, page: DiscoveredPage, origin: &str) {
    let key = normalize_component_path(&page.component_path);
    if self.seen.insert(key.clone()) {
      self.pages.push(page);
      return;
    }
    let first = self.pages.iter().find(|p| normalize_component_path(&p.component_path) == key);
    let differs = first.is_some_and(|f| {
      f.mode != page.mode || f.has_static_loader != page.has_static_loader || f.title != page.title
    });
    if differs {
      self.warnings.push(format!(
        "{origin}: {} registered again with different options; keeping the first",
        page.component_path
      ));
    }
  }
}

fn page_call_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"(?:^|[^\w.])(page)\s*\(").expect("page call regex compiles"))
}

fn string_literal_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r#"^\s*"((?:[^"\\]|\\.)*)"\s*\)"#).expect("string literal regex compiles")
  })
}

fn title_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r#"\.\s*title\s*\(\s*"((?:[^"\\]|\\.)*)"\s*\)"#).expect("title regex compiles")
  })
}

fn option_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r"\.\s*(client_only|static_prerender|static_paths)\s*\(").expect("option regex compiles")
  })
}

/// Scan every `.rs` file under `source_dir` (sorted) for `page("...")` calls.
pub(crate) fn scan_sources(source_dir: &Path, base_dir: &Path) -> Result<Discovered> {
  if !source_dir.is_dir() {
    bail!("source directory {} does not exist", source_dir.display());
  }
  let mut files = Vec::new();
  collect_rust_files(source_dir, &mut files)?;
  files.sort();

  let mut found = Discovered::default();
  for file in &files {
    let source =
      std::fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    let label = file.strip_prefix(base_dir).unwrap_or(file).display().to_string();
    scan_source(&label, &source, &mut found);
  }
  Ok(found)
}

fn collect_rust_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
  let entries = std::fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
  for entry in entries {
    let path = entry?.path();
    if path.is_dir() {
      collect_rust_files(&path, out)?;
    } else if path.extension().is_some_and(|ext| ext == "rs") {
      out.push(path);
    }
  }
  Ok(())
}

/// Scan one source file. `label` prefixes warnings as `label:line`.
pub(crate) fn scan_source(label: &str, source: &str, found: &mut Discovered) {
  let text = strip_comments(source);
  let calls: Vec<(usize, usize)> = page_call_re()
    .captures_iter(&text)
    .filter_map(|c| {
      let name = c.get(1)?;
      let whole = c.get(0)?;
      Some((name.start(), whole.end()))
    })
    .filter(|&(start, _)| !is_fn_definition(&text[..start]))
    .collect();

  for (i, &(start, args)) in calls.iter().enumerate() {
    let line = text[..start].matches('\n').count() + 1;
    let origin = format!("{label}:{line}");
    let Some(literal) = string_literal_re().captures(&text[args..]) else {
      found.warnings.push(format!("{origin}: page() called with a non-literal component path; skipped"));
      continue;
    };
    let (Some(whole), Some(path)) = (literal.get(0), literal.get(1)) else { continue };

    let options_start = args + whole.end();
    let next_call = calls.get(i + 1).map_or(text.len(), |&(s, _)| s);
    let window = option_window(&text[options_start..next_call]);
    found.push(apply_options(unescape(path.as_str()), window), &origin);
  }
}

/// Apply option calls in source order, mirroring the page builder.
fn apply_options(component_path: String, options: &str) -> DiscoveredPage {
  let title = title_re().captures_iter(options).filter_map(|c| c.get(1)).last();
  let mut page = DiscoveredPage {
    component_path,
    mode: PageMode::Ssr,
    has_static_loader: false,
    title: title.map(|t| unescape(t.as_str())),
  };
  for option in option_re().captures_iter(options).filter_map(|c| c.get(1)) {
    match option.as_str() {
      "client_only" => {
        page.mode = PageMode::ClientOnly;
        page.has_static_loader = false;
      }
      "static_prerender" => page.mode = PageMode::StaticPrerender,
      _ => {
        page.mode = PageMode::StaticPrerender;
        page.has_static_loader = true;
      }
    }
  }
  page
}

/// The builder chain after `page("...")`: up to the `;` ending the statement
/// or the bracket closing the enclosing call.
fn option_window(rest: &str) -> &str {
  let mut depth = 0i32;
  for (idx, ch) in rest.char_indices() {
    match ch {
      '(' | '[' | '{' => depth += 1,
      ')' | ']' | '}' => {
        depth -= 1;
        if depth < 0 {
          return &rest[..idx];
        }
      }
      ';' if depth == 0 => return &rest[..idx],
      _ => {}
    }
  }
  rest
}

fn is_fn_definition(before: &str) -> bool {
  let before = before.trim_end();
  before.strip_suffix("fn").is_some_and(|head| {
    head.chars().next_back().is_none_or(|c| !(c.is_alphanumeric() || c == '_'))
  })
}

fn unescape(literal: &str) -> String {
  let mut out = String::with_capacity(literal.len());
  let mut chars = literal.chars();
  while let Some(ch) = chars.next() {
    if ch == '\\' {
      if let Some(next) = chars.next() {
        out.push(next);
      }
    } else {
      out.push(ch);
    }
  }
  out
}

/// Blank out `//` and `/* */` comments, keeping newlines so line numbers hold.
/// String and char literals are copied through untouched.
pub(crate) fn strip_comments(source: &str) -> String {
  let chars: Vec<char> = source.chars().collect();
  let mut out = String::with_capacity(source.len());
  let mut i = 0;
  while i < chars.len() {
    let ch = chars[i];
    let next = chars.get(i + 1).copied();
    match ch {
      '/' if next == Some('/') => {
        while i < chars.len() && chars[i] != '\n' {
          i += 1;
        }
      }
      '/' if next == Some('*') => {
        i += 2;
        while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
          if chars[i] == '\n' {
            out.push('\n');
          }
          i += 1;
        }
        i += 2;
        out.push(' ');
      }
      '"' => {
        out.push(ch);
        i += 1;
        while i < chars.len() && chars[i] != '"' {
          if chars[i] == '\\' && i + 1 < chars.len() {
            out.push(chars[i]);
            i += 1;
          }
          out.push(chars[i]);
          i += 1;
        }
        if i < chars.len() {
          out.push('"');
          i += 1;
        }
      }
      '\'' => {
        // char literal ('x' or '\n'); anything else is a lifetime
        let len = match (next, chars.get(i + 2)) {
          (Some('\\'), _) => {
            chars.get(i + 3..).and_then(|rest| rest.iter().position(|&c| c == '\'')).map(|p| p + 4)
          }
          (Some(_), Some('\'')) => Some(3),
          _ => None,
        };
        let len = len.unwrap_or(1);
        out.extend(&chars[i..(i + len).min(chars.len())]);
        i += len;
      }
      _ => {
        out.push(ch);
        i += 1;
      }
    }
  }
  out
}

/// Ask the host binary for its registered pages.
pub(crate) async fn describe_pages(
  base_dir: &Path,
  host_command: &str,
  timeout: Duration,
) -> Result<Discovered> {
  let stdout = capture_host_output(base_dir, host_command, &[(DESCRIBE_ENV, "1")], timeout)
    .await
    .context("describe run of the host binary failed")?;
  let doc: DescribeDocument = parse_document(&stdout).context("invalid describe document")?;
  if doc.version != DOCUMENT_VERSION {
    bail!("describe document version {} is not supported (expected {DOCUMENT_VERSION})", doc.version);
  }
  let mut found = Discovered::default();
  for descriptor in doc.pages {
    let page = DiscoveredPage {
      component_path: descriptor.component_path,
      mode: descriptor.mode,
      has_static_loader: descriptor.has_static_loader,
      title: descriptor.title,
    };
    found.push(page, "describe");
  }
  Ok(found)
}

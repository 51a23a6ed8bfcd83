/* src/server/core/rust/src/decision.rs */

//! What to do with one page request. Pure: no filesystem, no renderer.

use crate::manifest::{ManifestEntry, PageMode};
use crate::naming::normalize_path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
  /// Serve a prebuilt HTML file (manifest-relative path).
  ServeStaticFile(String),
  /// Serve the prebuilt HTML of one enumerated static route.
  ServeRouteFile(String),
  NotFound,
  /// Build the page's development bundle before answering.
  NeedsSetup,
  RenderClientOnlyShell,
  RenderStaticPrerender,
  RenderSsr,
}

#[derive(Debug, Clone, Copy)]
pub struct DecisionInput<'a> {
  pub is_dev: bool,
  pub mode: PageMode,
  pub request_path: &'a str,
  /// Whether a manifest entry exists for this page (in development: whether
  /// its dev bundle has been built).
  pub has_manifest: bool,
  pub entry_name: &'a str,
  /// Fallback HTML path, empty when there is none.
  pub static_path: &'a str,
  pub has_renderer: bool,
  pub entry: Option<&'a ManifestEntry>,
}

pub fn decide(input: &DecisionInput<'_>) -> Action {
  if input.is_dev { decide_dev(input) } else { decide_prod(input) }
}

fn decide_prod(input: &DecisionInput<'_>) -> Action {
  match input.mode {
    PageMode::Ssr => Action::RenderSsr,
    PageMode::ClientOnly => html_or_fallback(input),
    PageMode::StaticPrerender => {
      if let Some(routes) = input.entry.and_then(|e| e.static_routes.as_ref()) {
        return match routes.get(&normalize_path(input.request_path)) {
          Some(html) => Action::ServeRouteFile(html.clone()),
          None => Action::NotFound,
        };
      }
      html_or_fallback(input)
    }
  }
}

fn html_or_fallback(input: &DecisionInput<'_>) -> Action {
  if let Some(html) = input.entry.and_then(|e| e.html.as_deref()).filter(|h| !h.is_empty()) {
    return Action::ServeStaticFile(html.to_string());
  }
  if !input.static_path.is_empty() {
    return Action::ServeStaticFile(input.static_path.to_string());
  }
  Action::NotFound
}

fn decide_dev(input: &DecisionInput<'_>) -> Action {
  if !input.has_manifest {
    let needs_bundle = match input.mode {
      PageMode::Ssr => true,
      PageMode::ClientOnly | PageMode::StaticPrerender => input.has_renderer,
    };
    if needs_bundle {
      return Action::NeedsSetup;
    }
  }
  match input.mode {
    PageMode::ClientOnly => Action::RenderClientOnlyShell,
    PageMode::StaticPrerender => Action::RenderStaticPrerender,
    PageMode::Ssr => Action::RenderSsr,
  }
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;

  use super::*;

  fn input(mode: PageMode) -> DecisionInput<'static> {
    DecisionInput {
      is_dev: false,
      mode,
      request_path: "/",
      has_manifest: true,
      entry_name: "page_0000abcd",
      static_path: "",
      has_renderer: true,
      entry: None,
    }
  }

  #[test]
  fn prod_static_route_lookup_normalizes_request() {
    let mut entry = ManifestEntry::new(PageMode::StaticPrerender, "post.js");
    entry.static_routes = Some(BTreeMap::from([(
      "/blog/hello".to_string(),
      "/pages/routes/blog/hello/index.html".to_string(),
    )]));
    let action = decide(&DecisionInput {
      request_path: "/blog/hello/",
      entry: Some(&entry),
      ..input(PageMode::StaticPrerender)
    });
    assert_eq!(action, Action::ServeRouteFile("/pages/routes/blog/hello/index.html".into()));
  }

  #[test]
  fn prod_unknown_static_route_is_not_found_even_with_html() {
    let mut entry = ManifestEntry::new(PageMode::StaticPrerender, "post.js");
    entry.html = Some("/pages/post/index.html".into());
    entry.static_routes = Some(BTreeMap::new());
    let action = decide(&DecisionInput {
      request_path: "/blog/other",
      entry: Some(&entry),
      static_path: "/pages/post/index.html",
      ..input(PageMode::StaticPrerender)
    });
    assert_eq!(action, Action::NotFound);
  }

  #[test]
  fn prod_client_only_without_entry_or_fallback_is_not_found() {
    let action = decide(&DecisionInput { has_manifest: false, ..input(PageMode::ClientOnly) });
    assert_eq!(action, Action::NotFound);
  }

  #[test]
  fn prod_client_only_prefers_manifest_html() {
    let mut entry = ManifestEntry::new(PageMode::ClientOnly, "app.js");
    entry.html = Some("/pages/app/index.html".into());
    let action = decide(&DecisionInput {
      entry: Some(&entry),
      static_path: "/pages/other/index.html",
      ..input(PageMode::ClientOnly)
    });
    assert_eq!(action, Action::ServeStaticFile("/pages/app/index.html".into()));

    let action =
      decide(&DecisionInput { static_path: "/pages/other/index.html", ..input(PageMode::ClientOnly) });
    assert_eq!(action, Action::ServeStaticFile("/pages/other/index.html".into()));
  }

  #[test]
  fn prod_simple_static_uses_html() {
    let mut entry = ManifestEntry::new(PageMode::StaticPrerender, "about.js");
    entry.html = Some("/pages/about/index.html".into());
    let action = decide(&DecisionInput { entry: Some(&entry), ..input(PageMode::StaticPrerender) });
    assert_eq!(action, Action::ServeStaticFile("/pages/about/index.html".into()));
    assert_eq!(decide(&input(PageMode::StaticPrerender)), Action::NotFound);
  }

  #[test]
  fn prod_ssr_always_renders() {
    assert_eq!(decide(&DecisionInput { has_manifest: false, ..input(PageMode::Ssr) }), Action::RenderSsr);
  }

  #[test]
  fn dev_ssr_needs_setup_until_built() {
    let before = DecisionInput { is_dev: true, has_manifest: false, ..input(PageMode::Ssr) };
    assert_eq!(decide(&before), Action::NeedsSetup);
    let after = DecisionInput { has_manifest: true, ..before };
    assert_ne!(decide(&after), Action::NeedsSetup);
    assert_eq!(decide(&after), Action::RenderSsr);
  }

  #[test]
  fn dev_static_modes_need_setup_only_with_renderer() {
    for (mode, action) in [
      (PageMode::ClientOnly, Action::RenderClientOnlyShell),
      (PageMode::StaticPrerender, Action::RenderStaticPrerender),
    ] {
      let with = DecisionInput { is_dev: true, has_manifest: false, ..input(mode) };
      assert_eq!(decide(&with), Action::NeedsSetup);
      let without = DecisionInput { has_renderer: false, ..with };
      assert_eq!(decide(&without), action);
    }
  }

  #[test]
  fn decisions_are_deterministic() {
    let i = DecisionInput { is_dev: true, ..input(PageMode::StaticPrerender) };
    assert_eq!(decide(&i), decide(&i));
  }
}

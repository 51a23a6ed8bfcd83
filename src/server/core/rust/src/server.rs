/* src/server/core/rust/src/server.rs */

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::naming::normalize_component_path;
use crate::page::PageConfig;

/// One routed endpoint. Several routes may share a page config.
#[derive(Debug, Clone)]
pub struct PageRoute {
  /// Axum route syntax, e.g. "/blog/{slug}"
  pub route: String,
  pub page: Arc<PageConfig>,
}

/// Page registry built by the host before serving.
#[derive(Debug, Default)]
pub struct Pages {
  routes: Vec<PageRoute>,
  configs: BTreeMap<String, Arc<PageConfig>>,
}

impl Pages {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register `config` under `route`. The first config registered for a
  /// component path wins; later registrations of the same component only add
  /// the route.
  pub fn page(mut self, route: impl Into<String>, config: PageConfig) -> Self {
    let route = route.into();
    let key = normalize_component_path(&config.component_path);
    let shared = match self.configs.get(&key) {
      Some(existing) => {
        if existing.mode != config.mode {
          tracing::warn!(
            component = %key,
            route = %route,
            kept = %existing.mode,
            ignored = %config.mode,
            "component registered twice with different modes; keeping the first"
          );
        }
        existing.clone()
      }
      None => {
        let shared = Arc::new(config);
        self.configs.insert(key, shared.clone());
        shared
      }
    };
    self.routes.push(PageRoute { route, page: shared });
    self
  }

  pub fn routes(&self) -> &[PageRoute] {
    &self.routes
  }

  /// Distinct page configs keyed by normalized component path.
  pub fn configs(&self) -> impl Iterator<Item = &Arc<PageConfig>> {
    self.configs.values()
  }

  pub fn get(&self, component_path: &str) -> Option<&Arc<PageConfig>> {
    self.configs.get(&normalize_component_path(component_path))
  }

  pub fn is_empty(&self) -> bool {
    self.routes.is_empty()
  }

  pub fn into_routes(self) -> Vec<PageRoute> {
    self.routes
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::manifest::PageMode;
  use crate::page::page;

  #[test]
  fn routes_share_one_config_per_component() {
    let pages = Pages::new()
      .page("/", page("src/pages/Home.tsx"))
      .page("/home", page("./src/pages/Home.tsx").client_only())
      .page("/about", page("src/pages/About.tsx").static_prerender());

    assert_eq!(pages.routes().len(), 3);
    assert_eq!(pages.configs().count(), 2);
    // First registration wins
    let home = pages.get("src/pages/Home.tsx").unwrap();
    assert_eq!(home.mode, PageMode::Ssr);
    assert!(Arc::ptr_eq(&pages.routes()[0].page, &pages.routes()[1].page));
  }
}

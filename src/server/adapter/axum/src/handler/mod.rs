/* src/server/adapter/axum/src/handler/mod.rs */

mod page;

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tessera_server::manifest::{ASSET_PREFIX, CLIENT_DIR};
use tessera_server::{PageHandler, Pages, ServeContext};
use tower_http::services::ServeDir;

pub(crate) struct AppState {
  /// Route pattern -> handler. Routes of one component share a handler, so
  /// its development setup runs once.
  pub pages: HashMap<String, Arc<PageHandler>>,
}

pub(crate) fn build_router(pages: Pages, ctx: Arc<ServeContext>) -> Router {
  let client_dir = ctx.out_dir().join(CLIENT_DIR);
  let mut handlers: HashMap<String, Arc<PageHandler>> = HashMap::new();
  let mut page_map = HashMap::new();
  let mut router = Router::new();

  for route in pages.into_routes() {
    let handler = handlers
      .entry(route.page.component_path.clone())
      .or_insert_with(|| Arc::new(PageHandler::new(ctx.clone(), route.page.clone())))
      .clone();
    tracing::debug!(route = %route.route, entry = %handler.entry_name(), "page route");
    page_map.insert(route.route.clone(), handler);
    router = router.route(&route.route, get(page::handle_page));
  }

  let state = Arc::new(AppState { pages: page_map });
  router.nest_service(ASSET_PREFIX, ServeDir::new(client_dir)).with_state(state)
}

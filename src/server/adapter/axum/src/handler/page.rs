/* src/server/adapter/axum/src/handler/page.rs */

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{MatchedPath, Query, RawPathParams, State};
use axum::http::{HeaderMap, Uri};
use axum::response::Response;
use percent_encoding::percent_decode_str;
use tessera_server::PageRequest;

use super::AppState;
use crate::error::{into_response, not_found, AxumError};

fn page_request(
  uri: &Uri,
  params: &RawPathParams,
  query: HashMap<String, String>,
  headers: &HeaderMap,
) -> PageRequest {
  // Static route keys are stored decoded (`/blog/hello world`).
  let path = percent_decode_str(uri.path()).decode_utf8_lossy();
  let mut req = PageRequest::new(path.as_ref());
  req.params = params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
  req.query = query;
  req.headers = headers
    .iter()
    .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string())))
    .collect();
  req
}

pub(super) async fn handle_page(
  State(state): State<Arc<AppState>>,
  matched: MatchedPath,
  uri: Uri,
  headers: HeaderMap,
  params: RawPathParams,
  Query(query): Query<HashMap<String, String>>,
) -> Result<Response, AxumError> {
  let Some(handler) = state.pages.get(matched.as_str()) else {
    return Ok(not_found());
  };
  let req = page_request(&uri, &params, query, &headers);
  into_response(handler.handle(req).await).await
}

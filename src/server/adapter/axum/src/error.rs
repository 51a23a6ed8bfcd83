/* src/server/adapter/axum/src/error.rs */

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use tessera_server::html::prod_error_page;
use tessera_server::{PageResponse, TesseraError};

/// Newtype wrapper to implement `IntoResponse` for `TesseraError`.
/// Rendered as the generic error page; details only go to the log.
pub(crate) struct AxumError(pub TesseraError);

impl IntoResponse for AxumError {
  fn into_response(self) -> Response {
    tracing::error!(error = %self.0, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, Html(prod_error_page(500))).into_response()
  }
}

impl From<TesseraError> for AxumError {
  fn from(err: TesseraError) -> Self {
    Self(err)
  }
}

impl From<std::io::Error> for AxumError {
  fn from(err: std::io::Error) -> Self {
    Self(err.into())
  }
}

pub(crate) fn not_found() -> Response {
  (StatusCode::NOT_FOUND, Html(prod_error_page(404))).into_response()
}

/// Map a handler outcome onto an HTTP response. Prebuilt pages are read from disk.
pub(crate) async fn into_response(response: PageResponse) -> Result<Response, AxumError> {
  Ok(match response {
    PageResponse::Html { status, body } => {
      let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
      (status, Html(body)).into_response()
    }
    PageResponse::File { path } => match tokio::fs::read_to_string(&path).await {
      Ok(body) => Html(body).into_response(),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
        tracing::warn!(path = %path.display(), "prebuilt page missing");
        not_found()
      }
      Err(e) => return Err(e.into()),
    },
    PageResponse::Redirect { location, status } => {
      let status = StatusCode::from_u16(status).unwrap_or(StatusCode::FOUND);
      let location = HeaderValue::from_str(&location).map_err(|_| {
        TesseraError::configuration(format!("redirect location {location:?} is not a valid header"))
      })?;
      (status, [(header::LOCATION, location)]).into_response()
    }
    PageResponse::NotFound => not_found(),
  })
}

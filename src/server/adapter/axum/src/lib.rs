/* src/server/adapter/axum/src/lib.rs */

mod error;
mod handler;

use std::sync::Arc;

use tessera_renderer::{RendererClient, RendererOptions, RuntimeSource};
use tessera_server::{Pages, Renderer, ServeConfig, ServeContext, TesseraError};

/// Re-export tessera-server core for convenience
pub use tessera_server;
pub use tessera_renderer;

/// Extension trait that converts a page registry into an Axum router.
pub trait IntoAxumRouter {
  fn into_axum_router(self, ctx: Arc<ServeContext>) -> axum::Router;
  fn serve(
    self,
    addr: &str,
  ) -> impl std::future::Future<Output = Result<(), Box<dyn std::error::Error>>> + Send;
}

impl IntoAxumRouter for Pages {
  fn into_axum_router(self, ctx: Arc<ServeContext>) -> axum::Router {
    handler::build_router(self, ctx)
  }

  /// Answer a build-time side channel, or start the renderer and serve until ctrl-c.
  async fn serve(self, addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    if self.run_build_mode().await? {
      return Ok(());
    }
    let app = TesseraApp::bootstrap(self, ServeConfig::from_env()?).await?;
    app.serve(addr).await
  }
}

/// A bootstrapped application: router plus the renderer it owns.
pub struct TesseraApp {
  router: axum::Router,
  renderer: Option<Arc<RendererClient>>,
}

impl TesseraApp {
  /// Start the renderer (when a runtime is available), load and verify the
  /// manifest in production, and mount every page route.
  pub async fn bootstrap(pages: Pages, config: ServeConfig) -> Result<Self, TesseraError> {
    let renderer = start_renderer(&config).await?;
    let shared: Option<Arc<dyn Renderer>> = renderer.clone().map(|r| r as Arc<dyn Renderer>);
    let ctx = match ServeContext::bootstrap(config, shared) {
      Ok(ctx) => Arc::new(ctx),
      Err(err) => {
        if let Some(renderer) = &renderer {
          renderer.stop().await?;
        }
        return Err(err);
      }
    };
    Ok(Self { router: pages.into_axum_router(ctx), renderer })
  }

  pub fn router(&self) -> axum::Router {
    self.router.clone()
  }

  pub async fn serve(self, addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let port = listener.local_addr()?.port();
    tracing::info!("Tessera backend running on http://localhost:{port}");
    let served = axum::serve(listener, self.router)
      .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
      })
      .await;
    if let Some(renderer) = &self.renderer {
      renderer.stop().await?;
    }
    served?;
    Ok(())
  }

  pub async fn shutdown(self) -> Result<(), TesseraError> {
    if let Some(renderer) = &self.renderer {
      renderer.stop().await?;
    }
    Ok(())
  }
}

async fn start_renderer(config: &ServeConfig) -> Result<Option<Arc<RendererClient>>, TesseraError> {
  let Some(runtime) = config.runtime_dir() else {
    tracing::warn!("no renderer runtime configured; pages needing a renderer will fail");
    return Ok(None);
  };
  if !runtime.is_dir() {
    tracing::warn!(runtime = %runtime.display(), "renderer runtime not found; starting without renderer");
    return Ok(None);
  }
  let mut options = RendererOptions::new(&config.renderer_program, RuntimeSource::Directory(runtime));
  options.working_dir = Some(config.project_root.clone());
  Ok(Some(Arc::new(RendererClient::start(options).await?)))
}

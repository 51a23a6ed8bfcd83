/* src/server/core/rust/src/handler/tests.rs */

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::json;

use super::*;
use crate::errors::{BuildError, LoaderError, Redirect};
use crate::manifest::PageMode;
use crate::page::{page, StaticEntry};
use crate::renderer::{BoxFuture, BuildRequest, RenderedPage};

#[derive(Default)]
struct FakeRenderer {
  builds: AtomicUsize,
  renders: AtomicUsize,
  fail_build: bool,
}

impl Renderer for FakeRenderer {
  fn render<'a>(
    &'a self,
    path: &'a str,
    props: &'a serde_json::Value,
  ) -> BoxFuture<'a, Result<RenderedPage, TesseraError>> {
    Box::pin(async move {
      self.renders.fetch_add(1, Ordering::SeqCst);
      Ok(RenderedPage { body: format!("<main>{path}|{props}</main>"), head: String::new() })
    })
  }

  fn build(&self, request: BuildRequest) -> BoxFuture<'_, Result<(), TesseraError>> {
    Box::pin(async move {
      self.builds.fetch_add(1, Ordering::SeqCst);
      tokio::time::sleep(Duration::from_millis(20)).await;
      if self.fail_build {
        return Err(BuildError::new("syntax error").into());
      }
      let name = request.entry_names.unwrap_or_else(|| "out".into());
      std::fs::create_dir_all(&request.outdir)?;
      std::fs::write(request.outdir.join(format!("{name}.js")), "import\"./chunk-AA.js\";")?;
      std::fs::write(request.outdir.join("chunk-AA.js"), "")?;
      Ok(())
    })
  }
}

fn dev_config(root: &std::path::Path) -> ServeConfig {
  ServeConfig {
    dev: true,
    project_root: root.to_path_buf(),
    render_cache_ttl: Duration::ZERO,
    ..ServeConfig::default()
  }
}

fn handler(
  config: ServeConfig,
  manifest: Option<Manifest>,
  renderer: Arc<FakeRenderer>,
  page: PageConfig,
) -> PageHandler {
  let renderer: Arc<dyn Renderer> = renderer;
  let ctx = Arc::new(ServeContext::with_manifest(config, manifest, Some(renderer)));
  PageHandler::new(ctx, Arc::new(page))
}

#[tokio::test]
async fn dev_setup_runs_once_under_concurrent_requests() {
  let dir = tempfile::tempdir().unwrap();
  let renderer = Arc::new(FakeRenderer::default());
  let handler = Arc::new(handler(
    dev_config(dir.path()),
    None,
    renderer.clone(),
    page("src/pages/Home.tsx").title("Home"),
  ));

  let mut tasks = tokio::task::JoinSet::new();
  for _ in 0..8 {
    let handler = handler.clone();
    tasks.spawn(async move { handler.handle(PageRequest::new("/")).await });
  }
  while let Some(response) = tasks.join_next().await {
    let PageResponse::Html { status, body } = response.unwrap() else { panic!("expected html") };
    assert_eq!(status, 200);
    assert!(body.contains("/assets/chunk-AA.js"));
    assert!(body.contains(&format!("/assets/{}.js", handler.entry_name())));
    assert!(body.contains("<title>Home</title>"));
  }
  assert_eq!(renderer.builds.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_setup_is_replayed_without_rebuilding() {
  let dir = tempfile::tempdir().unwrap();
  let renderer = Arc::new(FakeRenderer { fail_build: true, ..Default::default() });
  let handler =
    handler(dev_config(dir.path()), None, renderer.clone(), page("src/pages/Broken.tsx"));

  for _ in 0..3 {
    let PageResponse::Html { status, body } = handler.handle(PageRequest::new("/")).await else {
      panic!("expected error page")
    };
    assert_eq!(status, 500);
    assert!(body.contains("syntax error"));
  }
  assert_eq!(renderer.builds.load(Ordering::SeqCst), 1);
  assert_eq!(renderer.renders.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dev_renders_component_source_with_loader_props() {
  let dir = tempfile::tempdir().unwrap();
  let renderer = Arc::new(FakeRenderer::default());
  let cfg = page("src/pages/User.tsx").props(|req: PageRequest| async move {
    Ok::<_, LoaderError>(json!({ "name": req.param("name").unwrap_or("anon").to_string() }))
  });
  let handler = handler(dev_config(dir.path()), None, renderer, cfg);

  let mut req = PageRequest::new("/user/ada");
  req.params.insert("name".into(), "ada".into());
  let PageResponse::Html { body, .. } = handler.handle(req).await else { panic!("expected html") };
  assert!(body.contains("src/pages/User.tsx|"));
  assert!(body.contains(r#""name":"ada""#));
  assert!(body.contains(r#"<script id="__tessera_props" type="application/json">{"name":"ada"}</script>"#));
}

#[tokio::test]
async fn loader_redirect_short_circuits() {
  let dir = tempfile::tempdir().unwrap();
  let renderer = Arc::new(FakeRenderer::default());
  let cfg = page("src/pages/Account.tsx").props(|_req: PageRequest| async {
    Err::<serde_json::Value, LoaderError>(Box::new(Redirect::to("/login")))
  });
  let handler = handler(dev_config(dir.path()), None, renderer.clone(), cfg);

  let response = handler.handle(PageRequest::new("/account")).await;
  assert_eq!(response, PageResponse::Redirect { location: "/login".into(), status: 302 });
  assert_eq!(renderer.renders.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dev_static_page_uses_matching_loader_entry() {
  let dir = tempfile::tempdir().unwrap();
  let renderer = Arc::new(FakeRenderer::default());
  let cfg = page("src/pages/Post.tsx").static_paths(|| async {
    Ok::<_, LoaderError>(vec![StaticEntry::new("/blog/hello", json!({"title": "Hello"}))])
  });
  let handler = handler(dev_config(dir.path()), None, renderer, cfg);

  let PageResponse::Html { body, .. } = handler.handle(PageRequest::new("/blog/hello/")).await
  else {
    panic!("expected html")
  };
  assert!(body.contains(r#""title":"Hello""#));
  assert_eq!(handler.handle(PageRequest::new("/blog/missing")).await, PageResponse::NotFound);
}

#[tokio::test]
async fn prod_static_route_served_from_file() {
  let dir = tempfile::tempdir().unwrap();
  let config = ServeConfig { output_dir: dir.path().to_path_buf(), ..ServeConfig::default() };
  let cfg = page("src/pages/Post.tsx").static_prerender();
  let entry_name = entry_name_for_path(&cfg.component_path);
  let mut entry = ManifestEntry::new(PageMode::StaticPrerender, format!("/assets/{entry_name}.js"));
  entry.static_routes = Some(BTreeMap::from([(
    "/blog/hello".to_string(),
    "/pages/routes/blog/hello/index.html".to_string(),
  )]));
  let mut manifest = Manifest::default();
  manifest.entries.insert(entry_name, entry);

  let renderer = Arc::new(FakeRenderer::default());
  let handler = handler(config, Some(manifest), renderer.clone(), cfg);
  assert_eq!(
    handler.handle(PageRequest::new("/blog/hello/")).await,
    PageResponse::File { path: dir.path().join("pages/routes/blog/hello/index.html") }
  );
  assert_eq!(handler.handle(PageRequest::new("/blog/other")).await, PageResponse::NotFound);
  assert_eq!(renderer.renders.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn prod_ssr_without_bundle_is_generic_500() {
  let dir = tempfile::tempdir().unwrap();
  let config = ServeConfig { output_dir: dir.path().to_path_buf(), ..ServeConfig::default() };
  let cfg = page("src/pages/Home.tsx");
  let entry_name = entry_name_for_path(&cfg.component_path);
  let mut entry = ManifestEntry::new(PageMode::Ssr, "/assets/home.js");
  entry.ssr = Some(format!("server/{entry_name}.js"));
  let mut manifest = Manifest::default();
  manifest.entries.insert(entry_name, entry);

  let handler = handler(config, Some(manifest), Arc::new(FakeRenderer::default()), cfg);
  let PageResponse::Html { status, body } = handler.handle(PageRequest::new("/")).await else {
    panic!("expected html")
  };
  assert_eq!(status, 500);
  assert!(!body.contains("server/"));
}

#[tokio::test]
async fn prod_ssr_renders_bundle_and_caches() {
  let dir = tempfile::tempdir().unwrap();
  let config = ServeConfig { output_dir: dir.path().to_path_buf(), ..ServeConfig::default() };
  let cfg = page("src/pages/Home.tsx");
  let entry_name = entry_name_for_path(&cfg.component_path);
  std::fs::create_dir_all(dir.path().join("server")).unwrap();
  std::fs::write(dir.path().join(format!("server/{entry_name}.js")), "").unwrap();
  let mut entry = ManifestEntry::new(PageMode::Ssr, "/assets/home.js");
  entry.ssr = Some(format!("server/{entry_name}.js"));
  let mut manifest = Manifest::default();
  manifest.entries.insert(entry_name.clone(), entry);

  let renderer = Arc::new(FakeRenderer::default());
  let handler = handler(config, Some(manifest), renderer.clone(), cfg);
  for _ in 0..2 {
    let PageResponse::Html { status, body } = handler.handle(PageRequest::new("/")).await else {
      panic!("expected html")
    };
    assert_eq!(status, 200);
    assert!(body.contains(&format!("server/{entry_name}.js|{{}}")));
  }
  assert_eq!(renderer.renders.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn prod_client_only_falls_back_to_default_shell() {
  let dir = tempfile::tempdir().unwrap();
  let config = ServeConfig { output_dir: dir.path().to_path_buf(), ..ServeConfig::default() };
  let cfg = page("src/App.tsx").client_only();
  let entry_name = entry_name_for_path(&cfg.component_path);
  let renderer = Arc::new(FakeRenderer::default());

  let handler_without = handler(config.clone(), Some(Manifest::default()), renderer.clone(), cfg.clone());
  assert_eq!(handler_without.handle(PageRequest::new("/")).await, PageResponse::NotFound);

  let shell = dir.path().join(format!("pages/{entry_name}/index.html"));
  std::fs::create_dir_all(shell.parent().unwrap()).unwrap();
  std::fs::write(&shell, "<html></html>").unwrap();
  let handler_with = handler(config, Some(Manifest::default()), renderer, cfg);
  assert_eq!(handler_with.handle(PageRequest::new("/")).await, PageResponse::File { path: shell });
}

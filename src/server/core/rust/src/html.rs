/* src/server/core/rust/src/html.rs */

//! HTML document assembly for rendered pages, client-only shells and error pages.

use std::fmt::Write as _;

use crate::entry::{PROPS_ID, ROOT_ID};
use crate::errors::TesseraError;
use crate::escape::{escape_html, props_script_json};
use crate::manifest::ManifestEntry;

/// Public asset URLs of one page, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageAssets {
  pub css: Option<String>,
  pub chunks: Vec<String>,
  pub script: Option<String>,
}

impl PageAssets {
  pub fn from_entry(entry: &ManifestEntry) -> Self {
    Self {
      css: entry.css.clone(),
      chunks: entry.chunks.clone(),
      script: (!entry.script.is_empty()).then(|| entry.script.clone()),
    }
  }
}

#[derive(Debug, Clone, Copy)]
pub struct DocumentParts<'a> {
  /// Head fragment returned by the renderer.
  pub head: &'a str,
  /// Markup placed inside the root element.
  pub body: &'a str,
  pub title: Option<&'a str>,
  /// Embedded for hydration when present.
  pub props: Option<&'a serde_json::Value>,
  pub assets: &'a PageAssets,
}

fn head_has_title(head: &str) -> bool {
  head.to_ascii_lowercase().contains("<title")
}

pub fn assemble_document(parts: &DocumentParts<'_>) -> String {
  let mut html = String::with_capacity(parts.body.len() + parts.head.len() + 512);
  html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
  html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
  if let Some(title) = parts.title.filter(|_| !head_has_title(parts.head)) {
    let _ = writeln!(html, "<title>{}</title>", escape_html(title));
  }
  if !parts.head.is_empty() {
    html.push_str(parts.head);
    html.push('\n');
  }
  if let Some(css) = &parts.assets.css {
    let _ = writeln!(html, "<link rel=\"stylesheet\" href=\"{}\">", escape_html(css));
  }
  html.push_str("</head>\n<body>\n");
  let _ = writeln!(html, "<div id=\"{ROOT_ID}\">{}</div>", parts.body);
  if let Some(props) = parts.props {
    let _ = writeln!(
      html,
      "<script id=\"{PROPS_ID}\" type=\"application/json\">{}</script>",
      props_script_json(props)
    );
  }
  for chunk in &parts.assets.chunks {
    let _ = writeln!(html, "<script type=\"module\" src=\"{}\"></script>", escape_html(chunk));
  }
  if let Some(script) = &parts.assets.script {
    let _ = writeln!(html, "<script type=\"module\" src=\"{}\"></script>", escape_html(script));
  }
  html.push_str("</body>\n</html>\n");
  html
}

/// Head-only shell for a client-only page: no server markup, no props.
pub fn client_only_shell(title: Option<&str>, assets: &PageAssets) -> String {
  assemble_document(&DocumentParts { head: "", body: "", title, props: None, assets })
}

fn error_document(title: &str, content: &str) -> String {
  format!(
    "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
     <style>body{{font-family:system-ui,sans-serif;margin:2rem;}}pre{{background:#f6f6f6;\
     padding:1rem;overflow:auto;}}.pos{{color:#b00;}}</style>\n</head>\n<body>\n{content}</body>\n</html>\n"
  )
}

/// Full diagnostics for development: message, stack and positioned sub-errors.
pub fn dev_error_page(component_path: &str, err: &TesseraError) -> String {
  let mut content = String::new();
  let _ = writeln!(content, "<h1>Failed to render {}</h1>", escape_html(component_path));
  match err {
    TesseraError::Build(build) => {
      let _ = writeln!(content, "<p>{}</p>", escape_html(&build.message));
      for msg in &build.errors {
        content.push_str("<section>\n");
        if !msg.file.is_empty() {
          let _ = writeln!(
            content,
            "<p class=\"pos\">{}:{}:{}</p>",
            escape_html(&msg.file),
            msg.line,
            msg.column
          );
        }
        let _ = writeln!(content, "<p>{}</p>", escape_html(&msg.message));
        if !msg.line_text.is_empty() {
          let _ = writeln!(content, "<pre>{}</pre>", escape_html(&msg.line_text));
        }
        content.push_str("</section>\n");
      }
      if let Some(stack) = &build.stack {
        let _ = writeln!(content, "<pre>{}</pre>", escape_html(stack));
      }
    }
    TesseraError::Render(render) => {
      let _ = writeln!(content, "<p>{}</p>", escape_html(&render.message));
      if let Some(stack) = &render.stack {
        let _ = writeln!(content, "<pre>{}</pre>", escape_html(stack));
      }
      for msg in &render.errors {
        let _ = writeln!(content, "<p>{}</p>", escape_html(&msg.message));
        if let Some(stack) = &msg.stack {
          let _ = writeln!(content, "<pre>{}</pre>", escape_html(stack));
        }
      }
    }
    other => {
      let _ = writeln!(content, "<pre>{}</pre>", escape_html(&other.to_string()));
    }
  }
  error_document("Render error", &content)
}

/// Generic page for production; never exposes paths or stacks.
pub fn prod_error_page(status: u16) -> String {
  let heading = match status {
    404 => "Page not found",
    _ => "Something went wrong",
  };
  error_document(heading, &format!("<h1>{heading}</h1>\n<p>Error {status}</p>\n"))
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::errors::{BuildError, BuildMessage, RenderError};
  use crate::manifest::PageMode;

  fn assets() -> PageAssets {
    PageAssets {
      css: Some("/assets/home.css".into()),
      chunks: vec!["/assets/chunk-A.js".into()],
      script: Some("/assets/home.js".into()),
    }
  }

  #[test]
  fn assets_emitted_in_order() {
    let assets = assets();
    let html = assemble_document(&DocumentParts {
      head: "",
      body: "<p>hi</p>",
      title: None,
      props: Some(&json!({})),
      assets: &assets,
    });
    let css = html.find("home.css").unwrap();
    let chunk = html.find("chunk-A.js").unwrap();
    let script = html.find("/assets/home.js").unwrap();
    let props = html.find(PROPS_ID).unwrap();
    assert!(css < chunk && chunk < script);
    assert!(props < script);
    assert!(html.contains("<div id=\"root\"><p>hi</p></div>"));
  }

  #[test]
  fn title_only_when_head_lacks_one() {
    let assets = PageAssets::default();
    let with_head_title = assemble_document(&DocumentParts {
      head: "<TITLE>From head</TITLE>",
      body: "",
      title: Some("Fallback"),
      props: None,
      assets: &assets,
    });
    assert!(!with_head_title.contains("Fallback"));

    let plain = assemble_document(&DocumentParts {
      head: "<meta name=\"x\">",
      body: "",
      title: Some("A & B"),
      props: None,
      assets: &assets,
    });
    assert!(plain.contains("<title>A &amp; B</title>"));
  }

  #[test]
  fn props_cannot_close_the_script_element() {
    let assets = PageAssets::default();
    let props = json!({"bio": "</script><script>alert(1)</script>"});
    let html = assemble_document(&DocumentParts {
      head: "",
      body: "",
      title: None,
      props: Some(&props),
      assets: &assets,
    });
    let start = html.find("application/json\">").unwrap();
    let rest = &html[start..];
    let end = rest.find("</script>").unwrap();
    assert!(!rest[..end].contains('<'));
    assert_eq!(html.matches("</script>").count(), 1);
  }

  #[test]
  fn shell_has_no_props_or_markup() {
    let entry = {
      let mut e = ManifestEntry::new(PageMode::ClientOnly, "/assets/app.js");
      e.css = Some("/assets/app.css".into());
      e
    };
    let html = client_only_shell(Some("App"), &PageAssets::from_entry(&entry));
    assert!(html.contains("<div id=\"root\"></div>"));
    assert!(!html.contains(PROPS_ID));
    assert!(html.contains("<title>App</title>"));
    assert!(html.contains("/assets/app.js"));
  }

  #[test]
  fn dev_error_page_shows_positions() {
    let err = TesseraError::Build(BuildError {
      message: "1 error".into(),
      stack: None,
      errors: vec![BuildMessage {
        message: "Unexpected <".into(),
        file: "src/pages/Home.tsx".into(),
        line: 4,
        column: 2,
        line_text: "<div>".into(),
        ..Default::default()
      }],
    });
    let html = dev_error_page("src/pages/Home.tsx", &err);
    assert!(html.contains("src/pages/Home.tsx:4:2"));
    assert!(html.contains("Unexpected &lt;"));
  }

  #[test]
  fn prod_error_page_hides_details() {
    let html = prod_error_page(500);
    assert!(html.contains("Something went wrong"));
    let render = TesseraError::Render(RenderError {
      message: "boom".into(),
      stack: Some("at /srv/app/Home.tsx:1".into()),
      errors: Vec::new(),
    });
    assert!(dev_error_page("Home", &render).contains("/srv/app/Home.tsx"));
    assert!(!html.contains("/srv/app"));
  }
}

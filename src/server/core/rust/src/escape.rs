/* src/server/core/rust/src/escape.rs */

/// Make serialized JSON safe to embed inside a `<script>` element.
///
/// Walks the JSON text tracking whether the current position is inside a
/// JSON string (handling `\"` and `\\` correctly). Inside strings, `<`, `>`,
/// `&`, U+2028 and U+2029 become `\uXXXX` escapes, so neither `</script`
/// nor `<!--` can appear in the output. The result still parses to the same
/// value.
pub fn escape_script_json(json: &str) -> String {
  let mut out = String::with_capacity(json.len());
  let mut in_string = false;
  let mut chars = json.chars();

  while let Some(ch) = chars.next() {
    if !in_string {
      if ch == '"' {
        in_string = true;
      }
      out.push(ch);
      continue;
    }
    match ch {
      '\\' => {
        out.push(ch);
        if let Some(next) = chars.next() {
          out.push(next);
        }
      }
      '"' => {
        in_string = false;
        out.push(ch);
      }
      '<' | '>' | '&' | '\u{2028}' | '\u{2029}' => {
        out.push_str(&format!("\\u{:04x}", ch as u32));
      }
      _ => out.push(ch),
    }
  }
  out
}

/// Serialize props for the hydration script element.
pub fn props_script_json(props: &serde_json::Value) -> String {
  let json = serde_json::to_string(props).unwrap_or_else(|_| "{}".to_string());
  escape_script_json(&json)
}

/// Escape text for HTML element content and double-quoted attributes.
pub fn escape_html(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for ch in text.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      _ => out.push(ch),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn ascii_passthrough() {
    let input = r#"{"key":"hello"}"#;
    assert_eq!(escape_script_json(input), input);
  }

  #[test]
  fn closing_script_tag_is_escaped() {
    let props = json!({"bio": "</script><script>alert(1)</script>"});
    let out = props_script_json(&props);
    assert!(!out.contains("</script"));
    assert!(!out.contains('<'));
    let back: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(back, props);
  }

  #[test]
  fn escapes_html_comment_and_ampersand() {
    let out = escape_script_json(r#"{"a":"<!-- & -->"}"#);
    assert_eq!(out, r#"{"a":"\u003c!-- \u0026 --\u003e"}"#);
  }

  #[test]
  fn line_separators_are_escaped() {
    let out = escape_script_json("{\"a\":\"x\u{2028}y\u{2029}\"}");
    assert_eq!(out, r#"{"a":"x\u2028y\u2029"}"#);
  }

  #[test]
  fn preserves_existing_escapes() {
    let input = r#"{"a":"line\nbreak","b":"say \"<hi>\""}"#;
    assert_eq!(escape_script_json(input), r#"{"a":"line\nbreak","b":"say \"\u003chi\u003e\""}"#);
  }

  #[test]
  fn html_escape() {
    assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
  }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The two HTML pages: the status page at `/` and the origin approval form.

use printgate_core::types::PrinterDetails;

/// Escape text for use in HTML content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = r#"
    body { font-family: system-ui, sans-serif; max-width: 48rem; margin: 2rem auto; padding: 0 1rem; color: #222; }
    h1 { font-size: 1.6rem; }
    .printer { border: 1px solid #ccc; border-radius: 6px; padding: 0.75rem 1rem; margin: 0.75rem 0; }
    .printer h3 { margin: 0 0 0.25rem; }
    .muted { color: #666; }
    pre { background: #f4f4f4; padding: 0.75rem; overflow-x: auto; }
    button { font-size: 1rem; padding: 0.4rem 1.2rem; margin-right: 0.5rem; }
"#;

/// Inputs for the status page.
pub struct IndexPage<'a> {
    pub version: &'a str,
    pub external_access: bool,
    pub api_base: &'a str,
    pub printers: &'a [PrinterDetails],
}

impl IndexPage<'_> {
    pub fn render(&self) -> String {
        let access = if self.external_access {
            "<b>enabled</b> (local network)"
        } else {
            "<b>disabled</b> (localhost access only)"
        };
        let printers = if self.printers.is_empty() {
            "<p>No active printers were detected.</p>".to_string()
        } else {
            self.printers.iter().map(printer_card).collect()
        };
        let base = escape_html(self.api_base);
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>printgate</title>
  <style>{STYLE}</style>
</head>
<body>
  <h1>printgate</h1>
  <p class="muted">Version {version}</p>
  <p>Remote access: {access}</p>
  <h2>Printers</h2>
  {printers}
  <h2>API</h2>
  <p>List printers:</p>
  <pre>GET {base}/printers</pre>
  <p>Print a PDF from a URL:</p>
  <pre>POST {base}/print-job
Content-Type: application/json

{{"files": [{{"fileUrl": "https://example.com/label.pdf"}}],
 "printerSelector": {{"namePrefix": "Office"}},
 "options": {{"copies": "1"}}}}</pre>
  <p>Check on a job:</p>
  <pre>GET {base}/print-jobs/&lt;jobId&gt;</pre>
</body>
</html>
"#,
            version = escape_html(self.version),
        )
    }
}

fn printer_card(printer: &PrinterDetails) -> String {
    let mut options = String::new();
    for option in &printer.supported_options {
        let choices: Vec<String> = option
            .choices
            .iter()
            .map(|choice| {
                let escaped = escape_html(choice);
                if option.default_choice.as_deref() == Some(choice.as_str()) {
                    format!("<u>{escaped}</u>")
                } else {
                    escaped
                }
            })
            .collect();
        options.push_str(&format!(
            "<li>{} (<code>{}</code>): {}</li>",
            escape_html(&option.display_name),
            escape_html(&option.keyword),
            choices.join(", ")
        ));
    }
    let media: Vec<String> = printer
        .media_sizes
        .iter()
        .map(|size| {
            let escaped = escape_html(&size.name);
            if size.name == printer.default_media_size {
                format!("<u>{escaped}</u>")
            } else {
                escaped
            }
        })
        .collect();
    let media = if media.is_empty() {
        String::new()
    } else {
        format!("<li>Media sizes: {}</li>", media.join(", "))
    };
    format!(
        r#"<div class="printer">
    <h3>{name}</h3>
    <p class="muted">{model} &middot; {state} &middot; <code>{id}</code></p>
    <ul>{media}{options}</ul>
  </div>
  "#,
        name = escape_html(&printer.name),
        model = escape_html(&printer.model),
        state = printer.printer_state.as_str(),
        id = escape_html(&printer.id()),
    )
}

/// Security headers sent with the approval form so it cannot be framed or
/// scripted from elsewhere.
pub const APPROVE_PAGE_HEADERS: [(&str, &str); 3] = [
    (
        "content-security-policy",
        "form-action 'self'; frame-ancestors 'none'; base-uri 'none'; object-src 'none'",
    ),
    ("cross-origin-opener-policy", "same-origin"),
    ("x-frame-options", "DENY"),
];

/// The form a user sees when a site asks for printer access.
pub fn approve_page(origin: &str) -> String {
    let origin = escape_html(origin);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Allow printer access?</title>
  <style>{STYLE}</style>
</head>
<body>
  <h1>Allow printer access?</h1>
  <p><b id="origin">{origin}</b> wants to print to the printers attached to this computer.</p>
  <p>Only allow sites you trust.</p>
  <p>
    <button id="allow" type="button">Allow</button>
    <button id="cancel" type="button">Cancel</button>
  </p>
  <p id="status" class="muted"></p>
  <script>
    const origin = document.getElementById("origin").textContent;
    const status = document.getElementById("status");
    document.getElementById("allow").addEventListener("click", async () => {{
      const response = await fetch("/domains/submit", {{
        method: "POST",
        headers: {{"Content-Type": "application/json"}},
        body: JSON.stringify({{origin}}),
      }});
      if (response.ok) {{
        status.textContent = "Access allowed. You can close this window.";
        window.close();
      }} else {{
        const body = await response.json().catch(() => ({{}}));
        status.textContent = body.description || "Could not save the approval.";
      }}
    }});
    document.getElementById("cancel").addEventListener("click", () => window.close());
  </script>
</body>
</html>
"#
    )
}

use pulldown_cmark::{html, Options, Parser};

use crate::export::ResultRow;

const STYLE: &str = "\
    body { font-family: Arial, sans-serif; max-width: 900px; margin: 40px auto; padding: 0 20px; line-height: 1.6; }\n\
    h1 { color: #2c3e50; border-bottom: 3px solid #3498db; padding-bottom: 10px; }\n\
    nav a { margin-right: 15px; color: #3498db; text-decoration: none; }\n\
    .metadata { color: #7f8c8d; font-size: 0.9em; margin: 5px 0; }\n\
    .error { color: #e74c3c; font-style: italic; }\n\
    table { border-collapse: collapse; }\n\
    td, th { border: 1px solid #ddd; padding: 4px 8px; }\n\
    li { margin: 8px 0; }\n";

/// Markdown to HTML with the extensions newsletters tend to use.
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    html.push_str("  <meta charset=\"UTF-8\">\n");
    html.push_str(&format!("  <title>{}</title>\n", escape_html(title)));
    html.push_str("  <style>\n");
    html.push_str(STYLE);
    html.push_str("  </style>\n");
    html.push_str("</head>\n<body>\n");
    html.push_str("<nav><a href=\"/\">Newsletter</a><a href=\"/search\">Search</a></nav>\n");
    html.push_str(body);
    html.push_str("</body>\n</html>\n");
    html
}

fn error_block(message: &str) -> String {
    format!("<p class=\"error\">{}</p>\n", escape_html(message))
}

/// Newsletter page: rendered markdown, or the error in its place.
pub fn newsletter_page(date_key: Option<&str>, outcome: &Result<String, String>) -> String {
    let mut body = String::from("<h1>Daily Newsletter</h1>\n");
    if let Some(date_key) = date_key {
        body.push_str(&format!(
            "<p class=\"metadata\">Issue for {}</p>\n",
            escape_html(date_key)
        ));
    }

    match outcome {
        Ok(markdown) if !markdown.is_empty() => {
            body.push_str("<article>\n");
            body.push_str(&render_markdown(markdown));
            body.push_str("</article>\n");
        }
        Ok(_) => {}
        Err(message) => body.push_str(&error_block(message)),
    }

    page("Daily Newsletter", &body)
}

/// Keyword search page. `outcome` is `None` until a query is submitted.
pub fn search_page(query: &str, outcome: Option<&Result<Vec<ResultRow>, String>>) -> String {
    let mut body = String::from("<h1>Search</h1>\n");
    body.push_str(&format!(
        "<form method=\"get\" action=\"/search\">\n  <input type=\"text\" name=\"q\" value=\"{}\">\n  <button type=\"submit\">Search</button>\n</form>\n",
        escape_html(query)
    ));

    match outcome {
        None => {}
        Some(Err(message)) => body.push_str(&error_block(message)),
        Some(Ok(rows)) => {
            body.push_str(&format!(
                "<p class=\"metadata\">You searched for: {}</p>\n",
                escape_html(query)
            ));
            let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
            body.push_str(&format!(
                "<p><a href=\"/download?q={}\">Download CSV</a></p>\n",
                escape_html(&encoded)
            ));

            if rows.is_empty() {
                body.push_str("<p>No results.</p>\n");
            } else {
                body.push_str("<ul>\n");
                for row in rows {
                    body.push_str(&format!(
                        "  <li><a href=\"{}\">{}</a><br><span class=\"metadata\">{}</span></li>\n",
                        escape_html(&row.link),
                        escape_html(&row.title),
                        escape_html(&row.subtitle)
                    ));
                }
                body.push_str("</ul>\n");
            }
        }
    }

    page("Search", &body)
}

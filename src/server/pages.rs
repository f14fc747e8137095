//! Server-rendered gallery page. One page, no assets to build.

use std::fmt::Write;

use crate::models::ImageRecord;

const LANG_OPTIONS: &[(&str, &str)] = &[
    ("eng", "English"),
    ("chi_sim", "Chinese (Simplified)"),
    ("chi_tra", "Chinese (Traditional)"),
    ("jpn", "Japanese"),
    ("kor", "Korean"),
    ("deu", "German"),
    ("fra", "French"),
];

pub fn render_gallery(records: &[ImageRecord], query: Option<&str>) -> String {
    let mut page = String::with_capacity(4096);

    page.push_str(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>gifgrep</title>\n",
    );
    page.push_str(STYLE);
    page.push_str("</head>\n<body>\n<h1>gifgrep</h1>\n");

    // Upload form
    page.push_str(
        "<form class=\"upload\" method=\"post\" action=\"/\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"file\" required>\n<select name=\"lang\">\n",
    );
    for (code, label) in LANG_OPTIONS {
        let _ = writeln!(page, "<option value=\"{code}\">{label}</option>");
    }
    page.push_str("</select>\n<button type=\"submit\">Upload</button>\n</form>\n");

    // Search form
    let _ = writeln!(
        page,
        "<form class=\"search\" method=\"get\" action=\"/search\">\n\
         <input type=\"text\" name=\"q\" placeholder=\"Search transcripts\" value=\"{}\">\n\
         <button type=\"submit\">Search</button> <a href=\"/\">All</a>\n</form>",
        escape_html(query.unwrap_or(""))
    );

    if let Some(q) = query {
        if !q.is_empty() {
            let _ = writeln!(
                page,
                "<p>{} result(s) for <strong>{}</strong></p>",
                records.len(),
                escape_html(q)
            );
        }
    }

    page.push_str("<div class=\"gallery\">\n");
    for record in records {
        render_card(&mut page, record);
    }
    page.push_str("</div>\n</body>\n</html>\n");

    page
}

fn render_card(page: &mut String, record: &ImageRecord) {
    let file = escape_html(&record.filename);
    let _ = writeln!(
        page,
        "<div class=\"card\">\n\
         <img src=\"/static/uploads/{file}\" alt=\"{file}\" loading=\"lazy\">\n\
         <pre>{}</pre>\n\
         <small>{} &middot; {}</small>\n\
         <div class=\"actions\">\n\
         <form method=\"post\" action=\"/rescan/{file}\"><button>Rescan</button></form>\n\
         <form method=\"post\" action=\"/delete/{file}\"><button>Delete</button></form>\n\
         </div>\n</div>",
        escape_html(&record.ocr_text),
        escape_html(&record.lang),
        record.uploaded_at.format("%Y-%m-%d %H:%M"),
    );
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const STYLE: &str = "<style>\n\
body { font-family: sans-serif; margin: 2rem; background: #fafafa; }\n\
.upload, .search { margin-bottom: 1rem; }\n\
.gallery { display: flex; flex-wrap: wrap; gap: 1rem; }\n\
.card { background: #fff; border: 1px solid #ddd; border-radius: 6px; padding: 0.75rem; width: 260px; }\n\
.card img { max-width: 100%; }\n\
.card pre { white-space: pre-wrap; font-size: 0.8rem; max-height: 8rem; overflow-y: auto; }\n\
.actions { display: flex; gap: 0.5rem; }\n\
</style>\n";

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(filename: &str, text: &str) -> ImageRecord {
        ImageRecord {
            id: 1,
            filename: filename.to_string(),
            ocr_text: text.to_string(),
            lang: "eng".to_string(),
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn transcript_markup_is_escaped() {
        let page = render_gallery(&[record("a/b.gif", "<script>alert(1)</script>")], None);
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>alert"));
    }

    #[test]
    fn cards_link_to_stored_files_and_actions() {
        let page = render_gallery(&[record("2025-08-29/cat.gif", "meow")], None);
        assert!(page.contains("/static/uploads/2025-08-29/cat.gif"));
        assert!(page.contains("/rescan/2025-08-29/cat.gif"));
        assert!(page.contains("/delete/2025-08-29/cat.gif"));
        assert!(page.contains("meow"));
    }

    #[test]
    fn search_query_is_echoed_escaped() {
        let page = render_gallery(&[], Some("\"quoted\""));
        assert!(page.contains("&quot;quoted&quot;"));
    }
}

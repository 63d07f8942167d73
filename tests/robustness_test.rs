use domwright::{str_get_html, Document};
use std::time::{Duration, Instant};

#[test]
fn load_does_not_panic_on_unclosed_tags() {
    let doc = str_get_html("<p>text<div>more");
    assert_eq!(doc.find_one("p").plain_text(), "text");
    assert_eq!(doc.find_one("div").plain_text(), "more");
}

#[test]
fn load_does_not_panic_on_invalid_nesting() {
    let doc = str_get_html("<p><div></p></div>");
    assert_eq!(doc.find("div").len(), 1);
}

#[test]
fn load_does_not_panic_on_broken_attributes() {
    for html in [
        "<div class=\"test id=broken>",
        "<div = class=a>x</div>",
        "<a href='x>y</a>",
        "<p <b>x</b>",
        "<>",
        "</>",
        "< p>",
        "<",
        "</",
        "<!",
        "<!--",
        "<?xml",
    ] {
        let doc = str_get_html(html);
        let _ = doc.html();
        let _ = doc.xml();
        let _ = doc.find("*").len();
    }
}

#[test]
fn stray_equals_sign_is_skipped() {
    let doc = str_get_html("<div = class=a>x</div>");
    assert_eq!(doc.find(".a").len(), 1);
}

#[test]
fn incomplete_entities_are_kept() {
    let doc = str_get_html("&amp text &lt;");
    assert_eq!(doc.html(), "&amp text &lt;");
}

#[test]
fn empty_and_whitespace_input() {
    for html in ["", "   \n\t  ", "<html></html>", "<body></body>"] {
        let doc = str_get_html(html);
        assert!(doc.is_loaded());
        assert!(doc.find("p").is_empty());
        assert!(doc.find_one("p").is_not_found());
    }
    assert_eq!(str_get_html("<body></body>").html(), "<body></body>");
}

#[test]
fn unloaded_document_answers_everything_empty() {
    let doc = Document::new();
    assert!(doc.find("*").is_empty());
    assert!(doc.find_at("p", -1).is_not_found());
    assert!(doc.get_elements_by_tag_name("p").is_empty());
    assert_eq!(doc.xml(), "");
    assert_eq!(doc.inner_html(), "");
}

#[test]
fn large_html_without_panic() {
    let target_size = 2 * 1024 * 1024;
    let chunk = r#"<p class="row">Some repeated content with a <a href="/x?a=1&b=2">link</a>.</p>"#;
    let mut html = String::with_capacity(target_size + 128);
    html.push_str("<html><body><article>");
    while html.len() < target_size {
        html.push_str(chunk);
    }
    html.push_str("</article></body></html>");

    let start = Instant::now();
    let doc = str_get_html(&html);
    let found = doc.find("article p.row a").len();
    let out = doc.html();
    let elapsed = start.elapsed();

    assert!(found > 1000);
    assert_eq!(out.len(), html.len());
    assert!(elapsed < Duration::from_secs(30), "large HTML took {elapsed:?}");
}

#[test]
fn script_content_never_parsed() {
    let doc = str_get_html(r#"<script>document.write("<div class='evil'>")</script><p>Safe</p>"#);
    assert!(doc.find(".evil").is_empty());
    assert_eq!(doc.find("p").len(), 1);
}

#[test]
fn handles_null_bytes_gracefully() {
    let doc = str_get_html("text\x00more");
    let _ = doc.text();
}

use domwright::{guard, str_get_html};

const BATTERY: &[&str] = &[
    "a=1&b=2",
    "mail%40example.org",
    "{{ user.name }}",
    "[[ item ]]",
    "Google+ && Twitter || Lînux",
    "https://example.org/?q=[[foo]]&x={{bar}}",
    "`?/=()=$&,|,+,%?#![{@`",
];

#[test]
fn decode_inverts_encode() {
    for text in BATTERY {
        assert_eq!(guard::decode(&guard::encode(text)), *text, "round trip of {text:?}");
    }
}

#[test]
fn only_guarded_characters_change() {
    let encoded = guard::encode("{{ x }} and [[ y ]] cost 5%");
    assert!(encoded.starts_with("{{ x }} and [[ y ]] cost 5"));
    assert!(!encoded.contains('%'));
}

/// Each fragile character gets a sentinel of its own.
#[test]
fn attribute_battery_uses_distinct_sentinels() {
    let encoded = guard::encode("`?/=()=$&,|,+,%\"?#![{@`");
    for ch in ['&', '|', '+', '%', '@'] {
        assert!(!encoded.contains(ch), "{ch} left in {encoded}");
    }

    let mut sentinels: Vec<&str> = ['&', '|', '+', '%', '@', '{']
        .into_iter()
        .filter_map(guard::sentinel)
        .collect();
    assert_eq!(sentinels.len(), 6);
    sentinels.sort_unstable();
    sentinels.dedup();
    assert_eq!(sentinels.len(), 6);
}

#[test]
fn attribute_battery_survives_a_document() {
    let value = "`?/=()=$&,|,+,%?#![{@`";
    let html = format!(r#"<a title="{value}">x</a>"#);
    let doc = str_get_html(&html);

    assert_eq!(doc.find_one("a").attribute("title"), value);
    assert_eq!(doc.html(), html);
}

#[test]
fn template_placeholders_survive_a_document() {
    let html = r#"<div class="content"><div ui-view class="grid">{{ title }}</div><a href="https://x.de/?p=[[page]]&s={{sort}}">next</a></div>"#;
    let doc = str_get_html(html);

    assert_eq!(doc.html(), html);
    assert_eq!(doc.find_one(".grid").plain_text(), "{{ title }}");
    assert_eq!(
        doc.find_one("a").attribute("href"),
        "https://x.de/?p=[[page]]&s={{sort}}"
    );
}

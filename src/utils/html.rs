use std::{borrow::Cow, collections::HashSet, sync::LazyLock};

use regex::Regex;

static MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<\s*/?\s*[A-Za-z][^>]*>|<!--").expect("valid regex")
});

/// Reduces uploaded question and option text to plain text.
///
/// Text without markup is returned as is, so `Is 3 < 5?` or `Salt & pepper`
/// are stored exactly as written. Text that contains tags goes through
/// ammonia with no allowed tags: tags are dropped, `<script>` and `<style>`
/// lose their content too, and the escaped output is decoded back to text.
/// Clients escape on render.
pub fn to_plain_text(input: &str) -> Cow<'_, str> {
    if !MARKUP.is_match(input) {
        return Cow::Borrowed(input);
    }

    let mut builder = ammonia::Builder::empty();
    builder.clean_content_tags(HashSet::from(["script", "style"]));
    let cleaned = builder.clean(input).to_string();

    Cow::Owned(decode_entities(&cleaned).trim().to_string())
}

/// Undoes the escaping ammonia's serializer applies to text nodes.
fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

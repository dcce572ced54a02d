//! Passive HTML inspection.
//!
//! Everything here parses synchronously and returns owned data, so no
//! parser state is held across an await point.

use scraper::{Html, Selector};

/// Contents of every `<meta name="generator">` tag.
pub fn generator_contents(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("meta") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter(|meta| {
            meta.value()
                .attr("name")
                .map(|name| name.eq_ignore_ascii_case("generator"))
                .unwrap_or(false)
        })
        .filter_map(|meta| meta.value().attr("content"))
        .map(str::to_string)
        .collect()
}

/// `src` (or, failing that, `href`) of every element among `tags`.
pub fn resource_refs(html: &str, tags: &[&str]) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse(&tags.join(", ")) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let value = element.value();
            value
                .attr("src")
                .filter(|src| !src.is_empty())
                .or_else(|| value.attr("href"))
        })
        .map(str::to_string)
        .collect()
}

/// `href` of every anchor.
pub fn links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect()
}

/// First class from `classes` carried by any element in the document.
pub fn find_class<'a>(html: &str, classes: &[&'a str]) -> Option<&'a str> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("[class]") else {
        return None;
    };

    for element in document.select(&selector) {
        for class in element.value().classes() {
            if let Some(hit) = classes.iter().find(|c| **c == class) {
                return Some(*hit);
            }
        }
    }
    None
}

/// Visible text of an HTML fragment, with entities decoded.
pub fn text_content(fragment: &str) -> String {
    let fragment = Html::parse_fragment(fragment);
    let text: String = fragment.root_element().text().collect();
    text.trim().to_string()
}

/// Whether the page is a server-generated directory index.
pub fn is_directory_index(html: &str) -> bool {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("title, h1") else {
        return false;
    };

    document.select(&selector).any(|heading| {
        let text: String = heading.text().collect();
        let text = text.trim();
        text.starts_with("Index of") || text.starts_with("Directory listing for")
    })
}

/// Path segment immediately following `marker` in a resource reference.
///
/// `https://x.test/wp-content/plugins/contact-form-7/js/index.js?ver=5.8`
/// with marker `/wp-content/plugins/` gives `contact-form-7`. Empty and `.`
/// segments are stepped over; a `..` escapes the directory and yields
/// nothing.
pub fn segment_after(reference: &str, marker: &str) -> Option<String> {
    let start = reference.find(marker)? + marker.len();
    let rest = &reference[start..];
    let path = &rest[..rest.find(['?', '#']).unwrap_or(rest.len())];

    for segment in path.split('/') {
        match segment.trim() {
            "" | "." => continue,
            ".." => return None,
            segment => return Some(segment.to_string()),
        }
    }
    None
}

/// Entry names from a directory index page.
///
/// Parent links, column sort links, absolute links and plain files
/// (`index.php`) are skipped. Directories keep their name without the
/// trailing `/`.
pub fn directory_entries(html: &str) -> Vec<String> {
    links(html)
        .into_iter()
        .filter_map(|href| {
            let href = href.trim();
            if href.is_empty()
                || href.starts_with(['?', '#', '/'])
                || href.starts_with("..")
                || href.contains(':')
            {
                return None;
            }

            let is_dir = href.ends_with('/');
            let name = href.trim_matches('/').split('/').next()?;
            if matches!(name, "" | "." | "..") || (!is_dir && name.contains('.')) {
                return None;
            }
            Some(name.to_string())
        })
        .collect()
}

//! Link and title extraction from rendered HTML

use scraper::{Html, Selector};
use url::Url;

use crate::crawler::CrawlError;

/// Extract every outbound `http(s)` link from a page, resolved against `page_url`
///
/// Links are returned in document order. Fragments are stripped, but repeated
/// links are kept; de-duplication is a workflow decision, not a parsing one.
pub fn extract_links(page_url: &str, html: &str) -> Result<Vec<String>, CrawlError> {
    let base = Url::parse(page_url)?;
    let document = Html::parse_document(html);
    let selector = Selector::parse("a[href]")
        .map_err(|e| CrawlError::HtmlParse(format!("Failed to parse link selector: {}", e)))?;

    let links = document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(|mut url| {
            url.set_fragment(None);
            url.to_string()
        })
        .collect();

    Ok(links)
}

/// Extract the document title, if any
pub fn extract_title(html: &str) -> Result<Option<String>, CrawlError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title")
        .map_err(|e| CrawlError::HtmlParse(format!("Failed to parse title selector: {}", e)))?;

    Ok(document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|title| !title.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
          <head><title> Docs Home </title></head>
          <body>
            <a href="/guide">Guide</a>
            <a href="https://other.example.org/x#top">Elsewhere</a>
            <a href="mailto:team@example.com">Mail</a>
            <a href="api/reference">API</a>
            <a href="/guide">Guide again</a>
            <a>No href</a>
          </body>
        </html>
    "#;

    #[test]
    fn test_extract_links_resolves_and_filters() {
        let links = extract_links("https://example.com/docs/", PAGE).unwrap();
        assert_eq!(
            links,
            vec![
                "https://example.com/guide",
                "https://other.example.org/x",
                "https://example.com/docs/api/reference",
                "https://example.com/guide",
            ]
        );
    }

    #[test]
    fn test_extract_links_rejects_relative_base() {
        let result = extract_links("not-a-url", PAGE);
        assert!(matches!(result, Err(CrawlError::UrlParse(_))));
    }

    #[test]
    fn test_extract_title() {
        assert_eq!(extract_title(PAGE).unwrap().as_deref(), Some("Docs Home"));
        assert_eq!(extract_title("<p>untitled</p>").unwrap(), None);
    }
}

//! Formatting of provider responses into text blocks for the model.
//!
//! Every formatter is a total, deterministic function: any response shape,
//! including an empty one, maps to a fixed string.

use super::tavily::{CrawlResult, ExtractResponse, SearchResponse};

/// Extracted page content is cut at this many characters.
pub const EXTRACT_CONTENT_LIMIT: usize = 5000;
/// Crawled page content is cut at this many characters.
pub const CRAWL_CONTENT_LIMIT: usize = 4000;

/// Cut `content` at `limit` characters, marking the cut with an ellipsis.
/// The ellipsis does not count against the limit.
fn truncate(content: &str, limit: usize) -> String {
    if content.chars().count() > limit {
        let truncated: String = content.chars().take(limit).collect();
        format!("{}...", truncated)
    } else {
        content.to_string()
    }
}

/// Format search results into numbered blocks with title, URL, and body.
///
/// The body prefers a non-blank `raw_content` over `content`; a present but
/// blank `raw_content` falls through to `content`, even when that is blank
/// too.
pub fn format_search_results(response: &SearchResponse) -> String {
    if response.results.is_empty() {
        return "No search results found.".to_string();
    }

    let mut formatted_results = Vec::new();

    for (i, doc) in response.results.iter().enumerate() {
        let title = doc.title.as_deref().unwrap_or("No title");
        let url = doc.url.as_deref().unwrap_or("No URL");

        let mut formatted_doc = format!("\nRESULT {}:\n", i + 1);
        formatted_doc.push_str(&format!("Title: {}\n", title));
        formatted_doc.push_str(&format!("URL: {}\n", url));

        match doc.raw_content.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(raw_content) => {
                formatted_doc.push_str(&format!("Raw Content: {}\n", raw_content.trim()));
            }
            None => {
                let content = doc.content.as_deref().unwrap_or("").trim();
                formatted_doc.push_str(&format!("Content: {}\n", content));
            }
        }

        formatted_results.push(formatted_doc);
    }

    format!("\n{}", formatted_results.join("\n"))
}

/// Format extract results, annotating failed extractions and response time.
pub fn format_extract_results(response: &ExtractResponse) -> String {
    let mut formatted_results = Vec::new();

    for (i, doc) in response.results.iter().enumerate() {
        let mut formatted_doc = format!("\nEXTRACT RESULT {}:\n", i + 1);
        formatted_doc.push_str(&format!("URL: {}\n", doc.url));

        if doc.raw_content.is_empty() {
            formatted_doc.push_str("Content: No content extracted\n");
        } else {
            formatted_doc.push_str(&format!(
                "Content: {}\n",
                truncate(&doc.raw_content, EXTRACT_CONTENT_LIMIT)
            ));
        }

        if !doc.images.is_empty() {
            formatted_doc.push_str(&format!("Images found: {} images\n", doc.images.len()));
            for (j, image_url) in doc.images.iter().take(3).enumerate() {
                formatted_doc.push_str(&format!("  Image {}: {}\n", j + 1, image_url));
            }
            if doc.images.len() > 3 {
                formatted_doc.push_str(&format!(
                    "  ... and {} more images\n",
                    doc.images.len() - 3
                ));
            }
        }

        formatted_results.push(formatted_doc);
    }

    if !response.failed_results.is_empty() {
        formatted_results.push("\nFAILED EXTRACTIONS:\n".to_string());
        for (i, failure) in response.failed_results.iter().enumerate() {
            formatted_results.push(format!(
                "Failed {}: {} - {}\n",
                i + 1,
                failure.url,
                failure.error
            ));
        }
    }

    formatted_results.push(format!("\nResponse time: {} seconds", response.response_time));

    format!("\n{}", formatted_results.concat())
}

/// Format crawl results, deriving a title from the first content line.
pub fn format_crawl_results(results: &[CrawlResult]) -> String {
    if results.is_empty() {
        return "No crawl results found.".to_string();
    }

    let mut formatted_results = Vec::new();

    for (i, doc) in results.iter().enumerate() {
        let mut formatted_doc = format!("\nRESULT {}:\n", i + 1);
        formatted_doc.push_str(&format!("URL: {}\n", doc.url));

        if !doc.raw_content.is_empty() {
            let title_line = doc.raw_content.lines().next().unwrap_or("No title");
            formatted_doc.push_str(&format!("Title: {}\n", title_line));
            formatted_doc.push_str(&format!(
                "Content: {}\n",
                truncate(&doc.raw_content, CRAWL_CONTENT_LIMIT)
            ));
        }

        formatted_results.push(formatted_doc);
    }

    format!("\n{}{}", "-".repeat(40), formatted_results.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::tavily::{ExtractResult, FailedExtract, SearchResult};

    fn search_doc(raw_content: Option<&str>, content: Option<&str>) -> SearchResult {
        SearchResult {
            title: Some("A title".to_string()),
            url: Some("https://example.com".to_string()),
            content: content.map(String::from),
            raw_content: raw_content.map(String::from),
        }
    }

    #[test]
    fn test_empty_search_response() {
        let response = SearchResponse { results: vec![] };
        assert_eq!(format_search_results(&response), "No search results found.");
    }

    #[test]
    fn test_search_prefers_raw_content() {
        let response = SearchResponse {
            results: vec![search_doc(Some("  raw body  "), Some("summary"))],
        };
        let formatted = format_search_results(&response);

        assert!(formatted.contains("RESULT 1:"));
        assert!(formatted.contains("Raw Content: raw body\n"));
        assert!(!formatted.contains("Content: summary"));
    }

    #[test]
    fn test_search_blank_raw_content_falls_through() {
        let response = SearchResponse {
            results: vec![
                search_doc(Some("body one"), None),
                search_doc(Some("   "), Some("summary two")),
            ],
        };
        let formatted = format_search_results(&response);

        assert!(formatted.contains("Raw Content: body one\n"));
        assert!(formatted.contains("Content: summary two\n"));
    }

    #[test]
    fn test_search_blank_raw_and_blank_content_emit_empty_line() {
        let response = SearchResponse {
            results: vec![search_doc(Some(""), None)],
        };
        let formatted = format_search_results(&response);

        assert!(formatted.contains("Content: \n"));
    }

    #[test]
    fn test_search_missing_metadata_defaults() {
        let response = SearchResponse {
            results: vec![SearchResult::default()],
        };
        let formatted = format_search_results(&response);

        assert!(formatted.contains("Title: No title\n"));
        assert!(formatted.contains("URL: No URL\n"));
    }

    #[test]
    fn test_extract_truncates_at_limit_exactly() {
        let long = "a".repeat(EXTRACT_CONTENT_LIMIT + 1);
        let response = ExtractResponse {
            results: vec![ExtractResult {
                url: "https://example.com".to_string(),
                raw_content: long,
                images: vec![],
            }],
            ..Default::default()
        };
        let formatted = format_extract_results(&response);

        let expected = format!("Content: {}...\n", "a".repeat(EXTRACT_CONTENT_LIMIT));
        assert!(formatted.contains(&expected));
    }

    #[test]
    fn test_extract_content_at_limit_unmodified() {
        let exact = "b".repeat(EXTRACT_CONTENT_LIMIT);
        let response = ExtractResponse {
            results: vec![ExtractResult {
                url: "https://example.com".to_string(),
                raw_content: exact.clone(),
                images: vec![],
            }],
            ..Default::default()
        };
        let formatted = format_extract_results(&response);

        assert!(formatted.contains(&format!("Content: {}\n", exact)));
        assert!(!formatted.contains("..."));
    }

    #[test]
    fn test_extract_lists_first_three_images() {
        let images: Vec<String> = (1..=6).map(|i| format!("https://img.example/{i}")).collect();
        let response = ExtractResponse {
            results: vec![ExtractResult {
                url: "https://example.com".to_string(),
                raw_content: "page".to_string(),
                images,
            }],
            ..Default::default()
        };
        let formatted = format_extract_results(&response);

        assert!(formatted.contains("Images found: 6 images\n"));
        assert!(formatted.contains("  Image 1: https://img.example/1\n"));
        assert!(formatted.contains("  Image 3: https://img.example/3\n"));
        assert!(!formatted.contains("Image 4:"));
        assert!(formatted.contains("  ... and 3 more images\n"));
    }

    #[test]
    fn test_extract_reports_failures_and_response_time() {
        let response = ExtractResponse {
            results: vec![],
            failed_results: vec![FailedExtract {
                url: "https://broken.example".to_string(),
                error: "403 Forbidden".to_string(),
            }],
            response_time: 1.42,
        };
        let formatted = format_extract_results(&response);

        assert!(formatted.contains("FAILED EXTRACTIONS:\n"));
        assert!(formatted.contains("Failed 1: https://broken.example - 403 Forbidden\n"));
        assert!(formatted.ends_with("\nResponse time: 1.42 seconds"));
    }

    #[test]
    fn test_extract_missing_content_annotated() {
        let response = ExtractResponse {
            results: vec![ExtractResult {
                url: "https://example.com".to_string(),
                raw_content: String::new(),
                images: vec![],
            }],
            ..Default::default()
        };
        let formatted = format_extract_results(&response);

        assert!(formatted.contains("Content: No content extracted\n"));
    }

    #[test]
    fn test_empty_crawl_response() {
        assert_eq!(format_crawl_results(&[]), "No crawl results found.");
    }

    #[test]
    fn test_crawl_title_is_first_line() {
        let results = vec![CrawlResult {
            url: "https://example.com/docs".to_string(),
            raw_content: "Documentation Home\nAll the details live here.".to_string(),
        }];
        let formatted = format_crawl_results(&results);

        assert!(formatted.contains("Title: Documentation Home\n"));
        assert!(formatted.contains("Content: Documentation Home\nAll the details live here.\n"));
    }

    #[test]
    fn test_crawl_truncates_at_limit() {
        let long = format!("Title line\n{}", "c".repeat(CRAWL_CONTENT_LIMIT));
        let results = vec![CrawlResult {
            url: "https://example.com".to_string(),
            raw_content: long.clone(),
        }];
        let formatted = format_crawl_results(&results);

        let truncated: String = long.chars().take(CRAWL_CONTENT_LIMIT).collect();
        assert!(formatted.contains(&format!("Content: {}...\n", truncated)));
    }

    #[test]
    fn test_formatters_are_idempotent() {
        let response = SearchResponse {
            results: vec![search_doc(Some("body"), None)],
        };
        assert_eq!(
            format_search_results(&response),
            format_search_results(&response)
        );

        let extract = ExtractResponse {
            results: vec![ExtractResult {
                url: "https://example.com".to_string(),
                raw_content: "page".to_string(),
                images: vec!["https://img.example/1".to_string()],
            }],
            failed_results: vec![],
            response_time: 0.5,
        };
        assert_eq!(
            format_extract_results(&extract),
            format_extract_results(&extract)
        );
    }
}

// Main-content extraction: reduce an HTML page to its primary text body.
//
// A selector cascade picks the container (the first selector with any match
// wins, and only its first element is used). Text is then collected from that
// container while skipping boilerplate subtrees like navigation, headers and
// footers. Block elements split the text into blocks, which are kept next to
// the flattened text for extractors that work per paragraph.

use scraper::{ElementRef, Html, Node, Selector};
use tracing::debug;

use super::text::collapse_whitespace;

/// Selectors for the "main" content of a page, most specific first.
pub const MAIN_CONTENT_SELECTORS: [&str; 3] = ["[role='main']", "main", "body"];

/// Elements whose text is never page content.
const ALWAYS_SKIPPED: [&str; 3] = ["script", "style", "noscript"];

/// Layout and chrome elements dropped when boilerplate removal is on.
const BOILERPLATE: [&str; 9] = [
    "template", "svg", "nav", "header", "footer", "aside", "form", "iframe", "button",
];

/// Elements that end a run of inline text.
const BLOCK_ELEMENTS: [&str; 24] = [
    "address", "article", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption", "figure",
    "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "ol", "p", "pre", "section", "td", "tr",
];

/// The extracted primary text of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedContent {
    /// Text of the `<title>` element, if any
    pub title: Option<String>,
    /// Whitespace-collapsed main-content text
    pub text: String,
    /// The same text split at block elements, one entry per non-empty block
    pub blocks: Vec<String>,
    /// Which selector of the cascade matched
    pub selector: String,
}

/// Configurable main-content extractor.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    selectors: Vec<String>,
    strip_boilerplate: bool,
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self {
            selectors: MAIN_CONTENT_SELECTORS.iter().map(|s| s.to_string()).collect(),
            strip_boilerplate: true,
        }
    }
}

impl ContentExtractor {
    /// Extractor that keeps everything inside the matched container except
    /// scripts and styles, like the ad client does.
    pub fn without_boilerplate_removal() -> Self {
        Self {
            strip_boilerplate: false,
            ..Self::default()
        }
    }

    /// Extract the main content from an HTML document.
    ///
    /// Returns `None` when no selector matches anything.
    pub fn extract(&self, html: &str) -> Option<ExtractedContent> {
        let document = Html::parse_document(html);
        let title = extract_title(&document);

        for selector_str in &self.selectors {
            let selector = match Selector::parse(selector_str) {
                Ok(sel) => sel,
                Err(e) => {
                    debug!(selector = selector_str.as_str(), error = ?e, "Skipping invalid selector");
                    continue;
                }
            };

            if let Some(container) = document.select(&selector).next() {
                let mut blocks = Vec::new();
                let mut current = String::new();
                self.collect_text(container, &mut current, &mut blocks);
                end_block(&mut current, &mut blocks);
                return Some(ExtractedContent {
                    title,
                    text: blocks.join(" "),
                    blocks,
                    selector: selector_str.clone(),
                });
            }
        }

        None
    }

    fn collect_text(&self, element: ElementRef<'_>, current: &mut String, blocks: &mut Vec<String>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => current.push_str(text),
                Node::Element(el) => {
                    let name = el.name();
                    if self.is_skipped(name) {
                        continue;
                    }
                    let is_block = BLOCK_ELEMENTS.contains(&name);
                    if is_block {
                        end_block(current, blocks);
                    }
                    if let Some(child_el) = ElementRef::wrap(child) {
                        self.collect_text(child_el, current, blocks);
                    }
                    if is_block {
                        end_block(current, blocks);
                    }
                }
                _ => {}
            }
        }
    }

    fn is_skipped(&self, name: &str) -> bool {
        ALWAYS_SKIPPED.contains(&name) || (self.strip_boilerplate && BOILERPLATE.contains(&name))
    }
}

/// Close the block being collected, if it has any text.
fn end_block(current: &mut String, blocks: &mut Vec<String>) {
    let block = collapse_whitespace(current);
    if !block.is_empty() {
        blocks.push(block);
    }
    current.clear();
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let title = document
        .select(&selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))?;
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
          <head><title>  Django   Tips </title><style>body { color: red; }</style></head>
          <body>
            <nav>Home About Blog</nav>
            <div role="main">
              <h1>Writing views</h1>
              <p>Django views are <b>Python</b> functions.</p>
              <script>var tracking = 1;</script>
              <footer>Copyright</footer>
            </div>
            <main><p>Secondary main</p></main>
          </body>
        </html>
    "#;

    #[test]
    fn test_role_main_wins_over_main() {
        let content = ContentExtractor::default().extract(PAGE).unwrap();
        assert_eq!(content.selector, "[role='main']");
        assert_eq!(content.text, "Writing views Django views are Python functions.");
        assert_eq!(content.title.as_deref(), Some("Django Tips"));
    }

    #[test]
    fn test_boilerplate_kept_without_removal() {
        let content = ContentExtractor::without_boilerplate_removal()
            .extract(PAGE)
            .unwrap();
        assert!(content.text.contains("Copyright"));
        // Scripts never count as content
        assert!(!content.text.contains("tracking"));
    }

    #[test]
    fn test_falls_back_to_main_then_body() {
        let html = "<html><body><main><p>In main</p></main><p>outside</p></body></html>";
        let content = ContentExtractor::default().extract(html).unwrap();
        assert_eq!(content.selector, "main");
        assert_eq!(content.text, "In main");

        let html = "<html><body><nav>menu</nav><p>Just body</p></body></html>";
        let content = ContentExtractor::default().extract(html).unwrap();
        assert_eq!(content.selector, "body");
        assert_eq!(content.text, "Just body");
    }

    #[test]
    fn test_blocks_do_not_glue_words() {
        let html = "<body><div>alpha</div><div>beta</div><ul><li>one</li><li>two</li></ul></body>";
        let content = ContentExtractor::default().extract(html).unwrap();
        assert_eq!(content.text, "alpha beta one two");
        assert_eq!(content.blocks, vec!["alpha", "beta", "one", "two"]);
    }

    #[test]
    fn test_paragraphs_become_blocks() {
        let html = "<body><p>Alpha beta. Gamma\n   delta.</p><p>Epsilon <em>zeta</em>.</p></body>";
        let content = ContentExtractor::default().extract(html).unwrap();
        assert_eq!(content.blocks, vec!["Alpha beta. Gamma delta.", "Epsilon zeta."]);
        assert_eq!(content.text, "Alpha beta. Gamma delta. Epsilon zeta.");
    }

    #[test]
    fn test_no_match_returns_none() {
        let extractor = ContentExtractor {
            selectors: vec!["article".to_string()],
            strip_boilerplate: true,
        };
        assert!(extractor.extract("<body><p>text</p></body>").is_none());
    }

    #[test]
    fn test_missing_title() {
        let content = ContentExtractor::default()
            .extract("<body><p>x</p></body>")
            .unwrap();
        assert!(content.title.is_none());
    }
}

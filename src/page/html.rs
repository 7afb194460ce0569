use async_trait::async_trait;
use scraper::{ElementRef, Html, Node, Selector, node::Element};
use url::Url;

use crate::normalize::collapse_whitespace;
use crate::page::{PageError, PageHandle, Query};

/// Elements that start a new line in rendered text.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li",
    "main", "nav", "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Elements whose text is never rendered.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// A fetched HTML document.
///
/// The snapshot never changes, so a selector that is absent now will never
/// appear and `wait_for_selector` fails straight away. `scraper::Html`
/// cannot cross threads, so the body is parsed inside synchronous
/// [`HtmlPage::read`] calls; batch lookups through
/// [`PageHandle::query_many`] share one parse.
#[derive(Debug, Clone)]
pub struct HtmlPage {
    url: Option<Url>,
    body: String,
}

impl HtmlPage {
    pub fn new(url: Url, body: impl Into<String>) -> Self {
        Self {
            url: Some(url),
            body: body.into(),
        }
    }

    /// A page whose loaded URL is unknown.
    pub fn detached(body: impl Into<String>) -> Self {
        Self {
            url: None,
            body: body.into(),
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Parse the body once and run `read` against it.
    pub fn read<T>(&self, read: impl FnOnce(&Document) -> T) -> T {
        let document = Document {
            html: Html::parse_document(&self.body),
        };
        read(&document)
    }
}

/// A parsed snapshot. Lives only inside [`HtmlPage::read`].
pub struct Document {
    html: Html,
}

impl Document {
    fn first<T>(
        &self,
        selector: &str,
        read: impl FnOnce(ElementRef<'_>) -> Option<T>,
    ) -> Result<Option<T>, PageError> {
        let selector = parse_selector(selector)?;
        let found = self.html.select(&selector).next().and_then(read);
        Ok(found)
    }

    pub fn exists(&self, selector: &str) -> Result<bool, PageError> {
        Ok(self.first(selector, |_| Some(()))?.is_some())
    }

    pub fn text_content(&self, selector: &str) -> Result<Option<String>, PageError> {
        self.first(selector, |element| Some(element.text().collect::<String>()))
    }

    /// Rendered text of the first match: inline markup joins its
    /// surroundings, block elements and `<br>` break lines, hidden elements
    /// are skipped. Lines are whitespace-collapsed and blank ones dropped.
    pub fn inner_text(&self, selector: &str) -> Result<Option<String>, PageError> {
        self.first(selector, |element| {
            let mut rendered = String::new();
            render_text(element, &mut rendered);
            let lines: Vec<String> = rendered
                .lines()
                .map(collapse_whitespace)
                .filter(|line| !line.is_empty())
                .collect();
            Some(lines.join("\n"))
        })
    }

    pub fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>, PageError> {
        self.first(selector, |element| {
            element.value().attr(name).map(str::to_string)
        })
    }

    pub fn next_text_sibling(&self, selector: &str) -> Result<Option<String>, PageError> {
        self.first(selector, |element| {
            let sibling = element.next_sibling()?;
            let text = sibling.value().as_text()?;
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        })
    }

    pub fn hrefs(&self, selector: &str) -> Result<Vec<String>, PageError> {
        let selector = parse_selector(selector)?;
        let found = self
            .html
            .select(&selector)
            .filter_map(|element| element.value().attr("href").map(str::to_string))
            .collect();
        Ok(found)
    }

    pub fn query(&self, query: Query<'_>) -> Result<Option<String>, PageError> {
        match query {
            Query::TextContent(selector) => self.text_content(selector),
            Query::InnerText(selector) => self.inner_text(selector),
            Query::Attribute(selector, name) => self.attribute(selector, name),
            Query::NextTextSibling(selector) => self.next_text_sibling(selector),
        }
    }
}

fn render_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            // source line breaks are plain whitespace
            Node::Text(text) => {
                out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }))
            }
            Node::Element(child_element) => {
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                render_element(child_ref, child_element, out);
            }
            _ => {}
        }
    }
}

fn render_element(element: ElementRef<'_>, value: &Element, out: &mut String) {
    let name = value.name();
    if HIDDEN_ELEMENTS.contains(&name) {
        return;
    }
    if name == "br" {
        out.push('\n');
        return;
    }

    let block = BLOCK_ELEMENTS.contains(&name);
    if block {
        out.push('\n');
    }
    render_text(element, out);
    if block {
        out.push('\n');
    }
}

fn parse_selector(selector: &str) -> Result<Selector, PageError> {
    Selector::parse(selector).map_err(|e| PageError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl PageHandle for HtmlPage {
    fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    async fn wait_for_selector(&self, selector: &str) -> Result<(), PageError> {
        if self.read(|document| document.exists(selector))? {
            Ok(())
        } else {
            Err(PageError::SelectorNotFound(selector.to_string()))
        }
    }

    async fn text_content(&self, selector: &str) -> Result<Option<String>, PageError> {
        self.read(|document| document.text_content(selector))
    }

    async fn inner_text(&self, selector: &str) -> Result<Option<String>, PageError> {
        self.read(|document| document.inner_text(selector))
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>, PageError> {
        self.read(|document| document.attribute(selector, name))
    }

    async fn next_text_sibling(&self, selector: &str) -> Result<Option<String>, PageError> {
        self.read(|document| document.next_text_sibling(selector))
    }

    async fn hrefs(&self, selector: &str) -> Result<Vec<String>, PageError> {
        self.read(|document| document.hrefs(selector))
    }

    async fn query_many(&self, queries: &[Query<'_>]) -> Result<Vec<Option<String>>, PageError> {
        self.read(|document| queries.iter().map(|query| document.query(*query)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<!DOCTYPE html>
<html><body>
  <div class="details">
    <div class="date">Sat 15 Nov 2025</div>
    2 - 2:45 p.m.
    <span class="note">Doors open early</span>
  </div>
  <div class="body"><p>First   line.</p>
    <p>Second line.</p></div>
  <img class="hero" src="/img/a.jpg">
  <a class="card" href="/one">One</a>
  <a class="card" href="https://example.com/two">Two</a>
  <a class="card">No href</a>
</body></html>"#;

    fn page() -> HtmlPage {
        HtmlPage::new(Url::parse("https://example.com/list").unwrap(), DOC)
    }

    #[tokio::test]
    async fn test_text_queries() {
        let page = page();
        assert_eq!(
            page.text_content("div.date").await.unwrap().as_deref(),
            Some("Sat 15 Nov 2025")
        );
        assert_eq!(
            page.inner_text("div.body").await.unwrap().as_deref(),
            Some("First line.\nSecond line.")
        );
        assert_eq!(page.text_content("h1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_inner_text_keeps_inline_markup_in_line() {
        let page = HtmlPage::detached(
            r#"<div class="body">
                <p>Tickets cost <strong>$20</strong>. A <em>Japan</em>ese <b>tea</b>-tasting.</p>
                <p>Meet the <b>art</b>isans<br>after the show.</p>
                <script>track("tea");</script><style>p { color: red }</style>
                <ul><li>One</li><li>Two</li></ul>
            </div>"#,
        );

        let text = page.inner_text("div.body").await.unwrap().unwrap();
        assert_eq!(
            text,
            "Tickets cost $20. A Japanese tea-tasting.\n\
             Meet the artisans\n\
             after the show.\n\
             One\n\
             Two"
        );
        assert_eq!(
            crate::normalize::normalize(Some(&text), 2),
            "Tickets cost $20. A Japanese tea-tasting."
        );
    }

    #[tokio::test]
    async fn test_query_many_answers_in_order() {
        let page = page();
        let answers = page
            .query_many(&[
                Query::TextContent("div.date"),
                Query::NextTextSibling("div.date"),
                Query::Attribute("img.hero", "src"),
                Query::InnerText("h1"),
            ])
            .await
            .unwrap();

        assert_eq!(
            answers,
            vec![
                Some("Sat 15 Nov 2025".to_string()),
                Some("2 - 2:45 p.m.".to_string()),
                Some("/img/a.jpg".to_string()),
                None,
            ]
        );
        assert!(matches!(
            page.query_many(&[Query::TextContent("div[")]).await,
            Err(PageError::InvalidSelector { .. })
        ));
    }

    #[tokio::test]
    async fn test_next_text_sibling() {
        let page = page();
        assert_eq!(
            page.next_text_sibling("div.date").await.unwrap().as_deref(),
            Some("2 - 2:45 p.m.")
        );
        // followed only by whitespace before </div>
        assert_eq!(page.next_text_sibling("span.note").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_attributes_and_hrefs() {
        let page = page();
        assert_eq!(
            page.attribute("img.hero", "src").await.unwrap().as_deref(),
            Some("/img/a.jpg")
        );
        assert_eq!(page.attribute("img.hero", "alt").await.unwrap(), None);
        assert_eq!(
            page.hrefs("a.card").await.unwrap(),
            vec!["/one".to_string(), "https://example.com/two".to_string()]
        );
    }

    #[tokio::test]
    async fn test_wait_for_selector() {
        let page = page();
        assert!(page.wait_for_selector("a.card").await.is_ok());
        assert!(matches!(
            page.wait_for_selector("h4.card-title > a").await,
            Err(PageError::SelectorNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_selector() {
        let page = page();
        assert!(matches!(
            page.text_content("div[").await,
            Err(PageError::InvalidSelector { .. })
        ));
    }

    #[tokio::test]
    async fn test_detached_page_has_no_url() {
        let page = HtmlPage::detached(DOC);
        assert!(page.url().is_none());
        assert!(page.body().contains("Sat 15 Nov 2025"));
    }
}

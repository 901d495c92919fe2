use prensa_core::error::AppError;
use prensa_core::models::{ArticleStub, ListingSection, UNTITLED_SECTION};
use prensa_core::traits::{Fetcher, ListingSource};
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Scans a site's index page into section-grouped article stubs.
pub struct ListingScanner<F: Fetcher> {
    fetcher: F,
}

impl<F: Fetcher> ListingScanner<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }
}

impl<F: Fetcher> ListingSource for ListingScanner<F> {
    async fn scan(&self, index_url: &str) -> Result<Vec<ListingSection>, AppError> {
        let base = Url::parse(index_url)
            .map_err(|e| AppError::Config(format!("invalid index URL {index_url}: {e}")))?;
        let html = self.fetcher.fetch(index_url).await?;
        Ok(parse_listing(&html, &base))
    }
}

fn selector(css: &str) -> Selector {
    // All inputs are compile-time literals.
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css}: {e}"))
}

/// Parse an index page into sections.
///
/// Section containers are `section`/`div` elements with class
/// `module`, `mosaic`, or `mosaic-wrapper`. A `span.title-text-title`
/// inside a container updates the current section title, which
/// persists across following untitled containers; before the first
/// title the sentinel "OTRO" applies. Containers with no stubs are
/// dropped.
pub fn parse_listing(html: &str, base: &Url) -> Vec<ListingSection> {
    let container_sel = selector(
        "section.module, div.module, section.mosaic, div.mosaic, \
         section.mosaic-wrapper, div.mosaic-wrapper",
    );
    let title_sel = selector("span.title-text-title");
    let atom_sel = selector(
        "article.module-text-below-atom, article.module-text-side-atom, \
         article.module-text-over-atom, article.swiper-slide",
    );

    let document = Html::parse_document(html);
    let mut sections = Vec::new();
    let mut current_title = UNTITLED_SECTION.to_string();

    for container in document.select(&container_sel) {
        if let Some(span) = container.select(&title_sel).next() {
            let text = span.text().collect::<String>();
            let text = text.trim();
            if !text.is_empty() {
                current_title = text.to_string();
            }
        }

        let stubs: Vec<ArticleStub> = container
            .select(&atom_sel)
            .filter_map(|atom| parse_stub(atom, base))
            .collect();

        if stubs.is_empty() {
            continue;
        }
        sections.push(ListingSection {
            title: current_title.clone(),
            stubs,
        });
    }

    sections
}

/// One stub per article atom: the link is `a.media`, falling back to
/// `a.image`. Site-relative hrefs are resolved against the index URL.
/// Atoms without an href, or with one that does not resolve, are not
/// stubs.
fn parse_stub(atom: ElementRef<'_>, base: &Url) -> Option<ArticleStub> {
    let media_sel = selector("a.media");
    let image_sel = selector("a.image");

    let link = atom
        .select(&media_sel)
        .next()
        .or_else(|| atom.select(&image_sel).next())?;
    let href = link.value().attr("href")?;
    let url = base.join(href).ok()?.to_string();
    let headline = link
        .value()
        .attr("title")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from);

    Some(ArticleStub { headline, url })
}

//! Concrete site scrapers and the deployment registry.
//!
//! Two scraper shapes cover the current roster: CSS-selector scrapers for
//! server-rendered or SPA career pages (driven through the browser), and
//! JSON-board scrapers for companies hosted on Greenhouse, which expose a
//! public API and need no renderer at all.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use krill_core::error::AppError;
use krill_core::models::RawPosting;
use krill_core::traits::{PageSource, SiteScraper};
use scraper::{Html, Selector};
use serde::Deserialize;
use url::Url;

/// CSS selectors describing one career board's markup.
#[derive(Debug, Clone, Copy)]
pub struct BoardSelectors {
    /// One element per posting.
    pub row: &'static str,
    pub title: &'static str,
    pub location: &'static str,
    /// Element carrying the posting link in `href`.
    pub link: &'static str,
    /// Optional teaser/description element inside the row.
    pub description: Option<&'static str>,
}

/// Scrapes a career board by rendering it in the browser and walking the
/// DOM with CSS selectors.
pub struct SelectorScraper {
    company: &'static str,
    source_website: &'static str,
    board_url: &'static str,
    selectors: BoardSelectors,
}

impl SelectorScraper {
    pub fn new(
        company: &'static str,
        source_website: &'static str,
        board_url: &'static str,
        selectors: BoardSelectors,
    ) -> Self {
        Self {
            company,
            source_website,
            board_url,
            selectors,
        }
    }

    fn selector(css: &str) -> Result<Selector, AppError> {
        Selector::parse(css)
            .map_err(|e| AppError::ScrapeError(format!("Bad selector {css:?}: {e:?}")))
    }

    /// Pull postings out of rendered board HTML.
    ///
    /// A board with zero matching rows is an error, not an empty result:
    /// career pages never legitimately render an empty list element-for-
    /// element, so no rows means the markup changed or the page half-loaded,
    /// and the attempt should be retried.
    fn parse_board(&self, html: &str) -> Result<Vec<RawPosting>, AppError> {
        let document = Html::parse_document(html);
        let row_sel = Self::selector(self.selectors.row)?;
        let title_sel = Self::selector(self.selectors.title)?;
        let location_sel = Self::selector(self.selectors.location)?;
        let link_sel = Self::selector(self.selectors.link)?;
        let desc_sel = self
            .selectors
            .description
            .map(Self::selector)
            .transpose()?;

        let base = Url::parse(self.board_url)
            .map_err(|e| AppError::ScrapeError(format!("Bad board URL: {e}")))?;

        let mut postings = Vec::new();
        for row in document.select(&row_sel) {
            let title = match row.select(&title_sel).next() {
                Some(el) => el.text().collect::<String>().trim().to_string(),
                None => continue,
            };
            if title.is_empty() {
                continue;
            }

            let location = row
                .select(&location_sel)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
                .unwrap_or_default();

            let job_url = row
                .select(&link_sel)
                .next()
                .and_then(|el| el.value().attr("href"))
                .and_then(|href| base.join(href).ok())
                .map(|u| u.to_string())
                .unwrap_or_else(|| self.board_url.to_string());

            let description = desc_sel
                .as_ref()
                .and_then(|sel| row.select(sel).next())
                .map(|el| el.text().collect::<String>().trim().to_string())
                .unwrap_or_default();

            postings.push(RawPosting {
                company: self.company.to_string(),
                title,
                location,
                description,
                source_website: self.source_website.to_string(),
                job_url,
                post_date: None,
                deadline: None,
            });
        }

        if postings.is_empty() {
            return Err(AppError::ScrapeError(format!(
                "No job rows matched {:?} on {}",
                self.selectors.row, self.board_url
            )));
        }
        Ok(postings)
    }
}

impl SiteScraper for SelectorScraper {
    fn company(&self) -> &str {
        self.company
    }

    fn source_website(&self) -> &str {
        self.source_website
    }

    fn scrape<'a>(
        &'a self,
        page: &'a dyn PageSource,
    ) -> BoxFuture<'a, Result<Vec<RawPosting>, AppError>> {
        Box::pin(async move {
            let html = page.html(self.board_url).await?;
            self.parse_board(&html)
        })
    }
}

#[derive(Debug, Deserialize)]
struct GreenhouseBoard {
    jobs: Vec<GreenhouseJob>,
}

#[derive(Debug, Deserialize)]
struct GreenhouseJob {
    title: String,
    absolute_url: String,
    location: GreenhouseLocation,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GreenhouseLocation {
    name: String,
}

/// Scrapes a Greenhouse-hosted board through its public JSON API. No
/// browser needed; the `PageSource` handed in by the orchestrator is
/// ignored.
pub struct GreenhouseScraper {
    company: &'static str,
    board_slug: &'static str,
    client: reqwest::Client,
}

impl GreenhouseScraper {
    pub fn new(company: &'static str, board_slug: &'static str) -> Self {
        Self {
            company,
            board_slug,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "https://boards-api.greenhouse.io/v1/boards/{}/jobs?content=true",
            self.board_slug
        )
    }

    fn parse_payload(&self, payload: &str) -> Result<Vec<RawPosting>, AppError> {
        let board: GreenhouseBoard = serde_json::from_str(payload)?;
        Ok(board
            .jobs
            .into_iter()
            .map(|job| RawPosting {
                company: self.company.to_string(),
                title: job.title,
                location: job.location.name,
                description: job.content.unwrap_or_default(),
                source_website: format!("boards.greenhouse.io/{}", self.board_slug),
                job_url: job.absolute_url,
                post_date: job
                    .updated_at
                    .as_deref()
                    .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
                deadline: None,
            })
            .collect())
    }
}

impl SiteScraper for GreenhouseScraper {
    fn company(&self) -> &str {
        self.company
    }

    fn source_website(&self) -> &str {
        "boards.greenhouse.io"
    }

    fn scrape<'a>(
        &'a self,
        _page: &'a dyn PageSource,
    ) -> BoxFuture<'a, Result<Vec<RawPosting>, AppError>> {
        Box::pin(async move {
            let url = self.endpoint();
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| AppError::NetworkError(format!("GET {url}: {e}")))?;
            if !response.status().is_success() {
                return Err(AppError::ScrapeError(format!(
                    "Board API returned {} for {url}",
                    response.status()
                )));
            }
            let payload = response
                .text()
                .await
                .map_err(|e| AppError::NetworkError(format!("Reading {url}: {e}")))?;
            self.parse_payload(&payload)
        })
    }
}

/// The deployment roster, scraped strictly in this order.
pub fn registry() -> Vec<Box<dyn SiteScraper>> {
    vec![
        Box::new(SelectorScraper::new(
            "Evercore",
            "evercore.com",
            "https://www.evercore.com/join-us/open-positions/",
            BoardSelectors {
                row: ".position-listing .position",
                title: ".position-title",
                location: ".position-location",
                link: "a",
                description: Some(".position-summary"),
            },
        )),
        Box::new(SelectorScraper::new(
            "Lazard",
            "lazard.com",
            "https://www.lazard.com/careers/opportunities/",
            BoardSelectors {
                row: ".careers-listing .job-card",
                title: ".job-card__title",
                location: ".job-card__location",
                link: "a.job-card__link",
                description: None,
            },
        )),
        Box::new(GreenhouseScraper::new("Point72", "point72")),
        Box::new(GreenhouseScraper::new("DRW", "drweng")),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evercore() -> SelectorScraper {
        SelectorScraper::new(
            "Evercore",
            "evercore.com",
            "https://www.evercore.com/join-us/open-positions/",
            BoardSelectors {
                row: ".position",
                title: ".position-title",
                location: ".position-location",
                link: "a",
                description: Some(".position-summary"),
            },
        )
    }

    #[test]
    fn test_parse_board_extracts_rows() {
        let html = r#"
            <div class="position">
                <a href="/jobs/123">
                    <span class="position-title">M&amp;A Analyst</span>
                    <span class="position-location">New York, NY</span>
                    <p class="position-summary">Advisory work on mergers.</p>
                </a>
            </div>
            <div class="position">
                <a href="https://example.com/jobs/456">
                    <span class="position-title">Restructuring Associate</span>
                    <span class="position-location">London</span>
                </a>
            </div>
        "#;
        let postings = evercore().parse_board(html).unwrap();
        assert_eq!(postings.len(), 2);

        assert_eq!(postings[0].title, "M&A Analyst");
        assert_eq!(postings[0].location, "New York, NY");
        assert_eq!(postings[0].description, "Advisory work on mergers.");
        // Relative href resolved against the board URL.
        assert_eq!(postings[0].job_url, "https://www.evercore.com/jobs/123");

        assert_eq!(postings[1].job_url, "https://example.com/jobs/456");
        assert_eq!(postings[1].description, "");
    }

    #[test]
    fn test_parse_board_skips_titleless_rows() {
        let html = r#"
            <div class="position"><a href="/x"><span class="position-location">NY</span></a></div>
            <div class="position">
                <a href="/y"><span class="position-title">Analyst</span></a>
            </div>
        "#;
        let postings = evercore().parse_board(html).unwrap();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].title, "Analyst");
    }

    #[test]
    fn test_parse_board_no_rows_is_error() {
        let err = evercore().parse_board("<html><body></body></html>").unwrap_err();
        assert!(matches!(err, AppError::ScrapeError(_)));
    }

    #[test]
    fn test_greenhouse_payload() {
        let payload = r#"{
            "jobs": [
                {
                    "title": "Execution Trader",
                    "absolute_url": "https://boards.greenhouse.io/point72/jobs/1",
                    "location": {"name": "Hong Kong SAR, China"},
                    "content": "Desk execution across Asia.",
                    "updated_at": "2026-08-01T12:00:00-04:00"
                },
                {
                    "title": "Compliance Analyst",
                    "absolute_url": "https://boards.greenhouse.io/point72/jobs/2",
                    "location": {"name": "Stamford, CT"}
                }
            ]
        }"#;
        let scraper = GreenhouseScraper::new("Point72", "point72");
        let postings = scraper.parse_payload(payload).unwrap();
        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].title, "Execution Trader");
        assert_eq!(postings[0].location, "Hong Kong SAR, China");
        assert!(postings[0].post_date.is_some());
        assert_eq!(postings[1].description, "");
        assert!(postings[1].post_date.is_none());
    }

    #[tokio::test]
    async fn test_registry_order_is_stable() {
        let names: Vec<_> = registry().iter().map(|s| s.company().to_string()).collect();
        assert_eq!(names, vec!["Evercore", "Lazard", "Point72", "DRW"]);
    }
}

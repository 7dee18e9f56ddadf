// src/services/extractor.rs

//! Job posting extractor.
//!
//! Turns listing page HTML into postings using the configured selector
//! chains and posting defaults. Pure: never touches the network.

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{JobPosting, ListingSelectors, PostingDefaults, iso_timestamp};
use crate::utils::text::non_empty;

/// Ordered selectors for one field; the first non-empty match wins.
#[derive(Debug)]
struct FieldChain {
    selectors: Vec<Selector>,
}

impl FieldChain {
    fn parse(chain: &[String]) -> Result<Self> {
        let selectors = chain
            .iter()
            .map(|s| JobExtractor::parse_selector(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { selectors })
    }

    /// Trimmed text of the first matching element with non-empty text.
    fn first_text(&self, element: &ElementRef) -> Option<String> {
        self.selectors.iter().find_map(|selector| {
            element.select(selector).find_map(|matched| {
                let text: String = matched.text().collect();
                non_empty(&text).map(str::to_string)
            })
        })
    }
}

/// Extracts job postings from listing page HTML.
#[derive(Debug)]
pub struct JobExtractor {
    listing: Selector,
    title: FieldChain,
    location: FieldChain,
    pay_rate: FieldChain,
    description: FieldChain,
    defaults: PostingDefaults,
}

impl JobExtractor {
    /// Compile the selector chains. Fails on any unparsable selector.
    pub fn new(selectors: &ListingSelectors, defaults: PostingDefaults) -> Result<Self> {
        selectors.validate()?;
        Ok(Self {
            listing: Self::parse_selector(&selectors.listing.join(", "))?,
            title: FieldChain::parse(&selectors.title)?,
            location: FieldChain::parse(&selectors.location)?,
            pay_rate: FieldChain::parse(&selectors.pay_rate)?,
            description: FieldChain::parse(&selectors.description)?,
            defaults,
        })
    }

    /// Extract postings in document order.
    ///
    /// Listings without a title are skipped. `scanned_at` becomes every
    /// posting's `postedDate`.
    pub fn extract(&self, html: &str, source_url: &str, scanned_at: DateTime<Utc>) -> Vec<JobPosting> {
        let document = Html::parse_document(html);
        let posted_date = iso_timestamp(scanned_at);

        let mut postings = Vec::new();
        let mut skipped = 0usize;
        for element in document.root_element().select(&self.listing) {
            match self.parse_listing(&element, source_url, &posted_date) {
                Some(posting) => postings.push(posting),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            log::debug!("Skipped {} listings without a title", skipped);
        }
        postings
    }

    fn parse_listing(
        &self,
        element: &ElementRef,
        source_url: &str,
        posted_date: &str,
    ) -> Option<JobPosting> {
        let title = self.title.first_text(element)?;
        let defaults = &self.defaults;

        Some(JobPosting {
            title,
            company: defaults.company.clone(),
            location: self
                .location
                .first_text(element)
                .unwrap_or_else(|| defaults.location.clone()),
            pay_rate: self
                .pay_rate
                .first_text(element)
                .unwrap_or_else(|| defaults.pay_rate.clone()),
            posted_date: posted_date.to_string(),
            job_type: defaults.job_type.clone(),
            description: self
                .description
                .first_text(element)
                .unwrap_or_else(|| defaults.description.clone()),
            skills: defaults.skills.clone(),
            years_experience: defaults.years_experience,
            source_url: source_url.to_string(),
        })
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    const SOURCE: &str = "https://example.com/jobs";

    fn extractor() -> JobExtractor {
        JobExtractor::new(&ListingSelectors::default(), PostingDefaults::default()).unwrap()
    }

    fn scanned_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 14, 30, 0).unwrap()
    }

    const BOARD: &str = r#"
        <html><body>
          <div class="job-listing-item">
            <h3 class="job-title"> Forklift Operator </h3>
            <span class="location">Shakopee, MN</span>
            <span class="pay">$21.50 / hr</span>
            <p class="description">Second shift, reach truck experience.</p>
          </div>
          <div class="job-item">
            <a class="title" href="/jobs/2">Warehouse Associate</a>
          </div>
          <div class="job-listing">
            <span class="job-title">   </span>
            <span class="location">Edina, MN</span>
          </div>
          <table>
            <tr class="job-row">
              <td><a class="job-title" href="/jobs/4">Machine Operator</a></td>
              <td class="job-location">Burnsville, MN</td>
              <td class="salary">$19.00 / hr</td>
              <td class="summary">Day shift.</td>
            </tr>
          </table>
        </body></html>
    "#;

    #[test]
    fn test_extract_in_document_order() {
        let postings = extractor().extract(BOARD, SOURCE, scanned_at());
        let titles: Vec<&str> = postings.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Forklift Operator", "Warehouse Associate", "Machine Operator"]
        );
    }

    #[test]
    fn test_explicit_fields_trimmed() {
        let postings = extractor().extract(BOARD, SOURCE, scanned_at());
        let first = &postings[0];
        assert_eq!(first.location, "Shakopee, MN");
        assert_eq!(first.pay_rate, "$21.50 / hr");
        assert_eq!(first.description, "Second shift, reach truck experience.");
        assert_eq!(first.posted_date, "2026-01-05T14:30:00.000Z");
        assert_eq!(first.source_url, SOURCE);

        let row = &postings[2];
        assert_eq!(row.location, "Burnsville, MN");
        assert_eq!(row.pay_rate, "$19.00 / hr");
        assert_eq!(row.description, "Day shift.");
    }

    #[test]
    fn test_missing_fields_use_defaults_verbatim() {
        let postings = extractor().extract(BOARD, SOURCE, scanned_at());
        let bare = &postings[1];
        assert_eq!(bare.location, "MN");
        assert_eq!(bare.pay_rate, "$18.00 / hr");
        assert_eq!(bare.description, "View full details on the Atlas Job Board.");
        assert_eq!(bare.company, "Atlas Staffing");
        assert_eq!(bare.job_type, "Full-Time");
        assert_eq!(bare.skills, vec!["Industrial", "Labor"]);
        assert_eq!(bare.years_experience, 1);
    }

    #[test]
    fn test_blank_titles_skipped() {
        let html = r#"
            <div class="job-item"><span class="job-title"></span></div>
            <div class="job-item"><span class="job-title">
            </span></div>
            <div class="job-item"><span class="pay">$30.00 / hr</span></div>
        "#;
        assert!(extractor().extract(html, SOURCE, scanned_at()).is_empty());
    }

    #[test]
    fn test_no_listings() {
        let html = "<html><body><p>No jobs match your search.</p></body></html>";
        assert!(extractor().extract(html, SOURCE, scanned_at()).is_empty());
    }

    #[test]
    fn test_chain_falls_through_to_later_selector() {
        // `.job-title` is present but empty, so `a.title` supplies the title
        let html = r#"
            <div class="job-listing-item">
              <span class="job-title"> </span>
              <a class="title">Picker / Packer</a>
              <span class="location"></span>
              <span class="job-location">Plymouth, MN</span>
            </div>
        "#;
        let postings = extractor().extract(html, SOURCE, scanned_at());
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].title, "Picker / Packer");
        assert_eq!(postings[0].location, "Plymouth, MN");
    }

    #[test]
    fn test_extraction_is_repeatable() {
        let extractor = extractor();
        let tuples = |postings: Vec<JobPosting>| -> Vec<(String, String, String, String)> {
            postings
                .into_iter()
                .map(|p| (p.title, p.location, p.pay_rate, p.description))
                .collect()
        };

        let first = tuples(extractor.extract(BOARD, SOURCE, scanned_at()));
        let second = tuples(extractor.extract(BOARD, SOURCE, Utc::now()));
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_defaults() {
        let defaults = PostingDefaults {
            pay_rate: "$20.00 / hr".to_string(),
            ..PostingDefaults::default()
        };
        let extractor = JobExtractor::new(&ListingSelectors::default(), defaults).unwrap();
        let postings = extractor.extract(BOARD, SOURCE, scanned_at());
        assert_eq!(postings[1].pay_rate, "$20.00 / hr");
    }

    #[test]
    fn test_invalid_selector_rejected() {
        let selectors = ListingSelectors {
            title: vec!["[[invalid".to_string()],
            ..ListingSelectors::default()
        };
        let err = JobExtractor::new(&selectors, PostingDefaults::default()).unwrap_err();
        assert!(matches!(err, AppError::Selector { .. }));
    }

    #[test]
    fn test_parse_selector_valid() {
        assert!(JobExtractor::parse_selector("div.job-item").is_ok());
        assert!(JobExtractor::parse_selector("tr:has(a)").is_ok());
    }
}

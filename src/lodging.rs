//! Lodging discovery
//!
//! Searches the lodging site for a ranked location and extracts listing
//! titles and ratings from the rendered result page.

use crate::error::RecordError;
use crate::fetch::{FetchRequest, Fetcher};
use crate::html::{Selector, nested_texts};
use crate::models::{LodgingCandidate, Rating};
use std::time::Duration;
use tracing::{debug, instrument};

const PROPERTY_CARD: Selector<'static> = Selector::with_value("div", "data-testid", "property-card");
const LISTING_TITLE: Selector<'static> = Selector::with_value("div", "data-testid", "title");
const REVIEW_SCORE: Selector<'static> = Selector::with_value("div", "data-testid", "review-score");
const LABELLED: Selector<'static> = Selector::with_attribute("div", "aria-label");

/// Search page client for one lodging site
#[derive(Debug, Clone)]
pub struct LodgingDiscoverer {
    url: String,
    lang: String,
    user_agent: String,
    accept_language: String,
    country_name: String,
    timeout: Duration,
}

impl LodgingDiscoverer {
    #[must_use]
    pub fn new(
        url: String,
        lang: String,
        user_agent: String,
        accept_language: String,
        country_name: String,
        timeout: Duration,
    ) -> Self {
        Self {
            url,
            lang,
            user_agent,
            accept_language,
            country_name,
            timeout,
        }
    }

    /// Search request for `"<city>, <country>"` with browser-like headers
    #[must_use]
    pub fn request(&self, location_name: &str) -> FetchRequest {
        FetchRequest::get(self.url.clone(), self.timeout)
            .param("ss", format!("{location_name}, {}", self.country_name))
            .param("lang", &self.lang)
            .header("User-Agent", self.user_agent.clone())
            .header("Accept-Language", self.accept_language.clone())
    }

    /// Up to `max_results` candidates for `location_name`, without coordinates
    #[instrument(name = "lodging_search", level = "debug", skip(self, fetcher))]
    pub async fn discover<F: Fetcher>(
        &self,
        fetcher: &F,
        location_name: &str,
        max_results: usize,
    ) -> Result<Vec<LodgingCandidate>, RecordError> {
        let document = fetcher.fetch(&self.request(location_name)).await?;

        let candidates: Vec<LodgingCandidate> = extract_listings(&document, max_results)
            .into_iter()
            .map(|(label, rating)| LodgingCandidate::new(location_name, label, rating))
            .collect();

        debug!("{} listings found for {}", candidates.len(), location_name);
        Ok(candidates)
    }
}

/// Pair listing titles with review ratings by position.
///
/// Titles are the direct text of `div[data-testid="title"]` inside a property
/// card; ratings the direct text of `div[aria-label]` inside a review-score
/// block. Only the first `max_results` titles are kept and a title without a
/// rating at its index gets [`Rating::Unknown`].
#[must_use]
pub fn extract_listings(document: &str, max_results: usize) -> Vec<(String, Rating)> {
    let titles = nested_texts(document, &PROPERTY_CARD, &LISTING_TITLE);
    let ratings = nested_texts(document, &REVIEW_SCORE, &LABELLED);

    titles
        .into_iter()
        .take(max_results)
        .enumerate()
        .map(|(index, title)| {
            let rating = ratings
                .get(index)
                .map_or(Rating::Unknown, |raw| Rating::parse(raw));
            (title, rating)
        })
        .collect()
}

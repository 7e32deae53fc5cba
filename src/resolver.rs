//! Place resolution: free text or a shared map link in, canonical place
//! name plus coordinates out.
//!
//! Shortened links are expanded by following redirects with a browser-like
//! client, then mined for a name (`/place/<name>/` path segment first, `q=`
//! query parameter second). The candidate text is canonicalized through the
//! place directory and the resulting title cleaned of marketing suffixes.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::{Client, Url};
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::traits::{PlaceCandidate, PlaceDirectory};

/// Hosts treated as shortened map links that need redirect expansion.
const SHORT_LINK_HOSTS: &[&str] = &["maps.app.goo.gl", "goo.gl"];

/// Anything after the first of these separates the place name from a
/// marketing suffix or rating string.
const TITLE_DELIMITERS: &[char] = &['｜', '|', '-', '、', '(', '（', '·'];

static CJK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new("[\u{4e00}-\u{9fff}]{2,}").unwrap());

/// Why one input line could not be resolved. Reported per line, never
/// propagated as a fatal error: a batch add must partially succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveFailure {
    /// The link provider answered with a block/CAPTCHA page and the
    /// shortened URL itself carried no usable name.
    Blocked,
    /// No candidate place for the input.
    NoMatch,
    /// Strict mode only: the cleaned name could not be geocoded.
    Ungeocoded,
    /// Network or upstream API failure.
    Upstream(String),
}

impl fmt::Display for ResolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveFailure::Blocked => write!(f, "link provider blocked the request"),
            ResolveFailure::NoMatch => write!(f, "no matching place"),
            ResolveFailure::Ungeocoded => write!(f, "place could not be geocoded"),
            ResolveFailure::Upstream(msg) => write!(f, "upstream failure: {}", msg),
        }
    }
}

pub struct PlaceResolver {
    http: Client,
    directory: Arc<dyn PlaceDirectory>,
    strict_geocode: bool,
    cjk_locale: bool,
}

impl PlaceResolver {
    pub fn new(
        directory: Arc<dyn PlaceDirectory>,
        config: &ResolverConfig,
        cjk_locale: bool,
    ) -> Self {
        Self {
            http: build_link_client(Duration::from_secs(config.timeout_secs)),
            directory,
            strict_geocode: config.strict_geocode,
            cjk_locale,
        }
    }

    /// Resolve one input line into a storable candidate.
    pub async fn resolve(&self, raw_input: &str) -> Result<PlaceCandidate, ResolveFailure> {
        let input = raw_input.trim();

        let url_candidate = if is_short_link(input) {
            Some(self.expand_link(input).await?)
        } else {
            None
        };

        let name = match &url_candidate {
            // The URL already yielded a name; the directory only
            // canonicalizes it. Keep the URL-derived text when the search
            // has no candidate of its own.
            Some(text) => match self.directory.find_place(text).await {
                Ok(Some(canonical)) => canonical,
                Ok(None) => text.clone(),
                Err(e) => return Err(ResolveFailure::Upstream(e.to_string())),
            },
            None => match self.directory.find_place(input).await {
                Ok(Some(canonical)) => canonical,
                Ok(None) => return Err(ResolveFailure::NoMatch),
                Err(e) => return Err(ResolveFailure::Upstream(e.to_string())),
            },
        };

        let name = clean_place_title(&name);
        if name.is_empty() {
            return Err(ResolveFailure::NoMatch);
        }

        let coords = match self.directory.geocode(&name).await {
            Ok(coords) => coords,
            Err(e) => {
                warn!(place = %name, error = %e, "geocoding failed, degrading to no coordinates");
                None
            }
        };
        if coords.is_none() && self.strict_geocode {
            return Err(ResolveFailure::Ungeocoded);
        }

        Ok(PlaceCandidate { name, coords })
    }

    /// Follow the shortened link and mine the final URL for a place name.
    async fn expand_link(&self, link: &str) -> Result<String, ResolveFailure> {
        let resp = self
            .http
            .get(link)
            .send()
            .await
            .map_err(|e| ResolveFailure::Upstream(e.to_string()))?;

        let final_url = resp.url().clone();
        let status = resp.status().as_u16();
        if looks_blocked(&final_url, status) {
            debug!(url = %final_url, status, "link expansion blocked, trying the short path itself");
            return name_from_short_path(link)
                .map(|name| self.narrow(&name))
                .ok_or(ResolveFailure::Blocked);
        }

        debug!(url = %final_url, "link expanded");
        self.candidate_from_url(&final_url)
            .ok_or(ResolveFailure::NoMatch)
    }

    /// Name heuristics over a resolved map URL, in order: `/place/<name>/`
    /// path segment, then the `q=` query parameter.
    fn candidate_from_url(&self, url: &Url) -> Option<String> {
        if let Some(name) = place_path_segment(url) {
            return Some(self.narrow(&name));
        }
        if let Some((_, q)) = url.query_pairs().find(|(k, _)| k == "q") {
            let decoded = percent_decode_str(&q).decode_utf8_lossy().into_owned();
            return Some(self.narrow(&decoded));
        }
        None
    }

    /// In CJK locales a URL-derived candidate often leads with a street
    /// address; the longest contiguous CJK run is usually the landmark name.
    /// Falls back to the raw text when there is no CJK run.
    fn narrow(&self, text: &str) -> String {
        if !self.cjk_locale {
            return text.to_string();
        }
        longest_cjk_run(text).unwrap_or_else(|| text.to_string())
    }
}

fn build_link_client(timeout: Duration) -> Client {
    // Browser-like UA: the link provider serves bots a block page.
    Client::builder()
        .timeout(timeout)
        .user_agent(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/124.0 Safari/537.36",
        )
        .build()
        .expect("failed to build link expansion HTTP client")
}

pub fn is_short_link(input: &str) -> bool {
    SHORT_LINK_HOSTS.iter().any(|host| input.contains(host))
}

fn looks_blocked(url: &Url, status: u16) -> bool {
    status == 403 || status == 429 || url.path().starts_with("/sorry")
}

/// `/maps/place/<name>/...` → `<name>`, percent-decoded twice (the provider
/// sometimes double-encodes the segment).
fn place_path_segment(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?;
    while let Some(segment) = segments.next() {
        if segment == "place" {
            return segments.next().map(double_decode);
        }
    }
    None
}

/// Some share links embed the name in the shortened URL path itself. Opaque
/// share tokens are single-run ASCII, so only a decoded segment with CJK
/// text, whitespace or `+` separators is a plausible name.
fn name_from_short_path(link: &str) -> Option<String> {
    let url = Url::parse(link)
        .or_else(|_| Url::parse(&format!("https://{}", link)))
        .ok()?;
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = double_decode(segment);
    let plausible = decoded.contains(char::is_whitespace)
        || decoded.contains('+')
        || CJK_RUN_RE.is_match(&decoded);
    plausible.then_some(decoded)
}

fn double_decode(segment: &str) -> String {
    let once = percent_decode_str(segment).decode_utf8_lossy().into_owned();
    percent_decode_str(&once).decode_utf8_lossy().into_owned()
}

/// Longest contiguous CJK run (at least two characters). Ties resolve to
/// the later run, which in address-then-landmark strings is the landmark.
pub fn longest_cjk_run(text: &str) -> Option<String> {
    let mut best: Option<&str> = None;
    for m in CJK_RUN_RE.find_iter(text) {
        let run = m.as_str();
        if best.is_none_or(|b: &str| run.chars().count() >= b.chars().count()) {
            best = Some(run);
        }
    }
    best.map(str::to_string)
}

/// Canonical title cleaning: `+` becomes space, then everything from the
/// first delimiter on is dropped.
pub fn clean_place_title(name: &str) -> String {
    let name = name.replace('+', " ");
    name.split(TITLE_DELIMITERS)
        .next()
        .unwrap_or("")
        .trim()
        .to_string()
}

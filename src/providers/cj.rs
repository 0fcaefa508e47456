//! CJ (Commission Junction) affiliate client for TicketNetwork listings.
//!
//! Queries the CJ product GraphQL endpoint for `travelExperienceProducts`
//! from the TicketNetwork advertiser and returns each listing with its
//! affiliate click-through URL.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::check_status;
use super::traits::TicketSearch;
use crate::types::{TicketCandidate, TicketQuery};
use crate::{EnrichError, Result};

/// CJ product search endpoint
pub const DEFAULT_BASE_URL: &str = "https://ads.api.cj.com/query";

/// The affiliate call bounds itself; the cache layer adds no timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// Credentials identifying the publisher account and advertiser.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CjCredentials {
    pub company_id: String,
    pub website_pid: String,
    /// TicketNetwork's advertiser id.
    pub partner_id: String,
    pub access_token: String,
}

/// Environment variables read by [`CjCredentials::from_env`].
pub const CJ_ENV_VARS: [&str; 4] = [
    "CJ_COMPANY_ID",
    "CJ_WEBSITE_PID",
    "CJ_TICKETNETWORK_PARTNER_ID",
    "CJ_ACCESS_TOKEN",
];

impl CjCredentials {
    /// Read credentials from the environment. `None` unless all four are set.
    pub fn from_env() -> Option<Self> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Some(Self {
            company_id: var(CJ_ENV_VARS[0])?,
            website_pid: var(CJ_ENV_VARS[1])?,
            partner_id: var(CJ_ENV_VARS[2])?,
            access_token: var(CJ_ENV_VARS[3])?,
        })
    }
}

/// Client for the CJ GraphQL API.
#[derive(Clone)]
pub struct CjClient {
    credentials: CjCredentials,
    http: Client,
    base_url: String,
}

impl CjClient {
    /// Create a client for the production endpoint.
    pub fn new(credentials: CjCredentials) -> Result<Self> {
        Self::with_base_url(credentials, DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom endpoint and timeout (for testing with wiremock).
    pub fn with_base_url(
        credentials: CjCredentials,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            credentials,
            http,
            base_url: base_url.into(),
        })
    }

    /// Build the GraphQL document for `query`.
    fn graphql(&self, query: &TicketQuery) -> Result<String> {
        let keywords = serde_json::to_string(&query.keywords)?;
        let c = &self.credentials;
        Ok(format!(
            r#"{{
  travelExperienceProducts(
    companyId: "{company}",
    partnerIds: ["{partner}"],
    keywords: {keywords},
    limit: {limit}
  ) {{
    resultList {{
      id
      title
      linkCode(pid: "{pid}") {{ clickUrl }}
      ... on TravelExperience {{
        travelStartDate
        performers
        locationName
        categoryName
      }}
    }}
  }}
}}"#,
            company = c.company_id,
            partner = c.partner_id,
            pid = c.website_pid,
            limit = query.limit,
        ))
    }

    /// Search TicketNetwork listings matching any keyword.
    pub async fn search_events(&self, query: &TicketQuery) -> Result<Vec<TicketCandidate>> {
        let document = self.graphql(query)?;

        let response = self
            .http
            .post(&self.base_url)
            .bearer_auth(&self.credentials.access_token)
            .json(&serde_json::json!({ "query": document }))
            .send()
            .await?;

        check_status(&response)?;

        let body: GraphQlResponse = response.json().await?;

        let page = body
            .data
            .and_then(|d| d.travel_experience_products);
        let Some(page) = page else {
            if let Some(err) = body.errors.into_iter().next() {
                return Err(EnrichError::MalformedResponse(err.message));
            }
            return Ok(Vec::new());
        };

        let total = page.result_list.len();
        let candidates: Vec<TicketCandidate> = page
            .result_list
            .into_iter()
            .filter_map(|row| serde_json::from_value::<RawProduct>(row).ok())
            .filter_map(RawProduct::into_candidate)
            .collect();
        debug!(total, usable = candidates.len(), "cj search results");
        Ok(candidates)
    }
}

#[derive(Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<ProductsData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductsData {
    #[serde(default)]
    travel_experience_products: Option<ProductPage>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductPage {
    #[serde(default)]
    result_list: Vec<serde_json::Value>,
}

/// A result row before validation; any of these may be absent or null.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProduct {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    link_code: Option<LinkCode>,
    #[serde(default)]
    travel_start_date: Option<String>,
    #[serde(default)]
    performers: Option<String>,
    #[serde(default)]
    location_name: Option<String>,
    #[serde(default)]
    category_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkCode {
    #[serde(default)]
    click_url: Option<String>,
}

impl RawProduct {
    fn into_candidate(self) -> Option<TicketCandidate> {
        Some(TicketCandidate {
            id: self.id.unwrap_or_default(),
            title: self.title.unwrap_or_default(),
            performers: self.performers?,
            category_name: self.category_name?,
            event_start_date: self.travel_start_date?,
            location_name: self.location_name,
            click_url: self.link_code?.click_url?,
        })
    }
}

#[async_trait]
impl TicketSearch for CjClient {
    fn name(&self) -> &str {
        "cj"
    }

    async fn search(&self, query: &TicketQuery) -> Result<Vec<TicketCandidate>> {
        CjClient::search_events(self, query).await
    }
}

//! # Verse Metadata over HTTP
//!
//! [`VerseMetadataProvider`] backed by the alquran.cloud `ayah` endpoint:
//!
//! ```text
//! GET {base}/v1/ayah/{chapter}:{verse}
//! { "code": 200, "data": { "number": 262, "text": "...", "surah": { ... }, ... } }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, RetryPolicy};
use core_library::models::{VerseMetadata, VerseReference};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{CacheError, Result};
use crate::traits::VerseMetadataProvider;

#[derive(Debug, Deserialize)]
struct AyahEnvelope {
    code: u16,
    data: AyahData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AyahData {
    number: u16,
    text: String,
    surah: SurahData,
    number_in_surah: u16,
    manzil: u16,
    page: u16,
    ruku: u16,
    hizb_quarter: u16,
    sajda: Sajda,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SurahData {
    number: u16,
    name: String,
    english_name: String,
    revelation_type: String,
    number_of_ayahs: u16,
}

/// `false`, or an object describing the prostration.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Sajda {
    Flag(bool),
    Detail(serde_json::Value),
}

impl Sajda {
    fn is_sajda(&self) -> bool {
        match self {
            Sajda::Flag(flag) => *flag,
            Sajda::Detail(_) => true,
        }
    }
}

impl From<AyahData> for VerseMetadata {
    fn from(data: AyahData) -> Self {
        VerseMetadata {
            sajda: data.sajda.is_sajda(),
            text: data.text,
            chapter_name: data.surah.name,
            chapter_name_en: data.surah.english_name,
            chapter: data.surah.number,
            revelation_type: data.surah.revelation_type,
            verse_count: data.surah.number_of_ayahs,
            hizb_quarter: data.hizb_quarter,
            ruku: data.ruku,
            page: data.page,
            manzil: data.manzil,
            global_number: data.number,
            verse_in_chapter: data.number_in_surah,
        }
    }
}

/// Fetches verse metadata from a JSON API.
pub struct HttpVerseMetadataProvider {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    retry_policy: RetryPolicy,
}

impl HttpVerseMetadataProvider {
    pub fn new(http_client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry_policy: RetryPolicy::default(),
        }
    }

    fn endpoint(&self, reference: &VerseReference) -> String {
        format!("{}/v1/ayah/{}", self.base_url, reference.cache_id())
    }
}

#[async_trait]
impl VerseMetadataProvider for HttpVerseMetadataProvider {
    #[instrument(skip(self), fields(verse = %reference))]
    async fn get_verse_metadata(&self, reference: &VerseReference) -> Result<VerseMetadata> {
        let url = self.endpoint(reference);
        let request = HttpRequest::new(HttpMethod::Get, &url).header("Accept", "application/json");

        let response = self
            .http_client
            .execute_with_retry(request, self.retry_policy.clone())
            .await
            .map_err(|e| CacheError::NetworkFailure(format!("Metadata request failed: {}", e)))?;

        if response.status == 404 {
            return Err(CacheError::NotFound {
                entity_type: "Verse".to_string(),
                id: reference.cache_id(),
            });
        }
        if !response.is_success() {
            return Err(CacheError::NetworkFailure(format!(
                "Metadata service returned HTTP {} for {}",
                response.status, url
            )));
        }

        let envelope: AyahEnvelope = response.json().map_err(|e| {
            CacheError::NetworkFailure(format!("Malformed metadata for {}: {}", reference, e))
        })?;
        if envelope.code != 200 {
            return Err(CacheError::NetworkFailure(format!(
                "Metadata service answered code {} for {}",
                envelope.code, reference
            )));
        }

        let data = envelope.data;
        if data.surah.number != reference.chapter() || data.number_in_surah != reference.verse() {
            return Err(CacheError::NetworkFailure(format!(
                "Metadata service returned {}:{} for {}",
                data.surah.number, data.number_in_surah, reference
            )));
        }

        debug!("Fetched metadata for {}", reference);
        Ok(data.into())
    }
}

//! Remote asset locations
//!
//! Page images are addressed by chapter and verse, recitations by the global
//! verse number under a reciter edition and bitrate.

use core_library::models::VerseReference;

use crate::config::{CacheConfig, ImageQuality};

/// URL builder for verse images and recitations
#[derive(Debug, Clone)]
pub struct AssetUrls {
    image_base: String,
    audio_base: String,
    audio_bitrate: String,
    image_quality: ImageQuality,
}

impl AssetUrls {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            image_base: config.image_base_url.trim_end_matches('/').to_string(),
            audio_base: config.audio_base_url.trim_end_matches('/').to_string(),
            audio_bitrate: config.audio_bitrate.clone(),
            image_quality: config.image_quality,
        }
    }

    /// `{base}/{quality}/{chapter}/{verse}`
    pub fn image_url(&self, reference: &VerseReference) -> String {
        format!(
            "{}/{}/{}/{}",
            self.image_base,
            self.image_quality.as_path_segment(),
            reference.chapter(),
            reference.verse()
        )
    }

    /// `{base}/{bitrate}/{reciter}/{global}.mp3`
    pub fn audio_url(&self, reference: &VerseReference, reciter: &str) -> String {
        format!(
            "{}/{}/{}/{}.mp3",
            self.audio_base,
            self.audio_bitrate,
            reciter,
            reference.global_number()
        )
    }
}

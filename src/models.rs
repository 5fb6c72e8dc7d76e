// src/models.rs
use crate::color::Color;
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A source image accepted by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub uuid: String,
    /// Client-local reference to the original bytes, shown as the preview.
    pub local_preview: String,
}

/// Raw image bytes validated for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
    pub local_preview: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecolorSettings {
    /// Keep source luminance and reflections instead of flat-filling the paint.
    pub preserve_luminance: bool,
}

impl Default for RecolorSettings {
    fn default() -> Self {
        Self {
            preserve_luminance: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformationRequest {
    #[serde(skip)]
    pub image_uuid: String,
    pub color: Color,
    pub settings: RecolorSettings,
}

/// Durable record of one completed recolor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub uuid: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub color: Color,
    #[serde(default)]
    pub original_image: Option<String>,
    pub recolored_image: String,
    #[serde(default)]
    pub settings: RecolorSettings,
}

/// A history row before the store stamps it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewHistoryEntry {
    pub uuid: String,
    pub color: Color,
    pub original_image: Option<String>,
    pub recolored_image: String,
    pub settings: RecolorSettings,
}

impl NewHistoryEntry {
    pub fn stamped(self, timestamp: DateTime<Utc>) -> HistoryEntry {
        HistoryEntry {
            uuid: self.uuid,
            timestamp,
            color: self.color,
            original_image: self.original_image,
            recolored_image: self.recolored_image,
            settings: self.settings,
        }
    }

    pub fn matches(&self, entry: &HistoryEntry) -> bool {
        self.uuid == entry.uuid
            && self.color == entry.color
            && self.recolored_image == entry.recolored_image
            && self.settings == entry.settings
    }
}

// Stored rows carry either RFC 3339 or naive ISO-8601 timestamps; naive
// values are taken as UTC.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of the mask and analysis stages.
#[derive(Debug, Clone, Deserialize)]
pub struct StageResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub cached: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecolorResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AckResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct ImageStatus {
    pub mask_complete: bool,
    pub analysis_complete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn settings_default_preserves_luminance() {
        assert!(RecolorSettings::default().preserve_luminance);
        let parsed: RecolorSettings = serde_json::from_str("{}").unwrap();
        assert!(parsed.preserve_luminance);
    }

    #[test]
    fn history_entry_accepts_naive_timestamps() {
        let json = r#"{
            "uuid": "abc123.jpg",
            "timestamp": "2024-05-01T12:34:56.789012",
            "color": [255, 0, 0],
            "original_image": null,
            "recolored_image": "http://localhost:8000/api/recolored/abc123.jpg",
            "settings": {"preserve_luminance": true}
        }"#;
        let entry: HistoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.color, Color::new(255, 0, 0));
        assert_eq!(entry.original_image, None);
        assert_eq!(
            entry.timestamp.date_naive(),
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap().date_naive()
        );
    }

    #[test]
    fn history_entry_accepts_rfc3339_timestamps() {
        let json = r#"{
            "uuid": "u",
            "timestamp": "2024-05-01T12:00:00+02:00",
            "color": [0, 0, 255],
            "recolored_image": "r"
        }"#;
        let entry: HistoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.timestamp, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
        assert_eq!(entry.settings, RecolorSettings::default());
    }

    #[test]
    fn recolor_request_body_omits_uuid() {
        let request = TransformationRequest {
            image_uuid: "abc123".to_string(),
            color: Color::new(1, 2, 3),
            settings: RecolorSettings {
                preserve_luminance: false,
            },
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"color": [1, 2, 3], "settings": {"preserve_luminance": false}})
        );
    }
}

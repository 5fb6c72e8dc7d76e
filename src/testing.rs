// src/testing.rs
//! Scripted in-memory gateway for unit tests.

use crate::color::Color;
use crate::errors::StudioError;
use crate::models::{HistoryEntry, ImageStatus, NewHistoryEntry, TransformationRequest, UploadFile};
use crate::pipeline::PipelineStage;
use crate::services::gateway::ImageGateway;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, TimeZone, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Upload(String),
    Mask(String),
    Analyze(String),
    Recolor(String, Color),
}

#[derive(Default)]
struct Script {
    calls: Vec<Call>,
    uploads: u32,
    queued_uuids: VecDeque<String>,
    failing: HashSet<PipelineStage>,
    held_masks: HashSet<String>,
    masked: HashSet<String>,
    analyzed: HashSet<String>,
    recolored: HashMap<String, Color>,
    history: Vec<HistoryEntry>,
    history_writes: i64,
    hide_history: bool,
    history_limit: Option<usize>,
    fail_history_create: bool,
}

pub struct ScriptedGateway {
    script: Mutex<Script>,
    mask_reached: Notify,
    mask_released: Notify,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::default()),
            mask_reached: Notify::new(),
            mask_released: Notify::new(),
        }
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    /// Next upload returns `uuid` instead of the generated `u{n}`.
    pub fn queue_uuid(&self, uuid: &str) {
        self.script().queued_uuids.push_back(uuid.to_string());
    }

    pub fn fail_stage(&self, stage: PipelineStage, failing: bool) {
        let mut script = self.script();
        if failing {
            script.failing.insert(stage);
        } else {
            script.failing.remove(&stage);
        }
    }

    /// Mask generation for `uuid` blocks until [`Self::release_mask`].
    pub fn hold_mask_for(&self, uuid: &str) {
        self.script().held_masks.insert(uuid.to_string());
    }

    pub async fn wait_for_held_mask(&self) {
        self.mask_reached.notified().await;
    }

    pub fn release_mask(&self) {
        self.mask_released.notify_one();
    }

    pub fn hide_history_from_listing(&self, hide: bool) {
        self.script().hide_history = hide;
    }

    /// Listings return at most `limit` rows, oldest first.
    pub fn limit_history_listing(&self, limit: Option<usize>) {
        self.script().history_limit = limit;
    }

    /// Stores a row as if another client had created it.
    pub fn seed_history(&self, entry: HistoryEntry) {
        self.script().history.push(entry);
    }

    pub fn fail_history_create(&self, fail: bool) {
        self.script().fail_history_create = fail;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script().calls.clone()
    }

    pub fn stored_history(&self) -> Vec<HistoryEntry> {
        self.script().history.clone()
    }

    fn check_stage(&self, stage: PipelineStage, make: fn(String) -> StudioError) -> Result<(), StudioError> {
        if self.script().failing.contains(&stage) {
            return Err(make(format!("scripted {} failure", stage)));
        }
        Ok(())
    }
}

#[async_trait]
impl ImageGateway for ScriptedGateway {
    async fn upload(&self, file: &UploadFile) -> Result<String, StudioError> {
        self.script().calls.push(Call::Upload(file.filename.clone()));
        self.check_stage(PipelineStage::Upload, StudioError::UploadFailed)?;

        let mut script = self.script();
        script.uploads += 1;
        let generated = format!("u{}", script.uploads);
        Ok(script.queued_uuids.pop_front().unwrap_or(generated))
    }

    async fn generate_mask(&self, uuid: &str) -> Result<(), StudioError> {
        let held = {
            let mut script = self.script();
            script.calls.push(Call::Mask(uuid.to_string()));
            script.held_masks.remove(uuid)
        };
        if held {
            self.mask_reached.notify_one();
            self.mask_released.notified().await;
        }

        self.check_stage(PipelineStage::Mask, StudioError::MaskGenerationFailed)?;
        self.script().masked.insert(uuid.to_string());
        Ok(())
    }

    async fn analyze(&self, uuid: &str) -> Result<(), StudioError> {
        self.script().calls.push(Call::Analyze(uuid.to_string()));
        self.check_stage(PipelineStage::Analysis, StudioError::AnalysisFailed)?;

        let mut script = self.script();
        if !script.masked.contains(uuid) {
            return Err(StudioError::AnalysisFailed(format!("no mask for {}", uuid)));
        }
        script.analyzed.insert(uuid.to_string());
        Ok(())
    }

    async fn image_status(&self, uuid: &str) -> Result<ImageStatus, StudioError> {
        let script = self.script();
        Ok(ImageStatus {
            mask_complete: script.masked.contains(uuid),
            analysis_complete: script.analyzed.contains(uuid),
        })
    }

    async fn recolor(&self, request: &TransformationRequest) -> Result<(), StudioError> {
        self.script()
            .calls
            .push(Call::Recolor(request.image_uuid.clone(), request.color));
        self.check_stage(PipelineStage::Recolor, StudioError::RecolorFailed)?;

        let mut script = self.script();
        if !script.analyzed.contains(&request.image_uuid) {
            return Err(StudioError::RecolorFailed(format!(
                "no analysis for {}",
                request.image_uuid
            )));
        }
        script.recolored.insert(request.image_uuid.clone(), request.color);
        Ok(())
    }

    fn recolored_url(&self, uuid: &str) -> String {
        format!("memory://recolored/{}", uuid)
    }

    async fn fetch_recolored(&self, uuid: &str) -> Result<Bytes, StudioError> {
        match self.script().recolored.get(uuid) {
            Some(color) => Ok(Bytes::from(format!("{}:{}", uuid, color))),
            None => Err(StudioError::RecolorFailed(format!("No recolored image for {}", uuid))),
        }
    }

    async fn list_history(&self) -> Result<Vec<HistoryEntry>, StudioError> {
        let script = self.script();
        if script.hide_history {
            return Ok(Vec::new());
        }
        let limit = script.history_limit.unwrap_or(script.history.len());
        Ok(script.history.iter().take(limit).cloned().collect())
    }

    async fn create_history(&self, entry: &NewHistoryEntry) -> Result<(), StudioError> {
        let mut script = self.script();
        if script.fail_history_create {
            return Err(StudioError::NetworkError("scripted history failure".to_string()));
        }

        script.history_writes += 1;
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + Duration::seconds(script.history_writes);
        script.history.push(entry.clone().stamped(timestamp));
        Ok(())
    }

    async fn delete_history(&self, uuid: &str) -> Result<(), StudioError> {
        let mut script = self.script();
        let before = script.history.len();
        script.history.retain(|entry| entry.uuid != uuid);
        if script.history.len() == before {
            return Err(StudioError::HistoryNotFound(uuid.to_string()));
        }
        Ok(())
    }
}

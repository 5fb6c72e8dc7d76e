// src/pipeline.rs
//! Upload → mask → analysis → recolor orchestration for one image at a time.
//!
//! Each submitted image gets its own session id. Every remote call is made on
//! behalf of a session, and its result is applied only while that session is
//! still the active one; results for a superseded session are dropped and
//! reported as [`StudioError::Superseded`]. In-flight calls are never aborted.
//!
//! Observers follow progress through a [`tokio::sync::watch`] channel of
//! [`PipelineSnapshot`]s.

use crate::color::Color;
use crate::errors::{ErrorKind, StudioError};
use crate::models::{
    HistoryEntry, ImageAsset, NewHistoryEntry, RecolorSettings, TransformationRequest, UploadFile,
};
use crate::services::{HistoryStore, ImageGateway};
use log::{debug, info, warn};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Upload,
    Mask,
    Analysis,
    Recolor,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PipelineStage::Upload => "upload",
            PipelineStage::Mask => "mask",
            PipelineStage::Analysis => "analysis",
            PipelineStage::Recolor => "recolor",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Uploading,
    MaskPending,
    AnalysisPending,
    Ready,
    Recoloring,
    Complete,
    Failed {
        stage: PipelineStage,
        kind: ErrorKind,
        message: String,
    },
}

impl PipelineState {
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            PipelineState::Uploading
                | PipelineState::MaskPending
                | PipelineState::AnalysisPending
                | PipelineState::Recoloring
        )
    }

    /// Analysis has been acknowledged for the bound image.
    pub fn transform_enabled(&self) -> bool {
        matches!(
            self,
            PipelineState::Ready
                | PipelineState::Complete
                | PipelineState::Failed {
                    stage: PipelineStage::Recolor,
                    ..
                }
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Idle => f.write_str("idle"),
            PipelineState::Uploading => f.write_str("uploading"),
            PipelineState::MaskPending => f.write_str("generating mask"),
            PipelineState::AnalysisPending => f.write_str("analyzing"),
            PipelineState::Ready => f.write_str("ready"),
            PipelineState::Recoloring => f.write_str("recoloring"),
            PipelineState::Complete => f.write_str("complete"),
            PipelineState::Failed { stage, message, .. } => {
                write!(f, "failed at {}: {}", stage, message)
            }
        }
    }
}

/// What observers see after every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSnapshot {
    pub session: Option<Uuid>,
    pub state: PipelineState,
    /// Bound once upload succeeds; carries the local preview.
    pub asset: Option<ImageAsset>,
    /// Latest recolored artifact; replaced on every successful recolor.
    pub recolored_url: Option<String>,
}

impl Default for PipelineSnapshot {
    fn default() -> Self {
        Self {
            session: None,
            state: PipelineState::Idle,
            asset: None,
            recolored_url: None,
        }
    }
}

impl PipelineSnapshot {
    pub fn busy(&self) -> bool {
        self.state.is_busy()
    }

    pub fn transform_enabled(&self) -> bool {
        self.state.transform_enabled()
    }
}

#[derive(Debug)]
pub struct RecolorOutcome {
    pub session: Uuid,
    pub recolored_url: String,
    /// A failed save does not undo the recolor.
    pub history: Result<HistoryEntry, StudioError>,
}

struct Session {
    id: Uuid,
    file: UploadFile,
    asset: Option<ImageAsset>,
    state: PipelineState,
    recolored_url: Option<String>,
    last_request: Option<(Color, RecolorSettings)>,
}

impl Session {
    fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            session: Some(self.id),
            state: self.state.clone(),
            asset: self.asset.clone(),
            recolored_url: self.recolored_url.clone(),
        }
    }
}

pub struct StudioPipeline {
    gateway: Arc<dyn ImageGateway>,
    history: Arc<HistoryStore>,
    active: Mutex<Option<Session>>,
    observers: watch::Sender<PipelineSnapshot>,
}

impl StudioPipeline {
    pub fn new(gateway: Arc<dyn ImageGateway>, history: Arc<HistoryStore>) -> Self {
        let (observers, _) = watch::channel(PipelineSnapshot::default());
        Self {
            gateway,
            history,
            active: Mutex::new(None),
            observers,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineSnapshot> {
        self.observers.subscribe()
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        self.observers.borrow().clone()
    }

    /// Starts a fresh session for `file`, superseding whatever was active,
    /// and drives it through upload, mask generation and analysis.
    pub async fn submit_image(&self, file: UploadFile) -> Result<ImageAsset, StudioError> {
        let session = Uuid::new_v4();
        {
            let mut active = self.lock();
            if let Some(previous) = active.as_ref() {
                debug!("Session {} superseded by {}", previous.id, session);
            }
            let fresh = Session {
                id: session,
                file: file.clone(),
                asset: None,
                state: PipelineState::Uploading,
                recolored_url: None,
                last_request: None,
            };
            self.observers.send_replace(fresh.snapshot());
            *active = Some(fresh);
        }
        info!("Session {} uploading {}", session, file.filename);

        let uuid = match self.gateway.upload(&file).await {
            Ok(uuid) => uuid,
            Err(e) => return Err(self.fail(session, PipelineStage::Upload, e)),
        };

        let asset = ImageAsset {
            uuid,
            local_preview: file.local_preview.clone(),
        };
        self.transition(session, |s| {
            s.asset = Some(asset.clone());
            s.state = PipelineState::MaskPending;
        })?;

        self.prepare(session, &asset.uuid, PipelineStage::Mask).await?;
        Ok(asset)
    }

    /// Runs mask generation (when starting from it) and analysis, leaving the
    /// session `Ready`.
    async fn prepare(
        &self,
        session: Uuid,
        uuid: &str,
        from: PipelineStage,
    ) -> Result<(), StudioError> {
        if from == PipelineStage::Mask {
            if let Err(e) = self.gateway.generate_mask(uuid).await {
                return Err(self.fail(session, PipelineStage::Mask, e));
            }
            self.transition(session, |s| s.state = PipelineState::AnalysisPending)?;
        }

        if let Err(e) = self.gateway.analyze(uuid).await {
            return Err(self.fail(session, PipelineStage::Analysis, e));
        }
        self.transition(session, |s| s.state = PipelineState::Ready)?;

        info!("Session {} ready to recolor {}", session, uuid);
        Ok(())
    }

    /// Recolors the bound image. Allowed once analysis has succeeded,
    /// including again after a previous recolor.
    pub async fn request_recolor(
        &self,
        color: Color,
        settings: RecolorSettings,
    ) -> Result<RecolorOutcome, StudioError> {
        let (session, request) = {
            let mut active = self.lock();
            let current = active
                .as_mut()
                .ok_or_else(|| StudioError::NotReady("no image uploaded".to_string()))?;
            self.begin_recolor(current, color, settings)?
        };

        self.run_recolor(session, request).await
    }

    fn begin_recolor(
        &self,
        current: &mut Session,
        color: Color,
        settings: RecolorSettings,
    ) -> Result<(Uuid, TransformationRequest), StudioError> {
        let asset = match (&current.asset, current.state.transform_enabled()) {
            (Some(asset), true) => asset,
            _ => {
                return Err(StudioError::NotReady(format!(
                    "cannot recolor while {}",
                    current.state
                )));
            }
        };

        let request = TransformationRequest {
            image_uuid: asset.uuid.clone(),
            color,
            settings,
        };
        current.last_request = Some((color, settings));
        current.state = PipelineState::Recoloring;
        debug!("Session {} -> {}", current.id, current.state);
        self.observers.send_replace(current.snapshot());

        Ok((current.id, request))
    }

    async fn run_recolor(
        &self,
        session: Uuid,
        request: TransformationRequest,
    ) -> Result<RecolorOutcome, StudioError> {
        info!(
            "Session {} recoloring {} to {}",
            session, request.image_uuid, request.color
        );
        if let Err(e) = self.gateway.recolor(&request).await {
            return Err(self.fail(session, PipelineStage::Recolor, e));
        }

        let recolored_url = self.gateway.recolored_url(&request.image_uuid);
        let mut original_image = None;
        self.transition(session, |s| {
            original_image = s.asset.as_ref().map(|asset| asset.local_preview.clone());
            s.recolored_url = Some(recolored_url.clone());
            s.state = PipelineState::Complete;
        })?;

        let history = self
            .history
            .create(NewHistoryEntry {
                uuid: request.image_uuid.clone(),
                color: request.color,
                original_image,
                recolored_image: recolored_url.clone(),
                settings: request.settings,
            })
            .await;
        if let Err(e) = &history {
            warn!(
                "Recolor of {} succeeded but saving history failed: {}",
                request.image_uuid, e
            );
        }

        Ok(RecolorOutcome {
            session,
            recolored_url,
            history,
        })
    }

    /// Re-runs the stage the active session failed at, reusing the bound
    /// uuid. An upload failure starts a new session with the same file.
    pub async fn retry(&self) -> Result<PipelineSnapshot, StudioError> {
        enum Resume {
            Upload(UploadFile),
            Prepare(Uuid, String, PipelineStage),
            Recolor(Uuid, TransformationRequest),
        }

        let resume = {
            let mut active = self.lock();
            let current = active
                .as_mut()
                .ok_or_else(|| StudioError::NotReady("nothing to retry".to_string()))?;

            let stage = match &current.state {
                PipelineState::Failed { stage, .. } => *stage,
                other => return Err(StudioError::NotReady(format!("nothing to retry while {}", other))),
            };
            info!("Session {} retrying {}", current.id, stage);

            match (stage, current.asset.clone(), current.last_request) {
                (PipelineStage::Upload, _, _) => Resume::Upload(current.file.clone()),
                (PipelineStage::Recolor, Some(_), Some((color, settings))) => {
                    let (session, request) = self.begin_recolor(current, color, settings)?;
                    Resume::Recolor(session, request)
                }
                (PipelineStage::Mask | PipelineStage::Analysis, Some(asset), _) => {
                    current.state = if stage == PipelineStage::Mask {
                        PipelineState::MaskPending
                    } else {
                        PipelineState::AnalysisPending
                    };
                    self.observers.send_replace(current.snapshot());
                    Resume::Prepare(current.id, asset.uuid, stage)
                }
                _ => {
                    return Err(StudioError::NotReady(format!(
                        "session {} has no request to retry",
                        current.id
                    )));
                }
            }
        };

        match resume {
            Resume::Upload(file) => {
                self.submit_image(file).await?;
            }
            Resume::Prepare(session, uuid, stage) => {
                self.prepare(session, &uuid, stage).await?;
            }
            Resume::Recolor(session, request) => {
                self.run_recolor(session, request).await?;
            }
        }

        Ok(self.snapshot())
    }

    /// Applies `update` if `session` is still active and notifies observers.
    fn transition(
        &self,
        session: Uuid,
        update: impl FnOnce(&mut Session),
    ) -> Result<(), StudioError> {
        let mut active = self.lock();
        match active.as_mut() {
            Some(current) if current.id == session => {
                update(current);
                debug!("Session {} -> {}", session, current.state);
                self.observers.send_replace(current.snapshot());
                Ok(())
            }
            _ => {
                debug!("Discarding result for superseded session {}", session);
                Err(StudioError::Superseded(session))
            }
        }
    }

    fn fail(&self, session: Uuid, stage: PipelineStage, error: StudioError) -> StudioError {
        let failed = PipelineState::Failed {
            stage,
            kind: error.kind(),
            message: error.to_string(),
        };
        match self.transition(session, |s| s.state = failed) {
            Ok(()) => {
                warn!("Session {} failed at {}: {}", session, stage, error);
                error
            }
            Err(superseded) => {
                debug!("Ignoring {} failure of superseded session {}: {}", stage, session, error);
                superseded
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

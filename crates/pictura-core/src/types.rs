// SPDX-FileCopyrightText: 2026 Pictura Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Pictura service.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::PicturaError;

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Generation,
    Payment,
    Identity,
    Observability,
}

// --- Ledger records ---

/// Current stored balance of one user, with the version used for
/// optimistic concurrency control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    /// Credit balance.
    pub credits: i64,
    /// Monotonic row version, bumped on every successful write.
    pub version: i64,
}

/// Idempotency witness: the credits of this payment session were applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedSession {
    /// Payment-provider checkout session identifier.
    pub session_id: String,
    /// User whose balance received the credits.
    pub user_id: String,
    /// Credits applied for this session.
    pub credits: i64,
    /// ISO 8601 timestamp.
    pub processed_at: String,
}

/// Outcome of [`AtomicCreditStore::credit_with_witness`](crate::AtomicCreditStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WitnessedCredit {
    Applied { new_balance: i64 },
    /// The session already had a witness; nothing was written.
    AlreadyProcessed,
}

/// One generation request, kept for audit/history only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptHistoryRecord {
    /// Unique record identifier (UUID v4).
    pub id: String,
    pub user_id: String,
    pub prompt: String,
    /// Full generation parameters as JSON.
    pub params: String,
    pub credits_charged: i64,
    /// ISO 8601 timestamp.
    pub created_at: String,
}

/// A caller identity resolved from a session token at request time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub user_id: String,
}

// --- Generation parameters ---

/// Output aspect ratio accepted by the generation backend.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    #[strum(serialize = "1:1")]
    Square,
    #[serde(rename = "16:9")]
    #[strum(serialize = "16:9")]
    Widescreen,
    #[serde(rename = "21:9")]
    #[strum(serialize = "21:9")]
    Ultrawide,
    #[serde(rename = "3:2")]
    #[strum(serialize = "3:2")]
    Classic,
    #[serde(rename = "2:3")]
    #[strum(serialize = "2:3")]
    ClassicPortrait,
    #[serde(rename = "4:5")]
    #[strum(serialize = "4:5")]
    PortraitFourFive,
    #[serde(rename = "5:4")]
    #[strum(serialize = "5:4")]
    LandscapeFiveFour,
    #[serde(rename = "3:4")]
    #[strum(serialize = "3:4")]
    StandardPortrait,
    #[serde(rename = "4:3")]
    #[strum(serialize = "4:3")]
    Standard,
    #[serde(rename = "9:16")]
    #[strum(serialize = "9:16")]
    Vertical,
    #[serde(rename = "9:21")]
    #[strum(serialize = "9:21")]
    UltraVertical,
}

/// Approximate output resolution.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
pub enum Megapixels {
    #[default]
    #[serde(rename = "1")]
    #[strum(serialize = "1")]
    One,
    #[serde(rename = "0.25")]
    #[strum(serialize = "0.25")]
    Quarter,
}

/// Encoded image format of generated outputs.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Webp,
    Jpg,
    Png,
}

/// Maximum number of images per request.
pub const MAX_OUTPUTS: u8 = 4;

/// Maximum number of denoising steps the fast model accepts.
pub const MAX_INFERENCE_STEPS: u8 = 4;

/// Parameters for one text-to-image request.
///
/// Field names match the backend's input schema, so the struct is sent as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Text description of the image.
    pub prompt: String,

    #[serde(default)]
    pub aspect_ratio: AspectRatio,

    /// Number of images to produce (1-4). Each costs credits.
    #[serde(default = "default_num_outputs")]
    pub num_outputs: u8,

    /// Random seed for reproducible generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Run the speed-optimized model variant.
    #[serde(default = "default_go_fast")]
    pub go_fast: bool,

    #[serde(default)]
    pub megapixels: Megapixels,

    #[serde(default)]
    pub output_format: OutputFormat,

    /// Encoder quality, 0-100. Ignored for png.
    #[serde(default = "default_output_quality")]
    pub output_quality: u8,

    #[serde(default = "default_num_inference_steps")]
    pub num_inference_steps: u8,

    #[serde(default)]
    pub disable_safety_checker: bool,
}

impl GenerationParams {
    /// Parameters for `prompt` with every other field at its default.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            aspect_ratio: AspectRatio::default(),
            num_outputs: default_num_outputs(),
            seed: None,
            go_fast: default_go_fast(),
            megapixels: Megapixels::default(),
            output_format: OutputFormat::default(),
            output_quality: default_output_quality(),
            num_inference_steps: default_num_inference_steps(),
            disable_safety_checker: false,
        }
    }

    /// Check ranges the backend would otherwise reject after we charged for it.
    pub fn validate(&self) -> Result<(), PicturaError> {
        if self.prompt.trim().is_empty() {
            return Err(PicturaError::InvalidRequest(
                "prompt must not be empty".to_string(),
            ));
        }
        if self.num_outputs == 0 || self.num_outputs > MAX_OUTPUTS {
            return Err(PicturaError::InvalidRequest(format!(
                "num_outputs must be between 1 and {MAX_OUTPUTS}, got {}",
                self.num_outputs
            )));
        }
        if self.output_quality > 100 {
            return Err(PicturaError::InvalidRequest(format!(
                "output_quality must be between 0 and 100, got {}",
                self.output_quality
            )));
        }
        if self.num_inference_steps == 0 || self.num_inference_steps > MAX_INFERENCE_STEPS {
            return Err(PicturaError::InvalidRequest(format!(
                "num_inference_steps must be between 1 and {MAX_INFERENCE_STEPS}, got {}",
                self.num_inference_steps
            )));
        }
        Ok(())
    }
}

fn default_num_outputs() -> u8 {
    1
}

fn default_go_fast() -> bool {
    true
}

fn default_output_quality() -> u8 {
    80
}

fn default_num_inference_steps() -> u8 {
    4
}

// src/services/config_deriver.rs
use serde::Serialize;
use std::ops::Deref;

use crate::errors::ReviveError;
use crate::models::OptionSet;
use crate::template::RestorationTemplate;

pub const COLORIZE_TASK: &str = "image_colorization_and_restoration";
pub const ATTACHED_IMAGE_MARKER: &str = "attached_image_file";
pub const MAX_RESOLUTION: &str = "MAXIMUM_AVAILABLE";
pub const STANDARD_RESOLUTION: &str = "standard";

const KEEP_BACKGROUND_PHRASE: &str = "giữ background gốc";
const VIVID_COLOR_PHRASE: &str = "giữ background gốc, tô màu sống động";
const MODERN_COLOR_PHRASE: &str = "ảnh màu hiện đại";
const KEEP_TONE_PHRASE: &str = "giữ tông màu gốc của ảnh";
const NO_COLOR_NOTE: &str =
    " Do not colorize if the image is black and white. Preserve original color tone.";
const NATURAL_SATURATION: &str = "natural, preserve original";
const ADVANCED_RECONSTRUCTION: &str = "museum-grade highly detailed";
const MODERATE: &str = "moderate";
const HD_LOOK_SUFFIX: &str = ", ultra-high resolution, 8k clarity";
const HD_NOTE: &str = " Output must be extremely high resolution and sharp.";

/// Instruction document for one request, derived from a template.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DerivedConfig(RestorationTemplate);

impl DerivedConfig {
    pub fn into_inner(self) -> RestorationTemplate {
        self.0
    }

    /// JSON text sent next to the image.
    pub fn to_instruction(&self) -> Result<String, ReviveError> {
        serde_json::to_string(&self.0)
            .map_err(|e| ReviveError::Serialization(format!("Failed to serialize config: {}", e)))
    }
}

impl Deref for DerivedConfig {
    type Target = RestorationTemplate;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Applies the option flags to a copy of `template`.
///
/// Rules run colorize, then advanced/basic, then HD, then the input marker.
pub fn derive(template: &RestorationTemplate, options: &OptionSet) -> DerivedConfig {
    let mut config = template.clone();

    if options.colorize {
        config.task = COLORIZE_TASK.to_string();
        config.caption = config
            .caption
            .replace(KEEP_BACKGROUND_PHRASE, VIVID_COLOR_PHRASE);
    } else {
        config.colorization = None;
        config.caption = if config.caption.contains(MODERN_COLOR_PHRASE) {
            config.caption.replace(MODERN_COLOR_PHRASE, KEEP_TONE_PHRASE)
        } else {
            format!("{}, {}", config.caption, KEEP_TONE_PHRASE)
        };
        config.notes.push_str(NO_COLOR_NOTE);
        config.color_tone.saturation = NATURAL_SATURATION.to_string();
        config.color_tone.vibrance = 0.0;
        config.color_tone.recolorize_consistently = false;
    }

    if options.is_advanced() {
        config.controls.restoration_strength = 1.0;
        config.controls.face_identity_lock = 0.98;
        config.clean_up.reconstruct_missing_parts = ADVANCED_RECONSTRUCTION.to_string();
    } else {
        config.controls.restoration_strength = 0.85;
        config.clean_up.remove_scratches = MODERATE.to_string();
        config.clean_up.remove_dust = MODERATE.to_string();
    }

    if options.hd {
        config.output.resolution = MAX_RESOLUTION.to_string();
        config.detail_sharpness.amount = 0.6;
        config.camera_emulation.look.push_str(HD_LOOK_SUFFIX);
        config.notes.push_str(HD_NOTE);
    } else {
        config.output.resolution = STANDARD_RESOLUTION.to_string();
    }

    config.input_image = ATTACHED_IMAGE_MARKER.to_string();

    DerivedConfig(config)
}

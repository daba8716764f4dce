// src/template.rs
//! Typed restoration instruction document.
//!
//! The baseline describes the full studio-grade restoration; the config
//! deriver patches a copy of it per request. Field names match the JSON
//! the image model receives.
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::ReviveError;

pub const INPUT_IMAGE_PLACEHOLDER: &str = "REPLACE_WITH_IMAGE_ID_OR_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestorationTemplate {
    pub version: String,
    pub task: String,
    pub caption: String,
    pub notes: String,
    pub input_image: String,
    pub preprocess: Preprocess,
    pub camera_emulation: CameraEmulation,
    pub composition: Composition,
    pub subject_constraints: SubjectConstraints,
    pub retouching: Retouching,
    /// `None` serializes as `null`, telling the model not to invent color.
    pub colorization: Option<Colorization>,
    pub background: Background,
    pub color_tone: ColorTone,
    pub detail_sharpness: DetailSharpness,
    pub clean_up: CleanUp,
    pub controls: Controls,
    pub output: Output,
    pub safety_bounds: SafetyBounds,
    pub seed: u64,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocess {
    pub detect_and_isolate_original_photo: bool,
    pub auto_crop_photo_edges: bool,
    pub clean_edges: bool,
    pub remove_hands_or_objects: bool,
    pub perspective_correction: bool,
    pub flatten_page_curvature: bool,
    pub glare_reduction: String,
    pub reflection_removal: String,
    pub specular_highlight_fix: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraEmulation {
    pub brand_model: String,
    pub lens: String,
    pub medium_format: bool,
    pub look: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    pub framing: String,
    pub orientation: String,
    pub crop_policy: String,
    pub keep_pose: bool,
    pub zoom: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectConstraints {
    pub keep_identity: bool,
    pub lock_features: Vec<String>,
    pub expression_policy: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retouching {
    pub skin: Skin,
    pub hair: Hair,
    pub eyes: Eyes,
    pub teeth: Teeth,
    pub clothing: Clothing,
    pub repair_cracks: String,
    pub remove_dust_scratches: String,
    pub remove_stains: String,
    pub remove_folds: bool,
    pub restore_faded_details: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skin {
    pub tone: String,
    pub finish: String,
    pub texture: String,
    pub blemishes: String,
    pub luminosity_balance: String,
    pub color_uniformity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hair {
    pub finish: String,
    pub flyaways: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Eyes {
    pub iris_color: String,
    pub whites_desaturation: f64,
    pub iris_clarity: f64,
    pub avoid_overwhitening: bool,
    pub avoid_exaggeration: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teeth {
    pub natural_whiten: f64,
    pub avoid_pure_white: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clothing {
    pub fabric_look: String,
    pub wrinkle_reduction: String,
    pub texture_enhancement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Colorization {
    pub apply_to: String,
    pub style: String,
    pub skin_tone_accuracy: String,
    pub background_colorization: String,
    pub clothing_colorization: String,
    pub avoid_exaggeration: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Background {
    pub policy: String,
    pub keep_original: bool,
    pub enhancement: BackgroundEnhancement,
    pub remove_external_objects: bool,
    pub banding_fix_on_background: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundEnhancement {
    pub colorize: String,
    pub restore_damage: bool,
    pub texture_cleanup: String,
    pub add_depth: String,
    pub contrast_boost: String,
    pub dynamic_range: String,
    pub lighting_match: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorTone {
    pub overall: String,
    pub saturation: String,
    pub contrast: String,
    pub vibrance: f64,
    pub color_restoration: String,
    pub auto_tone_balance: String,
    pub auto_contrast_balance: bool,
    pub recolorize_consistently: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailSharpness {
    pub method: String,
    pub amount: f64,
    pub radius: f64,
    pub threshold: f64,
    pub noise_reduction: NoiseReduction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseReduction {
    pub luminance: f64,
    pub chroma: f64,
    pub preserve_details: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanUp {
    pub remove_noise: bool,
    pub remove_artifacts: bool,
    pub remove_scratches: String,
    pub remove_dust: String,
    pub remove_stains: String,
    pub remove_folds: bool,
    pub deblotching: bool,
    pub desilvering_fix: bool,
    pub paper_texture_reduction: String,
    pub restore_faded_colors: bool,
    pub reconstruct_missing_parts: String,
    pub reconstruct_missing_corners: bool,
    pub hallucination_control: String,
    pub heritage_preservation_strict: bool,
    pub archival_quality: String,
    pub final_finish: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Controls {
    pub face_identity_lock: f64,
    pub pose_lock: f64,
    pub background_enhancement_strength: f64,
    pub colorization_strength: f64,
    pub restoration_strength: f64,
    pub background_replace_strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub resolution: String,
    pub dpi: u32,
    pub format: String,
    pub color_space: String,
    pub bit_depth: String,
    pub background_alpha: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyBounds {
    pub do_not: Vec<String>,
    pub negative_prompt: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub locale: String,
    pub creator: String,
    pub purpose: String,
    pub workflow: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl RestorationTemplate {
    pub fn from_json_str(json: &str) -> Result<Self, ReviveError> {
        serde_json::from_str(json)
            .map_err(|e| ReviveError::Config(format!("Invalid restoration template: {}", e)))
    }

    pub fn from_path(path: &Path) -> Result<Self, ReviveError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ReviveError::Config(format!(
                "Failed to read restoration template {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&raw)
    }

    /// The studio restoration document every request starts from.
    pub fn baseline() -> Self {
        Self {
            version: "1.0".into(),
            task: "image_edit".into(),
            caption: "Phục chế & nâng cấp ảnh cũ – giữ background gốc, màu điện ảnh, chuẩn Phase One XF IQ4 150MP".into(),
            notes: "Biến ảnh cũ (kể cả ảnh chụp lại) thành ảnh màu hiện đại, sạch tuyệt đối, giữ background gốc nhưng nâng cấp đẳng cấp như chụp mới. Ưu tiên bảo toàn danh tính và pose.".into(),
            input_image: INPUT_IMAGE_PLACEHOLDER.into(),
            preprocess: Preprocess {
                detect_and_isolate_original_photo: true,
                auto_crop_photo_edges: true,
                clean_edges: true,
                remove_hands_or_objects: true,
                perspective_correction: true,
                flatten_page_curvature: true,
                glare_reduction: "strict".into(),
                reflection_removal: "strict".into(),
                specular_highlight_fix: true,
            },
            camera_emulation: CameraEmulation {
                brand_model: "Phase One XF IQ4 150MP".into(),
                lens: "Schneider Kreuznach 80mm LS f/2.8".into(),
                medium_format: true,
                look: "ultimate sharpness, maximum dynamic range, medium format 3D pop, cinematic rendering".into(),
            },
            composition: Composition {
                framing: "three-quarter body (from mid-thigh up)".into(),
                orientation: "portrait".into(),
                crop_policy: "do_not_crop_face_or_hands".into(),
                keep_pose: true,
                zoom: "slight zoom-out for wider context".into(),
            },
            subject_constraints: SubjectConstraints {
                keep_identity: true,
                lock_features: strings(&[
                    "eyes",
                    "nose",
                    "lips",
                    "eyebrows",
                    "jawline",
                    "face_shape",
                    "ears",
                    "hairline",
                ]),
                expression_policy: "preserve_original".into(),
            },
            retouching: Retouching {
                skin: Skin {
                    tone: "realistic warm neutral".into(),
                    finish: "radiant but detailed".into(),
                    texture: "retain fine pores; avoid plastic look".into(),
                    blemishes: "remove completely".into(),
                    luminosity_balance: "uniform subtle glow".into(),
                    color_uniformity: "fix uneven tones".into(),
                },
                hair: Hair {
                    finish: "clean, neat, natural gloss".into(),
                    flyaways: "reduce but keep natural strands".into(),
                },
                eyes: Eyes {
                    iris_color: "natural brown/gray".into(),
                    whites_desaturation: 0.1,
                    iris_clarity: 0.2,
                    avoid_overwhitening: true,
                    avoid_exaggeration: true,
                },
                teeth: Teeth {
                    natural_whiten: 0.08,
                    avoid_pure_white: true,
                },
                clothing: Clothing {
                    fabric_look: "premium, fine weave, crisp edges".into(),
                    wrinkle_reduction: "moderate".into(),
                    texture_enhancement: 0.25,
                },
                repair_cracks: "strict".into(),
                remove_dust_scratches: "strict".into(),
                remove_stains: "strict".into(),
                remove_folds: true,
                restore_faded_details: true,
            },
            colorization: Some(Colorization {
                apply_to: "entire_photo".into(),
                style: "cinematic, natural, true-to-life".into(),
                skin_tone_accuracy: "very_high".into(),
                background_colorization: "full, layered, realistic".into(),
                clothing_colorization: "faithful but premium".into(),
                avoid_exaggeration: true,
            }),
            background: Background {
                policy: "preserve_and_enhance".into(),
                keep_original: true,
                enhancement: BackgroundEnhancement {
                    colorize: "natural, true-to-life, cinematic color grading".into(),
                    restore_damage: true,
                    texture_cleanup: "remove paper grain and speckles completely".into(),
                    add_depth: "studio gradient with layered tones and soft atmospheric haze".into(),
                    contrast_boost: "medium-high with soft roll-off".into(),
                    dynamic_range: "expanded like medium format".into(),
                    lighting_match: true,
                },
                remove_external_objects: true,
                banding_fix_on_background: true,
            },
            color_tone: ColorTone {
                overall: "natural, true-to-life".into(),
                saturation: "balanced vivid".into(),
                contrast: "medium with cinematic roll-off".into(),
                vibrance: 0.2,
                color_restoration: "revive faded colors, unify uneven tones, remove discoloration completely".into(),
                auto_tone_balance: "strict".into(),
                auto_contrast_balance: true,
                recolorize_consistently: true,
            },
            detail_sharpness: DetailSharpness {
                method: "edge-aware sharpening".into(),
                amount: 0.4,
                radius: 0.9,
                threshold: 0.02,
                noise_reduction: NoiseReduction {
                    luminance: 0.22,
                    chroma: 0.26,
                    preserve_details: 0.85,
                },
            },
            clean_up: CleanUp {
                remove_noise: true,
                remove_artifacts: true,
                remove_scratches: "strict".into(),
                remove_dust: "strict".into(),
                remove_stains: "strict".into(),
                remove_folds: true,
                deblotching: true,
                desilvering_fix: true,
                paper_texture_reduction: "strong".into(),
                restore_faded_colors: true,
                reconstruct_missing_parts: "museum-grade".into(),
                reconstruct_missing_corners: true,
                hallucination_control: "only realistic restoration, no fantasy".into(),
                heritage_preservation_strict: true,
                archival_quality: "museum-grade restoration, pristine finish".into(),
                final_finish: "as new color studio photograph, indistinguishable from modern digital capture".into(),
            },
            controls: Controls {
                face_identity_lock: 0.96,
                pose_lock: 0.95,
                background_enhancement_strength: 0.9,
                colorization_strength: 0.9,
                restoration_strength: 0.95,
                background_replace_strength: 0.0,
            },
            output: Output {
                resolution: "12000x8000".into(),
                dpi: 600,
                format: "TIFF".into(),
                color_space: "AdobeRGB 1998".into(),
                bit_depth: "16-bit".into(),
                background_alpha: "opaque".into(),
            },
            safety_bounds: SafetyBounds {
                do_not: strings(&[
                    "change face geometry or identity",
                    "change pose",
                    "alter clothing style drastically",
                    "add heavy makeup",
                    "over-smooth or plastic skin",
                    "over-sharpen halos",
                    "exaggerated eye colors",
                ]),
                negative_prompt: strings(&[
                    "paper grain",
                    "speckles",
                    "flat monochrome background",
                    "hands holding photo",
                    "photo edges visible",
                    "glare spots",
                    "crooked perspective",
                    "color casts",
                    "posterization/banding",
                    "muddy blacks",
                    "oversaturated skin",
                    "cartoonish colors",
                    "loss of fine texture",
                    "visible damage marks",
                ]),
            },
            seed: 142857,
            metadata: Metadata {
                locale: "vi-VN".into(),
                creator: "fine art restoration specialist".into(),
                purpose: "phục chế & nâng cấp toàn ảnh lên chuẩn studio hiện đại, giữ nền gốc nhưng nâng cấp màu/độ sâu/dải sáng".into(),
                workflow: "studio emulation, medium format rendering, heritage restoration, cinematic color grading".into(),
            },
        }
    }
}

impl Default for RestorationTemplate {
    fn default() -> Self {
        Self::baseline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_baseline_json_shape() {
        let json = serde_json::to_value(RestorationTemplate::baseline()).unwrap();
        assert_eq!(json["task"], "image_edit");
        assert_eq!(json["input_image"], INPUT_IMAGE_PLACEHOLDER);
        assert_eq!(json["colorization"]["apply_to"], "entire_photo");
        assert_eq!(json["controls"]["restoration_strength"], 0.95);
        assert_eq!(json["seed"], 142857);
        assert_eq!(json["subject_constraints"]["lock_features"][7], "hairline");
    }

    #[test]
    fn test_null_colorization_roundtrips() {
        let mut template = RestorationTemplate::baseline();
        template.colorization = None;
        let json = serde_json::to_string(&template).unwrap();
        assert!(json.contains("\"colorization\":null"));

        let parsed = RestorationTemplate::from_json_str(&json).unwrap();
        assert!(parsed.colorization.is_none());
        assert_eq!(parsed.caption, template.caption);
        assert_eq!(parsed.safety_bounds, template.safety_bounds);
    }

    #[test]
    fn test_from_path_and_invalid_json() {
        let mut template = RestorationTemplate::baseline();
        template.seed = 7;
        let path = std::env::temp_dir().join(format!("template-{}.json", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(serde_json::to_string(&template).unwrap().as_bytes())
            .unwrap();

        let loaded = RestorationTemplate::from_path(&path).unwrap();
        assert_eq!(loaded.seed, 7);
        std::fs::remove_file(&path).unwrap();

        let err = RestorationTemplate::from_json_str("{\"task\": 1}").unwrap_err();
        assert!(matches!(err, ReviveError::Config(_)));

        let err = RestorationTemplate::from_path(Path::new("/nonexistent/template.json"))
            .unwrap_err();
        assert!(matches!(err, ReviveError::Config(_)));
    }
}

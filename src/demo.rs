// src/demo.rs
// Canned fixtures used when no photo is supplied.
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::ImageReference;
use crate::services::image_processor::extension_for;

pub const DEMO_BEFORE_IMAGE: &str = "https://lh3.googleusercontent.com/aida-public/AB6AXuANHxYz7Psw2MaSRA2ze09DTDUf5EX8sayrPycQ2WDfFQM_tqEJbIR20m7iDZeoDVijlS-D0Gw7t_4koinB3WzUo8Lko-5jnWtBUzrG3CvDk_nSZShVUJX42N7bGAxgO_Sqf6GbfYEbsaMBJDGnJ3lAOXfiwdekAfWvODpbn_09Vq_XL3yqMfsTIkLodgSPGl4i6lYxKhlnGBMHULQj2oQl3_GnyJX4ZwyYXUz2VlTrM5wAG39xfNTORkLRXb57eWdYLR8sFoIB5A";
pub const DEMO_AFTER_IMAGE: &str = "https://lh3.googleusercontent.com/aida-public/AB6AXuDCl2vlPiNA647B7ZhPAoNpNGeWIiaCR-sa46-W80Jy7VtlEyWLMoDvctEiSrDh1Ceo2g0J_1EuxD0ZrtcgSZ74YWIrCFvLhsIHQUx-WY-RGokUYT7IDtoszoY82Qp8vcOdpKrr6GAWrXIjTMR1HBgBa-zkH222SUaKL5JUf7DRif9xs8DXcQF5izsjpSAB5EaR3IIqiJDHvuVsT5Fib7kQWS9BEJIp6-nrrvlh90E8L01TnTEQTsYIfDYPnNrSJZGHleJs0ca_pw";

const SHARE_TITLE: &str = "Phục Chế Ảnh Thanh Xuân";
const SHARE_TEXT: &str = "Mình vừa phục chế lại bức ảnh này, mọi người xem có nét không nhé!";
const SHARE_FILE_NAME: &str = "anh-phuc-che.png";

pub fn demo_before() -> ImageReference {
    ImageReference::url(DEMO_BEFORE_IMAGE)
}

pub fn demo_after() -> ImageReference {
    ImageReference::url(DEMO_AFTER_IMAGE)
}

pub fn download_file_name(image: &ImageReference, at: DateTime<Utc>) -> String {
    let ext = image.media_type().map(extension_for).unwrap_or("png");
    format!("phuc-che-thanh-xuan-{}.{}", at.timestamp_millis(), ext)
}

#[derive(Debug, Clone, Serialize)]
pub struct ShareInfo {
    pub title: &'static str,
    pub text: &'static str,
    pub file_name: &'static str,
    pub url: String,
}

impl ShareInfo {
    pub fn for_result(url: String) -> Self {
        Self {
            title: SHARE_TITLE,
            text: SHARE_TEXT,
            file_name: SHARE_FILE_NAME,
            url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_download_file_name() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let jpeg = ImageReference::Data {
            mime_type: "image/jpeg".into(),
            data: String::new(),
        };
        assert_eq!(
            download_file_name(&jpeg, at),
            "phuc-che-thanh-xuan-1700000000123.jpg"
        );
        assert_eq!(
            download_file_name(&demo_after(), at),
            "phuc-che-thanh-xuan-1700000000123.png"
        );
    }
}

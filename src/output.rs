//! CLI output formatting.
//!
//! # Output Format
//!
//! ```text
//! Photo portrait.jpg
//!     Type: image/jpeg
//!     Size: 1.4 MiB
//! Background red
//!     Model: gemini-2.0-flash-exp-image-generation
//!     Key: stored
//! Generated image/png (812.0 KiB)
//! 1-inch (295×413px) → out/id_photo_295x413.jpg
//! 2-inch (413×626px) → out/id_photo_413x626.jpg
//! ```
//!
//! # Architecture
//!
//! Each step has a `format_*` function (returns `Vec<String>`) for
//! testability; the binary prints the lines. Format functions are pure — no
//! I/O, no side effects.

use crate::auth::UserProfile;
use crate::credentials::KeySource;
use crate::imaging::Dimensions;
use crate::types::{ColorChoice, EncodedImage, PrintSize};
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count (binary units, one decimal).
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: [&str; 3] = ["KiB", "MiB", "GiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

pub fn format_key_source(source: Option<KeySource>) -> &'static str {
    match source {
        Some(KeySource::User) => "stored",
        Some(KeySource::Default) => "built-in default",
        None => "none",
    }
}

pub fn format_upload(path: &Path, image: &EncodedImage) -> Vec<String> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    vec![
        format!("Photo {name}"),
        format!("{}Type: {}", indent(1), image.mime_type()),
        format!("{}Size: {}", indent(1), format_bytes(image.len())),
    ]
}

pub fn format_dimensions(dims: Dimensions) -> String {
    format!("{}Dimensions: {}×{}", indent(1), dims.width, dims.height)
}

pub fn format_request(color: ColorChoice, model: &str, key: Option<KeySource>) -> Vec<String> {
    vec![
        format!("Background {color}"),
        format!("{}Model: {model}", indent(1)),
        format!("{}Key: {}", indent(1), format_key_source(key)),
    ]
}

pub fn format_generated(image: &EncodedImage) -> Vec<String> {
    vec![format!(
        "Generated {} ({})",
        image.mime_type(),
        format_bytes(image.len())
    )]
}

pub fn format_export(size: PrintSize, path: &Path) -> String {
    format!("{size} → {}", path.display())
}

pub fn format_profile(profile: Option<&UserProfile>) -> Vec<String> {
    let Some(p) = profile else {
        return vec!["Not signed in".to_string()];
    };
    let mut lines = vec![
        format!("Signed in as {}", p.name),
        format!("{}Email: {}", indent(1), p.email),
        format!("{}Id: {}", indent(1), p.id),
    ];
    if let Some(avatar) = &p.avatar_url {
        lines.push(format!("{}Avatar: {avatar}", indent(1)));
    }
    lines
}

/// Stored keys are never printed in full.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{tail}", "*".repeat(chars.len() - 4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_use_binary_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.0 KiB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10.0 MiB");
        assert_eq!(format_bytes(1536 * 1024), "1.5 MiB");
    }

    #[test]
    fn upload_lines() {
        let image = EncodedImage::new("image/jpeg", vec![0; 2048]);
        assert_eq!(
            format_upload(Path::new("/photos/me.jpg"), &image),
            vec!["Photo me.jpg", "    Type: image/jpeg", "    Size: 2.0 KiB"]
        );
    }

    #[test]
    fn request_lines() {
        assert_eq!(
            format_request(ColorChoice::Blue, "m1", Some(KeySource::User)),
            vec!["Background blue", "    Model: m1", "    Key: stored"]
        );
        assert_eq!(format_request(ColorChoice::Red, "m1", None)[2], "    Key: none");
    }

    #[test]
    fn dimensions_line() {
        let dims = Dimensions {
            width: 600,
            height: 800,
        };
        assert_eq!(format_dimensions(dims), "    Dimensions: 600×800");
    }

    #[test]
    fn export_line() {
        assert_eq!(
            format_export(PrintSize::OneInch, Path::new("out/id_photo_295x413.jpg")),
            "1-inch (295×413px) → out/id_photo_295x413.jpg"
        );
    }

    #[test]
    fn profile_lines() {
        assert_eq!(format_profile(None), vec!["Not signed in"]);
        let p = UserProfile {
            id: "7".into(),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            avatar_url: Some("https://example.com/a.png".into()),
        };
        assert_eq!(
            format_profile(Some(&p)),
            vec![
                "Signed in as Ana",
                "    Email: ana@example.com",
                "    Id: 7",
                "    Avatar: https://example.com/a.png",
            ]
        );
    }

    #[test]
    fn keys_are_masked() {
        assert_eq!(mask_key("short"), "*****");
        assert_eq!(mask_key("AIzaSyExample1234"), "*************1234");
    }
}

use crate::error::ValidationError;
use crate::models::UploadableImage;

/// MIME types accepted for upload. `image/jpg` is non-standard but sent by some browsers.
pub const ACCEPTED_FILE_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/heic",
    "image/webp",
];

/// 10 MiB.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

pub fn is_valid_file_type(mime_type: &str) -> bool {
    let essence = match mime_type.parse::<mime::Mime>() {
        Ok(m) => m.essence_str().to_ascii_lowercase(),
        Err(_) => return false,
    };
    ACCEPTED_FILE_TYPES.contains(&essence.as_str())
}

pub fn is_valid_file_size(size: u64) -> bool {
    size <= MAX_FILE_SIZE
}

/// Pre-network gate. Pure: no I/O, no logging.
pub fn validate(image: &UploadableImage) -> Result<(), ValidationError> {
    validate_parts(&image.mime_type, image.size())
}

pub fn validate_parts(mime_type: &str, size: u64) -> Result<(), ValidationError> {
    if !is_valid_file_type(mime_type) {
        return Err(ValidationError::InvalidType(mime_type.to_string()));
    }
    if !is_valid_file_size(size) {
        return Err(ValidationError::TooLarge { size, max: MAX_FILE_SIZE });
    }
    Ok(())
}

/// Comma-separated list for `accept` attributes.
pub fn accepted_file_types() -> String {
    ACCEPTED_FILE_TYPES.join(",")
}

/// Best-effort MIME guess from a file extension, for local files.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "heic" => Some("image/heic"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// Human-readable size, two decimals max ("2 MB", "1.5 KB").
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut idx = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && idx < UNITS.len() - 1 {
        value /= 1024.0;
        idx += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[idx])
}

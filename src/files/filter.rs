/// Image subtypes accepted for upload.
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// File extension for an accepted image content type, `None` for anything
/// else. Parameters such as `; charset=` are ignored.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let (kind, subtype) = essence.split_once('/')?;
    if kind != "image" {
        return None;
    }

    IMAGE_EXTENSIONS.iter().copied().find(|ext| *ext == subtype)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_images() {
        assert_eq!(image_extension("image/png"), Some("png"));
        assert_eq!(image_extension("image/JPEG"), Some("jpeg"));
        assert_eq!(image_extension("image/gif; name=x"), Some("gif"));
    }

    #[test]
    fn test_rejects_other_types() {
        assert_eq!(image_extension("text/plain"), None);
        assert_eq!(image_extension("image/svg+xml"), None);
        assert_eq!(image_extension("application/png"), None);
        assert_eq!(image_extension("png"), None);
        assert_eq!(image_extension(""), None);
    }
}

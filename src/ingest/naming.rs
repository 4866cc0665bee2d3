use chrono::{DateTime, Local};

/// Timestamp-based base name for a run: `20251028-143005.123_9f86d081`
///
/// The random suffix keeps two runs started in the same millisecond apart
/// without any shared counter.
pub fn base_name(now: DateTime<Local>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", now.format("%Y%m%d-%H%M%S%.3f"), &suffix[..8])
}

/// Source file extension for a submission
///
/// The client's file name wins when it carries a short alphanumeric
/// extension; otherwise the declared MIME type decides. Neither is trusted
/// beyond picking a suffix for ffmpeg's format probe.
pub fn source_extension(mime_type: Option<&str>, file_name: Option<&str>) -> String {
    if let Some(ext) = file_name.and_then(extension_of) {
        return ext;
    }

    let Some(mime) = mime_type.map(str::to_ascii_lowercase) else {
        return "webm".to_string();
    };

    let ext = if mime.contains("webm") {
        "webm"
    } else if mime.contains("mp4") {
        "mp4"
    } else if mime.contains("mpeg") {
        "mp3"
    } else if mime.contains("ogg") {
        "ogg"
    } else if mime.contains("wav") {
        "wav"
    } else {
        "bin"
    };
    ext.to_string()
}

fn extension_of(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let valid = !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then(|| ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_same_instant_gives_distinct_names() {
        let now = Local.with_ymd_and_hms(2025, 10, 28, 14, 30, 5).unwrap();
        let a = base_name(now);
        let b = base_name(now);
        assert_ne!(a, b);
        assert!(a.starts_with("20251028-143005.000_"));
    }

    #[test]
    fn test_extension_from_mime() {
        assert_eq!(source_extension(Some("audio/webm;codecs=opus"), None), "webm");
        assert_eq!(source_extension(Some("audio/mp4"), None), "mp4");
        assert_eq!(source_extension(Some("audio/mpeg"), None), "mp3");
        assert_eq!(source_extension(Some("audio/ogg"), None), "ogg");
        assert_eq!(source_extension(Some("audio/wav"), None), "wav");
        assert_eq!(source_extension(Some("application/x-foo"), None), "bin");
        assert_eq!(source_extension(None, None), "webm");
    }

    #[test]
    fn test_extension_from_file_name() {
        assert_eq!(source_extension(Some("audio/webm"), Some("take-1.OGG")), "ogg");
        // Path tricks and junk extensions fall back to the MIME type
        assert_eq!(source_extension(Some("audio/wav"), Some("../../etc/passwd")), "wav");
        assert_eq!(source_extension(Some("audio/wav"), Some("x.we/bm")), "wav");
        assert_eq!(source_extension(Some("audio/wav"), Some("noext")), "wav");
    }
}

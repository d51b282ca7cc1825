//! Naming of archived receipt files.

use std::path::Path;

use chrono::NaiveDate;
use engine::ReceiptFile;

const FALLBACK_MERCHANT: &str = "receipt";
const FALLBACK_EXTENSION: &str = "bin";
const MAX_EXTENSION_LEN: usize = 5;

/// `[YYYY/MM/]YYYY-MM-DD {merchant}.{ext}`
pub fn object_key(
    merchant: &str,
    date: NaiveDate,
    file: &ReceiptFile,
    date_subdirectories: bool,
) -> String {
    let name = format!(
        "{} {}.{}",
        date.format("%Y-%m-%d"),
        sanitize_merchant(merchant),
        extension(file)
    );
    if date_subdirectories {
        format!("{}/{name}", date.format("%Y/%m"))
    } else {
        name
    }
}

/// Makes a merchant name safe to use as a single path segment.
pub fn sanitize_merchant(merchant: &str) -> String {
    let replaced: String = merchant
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();
    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_start_matches('.').trim();

    if trimmed.is_empty() {
        FALLBACK_MERCHANT.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Extension of the original file name, else derived from the MIME type.
pub fn extension(file: &ReceiptFile) -> String {
    let from_name = Path::new(&file.name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(str::to_ascii_lowercase);

    from_name.unwrap_or_else(|| {
        let ext = match file.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/heic" => "heic",
            "image/heif" => "heif",
            "image/gif" => "gif",
            "application/pdf" => "pdf",
            _ => FALLBACK_EXTENSION,
        };
        ext.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, mime_type: &str) -> ReceiptFile {
        ReceiptFile::new(name, mime_type, vec![1, 2, 3])
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn key_with_date_directories() {
        assert_eq!(
            object_key("Ikea", date(), &file("IMG_001.JPG", "image/jpeg"), true),
            "2024/03/2024-03-01 Ikea.jpg"
        );
    }

    #[test]
    fn flat_key() {
        assert_eq!(
            object_key("Ikea", date(), &file("scan.pdf", "application/pdf"), false),
            "2024-03-01 Ikea.pdf"
        );
    }

    #[test]
    fn merchant_cannot_escape_its_directory() {
        assert_eq!(sanitize_merchant("../../etc/passwd"), "-..-etc-passwd");
        assert_eq!(sanitize_merchant("AC/DC  Store\n"), "AC-DC Store");
        assert_eq!(sanitize_merchant("Caffè \"Roma\""), "Caffè -Roma-");
    }

    #[test]
    fn blank_merchant_falls_back() {
        assert_eq!(sanitize_merchant("  \t "), "receipt");
        assert_eq!(sanitize_merchant(".."), "receipt");
    }

    #[test]
    fn extension_falls_back_to_mime_type() {
        assert_eq!(extension(&file("blob", "image/png")), "png");
        assert_eq!(extension(&file("photo.weird-ext", "image/webp")), "webp");
        assert_eq!(extension(&file("", "application/octet-stream")), "bin");
    }
}

// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Motif image loading.
//!
//! A motif reference is one of three kinds: an absolute `http(s)` URL, a
//! root-relative path resolved against the asset directory, or an inline
//! `data:` payload. Anything else is replaced by [`DEFAULT_MOTIF_REF`].
//! Decoding happens on a background thread and is handed to the UI thread
//! through a channel.

use base64::Engine;
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use thiserror::Error;

/// Built-in motif, looked up in the asset directory.
pub const DEFAULT_MOTIF_REF: &str = "/motif.jpg";

#[derive(Error, Debug)]
pub enum MotifError {
    #[error("unsupported motif reference: {0}")]
    Unsupported(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid inline payload: {0}")]
    InlinePayload(String),

    #[error("could not decode motif: {0}")]
    Decode(#[from] image::ImageError),
}

/// Where a motif reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MotifSource {
    Remote(String),
    RootRelative(String),
    Inline(String),
}

impl MotifSource {
    /// Classify a reference. Returns `None` for unsupported references.
    pub fn classify(reference: &str) -> Option<Self> {
        let reference = reference.trim();
        if reference.starts_with("http://") || reference.starts_with("https://") {
            Some(MotifSource::Remote(reference.to_string()))
        } else if reference.starts_with("data:") {
            Some(MotifSource::Inline(reference.to_string()))
        } else if reference.starts_with('/') {
            Some(MotifSource::RootRelative(reference.to_string()))
        } else {
            None
        }
    }

    /// Short description for logs, without dumping inline payloads.
    pub fn describe(&self) -> String {
        match self {
            MotifSource::Remote(url) => url.clone(),
            MotifSource::RootRelative(path) => path.clone(),
            MotifSource::Inline(data) => format!("inline payload ({} bytes)", data.len()),
        }
    }
}

/// Keep supported references, replace everything else with the default.
pub fn sanitize_reference(reference: &str) -> String {
    match MotifSource::classify(reference) {
        Some(_) => reference.trim().to_string(),
        None => {
            log::warn!("Unsupported motif reference, using default");
            DEFAULT_MOTIF_REF.to_string()
        }
    }
}

/// Map a root-relative reference into the asset directory.
pub fn asset_path(asset_root: &Path, reference: &str) -> PathBuf {
    let relative = reference.trim_start_matches('/');
    relative
        .split('/')
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .fold(asset_root.to_path_buf(), |path, part| path.join(part))
}

/// Decode the bytes carried by a `data:` URI.
pub fn decode_inline(data_uri: &str) -> Result<Vec<u8>, MotifError> {
    let rest = data_uri
        .strip_prefix("data:")
        .ok_or_else(|| MotifError::InlinePayload("missing data: prefix".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| MotifError::InlinePayload("missing payload separator".into()))?;
    if !meta.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        return Err(MotifError::InlinePayload("only base64 payloads are supported".into()));
    }
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| MotifError::InlinePayload(e.to_string()))
}

/// Build an inline reference for an image file picked by the user.
pub fn encode_inline(bytes: &[u8], path: &Path) -> String {
    let mime = match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "image/jpeg",
    };
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Fetch the raw bytes behind a reference.
pub fn read_source(source: &MotifSource, asset_root: &Path) -> Result<Vec<u8>, MotifError> {
    match source {
        MotifSource::Remote(url) => {
            let response = reqwest::blocking::get(url)?.error_for_status()?;
            Ok(response.bytes()?.to_vec())
        }
        MotifSource::RootRelative(path) => Ok(std::fs::read(asset_path(asset_root, path))?),
        MotifSource::Inline(data) => decode_inline(data),
    }
}

/// A decoded motif.
/// The reference it came from travels beside it in [`MotifLoadResult`].
pub struct LoadedMotif {
    pub image: RgbaImage,
}

impl LoadedMotif {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Load and decode a motif reference.
pub fn load_motif(reference: &str, asset_root: &Path) -> Result<LoadedMotif, MotifError> {
    let source = MotifSource::classify(reference)
        .ok_or_else(|| MotifError::Unsupported(reference.to_string()))?;
    let bytes = read_source(&source, asset_root)?;
    let image = image::load_from_memory(&bytes)?.to_rgba8();
    log::info!(
        "Loaded motif {} ({}x{})",
        source.describe(),
        image.width(),
        image.height()
    );
    Ok(LoadedMotif { image })
}

/// Result delivered by a background load: the requested reference and the
/// outcome.
pub type MotifLoadResult = (String, Result<LoadedMotif, MotifError>);

/// Load a motif on a background thread.
pub fn spawn_load(reference: String, asset_root: PathBuf) -> Receiver<MotifLoadResult> {
    let (sender, receiver) = channel();
    std::thread::spawn(move || {
        let result = load_motif(&reference, &asset_root);
        let _ = sender.send((reference, result));
    });
    receiver
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    #[test]
    fn test_classify_references() {
        assert_eq!(
            MotifSource::classify("https://example.com/a.jpg"),
            Some(MotifSource::Remote("https://example.com/a.jpg".into()))
        );
        assert_eq!(
            MotifSource::classify("/motif.jpg"),
            Some(MotifSource::RootRelative("/motif.jpg".into()))
        );
        assert!(matches!(
            MotifSource::classify("data:image/png;base64,AAAA"),
            Some(MotifSource::Inline(_))
        ));
        assert_eq!(MotifSource::classify("ftp://example.com/a.jpg"), None);
        assert_eq!(MotifSource::classify("motif.jpg"), None);
        assert_eq!(MotifSource::classify("javascript:alert(1)"), None);
    }

    #[test]
    fn test_sanitize_reference() {
        assert_eq!(sanitize_reference(" /custom.png "), "/custom.png");
        assert_eq!(sanitize_reference("C:\\images\\m.jpg"), DEFAULT_MOTIF_REF);
        assert_eq!(sanitize_reference(""), DEFAULT_MOTIF_REF);
    }

    #[test]
    fn test_asset_path_stays_inside_root() {
        let root = Path::new("assets");
        assert_eq!(asset_path(root, "/motif.jpg"), root.join("motif.jpg"));
        assert_eq!(asset_path(root, "/../../etc/passwd"), root.join("etc").join("passwd"));
    }

    #[test]
    fn test_inline_round_trip() {
        let bytes = png_bytes(3, 2);
        let uri = encode_inline(&bytes, Path::new("upload.PNG"));
        assert!(uri.starts_with("data:image/png;base64,"));
        assert_eq!(decode_inline(&uri).unwrap(), bytes);
    }

    #[test]
    fn test_inline_rejects_non_base64() {
        assert!(matches!(
            decode_inline("data:text/plain,hello"),
            Err(MotifError::InlinePayload(_))
        ));
        assert!(decode_inline("data:image/png;base64").is_err());
        assert!(decode_inline("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn test_load_from_asset_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("motif.png"), png_bytes(8, 4)).unwrap();

        let motif = load_motif("/motif.png", dir.path()).unwrap();
        assert_eq!((motif.width(), motif.height()), (8, 4));

        assert!(matches!(load_motif("/missing.png", dir.path()), Err(MotifError::Io(_))));
        assert!(matches!(load_motif("nope", dir.path()), Err(MotifError::Unsupported(_))));
    }

    #[test]
    fn test_load_rejects_undecodable_payload() {
        let uri = encode_inline(b"not an image", Path::new("x.jpg"));
        assert!(matches!(load_motif(&uri, Path::new(".")), Err(MotifError::Decode(_))));
    }

    #[test]
    fn test_background_load() {
        let uri = encode_inline(&png_bytes(5, 5), Path::new("x.png"));
        let receiver = spawn_load(uri.clone(), PathBuf::from("."));
        let (reference, result) = receiver.recv().unwrap();
        assert_eq!(reference, uri);
        assert_eq!(result.unwrap().width(), 5);
    }
}

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// File extensions the viewer accepts, both for URL loads and drag and drop.
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "gltf", "glb", "hdr", "bin", "png", "jpeg", "webp", "jpg", "exr", "json",
];

const GLB_MAGIC: &[u8; 4] = b"glTF";
const GLB_HEADER_LEN: usize = 12;

/// Asset category derived from a URL or path extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Gltf,
    Glb,
    Hdr,
    Exr,
    Image,
    Json,
    Bin,
}

impl AssetKind {
    /// Classifies `url` by its extension, ignoring any query string or fragment.
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let (_, extension) = file_name.rsplit_once('.')?;
        let kind = match extension.to_ascii_lowercase().as_str() {
            "gltf" => Self::Gltf,
            "glb" => Self::Glb,
            "hdr" => Self::Hdr,
            "exr" => Self::Exr,
            "png" | "jpg" | "jpeg" | "webp" => Self::Image,
            "json" => Self::Json,
            "bin" => Self::Bin,
            _ => return None,
        };
        Some(kind)
    }

    /// Assets that produce scene objects when loaded.
    pub fn is_model(self) -> bool {
        matches!(self, Self::Gltf | Self::Glb)
    }

    /// Assets usable as an environment map.
    pub fn is_environment(self) -> bool {
        matches!(self, Self::Hdr | Self::Exr | Self::Image)
    }
}

/// Where an asset reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLocation<'a> {
    Remote(&'a str),
    Local(&'a str),
}

impl<'a> AssetLocation<'a> {
    pub fn parse(url: &'a str) -> Result<Self> {
        if url.starts_with("https://") || url.starts_with("http://") {
            return Ok(Self::Remote(url));
        }
        if let Some(path) = url.strip_prefix("file://") {
            return Ok(Self::Local(path));
        }
        match url.split_once("://") {
            Some((scheme, _)) => Err(anyhow!("unsupported URL scheme '{scheme}' in {url}")),
            None if url.is_empty() => Err(anyhow!("asset URL is empty")),
            None => Ok(Self::Local(url)),
        }
    }
}

/// Fixed header at the start of a binary glTF container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlbHeader {
    pub version: u32,
    pub length: u32,
}

/// Validates the GLB header of `data`.
pub fn parse_glb_header(data: &[u8]) -> Result<GlbHeader> {
    if data.len() < GLB_HEADER_LEN {
        return Err(anyhow!("GLB too small to contain header (len={})", data.len()));
    }
    let magic = &data[..4];
    if magic != GLB_MAGIC {
        return Err(anyhow!("invalid GLB magic: expected glTF, found {:?}", magic));
    }
    let version = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if version != 2 {
        return Err(anyhow!("unsupported GLB version {version}"));
    }
    let length = u32::from_le_bytes([data[8], data[9], data[10], data[11]]);
    if length as usize > data.len() {
        return Err(anyhow!(
            "GLB declares {length} bytes but only {} are present",
            data.len()
        ));
    }
    Ok(GlbHeader { version, length })
}

/// Checks that a `.gltf` document is JSON carrying an `asset.version` field.
pub fn validate_gltf_json(data: &[u8]) -> Result<()> {
    let document: serde_json::Value =
        serde_json::from_slice(data).map_err(|err| anyhow!("glTF is not valid JSON: {err}"))?;
    document
        .get("asset")
        .and_then(|asset| asset.get("version"))
        .and_then(serde_json::Value::as_str)
        .map(|_| ())
        .ok_or_else(|| anyhow!("glTF document has no asset.version"))
}

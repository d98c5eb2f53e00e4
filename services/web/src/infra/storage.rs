//! Image storage collaborators: local disk or Cloudinary.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, anyhow, bail};
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::{CloudinarySettings, ImageSettings};
use crate::domain::repository::ImageStorage;
use crate::domain::types::ImageUpload;

/// Image store chosen once at startup.
#[derive(Clone)]
pub enum ImageStore {
    LocalDisk(LocalDiskStore),
    Cloudinary(CloudinaryStore),
}

impl ImageStore {
    pub fn from_settings(settings: &ImageSettings) -> anyhow::Result<Self> {
        match settings {
            ImageSettings::Local { dir, url_prefix } => Ok(Self::LocalDisk(LocalDiskStore::new(
                dir.clone(),
                url_prefix.clone(),
            ))),
            ImageSettings::Cloudinary(cloud) => {
                Ok(Self::Cloudinary(CloudinaryStore::new(cloud.clone())?))
            }
        }
    }

    /// Directory and URL prefix to serve statically, when images live on local disk.
    pub fn public_dir(&self) -> Option<(&str, &Path)> {
        match self {
            Self::LocalDisk(local) => Some((&local.url_prefix, &local.dir)),
            Self::Cloudinary(_) => None,
        }
    }
}

impl ImageStorage for ImageStore {
    async fn store(&self, image: ImageUpload<'_>) -> anyhow::Result<String> {
        match self {
            Self::LocalDisk(local) => local.store(image).await,
            Self::Cloudinary(cloud) => cloud.store(image).await,
        }
    }

    async fn remove(&self, reference: &str) -> anyhow::Result<()> {
        match self {
            Self::LocalDisk(local) => local.remove(reference).await,
            Self::Cloudinary(cloud) => cloud.remove(reference).await,
        }
    }
}

// ── Local disk ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LocalDiskStore {
    dir: PathBuf,
    url_prefix: String,
}

impl LocalDiskStore {
    pub fn new(dir: PathBuf, url_prefix: String) -> Self {
        Self {
            dir,
            url_prefix: url_prefix.trim_end_matches('/').to_owned(),
        }
    }

    async fn store(&self, image: ImageUpload<'_>) -> anyhow::Result<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create upload directory {}", self.dir.display()))?;
        let file_name = format!("image-{}.{}", Uuid::new_v4(), image.format.extension());
        let target = self.dir.join(&file_name);
        tokio::fs::copy(image.path, &target)
            .await
            .with_context(|| format!("copy staged image to {}", target.display()))?;
        Ok(format!("{}/{file_name}", self.url_prefix))
    }

    async fn remove(&self, reference: &str) -> anyhow::Result<()> {
        let file_name = reference
            .strip_prefix(&self.url_prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| is_plain_file_name(name))
            .ok_or_else(|| anyhow!("{reference} is not a local image reference"))?;
        tokio::fs::remove_file(self.dir.join(file_name))
            .await
            .with_context(|| format!("remove image {file_name}"))
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

// ── Cloudinary ────────────────────────────────────────────────────────────────

const CLOUDINARY_API: &str = "https://api.cloudinary.com/v1_1";

#[derive(Clone)]
pub struct CloudinaryStore {
    client: reqwest::Client,
    settings: Arc<CloudinarySettings>,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryStore {
    pub fn new(settings: CloudinarySettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("build cloudinary http client")?;
        Ok(Self {
            client,
            settings: Arc::new(settings),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{CLOUDINARY_API}/{}/image/{action}",
            self.settings.cloud_name
        )
    }

    async fn store(&self, image: ImageUpload<'_>) -> anyhow::Result<String> {
        let timestamp = Utc::now().timestamp().to_string();
        let public_id = new_public_id();
        let folder = self.settings.folder.as_str();
        let signature = sign(
            &[
                ("folder", folder),
                ("public_id", &public_id),
                ("timestamp", &timestamp),
            ],
            &self.settings.api_secret,
        );

        let bytes = tokio::fs::read(image.path)
            .await
            .context("read staged image")?;
        let file = Part::bytes(bytes)
            .file_name(format!("{public_id}.{}", image.format.extension()))
            .mime_str(image.format.mime())
            .context("build image part")?;
        let form = Form::new()
            .part("file", file)
            .text("api_key", self.settings.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", folder.to_owned())
            .text("public_id", public_id)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let uploaded: UploadResponse = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .context("cloudinary upload request")?
            .error_for_status()
            .context("cloudinary upload rejected")?
            .json()
            .await
            .context("decode cloudinary upload response")?;
        Ok(uploaded.secure_url)
    }

    async fn remove(&self, reference: &str) -> anyhow::Result<()> {
        let public_id = public_id_from_url(reference)
            .ok_or_else(|| anyhow!("{reference} is not a cloudinary delivery url"))?;
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign(
            &[("public_id", &public_id), ("timestamp", &timestamp)],
            &self.settings.api_secret,
        );
        let form = Form::new()
            .text("api_key", self.settings.api_key.clone())
            .text("timestamp", timestamp)
            .text("public_id", public_id)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        let destroyed: DestroyResponse = self
            .client
            .post(self.endpoint("destroy"))
            .multipart(form)
            .send()
            .await
            .context("cloudinary destroy request")?
            .error_for_status()
            .context("cloudinary destroy rejected")?
            .json()
            .await
            .context("decode cloudinary destroy response")?;
        if destroyed.result != "ok" {
            bail!("cloudinary destroy returned {:?}", destroyed.result);
        }
        Ok(())
    }
}

/// `school_<unix-millis>_<8 hex chars>`.
fn new_public_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("school_{}_{}", Utc::now().timestamp_millis(), &suffix[..8])
}

/// Cloudinary request signature: parameters sorted by name, joined as
/// `k=v&k=v`, secret appended, SHA-256, lowercase hex.
fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Recover `folder/public_id` from a delivery URL such as
/// `https://res.cloudinary.com/demo/image/upload/v1712/school-management/schools/school_1.png`.
fn public_id_from_url(url: &str) -> Option<String> {
    let (_, path) = url.split_once("/upload/")?;
    let path = match path.split_once('/') {
        Some((version, rest))
            if version.len() > 1
                && version.starts_with('v')
                && version[1..].bytes().all(|b| b.is_ascii_digit()) =>
        {
            rest
        }
        _ => path,
    };
    let id = match path.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => path,
    };
    (!id.is_empty()).then(|| id.to_owned())
}

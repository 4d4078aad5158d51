//! Asset loading and backend selection.
//!
//! The model is a JSON document (bone hierarchy plus any embedded clips)
//! served over HTTP; per-command clips live as separate JSON files in the
//! animations directory. A missing or unloadable model degrades to the
//! primitive rig instead of failing, and each clip file fails independently,
//! so a partial animation set still plays what it has.

use futures_util::future::join_all;
use glam::{Quat, Vec3};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{info, warn};

use crate::avatar::Backend;
use crate::clips::{Clip, ClipLibrary, CLIP_FILES};
use crate::config::AvatarConfig;
use crate::error::AvatarError;
use crate::rig::PrimitiveRig;
use crate::skeleton::{Bone, Skeleton};
use crate::target::SkeletalAvatar;

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

/// One bone of the model document. Parents are referenced by name and must
/// appear earlier in the list.
#[derive(Debug, Deserialize)]
pub struct BoneSpec {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default = "identity_rotation")]
    pub rotation: [f32; 4],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
}

#[derive(Debug, Deserialize)]
pub struct ModelDocument {
    #[serde(default)]
    pub name: Option<String>,
    pub bones: Vec<BoneSpec>,
    /// Clips baked into the model file, keyed by their own names.
    #[serde(default)]
    pub clips: Vec<Clip>,
}

impl ModelDocument {
    pub fn build_skeleton(&self) -> Result<Skeleton, AvatarError> {
        if self.bones.is_empty() {
            return Err(AvatarError::Asset("model has no bones".to_string()));
        }
        let mut bones = Vec::with_capacity(self.bones.len());
        for spec in &self.bones {
            let parent = match &spec.parent {
                None => None,
                Some(name) => {
                    let index = bones.iter().position(|b: &Bone| b.name == *name);
                    if index.is_none() {
                        return Err(AvatarError::Asset(format!(
                            "bone {} references unknown parent {}",
                            spec.name, name
                        )));
                    }
                    index
                }
            };
            let mut bone = Bone::new(spec.name.clone(), parent);
            bone.position = Vec3::from_array(spec.position);
            bone.rotation = Quat::from_array(spec.rotation);
            bone.scale = Vec3::from_array(spec.scale);
            bones.push(bone);
        }
        Ok(Skeleton::new(bones))
    }
}

/// Dev servers answer missing files with a 200 index.html; an HTML
/// content-type means the asset is not really there.
fn is_html_content_type(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.to_ascii_lowercase().contains("text/html"))
}

pub struct AssetLoader {
    client: reqwest::Client,
    config: AvatarConfig,
}

impl AssetLoader {
    pub fn new(config: AvatarConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Select a backend: the skeletal avatar when the model and at least one
    /// clip load, otherwise the primitive rig.
    pub async fn load(&self) -> Backend {
        match self.load_skeletal().await {
            Ok(avatar) => {
                info!(clips = avatar.library.len(), "skeletal model loaded");
                Backend::Skeletal(avatar)
            }
            Err(err) => {
                warn!(error = %err, "falling back to primitive rig");
                Backend::Primitive(PrimitiveRig::default())
            }
        }
    }

    async fn load_skeletal(&self) -> Result<SkeletalAvatar, AvatarError> {
        self.probe_model().await?;
        let document = self.fetch_model().await?;
        let skeleton = document.build_skeleton()?;

        let mut library = ClipLibrary::default();
        for clip in document.clips {
            library.add(clip.name.clone(), clip);
        }
        self.load_clip_files(&mut library).await;
        if library.is_empty() {
            return Err(AvatarError::Asset(
                "model loaded but no clips are available".to_string(),
            ));
        }

        Ok(SkeletalAvatar::new(
            skeleton,
            library,
            self.config.crossfade,
            self.config.look_at_max_yaw,
        ))
    }

    /// Cheap existence check before committing to the full download.
    async fn probe_model(&self) -> Result<(), AvatarError> {
        let response = self.client.head(&self.config.model_url).send().await?;
        if !response.status().is_success() {
            return Err(AvatarError::Asset(format!(
                "model probe returned {}",
                response.status()
            )));
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        if is_html_content_type(content_type) {
            return Err(AvatarError::Asset(
                "model url answers with HTML, treating as missing".to_string(),
            ));
        }
        Ok(())
    }

    async fn fetch_model(&self) -> Result<ModelDocument, AvatarError> {
        let response = self.client.get(&self.config.model_url).send().await?;
        if !response.status().is_success() {
            return Err(AvatarError::Asset(format!(
                "model fetch returned {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    /// Load every command's clip files concurrently. Each command probes its
    /// base file and then numbered variants until the first miss; failures
    /// are logged and skipped.
    async fn load_clip_files(&self, library: &mut ClipLibrary) {
        let tasks = CLIP_FILES.iter().map(|(command, file)| async move {
            (*command, self.fetch_variants(file).await)
        });
        let mut loaded = 0usize;
        for (command, clips) in join_all(tasks).await {
            for clip in clips {
                library.add(command, clip);
                loaded += 1;
            }
        }
        info!(loaded, commands = CLIP_FILES.len(), "clip files loaded");
    }

    async fn fetch_variants(&self, file: &str) -> Vec<Clip> {
        let mut clips = Vec::new();
        match self.fetch_clip(&self.clip_url(file, None)).await {
            Some(clip) => clips.push(clip),
            None => return clips,
        }
        for variant in 1..=self.config.max_clip_variants {
            match self.fetch_clip(&self.clip_url(file, Some(variant))).await {
                Some(clip) => clips.push(clip),
                None => break,
            }
        }
        clips
    }

    fn clip_url(&self, file: &str, variant: Option<u32>) -> String {
        let base = self.config.animations_url.trim_end_matches('/');
        match variant {
            None => format!("{base}/{file}.json"),
            Some(n) => format!("{base}/{file} {n}.json"),
        }
    }

    async fn fetch_clip(&self, url: &str) -> Option<Clip> {
        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(err) => {
                warn!(url, error = %err, "clip fetch failed");
                return None;
            }
        };
        if !response.status().is_success() {
            return None;
        }
        match response.json::<Clip>().await {
            Ok(clip) => Some(clip),
            Err(err) => {
                warn!(url, error = %err, "clip file malformed, skipping");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_document_builds_parented_skeleton() {
        let doc: ModelDocument = serde_json::from_str(
            r#"{
                "name": "character",
                "bones": [
                    {"name": "mixamorigHips", "position": [0.0, 1.0, 0.0]},
                    {"name": "mixamorigSpine", "parent": "mixamorigHips"},
                    {"name": "mixamorigLeftUpLeg", "parent": "mixamorigHips"}
                ]
            }"#,
        )
        .unwrap();
        let skeleton = doc.build_skeleton().unwrap();
        assert_eq!(skeleton.len(), 3);
        let spine = skeleton.bone_index("mixamorigSpine").unwrap();
        assert_eq!(skeleton.bones()[spine].parent, Some(0));
        assert_eq!(skeleton.bones()[0].position.y, 1.0);
    }

    #[test]
    fn unknown_parent_is_an_error() {
        let doc: ModelDocument = serde_json::from_str(
            r#"{"bones": [{"name": "a", "parent": "ghost"}]}"#,
        )
        .unwrap();
        assert!(doc.build_skeleton().is_err());
    }

    #[test]
    fn empty_bone_list_is_an_error() {
        let doc: ModelDocument = serde_json::from_str(r#"{"bones": []}"#).unwrap();
        assert!(doc.build_skeleton().is_err());
    }

    #[test]
    fn html_content_type_means_missing() {
        assert!(is_html_content_type(Some("text/html; charset=utf-8")));
        assert!(!is_html_content_type(Some("application/json")));
        assert!(!is_html_content_type(None));
    }

    #[test]
    fn variant_urls_are_numbered() {
        let loader = AssetLoader::new(AvatarConfig::default());
        let base = loader.clip_url("Happy Idle", None);
        assert!(base.ends_with("/Happy Idle.json"));
        let second = loader.clip_url("Happy Idle", Some(2));
        assert!(second.ends_with("/Happy Idle 2.json"));
    }
}

//! Constants shared by the decrypt and export pipelines
//!
//! Signature bytes, output naming conventions and the Unity class ids that
//! readers commonly enumerate.

/// Plaintext prefix of a UnityFS bundle
pub const UNITY_FS_SIGNATURE: &[u8] = b"UnityFS";

/// Suffix inserted before the extension of a decrypted sibling file
pub const DECRYPTED_SUFFIX: &str = "_DEC";

/// Prefix of names synthesized from a path id
pub const FALLBACK_NAME_PREFIX: &str = "path_id_";

/// Type tags as reported by bundle readers
pub mod type_tags {
    pub const TEXTURE_2D: &str = "Texture2D";
    pub const AUDIO_CLIP: &str = "AudioClip";
    pub const TEXT_ASSET: &str = "TextAsset";
    pub const MONO_BEHAVIOUR: &str = "MonoBehaviour";
    pub const FONT: &str = "Font";
    pub const SPRITE: &str = "Sprite";
    pub const MESH: &str = "Mesh";
    pub const SHADER: &str = "Shader";
    pub const MATERIAL: &str = "Material";
    pub const GAME_OBJECT: &str = "GameObject";
    pub const ASSET_BUNDLE: &str = "AssetBundle";
}

/// Common Unity class IDs
pub mod class_ids {
    pub const GAME_OBJECT: i32 = 1;
    pub const MATERIAL: i32 = 21;
    pub const TEXTURE_2D: i32 = 28;
    pub const MESH: i32 = 43;
    pub const SHADER: i32 = 48;
    pub const TEXT_ASSET: i32 = 49;
    pub const AUDIO_CLIP: i32 = 83;
    pub const MONO_BEHAVIOUR: i32 = 114;
    pub const FONT: i32 = 128;
    pub const ASSET_BUNDLE: i32 = 142;
    pub const SPRITE: i32 = 213;
}

/// Map a Unity class id to the type tag used for export classification.
///
/// Readers that only know raw class ids can use this to produce the
/// tags the classifier understands. Unknown ids yield `None`; callers
/// usually fall back to `Class_<id>`.
pub fn type_tag_for_class_id(class_id: i32) -> Option<&'static str> {
    match class_id {
        class_ids::GAME_OBJECT => Some(type_tags::GAME_OBJECT),
        class_ids::MATERIAL => Some(type_tags::MATERIAL),
        class_ids::TEXTURE_2D => Some(type_tags::TEXTURE_2D),
        class_ids::MESH => Some(type_tags::MESH),
        class_ids::SHADER => Some(type_tags::SHADER),
        class_ids::TEXT_ASSET => Some(type_tags::TEXT_ASSET),
        class_ids::AUDIO_CLIP => Some(type_tags::AUDIO_CLIP),
        class_ids::MONO_BEHAVIOUR => Some(type_tags::MONO_BEHAVIOUR),
        class_ids::FONT => Some(type_tags::FONT),
        class_ids::ASSET_BUNDLE => Some(type_tags::ASSET_BUNDLE),
        class_ids::SPRITE => Some(type_tags::SPRITE),
        _ => None,
    }
}

/// Type tag for a class id, with the `Class_<id>` fallback for unknown ids
pub fn type_tag_or_class(class_id: i32) -> String {
    type_tag_for_class_id(class_id)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Class_{}", class_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_class_ids() {
        assert_eq!(type_tag_for_class_id(28), Some("Texture2D"));
        assert_eq!(type_tag_for_class_id(83), Some("AudioClip"));
        assert_eq!(type_tag_for_class_id(49), Some("TextAsset"));
    }

    #[test]
    fn test_unknown_class_id_fallback() {
        assert_eq!(type_tag_for_class_id(999_999), None);
        assert_eq!(type_tag_or_class(999_999), "Class_999999");
        assert_eq!(type_tag_or_class(83), "AudioClip");
    }

    #[test]
    fn test_signature_length() {
        assert_eq!(UNITY_FS_SIGNATURE.len(), 7);
    }
}

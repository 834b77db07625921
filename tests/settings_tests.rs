//! Export Settings Tests
//!
//! Tests for:
//! - Defaults
//! - camelCase JSON with missing and unknown keys
//! - Validation and the texture size constraint
//! - Loading from a file

use scene_gltf::settings::TEXTURE_SIZE_DISABLED_AT;
use scene_gltf::{ExportError, ExportSettings};

#[test]
fn defaults() {
    let s = ExportSettings::default();
    assert_eq!(s.vertices_max_for_buffer, 50_000);
    assert_eq!(s.texture_max_size, 256);
    assert!(s.double_sided);
    assert_eq!(s.uri_base, "./");
    assert!(!s.log_building);
    assert!(s.add_unique_codes);
    assert!(!s.display_time_scaling);
    assert!(s.validate().is_ok());
}

#[test]
fn partial_json_keeps_other_defaults() {
    let s = ExportSettings::from_json_str(
        r#"{ "verticesMaxForBuffer": 1000, "uriBase": "https://cdn/x/", "unknownKey": 1 }"#,
    )
    .unwrap();
    assert_eq!(s.vertices_max_for_buffer, 1000);
    assert_eq!(s.uri_base, "https://cdn/x/");
    assert_eq!(s.texture_max_size, 256);
    assert_eq!(s.generator, "scene-gltf");
}

#[test]
fn zero_vertex_ceiling_is_rejected() {
    let err = ExportSettings::from_json_str(r#"{ "verticesMaxForBuffer": 0 }"#).unwrap_err();
    assert!(matches!(err, ExportError::Settings(_)));
}

#[test]
fn malformed_json_is_a_json_error() {
    let err = ExportSettings::from_json_str("{ not json").unwrap_err();
    assert!(matches!(err, ExportError::Json(_)));
}

#[test]
fn texture_constraint_range() {
    let with = |texture_max_size| ExportSettings {
        texture_max_size,
        ..ExportSettings::default()
    };
    assert_eq!(with(256).texture_constraint(), Some(256));
    assert_eq!(with(0).texture_constraint(), None);
    assert_eq!(with(TEXTURE_SIZE_DISABLED_AT).texture_constraint(), None);
    assert_eq!(
        with(TEXTURE_SIZE_DISABLED_AT - 1).texture_constraint(),
        Some(TEXTURE_SIZE_DISABLED_AT - 1)
    );
}

#[test]
fn serialized_settings_load_back() {
    let original = ExportSettings {
        double_sided: false,
        copyright: "(c) test".to_string(),
        ..ExportSettings::default()
    };
    let path = std::env::temp_dir().join(format!("scene-gltf-settings-{}.json", uuid::Uuid::new_v4()));
    std::fs::write(&path, serde_json::to_string(&original).unwrap()).unwrap();

    let loaded = ExportSettings::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, original);
}

#[test]
fn missing_file_is_a_storage_error() {
    let err = ExportSettings::load("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, ExportError::Storage { .. }));
}

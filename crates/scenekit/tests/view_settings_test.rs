//! Persisting and restoring view settings as JSON.

use scenekit::{Camera, StateFlags, ViewSettings};

#[test]
fn test_view_settings_json_roundtrip_restores_mode_and_clips() {
    let mut camera = Camera::new(1.0);
    camera.near = 0.5;
    camera.far = 250.0;
    let mode = StateFlags::SMOOTH | StateFlags::WIREFRAME | StateFlags::LIT;

    let settings = ViewSettings::capture(&camera, mode);
    let json = serde_json::to_string(&settings).unwrap();

    let restored: ViewSettings = serde_json::from_str(&json).unwrap();
    let mut fresh = Camera::new(1.0);
    let restored_mode = restored.apply(&mut fresh).unwrap();

    assert_eq!(restored_mode, mode);
    assert!((fresh.near - 0.5).abs() < f32::EPSILON);
    assert!((fresh.far - 250.0).abs() < f32::EPSILON);
}

#[test]
fn test_malformed_settings_leave_camera_untouched() {
    let json = r#"{"render_mode":"not-hex","z_near":0.5,"z_far":100.0}"#;
    let settings: ViewSettings = serde_json::from_str(json).unwrap();

    let mut camera = Camera::new(1.0);
    let before_near = camera.near;
    assert!(settings.apply(&mut camera).is_err());
    assert!((camera.near - before_near).abs() < f32::EPSILON);
}

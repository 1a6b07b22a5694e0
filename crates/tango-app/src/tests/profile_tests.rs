use std::fs;

use tango_config::Config;

use crate::profile::{Profile, Profiles, load_config_file};

#[test]
fn init_creates_main_profile_once() {
    let dir = tempfile::tempdir().unwrap();
    let profiles = Profiles::at(dir.path().join("profiles"));

    profiles.init().unwrap();
    let main = profiles.dir().join("main.json");
    assert!(main.exists());

    let mut edited = Config::default();
    edited.pipeline.debounce_ms = 50;
    let profile = Profile {
        name: "main".into(),
        value: edited.clone(),
    };
    fs::write(&main, serde_json::to_string(&profile).unwrap()).unwrap();

    profiles.init().unwrap();
    assert_eq!(profiles.load("main").unwrap(), edited);
}

#[test]
fn missing_profile_falls_back_to_main() {
    let dir = tempfile::tempdir().unwrap();
    let profiles = Profiles::at(dir.path());

    assert_eq!(profiles.load("study").unwrap(), Config::default());

    let mut main = Config::default();
    main.pipeline.max_terms = 10;
    let profile = Profile {
        name: "main".into(),
        value: main.clone(),
    };
    fs::write(
        dir.path().join("main.json"),
        serde_json::to_string(&profile).unwrap(),
    )
    .unwrap();

    assert_eq!(profiles.load("study").unwrap(), main);
}

#[test]
fn broken_profile_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("study.json"), "{ not json").unwrap();

    let err = Profiles::at(dir.path()).load("study").unwrap_err();
    assert!(err.to_string().contains("study.json"));
}

#[test]
fn config_file_fills_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tango.json");
    fs::write(&path, r#"{ "pipeline": { "auto_search_images": true } }"#).unwrap();

    let config = load_config_file(&path).unwrap();
    assert!(config.pipeline.auto_search_images);
    assert_eq!(config.pipeline.debounce_ms, 400);
    assert!(!config.backend.enabled);
}

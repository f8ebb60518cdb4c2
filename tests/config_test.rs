use tabplot::config::{AppConfig, ConfigManager};
use std::fs;
use tempfile::TempDir;

fn setup_test_config_dir() -> (TempDir, ConfigManager) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_manager = ConfigManager::with_dir(temp_dir.path().to_path_buf());
    (temp_dir, config_manager)
}

#[test]
fn test_default_config() {
    let config = AppConfig::default();
    assert_eq!(config.version, "0.1");
    assert_eq!(config.figure.width, 8.0);
    assert_eq!(config.figure.height, 5.0);
    assert_eq!(config.figure.dpi, 100);
    assert_eq!(config.fonts.title, 12);
    assert_eq!(config.presets.file, "plot_presets.json");
    assert_eq!(config.loading.infer_schema_length, 100);
    assert!(!config.loading.ignore_errors);
    assert!(config.validate().is_ok());
}

#[test]
fn test_write_default_config_respects_force() {
    let (_temp_dir, manager) = setup_test_config_dir();
    let path = manager.write_default_config(false).unwrap();
    assert!(path.exists());
    assert!(manager.write_default_config(false).is_err());
    assert!(manager.write_default_config(true).is_ok());
}

#[test]
fn test_written_default_config_loads() {
    let (_temp_dir, manager) = setup_test_config_dir();
    manager.write_default_config(false).unwrap();
    let config = AppConfig::load(&manager).unwrap();
    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_missing_config_file_gives_defaults() {
    let (_temp_dir, manager) = setup_test_config_dir();
    assert_eq!(AppConfig::load(&manager).unwrap(), AppConfig::default());
}

#[test]
fn test_partial_user_config_is_merged() {
    let (_temp_dir, manager) = setup_test_config_dir();
    manager.ensure_config_dir().unwrap();
    fs::write(
        manager.config_path("config.toml"),
        "[figure]\nwidth = 12.0\n\n[presets]\nfile = \"/data/presets.json\"\n",
    )
    .unwrap();
    let config = AppConfig::load(&manager).unwrap();
    assert_eq!(config.figure.width, 12.0);
    assert_eq!(config.figure.height, 5.0);
    assert_eq!(
        manager.presets_path(&config.presets),
        std::path::PathBuf::from("/data/presets.json")
    );
}

#[test]
fn test_invalid_user_config_is_an_error() {
    let (_temp_dir, manager) = setup_test_config_dir();
    manager.ensure_config_dir().unwrap();
    fs::write(manager.config_path("config.toml"), "[fonts]\ntitle = 2\n").unwrap();
    assert!(AppConfig::load(&manager).is_err());

    fs::write(manager.config_path("config.toml"), "[figure\nwidth = ").unwrap();
    let err = AppConfig::load(&manager).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

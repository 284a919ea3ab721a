//! Tests for configuration loading and settings resolution
//!
//! Tests that manipulate PCHECK_ROOT_FOLDER or PCHECK_CONFIG are marked with
//! #[serial] so they never run concurrently with each other.

use pcheck_common::config::{
    init_config_file, load_or_default, load_toml_config, locate_config_file, resolve_root_folder,
    write_toml_config, GroupConfig, Overrides, Settings, TomlConfig, CONFIG_FILE_ENV,
    ROOT_FOLDER_ENV,
};
use pcheck_common::{Error, Group, Technology, Vendor};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_env() {
    env::remove_var(ROOT_FOLDER_ENV);
    env::remove_var(CONFIG_FILE_ENV);
}

#[test]
#[serial]
fn test_root_folder_cli_wins_over_env_and_toml() {
    clear_env();
    env::set_var(ROOT_FOLDER_ENV, "/tmp/pcheck-env-root");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/pcheck-toml-root")),
        ..TomlConfig::default()
    };

    let cli = PathBuf::from("/tmp/pcheck-cli-root");
    assert_eq!(resolve_root_folder(Some(&cli), &config), cli);
    assert_eq!(
        resolve_root_folder(None, &config),
        PathBuf::from("/tmp/pcheck-env-root")
    );

    clear_env();
    assert_eq!(
        resolve_root_folder(None, &config),
        PathBuf::from("/tmp/pcheck-toml-root")
    );
    assert_eq!(
        resolve_root_folder(None, &TomlConfig::default()),
        PathBuf::from(".")
    );
}

#[test]
#[serial]
fn test_write_then_load_config_file() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("pcheck.toml");

    let config = TomlConfig {
        max_workers: Some(2),
        dump_extensions: vec!["db".to_string(), "sqlite".to_string()],
        groups: vec![GroupConfig {
            vendor: Vendor::Nokia,
            technology: Technology::FourG,
            dump_dir: Some(PathBuf::from("in/nokia")),
            output_dir: None,
        }],
        ..TomlConfig::default()
    };
    write_toml_config(&config, &path).unwrap();

    let loaded = load_toml_config(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_init_config_file_refuses_to_replace() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("pcheck.toml");

    init_config_file(&path, &TomlConfig::default(), false).unwrap();
    assert_eq!(load_toml_config(&path).unwrap(), TomlConfig::default());

    let custom = TomlConfig {
        max_workers: Some(3),
        ..TomlConfig::default()
    };
    let err = init_config_file(&path, &custom, false).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert_eq!(load_toml_config(&path).unwrap(), TomlConfig::default());

    init_config_file(&path, &custom, true).unwrap();
    assert_eq!(load_toml_config(&path).unwrap().max_workers, Some(3));
}

#[test]
#[serial]
fn test_hand_written_toml() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("pcheck.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/pcheck"
template = "templates/EMPTY.db"

[logging]
level = "debug"

[[groups]]
vendor = "Huawei"
technology = "2G"
output_dir = "results/hw2g"
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.groups.len(), 1);
    assert_eq!(
        config.groups[0].group(),
        Group::new(Vendor::Huawei, Technology::TwoG)
    );

    let settings = Settings::resolve(&config, &Overrides::default()).unwrap();
    assert_eq!(settings.root_folder, PathBuf::from("/srv/pcheck"));
    assert_eq!(settings.rule_store, PathBuf::from("/srv/pcheck/dbconfig.db"));
    assert_eq!(settings.groups[0].dump_dir, PathBuf::from("/srv/pcheck/dumpfiles/huawei/2g"));
    assert_eq!(settings.groups[0].output_dir, PathBuf::from("/srv/pcheck/results/hw2g"));
}

#[test]
#[serial]
fn test_invalid_toml_is_config_error() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("pcheck.toml");
    std::fs::write(&path, "max_workers = \"many\"").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
#[serial]
fn test_locate_config_prefers_explicit_then_env_then_root() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let root_config = temp_dir.path().join("pcheck.toml");
    std::fs::write(&root_config, "").unwrap();

    let explicit = PathBuf::from("/tmp/explicit-pcheck.toml");
    assert_eq!(
        locate_config_file(Some(&explicit), Some(temp_dir.path())),
        Some(explicit)
    );

    env::set_var(CONFIG_FILE_ENV, "/tmp/env-pcheck.toml");
    assert_eq!(
        locate_config_file(None, Some(temp_dir.path())),
        Some(PathBuf::from("/tmp/env-pcheck.toml"))
    );

    clear_env();
    assert_eq!(
        locate_config_file(None, Some(temp_dir.path())),
        Some(root_config)
    );
}

#[test]
#[serial]
fn test_empty_root_config_loads_defaults() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("pcheck.toml"), "").unwrap();

    let (config, source) = load_or_default(None, Some(temp_dir.path())).unwrap();
    assert_eq!(config, TomlConfig::default());
    assert_eq!(source, Some(temp_dir.path().join("pcheck.toml")));
}

#[test]
#[serial]
fn test_group_selection_and_validation() {
    clear_env();
    let config = TomlConfig::default();
    let nokia_2g = Group::new(Vendor::Nokia, Technology::TwoG);

    let overrides = Overrides {
        root_folder: Some(PathBuf::from("/data")),
        max_workers: Some(3),
        groups: vec![nokia_2g],
    };
    let settings = Settings::resolve(&config, &overrides).unwrap();
    assert_eq!(settings.max_workers, 3);
    assert_eq!(settings.groups.len(), 1);
    assert_eq!(settings.groups[0].group, nokia_2g);
    assert_eq!(settings.groups[0].output_dir, PathBuf::from("/data/output/nokia/2g"));

    let zero_workers = Overrides {
        max_workers: Some(0),
        ..Overrides::default()
    };
    assert!(matches!(
        Settings::resolve(&config, &zero_workers),
        Err(Error::Config(_))
    ));

    let only_huawei = TomlConfig {
        groups: vec![GroupConfig::from(Group::new(Vendor::Huawei, Technology::FourG))],
        ..TomlConfig::default()
    };
    let unknown_selection = Overrides {
        groups: vec![nokia_2g],
        ..Overrides::default()
    };
    assert!(matches!(
        Settings::resolve(&only_huawei, &unknown_selection),
        Err(Error::Config(_))
    ));

    let duplicated = TomlConfig {
        groups: vec![GroupConfig::from(nokia_2g), GroupConfig::from(nokia_2g)],
        ..TomlConfig::default()
    };
    assert!(matches!(
        Settings::resolve(&duplicated, &Overrides::default()),
        Err(Error::Config(_))
    ));

    let no_extensions = TomlConfig {
        dump_extensions: vec![" ".to_string()],
        ..TomlConfig::default()
    };
    assert!(matches!(
        Settings::resolve(&no_extensions, &Overrides::default()),
        Err(Error::Config(_))
    ));
}

#[test]
#[serial]
fn test_extensions_are_normalized() {
    clear_env();
    let config = TomlConfig {
        dump_extensions: vec![".MDB".to_string(), "accdb".to_string()],
        ..TomlConfig::default()
    };
    let settings = Settings::resolve(&config, &Overrides::default()).unwrap();
    assert_eq!(settings.dump_extensions, vec!["mdb", "accdb"]);
}

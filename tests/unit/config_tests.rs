// Configuration module unit tests

use std::io::Write;
use tempfile::NamedTempFile;

use edgepix::access::AllowList;
use edgepix::config::*;

#[test]
fn test_can_deserialize_full_yaml_config() {
    let yaml = r#"
server:
  address: "127.0.0.1"
  port: 9090
  threads: 2
access:
  allow_list:
    - example.com
    - images.test
fetch:
  timeout_secs: 5
  user_agent: "edgepix-test"
redirect_url: "https://docs.example.com/edgepix"
logging:
  format: pretty
  level: debug
"#;
    let config = Config::from_yaml_with_env(yaml).expect("Failed to parse config");

    assert_eq!(config.server.listen_addr(), "127.0.0.1:9090");
    assert_eq!(config.server.threads, 2);
    assert_eq!(config.access.allow_list, vec!["example.com", "images.test"]);
    assert_eq!(config.fetch.timeout_secs, 5);
    assert_eq!(config.fetch.user_agent, "edgepix-test");
    assert_eq!(config.redirect_url, "https://docs.example.com/edgepix");
    assert_eq!(config.logging.format, LogFormat::Pretty);
    assert_eq!(config.logging.level, "debug");
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_sections_keep_defaults() {
    let yaml = r#"
server:
  port: 3000
"#;
    let config = Config::from_yaml_with_env(yaml).unwrap();
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.server.address, "0.0.0.0");
    assert_eq!(config.fetch.timeout_secs, 30);
    assert!(config.access.allow_list.is_empty());
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn test_env_var_substitution() {
    std::env::set_var("EDGEPIX_TEST_REDIRECT", "https://redirect.example.com");
    let yaml = r#"
redirect_url: "${EDGEPIX_TEST_REDIRECT}"
"#;
    let config = Config::from_yaml_with_env(yaml).unwrap();
    assert_eq!(config.redirect_url, "https://redirect.example.com");
    std::env::remove_var("EDGEPIX_TEST_REDIRECT");
}

#[test]
fn test_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "server:\n  port: 8181\naccess:\n  allow_list: [\"cdn.example.com\"]"
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.server.port, 8181);
    assert_eq!(config.access.allow_list, vec!["cdn.example.com"]);
}

#[test]
fn test_from_file_missing_path() {
    let err = Config::from_file("/nonexistent/edgepix.yaml").unwrap_err();
    assert!(err.contains("Failed to read config file"));
}

#[test]
fn test_from_file_invalid_yaml() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "server: [this is not a map").unwrap();
    assert!(Config::from_file(file.path()).is_err());
}

#[test]
fn test_load_validates() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "server:\n  port: 0").unwrap();

    let err = Config::load(Some(file.path())).unwrap_err();
    assert!(err.contains("port"));
}

#[test]
fn test_allow_list_override_feeds_access_control() {
    let mut config = Config::default();
    config.apply_allow_list_override(Some(" example.com , ,images.test".to_string()));

    let allow_list = AllowList::from_config(&config.access);
    assert!(allow_list.is_allowed("https://img.example.com/a.png"));
    assert!(allow_list.is_allowed("https://images.test/b.png"));
    assert!(!allow_list.is_allowed("https://evil.com/x.png"));
}

#[test]
fn test_example_config_loads() {
    let config = Config::from_file("config.example.yaml").expect("example config must parse");
    assert_eq!(config, {
        let mut expected = Config::default();
        expected.access.allow_list = vec!["example.com".to_string()];
        expected
    });
    assert!(config.validate().is_ok());
}

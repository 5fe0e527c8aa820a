//! Loading registry configuration from disk

use nacos_registry::{Error, NacosRegistryProvider, RegistryConfig};
use std::time::Duration;

#[smol_potat::test]
async fn test_load_yaml_config() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("registry.yaml");
    async_fs::write(
        &path,
        r#"
address: "10.0.0.1:8848; 10.0.0.2:8848"
username: nacos
password: secret
extra:
  namespace: dev
  namingLogLevel: warn
  timeout: "1200"
"#,
    )
    .await?;

    let config = RegistryConfig::from_file(&path).await?;
    assert_eq!(config.server_addr(), "10.0.0.1:8848,10.0.0.2:8848");
    assert_eq!(config.timeout(), Duration::from_millis(1200));

    let properties = NacosRegistryProvider::new().naming_properties(&config);
    assert_eq!(
        properties.get("com.alibaba.nacos.naming.log.level"),
        Some("warn")
    );
    assert_eq!(properties.get("password"), Some("secret"));
    Ok(())
}

#[smol_potat::test]
async fn test_load_json_config() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("registry.json");
    async_fs::write(&path, r#"{"address": "127.0.0.1:8848"}"#).await?;

    let config = RegistryConfig::from_file(&path).await?;
    assert_eq!(config.address, "127.0.0.1:8848");
    assert!(config.username.is_none());
    assert!(config.extra.is_empty());
    Ok(())
}

#[smol_potat::test]
async fn test_load_rejects_empty_address() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("registry.yml");
    async_fs::write(&path, "address: \";\"\n").await?;

    let result = RegistryConfig::from_file(&path).await;
    assert!(matches!(result, Err(Error::Config(_))));
    Ok(())
}

#[smol_potat::test]
async fn test_load_missing_file() {
    let result = RegistryConfig::from_file("/nonexistent/registry.yaml").await;
    assert!(matches!(result, Err(Error::Io(_))));
}

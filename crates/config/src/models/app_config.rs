use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    catalog::CatalogConfig, dispatch::DispatchConfig, observability::ObservabilityConfig,
    retention::RetentionConfig, server::ServerConfig,
};
use crate::{validation::ConfigValidator, ConfigError, ConfigResult};

/// 未指定配置文件时依次查找的位置
const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/cds-proxy.toml",
    "cds-proxy.toml",
    "/etc/cds-proxy/config.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub dispatch: DispatchConfig,
    pub retention: RetentionConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 加载配置：TOML文件（可选）叠加 `CDS_PROXY_` 前缀的环境变量
    ///
    /// 环境变量用 `__` 分隔层级，例如 `CDS_PROXY_DISPATCH__MAX_WORKERS=20`。
    pub fn load(config_path: Option<&str>) -> ConfigResult<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(ConfigError::File(format!("配置文件不存在: {path}")));
            }
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|path| Path::new(path).exists())
        {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("CDS_PROXY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> ConfigResult<Self> {
        let config: AppConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl ConfigValidator for AppConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.server.validate()?;
        self.catalog.validate()?;
        self.dispatch.validate()?;
        self.retention.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

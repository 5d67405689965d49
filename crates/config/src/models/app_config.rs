use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    dispatch::DispatchConfig,
    logging::LogConfig,
    service_hours::{NoShowConfig, ServiceHoursConfig},
};
use crate::validation::ConfigValidator;
use crate::{ConfigError, ConfigResult};

pub const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/rideops.toml",
    "rideops.toml",
    "/etc/rideops/config.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_hours: ServiceHoursConfig,
    pub no_show: NoShowConfig,
    pub dispatch: DispatchConfig,
    pub logging: LogConfig,
}

impl AppConfig {
    /// 按 默认值 -> 配置文件 -> `RIDEOPS_*` 环境变量 的顺序合并配置
    ///
    /// 环境变量以双下划线分隔层级，例如 `RIDEOPS_NO_SHOW__SUSPENSION_THRESHOLD=3`。
    pub fn load(config_path: Option<&str>) -> ConfigResult<Self> {
        let mut builder =
            ConfigBuilder::builder().add_source(ConfigBuilder::try_from(&AppConfig::default())?);

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
            Environment::with_prefix("RIDEOPS")
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
        self.service_hours.validate()?;
        self.no_show.validate()?;
        self.dispatch.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

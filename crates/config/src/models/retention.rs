use crate::validation::{ConfigValidator, ValidationUtils};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 闲置批次回收配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    pub enabled: bool,
    /// 批次最后一次活动后保留的秒数
    pub idle_timeout_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            idle_timeout_seconds: 1800,
            sweep_interval_seconds: 60,
        }
    }
}

impl RetentionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

impl ConfigValidator for RetentionConfig {
    fn validate(&self) -> crate::ConfigResult<()> {
        if !self.enabled {
            return Ok(());
        }
        ValidationUtils::validate_timeout_seconds(
            self.idle_timeout_seconds,
            "retention.idle_timeout_seconds",
        )?;
        ValidationUtils::validate_timeout_seconds(
            self.sweep_interval_seconds,
            "retention.sweep_interval_seconds",
        )?;
        Ok(())
    }
}

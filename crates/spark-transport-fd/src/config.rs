use serde::Deserialize;
use thiserror::Error;

/// 缓冲字节数超过该阈值时暂停流式生产者。
pub const DEFAULT_HIGH_WATER_MARK: usize = 64 * 1024;

/// 已写出前缀超过该长度时物理压缩写缓冲。
pub const DEFAULT_COMPACTION_THRESHOLD: usize = 16 * 1024;

/// Descriptor 的缓冲与背压配置。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 把“暂停生产者的水位”与“写缓冲压缩阈值”显式配置化，避免调用方散落魔法数字；
/// - 每个 Descriptor 在构造时持有自己的配置副本，实例之间不共享任何可变默认值。
///
/// ## 契约说明（What）
/// - `high_water_mark`：未刷出字节数**严格大于**该值时暂停流式生产者，必须大于 0；
/// - `compaction_threshold`：已写出前缀**严格大于**该值时在下一次刷写前丢弃它，必须大于 0；
/// - 可通过 [`from_toml_str`](Self::from_toml_str) 从 TOML 片段加载，缺省字段取默认值。
///
/// ## 设计取舍与注意事项（Trade-offs）
/// - 恢复生产者只发生在缓冲完全排空时，没有单独的低水位；配置项因此只有一个水位；
/// - 压缩阈值过小会导致频繁搬移内存，过大会让已写出的前缀长期占用内存。
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DescriptorConfig {
    high_water_mark: usize,
    compaction_threshold: usize,
}

impl DescriptorConfig {
    /// 创建默认配置。
    pub const fn new() -> Self {
        Self {
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            compaction_threshold: DEFAULT_COMPACTION_THRESHOLD,
        }
    }

    pub fn with_high_water_mark(mut self, bytes: usize) -> Self {
        self.high_water_mark = bytes;
        self
    }

    pub fn with_compaction_threshold(mut self, bytes: usize) -> Self {
        self.compaction_threshold = bytes;
        self
    }

    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    pub fn compaction_threshold(&self) -> usize {
        self.compaction_threshold
    }

    /// 校验取值范围。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.high_water_mark == 0 {
            return Err(ConfigError::Invalid {
                field: "high_water_mark",
                reason: "must be greater than zero",
            });
        }
        if self.compaction_threshold == 0 {
            return Err(ConfigError::Invalid {
                field: "compaction_threshold",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }

    /// 解析并校验 TOML 片段，例如：
    ///
    /// ```
    /// use spark_transport_fd::DescriptorConfig;
    ///
    /// let config = DescriptorConfig::from_toml_str("high_water_mark = 1024").unwrap();
    /// assert_eq!(config.high_water_mark(), 1024);
    /// assert_eq!(config.compaction_threshold(), 16 * 1024);
    /// ```
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: DescriptorConfig = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// 配置加载错误。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML 语法错误、类型不匹配或出现未知字段。
    #[error("failed to parse descriptor config: {0}")]
    Parse(#[from] toml::de::Error),

    /// 字段取值越界。
    #[error("invalid descriptor config `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

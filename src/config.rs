use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use crate::engine_types::{CountError, CountResult, PrimeResult};
use crate::sieve_math::MAX_SEGMENT_LENGTH;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmallPrimesBound {
    /// `[0, SMALL_PRIMES_LIMIT)` の固定テーブル。2^63 未満の任意の区間を篩える
    Full,
    /// 区間の上端に合わせた最小テーブル `[0, ⌊√(end - 1)⌋ + 1)`
    Adaptive,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_max_segment_length")]
    pub max_segment_length: u64,
    #[serde(default = "default_small_primes")]
    pub small_primes: SmallPrimesBound,
    #[serde(default)]
    pub parallel: bool,
    /// 設定すると、物理メモリのこの割合に収まるようセグメント長を縮める
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_usage_percent: Option<f64>,
    #[serde(default = "default_output_format")]
    pub output_format: OutputFormat,
}

fn default_max_segment_length() -> u64 {
    MAX_SEGMENT_LENGTH
}

fn default_small_primes() -> SmallPrimesBound {
    SmallPrimesBound::Full
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Text
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_segment_length: default_max_segment_length(),
            small_primes: default_small_primes(),
            parallel: false,
            memory_usage_percent: None,
            output_format: default_output_format(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> CountResult<()> {
        if self.max_segment_length == 0 {
            return Err(CountError::InvalidConfig(
                "max_segment_length must be positive".into(),
            ));
        }
        if let Some(percent) = self.memory_usage_percent {
            if !(1.0..=100.0).contains(&percent) {
                return Err(CountError::InvalidConfig(format!(
                    "memory_usage_percent must be within 1..=100 (got {percent})"
                )));
            }
        }
        Ok(())
    }
}

pub const SETTINGS_FILE: &str = "settings.toml";

pub fn load_config<P: AsRef<Path>>(path: P) -> PrimeResult<Config> {
    let mut file = File::open(path.as_ref())?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    let cfg: Config = toml::from_str(&contents)?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_or_create_config<P: AsRef<Path>>(path: P) -> PrimeResult<Config> {
    let path = path.as_ref();
    if path.exists() {
        load_config(path)
    } else {
        let cfg = Config::default();
        save_config(&cfg, path)?;
        log::info!("Wrote default settings to {}", path.display());
        Ok(cfg)
    }
}

pub fn save_config<P: AsRef<Path>>(cfg: &Config, path: P) -> PrimeResult<()> {
    let toml_str = toml::to_string_pretty(cfg)?;
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    writer.write_all(toml_str.as_bytes())?;
    writer.flush()?;
    Ok(())
}

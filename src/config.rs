use serde_derive::Deserialize;
use serde_derive::Serialize;
use serde_json::{Map, Value};

use log::{error, warn};
use std::fs::File;
use std::io::prelude::*;

use crate::exception::Exception;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    port: u16,
    worker_threads: usize,
    local: bool,
    #[serde(default = "default_session_capacity")]
    session_capacity: usize,
    #[serde(default)]
    flash: FlashConfig,
}

/// flash 组件级别的默认选项，调用处给出的选项会覆盖这些值
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FlashConfig {
    #[serde(default = "default_key")]
    pub key: String,
    #[serde(default = "default_element")]
    pub element: String,
    #[serde(rename = "type", default = "default_type")]
    pub kind: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub clear: bool,
    #[serde(default = "default_duplicate")]
    pub duplicate: bool,
}

fn default_session_capacity() -> usize {
    1024
}

fn default_key() -> String {
    "flash".to_string()
}

fn default_element() -> String {
    "default".to_string()
}

fn default_type() -> String {
    "default".to_string()
}

fn default_duplicate() -> bool {
    true
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            key: default_key(),
            element: default_element(),
            kind: default_type(),
            params: Map::new(),
            clear: false,
            duplicate: default_duplicate(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            port: 7878,
            worker_threads: 0,
            local: true,
            session_capacity: default_session_capacity(),
            flash: FlashConfig::default(),
        }
    }

    pub fn from_toml(filename: &str) -> Result<Self, Exception> {
        let mut file = match File::open(filename) {
            Ok(f) => f,
            Err(e) => {
                error!("无法打开配置文件{}：{}", filename, e);
                return Err(Exception::ConfigUnreadable);
            }
        };
        let mut str_val = String::new();
        if let Err(e) = file.read_to_string(&mut str_val) {
            error!("读取配置文件{}失败：{}", filename, e);
            return Err(Exception::ConfigUnreadable);
        }

        let mut raw_config = match toml::from_str(&str_val) {
            Ok(t) => t,
            Err(e) => {
                error!("无法成功从配置文件构建配置对象，使用默认配置：{}", e);
                Config::new()
            }
        };
        if raw_config.worker_threads == 0 {
            raw_config.worker_threads = num_cpus::get();
        }
        if raw_config.session_capacity == 0 {
            warn!("session_capacity被设置为0，会话池不能为空，因此该值将被改为{}。", default_session_capacity());
            raw_config.session_capacity = default_session_capacity();
        }
        Ok(raw_config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn session_capacity(&self) -> usize {
        self.session_capacity
    }

    pub fn flash(&self) -> &FlashConfig {
        &self.flash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_flash_defaults() {
        let flash = FlashConfig::default();
        assert_eq!(flash.key, "flash");
        assert_eq!(flash.element, "default");
        assert_eq!(flash.kind, "default");
        assert!(flash.params.is_empty());
        assert!(!flash.clear);
        assert!(flash.duplicate);
    }

    #[test]
    fn test_from_toml_full() {
        let file = write_config(
            r#"
port = 8080
worker_threads = 2
local = false
session_capacity = 16

[flash]
key = "alerts"
type = "info"
duplicate = false

[flash.params]
class = "banner"
"#,
        );
        let config = Config::from_toml(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.port(), 8080);
        assert_eq!(config.worker_threads(), 2);
        assert!(!config.local());
        assert_eq!(config.session_capacity(), 16);
        assert_eq!(config.flash().key, "alerts");
        assert_eq!(config.flash().kind, "info");
        assert_eq!(config.flash().element, "default");
        assert!(!config.flash().duplicate);
        assert_eq!(config.flash().params["class"], "banner");
    }

    #[test]
    fn test_from_toml_without_flash_table() {
        let file = write_config("port = 7878\nworker_threads = 0\nlocal = true\n");
        let config = Config::from_toml(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.flash(), &FlashConfig::default());
        assert_eq!(config.session_capacity(), 1024);
        assert!(config.worker_threads() > 0);
    }

    #[test]
    fn test_from_toml_invalid_falls_back() {
        let file = write_config("port = \"not a number\"");
        let config = Config::from_toml(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.port(), 7878);
    }

    #[test]
    fn test_from_toml_missing_file() {
        let result = Config::from_toml("/nonexistent/webflash.toml");
        assert_eq!(result.unwrap_err(), Exception::ConfigUnreadable);
    }

    #[test]
    fn test_zero_session_capacity_is_replaced() {
        let file = write_config("port = 1\nworker_threads = 1\nlocal = true\nsession_capacity = 0\n");
        let config = Config::from_toml(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.session_capacity(), 1024);
    }
}

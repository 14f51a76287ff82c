//! 配置管理模块
//!
//! 提供播放器配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (config.toml)
//!
//! ```toml
//! [window]
//! width = 640
//! height = 480
//! title = "Vector Player"
//! resizable = true
//!
//! [graphics]
//! backend = "auto"    # auto, default, opengl, metal
//! vsync = true
//!
//! [render]
//! clear_color = 0xFF333333
//! wireframe = false
//! fill_rule = "nonzero"
//! padding = 0.8
//!
//! [content]
//! path = "assets/demo.toml"
//!
//! [logging]
//! level = "info"      # trace, debug, info, warn, error
//! file_output = false
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::error::{ConfigError, PlayerError, Result};
use crate::engine::{FillRule, FrameOptions, LoadAction};
use crate::gfx::{detect_best_backend, BackendKind};

/// 播放器配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 窗口配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 图形配置
    #[serde(default)]
    pub graphics: GraphicsConfig,

    /// 每帧渲染参数
    #[serde(default)]
    pub render: RenderConfig,

    /// 动画内容
    #[serde(default)]
    pub content: ContentConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_resizable")]
    pub resizable: bool,
}

/// 图形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// 后端选择方式
    #[serde(default)]
    pub backend: BackendSelection,

    /// 垂直同步
    #[serde(default = "default_vsync")]
    pub vsync: bool,
}

/// 后端选择
///
/// 三种明确的选择方式，不再依赖“是否传了任何命令行参数”这类隐式条件。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BackendSelection {
    /// 明确指定的后端
    Explicit(BackendKind),
    /// 按固定优先级自动检测（原生 GPU API 优先）
    #[default]
    AutoDetect,
    /// 当前构建平台编译进来的默认后端
    PlatformDefault,
}

/// 每帧渲染参数，最终转换为 `FrameDescriptor`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// 清屏颜色（32 位 ARGB）
    #[serde(default = "default_clear_color")]
    pub clear_color: u32,

    /// 每帧开始时是否清屏
    #[serde(default = "default_true")]
    pub clear: bool,

    #[serde(default)]
    pub wireframe: bool,

    #[serde(default = "default_true")]
    pub fills: bool,

    #[serde(default = "default_true")]
    pub strokes: bool,

    #[serde(default = "default_true")]
    pub raster_ordering: bool,

    #[serde(default)]
    pub fill_rule: FillRule,

    /// 内容占窗口的比例
    #[serde(default = "default_padding")]
    pub padding: f32,
}

/// 动画内容配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default = "default_content_path")]
    pub path: String,

    /// 启动时处于暂停状态
    #[serde(default)]
    pub start_paused: bool,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    #[serde(default = "default_file_output")]
    pub file_output: bool,

    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

fn default_width() -> u32 { 640 }
fn default_height() -> u32 { 480 }
fn default_title() -> String { "Vector Player".to_string() }
fn default_resizable() -> bool { true }
fn default_vsync() -> bool { true }
fn default_true() -> bool { true }
fn default_clear_color() -> u32 { 0xFF33_3333 }
fn default_padding() -> f32 { 0.8 }
fn default_content_path() -> String { "assets/demo.toml".to_string() }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "vector_player.log".to_string() }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
            resizable: default_resizable(),
        }
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            backend: BackendSelection::default(),
            vsync: default_vsync(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clear_color: default_clear_color(),
            clear: true,
            wireframe: false,
            fills: true,
            strokes: true,
            raster_ordering: true,
            fill_rule: FillRule::default(),
            padding: default_padding(),
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            path: default_content_path(),
            start_paused: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// 从配置文件加载
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::FileNotFound(path_str.clone()).into(),
            _ => PlayerError::Io(e),
        })?;

        Self::from_toml_str(&contents)
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，文件不存在时使用默认配置
    ///
    /// 文件存在但无法读取或解析时返回错误，不会丢弃用户的其他设置。
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::from_file(path) {
            Err(PlayerError::Config(ConfigError::FileNotFound(_))) => Ok(Self::default()),
            other => other,
        }
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--backend <opengl|metal>` / `--backend=<value>`：明确指定后端，
    ///   无法识别的值回退到自动检测
    /// - `--width <value>` / `--height <value>`：窗口尺寸
    /// - `--content <path>`：动画文件
    /// - `--paused`：以暂停状态启动
    ///
    /// 返回解析过程中产生的提示。此时日志系统通常还没有初始化，
    /// 由调用者在 `init_logger` 之后输出。
    pub fn apply_args<I>(&mut self, args: I) -> Vec<ArgNotice>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();
        let mut notices = Vec::new();

        if let Some(value) = option_value(&args, "--backend") {
            self.graphics.backend = match value.parse::<BackendKind>() {
                Ok(kind) => BackendSelection::Explicit(kind),
                Err(_) => {
                    notices.push(ArgNotice::UnknownBackend(value));
                    BackendSelection::AutoDetect
                }
            };
        }

        if let Some(width) = option_value(&args, "--width").and_then(|v| v.parse().ok()) {
            self.window.width = width;
        }

        if let Some(height) = option_value(&args, "--height").and_then(|v| v.parse().ok()) {
            self.window.height = height;
        }

        if let Some(path) = option_value(&args, "--content") {
            self.content.path = path;
        }

        if args.iter().any(|a| a == "--paused") {
            self.content.start_paused = true;
        }

        notices
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window.width/height".to_string(),
                reason: "Window dimensions must be greater than 0".to_string(),
            }
            .into());
        }

        if !(self.render.padding > 0.0 && self.render.padding <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: "render.padding".to_string(),
                reason: "Padding must be in (0, 1]".to_string(),
            }
            .into());
        }

        if self.content.path.trim().is_empty() {
            return Err(ConfigError::MissingField("content.path".to_string()).into());
        }

        Ok(())
    }
}

/// 命令行解析中需要告知用户的情况
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgNotice {
    /// `--backend` 的值无法识别，已回退到自动检测
    UnknownBackend(String),
}

impl fmt::Display for ArgNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgNotice::UnknownBackend(value) => write!(
                f,
                "unrecognized --backend value '{}', falling back to auto-detection",
                value
            ),
        }
    }
}

/// 读取 `--name value` 或 `--name=value`
fn option_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    for (idx, arg) in args.iter().enumerate() {
        if arg == name {
            return args.get(idx + 1).cloned();
        }
        if let Some(value) = arg.strip_prefix(&prefix) {
            return Some(value.to_string());
        }
    }
    None
}

impl BackendSelection {
    /// 解析为具体的后端类型
    pub fn resolve(self) -> BackendKind {
        match self {
            BackendSelection::Explicit(kind) => kind,
            BackendSelection::AutoDetect => detect_best_backend(),
            BackendSelection::PlatformDefault => BackendKind::platform_default(),
        }
    }
}

impl fmt::Display for BackendSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendSelection::Explicit(kind) => write!(f, "{}", kind.config_name()),
            BackendSelection::AutoDetect => f.write_str("auto"),
            BackendSelection::PlatformDefault => f.write_str("default"),
        }
    }
}

impl FromStr for BackendSelection {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(BackendSelection::AutoDetect),
            "default" => Ok(BackendSelection::PlatformDefault),
            other => other
                .parse::<BackendKind>()
                .map(BackendSelection::Explicit)
                .map_err(|_| ConfigError::InvalidValue {
                    field: "graphics.backend".to_string(),
                    reason: format!("unknown backend '{}'", s),
                }),
        }
    }
}

impl TryFrom<String> for BackendSelection {
    type Error = ConfigError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BackendSelection> for String {
    fn from(value: BackendSelection) -> Self {
        value.to_string()
    }
}

impl RenderConfig {
    /// 转换为后端使用的帧参数
    pub fn frame_options(&self) -> FrameOptions {
        FrameOptions {
            load_action: if self.clear {
                LoadAction::Clear
            } else {
                LoadAction::PreserveRenderTarget
            },
            clear_color: self.clear_color,
            wireframe: self.wireframe,
            disable_fills: !self.fills,
            disable_strokes: !self.strokes,
            disable_raster_ordering: !self.raster_ordering,
            fill_rule: self.fill_rule,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 480);
        assert_eq!(config.graphics.backend, BackendSelection::AutoDetect);
        assert_eq!(config.render.clear_color, 0xFF33_3333);
        assert!((config.render.padding - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.window.width = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.render.padding = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.content.path = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backend_arg_explicit() {
        let mut config = Config::default();
        config.apply_args(["vector_player", "--backend", "opengl"]);
        assert_eq!(
            config.graphics.backend,
            BackendSelection::Explicit(BackendKind::OpenGl)
        );

        let mut config = Config::default();
        config.apply_args(["vector_player", "--backend=Metal"]);
        assert_eq!(
            config.graphics.backend,
            BackendSelection::Explicit(BackendKind::Metal)
        );
    }

    #[test]
    fn test_backend_arg_unrecognized_falls_back_to_auto() {
        let mut config = Config::default();
        config.graphics.backend = BackendSelection::PlatformDefault;
        config.apply_args(["vector_player", "--backend", "vulkan"]);
        assert_eq!(config.graphics.backend, BackendSelection::AutoDetect);
    }

    #[test]
    fn test_unrecognized_backend_is_reported_to_caller() {
        let mut config = Config::default();
        let notices = config.apply_args(["vector_player", "--backend", "vulkan"]);
        assert_eq!(notices, vec![ArgNotice::UnknownBackend("vulkan".to_string())]);
        assert!(notices[0].to_string().contains("vulkan"));

        let notices = config.apply_args(["vector_player", "--backend=opengl", "--paused"]);
        assert!(notices.is_empty());
    }

    #[test]
    fn test_unrelated_args_keep_selection() {
        let mut config = Config::default();
        config.graphics.backend = BackendSelection::PlatformDefault;
        config.apply_args(["vector_player", "--width", "1024", "--height", "768", "--paused"]);
        assert_eq!(config.graphics.backend, BackendSelection::PlatformDefault);
        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 768);
        assert!(config.content.start_paused);
    }

    #[test]
    fn test_selection_resolves() {
        assert_eq!(
            BackendSelection::Explicit(BackendKind::Metal).resolve(),
            BackendKind::Metal
        );
        assert_eq!(BackendSelection::AutoDetect.resolve(), detect_best_backend());
        assert_eq!(
            BackendSelection::PlatformDefault.resolve(),
            BackendKind::platform_default()
        );
    }

    #[test]
    fn test_parse_toml_sections() {
        let config = Config::from_toml_str(
            r#"
            [graphics]
            backend = "opengl"

            [render]
            clear_color = 0xFF000000
            fills = false
            fill_rule = "evenodd"

            [content]
            path = "anim.toml"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.graphics.backend,
            BackendSelection::Explicit(BackendKind::OpenGl)
        );
        assert_eq!(config.window.width, 640);
        assert_eq!(config.content.path, "anim.toml");

        let options = config.render.frame_options();
        assert_eq!(options.clear_color, 0xFF00_0000);
        assert!(options.disable_fills);
        assert!(!options.disable_strokes);
        assert_eq!(options.fill_rule, FillRule::EvenOdd);
        assert_eq!(options.load_action, LoadAction::Clear);
    }

    #[test]
    fn test_bundled_config_file() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml");
        let config = Config::from_file(path).unwrap();
        assert_eq!(config.graphics.backend, BackendSelection::AutoDetect);
        assert_eq!(config.content.path, "assets/demo.toml");
        assert!(config.validate().is_ok());
    }

    fn temp_config(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "vector_player_{}_{}.toml",
            name,
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("vector_player_does_not_exist.toml");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.window.width, 640);
        assert_eq!(config.graphics.backend, BackendSelection::AutoDetect);
    }

    #[test]
    fn test_load_keeps_user_settings() {
        let path = temp_config(
            "valid",
            "[window]\nwidth = 1024\n\n[render]\npadding = 0.5\n",
        );
        let config = Config::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.window.width, 1024);
        assert!((config.render.padding - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_load_invalid_file_is_error_not_defaults() {
        let path = temp_config(
            "invalid",
            "[window]\nwidth = 1024\n\n[graphics]\nbackend = \"vulkan\"\n\n[render]\npadding = 0.5\n",
        );
        let result = Config::load(&path);
        std::fs::remove_file(&path).ok();

        match result {
            Err(PlayerError::Config(ConfigError::ParseError(message))) => {
                assert!(message.contains("vulkan"));
            }
            other => panic!("expected a parse error, got {:?}", other.map(|c| c.window.width)),
        }
    }

    #[test]
    fn test_unknown_backend_in_file_is_error() {
        let result = Config::from_toml_str("[graphics]\nbackend = \"dx12\"\n");
        assert!(result.is_err());
    }
}

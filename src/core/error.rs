//! 错误处理模块
//!
//! 定义了播放器中使用的统一错误类型。
//!
//! # 错误分类
//!
//! - 致命错误（启动阶段）：后端与平台不匹配、上下文创建失败、内容加载失败
//! - 可恢复情况：drawable 获取失败不是错误，而是 `FrameStatus::Skipped`，
//!   协调器跳过本帧并在下一次迭代重试

use std::fmt;
use std::path::PathBuf;

/// 播放器统一的 Result 类型
pub type Result<T> = std::result::Result<T, PlayerError>;

/// 播放器的错误类型
#[derive(Debug)]
pub enum PlayerError {
    /// 配置错误
    Config(ConfigError),

    /// 图形 API 错误
    Graphics(GraphicsError),

    /// 动画内容加载错误
    Content(ContentError),

    /// IO 错误
    Io(std::io::Error),

    /// 日志系统错误
    Log(String),

    /// 初始化错误
    Initialization(String),

    /// 运行时错误
    Runtime(String),
}

/// 配置相关的错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),

    /// 配置文件解析失败
    ParseError(String),

    /// 配置项缺失
    MissingField(String),

    /// 配置值无效
    InvalidValue { field: String, reason: String },
}

/// 图形 API 相关的错误
#[derive(Debug)]
pub enum GraphicsError {
    /// 请求的后端在当前构建平台上不可用
    PlatformMismatch {
        requested: &'static str,
        platform: &'static str,
    },

    /// 原生上下文 / 设备创建失败
    ContextCreation(String),

    /// 表面（surface / layer）相关失败
    SurfaceAcquire(String),

    /// 窗口在限定次数的事件泵送后仍未就绪
    WindowNotSettled { attempts: u32 },

    /// begin_frame / end_frame 调用顺序错误
    FrameOrder(String),

    /// flush 使用的渲染目标尺寸与当前窗口尺寸不一致
    StaleRenderTarget {
        expected: (u32, u32),
        flushed: (u32, u32),
    },

    /// 资源创建失败
    ResourceCreation(String),

    /// 渲染命令执行失败
    CommandExecution(String),
}

/// 动画内容加载相关的错误
#[derive(Debug)]
pub enum ContentError {
    /// 文件不存在或不可读
    FileNotFound(PathBuf),

    /// 解析失败
    ParseError(String),

    /// 内容语义无效（尺寸为零、关键帧乱序等）
    InvalidContent(String),
}

impl fmt::Display for PlayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerError::Config(e) => write!(f, "Configuration error: {}", e),
            PlayerError::Graphics(e) => write!(f, "Graphics error: {}", e),
            PlayerError::Content(e) => write!(f, "Content error: {}", e),
            PlayerError::Io(e) => write!(f, "IO error: {}", e),
            PlayerError::Log(msg) => write!(f, "Log error: {}", msg),
            PlayerError::Initialization(msg) => write!(f, "Initialization error: {}", msg),
            PlayerError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::MissingField(field) => write!(f, "Missing required field: {}", field),
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsError::PlatformMismatch { requested, platform } => write!(
                f,
                "{} backend is not available on this build (platform: {})",
                requested, platform
            ),
            GraphicsError::ContextCreation(msg) => write!(f, "Context creation failed: {}", msg),
            GraphicsError::SurfaceAcquire(msg) => write!(f, "Surface error: {}", msg),
            GraphicsError::WindowNotSettled { attempts } => write!(
                f,
                "Window did not settle after {} event pump rounds",
                attempts
            ),
            GraphicsError::FrameOrder(msg) => write!(f, "Frame order violated: {}", msg),
            GraphicsError::StaleRenderTarget { expected, flushed } => write!(
                f,
                "Render target is stale: flushed {}x{}, window is {}x{}",
                flushed.0, flushed.1, expected.0, expected.1
            ),
            GraphicsError::ResourceCreation(msg) => write!(f, "Resource creation failed: {}", msg),
            GraphicsError::CommandExecution(msg) => write!(f, "Command execution failed: {}", msg),
        }
    }
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentError::FileNotFound(path) => {
                write!(f, "Animation file not readable: {}", path.display())
            }
            ContentError::ParseError(msg) => write!(f, "Failed to parse animation: {}", msg),
            ContentError::InvalidContent(msg) => write!(f, "Invalid animation content: {}", msg),
        }
    }
}

impl std::error::Error for PlayerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlayerError::Io(e) => Some(e),
            PlayerError::Config(e) => Some(e),
            PlayerError::Graphics(e) => Some(e),
            PlayerError::Content(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for GraphicsError {}
impl std::error::Error for ContentError {}

impl From<std::io::Error> for PlayerError {
    fn from(err: std::io::Error) -> Self {
        PlayerError::Io(err)
    }
}

impl From<ConfigError> for PlayerError {
    fn from(err: ConfigError) -> Self {
        PlayerError::Config(err)
    }
}

impl From<GraphicsError> for PlayerError {
    fn from(err: GraphicsError) -> Self {
        PlayerError::Graphics(err)
    }
}

impl From<ContentError> for PlayerError {
    fn from(err: ContentError) -> Self {
        PlayerError::Content(err)
    }
}

impl PlayerError {
    /// 是否为“请求的后端在此平台不可用”
    pub fn is_platform_mismatch(&self) -> bool {
        matches!(self, PlayerError::Graphics(GraphicsError::PlatformMismatch { .. }))
    }
}

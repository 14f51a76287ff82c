//! 核心功能模块
//!
//! 与具体图形 API 无关的基础设施：配置、日志、错误处理、二维数学和帧计时。
//!
//! # 模块组织
//!
//! - `config`：配置管理，支持配置文件和命令行覆盖
//! - `log`：基于 tracing 的日志系统
//! - `error`：统一的错误类型
//! - `math`：二维仿射变换与内容适配计算
//! - `clock`：帧间隔计时

pub mod clock;
pub mod config;
pub mod error;
pub mod log;
pub mod math;

pub use clock::{FrameClock, FrameTime};
pub use config::{ArgNotice, BackendSelection, Config};
pub use error::{ContentError, GraphicsError, PlayerError, Result};
pub use math::{FitTransform, Matrix3};

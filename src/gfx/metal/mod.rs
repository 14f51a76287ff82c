//! Metal 图形后端模块
//!
//! 基于 Apple Metal API，仅在 macOS 平台上编译。设备、命令队列和
//! `CAMetalLayer` 由 `context` 创建，后端只依赖其中的 trait。

pub mod backend;
pub mod context;
pub mod layer;

pub use backend::MetalBackend;
pub use context::{LayerLoader, LayerPresenter, MetalLoader, MetalPresenter, MetalSetup};

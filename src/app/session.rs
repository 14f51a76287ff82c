//! 帧生命周期协调器
//!
//! `Session` 独占持有后端、渲染器和场景，按以下顺序驱动它们：
//!
//! ```text
//! Uninitialized ──initialize──► Initialized ──shutdown──► ShuttingDown ──► Terminated
//!                                 │    ▲
//!                                 └────┘ resize / render_frame
//! ```
//!
//! 每帧：推进动画时间（暂停时跳过）→ begin_frame → 以适配窗口的变换绘制场景 → end_frame。
//! 关闭顺序：场景 → 渲染器 → 后端。

use crate::core::error::{GraphicsError, PlayerError, Result};
use crate::core::math::FitTransform;
use crate::engine::{Factory, Renderer, Scene};
use crate::gfx::{Backend, FrameStatus, GraphicsBackend, NativeWindow, SkipReason};
use winit::keyboard::KeyCode;

use super::event::{AppEvent, LoopAction};
use super::pause::PauseSwitch;

/// 默认内容占窗口的比例
pub const DEFAULT_PADDING: f32 = 0.8;

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initialized,
    ShuttingDown,
    Terminated,
}

/// 帧统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub rendered: u64,
    pub skipped: u64,
}

/// 一次播放会话
pub struct Session<B: GraphicsBackend = Backend> {
    // 字段顺序即析构顺序
    scene: Option<Box<dyn Scene>>,
    renderer: Option<Box<dyn Renderer>>,
    backend: B,
    state: SessionState,
    pause: PauseSwitch,
    width: u32,
    height: u32,
    padding: f32,
    stats: FrameStats,
}

impl<B: GraphicsBackend> Session<B> {
    pub fn new(backend: B) -> Self {
        Self {
            scene: None,
            renderer: None,
            backend,
            state: SessionState::Uninitialized,
            pause: PauseSwitch::default(),
            width: 0,
            height: 0,
            padding: DEFAULT_PADDING,
            stats: FrameStats::default(),
        }
    }

    pub fn with_padding(mut self, padding: f32) -> Self {
        self.padding = padding;
        self
    }

    /// 使用外部共享的暂停开关
    pub fn with_pause_switch(mut self, pause: PauseSwitch) -> Self {
        self.pause = pause;
        self
    }

    /// 初始化后端、加载内容、创建渲染器
    ///
    /// 任何一步失败都会释放已经创建的资源，会话保持 `Uninitialized`。
    pub fn initialize<F>(
        &mut self,
        window: &dyn NativeWindow,
        width: u32,
        height: u32,
        load_content: F,
    ) -> Result<()>
    where
        F: FnOnce(&dyn Factory) -> Result<Box<dyn Scene>>,
    {
        match self.state {
            SessionState::Initialized => return Ok(()),
            SessionState::Uninitialized => {}
            state => {
                return Err(PlayerError::Runtime(format!(
                    "cannot initialize a session in state {:?}",
                    state
                )))
            }
        }

        if self.backend.requires_settled_window() {
            let (w, h) = window.surface_size();
            if w == 0 || h == 0 {
                return Err(GraphicsError::WindowNotSettled { attempts: 0 }.into());
            }
        }

        crate::app_info!(
            backend = self.backend.backend_name(),
            width,
            height,
            "Initializing session"
        );

        if let Err(e) = self.setup(window, width, height, load_content) {
            self.scene = None;
            self.renderer = None;
            self.backend.shutdown();
            crate::app_error!(error = %e, "Session initialization failed");
            return Err(e);
        }

        self.width = width;
        self.height = height;
        self.state = SessionState::Initialized;
        Ok(())
    }

    fn setup<F>(&mut self, window: &dyn NativeWindow, width: u32, height: u32, load_content: F) -> Result<()>
    where
        F: FnOnce(&dyn Factory) -> Result<Box<dyn Scene>>,
    {
        self.backend.initialize(window, width, height)?;

        let factory = self
            .backend
            .create_factory()
            .ok_or_else(|| PlayerError::Initialization("backend exposes no factory".to_string()))?;
        let scene = load_content(factory)?;
        crate::app_info!(
            scene = scene.name(),
            width = scene.bounds().0,
            height = scene.bounds().1,
            "Content loaded"
        );

        let renderer = self
            .backend
            .create_renderer()
            .ok_or_else(|| PlayerError::Initialization("backend cannot create a renderer".to_string()))?;

        self.scene = Some(scene);
        self.renderer = Some(renderer);
        Ok(())
    }

    /// 处理一个事件，返回主循环接下来的动作
    pub fn handle_event(&mut self, event: AppEvent) -> LoopAction {
        match event {
            AppEvent::Quit => LoopAction::Exit,
            AppEvent::Resized { width, height } => {
                self.resize(width, height);
                LoopAction::Continue
            }
            AppEvent::KeyDown(KeyCode::Escape) => LoopAction::Exit,
            AppEvent::KeyDown(KeyCode::Space) | AppEvent::KeyDown(KeyCode::KeyP) => {
                let paused = self.pause.toggle();
                crate::app_info!(paused, "Pause toggled");
                LoopAction::Continue
            }
            AppEvent::KeyDown(_) => LoopAction::Continue,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.backend.resize(width, height);
        tracing::debug!(width, height, "Session resized");
    }

    /// 渲染一帧
    ///
    /// 后端跳过本帧时返回 `Ok(FrameStatus::Skipped(..))`，调用者下一次迭代重试即可。
    pub fn render_frame(&mut self, elapsed_seconds: f32) -> Result<FrameStatus> {
        if self.state != SessionState::Initialized {
            return Ok(FrameStatus::Skipped(SkipReason::NotInitialized));
        }
        let (Some(scene), Some(renderer)) = (self.scene.as_mut(), self.renderer.as_mut()) else {
            return Ok(FrameStatus::Skipped(SkipReason::NotInitialized));
        };

        if !self.pause.is_paused() {
            scene.advance(elapsed_seconds);
        }

        let status = self.backend.begin_frame();
        if let FrameStatus::Skipped(reason) = status {
            self.stats.skipped += 1;
            tracing::trace!(?reason, "Frame skipped");
            return Ok(status);
        }

        let fit = FitTransform::compute(
            scene.bounds(),
            (self.width as f32, self.height as f32),
            self.padding,
        );
        renderer.save();
        renderer.transform(&fit.matrix());
        scene.draw(renderer.as_mut());
        renderer.restore();

        self.backend.end_frame()?;
        self.stats.rendered += 1;
        Ok(FrameStatus::Ready)
    }

    /// 按 场景 → 渲染器 → 后端 的顺序释放；可重复调用
    pub fn shutdown(&mut self) {
        if self.state == SessionState::Terminated {
            return;
        }
        self.state = SessionState::ShuttingDown;

        self.scene = None;
        self.renderer = None;
        self.backend.shutdown();

        self.state = SessionState::Terminated;
        crate::app_info!(
            rendered = self.stats.rendered,
            skipped = self.stats.skipped,
            "Session shut down"
        );
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn scene(&self) -> Option<&dyn Scene> {
        self.scene.as_deref()
    }

    pub fn pause_switch(&self) -> &PauseSwitch {
        &self.pause
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// 当前窗口尺寸下的适配变换
    pub fn fit_transform(&self) -> Option<FitTransform> {
        self.scene.as_ref().map(|scene| {
            FitTransform::compute(
                scene.bounds(),
                (self.width as f32, self.height as f32),
                self.padding,
            )
        })
    }
}

impl<B: GraphicsBackend> Drop for Session<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// 泵送平台事件直到窗口报告非零尺寸
///
/// 至少泵送一次，最多 `max_attempts` 次；返回实际泵送的次数。
pub fn wait_for_settled_window<W, F>(window: &W, mut pump: F, max_attempts: u32) -> Result<u32>
where
    W: NativeWindow + ?Sized,
    F: FnMut(),
{
    let attempts = max_attempts.max(1);
    for attempt in 1..=attempts {
        pump();
        let (width, height) = window.surface_size();
        if width > 0 && height > 0 {
            tracing::debug!(attempt, width, height, "Window settled");
            return Ok(attempt);
        }
    }
    Err(GraphicsError::WindowNotSettled { attempts }.into())
}

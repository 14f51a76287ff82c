//! Vector Player - 矢量动画播放器
//!
//! 按平台选择图形后端（macOS 上为 Metal，其他平台为 OpenGL），
//! 在窗口中循环播放一个动画文件。
//!
//! # 使用方法
//!
//! ```bash
//! # 使用配置文件（config.toml）
//! cargo run
//!
//! # 指定后端和内容
//! cargo run -- --backend opengl --content assets/demo.toml
//! ```
//!
//! # 按键
//!
//! - `Space` / `P`：暂停 / 继续（只停止动画时间，画面继续渲染）
//! - `Escape`：退出

use std::time::Duration;

use anyhow::Context;
use winit::dpi::LogicalSize;
use winit::event::Event;
use winit::event_loop::EventLoop;
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::WindowBuilder;

use vector_player::app::{
    global_pause_switch, wait_for_settled_window, AppEvent, LoopAction, Session,
};
use vector_player::core::{log, Config, FrameClock};
use vector_player::engine::{Artboard, Scene};
use vector_player::gfx::{create_graphics_backend, GraphicsBackend, NativeWindow};
use vector_player::{app_error, app_info, app_warn};

/// 等待窗口就绪时每次泵送的超时
const SETTLE_PUMP_TIMEOUT: Duration = Duration::from_millis(16);
/// 等待窗口就绪的最大泵送次数
const SETTLE_MAX_ATTEMPTS: u32 = 60;

fn main() {
    if let Err(e) = run() {
        app_error!(error = %format!("{:#}", e), "Fatal error");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// # 初始化流程
///
/// 1. 加载配置并应用命令行参数（配置文件缺失时用默认值，内容无效时失败）
/// 2. 初始化日志系统，输出命令行解析时的提示
/// 3. 按配置选择并创建后端（平台不支持时直接失败）
/// 4. 创建窗口；后端需要时先泵送事件直到窗口就绪
/// 5. 初始化会话（后端、内容、渲染器）
/// 6. 主循环：泵送事件 → 处理事件 → 渲染一帧
/// 7. 按顺序关闭：会话 → 窗口 → 事件循环
fn run() -> anyhow::Result<()> {
    let mut config = Config::load("config.toml").context("failed to load config.toml")?;
    let notices = config.apply_args(std::env::args());
    config.validate().context("invalid configuration")?;

    let log_file = if config.logging.file_output {
        Some(config.logging.log_file.as_str())
    } else {
        None
    };
    log::init_logger(config.logging.level, config.logging.file_output, log_file)
        .context("failed to initialize logging")?;
    app_info!(version = env!("CARGO_PKG_VERSION"), "Vector Player starting");
    for notice in &notices {
        app_warn!(%notice, "Command line");
    }

    let kind = config.graphics.backend.resolve();
    app_info!(
        selection = %config.graphics.backend,
        backend = kind.name(),
        width = config.window.width,
        height = config.window.height,
        "Graphics configuration"
    );

    let mut backend = create_graphics_backend(kind).context("failed to create graphics backend")?;
    backend.set_vsync(config.graphics.vsync);
    backend.set_frame_options(config.render.frame_options());

    let mut event_loop = EventLoop::new().context("failed to create event loop")?;
    let window = WindowBuilder::new()
        .with_title(&config.window.title)
        .with_inner_size(LogicalSize::new(config.window.width, config.window.height))
        .with_resizable(config.window.resizable)
        .build(&event_loop)
        .context("failed to create window")?;

    if backend.requires_settled_window() {
        let attempts = wait_for_settled_window(
            &window,
            || {
                event_loop.pump_events(Some(SETTLE_PUMP_TIMEOUT), |_, _| {});
            },
            SETTLE_MAX_ATTEMPTS,
        )
        .context("window did not become ready")?;
        tracing::debug!(attempts, "Window ready for surface attachment");
    }

    let (width, height) = match window.surface_size() {
        (0, _) | (_, 0) => (config.window.width, config.window.height),
        size => size,
    };

    let pause = global_pause_switch().clone();
    pause.set_paused(config.content.start_paused);

    let mut session = Session::new(backend)
        .with_padding(config.render.padding)
        .with_pause_switch(pause);

    let content_path = config.content.path.clone();
    session
        .initialize(&window, width, height, |factory| {
            let artboard = Artboard::load(&content_path, factory)?;
            Ok(Box::new(artboard) as Box<dyn Scene>)
        })
        .with_context(|| format!("failed to start playback of '{}'", content_path))?;

    app_info!("Entering main loop");
    let result = main_loop(&mut event_loop, &mut session);

    session.shutdown();
    drop(window);
    drop(event_loop);
    app_info!("Vector Player exited");
    result
}

fn main_loop<B: GraphicsBackend>(
    event_loop: &mut EventLoop<()>,
    session: &mut Session<B>,
) -> anyhow::Result<()> {
    let mut clock = FrameClock::new();
    let mut pending = Vec::new();

    loop {
        let status = event_loop.pump_events(Some(Duration::ZERO), |event, _| {
            if let Event::WindowEvent { event, .. } = &event {
                if let Some(app_event) = AppEvent::from_window_event(event) {
                    pending.push(app_event);
                }
            }
        });
        if let PumpStatus::Exit(code) = status {
            app_warn!(code, "Event loop exited");
            return Ok(());
        }

        // 事件只在迭代边界处理
        for event in pending.drain(..) {
            if session.handle_event(event) == LoopAction::Exit {
                app_info!("Exit requested");
                return Ok(());
            }
        }

        let frame = clock.tick();
        session
            .render_frame(frame.dt)
            .with_context(|| format!("frame {} failed", frame.frame_index))?;
    }
}

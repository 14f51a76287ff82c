//! OpenGL 渲染上下文（glow）

use std::sync::Arc;

use glow::HasContext;
use lyon::path::Path;

use super::frame::{argb_to_rgba, FlushReceipt, FrameDescriptor, LoadAction, RenderTarget};
use super::paint::{Paint, RenderPaint, RenderPath};
use super::recorder::{FrameRecorder, PathFactory};
use super::tessellate::{ColorVertex, MeshBuilder, Topology};
use super::{Factory, RenderContext, Renderer};
use crate::core::error::{GraphicsError, Result};

const VERTEX_SHADER: &str = include_str!("shaders/solid.vert.glsl");
const FRAGMENT_SHADER: &str = include_str!("shaders/solid.frag.glsl");

type GlProgram = <glow::Context as HasContext>::Program;
type GlVertexArray = <glow::Context as HasContext>::VertexArray;
type GlBuffer = <glow::Context as HasContext>::Buffer;
type GlUniformLocation = <glow::Context as HasContext>::UniformLocation;

/// 上下文使用的 GL 配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlProfile {
    /// 桌面 OpenGL 3.3 core
    Core33,
    /// OpenGL ES 3.0（Android / iOS / Web）
    Es30,
}

impl GlProfile {
    /// 当前构建目标使用的配置
    pub fn for_target() -> Self {
        if cfg!(any(target_os = "android", target_os = "ios", target_arch = "wasm32")) {
            GlProfile::Es30
        } else {
            GlProfile::Core33
        }
    }

    pub fn version(&self) -> (u8, u8) {
        match self {
            GlProfile::Core33 => (3, 3),
            GlProfile::Es30 => (3, 0),
        }
    }

    pub fn is_es(&self) -> bool {
        matches!(self, GlProfile::Es30)
    }

    fn shader_header(&self) -> &'static str {
        match self {
            GlProfile::Core33 => "#version 330 core\n",
            GlProfile::Es30 => "#version 300 es\nprecision mediump float;\n",
        }
    }
}

/// 基于 glow 的渲染上下文
///
/// 持有 GL 程序与缓冲对象；必须在 GL 上下文仍为 current 时销毁。
pub struct GlRenderContext {
    gl: Arc<glow::Context>,
    program: GlProgram,
    vao: GlVertexArray,
    vbo: GlBuffer,
    viewport_location: Option<GlUniformLocation>,
    recorder: FrameRecorder,
    factory: PathFactory,
    meshes: MeshBuilder,
    raster_ordering_warned: bool,
}

impl GlRenderContext {
    pub fn new(gl: Arc<glow::Context>, profile: GlProfile) -> Result<Self> {
        unsafe {
            let program = link_program(&gl, profile)?;
            let viewport_location = gl.get_uniform_location(program, "u_viewport");

            let vao = gl
                .create_vertex_array()
                .map_err(|e| GraphicsError::ResourceCreation(format!("vertex array: {}", e)))?;
            let vbo = gl
                .create_buffer()
                .map_err(|e| GraphicsError::ResourceCreation(format!("vertex buffer: {}", e)))?;

            let stride = std::mem::size_of::<ColorVertex>() as i32;
            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(1, 4, glow::FLOAT, false, stride, 8);
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            Ok(Self {
                gl,
                program,
                vao,
                vbo,
                viewport_location,
                recorder: FrameRecorder::new(),
                factory: PathFactory::new(),
                meshes: MeshBuilder::new(),
                raster_ordering_warned: false,
            })
        }
    }

    unsafe fn prepare_target(&self, descriptor: &FrameDescriptor, width: u32, height: u32) {
        let gl = &self.gl;
        gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        gl.viewport(0, 0, width as i32, height as i32);
        if descriptor.load_action == LoadAction::Clear {
            let [r, g, b, a] = argb_to_rgba(descriptor.clear_color);
            gl.clear_color(r, g, b, a);
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT | glow::STENCIL_BUFFER_BIT);
        }
    }
}

unsafe fn compile_shader(
    gl: &glow::Context,
    kind: u32,
    header: &str,
    body: &str,
) -> Result<<glow::Context as HasContext>::Shader> {
    let shader = gl
        .create_shader(kind)
        .map_err(|e| GraphicsError::ResourceCreation(format!("shader object: {}", e)))?;
    gl.shader_source(shader, &format!("{}{}", header, body));
    gl.compile_shader(shader);
    if !gl.get_shader_compile_status(shader) {
        let log = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);
        return Err(GraphicsError::ResourceCreation(format!("shader compilation failed: {}", log)).into());
    }
    Ok(shader)
}

unsafe fn link_program(gl: &glow::Context, profile: GlProfile) -> Result<GlProgram> {
    let header = profile.shader_header();
    let vertex = compile_shader(gl, glow::VERTEX_SHADER, header, VERTEX_SHADER)?;
    let fragment = match compile_shader(gl, glow::FRAGMENT_SHADER, header, FRAGMENT_SHADER) {
        Ok(shader) => shader,
        Err(e) => {
            gl.delete_shader(vertex);
            return Err(e);
        }
    };

    let program = gl
        .create_program()
        .map_err(|e| GraphicsError::ResourceCreation(format!("program object: {}", e)))?;
    gl.attach_shader(program, vertex);
    gl.attach_shader(program, fragment);
    gl.link_program(program);

    let linked = gl.get_program_link_status(program);
    let log = gl.get_program_info_log(program);

    gl.detach_shader(program, vertex);
    gl.detach_shader(program, fragment);
    gl.delete_shader(vertex);
    gl.delete_shader(fragment);

    if !linked {
        gl.delete_program(program);
        return Err(GraphicsError::ResourceCreation(format!("program link failed: {}", log)).into());
    }
    Ok(program)
}

impl Factory for GlRenderContext {
    fn make_path(&self, path: Path) -> RenderPath {
        self.factory.make_path(path)
    }

    fn make_paint(&self, paint: Paint) -> RenderPaint {
        self.factory.make_paint(paint)
    }

    fn allocations(&self) -> u64 {
        self.factory.allocations()
    }
}

impl RenderContext for GlRenderContext {
    fn as_factory(&self) -> &dyn Factory {
        self
    }

    fn name(&self) -> &str {
        "glow"
    }

    fn begin_frame(&mut self, descriptor: &FrameDescriptor) {
        if descriptor.disable_raster_ordering && !self.raster_ordering_warned {
            tracing::debug!("Raster ordering is not used by the OpenGL context");
            self.raster_ordering_warned = true;
        }
        self.recorder.begin(descriptor);
    }

    fn make_renderer(&self) -> Box<dyn Renderer> {
        Box::new(self.recorder.renderer())
    }

    fn flush(&mut self, target: &RenderTarget) -> Result<FlushReceipt> {
        let (descriptor, commands) = self.recorder.finish_for(target)?;
        let mesh = self.meshes.build(&descriptor, &commands)?;
        let (width, height) = target.size();

        unsafe {
            self.prepare_target(&descriptor, width, height);

            if !mesh.is_empty() {
                let gl = &self.gl;
                gl.enable(glow::BLEND);
                gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
                gl.disable(glow::DEPTH_TEST);
                gl.disable(glow::CULL_FACE);

                gl.use_program(Some(self.program));
                gl.uniform_2_f32(self.viewport_location.as_ref(), width as f32, height as f32);

                gl.bind_vertex_array(Some(self.vao));
                gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
                gl.buffer_data_u8_slice(
                    glow::ARRAY_BUFFER,
                    bytemuck::cast_slice(&mesh.vertices),
                    glow::STREAM_DRAW,
                );

                let mode = match mesh.topology {
                    Topology::Triangles => glow::TRIANGLES,
                    Topology::Lines => glow::LINES,
                };
                gl.draw_arrays(mode, 0, mesh.vertices.len() as i32);

                gl.bind_vertex_array(None);
                gl.use_program(None);
            }

            self.gl.flush();
        }

        Ok(FlushReceipt::new(target, commands.len(), mesh.vertices.len()))
    }
}

impl Drop for GlRenderContext {
    fn drop(&mut self) {
        unsafe {
            self.gl.delete_buffer(self.vbo);
            self.gl.delete_vertex_array(self.vao);
            self.gl.delete_program(self.program);
        }
        tracing::debug!("OpenGL render context released");
    }
}

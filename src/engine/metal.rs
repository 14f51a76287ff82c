//! Metal 渲染上下文

use std::ffi::c_void;

use lyon::path::Path;
use metal::{
    CompileOptions, Device, MTLBlendFactor, MTLClearColor, MTLLoadAction, MTLPixelFormat,
    MTLPrimitiveType, MTLResourceOptions, MTLStoreAction, MTLViewport, RenderPassDescriptor,
    RenderPipelineDescriptor, RenderPipelineState,
};
use objc::rc::autoreleasepool;

use super::frame::{argb_to_rgba, FlushReceipt, FrameDescriptor, LoadAction, RenderTarget};
use super::paint::{Paint, RenderPaint, RenderPath};
use super::recorder::{FrameRecorder, PathFactory};
use super::tessellate::{MeshBuilder, Topology};
use super::{Factory, RenderContext, Renderer};
use crate::core::error::{GraphicsError, Result};

const SHADER_SOURCE: &str = include_str!("shaders/solid.metal");

/// drawable 使用的像素格式
pub const COLOR_FORMAT: MTLPixelFormat = MTLPixelFormat::BGRA8Unorm;

/// 基于 Metal 的渲染上下文
///
/// 命令编码进渲染目标携带的命令缓冲，提交与呈现由后端负责。
pub struct MetalRenderContext {
    device: Device,
    pipeline_state: RenderPipelineState,
    recorder: FrameRecorder,
    factory: PathFactory,
    meshes: MeshBuilder,
}

impl MetalRenderContext {
    pub fn new(device: &Device) -> Result<Self> {
        let library = device
            .new_library_with_source(SHADER_SOURCE, &CompileOptions::new())
            .map_err(|e| GraphicsError::ResourceCreation(format!("Shader compilation failed: {}", e)))?;

        let vertex_function = library
            .get_function("vertex_main", None)
            .map_err(|_| GraphicsError::ResourceCreation("Vertex function not found".into()))?;
        let fragment_function = library
            .get_function("fragment_main", None)
            .map_err(|_| GraphicsError::ResourceCreation("Fragment function not found".into()))?;

        let pipeline_descriptor = RenderPipelineDescriptor::new();
        pipeline_descriptor.set_vertex_function(Some(&vertex_function));
        pipeline_descriptor.set_fragment_function(Some(&fragment_function));

        let attachment = pipeline_descriptor
            .color_attachments()
            .object_at(0)
            .ok_or_else(|| GraphicsError::ResourceCreation("Missing color attachment".into()))?;
        attachment.set_pixel_format(COLOR_FORMAT);
        attachment.set_blending_enabled(true);
        attachment.set_source_rgb_blend_factor(MTLBlendFactor::SourceAlpha);
        attachment.set_destination_rgb_blend_factor(MTLBlendFactor::OneMinusSourceAlpha);
        attachment.set_source_alpha_blend_factor(MTLBlendFactor::One);
        attachment.set_destination_alpha_blend_factor(MTLBlendFactor::OneMinusSourceAlpha);

        let pipeline_state = device
            .new_render_pipeline_state(&pipeline_descriptor)
            .map_err(|e| GraphicsError::ResourceCreation(format!("Pipeline state creation failed: {}", e)))?;

        Ok(Self {
            device: device.clone(),
            pipeline_state,
            recorder: FrameRecorder::new(),
            factory: PathFactory::new(),
            meshes: MeshBuilder::new(),
        })
    }
}

impl Factory for MetalRenderContext {
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

impl RenderContext for MetalRenderContext {
    fn as_factory(&self) -> &dyn Factory {
        self
    }

    fn name(&self) -> &str {
        "metal"
    }

    fn begin_frame(&mut self, descriptor: &FrameDescriptor) {
        self.recorder.begin(descriptor);
    }

    fn make_renderer(&self) -> Box<dyn Renderer> {
        Box::new(self.recorder.renderer())
    }

    fn flush(&mut self, target: &RenderTarget) -> Result<FlushReceipt> {
        let RenderTarget::Metal(metal_target) = target else {
            return Err(GraphicsError::CommandExecution(
                "Metal context can only flush into a Metal render target".into(),
            )
            .into());
        };
        let (descriptor, commands) = self.recorder.finish_for(target)?;
        let mesh = self.meshes.build(&descriptor, &commands)?;
        let (width, height) = target.size();

        autoreleasepool(|| -> Result<()> {
            let pass = RenderPassDescriptor::new();
            let color = pass
                .color_attachments()
                .object_at(0)
                .ok_or_else(|| GraphicsError::CommandExecution("Missing color attachment".into()))?;
            color.set_texture(Some(&metal_target.texture));
            match descriptor.load_action {
                LoadAction::Clear => {
                    let [r, g, b, a] = argb_to_rgba(descriptor.clear_color);
                    color.set_load_action(MTLLoadAction::Clear);
                    color.set_clear_color(MTLClearColor::new(r as f64, g as f64, b as f64, a as f64));
                }
                LoadAction::PreserveRenderTarget => color.set_load_action(MTLLoadAction::Load),
            }
            color.set_store_action(MTLStoreAction::Store);

            let encoder = metal_target.command_buffer.new_render_command_encoder(pass);
            if !mesh.is_empty() {
                let bytes: &[u8] = bytemuck::cast_slice(&mesh.vertices);
                let buffer = self.device.new_buffer_with_data(
                    bytes.as_ptr() as *const c_void,
                    bytes.len() as u64,
                    MTLResourceOptions::CPUCacheModeDefaultCache,
                );
                let viewport = [width as f32, height as f32];

                encoder.set_render_pipeline_state(&self.pipeline_state);
                encoder.set_viewport(MTLViewport {
                    originX: 0.0,
                    originY: 0.0,
                    width: width as f64,
                    height: height as f64,
                    znear: 0.0,
                    zfar: 1.0,
                });
                encoder.set_vertex_buffer(0, Some(&buffer), 0);
                encoder.set_vertex_bytes(
                    1,
                    std::mem::size_of_val(&viewport) as u64,
                    viewport.as_ptr() as *const c_void,
                );
                let primitive = match mesh.topology {
                    Topology::Triangles => MTLPrimitiveType::Triangle,
                    Topology::Lines => MTLPrimitiveType::Line,
                };
                encoder.draw_primitives(primitive, 0, mesh.vertices.len() as u64);
            }
            encoder.end_encoding();

            Ok(())
        })?;

        Ok(FlushReceipt::new(target, commands.len(), mesh.vertices.len()))
    }
}

/// Build script for Vector Player
///
/// # Shader Strategy:
/// - OpenGL: GLSL sources embedded with include_str!, version header chosen at runtime
/// - Metal: MSL source embedded with include_str!, compiled at runtime via new_library_with_source
fn main() {
    // Trigger rebuild if shader files change
    println!("cargo:rerun-if-changed=src/engine/shaders/solid.vert.glsl");
    println!("cargo:rerun-if-changed=src/engine/shaders/solid.frag.glsl");
    println!("cargo:rerun-if-changed=src/engine/shaders/solid.metal");
}

/// OpenGL implementation of [`ContourSurface`] on eframe's glow context.
///
/// Vertices live in one VBO holding every spectrum's polygons; each draw is a
/// `LINE_LOOP` over a vertex range. The per-spectrum camera arrives as a 3×3
/// matrix uniform so zoom and pan never touch the vertex data.

use std::sync::Arc;

use eframe::glow::{self, HasContext};

use crate::contour::{ContourSurface, PixelRect};
use crate::error::{Result, ViewError};

const VERTEX_SHADER: &str = r#"#version 330
layout(location = 0) in vec2 a_pos;
uniform mat3 u_transform;
void main() {
    vec3 p = u_transform * vec3(a_pos, 1.0);
    gl_Position = vec4(p.xy, 0.0, 1.0);
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 330
uniform vec4 u_color;
out vec4 out_color;
void main() {
    out_color = u_color;
}
"#;

/// Pixel geometry of the current paint callback
#[derive(Debug, Clone, Copy)]
struct Target {
    left_px: i32,
    from_bottom_px: i32,
    height_points: f32,
    pixels_per_point: f32,
    clip: [i32; 4],
}

pub struct GlowContourResources {
    gl: Arc<glow::Context>,
    program: glow::Program,
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    u_transform: Option<glow::UniformLocation>,
    u_color: Option<glow::UniformLocation>,
    target: Option<Target>,
    vertex_count: usize,
    released: bool,
}

fn gl_err(what: &str, msg: String) -> ViewError {
    ViewError::PreconditionFailed(format!("{}: {}", what, msg))
}

impl GlowContourResources {
    /// Compile the line program and allocate the shared vertex buffer
    pub fn new(gl: Arc<glow::Context>) -> Result<Self> {
        unsafe {
            let program = gl.create_program().map_err(|e| gl_err("create program", e))?;
            let mut shaders = Vec::with_capacity(2);
            for (kind, source) in [
                (glow::VERTEX_SHADER, VERTEX_SHADER),
                (glow::FRAGMENT_SHADER, FRAGMENT_SHADER),
            ] {
                let shader = gl.create_shader(kind).map_err(|e| gl_err("create shader", e))?;
                gl.shader_source(shader, source);
                gl.compile_shader(shader);
                if !gl.get_shader_compile_status(shader) {
                    let log = gl.get_shader_info_log(shader);
                    gl.delete_shader(shader);
                    gl.delete_program(program);
                    return Err(gl_err("compile shader", log));
                }
                gl.attach_shader(program, shader);
                shaders.push(shader);
            }
            gl.link_program(program);
            let linked = gl.get_program_link_status(program);
            for shader in shaders {
                gl.detach_shader(program, shader);
                gl.delete_shader(shader);
            }
            if !linked {
                let log = gl.get_program_info_log(program);
                gl.delete_program(program);
                return Err(gl_err("link program", log));
            }

            let vao = gl
                .create_vertex_array()
                .map_err(|e| gl_err("create vertex array", e))?;
            let vbo = gl.create_buffer().map_err(|e| gl_err("create buffer", e))?;
            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 2, glow::FLOAT, false, 8, 0);
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            let u_transform = gl.get_uniform_location(program, "u_transform");
            let u_color = gl.get_uniform_location(program, "u_color");
            log::info!("Contour GL program ready");
            Ok(Self {
                gl,
                program,
                vao,
                vbo,
                u_transform,
                u_color,
                target: None,
                vertex_count: 0,
                released: false,
            })
        }
    }

    /// Bind state for one paint callback. egui has already set the GL
    /// viewport to the callback rectangle.
    pub fn begin_frame(&mut self, info: &egui::PaintCallbackInfo) -> Result<()> {
        self.live()?;
        let vp = info.viewport_in_pixels();
        let clip = info.clip_rect_in_pixels();
        self.target = Some(Target {
            left_px: vp.left_px,
            from_bottom_px: vp.from_bottom_px,
            height_points: info.viewport.height(),
            pixels_per_point: info.pixels_per_point,
            clip: [clip.left_px, clip.from_bottom_px, clip.width_px, clip.height_px],
        });
        unsafe {
            self.gl.use_program(Some(self.program));
            self.gl.bind_vertex_array(Some(self.vao));
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
        }
        Ok(())
    }

    fn live(&self) -> Result<()> {
        if self.released {
            Err(ViewError::PreconditionFailed("GL resources already released".into()))
        } else {
            Ok(())
        }
    }

    fn target(&self) -> Result<Target> {
        self.live()?;
        self.target
            .ok_or_else(|| ViewError::PreconditionFailed("draw outside a paint callback".into()))
    }

    /// Device rect (points, top-left origin) → GL scissor box
    fn scissor_box(t: &Target, r: PixelRect) -> [i32; 4] {
        let ppp = t.pixels_per_point;
        let bottom_points = t.height_points - (r.y + r.height);
        [
            t.left_px + (r.x * ppp).round() as i32,
            t.from_bottom_px + (bottom_points * ppp).round() as i32,
            (r.width * ppp).round() as i32,
            (r.height * ppp).round() as i32,
        ]
    }
}

impl ContourSurface for GlowContourResources {
    fn upload_vertices(&mut self, vertices: &[f32]) -> Result<()> {
        self.live()?;
        let bytes: Vec<u8> = vertices.iter().flat_map(|v| v.to_ne_bytes()).collect();
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(self.vbo));
            self.gl
                .buffer_data_u8_slice(glow::ARRAY_BUFFER, &bytes, glow::STATIC_DRAW);
        }
        self.vertex_count = vertices.len() / 2;
        log::debug!("uploaded {} contour vertices", self.vertex_count);
        Ok(())
    }

    fn clear(&mut self, rect: PixelRect, rgba: [f32; 4]) -> Result<()> {
        let t = self.target()?;
        let [x, y, w, h] = Self::scissor_box(&t, rect);
        unsafe {
            self.gl.enable(glow::SCISSOR_TEST);
            self.gl.scissor(x, y, w, h);
            self.gl.clear_color(rgba[0], rgba[1], rgba[2], rgba[3]);
            self.gl.clear(glow::COLOR_BUFFER_BIT);
        }
        Ok(())
    }

    fn restrict(&mut self, rect: Option<PixelRect>) -> Result<()> {
        let t = self.target()?;
        let [x, y, w, h] = match rect {
            Some(r) => Self::scissor_box(&t, r),
            None => t.clip,
        };
        unsafe {
            self.gl.enable(glow::SCISSOR_TEST);
            self.gl.scissor(x, y, w, h);
        }
        Ok(())
    }

    fn set_transform(&mut self, matrix: &[f32; 9]) -> Result<()> {
        self.target()?;
        unsafe {
            self.gl
                .uniform_matrix_3_f32_slice(self.u_transform.as_ref(), false, matrix);
        }
        Ok(())
    }

    fn set_color(&mut self, rgba: [f32; 4]) -> Result<()> {
        self.target()?;
        unsafe {
            self.gl
                .uniform_4_f32(self.u_color.as_ref(), rgba[0], rgba[1], rgba[2], rgba[3]);
        }
        Ok(())
    }

    fn draw_closed_strip(&mut self, first: usize, count: usize) -> Result<()> {
        self.target()?;
        if count < 2 {
            return Ok(());
        }
        if first + count > self.vertex_count {
            return Err(ViewError::InvalidArgument(format!(
                "strip {}..{} exceeds {} uploaded vertices",
                first,
                first + count,
                self.vertex_count
            )));
        }
        unsafe {
            self.gl
                .draw_arrays(glow::LINE_LOOP, first as i32, count as i32);
        }
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        unsafe {
            self.gl.delete_program(self.program);
            self.gl.delete_vertex_array(self.vao);
            self.gl.delete_buffer(self.vbo);
        }
        self.released = true;
        self.target = None;
    }
}

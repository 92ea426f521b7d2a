//! GL error draining and reporting.

use glow::HasContext;

/// Human-readable name for a `glGetError` code.
#[must_use]
pub fn gl_error_name(code: u32) -> &'static str {
    match code {
        glow::INVALID_ENUM => "GL_INVALID_ENUM",
        glow::INVALID_VALUE => "GL_INVALID_VALUE",
        glow::INVALID_OPERATION => "GL_INVALID_OPERATION",
        glow::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
        glow::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
        _ => "unknown GL error",
    }
}

/// Drain the GL error queue, logging every pending error with the given
/// call-site label.
///
/// # Safety
///
/// Requires a valid, current OpenGL context.
pub unsafe fn check_gl_error(gl: &glow::Context, context: &str) {
    loop {
        let code = unsafe { gl.get_error() };
        if code == glow::NO_ERROR {
            break;
        }
        log::error!("GL error in {context}: {} (0x{code:04x})", gl_error_name(code));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_names_cover_the_common_codes() {
        assert_eq!(gl_error_name(glow::INVALID_ENUM), "GL_INVALID_ENUM");
        assert_eq!(gl_error_name(glow::OUT_OF_MEMORY), "GL_OUT_OF_MEMORY");
        assert_eq!(gl_error_name(0xdead), "unknown GL error");
    }
}

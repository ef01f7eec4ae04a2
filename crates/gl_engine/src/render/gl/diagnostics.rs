//! Error checking for OpenGL calls
//!
//! OpenGL records failures in a queue instead of returning them. Every call the
//! engine makes goes through [`gl_call!`](crate::gl_call), which empties the
//! queue before the call and drains it afterwards, so each report names the
//! call that actually raised it. Errors found this way are programming defects
//! in resource setup; under [`ErrorPolicy::Fatal`] the process stops after the
//! report.

use serde::{Deserialize, Serialize};

use super::GlApi;

/// What to do once a checked call has left errors in the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Log, then panic
    #[default]
    Fatal,
    /// Log and carry on
    Log,
}

/// Categories returned by `glGetError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlErrorKind {
    /// `GL_INVALID_ENUM`
    InvalidEnum,
    /// `GL_INVALID_VALUE`
    InvalidValue,
    /// `GL_INVALID_OPERATION`
    InvalidOperation,
    /// `GL_INVALID_FRAMEBUFFER_OPERATION`
    InvalidFramebufferOperation,
    /// `GL_OUT_OF_MEMORY`
    OutOfMemory,
    /// `GL_STACK_UNDERFLOW`
    StackUnderflow,
    /// `GL_STACK_OVERFLOW`
    StackOverflow,
    /// Anything the reference pages do not list
    Unrecognized(u32),
}

impl GlErrorKind {
    /// Translate a raw error code; `None` for `GL_NO_ERROR`
    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            glow::NO_ERROR => return None,
            glow::INVALID_ENUM => Self::InvalidEnum,
            glow::INVALID_VALUE => Self::InvalidValue,
            glow::INVALID_OPERATION => Self::InvalidOperation,
            glow::INVALID_FRAMEBUFFER_OPERATION => Self::InvalidFramebufferOperation,
            glow::OUT_OF_MEMORY => Self::OutOfMemory,
            glow::STACK_UNDERFLOW => Self::StackUnderflow,
            glow::STACK_OVERFLOW => Self::StackOverflow,
            other => Self::Unrecognized(other),
        })
    }

    /// Raw error code
    pub fn code(self) -> u32 {
        match self {
            Self::InvalidEnum => glow::INVALID_ENUM,
            Self::InvalidValue => glow::INVALID_VALUE,
            Self::InvalidOperation => glow::INVALID_OPERATION,
            Self::InvalidFramebufferOperation => glow::INVALID_FRAMEBUFFER_OPERATION,
            Self::OutOfMemory => glow::OUT_OF_MEMORY,
            Self::StackUnderflow => glow::STACK_UNDERFLOW,
            Self::StackOverflow => glow::STACK_OVERFLOW,
            Self::Unrecognized(code) => code,
        }
    }

    /// Human-readable description, as given by the `glGetError` reference page
    pub fn description(self) -> &'static str {
        match self {
            Self::InvalidEnum => {
                "An unacceptable value is specified for an enumerated argument. \
                 The offending command is ignored and has no other side effect than to set the error flag."
            }
            Self::InvalidValue => {
                "A numeric argument is out of range. \
                 The offending command is ignored and has no other side effect than to set the error flag."
            }
            Self::InvalidOperation => {
                "The specified operation is not allowed in the current state. \
                 The offending command is ignored and has no other side effect than to set the error flag."
            }
            Self::InvalidFramebufferOperation => {
                "The framebuffer object is not complete. \
                 The offending command is ignored and has no other side effect than to set the error flag."
            }
            Self::OutOfMemory => {
                "There is not enough memory left to execute the command. \
                 The state of the GL is undefined, except for the state of the error flags, after this error is recorded."
            }
            Self::StackUnderflow => {
                "An attempt has been made to perform an operation that would cause an internal stack to underflow."
            }
            Self::StackOverflow => {
                "An attempt has been made to perform an operation that would cause an internal stack to overflow."
            }
            Self::Unrecognized(_) => "Not a recognized error code",
        }
    }
}

impl std::fmt::Display for GlErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:04x}: {}", self.code(), self.description())
    }
}

/// Upper bound on errors drained per check
///
/// A lost context can report errors forever; stop instead of spinning.
const MAX_DRAINED_ERRORS: usize = 64;

/// Discard every pending error
pub fn clear_errors(gl: &dyn GlApi) {
    for _ in 0..MAX_DRAINED_ERRORS {
        if gl.get_error() == glow::NO_ERROR {
            break;
        }
    }
}

/// Drain pending errors and log each one against the given call site
pub fn check_errors(gl: &dyn GlApi, call: &str, file: &str, line: u32) -> Vec<GlErrorKind> {
    let mut errors = Vec::new();
    for _ in 0..MAX_DRAINED_ERRORS {
        let Some(kind) = GlErrorKind::from_code(gl.get_error()) else {
            break;
        };
        log::error!(
            "[OpenGL Error] 0x{:04x} in {}:{} calling `{}`: {}",
            kind.code(),
            file,
            line,
            call,
            kind.description()
        );
        errors.push(kind);
    }
    errors
}

/// Run one OpenGL call with error checking
///
/// ```ignore
/// gl_call!(self.gl, gl => gl.bind_buffer(glow::ARRAY_BUFFER, vbo.raw()));
/// ```
///
/// Pending errors are discarded first; errors raised by the call are handled
/// according to the context's [`ErrorPolicy`]. Evaluates to the call's result.
#[macro_export]
macro_rules! gl_call {
    ($ctx:expr, $gl:ident => $call:expr) => {{
        let context: &$crate::render::gl::GlContext = &$ctx;
        context.clear_errors();
        let $gl = context.api();
        let result = $call;
        context.check_errors(stringify!($call), file!(), line!());
        result
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::gl::{GlContext, HeadlessGl};
    use std::rc::Rc;

    #[test]
    fn test_error_code_translation() {
        assert_eq!(GlErrorKind::from_code(glow::NO_ERROR), None);
        assert_eq!(GlErrorKind::from_code(glow::INVALID_ENUM), Some(GlErrorKind::InvalidEnum));
        assert_eq!(GlErrorKind::from_code(glow::OUT_OF_MEMORY), Some(GlErrorKind::OutOfMemory));
        assert_eq!(GlErrorKind::from_code(glow::STACK_OVERFLOW), Some(GlErrorKind::StackOverflow));
        assert_eq!(GlErrorKind::from_code(0x1234), Some(GlErrorKind::Unrecognized(0x1234)));
        assert_eq!(GlErrorKind::Unrecognized(0x1234).description(), "Not a recognized error code");
    }

    #[test]
    fn test_code_round_trips_through_kind() {
        for code in [
            glow::INVALID_ENUM,
            glow::INVALID_VALUE,
            glow::INVALID_OPERATION,
            glow::INVALID_FRAMEBUFFER_OPERATION,
            glow::OUT_OF_MEMORY,
            glow::STACK_UNDERFLOW,
            glow::STACK_OVERFLOW,
        ] {
            assert_eq!(GlErrorKind::from_code(code).map(GlErrorKind::code), Some(code));
        }
    }

    #[test]
    fn test_check_drains_every_pending_error() {
        let gl = HeadlessGl::new();
        gl.push_error(glow::INVALID_VALUE);
        gl.push_error(glow::INVALID_OPERATION);

        let errors = check_errors(&gl, "test", file!(), line!());
        assert_eq!(errors, vec![GlErrorKind::InvalidValue, GlErrorKind::InvalidOperation]);
        assert_eq!(gl.get_error(), glow::NO_ERROR);
    }

    #[test]
    fn test_stale_errors_are_not_attributed_to_next_call() {
        let gl = Rc::new(HeadlessGl::new());
        let ctx = GlContext::new(Rc::clone(&gl));
        gl.push_error(glow::INVALID_ENUM);

        // A valid call must not report the stale error
        gl_call!(ctx, api => api.bind_buffer(glow::ARRAY_BUFFER, 0));
        assert_eq!(gl.get_error(), glow::NO_ERROR);
    }

    #[test]
    fn test_log_policy_reports_and_continues() {
        let gl = Rc::new(HeadlessGl::new());
        let ctx = GlContext::with_policy(Rc::clone(&gl), ErrorPolicy::Log);

        gl_call!(ctx, api => api.bind_buffer(0xDEAD, 0));
        let errors = ctx.check_errors("nothing", file!(), line!());
        assert!(errors.is_empty());
    }

    #[test]
    #[should_panic(expected = "OpenGL error")]
    fn test_fatal_policy_halts() {
        let ctx = GlContext::new(HeadlessGl::new());
        // Invalid target raises GL_INVALID_ENUM
        gl_call!(ctx, api => api.bind_buffer(0xDEAD, 0));
    }

    #[test]
    fn test_policy_deserializes_from_snake_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: ErrorPolicy,
        }
        let parsed: Wrapper = toml::from_str("policy = \"log\"").unwrap();
        assert_eq!(parsed.policy, ErrorPolicy::Log);
        assert_eq!(ErrorPolicy::default(), ErrorPolicy::Fatal);
    }
}

//! Typed OpenGL object names

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use super::RawName;

/// Marker for the kind of object a [`ResourceId`] names
pub trait ResourceKind {
    /// Name used in logs and debug output
    const NAME: &'static str;
}

/// Vertex array objects
#[derive(Debug)]
pub enum VertexArrayKind {}

/// Buffer objects (vertex and index buffers)
#[derive(Debug)]
pub enum BufferKind {}

/// Shader stage objects
#[derive(Debug)]
pub enum ShaderKind {}

/// Linked program objects
#[derive(Debug)]
pub enum ProgramKind {}

impl ResourceKind for VertexArrayKind {
    const NAME: &'static str = "vertex array";
}

impl ResourceKind for BufferKind {
    const NAME: &'static str = "buffer";
}

impl ResourceKind for ShaderKind {
    const NAME: &'static str = "shader";
}

impl ResourceKind for ProgramKind {
    const NAME: &'static str = "program";
}

/// An OpenGL object name tagged with its kind
///
/// The id identifies an object; it does not own it. Ownership lives in the
/// types that create the object ([`Mesh`](crate::render::Mesh),
/// [`ShaderProgram`](crate::render::ShaderProgram)). Raw value 0 is
/// [`ResourceId::NONE`], meaning no object exists.
pub struct ResourceId<K: ResourceKind> {
    raw: RawName,
    _kind: PhantomData<K>,
}

impl<K: ResourceKind> ResourceId<K> {
    /// The "no resource" sentinel
    pub const NONE: Self = Self::from_raw(0);

    /// Wrap a raw name handed out by the driver
    pub const fn from_raw(raw: RawName) -> Self {
        Self {
            raw,
            _kind: PhantomData,
        }
    }

    /// The raw name to pass back to the driver
    pub const fn raw(self) -> RawName {
        self.raw
    }

    /// True for the zero sentinel
    pub const fn is_none(self) -> bool {
        self.raw == 0
    }

    /// True when an object is named
    pub const fn is_some(self) -> bool {
        self.raw != 0
    }

    /// Replace with [`ResourceId::NONE`] and return the previous value
    pub fn take(&mut self) -> Self {
        std::mem::replace(self, Self::NONE)
    }
}

impl<K: ResourceKind> Clone for ResourceId<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: ResourceKind> Copy for ResourceId<K> {}

impl<K: ResourceKind> PartialEq for ResourceId<K> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K: ResourceKind> Eq for ResourceId<K> {}

impl<K: ResourceKind> Hash for ResourceId<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<K: ResourceKind> Default for ResourceId<K> {
    fn default() -> Self {
        Self::NONE
    }
}

impl<K: ResourceKind> fmt::Debug for ResourceId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "{}(none)", K::NAME)
        } else {
            write!(f, "{}({})", K::NAME, self.raw)
        }
    }
}

use std::fmt;

pub use kurbo::{Point, Vec2};

/// Opaque node identity, allocated once per session and never reused.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct NodeId(pub u64);

/// Opaque link identity, allocated once per session and never reused.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct LinkId(pub u64);

/// Side of a node an attachment point sits on.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum PortDir {
    /// The single input port of a node.
    In,
    /// The single output port of a node.
    Out,
}

/// Attachment point bound to exactly one node.
///
/// Every node has at most one input and one output port, so the pair
/// `(node, dir)` identifies a port completely.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct PortId {
    /// Owning node.
    pub node: NodeId,
    /// Input or output side.
    pub dir: PortDir,
}

impl PortId {
    /// Output port of `node`.
    pub fn output(node: NodeId) -> Self {
        Self {
            node,
            dir: PortDir::Out,
        }
    }

    /// Input port of `node`.
    pub fn input(node: NodeId) -> Self {
        Self {
            node,
            dir: PortDir::In,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link#{}", self.0)
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.dir {
            PortDir::In => "in",
            PortDir::Out => "out",
        };
        write!(f, "{}.{side}", self.node)
    }
}

/// Pixel dimensions of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ImageSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageSize {
    /// Dimensions of an existing RGBA image.
    pub fn of(image: &image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// Mounting surface: a retained list of nodes the host paints each frame.
// The engine owns the only Surface. Units see it solely as `&mut Surface` inside start/update calls.

use serde::{Deserialize, Serialize};

use crate::types::NormalizedCoord;

/// What a node draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeKind {
    /// Image asset, resolved by the host from the skin key.
    Sprite { key: String },
    Text { content: String },
}

/// One drawable on the surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceNode {
    pub id: u32,
    pub kind: NodeKind,
    pub position: NormalizedCoord,
    /// Diameter in normalized units.
    pub size: f32,
}

/// Drawing region handed between the engine and the active microgame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Surface {
    nodes: Vec<SurfaceNode>,
    /// Bumped on every mutation so hosts can skip unchanged frames.
    revision: u64,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        if !self.nodes.is_empty() {
            self.nodes.clear();
            self.revision += 1;
        }
    }

    pub fn push(&mut self, node: SurfaceNode) {
        self.nodes.push(node);
        self.revision += 1;
    }

    pub fn sprite(&mut self, id: u32, key: &str, position: NormalizedCoord, size: f32) {
        self.push(SurfaceNode {
            id,
            kind: NodeKind::Sprite {
                key: key.to_string(),
            },
            position,
            size,
        });
    }

    pub fn text(&mut self, id: u32, content: impl Into<String>, position: NormalizedCoord) {
        self.push(SurfaceNode {
            id,
            kind: NodeKind::Text {
                content: content.into(),
            },
            position,
            size: 0.0,
        });
    }

    pub fn nodes(&self) -> &[SurfaceNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_bumps_revision_only_when_dirty() {
        let mut surface = Surface::new();
        surface.clear();
        assert_eq!(surface.revision(), 0);

        surface.sprite(1, "player", NormalizedCoord::center(), 0.1);
        surface.text(2, "3", NormalizedCoord::new(0.5, 0.1));
        assert_eq!(surface.nodes().len(), 2);
        assert_eq!(surface.revision(), 2);

        surface.clear();
        assert!(surface.is_empty());
        assert_eq!(surface.revision(), 3);
    }

    #[test]
    fn nodes_serialize_with_kind_tag() {
        let mut surface = Surface::new();
        surface.sprite(7, "gem", NormalizedCoord::new(0.25, 0.75), 0.05);
        let json = serde_json::to_string(surface.nodes()).unwrap();
        assert!(json.contains(r#""type":"Sprite""#));
        assert!(json.contains(r#""key":"gem""#));
    }
}

use shadertoy::Pass;

use crate::channels::BufferTargets;
use crate::compile::CompiledProgram;
use crate::engine::PassInfo;
use crate::types::{TextureId, TextureInfo};

/// Target ids live in their own range so they never collide with cached
/// texture ids.
const TARGET_ID_BASE: TextureId = 1 << 32;

/// Double-buffered render target. The pass writes `back` while readers see
/// `front`, which holds the previous frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetPair {
    pub front: TextureInfo,
    pub back: TextureInfo,
}

impl TargetPair {
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.front, &mut self.back);
    }
}

#[derive(Debug)]
pub struct CompiledPass {
    pub name: String,
    pub config: Pass,
    /// Raw user source, kept so the pass can be relinked when `common` changes.
    pub source: String,
    pub program: CompiledProgram,
    /// `None` for the `Image` pass, which renders to the surface.
    pub targets: Option<TargetPair>,
}

/// Passes in render order: buffers as declared, `Image` last.
#[derive(Debug)]
pub struct PassGraph {
    passes: Vec<CompiledPass>,
    size: (u32, u32),
    next_target: TextureId,
}

impl PassGraph {
    pub fn new(size: (u32, u32)) -> Self {
        Self {
            passes: Vec::new(),
            size,
            next_target: TARGET_ID_BASE,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn passes(&self) -> &[CompiledPass] {
        &self.passes
    }

    pub fn pass(&self, name: &str) -> Option<&CompiledPass> {
        self.passes.iter().find(|pass| pass.name == name)
    }

    pub fn pass_mut(&mut self, name: &str) -> Option<&mut CompiledPass> {
        self.passes.iter_mut().find(|pass| pass.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn allocate_targets(&mut self) -> TargetPair {
        let (width, height) = self.size;
        let mut next = || {
            self.next_target += 1;
            TextureInfo {
                id: self.next_target,
                width,
                height,
            }
        };
        TargetPair {
            front: next(),
            back: next(),
        }
    }

    /// Installs a new set of passes. Buffer passes that already existed keep
    /// their targets, and with them their accumulated frames.
    pub fn rebuild(&mut self, passes: Vec<CompiledPass>) {
        let mut rebuilt = Vec::with_capacity(passes.len());
        for mut pass in passes {
            if pass.targets.is_some() {
                if let Some(existing) = self.pass(&pass.name).and_then(|old| old.targets) {
                    pass.targets = Some(existing);
                }
            }
            rebuilt.push(pass);
        }
        self.passes = rebuilt;
    }

    /// Adds one pass, keeping buffers in `order` and `Image` last.
    pub fn insert(&mut self, pass: CompiledPass, order: &[String]) {
        self.passes.retain(|existing| existing.name != pass.name);
        self.passes.push(pass);
        self.passes.sort_by_key(|pass| {
            order
                .iter()
                .position(|name| *name == pass.name)
                .unwrap_or(order.len())
        });
    }

    pub fn swap_targets(&mut self) {
        for targets in self.passes.iter_mut().filter_map(|pass| pass.targets.as_mut()) {
            targets.swap();
        }
    }

    pub fn infos(&self) -> Vec<PassInfo> {
        self.passes
            .iter()
            .map(|pass| PassInfo {
                name: pass.name.clone(),
                path: pass.config.path.clone(),
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.passes.clear();
    }
}

impl BufferTargets for PassGraph {
    fn front_target(&self, pass: &str) -> Option<TextureInfo> {
        self.pass(pass).and_then(|pass| pass.targets).map(|pair| pair.front)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::compile_fragment;

    const SOURCE: &str = "void mainImage(out vec4 c, in vec2 p) { c = vec4(1.0); }";

    fn pass(graph: &mut PassGraph, name: &str) -> CompiledPass {
        let targets = (name != "Image").then(|| graph.allocate_targets());
        CompiledPass {
            name: name.to_string(),
            config: Pass::default(),
            source: SOURCE.to_string(),
            program: compile_fragment(None, SOURCE).unwrap(),
            targets,
        }
    }

    #[test]
    fn swap_exchanges_front_and_back() {
        let mut graph = PassGraph::new((4, 4));
        let buffer = pass(&mut graph, "BufferA");
        let image = pass(&mut graph, "Image");
        graph.rebuild(vec![buffer, image]);

        let before = graph.front_target("BufferA").unwrap();
        graph.swap_targets();
        let after = graph.front_target("BufferA").unwrap();
        assert_ne!(before.id, after.id);
        assert_eq!((after.width, after.height), (4, 4));
        assert!(graph.front_target("Image").is_none());
    }

    #[test]
    fn rebuild_keeps_targets_of_surviving_buffers() {
        let mut graph = PassGraph::new((4, 4));
        let first = pass(&mut graph, "BufferA");
        let kept = first.targets;
        graph.rebuild(vec![first]);

        let replacement = pass(&mut graph, "BufferA");
        let fresh = pass(&mut graph, "BufferB");
        graph.rebuild(vec![replacement, fresh]);
        assert_eq!(graph.pass("BufferA").unwrap().targets, kept);
        assert_ne!(graph.pass("BufferB").unwrap().targets, kept);
        assert_eq!(
            graph.infos().into_iter().map(|info| info.name).collect::<Vec<_>>(),
            vec!["BufferA", "BufferB"]
        );
    }
}

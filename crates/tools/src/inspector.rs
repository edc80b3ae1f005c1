use levelforge_author::CommandStack;
use levelforge_common::NodeId;
use levelforge_kernel::Scene;
use levelforge_modules::{ModuleState, ModuleStore, PlayMode};
use std::fmt;

/// Read-only queries against the scene for debugging and the CLI.
pub struct SceneInspector;

impl SceneInspector {
    pub fn summary(scene: &Scene) -> SceneSummary {
        SceneSummary {
            node_count: scene.node_count(),
            root_count: scene.roots().len(),
            pending_events: scene.events().len(),
            state_hash: scene.state_hash(),
        }
    }

    pub fn inspect_node(scene: &Scene, id: NodeId) -> Option<NodeInfo> {
        let node = scene.get(id)?;
        let mut path = vec![node.name.clone()];
        let mut cursor = node.parent;
        while let Some(parent) = cursor {
            let parent_node = scene.get(parent)?;
            path.push(parent_node.name.clone());
            cursor = parent_node.parent;
        }
        path.reverse();

        let p = node.transform.position;
        let s = node.transform.scale;
        Some(NodeInfo {
            id,
            path: path.join("/"),
            children: node.children.len(),
            position: [p.x, p.y, p.z],
            scale: [s.x, s.y, s.z],
        })
    }

    /// One line per node in pre-order, indented by depth.
    pub fn tree(scene: &Scene) -> Vec<String> {
        let mut lines = Vec::new();
        for root in scene.roots() {
            Self::tree_into(scene, *root, 0, &mut lines);
        }
        lines
    }

    fn tree_into(scene: &Scene, id: NodeId, depth: usize, lines: &mut Vec<String>) {
        let Some(node) = scene.get(id) else {
            return;
        };
        lines.push(format!("{}{} [{}]", "  ".repeat(depth), node.name, id.short()));
        for child in &node.children {
            Self::tree_into(scene, *child, depth + 1, lines);
        }
    }
}

#[derive(Debug, Clone)]
pub struct SceneSummary {
    pub node_count: usize,
    pub root_count: usize,
    pub pending_events: usize,
    pub state_hash: u64,
}

impl fmt::Display for SceneSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scene: nodes={} roots={} pending_events={} hash={:#018x}",
            self.node_count, self.root_count, self.pending_events, self.state_hash
        )
    }
}

#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub id: NodeId,
    pub path: String,
    pub children: usize,
    pub position: [f32; 3],
    pub scale: [f32; 3],
}

impl fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Node [{}] {} children={} pos=({:.2}, {:.2}, {:.2}) scale=({:.2}, {:.2}, {:.2})",
            self.id.short(),
            self.path,
            self.children,
            self.position[0],
            self.position[1],
            self.position[2],
            self.scale[0],
            self.scale[1],
            self.scale[2],
        )
    }
}

/// Read-only view over loaded modules.
pub struct ModuleInspector;

impl ModuleInspector {
    pub fn summary(store: &ModuleStore) -> ModuleSummary {
        let count = |state: ModuleState| {
            store
                .records()
                .iter()
                .filter(|r| r.state() == state)
                .count()
        };
        ModuleSummary {
            mode: store.mode(),
            loaded: count(ModuleState::Loaded),
            running: count(ModuleState::Running),
            suspended: count(ModuleState::Suspended),
            classes: store.registry().len(),
        }
    }

    /// Modules in dispatch order.
    pub fn rows(store: &ModuleStore) -> Vec<ModuleRow> {
        store
            .dispatch_order()
            .into_iter()
            .filter_map(|id| store.get(id))
            .map(|r| ModuleRow {
                id: r.id().to_string(),
                name: r.name().to_owned(),
                class: r.class().name().to_owned(),
                sort: r.sort(),
                state: r.state(),
                node: r.node_name().map(str::to_owned),
                attributes: r
                    .attrs()
                    .iter()
                    .map(|(name, value)| format!("{name}={value:?}"))
                    .collect(),
            })
            .collect()
    }

    pub fn history(stack: &CommandStack) -> HistorySummary {
        HistorySummary {
            depth: stack.len(),
            cursor: stack.cursor(),
            undo: stack.undo_label(),
            redo: stack.redo_label(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModuleSummary {
    pub mode: PlayMode,
    pub loaded: usize,
    pub running: usize,
    pub suspended: usize,
    pub classes: usize,
}

impl fmt::Display for ModuleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Modules: mode={:?} loaded={} running={} suspended={} classes={}",
            self.mode, self.loaded, self.running, self.suspended, self.classes
        )
    }
}

#[derive(Debug, Clone)]
pub struct ModuleRow {
    pub id: String,
    pub name: String,
    pub class: String,
    pub sort: i32,
    pub state: ModuleState,
    pub node: Option<String>,
    pub attributes: Vec<String>,
}

impl fmt::Display for ModuleRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>4} {:<16} {:<10} sort={:<3} {:?}",
            self.id, self.name, self.class, self.sort, self.state
        )?;
        if let Some(node) = &self.node {
            write!(f, " node={node}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct HistorySummary {
    pub depth: usize,
    pub cursor: usize,
    pub undo: Option<&'static str>,
    pub redo: Option<&'static str>,
}

impl fmt::Display for HistorySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "History: {}/{} undo={} redo={}",
            self.cursor,
            self.depth,
            self.undo.unwrap_or("-"),
            self.redo.unwrap_or("-"),
        )
    }
}

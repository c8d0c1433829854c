use crate::{AppState, Effect, Msg, NodeKind};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FileChosen { file_name } => {
            let generation = state.begin_load(file_name);
            vec![Effect::ClearMap, Effect::LoadArchive { generation }]
        }
        Msg::ArchiveLoaded {
            generation,
            tree,
            overlays,
        } => {
            // Completions for an abandoned file must not touch the current tree.
            if !state.is_current_load(generation) {
                return (state, Vec::new());
            }
            state.apply_tree(&tree);
            if overlays.is_empty() {
                Vec::new()
            } else {
                vec![Effect::ShowOverlays { overlays }]
            }
        }
        Msg::LoadFailed { generation, notice } => {
            if state.is_current_load(generation) {
                state.apply_failure(notice);
            }
            Vec::new()
        }
        Msg::NodeClicked { node_id } => match state.node_target(node_id) {
            Some((NodeKind::Folder, _)) => {
                state.toggle(node_id);
                Vec::new()
            }
            Some((NodeKind::Leaf, Some(path))) => vec![Effect::ZoomToLeaf {
                generation: state.generation(),
                path: path.to_string(),
            }],
            _ => Vec::new(),
        },
        Msg::ZoomResolved { generation, bounds } => match bounds {
            Some(bounds) if generation == state.generation() => {
                state.set_viewport(bounds);
                vec![Effect::FitBounds { bounds }]
            }
            _ => Vec::new(),
        },
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

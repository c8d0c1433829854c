//! KMZ viewer core: data model, path resolution and the tree presenter state machine.
mod bounds;
mod effect;
mod map;
mod msg;
mod path;
mod state;
mod tree;
mod update;
mod view_model;

pub use bounds::GeoBounds;
pub use effect::Effect;
pub use map::{ImageOverlay, MapSink, MapView};
pub use msg::Msg;
pub use path::{directory_of, normalize_entry_name, resolve_path};
pub use state::{AppState, Generation, LoadState, NodeId};
pub use tree::{NodeKind, TreeNode, ROOT_NAME, UNNAMED_LINK};
pub use update::update;
pub use view_model::{AppViewModel, Notice, TreeRowView};

/// ameta: a local file annotation manager
///
/// An instance is a directory tree anchored by an identity file. Every
/// content file in the tree gets a JSON sidecar for its metadata, and
/// an embedded database inside the identity file holds the dynamic
/// column schema. `state` is the core; `server` is the thin HTTP shell
/// around it.

pub mod server;
pub mod state;

pub use state::manager::InstanceState;
pub use state::StateError;

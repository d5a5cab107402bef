//! Scene graph reconstruction for glTF 2.0 assets.
//!
//! This library parses glTF documents (JSON text or binary GLB containers)
//! into a detached scene graph. Dependencies between definitions are
//! resolved asynchronously and memoized for the duration of a parse, and
//! extensions are handled by an open set of plugins. The archive processor
//! isolates resource loading from the file system, so a model and its
//! resources can be packed into one archive and loaded at once.
//!
pub mod accessor;
pub mod animation;
pub mod archive;
pub mod camera;
pub mod index;
pub mod light;
/// Model loaders and their collaborators.
pub mod loader;
pub mod material;
pub mod mesh;
pub mod node;
pub mod primitive;
pub mod scene;
pub mod skin;
pub mod texture;

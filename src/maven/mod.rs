//! # Build Descriptor Support
//!
//! Reading and patching of Maven `pom.xml` files.
//!
//! - **`xml`**: a position-preserving element walker, enough for descriptors.
//! - **`pom`**: the project model exposed to templates as `maven-model`.
//! - **`descriptor`**: entries (dependencies, repositories, plugins) parsed from action text.
//! - **`patcher`**: the `DescriptorPatcher` seam and its textual `PomPatcher`.

pub mod descriptor;
pub mod patcher;
pub mod pom;
pub mod xml;

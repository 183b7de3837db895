// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod cascade;
pub mod dates;
pub mod directory;
pub mod forms;
pub mod ids;
pub mod model;
pub mod policy;
pub mod screens;
pub mod state;
pub mod submission;

pub use cascade::*;
pub use dates::*;
pub use directory::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use policy::*;
pub use screens::*;
pub use state::*;
pub use submission::*;

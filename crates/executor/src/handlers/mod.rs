//! Command handlers organized by category.
//!
//! | Module | Commands | Remote area |
//! |--------|----------|-------------|
//! | `objects` | 5 | object create/rename/move/property, audio import |
//! | `events` | 1 | events and their actions |
//! | `gamesyncs` | 5 | game parameters, switches, states |
//! | `soundbank` | 2 | soundbank inclusions and generation |
//! | `runtime` | 9 | sound engine game objects and playback |
//! | `query` | 4 | selection, project info, property table |
//! | `index` | 2 | path index build and resolution |
//! | `subscription` | 3 | change topics |

pub mod events;
pub mod gamesyncs;
pub mod index;
pub mod objects;
pub mod query;
pub mod runtime;
pub mod soundbank;
pub mod subscription;

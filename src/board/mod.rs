//! Board subsystem: projects, issues and their ordering within columns.
//!
//! ## Overview
//!
//! Issues live in one of five workflow columns. Their order inside a column
//! comes from a fractional `position`: moving a card computes a value
//! strictly between its new neighbors, so only the moved card is written.
//! The [`reorder::ReorderCoordinator`] applies a move to its local view
//! first, persists it through an [`store::IssueStore`], and restores the
//! snapshot if the store rejects it.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │  Client  │ ───────> │  server.rs  (axum Router, ServerConfig)          │
//! │          │ <─────── │    └─ api.rs  (route handlers, AppState)         │
//! └──────────┘          │         │                                        │
//!                       │         │ ReorderCoordinator::move_issue()       │
//!                       │         v                                        │
//!                       │  reorder.rs  (plan, begin, commit / rollback)    │
//!                       │         │                                        │
//!                       │         │ PositionAllocator::try_allocate()      │
//!                       │         v                                        │
//!                       │  position.rs + ordering.rs                       │
//!                       │         │                                        │
//!                       │         │ IssueStore (async trait)               │
//!                       │         v                                        │
//!                       │  memory.rs (MemoryStore) | db.rs (SqliteStore)   │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module     | Responsibility                                           |
//! |------------|----------------------------------------------------------|
//! | `models`   | Shared types: `Project`, `Issue`, `IssueColumn`, `Sprint`|
//! | `store`    | `IssueStore` trait and `load_board` helper               |
//! | `stats`    | Per-column and per-priority counts for a project         |

pub mod api;
pub mod db;
pub mod memory;
pub mod models;
pub mod ordering;
pub mod position;
pub mod reorder;
pub mod server;
pub mod stats;
pub mod store;

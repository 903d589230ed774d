//! Action dispatch for both runtime modes: a flat key → `Action`/`PagerAction`
//! mapping (`keymap`) and the two mutation entry points that apply a resolved
//! action to a model (`dispatcher::dispatch`) or a pager viewport
//! (`pager_dispatch::dispatch_pager`).
//!
//! This crate previously hosted a Vim-style modal composition engine
//! (pending-key state, operator/motion resolution, text objects). That layer
//! is gone: every `Action`/`PagerAction` produced by `keymap` is already
//! fully resolved, so dispatch is a single match rather than a state
//! machine threaded across keystrokes.

pub mod dispatcher;
pub mod io_ops;
pub mod keymap;
pub mod mouse;
pub mod pager_dispatch;

pub use dispatcher::{
    Action, ActionObserver, DispatchResult, EditAction, MatchSpan, MotionKind, dispatch,
};
pub use keymap::{translate_editor_key, translate_pager_key};
pub use mouse::{MouseEffect, MouseState, word_bounds_at};
pub use pager_dispatch::{PagerAction, PagerDispatchResult, SearchDirection, dispatch_pager};

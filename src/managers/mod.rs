// Achroma Reader state managers
// Managers handle stateful operations: profiles, shortcuts, activation resources, timers.

pub mod activation_scope;
pub mod profile_manager;
pub mod shortcut_manager;
pub mod update_coalescer;

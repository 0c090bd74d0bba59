// Process-level I/O: instance lock, signals and the control socket
pub mod ipc; // Control socket for `coopd trigger`
pub mod lock; // Single-instance lock file
pub mod signals; // Unix signal handling

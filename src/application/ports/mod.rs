pub mod hasher;
pub mod notifier;

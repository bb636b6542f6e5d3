#[path = "integration/gestures.rs"]
mod gestures;
#[path = "integration/persistence.rs"]
mod persistence;

/// Names every generated combine declares itself.
pub const LIFECYCLE_NAMES: &[&str] = &[
    "all_current_tick",
    "all_current_applytick",
    "user_current_tick",
    "user_current_applytick",
];

/// Nested types of every generated combine.
pub const CLASS_NAMES: &[&str] = &["ConstructorArguments"];

/// Names a stallable combine declares on top of [LIFECYCLE_NAMES].
pub const STALL_NAMES: &[&str] = &["stall", "stalled", "_external_stall"];

use rand::seq::SliceRandom;

const THINKING_MESSAGES: &[&str] = &[
    "Reading the dictionary",
    "Checking update sets",
    "Querying tables",
    "Consulting the CMDB",
    "Tracing reference fields",
    "Reviewing business rules",
    "Drafting a client script",
    "Looking up sys_ids",
    "Inspecting form layouts",
    "Resolving choice lists",
    "Planning the change",
    "Thinking",
];

pub fn get_random_thinking_message() -> &'static str {
    THINKING_MESSAGES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("Thinking")
}

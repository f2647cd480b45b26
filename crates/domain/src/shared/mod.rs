pub mod entity;
pub mod labels;
pub mod recurrence;

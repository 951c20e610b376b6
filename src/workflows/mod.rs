pub mod reconciler;
pub mod report;

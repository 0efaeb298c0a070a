//! Score blending (`Ranker`) and bucket classification (`Grouper`) for a
//! set of already access-filtered search hits.

pub mod grouper;
pub mod ranker;

pub use grouper::Grouper;
pub use ranker::Ranker;
